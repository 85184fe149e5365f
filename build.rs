//! Build script for the plugin protocol bindings.
//!
//! `src/generated.rs` is checked in, so a normal build never touches protoc.
//! Run `cargo build --features regenerate-proto` after editing
//! `proto/provider.proto`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "regenerate-proto")]
    {
        let out_dir = std::path::PathBuf::from("src");
        tonic_prost_build::configure()
            .build_client(false)
            .out_dir(&out_dir)
            .compile_protos(&["proto/provider.proto"], &["proto"])?;

        let generated = out_dir.join("provider.v1.rs");
        if generated.exists() {
            std::fs::rename(generated, out_dir.join("generated.rs"))?;
        }
    }

    println!("cargo:rerun-if-changed=proto/provider.proto");

    Ok(())
}
