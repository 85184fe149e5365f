//! Logging setup for the provider binary.
//!
//! All logs go to **stderr**; stdout carries only the handshake line the
//! host engine parses at startup.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter, e.g. `debug` or `hyperping_provider::client=debug`.
//!   Defaults to `info`.
//!
//! ```bash
//! # Trace every API request and retry
//! RUST_LOG=hyperping_provider::client=debug ./hyperping-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber with `info` as the default level.
///
/// Returns false if a subscriber was already installed, which happens when
/// tests or an embedding host set one first.
pub fn init_logging() -> bool {
    init_logging_with_default("info")
}

/// Like [`init_logging`], with a caller-chosen default level used when
/// `RUST_LOG` is unset.
pub fn init_logging_with_default(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}
