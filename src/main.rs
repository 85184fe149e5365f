use std::process::ExitCode;

use hyperping_provider::{init_logging, serve, HyperpingProvider};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match serve(HyperpingProvider::new()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Provider server exited with an error");
            ExitCode::FAILURE
        },
    }
}
