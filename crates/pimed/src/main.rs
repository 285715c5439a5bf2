//! Entry point for the `pimed` binary.

use std::process::ExitCode;

fn main() -> ExitCode {
    match pimed::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(
                target: concat!(env!("CARGO_PKG_NAME"), "::process"),
                error = %error,
                "daemon exited with an error"
            );
            // Telemetry may not be installed when bootstrap failed early.
            eprintln!("pimed: {error}");
            ExitCode::FAILURE
        }
    }
}
