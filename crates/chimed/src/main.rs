use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    match chimed::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(launch_error) => {
            error!(target: "chimed", error = %launch_error, "daemon exited with an error");
            ExitCode::FAILURE
        }
    }
}
