use std::process::ExitCode;

use lockd::LaunchError;
use lockd_config::ConfigError;

fn main() -> ExitCode {
    match lockd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(LaunchError::Config(ConfigError::Cli(error))) => {
            let _ = error.print();
            u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
        }
        Err(error) => {
            eprintln!("lockd: {error}");
            ExitCode::FAILURE
        }
    }
}
