//! Accord - blueprint-driven contract management

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = accord_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
