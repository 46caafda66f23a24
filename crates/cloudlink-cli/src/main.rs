use cloudlink_core::logging;

mod cli;

use crate::cli::CliCommand;

fn main() {
    // Log to the state-dir file; fall back to stderr when it cannot be opened.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = CliCommand::run_from_args() {
        eprintln!("cloudlink error: {:#}", err);
        std::process::exit(1);
    }
}
