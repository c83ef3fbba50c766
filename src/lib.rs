/// # Range Server
///
/// A read-only static file server for very large binary images, built for
/// browser clients that read files in random-order byte ranges.
///
/// This library contains the core logic for the server. The `run` function
/// initializes logging and starts the server from command-line arguments.
pub mod cli;
pub mod content;
pub mod error;
pub mod fs;
pub mod http;
pub mod range;
pub mod resolver;
pub mod response;
pub mod server;
pub mod templates;
pub mod utils;


use crate::cli::Cli;
use clap::Parser;
use log::error;

/// Initializes the logger, parses command-line arguments, and starts the server.
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` selects debug output and
/// `--detailed-logging` selects info. If the server returns an error, it is
/// logged and the process exits.
pub fn run() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        "debug"
    } else if cli.detailed_logging {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::debug!("Log level set to: {log_level}");

    if let Err(e) = server::run_server(cli, None, None) {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
