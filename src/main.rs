//! Main entry point for the capsular_typer application.

// External Crate Imports
use capsular_typer::cli::{run_cli, Cli};
use clap::Parser;
use log::error;

/// Main function: parses arguments and runs the requested stage 1 workflow.
fn main() {
    // Initialize logging (RUST_LOG controls verbosity)
    env_logger::init();

    // Parse command line arguments
    let cli = Cli::parse();

    if let Err(e) = run_cli(cli) {
        error!("Stage 1 failed: {:?}", e);
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}
