//! Main entry point for tabsync CLI

use clap::Parser;
use tabsync::cli::Cli;
use tabsync::commands::{base_config, execute_command};

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG still overrides the default level
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let base = match base_config(cli.config.as_deref(), cli.root.as_deref()) {
        Ok(base) => base,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Execute the command
    if let Err(e) = execute_command(cli.command, base) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
