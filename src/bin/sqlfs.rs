//! SqlFs CLI Binary
//!
//! Command-line interface for a directory tree stored in one SQLite file.

use clap::Parser;
use sqlfs::config::paths::xdg_root;
use sqlfs::config::ConfigLoader;
use sqlfs::logging::init_logging;
use sqlfs::tooling::cli::{Cli, CliContext};
use std::process;

fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(Some(&cli.logging_config(&config.logging))) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let store = match cli.store.clone().map(Ok).unwrap_or_else(xdg_root::default_store_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error resolving store location: {}", e);
            process::exit(1);
        }
    };

    let context = match CliContext::new(&store, config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error opening store {}: {}", store.display(), e);
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
