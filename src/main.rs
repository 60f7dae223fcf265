// src/main.rs

//! The main entry point for the lobbyd server application.

use anyhow::Result;
use lobbyd::config::Config;
use lobbyd::server::{self, dispatcher};
use std::env;
use std::path::Path;
use tracing::error;
use tracing_subscriber::{filter::EnvFilter, prelude::*};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    // Define version information.
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    // Collect command-line arguments to decide the execution mode.
    let args: Vec<String> = env::args().collect();

    // Handle the --version flag.
    if args.contains(&"--version".to_string()) {
        println!("lobbyd version {VERSION}");
        return Ok(());
    }

    let mut config = load_config(&args);

    // Override port if provided as a command-line argument
    if let Some(port_index) = args.iter().position(|arg| arg == "--port") {
        if let Some(port_str) = args.get(port_index + 1) {
            match port_str.parse::<u16>() {
                Ok(port) if port != 0 => config.port = port,
                _ => {
                    eprintln!("Invalid port number: {port_str}");
                    std::process::exit(1);
                }
            }
        } else {
            eprintln!("--port flag requires a value");
            std::process::exit(1);
        }
    }

    // Get the log level from the env var, falling back to the config.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());

    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact() // Use the compact, single-line format.
                .with_ansi(true), // Enable ANSI color codes for log levels.
        )
        .init();

    let runtime = dispatcher::build(config.worker_threads)?;
    if let Err(e) = runtime.block_on(server::run(config)) {
        error!("Server runtime error: {:#}", e);
        return Err(e);
    }
    Ok(())
}

/// Loads the configuration named by `--config`, or `config.toml` when present.
/// Falls back to built-in defaults if no file was named and none exists.
fn load_config(args: &[String]) -> Config {
    let explicit_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = match explicit_path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => DEFAULT_CONFIG_PATH,
        None => return Config::default(),
    };

    // The server cannot run without a valid configuration.
    match Config::from_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{config_path}\": {e:#}");
            std::process::exit(1);
        }
    }
}
