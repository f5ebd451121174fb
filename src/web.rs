#![cfg(not(tarpaulin_include))]

use clap::Parser;
use learnhub::app;
use learnhub::config::ServerConfig;

/// Main entry point for the web application
///
/// Reads the server settings from the command line and `LEARNHUB_*`
/// variables, sets up logging from `RUST_LOG` (`info` when unset) and serves the site until the
/// process is stopped.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - An error when the listener cannot bind
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    app::run(config).await
}
