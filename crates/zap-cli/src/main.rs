//! Command-line front end for the yCRV zap.
//!
//! Loads the configuration, connects to the configured chain and drives the
//! swap orchestrator from the terminal. Every command works against the
//! embedded mainnet preset when no configuration file is given.

mod cli;
mod commands;

use clap::Parser;
use cli::{output::Display, Cli};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	if let Err(e) = commands::run(cli).await {
		Display::error(&format!("{e:#}"));
		std::process::exit(1);
	}
}
