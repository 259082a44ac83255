//! Command-line argument definitions.

pub mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Zap between CRV, yCRV and the yCRV staking and liquidity tokens.
#[derive(Parser, Debug)]
#[command(name = "ycrv-zap", author, version, about, long_about = None)]
pub struct Cli {
	/// Path to a TOML configuration file
	///
	/// When omitted the embedded Ethereum mainnet preset is used.
	#[arg(short, long, global = true, env = "ZAP_CONFIG")]
	pub config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, global = true, default_value = "warn")]
	pub log_level: String,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List the input and output token catalogs
	Tokens,

	/// Show the balance of every catalog token
	Balances {
		/// Account to read, defaults to the configured account
		#[arg(long)]
		account: Option<String>,
	},

	/// Quote the expected and minimum output of a zap
	Quote(PairArgs),

	/// Show the phase, approvals and primary action for a zap
	Status(PairArgs),

	/// Approve and execute a zap until it is confirmed
	Zap {
		#[command(flatten)]
		pair: PairArgs,

		/// Send the transactions instead of printing the plan
		#[arg(short, long)]
		yes: bool,
	},
}

/// Token pair and amount shared by the swap commands.
#[derive(Args, Debug, Clone)]
pub struct PairArgs {
	/// Input token symbol or address
	#[arg(long)]
	pub from: String,

	/// Output token symbol or address
	#[arg(long)]
	pub to: String,

	/// Amount of the input token, in whole units (e.g. 1.5)
	#[arg(long)]
	pub amount: String,
}
