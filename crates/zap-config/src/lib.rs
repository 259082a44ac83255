//! Configuration module for the yCRV zap client.
//!
//! This module provides the configuration structures for the zap client and
//! utilities to load them from TOML. Values of the form `${VAR}` or
//! `${VAR:-default}` are resolved from the environment before parsing, so
//! secrets such as the private key never have to be written to disk.
//!
//! A complete mainnet preset is embedded in the binary and is used when no
//! configuration file is given.

pub mod builders;

pub use builders::config::ConfigBuilder;

use alloy_primitives::{address, Address};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use zap_types::{without_0x_prefix, SecretString, TokenCatalog, DEFAULT_DECIMALS};

/// Embedded Ethereum mainnet preset.
const MAINNET_PRESET: &str = include_str!("../presets/mainnet.toml");

/// Canonical Multicall3 deployment, identical on every EVM chain.
pub const DEFAULT_MULTICALL_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the zap client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Chain connection settings.
	pub network: NetworkConfig,
	/// Account used to read balances and sign transactions.
	#[serde(default)]
	pub account: AccountConfig,
	/// Router address and swap policy.
	pub zap: ZapConfig,
	/// Input and output token catalogs.
	pub tokens: TokenCatalog,
}

/// Chain connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Chain id used when signing transactions.
	pub chain_id: u64,
	/// HTTP JSON-RPC endpoint.
	pub rpc_url: String,
	/// Multicall3 contract used for the batched balance read.
	#[serde(default = "default_multicall_address")]
	pub multicall_address: Address,
	/// Confirmations to wait for before a transaction counts as mined.
	#[serde(default = "default_confirmations")]
	pub confirmations: u64,
	/// Upper bound on the wait for a confirmation, in seconds.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub confirmation_timeout_seconds: u64,
	/// Receipt polling interval in milliseconds.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
}

/// The account the client acts for.
///
/// With a private key the client can submit transactions. With only an
/// address it is watch-only. With neither it behaves as disconnected.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Hex-encoded private key, usually injected with `${ZAP_PRIVATE_KEY}`.
	#[serde(default)]
	pub private_key: Option<SecretString>,
	/// Watch-only account address.
	#[serde(default)]
	pub address: Option<Address>,
}

impl AccountConfig {
	/// Returns the private key if one was configured with a non-empty value.
	pub fn signing_key(&self) -> Option<&SecretString> {
		self.private_key.as_ref().filter(|key| !key.is_empty())
	}
}

/// Router address and swap policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZapConfig {
	/// The zap router all quotes and swaps go through.
	pub router_address: Address,
	/// The staking-derived token that uses permission codes instead of
	/// allowances and needs a second approval when used as output.
	pub staking_token: Address,
	/// Slippage tolerance in basis points (3 = 0.03%).
	#[serde(default = "default_slippage_bps")]
	pub slippage_bps: u32,
	/// Quiet period before a typed amount is quoted, in milliseconds.
	#[serde(default = "default_debounce_ms")]
	pub debounce_ms: u64,
	/// Tokens pegged 1:1 with each other; swaps between two of them get no
	/// slippage haircut.
	#[serde(default)]
	pub one_to_one: Vec<Address>,
	/// Inputs that may only be zapped into one specific output.
	#[serde(default)]
	pub forced_outputs: Vec<ForcedOutput>,
}

/// A single entry of the forced-output table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ForcedOutput {
	pub input: Address,
	pub output: Address,
}

fn default_multicall_address() -> Address {
	DEFAULT_MULTICALL_ADDRESS
}

fn default_confirmations() -> u64 {
	1
}

fn default_confirmation_timeout_seconds() -> u64 {
	600 // 10 minutes
}

fn default_poll_interval_ms() -> u64 {
	4000
}

fn default_slippage_bps() -> u32 {
	3 // 0.03%
}

fn default_debounce_ms() -> u64 {
	500
}

/// Substitutes `${VAR}` and `${VAR:-default}` references in the raw TOML.
///
/// The mainnet preset relies on it for `ZAP_RPC_URL` (falling back to a
/// public endpoint) and `ZAP_PRIVATE_KEY` (falling back to an empty key,
/// which leaves the client watch-only). A reference without a default to an
/// unset variable is a validation error.
///
/// Input is limited to 1MB to bound the regex scan.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {e}")))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file.
	///
	/// Environment variables referenced in the file are resolved before
	/// parsing and the result is validated.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await?;
		tracing::debug!(path = %path.display(), "Loaded configuration file");
		content.parse()
	}

	/// Returns the embedded Ethereum mainnet configuration.
	pub fn mainnet() -> Result<Self, ConfigError> {
		MAINNET_PRESET.parse()
	}

	/// Validates the configuration.
	///
	/// Checks that:
	/// - the RPC URL is set
	/// - both catalogs are non-empty with unique addresses and 18 decimals
	/// - the staking token is an output token
	/// - forced outputs map input-catalog tokens to distinct output-catalog tokens
	/// - one-to-one tokens belong to the catalog
	/// - slippage is at most 100%
	/// - the private key, if set, is 32 bytes of hex
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.network.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation("network.rpc_url cannot be empty".into()));
		}

		if self.tokens.inputs.is_empty() {
			return Err(ConfigError::Validation(
				"At least one input token must be configured".into(),
			));
		}
		if self.tokens.outputs.is_empty() {
			return Err(ConfigError::Validation(
				"At least one output token must be configured".into(),
			));
		}

		for (name, tokens) in [("input", &self.tokens.inputs), ("output", &self.tokens.outputs)] {
			let mut seen = HashSet::new();
			for token in tokens {
				if !seen.insert(token.address) {
					return Err(ConfigError::Validation(format!(
						"Duplicate {name} token {}",
						token.address
					)));
				}
				if token.decimals != DEFAULT_DECIMALS {
					return Err(ConfigError::Validation(format!(
						"Token {} must use {} decimals, got {}",
						token.symbol, DEFAULT_DECIMALS, token.decimals
					)));
				}
			}
		}

		if !self.tokens.is_output(&self.zap.staking_token) {
			return Err(ConfigError::Validation(format!(
				"Staking token {} must be an output token",
				self.zap.staking_token
			)));
		}

		let mut forced_inputs = HashSet::new();
		for forced in &self.zap.forced_outputs {
			if !self.tokens.is_input(&forced.input) {
				return Err(ConfigError::Validation(format!(
					"Forced output entry references unknown input token {}",
					forced.input
				)));
			}
			if !self.tokens.is_output(&forced.output) {
				return Err(ConfigError::Validation(format!(
					"Forced output entry references unknown output token {}",
					forced.output
				)));
			}
			if forced.input == forced.output {
				return Err(ConfigError::Validation(format!(
					"Forced output for {} cannot be the token itself",
					forced.input
				)));
			}
			if !forced_inputs.insert(forced.input) {
				return Err(ConfigError::Validation(format!(
					"Input {} has more than one forced output",
					forced.input
				)));
			}
		}

		for token in &self.zap.one_to_one {
			if self.tokens.get(token).is_none() {
				return Err(ConfigError::Validation(format!(
					"One-to-one token {token} is not in the catalog"
				)));
			}
		}

		if self.zap.slippage_bps > 10_000 {
			return Err(ConfigError::Validation(format!(
				"slippage_bps must be at most 10000, got {}",
				self.zap.slippage_bps
			)));
		}

		if let Some(key) = self.account.signing_key() {
			key.with_exposed(|raw| {
				let hex = without_0x_prefix(raw.trim());
				if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
					return Err(ConfigError::Validation(
						"Private key must be 64 hex characters (32 bytes)".into(),
					));
				}
				Ok(())
			})?;
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	const YBS: Address = address!("E9A115b77A1057C918F997c32663FdcE24FB873f");
	const LP_V1: Address = address!("c97232527B62eFb0D8ed38CF3EA103A6CcA4037e");
	const LP_V2: Address = address!("6E9455D109202b426169F0d8f01A3332DAE160f3");

	#[test]
	fn test_mainnet_preset_loads() {
		let config = Config::mainnet().unwrap();
		assert_eq!(config.network.chain_id, 1);
		assert_eq!(config.tokens.inputs.len(), 10);
		assert_eq!(config.tokens.outputs.len(), 4);
		assert_eq!(config.zap.staking_token, YBS);
		assert_eq!(config.zap.slippage_bps, 3);
		assert_eq!(config.zap.debounce_ms, 500);
		assert_eq!(config.zap.one_to_one.len(), 5);
		assert_eq!(
			config.zap.forced_outputs,
			vec![ForcedOutput {
				input: LP_V1,
				output: LP_V2
			}]
		);
		assert_eq!(config.network.multicall_address, DEFAULT_MULTICALL_ADDRESS);
	}

	#[test]
	fn test_env_var_resolution_with_default() {
		let resolved = resolve_env_vars("url = \"${ZAP_TEST_UNSET_VAR:-http://localhost:8545}\"")
			.unwrap();
		assert_eq!(resolved, "url = \"http://localhost:8545\"");
	}

	#[test]
	fn test_env_var_resolution_with_empty_default() {
		let resolved = resolve_env_vars("key = \"${ZAP_TEST_UNSET_KEY:-}\"").unwrap();
		assert_eq!(resolved, "key = \"\"");
	}

	#[test]
	fn test_env_var_resolution_missing_without_default() {
		let result = resolve_env_vars("key = \"${ZAP_TEST_DEFINITELY_MISSING}\"");
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_empty_private_key_is_ignored() {
		let config = ConfigBuilder::new().private_key("").build();
		assert!(config.account.signing_key().is_none());
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_invalid_private_key_rejected() {
		let config = ConfigBuilder::new().private_key("0x1234").build();
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("64 hex characters"));
	}

	#[test]
	fn test_staking_token_must_be_output() {
		let config = ConfigBuilder::new()
			.staking_token(address!("D533a949740bb3306d119CC777fa900bA034cd52"))
			.build();
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("must be an output token"));
	}

	#[test]
	fn test_forced_output_must_reference_catalog() {
		let config = ConfigBuilder::new()
			.forced_output(
				address!("1111111111111111111111111111111111111111"),
				LP_V2,
			)
			.build();
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("unknown input token"));
	}

	#[test]
	fn test_slippage_bounds() {
		let config = ConfigBuilder::new().slippage_bps(10_001).build();
		assert!(config.validate().is_err());
		let config = ConfigBuilder::new().slippage_bps(10_000).build();
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_parse_error_is_compact() {
		let err = "[network]\nchain_id = \"one\"".parse::<Config>().unwrap_err();
		match err {
			ConfigError::Parse(message) => assert!(!message.contains("[network]")),
			other => panic!("Expected parse error, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_from_file() {
		let dir = std::env::temp_dir().join(format!("zap-config-test-{}", std::process::id()));
		tokio::fs::create_dir_all(&dir).await.unwrap();
		let path = dir.join("zap.toml");
		tokio::fs::write(&path, MAINNET_PRESET).await.unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.zap.staking_token, YBS);

		tokio::fs::remove_dir_all(&dir).await.unwrap();
	}

	#[tokio::test]
	async fn test_from_file_missing() {
		let result = Config::from_file("/nonexistent/zap.toml").await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}
}
