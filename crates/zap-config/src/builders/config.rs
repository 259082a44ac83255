//! Configuration builder for creating test and development configurations.
//!
//! The defaults describe a small but complete mainnet-shaped catalog, so a
//! bare `ConfigBuilder::new().build()` passes validation.

use crate::{
	AccountConfig, Config, ForcedOutput, NetworkConfig, ZapConfig, DEFAULT_MULTICALL_ADDRESS,
};
use alloy_primitives::{address, Address};
use zap_types::{SecretString, TokenCatalog, TokenDescriptor};

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	chain_id: u64,
	rpc_url: String,
	confirmations: u64,
	confirmation_timeout_seconds: u64,
	poll_interval_ms: u64,
	private_key: Option<String>,
	account_address: Option<Address>,
	router_address: Address,
	staking_token: Address,
	slippage_bps: u32,
	debounce_ms: u64,
	one_to_one: Vec<Address>,
	forced_outputs: Vec<ForcedOutput>,
	tokens: TokenCatalog,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		let crv = address!("D533a949740bb3306d119CC777fa900bA034cd52");
		let ycrv = address!("FCc5c47bE19d06BF83eB04298b026F81069ff65b");
		let ybs = address!("E9A115b77A1057C918F997c32663FdcE24FB873f");
		let lp_v1 = address!("c97232527B62eFb0D8ed38CF3EA103A6CcA4037e");
		let lp_v2 = address!("6E9455D109202b426169F0d8f01A3332DAE160f3");

		let tokens = TokenCatalog::new(
			vec![
				TokenDescriptor::new(ycrv, "yCRV"),
				TokenDescriptor::new(crv, "CRV"),
				TokenDescriptor::new(lp_v1, "lp-yCRVv1"),
				TokenDescriptor::new(lp_v2, "lp-yCRVv2"),
				TokenDescriptor::new(ybs, "YBS"),
			],
			vec![
				TokenDescriptor::new(ycrv, "yCRV"),
				TokenDescriptor::new(lp_v2, "lp-yCRVv2"),
				TokenDescriptor::new(ybs, "YBS"),
			],
		);

		Self {
			chain_id: 1,
			rpc_url: "http://localhost:8545".to_string(),
			confirmations: 1,
			confirmation_timeout_seconds: 600,
			poll_interval_ms: 4000,
			private_key: None,
			account_address: None,
			router_address: address!("5271058928d31b6204fc95eee15fe9fbbdca681a"),
			staking_token: ybs,
			slippage_bps: 3,
			debounce_ms: 500,
			one_to_one: vec![ycrv, ybs],
			forced_outputs: vec![ForcedOutput {
				input: lp_v1,
				output: lp_v2,
			}],
			tokens,
		}
	}

	/// Sets the chain id.
	pub fn chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = chain_id;
		self
	}

	/// Sets the RPC endpoint.
	pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
		self.rpc_url = url.into();
		self
	}

	/// Sets the confirmations to wait for.
	pub fn confirmations(mut self, confirmations: u64) -> Self {
		self.confirmations = confirmations;
		self
	}

	/// Sets the private key used for signing.
	pub fn private_key(mut self, key: impl Into<String>) -> Self {
		self.private_key = Some(key.into());
		self
	}

	/// Sets a watch-only account address.
	pub fn account_address(mut self, address: Address) -> Self {
		self.account_address = Some(address);
		self
	}

	/// Sets the zap router address.
	pub fn router_address(mut self, address: Address) -> Self {
		self.router_address = address;
		self
	}

	/// Sets the staking token.
	pub fn staking_token(mut self, address: Address) -> Self {
		self.staking_token = address;
		self
	}

	/// Sets the slippage tolerance in basis points.
	pub fn slippage_bps(mut self, bps: u32) -> Self {
		self.slippage_bps = bps;
		self
	}

	/// Sets the quote debounce in milliseconds.
	pub fn debounce_ms(mut self, ms: u64) -> Self {
		self.debounce_ms = ms;
		self
	}

	/// Replaces the one-to-one token set.
	pub fn one_to_one(mut self, tokens: Vec<Address>) -> Self {
		self.one_to_one = tokens;
		self
	}

	/// Adds a forced-output entry.
	pub fn forced_output(mut self, input: Address, output: Address) -> Self {
		self.forced_outputs.push(ForcedOutput { input, output });
		self
	}

	/// Replaces the token catalog.
	pub fn tokens(mut self, tokens: TokenCatalog) -> Self {
		self.tokens = tokens;
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		Config {
			network: NetworkConfig {
				chain_id: self.chain_id,
				rpc_url: self.rpc_url,
				multicall_address: DEFAULT_MULTICALL_ADDRESS,
				confirmations: self.confirmations,
				confirmation_timeout_seconds: self.confirmation_timeout_seconds,
				poll_interval_ms: self.poll_interval_ms,
			},
			account: AccountConfig {
				private_key: self.private_key.map(SecretString::from),
				address: self.account_address,
			},
			zap: ZapConfig {
				router_address: self.router_address,
				staking_token: self.staking_token,
				slippage_bps: self.slippage_bps,
				debounce_ms: self.debounce_ms,
				one_to_one: self.one_to_one,
				forced_outputs: self.forced_outputs,
			},
			tokens: self.tokens,
		}
	}
}
