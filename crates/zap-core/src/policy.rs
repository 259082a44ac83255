//! Swap policy derived from the static configuration.
//!
//! Holds the catalog and the business rules that depend only on token
//! identity: minimum-output computation, forced outputs, the alternate output
//! used when a pair collapses, and the approval mechanism per token.

use crate::approval::ApprovalChecker;
use alloy_primitives::{Address, U256};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use zap_config::Config;
use zap_types::TokenCatalog;

const BPS_DENOMINATOR: u64 = 10_000;

/// Token rules shared by the state machine and the orchestrator.
#[derive(Debug, Clone)]
pub struct ZapPolicy {
	pub router: Address,
	pub catalog: TokenCatalog,
	pub staking_token: Address,
	pub one_to_one: HashSet<Address>,
	pub forced_outputs: HashMap<Address, Address>,
	pub slippage_bps: u32,
	pub debounce: Duration,
}

impl ZapPolicy {
	pub fn from_config(config: &Config) -> Self {
		Self {
			router: config.zap.router_address,
			catalog: config.tokens.clone(),
			staking_token: config.zap.staking_token,
			one_to_one: config.zap.one_to_one.iter().copied().collect(),
			forced_outputs: config
				.zap
				.forced_outputs
				.iter()
				.map(|entry| (entry.input, entry.output))
				.collect(),
			slippage_bps: config.zap.slippage_bps,
			debounce: Duration::from_millis(config.zap.debounce_ms),
		}
	}

	/// Whether a swap between the two tokens is exempt from the slippage
	/// haircut.
	pub fn is_one_to_one(&self, input: &Address, output: &Address) -> bool {
		self.one_to_one.contains(input) && self.one_to_one.contains(output)
	}

	/// Computes the minimum acceptable output for a quoted `expected_out`.
	///
	/// Pegged pairs keep the quote as is, every other pair loses
	/// `slippage_bps` (floored). A staking token output is lowered by one
	/// more unit to absorb its share rounding.
	pub fn min_out(&self, input: &Address, output: &Address, expected_out: U256) -> U256 {
		let mut min_out = if self.is_one_to_one(input, output) {
			expected_out
		} else {
			apply_slippage(expected_out, self.slippage_bps)
		};

		if *output == self.staking_token {
			min_out = min_out.saturating_sub(U256::from(1u64));
		}
		min_out
	}

	/// The single output an input is restricted to, if any.
	pub fn forced_output(&self, input: &Address) -> Option<Address> {
		self.forced_outputs.get(input).copied()
	}

	/// The output chosen when the selected output would equal `input`.
	pub fn alternate_output(&self, input: &Address) -> Option<Address> {
		if let Some(forced) = self.forced_output(input) {
			return Some(forced);
		}
		self.catalog
			.outputs
			.iter()
			.map(|token| token.address)
			.find(|address| address != input)
	}

	/// Output tokens selectable for `input`.
	pub fn selectable_outputs(&self, input: &Address) -> Vec<Address> {
		match self.forced_output(input) {
			Some(forced) => vec![forced],
			None => self
				.catalog
				.outputs
				.iter()
				.map(|token| token.address)
				.filter(|address| address != input)
				.collect(),
		}
	}

	/// Approval mechanism for `token`.
	pub fn approval_checker(&self, token: Address) -> ApprovalChecker {
		if token == self.staking_token {
			ApprovalChecker::PermissionCodeBased { token }
		} else {
			ApprovalChecker::AllowanceBased { token }
		}
	}

	/// Whether the router needs a second approval on the output side.
	pub fn requires_output_approval(&self, output: &Address) -> bool {
		*output == self.staking_token
	}

	pub fn symbol_of(&self, token: &Address) -> String {
		self.catalog.symbol_of(token)
	}
}

/// Floors `amount * (10000 - bps) / 10000` without overflowing.
fn apply_slippage(amount: U256, bps: u32) -> U256 {
	let denominator = U256::from(BPS_DENOMINATOR);
	let keep = U256::from(BPS_DENOMINATOR.saturating_sub(u64::from(bps)));
	let quotient = amount / denominator;
	let remainder = amount % denominator;
	quotient * keep + remainder * keep / denominator
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use zap_config::ConfigBuilder;

	const CRV: Address = address!("D533a949740bb3306d119CC777fa900bA034cd52");
	const YCRV: Address = address!("FCc5c47bE19d06BF83eB04298b026F81069ff65b");
	const YBS: Address = address!("E9A115b77A1057C918F997c32663FdcE24FB873f");
	const YVECRV: Address = address!("c5bDdf9843308380375a611c18B50Fb9341f502A");
	const LP_V1: Address = address!("c97232527B62eFb0D8ed38CF3EA103A6CcA4037e");
	const LP_V2: Address = address!("6E9455D109202b426169F0d8f01A3332DAE160f3");

	fn mainnet_policy() -> ZapPolicy {
		ZapPolicy::from_config(&Config::mainnet().unwrap())
	}

	fn e18(units: u64) -> U256 {
		U256::from(units) * U256::from(10u64).pow(U256::from(18u64))
	}

	#[test]
	fn test_min_out_applies_slippage() {
		let policy = mainnet_policy();
		let min_out = policy.min_out(&CRV, &YCRV, e18(99));
		assert_eq!(min_out, U256::from(98_970_300_000_000_000_000u128));
	}

	#[test]
	fn test_min_out_one_to_one_staking_output() {
		let policy = mainnet_policy();
		let min_out = policy.min_out(&YVECRV, &YBS, e18(50));
		assert_eq!(min_out, e18(50) - U256::from(1u64));
	}

	#[test]
	fn test_min_out_staking_output_with_slippage() {
		let policy = mainnet_policy();
		let min_out = policy.min_out(&CRV, &YBS, U256::from(10_000u64));
		assert_eq!(min_out, U256::from(9_996u64));
	}

	#[test]
	fn test_min_out_one_to_one_is_exact() {
		let policy = mainnet_policy();
		let quote = U256::from(123_456_789u64);
		assert_eq!(policy.min_out(&YVECRV, &YCRV, quote), quote);
	}

	#[test]
	fn test_min_out_floors() {
		let policy = mainnet_policy();
		// 1 * 0.9997 floors to zero.
		assert_eq!(policy.min_out(&CRV, &YCRV, U256::from(1u64)), U256::ZERO);
		assert_eq!(policy.min_out(&CRV, &YBS, U256::ZERO), U256::ZERO);
	}

	#[test]
	fn test_apply_slippage_does_not_overflow() {
		let expected: U256 =
			"115757351610545000564943913713185301480914003670240871870245746732710755701043"
				.parse()
				.unwrap();
		assert_eq!(apply_slippage(U256::MAX, 3), expected);
	}

	#[test]
	fn test_forced_output_table() {
		let policy = mainnet_policy();
		assert_eq!(policy.forced_output(&LP_V1), Some(LP_V2));
		assert_eq!(policy.forced_output(&CRV), None);
		assert_eq!(policy.selectable_outputs(&LP_V1), vec![LP_V2]);
	}

	#[test]
	fn test_alternate_output_differs_from_input() {
		let policy = mainnet_policy();
		for token in &policy.catalog.inputs {
			let alternate = policy.alternate_output(&token.address).unwrap();
			assert_ne!(alternate, token.address);
			assert!(policy.catalog.is_output(&alternate));
		}
		// yCRV is the first output, so it falls through to the next one.
		assert_ne!(policy.alternate_output(&YCRV), Some(YCRV));
	}

	#[test]
	fn test_approval_checker_selection() {
		let policy = mainnet_policy();
		assert_eq!(
			policy.approval_checker(YBS),
			ApprovalChecker::PermissionCodeBased { token: YBS }
		);
		assert_eq!(
			policy.approval_checker(CRV),
			ApprovalChecker::AllowanceBased { token: CRV }
		);
		assert!(policy.requires_output_approval(&YBS));
		assert!(!policy.requires_output_approval(&YCRV));
	}

	#[test]
	fn test_custom_slippage() {
		let policy = ZapPolicy::from_config(&ConfigBuilder::new().slippage_bps(100).build());
		assert_eq!(
			policy.min_out(&CRV, &YCRV, U256::from(1_000u64)),
			U256::from(990u64)
		);
	}
}
