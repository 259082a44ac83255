//! Token descriptors and catalogs.
//!
//! The zap works over a fixed family of tokens. Two catalogs describe which
//! tokens may be used as the input side and which may be produced as the
//! output side. The catalogs overlap but are not identical, and are never
//! mutated after start-up.

use crate::amount::DEFAULT_DECIMALS;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// A single swappable token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenDescriptor {
	/// Contract address, unique within a catalog.
	pub address: Address,
	/// Display symbol.
	pub symbol: String,
	/// Decimal precision. Every token in the yCRV family uses 18.
	#[serde(default = "default_decimals")]
	pub decimals: u8,
}

fn default_decimals() -> u8 {
	DEFAULT_DECIMALS
}

impl TokenDescriptor {
	pub fn new(address: Address, symbol: impl Into<String>) -> Self {
		Self {
			address,
			symbol: symbol.into(),
			decimals: DEFAULT_DECIMALS,
		}
	}
}

/// Which catalog a lookup applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSide {
	Input,
	Output,
}

/// The static input and output token catalogs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCatalog {
	/// Tokens that may be zapped from.
	#[serde(default, rename = "input")]
	pub inputs: Vec<TokenDescriptor>,
	/// Tokens that may be zapped into.
	#[serde(default, rename = "output")]
	pub outputs: Vec<TokenDescriptor>,
}

impl TokenCatalog {
	pub fn new(inputs: Vec<TokenDescriptor>, outputs: Vec<TokenDescriptor>) -> Self {
		Self { inputs, outputs }
	}

	/// Returns the tokens of one side of the catalog.
	pub fn side(&self, side: CatalogSide) -> &[TokenDescriptor] {
		match side {
			CatalogSide::Input => &self.inputs,
			CatalogSide::Output => &self.outputs,
		}
	}

	pub fn is_input(&self, address: &Address) -> bool {
		self.inputs.iter().any(|t| t.address == *address)
	}

	pub fn is_output(&self, address: &Address) -> bool {
		self.outputs.iter().any(|t| t.address == *address)
	}

	/// Finds a token by address in either catalog.
	pub fn get(&self, address: &Address) -> Option<&TokenDescriptor> {
		self.inputs
			.iter()
			.chain(self.outputs.iter())
			.find(|t| t.address == *address)
	}

	/// Returns the display symbol for an address, falling back to the
	/// checksummed address for tokens outside the catalog.
	pub fn symbol_of(&self, address: &Address) -> String {
		self.get(address)
			.map(|t| t.symbol.clone())
			.unwrap_or_else(|| address.to_checksum(None))
	}

	/// Resolves a user supplied reference, either a hex address or a symbol
	/// (case-insensitive), against one side of the catalog.
	pub fn resolve(&self, side: CatalogSide, reference: &str) -> Option<&TokenDescriptor> {
		let tokens = self.side(side);
		let reference = reference.trim();
		if let Ok(address) = reference.parse::<Address>() {
			return tokens.iter().find(|t| t.address == address);
		}
		tokens
			.iter()
			.find(|t| t.symbol.eq_ignore_ascii_case(reference))
	}

	/// All distinct token addresses, inputs first, in catalog order.
	///
	/// This is the list the batched balance read is issued for.
	pub fn union_addresses(&self) -> Vec<Address> {
		let mut addresses: Vec<Address> = Vec::with_capacity(self.inputs.len() + self.outputs.len());
		for token in self.inputs.iter().chain(self.outputs.iter()) {
			if !addresses.contains(&token.address) {
				addresses.push(token.address);
			}
		}
		addresses
	}
}
