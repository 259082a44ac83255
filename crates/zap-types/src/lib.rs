//! Common types for the yCRV zap client.
//!
//! This crate defines the data types shared by every other crate in the
//! workspace: token descriptors and catalogs, fixed-precision amount handling,
//! transaction receipts, swap phases and the events published while a swap
//! is being driven.

/// Fixed-precision amount parsing and formatting.
pub mod amount;
/// Transaction types for chain interactions.
pub mod delivery;
/// Event types published by the orchestrator.
pub mod events;
/// Secure string type for handling private keys.
pub mod secret_string;
/// Swap phases, approval sides and the primary action.
pub mod swap;
/// Token descriptors and the static token catalog.
pub mod tokens;
/// Utility functions for formatting.
pub mod utils;

pub use amount::{
	format_amount, format_amount_truncated, parse_amount, AmountError, DEFAULT_DECIMALS,
};
pub use delivery::{TransactionKind, TransactionReceipt};
pub use events::ZapEvent;
pub use secret_string::SecretString;
pub use swap::{ActionLabel, ApprovalSide, ApprovalStatus, Phase, PrimaryAction};
pub use tokens::{CatalogSide, TokenCatalog, TokenDescriptor};
pub use utils::{truncate_hash, with_0x_prefix, without_0x_prefix};

/// Re-export of the primitive types used across the workspace.
pub use alloy_primitives::{Address, TxHash, B256, U256};
