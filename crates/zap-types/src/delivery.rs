//! Transaction types for chain interactions.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// Hash of the transaction.
	pub hash: B256,
	/// Block the transaction was included in.
	pub block_number: u64,
	/// Whether execution succeeded. `false` means the transaction reverted.
	pub success: bool,
}

/// The transactions the zap client submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
	/// Approval allowing the router to pull the input token.
	ApproveInput,
	/// Approval allowing the router to deposit into the staking token.
	ApproveOutput,
	/// The zap itself.
	Swap,
}

impl TransactionKind {
	pub fn is_approval(&self) -> bool {
		matches!(self, TransactionKind::ApproveInput | TransactionKind::ApproveOutput)
	}
}

impl fmt::Display for TransactionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransactionKind::ApproveInput => write!(f, "approve-input"),
			TransactionKind::ApproveOutput => write!(f, "approve-output"),
			TransactionKind::Swap => write!(f, "swap"),
		}
	}
}
