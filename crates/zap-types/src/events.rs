//! Event types published while a swap is driven.
//!
//! Events flow through the orchestrator's event bus so that front ends can
//! render progress without polling the state.

use crate::{ApprovalSide, ApprovalStatus, Phase, TransactionKind};
use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZapEvent {
	/// The derived phase changed.
	PhaseChanged { from: Phase, to: Phase },
	/// A quote for the current pair and amount arrived.
	QuoteUpdated { expected_out: U256, min_out: U256 },
	/// A quote read failed; the previous minimum output is kept.
	QuoteFailed { error: String },
	/// An approval read completed.
	ApprovalChecked {
		side: ApprovalSide,
		status: ApprovalStatus,
	},
	/// A transaction was accepted by the node.
	TransactionSubmitted { kind: TransactionKind, hash: B256 },
	/// A transaction was mined successfully.
	TransactionConfirmed {
		kind: TransactionKind,
		hash: B256,
		block_number: u64,
	},
	/// A transaction could not be submitted, reverted, or was never confirmed.
	TransactionFailed {
		kind: TransactionKind,
		error: String,
	},
	/// The balance snapshot was re-read.
	BalancesRefreshed { success: bool },
	/// The primary action asked for an account to be connected.
	ConnectionRequested,
}
