//! Swap phases and the primary action.
//!
//! The phase is never stored. It is derived from the swap state every time it
//! is needed, and the primary action label and enablement are a pure function
//! of it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the pair an approval concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalSide {
	Input,
	Output,
}

/// Known approval state of one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApprovalStatus {
	/// Nothing is known yet.
	#[default]
	Unknown,
	/// A read is outstanding.
	Checking,
	/// The router may move the token.
	Approved,
	/// The router may not move the token, or the read failed.
	NotApproved,
	/// This side does not need an approval.
	NotRequired,
}

impl ApprovalStatus {
	/// Whether this side lets the swap proceed.
	pub fn is_satisfied(&self) -> bool {
		matches!(self, ApprovalStatus::Approved | ApprovalStatus::NotRequired)
	}
}

/// Behaviorally distinct points of the swap flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
	/// No account bound.
	Disconnected,
	/// Connected, but no usable amount or no valid pair.
	Idle,
	/// Waiting on a quote or an approval read.
	Quoting,
	/// The input token must be approved first.
	NeedsInputApproval,
	/// The staking token output must be approved first.
	NeedsOutputApproval,
	/// Quote available and every required approval satisfied.
	ReadyToSwap,
	/// An approval transaction is awaiting confirmation.
	ApprovalPending,
	/// The swap transaction is awaiting confirmation.
	SwapPending,
	/// The swap transaction was mined successfully.
	Confirmed,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Phase::Disconnected => "disconnected",
			Phase::Idle => "idle",
			Phase::Quoting => "quoting",
			Phase::NeedsInputApproval => "needs input approval",
			Phase::NeedsOutputApproval => "needs output approval",
			Phase::ReadyToSwap => "ready to swap",
			Phase::ApprovalPending => "approval pending",
			Phase::SwapPending => "swap pending",
			Phase::Confirmed => "confirmed",
		};
		write!(f, "{name}")
	}
}

/// Label of the single primary action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionLabel {
	ConnectWallet,
	ApproveInput,
	/// Carries the staking token symbol, e.g. "Approve YBS Output".
	ApproveOutput(String),
	Swap,
	Confirming,
}

impl fmt::Display for ActionLabel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ActionLabel::ConnectWallet => write!(f, "Connect Wallet"),
			ActionLabel::ApproveInput => write!(f, "Approve Input"),
			ActionLabel::ApproveOutput(symbol) => write!(f, "Approve {symbol} Output"),
			ActionLabel::Swap => write!(f, "Swap"),
			ActionLabel::Confirming => write!(f, "Confirming..."),
		}
	}
}

/// The primary action as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryAction {
	pub label: ActionLabel,
	pub enabled: bool,
}

impl PrimaryAction {
	pub fn enabled(label: ActionLabel) -> Self {
		Self {
			label,
			enabled: true,
		}
	}

	pub fn disabled(label: ActionLabel) -> Self {
		Self {
			label,
			enabled: false,
		}
	}
}
