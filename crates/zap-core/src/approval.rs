//! Approval checks for the two token kinds.
//!
//! Standard tokens authorise the router with an ERC-20 allowance. The staking
//! token authorises it with a permission code. Which mechanism applies is
//! decided once per token, so the rest of the flow only sees
//! `is_approved` and `approve`.

use crate::contracts::{ZapClient, APPROVED_CALLER_DEPOSIT_AND_WITHDRAW};
use crate::ZapError;
use alloy_primitives::{Address, U256};
use zap_types::TxHash;

/// Approval mechanism for a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalChecker {
	/// ERC-20 allowance. Approved when the allowance is non-zero.
	AllowanceBased { token: Address },
	/// Staking token permission code. Approved when the code grants deposit
	/// and withdraw rights.
	PermissionCodeBased { token: Address },
}

impl ApprovalChecker {
	pub fn token(&self) -> Address {
		match self {
			ApprovalChecker::AllowanceBased { token }
			| ApprovalChecker::PermissionCodeBased { token } => *token,
		}
	}

	/// Approval rule for an allowance read.
	pub fn allowance_is_satisfied(allowance: U256) -> bool {
		allowance > U256::ZERO
	}

	/// Approval rule for a permission code read.
	pub fn code_is_satisfied(code: u8) -> bool {
		code == APPROVED_CALLER_DEPOSIT_AND_WITHDRAW
	}

	/// Reads whether `spender` may move this token on behalf of `owner`.
	pub async fn is_approved(
		&self,
		client: &dyn ZapClient,
		owner: Address,
		spender: Address,
	) -> Result<bool, ZapError> {
		match *self {
			ApprovalChecker::AllowanceBased { token } => {
				let allowance = client.allowance(token, owner, spender).await?;
				tracing::debug!(token = %token, allowance = %allowance, "Read allowance");
				Ok(Self::allowance_is_satisfied(allowance))
			},
			ApprovalChecker::PermissionCodeBased { token } => {
				let code = client.approved_caller(token, owner, spender).await?;
				tracing::debug!(token = %token, code, "Read approved caller code");
				Ok(Self::code_is_satisfied(code))
			},
		}
	}

	/// Submits the transaction granting `spender` full rights over this token.
	pub async fn approve(
		&self,
		client: &dyn ZapClient,
		spender: Address,
	) -> Result<TxHash, ZapError> {
		match *self {
			ApprovalChecker::AllowanceBased { token } => {
				client.approve(token, spender, U256::MAX).await
			},
			ApprovalChecker::PermissionCodeBased { token } => {
				client
					.set_approved_caller(token, spender, APPROVED_CALLER_DEPOSIT_AND_WITHDRAW)
					.await
			},
		}
	}
}
