//! Transaction delivery module for the yCRV zap client.
//!
//! This module handles contract reads, the submission of signed transactions
//! and the monitoring of their confirmation. The `DeliveryInterface` trait is
//! the seam between the zap logic and the chain; `AlloyDelivery` is the
//! production implementation.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use zap_types::{truncate_hash, TransactionReceipt, TxHash};

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

pub use implementations::evm::alloy::AlloyDelivery;

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a transaction execution fails.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// A transaction was requested but no signing key is configured.
	#[error("No signer configured")]
	NoSigner,
	/// The transaction was not confirmed in time.
	#[error("Timed out: {0}")]
	Timeout(String),
}

/// Trait defining the interface for transaction delivery implementations.
///
/// Implementations are bound to a single chain and a single account.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait DeliveryInterface: Send + Sync {
	/// Returns the account this delivery acts for, if any.
	///
	/// A watch-only configuration returns its address even though it cannot
	/// sign.
	fn sender(&self) -> Option<Address>;

	/// Executes a contract call without sending a transaction.
	async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError>;

	/// Signs and submits a transaction calling `to` with `data`.
	///
	/// Returns the transaction hash as soon as the node accepted it.
	async fn submit(&self, to: Address, data: Bytes) -> Result<TxHash, DeliveryError>;

	/// Waits until the transaction has the given number of confirmations and
	/// returns its receipt.
	///
	/// A reverted transaction is returned with `success = false`.
	async fn wait_for_confirmation(
		&self,
		hash: TxHash,
		confirmations: u64,
		timeout: Duration,
	) -> Result<TransactionReceipt, DeliveryError>;

	/// Retrieves the receipt for a transaction if it has been mined.
	async fn get_receipt(&self, hash: TxHash) -> Result<TransactionReceipt, DeliveryError>;
}

/// Service that wraps a delivery implementation together with the
/// confirmation settings of the configured network.
pub struct DeliveryService {
	implementation: Arc<dyn DeliveryInterface>,
	/// Number of confirmations required for transactions.
	confirmations: u64,
	/// Timeout for transaction monitoring.
	confirmation_timeout: Duration,
}

impl DeliveryService {
	/// Creates a new DeliveryService.
	pub fn new(
		implementation: Arc<dyn DeliveryInterface>,
		confirmations: u64,
		confirmation_timeout: Duration,
	) -> Self {
		Self {
			implementation,
			confirmations,
			confirmation_timeout,
		}
	}

	/// Returns the account transactions are sent from.
	pub fn sender(&self) -> Option<Address> {
		self.implementation.sender()
	}

	/// Executes a read-only contract call.
	pub async fn contract_call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		self.implementation.eth_call(to, data).await
	}

	/// Submits a transaction and returns its hash.
	pub async fn deliver(&self, to: Address, data: Bytes) -> Result<TxHash, DeliveryError> {
		tracing::debug!(to = %to, data_len = data.len(), "Submitting transaction");
		let hash = self.implementation.submit(to, data).await.map_err(|e| {
			tracing::warn!(to = %to, error = %e, "Transaction submission failed");
			e
		})?;
		tracing::info!(tx_hash = %truncate_hash(&hash), "Transaction submitted");
		Ok(hash)
	}

	/// Waits for the configured number of confirmations.
	pub async fn confirm(&self, hash: TxHash) -> Result<TransactionReceipt, DeliveryError> {
		let receipt = self
			.implementation
			.wait_for_confirmation(hash, self.confirmations, self.confirmation_timeout)
			.await?;

		if receipt.success {
			tracing::info!(
				tx_hash = %truncate_hash(&hash),
				block = receipt.block_number,
				"Transaction confirmed"
			);
		} else {
			tracing::warn!(
				tx_hash = %truncate_hash(&hash),
				block = receipt.block_number,
				"Transaction reverted"
			);
		}
		Ok(receipt)
	}
}
