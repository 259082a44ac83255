//! Alloy-based delivery implementation.
//!
//! Talks to a single EVM chain over HTTP JSON-RPC. Reads go through a plain
//! provider; when a private key is configured the provider also carries an
//! `EthereumWallet` so that `send_transaction` signs locally.

use crate::{DeliveryError, DeliveryInterface};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, Bytes};
use alloy_provider::{
	DynProvider, PendingTransactionConfig, PendingTransactionError, Provider, ProviderBuilder,
};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::layers::RetryBackoffLayer;
use async_trait::async_trait;
use std::time::Duration;
use zap_config::{AccountConfig, NetworkConfig};
use zap_types::{truncate_hash, without_0x_prefix, SecretString, TransactionReceipt, TxHash};

/// Alloy-based EVM delivery implementation.
pub struct AlloyDelivery {
	provider: DynProvider,
	/// Address of the signing key or the watch-only account.
	sender: Option<Address>,
	/// Whether the provider can sign transactions.
	can_sign: bool,
	chain_id: u64,
}

impl AlloyDelivery {
	/// Creates a new AlloyDelivery instance.
	///
	/// With a signer the provider signs transactions for `chain_id`. Without
	/// one, `watch_address` is reported as the sender and submissions fail
	/// with `DeliveryError::NoSigner`.
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		poll_interval: Duration,
		signer: Option<PrivateKeySigner>,
		watch_address: Option<Address>,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::Network(format!("Invalid RPC URL {rpc_url}: {e}")))?;

		// Configure retry layer for handling network errors and rate limits
		let retry_layer = RetryBackoffLayer::new(
			5,    // max_retry: retry up to 5 times
			1000, // backoff: initial backoff in milliseconds
			10,   // cups: compute units per second
		);
		let client = RpcClient::builder().layer(retry_layer).http(url);

		let (provider, sender, can_sign) = match signer {
			Some(signer) => {
				let address = signer.address();
				let wallet = EthereumWallet::from(signer.with_chain_id(Some(chain_id)));
				let provider = ProviderBuilder::new()
					.wallet(wallet)
					.connect_client(client);
				provider.client().set_poll_interval(poll_interval);
				(provider.erased(), Some(address), true)
			},
			None => {
				let provider = ProviderBuilder::new().connect_client(client);
				provider.client().set_poll_interval(poll_interval);
				(provider.erased(), watch_address, false)
			},
		};

		tracing::debug!(
			chain_id,
			sender = ?sender,
			can_sign,
			"Initialised Alloy delivery"
		);

		Ok(Self {
			provider,
			sender,
			can_sign,
			chain_id,
		})
	}

	/// Creates an AlloyDelivery from the network and account sections of the
	/// configuration.
	pub fn from_config(
		network: &NetworkConfig,
		account: &AccountConfig,
	) -> Result<Self, DeliveryError> {
		let signer = account.signing_key().map(parse_signer).transpose()?;
		Self::new(
			&network.rpc_url,
			network.chain_id,
			Duration::from_millis(network.poll_interval_ms),
			signer,
			account.address,
		)
	}

	/// Returns the chain this delivery is connected to.
	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}
}

/// Parses a hex private key, with or without `0x`.
pub fn parse_signer(key: &SecretString) -> Result<PrivateKeySigner, DeliveryError> {
	key.with_exposed(|raw| {
		without_0x_prefix(raw.trim())
			.parse::<PrivateKeySigner>()
			.map_err(|e| DeliveryError::Network(format!("Invalid private key: {e}")))
	})
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn sender(&self) -> Option<Address> {
		self.sender
	}

	async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		let mut request = TransactionRequest::default().to(to).input(data.into());
		if let Some(from) = self.sender {
			request = request.from(from);
		}

		self.provider
			.call(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to execute eth_call: {e}")))
	}

	async fn submit(&self, to: Address, data: Bytes) -> Result<TxHash, DeliveryError> {
		if !self.can_sign {
			return Err(DeliveryError::NoSigner);
		}
		let from = self.sender.ok_or(DeliveryError::NoSigner)?;

		let request = TransactionRequest::default()
			.from(from)
			.to(to)
			.input(data.into());

		tracing::debug!(
			chain_id = self.chain_id,
			to = %to,
			"Sending transaction"
		);

		// The provider's wallet handles signing
		let pending_tx = self.provider.send_transaction(request).await.map_err(|e| {
			tracing::error!(chain_id = self.chain_id, error = %e, "Transaction submission failed");
			DeliveryError::TransactionFailed(format!("Failed to send transaction: {e}"))
		})?;

		Ok(*pending_tx.tx_hash())
	}

	async fn wait_for_confirmation(
		&self,
		hash: TxHash,
		confirmations: u64,
		timeout: Duration,
	) -> Result<TransactionReceipt, DeliveryError> {
		tracing::info!(
			tx_hash = %truncate_hash(&hash),
			confirmations,
			timeout_secs = timeout.as_secs(),
			"Waiting for confirmation"
		);

		let config = PendingTransactionConfig::new(hash)
			.with_required_confirmations(confirmations)
			.with_timeout(Some(timeout));

		let pending_tx = self
			.provider
			.watch_pending_transaction(config)
			.await
			.map_err(|e| match e {
				PendingTransactionError::TxWatcher(_) => {
					DeliveryError::Timeout(format!("Transaction watch failed: {e}"))
				},
				PendingTransactionError::FailedToRegister => {
					DeliveryError::Network("Failed to register transaction watcher".to_string())
				},
				other => DeliveryError::Network(format!("Transaction watch failed: {other}")),
			})?;

		let confirmed_hash = pending_tx.await.map_err(|e| match e {
			PendingTransactionError::TxWatcher(_) => {
				DeliveryError::Timeout(format!("Transaction not confirmed: {e}"))
			},
			other => DeliveryError::Network(format!("Failed to confirm transaction: {other}")),
		})?;

		self.get_receipt(confirmed_hash).await
	}

	async fn get_receipt(&self, hash: TxHash) -> Result<TransactionReceipt, DeliveryError> {
		match self.provider.get_transaction_receipt(hash).await {
			Ok(Some(receipt)) => Ok(TransactionReceipt {
				hash: receipt.transaction_hash,
				block_number: receipt.block_number.unwrap_or(0),
				success: receipt.status(),
			}),
			Ok(None) => Err(DeliveryError::Network(format!(
				"Transaction {} not found on chain {}",
				truncate_hash(&hash),
				self.chain_id
			))),
			Err(e) => Err(DeliveryError::Network(format!(
				"Failed to get receipt on chain {}: {}",
				self.chain_id, e
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use zap_config::ConfigBuilder;

	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn create_test_signer() -> PrivateKeySigner {
		parse_signer(&SecretString::from(TEST_KEY)).unwrap()
	}

	#[tokio::test]
	async fn test_alloy_delivery_with_signer() {
		let signer = create_test_signer();
		let expected = signer.address();

		let delivery = AlloyDelivery::new(
			"http://localhost:8545",
			1,
			Duration::from_secs(4),
			Some(signer),
			None,
		)
		.unwrap();

		assert_eq!(delivery.sender(), Some(expected));
		assert_eq!(delivery.chain_id(), 1);
		assert!(delivery.can_sign);
	}

	#[tokio::test]
	async fn test_watch_only_cannot_submit() {
		let watched = Address::repeat_byte(0x11);
		let delivery = AlloyDelivery::new(
			"http://localhost:8545",
			1,
			Duration::from_secs(4),
			None,
			Some(watched),
		)
		.unwrap();

		assert_eq!(delivery.sender(), Some(watched));
		let result = delivery.submit(Address::ZERO, Bytes::new()).await;
		assert!(matches!(result, Err(DeliveryError::NoSigner)));
	}

	#[tokio::test]
	async fn test_invalid_rpc_url() {
		let result = AlloyDelivery::new("not a url", 1, Duration::from_secs(4), None, None);
		assert!(matches!(result, Err(DeliveryError::Network(_))));
	}

	#[tokio::test]
	async fn test_from_config_derives_sender_from_key() {
		let config = ConfigBuilder::new()
			.private_key(TEST_KEY.trim_start_matches("0x"))
			.build();

		let delivery = AlloyDelivery::from_config(&config.network, &config.account).unwrap();
		assert_eq!(delivery.sender(), Some(create_test_signer().address()));
	}

	#[test]
	fn test_parse_signer_rejects_garbage() {
		let result = parse_signer(&SecretString::from("0xnothex"));
		assert!(matches!(result, Err(DeliveryError::Network(_))));
	}
}
