//! Balance snapshot for every token in the catalog.
//!
//! One batched read fetches the balance of the connected account (or the
//! zero address while disconnected) for the union of the input and output
//! catalogs. A failed read flags the error and keeps the previous snapshot.
//! Every refetch takes a generation number; only the latest one may touch
//! the snapshot, so a slow read for a previous account never lands on top of
//! a newer one.

use crate::contracts::ZapClient;
use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use zap_types::{format_amount_truncated, TokenCatalog};

/// Decimal places shown next to a balance.
const DISPLAY_PLACES: usize = 4;

#[derive(Debug, Default)]
struct SnapshotState {
	balances: HashMap<Address, U256>,
	loading: bool,
	error: bool,
	account: Address,
	/// Generation of the most recently issued refetch.
	generation: u64,
	/// Refetches that have not finished yet.
	in_flight: usize,
}

/// Shared handle to the latest balance snapshot.
#[derive(Clone)]
pub struct BalanceSnapshotProvider {
	client: Arc<dyn ZapClient>,
	tokens: Vec<Address>,
	decimals: HashMap<Address, u8>,
	state: Arc<RwLock<SnapshotState>>,
}

impl BalanceSnapshotProvider {
	pub fn new(client: Arc<dyn ZapClient>, catalog: &TokenCatalog) -> Self {
		let decimals = catalog
			.inputs
			.iter()
			.chain(catalog.outputs.iter())
			.map(|token| (token.address, token.decimals))
			.collect();

		Self {
			client,
			tokens: catalog.union_addresses(),
			decimals,
			state: Arc::new(RwLock::new(SnapshotState::default())),
		}
	}

	/// Re-runs the batched read for `account`.
	///
	/// Returns whether the read succeeded. A read superseded by a later
	/// refetch is discarded without touching the snapshot or the error flag.
	pub async fn refetch(&self, account: Option<Address>) -> bool {
		let owner = account.unwrap_or(Address::ZERO);
		let generation = {
			let mut state = self.state.write().await;
			state.generation += 1;
			state.in_flight += 1;
			state.loading = true;
			state.generation
		};

		let result = self.client.balances_of(self.tokens.clone(), owner).await;

		let mut state = self.state.write().await;
		state.in_flight = state.in_flight.saturating_sub(1);
		state.loading = state.in_flight > 0;

		if generation != state.generation {
			tracing::debug!(
				account = %owner,
				generation,
				latest = state.generation,
				"Discarding superseded balance read"
			);
			return result.is_ok();
		}

		match result {
			Ok(values) => {
				// A per-token failure keeps that token's previous balance.
				let account_changed = state.account != owner;
				if account_changed {
					state.balances.clear();
				}
				for (token, value) in self.tokens.iter().zip(values) {
					if let Some(balance) = value {
						state.balances.insert(*token, balance);
					}
				}
				state.account = owner;
				state.error = false;
				tracing::debug!(account = %owner, tokens = self.tokens.len(), "Refreshed balances");
				true
			},
			Err(e) => {
				state.error = true;
				tracing::warn!(account = %owner, error = %e, "Balance refresh failed, keeping previous snapshot");
				false
			},
		}
	}

	/// Balance of `token`; absent entries read as zero.
	pub async fn balance_of(&self, token: &Address) -> U256 {
		self.state
			.read()
			.await
			.balances
			.get(token)
			.copied()
			.unwrap_or(U256::ZERO)
	}

	/// Balance of `token` formatted for display.
	pub async fn formatted(&self, token: &Address) -> String {
		let decimals = self
			.decimals
			.get(token)
			.copied()
			.unwrap_or(zap_types::DEFAULT_DECIMALS);
		format_amount_truncated(self.balance_of(token).await, decimals, DISPLAY_PLACES)
	}

	/// Copy of the whole snapshot.
	pub async fn snapshot(&self) -> HashMap<Address, U256> {
		self.state.read().await.balances.clone()
	}

	pub async fn is_loading(&self) -> bool {
		self.state.read().await.loading
	}

	pub async fn is_error(&self) -> bool {
		self.state.read().await.error
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::contracts::MockZapClient;
	use crate::ZapError;
	use alloy_primitives::address;
	use mockall::predicate::*;
	use mockall::Sequence;
	use std::time::Duration;
	use zap_delivery::DeliveryError;
	use zap_types::TokenDescriptor;

	const CRV: Address = address!("D533a949740bb3306d119CC777fa900bA034cd52");
	const YCRV: Address = address!("FCc5c47bE19d06BF83eB04298b026F81069ff65b");
	const YBS: Address = address!("E9A115b77A1057C918F997c32663FdcE24FB873f");
	const OWNER: Address = address!("1111111111111111111111111111111111111111");

	fn catalog() -> TokenCatalog {
		TokenCatalog::new(
			vec![
				TokenDescriptor::new(CRV, "CRV"),
				TokenDescriptor::new(YCRV, "yCRV"),
			],
			vec![
				TokenDescriptor::new(YCRV, "yCRV"),
				TokenDescriptor::new(YBS, "YBS"),
			],
		)
	}

	#[tokio::test]
	async fn test_refetch_reads_union_once() {
		let mut client = MockZapClient::new();
		client
			.expect_balances_of()
			.with(eq(vec![CRV, YCRV, YBS]), eq(OWNER))
			.times(1)
			.returning(|_, _| {
				Box::pin(async {
					Ok(vec![
						Some(U256::from(1_500_000_000_000_000_000u128)),
						None,
						Some(U256::from(7u64)),
					])
				})
			});

		let provider = BalanceSnapshotProvider::new(Arc::new(client), &catalog());
		assert!(provider.refetch(Some(OWNER)).await);
		assert_eq!(
			provider.balance_of(&CRV).await,
			U256::from(1_500_000_000_000_000_000u128)
		);
		assert_eq!(provider.balance_of(&YCRV).await, U256::ZERO);
		assert_eq!(provider.formatted(&CRV).await, "1.5");
		assert!(!provider.is_error().await);
		assert!(!provider.is_loading().await);
	}

	#[tokio::test]
	async fn test_disconnected_uses_zero_address() {
		let mut client = MockZapClient::new();
		client
			.expect_balances_of()
			.with(always(), eq(Address::ZERO))
			.times(1)
			.returning(|tokens, _| {
				let values = vec![Some(U256::ZERO); tokens.len()];
				Box::pin(async move { Ok(values) })
			});

		let provider = BalanceSnapshotProvider::new(Arc::new(client), &catalog());
		assert!(provider.refetch(None).await);
	}

	#[tokio::test(start_paused = true)]
	async fn test_superseded_refetch_does_not_overwrite_newer() {
		let mut client = MockZapClient::new();
		client.expect_balances_of().times(2).returning(|_, owner| {
			let (delay, crv) = if owner == OWNER {
				(Duration::from_millis(100), 10u64)
			} else {
				(Duration::from_millis(10), 0u64)
			};
			Box::pin(async move {
				tokio::time::sleep(delay).await;
				Ok(vec![Some(U256::from(crv)), None, None])
			})
		});

		let provider = BalanceSnapshotProvider::new(Arc::new(client), &catalog());
		let observer = async {
			tokio::time::sleep(Duration::from_millis(50)).await;
			// The disconnected read finished, the connected one is still running.
			assert!(provider.is_loading().await);
			assert_eq!(provider.balance_of(&CRV).await, U256::ZERO);
		};

		let (connected, disconnected, ()) =
			tokio::join!(provider.refetch(Some(OWNER)), provider.refetch(None), observer);

		assert!(connected);
		assert!(disconnected);
		assert!(!provider.is_loading().await);
		assert!(!provider.is_error().await);
		assert_eq!(provider.balance_of(&CRV).await, U256::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn test_superseded_failure_does_not_flag_error() {
		let mut client = MockZapClient::new();
		client.expect_balances_of().times(2).returning(|_, owner| {
			Box::pin(async move {
				if owner == OWNER {
					tokio::time::sleep(Duration::from_millis(100)).await;
					Err(ZapError::Delivery(DeliveryError::Network("timeout".into())))
				} else {
					Ok(vec![Some(U256::from(3u64)), None, None])
				}
			})
		});

		let provider = BalanceSnapshotProvider::new(Arc::new(client), &catalog());
		let (connected, disconnected) =
			tokio::join!(provider.refetch(Some(OWNER)), provider.refetch(None));

		assert!(!connected);
		assert!(disconnected);
		assert!(!provider.is_error().await);
		assert_eq!(provider.balance_of(&CRV).await, U256::from(3u64));
	}

	#[tokio::test]
	async fn test_failed_refetch_keeps_previous_snapshot() {
		let mut seq = Sequence::new();
		let mut client = MockZapClient::new();
		client
			.expect_balances_of()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_, _| {
				Box::pin(async { Ok(vec![Some(U256::from(10u64)), None, None]) })
			});
		client
			.expect_balances_of()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_, _| {
				Box::pin(async {
					Err(ZapError::Delivery(DeliveryError::Network(
						"connection refused".into(),
					)))
				})
			});

		let provider = BalanceSnapshotProvider::new(Arc::new(client), &catalog());
		assert!(provider.refetch(Some(OWNER)).await);
		assert!(!provider.refetch(Some(OWNER)).await);

		assert!(provider.is_error().await);
		assert_eq!(provider.balance_of(&CRV).await, U256::from(10u64));
	}
}
