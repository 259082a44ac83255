//! On-chain contract bindings and the typed client the orchestrator talks to.
//!
//! `ZapClient` is expressed in terms of the router, token and staking calls
//! the zap flow needs. `OnchainZapClient` implements it by ABI-encoding each
//! call and routing it through the `DeliveryService`.

use crate::ZapError;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use std::sync::Arc;
use zap_delivery::DeliveryService;
use zap_types::{TransactionReceipt, TxHash};

sol! {
	/// The zap router.
	interface IZap {
		function calc_expected_out(address input_token, address output_token, uint256 amount_in) external view returns (uint256);
		function zap(address input_token, address output_token, uint256 amount_in, uint256 min_out) external returns (uint256);
	}

	/// Minimal ERC-20 surface.
	interface IERC20 {
		function balanceOf(address owner) external view returns (uint256);
		function allowance(address owner, address spender) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
	}

	/// The staking token authorises callers with a permission code instead of
	/// an allowance.
	interface IYearnBoostedStaker {
		function approvedCaller(address account, address caller) external view returns (uint8);
		function setApprovedCaller(address caller, uint8 status) external;
	}

	struct Call3 {
		address target;
		bool allowFailure;
		bytes callData;
	}

	struct CallResult {
		bool success;
		bytes returnData;
	}

	interface IMulticall3 {
		function aggregate3(Call3[] calls) external payable returns (CallResult[] returnData);
	}
}

/// Permission code granting the router deposit and withdraw rights on the
/// staking token.
pub const APPROVED_CALLER_DEPOSIT_AND_WITHDRAW: u8 = 3;

/// Typed access to the contracts involved in a zap.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ZapClient: Send + Sync {
	/// The account reads and transactions are made for, if any.
	fn account(&self) -> Option<Address>;

	/// Quotes the raw output of zapping `amount` of `input` into `output`.
	async fn calc_expected_out(
		&self,
		input: Address,
		output: Address,
		amount: U256,
	) -> Result<U256, ZapError>;

	/// Reads the ERC-20 allowance `owner` granted to `spender`.
	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ZapError>;

	/// Reads the staking token permission code `owner` granted to `caller`.
	async fn approved_caller(
		&self,
		token: Address,
		owner: Address,
		caller: Address,
	) -> Result<u8, ZapError>;

	/// Reads the balance of `owner` for every token in one batched call.
	///
	/// The result is aligned with `tokens`; a token whose individual read
	/// failed is `None`.
	async fn balances_of(
		&self,
		tokens: Vec<Address>,
		owner: Address,
	) -> Result<Vec<Option<U256>>, ZapError>;

	/// Submits the swap transaction.
	async fn zap(
		&self,
		input: Address,
		output: Address,
		amount: U256,
		min_out: U256,
	) -> Result<TxHash, ZapError>;

	/// Submits an ERC-20 approval.
	async fn approve(
		&self,
		token: Address,
		spender: Address,
		amount: U256,
	) -> Result<TxHash, ZapError>;

	/// Submits a staking token permission update.
	async fn set_approved_caller(
		&self,
		token: Address,
		caller: Address,
		code: u8,
	) -> Result<TxHash, ZapError>;

	/// Waits until the transaction is mined.
	async fn wait_for_confirmation(&self, hash: TxHash) -> Result<TransactionReceipt, ZapError>;
}

/// `ZapClient` backed by real contract calls.
pub struct OnchainZapClient {
	delivery: Arc<DeliveryService>,
	router: Address,
	multicall: Address,
}

impl OnchainZapClient {
	pub fn new(delivery: Arc<DeliveryService>, router: Address, multicall: Address) -> Self {
		Self {
			delivery,
			router,
			multicall,
		}
	}

	async fn call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, ZapError> {
		let data = self
			.delivery
			.contract_call(to, Bytes::from(call.abi_encode()))
			.await?;
		C::abi_decode_returns(&data).map_err(|e| {
			ZapError::Decode(format!("Failed to decode {} result: {}", C::SIGNATURE, e))
		})
	}

	async fn send<C: SolCall>(&self, to: Address, call: C) -> Result<TxHash, ZapError> {
		tracing::debug!(to = %to, function = C::SIGNATURE, "Submitting contract call");
		let hash = self
			.delivery
			.deliver(to, Bytes::from(call.abi_encode()))
			.await?;
		Ok(hash)
	}
}

#[async_trait]
impl ZapClient for OnchainZapClient {
	fn account(&self) -> Option<Address> {
		self.delivery.sender()
	}

	async fn calc_expected_out(
		&self,
		input: Address,
		output: Address,
		amount: U256,
	) -> Result<U256, ZapError> {
		self.call(
			self.router,
			IZap::calc_expected_outCall {
				input_token: input,
				output_token: output,
				amount_in: amount,
			},
		)
		.await
	}

	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ZapError> {
		self.call(token, IERC20::allowanceCall { owner, spender })
			.await
	}

	async fn approved_caller(
		&self,
		token: Address,
		owner: Address,
		caller: Address,
	) -> Result<u8, ZapError> {
		self.call(
			token,
			IYearnBoostedStaker::approvedCallerCall {
				account: owner,
				caller,
			},
		)
		.await
	}

	async fn balances_of(
		&self,
		tokens: Vec<Address>,
		owner: Address,
	) -> Result<Vec<Option<U256>>, ZapError> {
		let calls = tokens
			.iter()
			.map(|token| Call3 {
				target: *token,
				allowFailure: true,
				callData: Bytes::from(IERC20::balanceOfCall { owner }.abi_encode()),
			})
			.collect();

		let results = self
			.call(self.multicall, IMulticall3::aggregate3Call { calls })
			.await?;

		if results.len() != tokens.len() {
			return Err(ZapError::Decode(format!(
				"Multicall returned {} results for {} calls",
				results.len(),
				tokens.len()
			)));
		}

		Ok(results
			.into_iter()
			.zip(tokens.iter())
			.map(|(result, token)| {
				if !result.success {
					tracing::debug!(token = %token, "balanceOf call failed");
					return None;
				}
				IERC20::balanceOfCall::abi_decode_returns(&result.returnData).ok()
			})
			.collect())
	}

	async fn zap(
		&self,
		input: Address,
		output: Address,
		amount: U256,
		min_out: U256,
	) -> Result<TxHash, ZapError> {
		self.send(
			self.router,
			IZap::zapCall {
				input_token: input,
				output_token: output,
				amount_in: amount,
				min_out,
			},
		)
		.await
	}

	async fn approve(
		&self,
		token: Address,
		spender: Address,
		amount: U256,
	) -> Result<TxHash, ZapError> {
		self.send(token, IERC20::approveCall { spender, amount })
			.await
	}

	async fn set_approved_caller(
		&self,
		token: Address,
		caller: Address,
		code: u8,
	) -> Result<TxHash, ZapError> {
		self.send(
			token,
			IYearnBoostedStaker::setApprovedCallerCall {
				caller,
				status: code,
			},
		)
		.await
	}

	async fn wait_for_confirmation(&self, hash: TxHash) -> Result<TransactionReceipt, ZapError> {
		Ok(self.delivery.confirm(hash).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use alloy_sol_types::SolValue;
	use mockall::predicate::*;
	use std::time::Duration;
	use zap_delivery::{DeliveryError, MockDeliveryInterface};

	const ROUTER: Address = address!("5271058928d31b6204fc95eee15fe9fbbdca681a");
	const MULTICALL: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");
	const CRV: Address = address!("D533a949740bb3306d119CC777fa900bA034cd52");
	const YCRV: Address = address!("FCc5c47bE19d06BF83eB04298b026F81069ff65b");
	const OWNER: Address = address!("1111111111111111111111111111111111111111");

	fn client_with(mock: MockDeliveryInterface) -> OnchainZapClient {
		let delivery = DeliveryService::new(Arc::new(mock), 1, Duration::from_secs(60));
		OnchainZapClient::new(Arc::new(delivery), ROUTER, MULTICALL)
	}

	#[tokio::test]
	async fn test_calc_expected_out_encodes_router_call() {
		let amount = U256::from(100u64);
		let expected_data = Bytes::from(
			IZap::calc_expected_outCall {
				input_token: CRV,
				output_token: YCRV,
				amount_in: amount,
			}
			.abi_encode(),
		);

		let mut mock = MockDeliveryInterface::new();
		mock.expect_eth_call()
			.with(eq(ROUTER), eq(expected_data))
			.times(1)
			.returning(|_, _| {
				Box::pin(async move { Ok(Bytes::from(U256::from(99u64).abi_encode())) })
			});

		let client = client_with(mock);
		let out = client.calc_expected_out(CRV, YCRV, amount).await.unwrap();
		assert_eq!(out, U256::from(99u64));
	}

	#[tokio::test]
	async fn test_short_return_data_is_decode_error() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_eth_call()
			.returning(|_, _| Box::pin(async move { Ok(Bytes::from(vec![0u8; 3])) }));

		let client = client_with(mock);
		let result = client.allowance(CRV, OWNER, ROUTER).await;
		assert!(matches!(result, Err(ZapError::Decode(_))));
	}

	#[tokio::test]
	async fn test_approved_caller_decodes_code() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_eth_call()
			.returning(|_, _| Box::pin(async move { Ok(Bytes::from(U256::from(3u8).abi_encode())) }));

		let client = client_with(mock);
		let code = client.approved_caller(YCRV, OWNER, ROUTER).await.unwrap();
		assert_eq!(code, APPROVED_CALLER_DEPOSIT_AND_WITHDRAW);
	}

	#[tokio::test]
	async fn test_balances_of_tolerates_individual_failures() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_eth_call()
			.with(eq(MULTICALL), always())
			.times(1)
			.returning(|_, _| {
				let results = vec![
					CallResult {
						success: true,
						returnData: Bytes::from(U256::from(42u64).abi_encode()),
					},
					CallResult {
						success: false,
						returnData: Bytes::new(),
					},
				];
				let encoded = results.abi_encode();
				Box::pin(async move { Ok(Bytes::from(encoded)) })
			});

		let client = client_with(mock);
		let balances = client.balances_of(vec![CRV, YCRV], OWNER).await.unwrap();
		assert_eq!(balances, vec![Some(U256::from(42u64)), None]);
	}

	#[tokio::test]
	async fn test_zap_submits_to_router() {
		let hash = TxHash::repeat_byte(0x42);
		let expected_data = Bytes::from(
			IZap::zapCall {
				input_token: CRV,
				output_token: YCRV,
				amount_in: U256::from(10u64),
				min_out: U256::from(9u64),
			}
			.abi_encode(),
		);

		let mut mock = MockDeliveryInterface::new();
		mock.expect_submit()
			.with(eq(ROUTER), eq(expected_data))
			.times(1)
			.returning(move |_, _| Box::pin(async move { Ok(hash) }));

		let client = client_with(mock);
		let result = client
			.zap(CRV, YCRV, U256::from(10u64), U256::from(9u64))
			.await
			.unwrap();
		assert_eq!(result, hash);
	}

	#[tokio::test]
	async fn test_approve_without_signer() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_submit()
			.returning(|_, _| Box::pin(async move { Err(DeliveryError::NoSigner) }));

		let client = client_with(mock);
		let result = client.approve(CRV, ROUTER, U256::MAX).await;
		assert!(matches!(
			result,
			Err(ZapError::Delivery(DeliveryError::NoSigner))
		));
	}
}
