//! In-memory `ZapClient` for exercising the orchestrator without a chain.
//!
//! Balances, allowances and permission codes live in maps. Submitted
//! transactions take effect when their confirmation is awaited, a zap
//! reverts when the quoted output is below its minimum, and individual
//! failures can be injected.

use crate::contracts::{ZapClient, APPROVED_CALLER_DEPOSIT_AND_WITHDRAW};
use crate::ZapError;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use zap_delivery::DeliveryError;
use zap_types::{TransactionReceipt, TxHash, B256};

type QuoteFn = Arc<dyn Fn(U256) -> U256 + Send + Sync>;

/// A transaction the fake has accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedCall {
	Approve {
		token: Address,
		spender: Address,
		amount: U256,
	},
	SetApprovedCaller {
		token: Address,
		caller: Address,
		code: u8,
	},
	Zap {
		input: Address,
		output: Address,
		amount: U256,
		min_out: U256,
	},
}

#[derive(Default)]
struct Ledger {
	balances: HashMap<(Address, Address), U256>,
	allowances: HashMap<(Address, Address, Address), U256>,
	approved_callers: HashMap<(Address, Address, Address), u8>,
	quotes: HashMap<(Address, Address), QuoteFn>,
	quote_delay: Duration,
	quote_calls: Vec<(Address, Address, U256)>,
	fail_quotes: bool,
	fail_approval_reads: bool,
	fail_balances: bool,
	reject_next_submission: Option<String>,
	submitted: Vec<SubmittedCall>,
	pending: HashMap<TxHash, SubmittedCall>,
	next_block: u64,
	nonce: u64,
}

/// Stateful fake of the router, the tokens and the staking contract.
pub struct InMemoryZapClient {
	account: Address,
	ledger: Mutex<Ledger>,
}

impl InMemoryZapClient {
	pub fn new(account: Address) -> Self {
		Self {
			account,
			ledger: Mutex::new(Ledger {
				next_block: 1,
				..Ledger::default()
			}),
		}
	}

	fn ledger(&self) -> MutexGuard<'_, Ledger> {
		// A poisoned lock only happens after a panicking test.
		match self.ledger.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	pub fn set_balance(&self, token: Address, owner: Address, amount: U256) {
		self.ledger().balances.insert((token, owner), amount);
	}

	pub fn balance(&self, token: Address, owner: Address) -> U256 {
		self.ledger()
			.balances
			.get(&(token, owner))
			.copied()
			.unwrap_or_default()
	}

	pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
		self.ledger()
			.allowances
			.insert((token, owner, spender), amount);
	}

	pub fn set_approved_caller_code(&self, token: Address, owner: Address, caller: Address, code: u8) {
		self.ledger()
			.approved_callers
			.insert((token, owner, caller), code);
	}

	/// Installs the pricing function for a pair.
	pub fn set_quote(&self, input: Address, output: Address, quote: impl Fn(U256) -> U256 + Send + Sync + 'static) {
		self.ledger().quotes.insert((input, output), Arc::new(quote));
	}

	/// Delays every quote response.
	pub fn set_quote_delay(&self, delay: Duration) {
		self.ledger().quote_delay = delay;
	}

	pub fn fail_quotes(&self, fail: bool) {
		self.ledger().fail_quotes = fail;
	}

	pub fn fail_approval_reads(&self, fail: bool) {
		self.ledger().fail_approval_reads = fail;
	}

	pub fn fail_balances(&self, fail: bool) {
		self.ledger().fail_balances = fail;
	}

	/// Rejects the next submission, as a wallet would when the user declines.
	pub fn reject_next_submission(&self, reason: impl Into<String>) {
		self.ledger().reject_next_submission = Some(reason.into());
	}

	/// Every quote request received, in order.
	pub fn quote_calls(&self) -> Vec<(Address, Address, U256)> {
		self.ledger().quote_calls.clone()
	}

	/// Every transaction accepted, in order.
	pub fn submitted(&self) -> Vec<SubmittedCall> {
		self.ledger().submitted.clone()
	}

	fn network_error(message: &str) -> ZapError {
		ZapError::Delivery(DeliveryError::Network(message.to_string()))
	}

	fn submit(&self, call: SubmittedCall) -> Result<TxHash, ZapError> {
		let mut ledger = self.ledger();
		if let Some(reason) = ledger.reject_next_submission.take() {
			return Err(ZapError::Delivery(DeliveryError::TransactionFailed(reason)));
		}
		ledger.nonce += 1;
		let hash = B256::left_padding_from(&ledger.nonce.to_be_bytes());
		ledger.submitted.push(call.clone());
		ledger.pending.insert(hash, call);
		Ok(hash)
	}

	/// Applies a confirmed call. Returns `false` when it reverts.
	fn execute(&self, ledger: &mut Ledger, call: SubmittedCall) -> bool {
		let owner = self.account;
		match call {
			SubmittedCall::Approve {
				token,
				spender,
				amount,
			} => {
				ledger.allowances.insert((token, owner, spender), amount);
				true
			},
			SubmittedCall::SetApprovedCaller {
				token,
				caller,
				code,
			} => {
				ledger.approved_callers.insert((token, owner, caller), code);
				true
			},
			SubmittedCall::Zap {
				input,
				output,
				amount,
				min_out,
			} => {
				let Some(quote) = ledger.quotes.get(&(input, output)).cloned() else {
					return false;
				};
				let out = quote(amount);
				let held = ledger
					.balances
					.get(&(input, owner))
					.copied()
					.unwrap_or_default();
				if out < min_out || held < amount {
					return false;
				}
				ledger.balances.insert((input, owner), held - amount);
				let received = ledger
					.balances
					.get(&(output, owner))
					.copied()
					.unwrap_or_default();
				ledger.balances.insert((output, owner), received + out);
				true
			},
		}
	}
}

#[async_trait]
impl ZapClient for InMemoryZapClient {
	fn account(&self) -> Option<Address> {
		Some(self.account)
	}

	async fn calc_expected_out(
		&self,
		input: Address,
		output: Address,
		amount: U256,
	) -> Result<U256, ZapError> {
		let (delay, result) = {
			let mut ledger = self.ledger();
			ledger.quote_calls.push((input, output, amount));
			let result = if ledger.fail_quotes {
				Err(Self::network_error("quote unavailable"))
			} else {
				match ledger.quotes.get(&(input, output)) {
					Some(quote) => Ok(quote(amount)),
					None => Err(ZapError::Decode("execution reverted".into())),
				}
			};
			(ledger.quote_delay, result)
		};
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}
		result
	}

	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ZapError> {
		let ledger = self.ledger();
		if ledger.fail_approval_reads {
			return Err(Self::network_error("allowance unavailable"));
		}
		Ok(ledger
			.allowances
			.get(&(token, owner, spender))
			.copied()
			.unwrap_or_default())
	}

	async fn approved_caller(
		&self,
		token: Address,
		owner: Address,
		caller: Address,
	) -> Result<u8, ZapError> {
		let ledger = self.ledger();
		if ledger.fail_approval_reads {
			return Err(Self::network_error("approvedCaller unavailable"));
		}
		Ok(ledger
			.approved_callers
			.get(&(token, owner, caller))
			.copied()
			.unwrap_or_default())
	}

	async fn balances_of(
		&self,
		tokens: Vec<Address>,
		owner: Address,
	) -> Result<Vec<Option<U256>>, ZapError> {
		let ledger = self.ledger();
		if ledger.fail_balances {
			return Err(Self::network_error("multicall unavailable"));
		}
		Ok(tokens
			.iter()
			.map(|token| {
				Some(
					ledger
						.balances
						.get(&(*token, owner))
						.copied()
						.unwrap_or_default(),
				)
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
		self.submit(SubmittedCall::Zap {
			input,
			output,
			amount,
			min_out,
		})
	}

	async fn approve(
		&self,
		token: Address,
		spender: Address,
		amount: U256,
	) -> Result<TxHash, ZapError> {
		self.submit(SubmittedCall::Approve {
			token,
			spender,
			amount,
		})
	}

	async fn set_approved_caller(
		&self,
		token: Address,
		caller: Address,
		code: u8,
	) -> Result<TxHash, ZapError> {
		self.submit(SubmittedCall::SetApprovedCaller {
			token,
			caller,
			code,
		})
	}

	async fn wait_for_confirmation(&self, hash: TxHash) -> Result<TransactionReceipt, ZapError> {
		let mut ledger = self.ledger();
		let call = ledger.pending.remove(&hash).ok_or_else(|| {
			Self::network_error("transaction not found")
		})?;
		let success = self.execute(&mut ledger, call);
		let block_number = ledger.next_block;
		ledger.next_block += 1;
		Ok(TransactionReceipt {
			hash,
			block_number,
			success,
		})
	}
}

impl InMemoryZapClient {
	/// Grants every approval the router could need for `token`.
	pub fn approve_all(&self, token: Address, spender: Address) {
		self.set_allowance(token, self.account, spender, U256::MAX);
		self.set_approved_caller_code(token, self.account, spender, APPROVED_CALLER_DEPOSIT_AND_WITHDRAW);
	}
}
