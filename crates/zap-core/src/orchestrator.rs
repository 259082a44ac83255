//! Swap orchestrator.
//!
//! Owns the `SwapState` and runs the effects produced by the reducer. Every
//! read, submission, confirmation wait and debounce timer runs as its own
//! tokio task and reports back through a channel; reports are applied one at
//! a time by `process_next`, so the state has a single writer.

use crate::balances::BalanceSnapshotProvider;
use crate::contracts::ZapClient;
use crate::event_bus::EventBus;
use crate::policy::ZapPolicy;
use crate::state::{self, Action, Effect, SwapState};
use crate::ZapError;
use alloy_primitives::Address;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use zap_types::{
	truncate_hash, ApprovalSide, Phase, PrimaryAction, TransactionKind, ZapEvent,
};

/// Buffered events per subscriber before lagging receivers drop the oldest.
const EVENT_CAPACITY: usize = 256;

/// Drives a single swap session against a `ZapClient`.
pub struct SwapOrchestrator {
	state: SwapState,
	policy: Arc<ZapPolicy>,
	client: Arc<dyn ZapClient>,
	balances: BalanceSnapshotProvider,
	event_bus: EventBus,
	report_tx: mpsc::UnboundedSender<Option<Action>>,
	report_rx: mpsc::UnboundedReceiver<Option<Action>>,
	/// Spawned tasks that have not reported yet.
	in_flight: usize,
}

impl SwapOrchestrator {
	pub fn new(policy: ZapPolicy, client: Arc<dyn ZapClient>) -> Self {
		let balances = BalanceSnapshotProvider::new(client.clone(), &policy.catalog);
		let (report_tx, report_rx) = mpsc::unbounded_channel();
		Self {
			state: SwapState::new(&policy),
			policy: Arc::new(policy),
			client,
			balances,
			event_bus: EventBus::new(EVENT_CAPACITY),
			report_tx,
			report_rx,
			in_flight: 0,
		}
	}

	/// Applies an action and starts the work it requires.
	pub fn dispatch(&mut self, action: Action) {
		let before = state::phase(&self.state, &self.policy);
		tracing::trace!(action = ?action, "Dispatching");

		let effects = state::reduce(&mut self.state, action, &self.policy);
		for effect in effects {
			self.run_effect(effect);
		}

		let after = state::phase(&self.state, &self.policy);
		if before != after {
			tracing::info!(from = %before, to = %after, "Phase changed");
			self.publish(ZapEvent::PhaseChanged {
				from: before,
				to: after,
			});
		}
	}

	/// Waits for the next task report and applies it.
	///
	/// Returns `false` when nothing is in flight.
	pub async fn process_next(&mut self) -> bool {
		if self.in_flight == 0 {
			return false;
		}
		let Some(report) = self.report_rx.recv().await else {
			return false;
		};
		self.in_flight -= 1;
		if let Some(action) = report {
			self.dispatch(action);
		}
		true
	}

	/// Applies reports until no task is in flight.
	pub async fn settle(&mut self) {
		while self.process_next().await {}
	}

	pub fn connect(&mut self, account: Address) {
		tracing::info!(account = %account, "Connecting account");
		self.dispatch(Action::Connect(account));
	}

	pub fn disconnect(&mut self) {
		self.dispatch(Action::Disconnect);
	}

	/// Selects the input token. The output follows the forced-output table
	/// and never collapses onto the input.
	pub fn select_input(&mut self, token: Address) -> Result<(), ZapError> {
		if !self.policy.catalog.is_input(&token) {
			return Err(ZapError::UnknownToken(format!("{token} is not an input token")));
		}
		self.dispatch(Action::SelectInput(token));
		Ok(())
	}

	/// Selects the output token.
	pub fn select_output(&mut self, token: Address) -> Result<(), ZapError> {
		if !self.policy.catalog.is_output(&token) {
			return Err(ZapError::UnknownToken(format!("{token} is not an output token")));
		}
		if let Some(input) = self.state.input {
			if let Some(forced) = self.policy.forced_output(&input) {
				if forced != token {
					return Err(ZapError::InvalidState(format!(
						"{} can only be zapped into {}",
						self.policy.symbol_of(&input),
						self.policy.symbol_of(&forced)
					)));
				}
			}
		}
		self.dispatch(Action::SelectOutput(token));
		Ok(())
	}

	/// Updates the typed amount. The quote follows after the debounce.
	pub fn set_amount(&mut self, text: impl Into<String>) {
		self.dispatch(Action::SetAmount(text.into()));
	}

	/// Invokes the primary action and returns what was invoked.
	pub fn invoke_primary(&mut self) -> PrimaryAction {
		let action = self.primary_action();
		if action.enabled {
			tracing::info!(action = %action.label, "Invoking primary action");
		}
		self.dispatch(Action::InvokePrimary);
		action
	}

	pub fn state(&self) -> &SwapState {
		&self.state
	}

	pub fn policy(&self) -> &ZapPolicy {
		&self.policy
	}

	pub fn phase(&self) -> Phase {
		state::phase(&self.state, &self.policy)
	}

	pub fn primary_action(&self) -> PrimaryAction {
		state::primary_action(&self.state, &self.policy)
	}

	pub fn balances(&self) -> &BalanceSnapshotProvider {
		&self.balances
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ZapEvent> {
		self.event_bus.subscribe()
	}

	fn publish(&self, event: ZapEvent) {
		self.event_bus.publish(event).ok();
	}

	fn spawn<F>(&mut self, task: F)
	where
		F: Future<Output = Option<Action>> + Send + 'static,
	{
		self.in_flight += 1;
		let report_tx = self.report_tx.clone();
		tokio::spawn(async move {
			let report = task.await;
			// The receiver lives as long as the orchestrator.
			report_tx.send(report).ok();
		});
	}

	fn run_effect(&mut self, effect: Effect) {
		match effect {
			Effect::Publish(event) => self.publish(event),
			Effect::RequestConnection => {
				tracing::info!("Wallet connection requested");
				self.publish(ZapEvent::ConnectionRequested);
			},
			Effect::ScheduleDebounce { generation } => {
				let delay = self.policy.debounce;
				self.spawn(async move {
					tokio::time::sleep(delay).await;
					Some(Action::DebounceElapsed { generation })
				});
			},
			Effect::FetchQuote(key) => {
				let client = self.client.clone();
				self.spawn(async move {
					let result = client
						.calc_expected_out(key.input, key.output, key.amount)
						.await
						.map_err(|e| {
							tracing::warn!(
								input = %key.input,
								output = %key.output,
								error = %e,
								"Quote failed"
							);
							e.to_string()
						});
					Some(Action::QuoteResolved { key, result })
				});
			},
			Effect::CheckApproval { side, key } => {
				let client = self.client.clone();
				let checker = self.policy.approval_checker(key.token);
				let spender = self.policy.router;
				self.spawn(async move {
					let result = checker
						.is_approved(client.as_ref(), key.owner, spender)
						.await
						.map_err(|e| {
							tracing::warn!(token = %key.token, error = %e, "Approval read failed");
							e.to_string()
						});
					Some(Action::ApprovalResolved { side, key, result })
				});
			},
			Effect::SubmitApproval { side, token } => {
				let client = self.client.clone();
				let checker = self.policy.approval_checker(token);
				let spender = self.policy.router;
				let kind = match side {
					ApprovalSide::Input => TransactionKind::ApproveInput,
					ApprovalSide::Output => TransactionKind::ApproveOutput,
				};
				self.spawn(async move {
					Some(submission_report(
						kind,
						checker.approve(client.as_ref(), spender).await,
					))
				});
			},
			Effect::SubmitSwap {
				input,
				output,
				amount,
				min_out,
			} => {
				let client = self.client.clone();
				tracing::info!(
					input = %input,
					output = %output,
					amount = %amount,
					min_out = %min_out,
					"Submitting zap"
				);
				self.spawn(async move {
					Some(submission_report(
						TransactionKind::Swap,
						client.zap(input, output, amount, min_out).await,
					))
				});
			},
			Effect::WaitForConfirmation { kind, hash } => {
				let client = self.client.clone();
				tracing::info!(kind = %kind, tx_hash = %truncate_hash(&hash), "Waiting for confirmation");
				self.spawn(async move {
					match client.wait_for_confirmation(hash).await {
						Ok(receipt) => Some(Action::TransactionConfirmed { kind, receipt }),
						Err(e) => {
							tracing::error!(
								kind = %kind,
								tx_hash = %truncate_hash(&hash),
								error = %e,
								"Confirmation failed"
							);
							Some(Action::TransactionFailed {
								kind,
								error: e.to_string(),
							})
						},
					}
				});
			},
			Effect::RefreshBalances => {
				let balances = self.balances.clone();
				let account = self.state.account;
				let event_bus = self.event_bus.clone();
				self.spawn(async move {
					let success = balances.refetch(account).await;
					event_bus
						.publish(ZapEvent::BalancesRefreshed { success })
						.ok();
					None
				});
			},
		}
	}
}

fn submission_report(kind: TransactionKind, result: Result<zap_types::TxHash, ZapError>) -> Action {
	match result {
		Ok(hash) => Action::TransactionSubmitted { kind, hash },
		Err(e) => {
			tracing::error!(kind = %kind, error = %e, "Transaction submission failed");
			Action::TransactionFailed {
				kind,
				error: e.to_string(),
			}
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::InMemoryZapClient;
	use alloy_primitives::{address, U256};
	use zap_config::Config;

	const CRV: Address = address!("D533a949740bb3306d119CC777fa900bA034cd52");
	const YCRV: Address = address!("FCc5c47bE19d06BF83eB04298b026F81069ff65b");
	const LP_V1: Address = address!("c97232527B62eFb0D8ed38CF3EA103A6CcA4037e");
	const OWNER: Address = address!("1111111111111111111111111111111111111111");

	fn orchestrator(client: Arc<InMemoryZapClient>) -> SwapOrchestrator {
		let policy = ZapPolicy::from_config(&Config::mainnet().unwrap());
		SwapOrchestrator::new(policy, client)
	}

	#[tokio::test(start_paused = true)]
	async fn test_phase_changes_are_published() {
		let client = Arc::new(InMemoryZapClient::new(OWNER));
		let mut orchestrator = orchestrator(client);
		let mut events = orchestrator.subscribe();

		orchestrator.connect(OWNER);
		assert_eq!(
			events.recv().await.unwrap(),
			ZapEvent::PhaseChanged {
				from: Phase::Disconnected,
				to: Phase::Idle
			}
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_forced_output_rejects_other_selection() {
		let client = Arc::new(InMemoryZapClient::new(OWNER));
		let mut orchestrator = orchestrator(client);

		orchestrator.select_input(LP_V1).unwrap();
		let result = orchestrator.select_output(YCRV);
		assert!(matches!(result, Err(ZapError::InvalidState(_))));
	}

	#[tokio::test(start_paused = true)]
	async fn test_unknown_tokens_are_rejected() {
		let client = Arc::new(InMemoryZapClient::new(OWNER));
		let mut orchestrator = orchestrator(client);

		assert!(matches!(
			orchestrator.select_input(OWNER),
			Err(ZapError::UnknownToken(_))
		));
		assert!(matches!(
			orchestrator.select_output(CRV),
			Err(ZapError::UnknownToken(_))
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_settle_runs_debounce_and_quote() {
		let client = Arc::new(InMemoryZapClient::new(OWNER));
		client.set_quote(CRV, YCRV, |amount| amount / U256::from(2u64));
		let mut orchestrator = orchestrator(client);

		orchestrator.connect(OWNER);
		orchestrator.select_input(CRV).unwrap();
		orchestrator.set_amount("10");
		orchestrator.settle().await;

		let quote = orchestrator.state().current_quote().copied().unwrap();
		assert_eq!(quote.expected_out, U256::from(5u64) * U256::from(10u64).pow(U256::from(18u64)));
		assert!(!orchestrator.process_next().await);
	}
}
