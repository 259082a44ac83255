//! The approval and swap state machine.
//!
//! `reduce` is a pure transition function: it applies one `Action` to the
//! `SwapState` and returns the `Effect`s the orchestrator has to run. Every
//! asynchronous read is tagged with the key it was issued for and its result
//! is dropped when the key no longer matches the state, so a late response
//! can never overwrite a newer selection. `phase` and `primary_action` are
//! derived from the state and never stored.

use crate::policy::ZapPolicy;
use alloy_primitives::{Address, U256};
use zap_types::{
	parse_amount, ActionLabel, ApprovalSide, ApprovalStatus, Phase, PrimaryAction,
	TransactionKind, TransactionReceipt, TxHash, ZapEvent, DEFAULT_DECIMALS,
};

/// Identifies a quote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuoteKey {
	pub input: Address,
	pub output: Address,
	pub amount: U256,
}

/// Identifies an approval read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApprovalKey {
	pub owner: Address,
	pub token: Address,
}

/// A successful quote together with the key it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
	pub key: QuoteKey,
	pub expected_out: U256,
	pub min_out: U256,
}

/// Approval status of one side, tagged with the read it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApprovalSlot {
	pub key: Option<ApprovalKey>,
	pub status: ApprovalStatus,
}

/// A submitted transaction awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
	pub kind: TransactionKind,
	/// Set once the node accepted the transaction.
	pub hash: Option<TxHash>,
}

/// Everything the orchestrator knows about the swap in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SwapState {
	pub account: Option<Address>,
	pub input: Option<Address>,
	pub output: Option<Address>,
	/// Amount as typed.
	pub amount_text: String,
	/// Raw amount after the debounce, `None` when empty or zero.
	pub debounced_amount: Option<U256>,
	/// Bumped on every keystroke; only the latest generation is applied.
	pub debounce_generation: u64,
	pub debounce_pending: bool,
	pub amount_error: Option<String>,
	/// Last successful quote. Kept across failures and selection changes.
	pub quote: Option<Quote>,
	pub quote_in_flight: Option<QuoteKey>,
	pub quote_error: Option<String>,
	pub input_approval: ApprovalSlot,
	pub output_approval: ApprovalSlot,
	pub pending: Option<PendingTransaction>,
	/// Hash of the last confirmed swap, cleared by the next edit.
	pub confirmed: Option<TxHash>,
	/// Last transaction error, cleared by the next action.
	pub last_error: Option<String>,
}

impl SwapState {
	/// Initial state: disconnected, first input token selected.
	pub fn new(policy: &ZapPolicy) -> Self {
		let input = policy.catalog.inputs.first().map(|token| token.address);
		let output = input.and_then(|input| policy.alternate_output(&input));
		Self {
			input,
			output,
			..Self::default()
		}
	}

	/// The quote key for the current selection, if the selection is quotable.
	pub fn quote_key(&self) -> Option<QuoteKey> {
		let input = self.input?;
		let output = self.output?;
		let amount = self.debounced_amount?;
		if input == output {
			return None;
		}
		Some(QuoteKey {
			input,
			output,
			amount,
		})
	}

	/// The quote for the current selection, if one has arrived.
	pub fn current_quote(&self) -> Option<&Quote> {
		let key = self.quote_key()?;
		self.quote.as_ref().filter(|quote| quote.key == key)
	}

	/// Last known minimum output, regardless of the selection it was made for.
	pub fn last_min_out(&self) -> Option<U256> {
		self.quote.map(|quote| quote.min_out)
	}

	fn approval_slot(&self, side: ApprovalSide) -> &ApprovalSlot {
		match side {
			ApprovalSide::Input => &self.input_approval,
			ApprovalSide::Output => &self.output_approval,
		}
	}

	fn approval_slot_mut(&mut self, side: ApprovalSide) -> &mut ApprovalSlot {
		match side {
			ApprovalSide::Input => &mut self.input_approval,
			ApprovalSide::Output => &mut self.output_approval,
		}
	}

	fn pair_is_valid(&self) -> bool {
		matches!((self.input, self.output), (Some(input), Some(output)) if input != output)
	}
}

/// Inputs to the state machine: user intents and async results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	Connect(Address),
	Disconnect,
	SelectInput(Address),
	SelectOutput(Address),
	SetAmount(String),
	DebounceElapsed {
		generation: u64,
	},
	QuoteResolved {
		key: QuoteKey,
		result: Result<U256, String>,
	},
	ApprovalResolved {
		side: ApprovalSide,
		key: ApprovalKey,
		result: Result<bool, String>,
	},
	InvokePrimary,
	TransactionSubmitted {
		kind: TransactionKind,
		hash: TxHash,
	},
	TransactionFailed {
		kind: TransactionKind,
		error: String,
	},
	TransactionConfirmed {
		kind: TransactionKind,
		receipt: TransactionReceipt,
	},
}

/// Work requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
	/// Wait for the debounce interval, then deliver `DebounceElapsed`.
	ScheduleDebounce { generation: u64 },
	FetchQuote(QuoteKey),
	CheckApproval {
		side: ApprovalSide,
		key: ApprovalKey,
	},
	SubmitApproval {
		side: ApprovalSide,
		token: Address,
	},
	SubmitSwap {
		input: Address,
		output: Address,
		amount: U256,
		min_out: U256,
	},
	WaitForConfirmation {
		kind: TransactionKind,
		hash: TxHash,
	},
	RefreshBalances,
	RequestConnection,
	Publish(ZapEvent),
}

/// Applies `action` to `state` and returns the effects to run.
pub fn reduce(state: &mut SwapState, action: Action, policy: &ZapPolicy) -> Vec<Effect> {
	let mut effects = Vec::new();

	match action {
		Action::Connect(account) => {
			state.account = Some(account);
			state.last_error = None;
			refresh_approvals(state, policy, &mut effects);
			effects.push(Effect::RefreshBalances);
		},
		Action::Disconnect => {
			state.account = None;
			state.pending = None;
			state.confirmed = None;
			state.input_approval = ApprovalSlot::default();
			state.output_approval = ApprovalSlot::default();
			effects.push(Effect::RefreshBalances);
		},
		Action::SelectInput(input) => {
			if !policy.catalog.is_input(&input) || state.input == Some(input) {
				return effects;
			}
			state.input = Some(input);
			state.output = resolve_output(&input, state.output, policy);
			after_selection_change(state, policy, &mut effects);
		},
		Action::SelectOutput(output) => {
			if !policy.catalog.is_output(&output) || state.output == Some(output) {
				return effects;
			}
			if let Some(input) = state.input {
				if policy.forced_output(&input).is_some_and(|forced| forced != output) {
					return effects;
				}
			}
			state.output = Some(output);
			if let Some(input) = state.input {
				state.output = resolve_output(&input, state.output, policy);
			}
			after_selection_change(state, policy, &mut effects);
		},
		Action::SetAmount(text) => {
			state.amount_text = text;
			state.debounce_generation += 1;
			state.debounce_pending = true;
			state.confirmed = None;
			state.last_error = None;
			effects.push(Effect::ScheduleDebounce {
				generation: state.debounce_generation,
			});
		},
		Action::DebounceElapsed { generation } => {
			if generation != state.debounce_generation {
				return effects;
			}
			state.debounce_pending = false;
			let (amount, error) = match parse_amount(&state.amount_text, DEFAULT_DECIMALS) {
				Ok(raw) if raw.is_zero() => (None, None),
				Ok(raw) => (Some(raw), None),
				Err(zap_types::AmountError::Empty) => (None, None),
				Err(e) => (None, Some(e.to_string())),
			};
			state.debounced_amount = amount;
			state.amount_error = error;
			request_quote(state, false, &mut effects);
		},
		Action::QuoteResolved { key, result } => {
			if state.quote_key() != Some(key) {
				return effects;
			}
			if state.quote_in_flight == Some(key) {
				state.quote_in_flight = None;
			}
			match result {
				Ok(expected_out) => {
					let min_out = policy.min_out(&key.input, &key.output, expected_out);
					state.quote = Some(Quote {
						key,
						expected_out,
						min_out,
					});
					state.quote_error = None;
					effects.push(Effect::Publish(ZapEvent::QuoteUpdated {
						expected_out,
						min_out,
					}));
				},
				Err(error) => {
					state.quote_error = Some(error.clone());
					effects.push(Effect::Publish(ZapEvent::QuoteFailed { error }));
				},
			}
		},
		Action::ApprovalResolved { side, key, result } => {
			let slot = state.approval_slot_mut(side);
			if slot.key != Some(key) {
				return effects;
			}
			// An unreadable approval counts as missing.
			slot.status = match result {
				Ok(true) => ApprovalStatus::Approved,
				Ok(false) | Err(_) => ApprovalStatus::NotApproved,
			};
			effects.push(Effect::Publish(ZapEvent::ApprovalChecked {
				side,
				status: slot.status,
			}));
		},
		Action::InvokePrimary => {
			let action = primary_action(state, policy);
			if !action.enabled {
				return effects;
			}
			state.last_error = None;
			match action.label {
				ActionLabel::ConnectWallet => effects.push(Effect::RequestConnection),
				ActionLabel::ApproveInput => {
					if let Some(token) = state.input {
						begin_approval(state, ApprovalSide::Input, token, &mut effects);
					}
				},
				ActionLabel::ApproveOutput(_) => {
					if let Some(token) = state.output {
						begin_approval(state, ApprovalSide::Output, token, &mut effects);
					}
				},
				ActionLabel::Swap => {
					if let Some(quote) = state.current_quote().copied() {
						state.confirmed = None;
						state.pending = Some(PendingTransaction {
							kind: TransactionKind::Swap,
							hash: None,
						});
						effects.push(Effect::SubmitSwap {
							input: quote.key.input,
							output: quote.key.output,
							amount: quote.key.amount,
							min_out: quote.min_out,
						});
					}
				},
				ActionLabel::Confirming => {},
			}
		},
		Action::TransactionSubmitted { kind, hash } => {
			let Some(pending) = state.pending.as_mut() else {
				return effects;
			};
			if pending.kind != kind || pending.hash.is_some() {
				return effects;
			}
			pending.hash = Some(hash);
			effects.push(Effect::Publish(ZapEvent::TransactionSubmitted { kind, hash }));
			effects.push(Effect::WaitForConfirmation { kind, hash });
		},
		Action::TransactionFailed { kind, error } => {
			if !state.pending.is_some_and(|pending| pending.kind == kind) {
				return effects;
			}
			state.pending = None;
			state.last_error = Some(error.clone());
			effects.push(Effect::Publish(ZapEvent::TransactionFailed { kind, error }));
		},
		Action::TransactionConfirmed { kind, receipt } => {
			let Some(pending) = state.pending else {
				return effects;
			};
			if pending.kind != kind || pending.hash != Some(receipt.hash) {
				return effects;
			}
			state.pending = None;

			if !receipt.success {
				let error = "Transaction reverted".to_string();
				state.last_error = Some(error.clone());
				effects.push(Effect::Publish(ZapEvent::TransactionFailed { kind, error }));
				return effects;
			}

			effects.push(Effect::Publish(ZapEvent::TransactionConfirmed {
				kind,
				hash: receipt.hash,
				block_number: receipt.block_number,
			}));

			match kind {
				TransactionKind::ApproveInput => {
					refresh_approval(state, ApprovalSide::Input, policy, &mut effects);
				},
				TransactionKind::ApproveOutput => {
					refresh_approval(state, ApprovalSide::Output, policy, &mut effects);
				},
				TransactionKind::Swap => {
					state.confirmed = Some(receipt.hash);
					effects.push(Effect::RefreshBalances);
					refresh_approvals(state, policy, &mut effects);
					request_quote(state, true, &mut effects);
				},
			}
		},
	}

	effects
}

/// Keeps the output valid for `input`: the forced output if there is one,
/// otherwise the current output unless it collapses onto the input.
fn resolve_output(input: &Address, output: Option<Address>, policy: &ZapPolicy) -> Option<Address> {
	if let Some(forced) = policy.forced_output(input) {
		return Some(forced);
	}
	match output {
		Some(output) if output != *input => Some(output),
		_ => policy.alternate_output(input),
	}
}

fn after_selection_change(state: &mut SwapState, policy: &ZapPolicy, effects: &mut Vec<Effect>) {
	state.confirmed = None;
	state.last_error = None;
	refresh_approvals(state, policy, effects);
	request_quote(state, false, effects);
}

/// Issues a quote for the current key unless it is already answered or
/// outstanding. `force` re-quotes an answered key.
fn request_quote(state: &mut SwapState, force: bool, effects: &mut Vec<Effect>) {
	let Some(key) = state.quote_key() else {
		state.quote_in_flight = None;
		return;
	};
	let answered = state.current_quote().is_some();
	if state.quote_in_flight == Some(key) || (answered && !force) {
		return;
	}
	state.quote_in_flight = Some(key);
	effects.push(Effect::FetchQuote(key));
}

fn refresh_approvals(state: &mut SwapState, policy: &ZapPolicy, effects: &mut Vec<Effect>) {
	refresh_approval(state, ApprovalSide::Input, policy, effects);
	refresh_approval(state, ApprovalSide::Output, policy, effects);
}

/// Re-reads the approval of one side for the current account and token.
fn refresh_approval(
	state: &mut SwapState,
	side: ApprovalSide,
	policy: &ZapPolicy,
	effects: &mut Vec<Effect>,
) {
	let token = match side {
		ApprovalSide::Input => state.input,
		ApprovalSide::Output => state.output.filter(|output| policy.requires_output_approval(output)),
	};

	let slot = match (state.account, token) {
		(Some(owner), Some(token)) => {
			let key = ApprovalKey { owner, token };
			effects.push(Effect::CheckApproval { side, key });
			ApprovalSlot {
				key: Some(key),
				status: ApprovalStatus::Checking,
			}
		},
		(_, None) if side == ApprovalSide::Output && state.output.is_some() => ApprovalSlot {
			key: None,
			status: ApprovalStatus::NotRequired,
		},
		_ => ApprovalSlot::default(),
	};
	*state.approval_slot_mut(side) = slot;
}

fn begin_approval(
	state: &mut SwapState,
	side: ApprovalSide,
	token: Address,
	effects: &mut Vec<Effect>,
) {
	let kind = match side {
		ApprovalSide::Input => TransactionKind::ApproveInput,
		ApprovalSide::Output => TransactionKind::ApproveOutput,
	};
	state.pending = Some(PendingTransaction { kind, hash: None });
	effects.push(Effect::SubmitApproval { side, token });
}

/// Phase ignoring a completed swap.
fn readiness(state: &SwapState, policy: &ZapPolicy) -> Phase {
	if state.account.is_none() {
		return Phase::Disconnected;
	}
	if let Some(pending) = state.pending {
		return if pending.kind.is_approval() {
			Phase::ApprovalPending
		} else {
			Phase::SwapPending
		};
	}
	if state.debounce_pending && state.pair_is_valid() {
		// Cleared text will debounce to no amount.
		if state.amount_text.trim().is_empty() {
			return Phase::Idle;
		}
		return Phase::Quoting;
	}
	if state.quote_key().is_none() {
		return Phase::Idle;
	}

	match state.approval_slot(ApprovalSide::Input).status {
		ApprovalStatus::NotApproved => return Phase::NeedsInputApproval,
		ApprovalStatus::Approved | ApprovalStatus::NotRequired => {},
		ApprovalStatus::Unknown | ApprovalStatus::Checking => return Phase::Quoting,
	}

	let output_required = state
		.output
		.is_some_and(|output| policy.requires_output_approval(&output));
	if output_required {
		match state.approval_slot(ApprovalSide::Output).status {
			ApprovalStatus::NotApproved => return Phase::NeedsOutputApproval,
			ApprovalStatus::Approved | ApprovalStatus::NotRequired => {},
			ApprovalStatus::Unknown | ApprovalStatus::Checking => return Phase::Quoting,
		}
	}

	if state.current_quote().is_some() {
		Phase::ReadyToSwap
	} else {
		Phase::Quoting
	}
}

/// The behaviourally distinct phase the swap is in.
pub fn phase(state: &SwapState, policy: &ZapPolicy) -> Phase {
	if state.account.is_some() && state.pending.is_none() && state.confirmed.is_some() {
		return Phase::Confirmed;
	}
	readiness(state, policy)
}

/// Label and enablement of the single primary action.
pub fn primary_action(state: &SwapState, policy: &ZapPolicy) -> PrimaryAction {
	if state.account.is_none() {
		return PrimaryAction::enabled(ActionLabel::ConnectWallet);
	}
	if state.pending.is_some() {
		return PrimaryAction::disabled(ActionLabel::Confirming);
	}

	let label = if state.input_approval.status == ApprovalStatus::NotApproved {
		ActionLabel::ApproveInput
	} else if state.output_approval.status == ApprovalStatus::NotApproved {
		let symbol = state
			.output
			.map(|output| policy.symbol_of(&output))
			.unwrap_or_default();
		ActionLabel::ApproveOutput(symbol)
	} else {
		ActionLabel::Swap
	};

	if !state.pair_is_valid() || state.debounce_pending || state.debounced_amount.is_none() {
		return PrimaryAction::disabled(label);
	}

	let enabled = matches!(
		readiness(state, policy),
		Phase::NeedsInputApproval | Phase::NeedsOutputApproval | Phase::ReadyToSwap
	);
	PrimaryAction { label, enabled }
}
