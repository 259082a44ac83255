use crate::cli::{output::Display, PairArgs};
use anyhow::{anyhow, bail, Result};
use zap_config::Config;
use zap_core::SwapOrchestrator;
use zap_types::{format_amount, ActionLabel, ApprovalStatus, Phase, TokenDescriptor};

use super::{prepare_swap, print_events, print_quote, Session};

/// Upper bound on primary-action invocations: input approval, output
/// approval and the swap itself.
const MAX_STEPS: usize = 3;

pub async fn run(config: Config, pair: &PairArgs, yes: bool) -> Result<()> {
	let session = Session::connect(config)?;
	let account = session
		.account()
		.ok_or_else(|| anyhow!("No account configured; set account.private_key"))?;

	let mut orchestrator = session.orchestrator();
	let mut events = orchestrator.subscribe();
	orchestrator.connect(account);
	let (input, output) = prepare_swap(&mut orchestrator, pair).await?;
	print_events(&mut events);

	Display::header(&format!("{} {} → {}", pair.amount.trim(), input.symbol, output.symbol));
	print_quote(&orchestrator, &output)?;
	Display::kv(
		&format!("{} balance", input.symbol),
		&orchestrator.balances().formatted(&input.address).await,
	);

	let steps = plan(&orchestrator, &input, &output);
	if !yes {
		Display::header("Plan");
		Display::steps(&steps);
		Display::info("Run again with --yes to send these transactions");
		return Ok(());
	}

	for _ in 0..MAX_STEPS {
		match orchestrator.phase() {
			Phase::Confirmed => break,
			Phase::NeedsInputApproval | Phase::NeedsOutputApproval | Phase::ReadyToSwap => {},
			phase => bail!("Cannot continue while {phase}"),
		}

		let action = orchestrator.invoke_primary();
		Display::info(&action.label.to_string());
		orchestrator.settle().await;
		print_events(&mut events);

		if let Some(error) = &orchestrator.state().last_error {
			bail!("{} failed: {error}", action.label);
		}
	}

	if orchestrator.phase() != Phase::Confirmed {
		bail!("Zap did not complete, now {}", orchestrator.phase());
	}
	Display::success(&format!(
		"Zapped {} {} into {}",
		pair.amount.trim(),
		input.symbol,
		output.symbol
	));
	Display::kv(
		&format!("{} balance", output.symbol),
		&orchestrator.balances().formatted(&output.address).await,
	);
	Ok(())
}

/// The transactions still needed for the prepared swap, in order.
fn plan(
	orchestrator: &SwapOrchestrator,
	input: &TokenDescriptor,
	output: &TokenDescriptor,
) -> Vec<String> {
	let state = orchestrator.state();
	let mut steps = Vec::new();

	if state.input_approval.status == ApprovalStatus::NotApproved {
		steps.push(format!("Approve {} for the zap router", input.symbol));
	}
	if state.output_approval.status == ApprovalStatus::NotApproved {
		steps.push(ActionLabel::ApproveOutput(output.symbol.clone()).to_string());
	}
	if let Some(quote) = state.current_quote() {
		steps.push(format!(
			"Swap {} {} for at least {} {}",
			format_amount(quote.key.amount, input.decimals),
			input.symbol,
			format_amount(quote.min_out, output.decimals),
			output.symbol
		));
	}
	steps
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, Address, U256};
	use std::sync::Arc;
	use zap_core::{testing::InMemoryZapClient, ZapPolicy};

	const OWNER: Address = address!("1111111111111111111111111111111111111111");
	const YVECRV: Address = address!("c5bDdf9843308380375a611c18B50Fb9341f502A");
	const YBS: Address = address!("E9A115b77A1057C918F997c32663FdcE24FB873f");

	fn pair(from: &str, to: &str, amount: &str) -> PairArgs {
		PairArgs {
			from: from.into(),
			to: to.into(),
			amount: amount.into(),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_plan_lists_both_approvals_before_swap() {
		let config = Config::mainnet().unwrap();
		let client = Arc::new(InMemoryZapClient::new(OWNER));
		client.set_quote(YVECRV, YBS, |amount| amount);
		let mut orchestrator = SwapOrchestrator::new(ZapPolicy::from_config(&config), client);
		orchestrator.connect(OWNER);

		let (input, output) = prepare_swap(&mut orchestrator, &pair("yveCRV-DAO", "ybs", "2"))
			.await
			.unwrap();
		let steps = plan(&orchestrator, &input, &output);

		assert_eq!(
			steps,
			vec![
				"Approve yveCRV-DAO for the zap router".to_string(),
				"Approve YBS Output".to_string(),
				"Swap 2 yveCRV-DAO for at least 1.999999999999999999 YBS".to_string(),
			]
		);
		assert_eq!(
			orchestrator.state().current_quote().unwrap().expected_out,
			U256::from(2u64) * U256::from(10u64).pow(U256::from(18u64))
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_prepare_rejects_unknown_and_zero() {
		let config = Config::mainnet().unwrap();
		let client = Arc::new(InMemoryZapClient::new(OWNER));
		let mut orchestrator = SwapOrchestrator::new(ZapPolicy::from_config(&config), client);

		assert!(prepare_swap(&mut orchestrator, &pair("DAI", "yCRV", "1"))
			.await
			.is_err());
		assert!(prepare_swap(&mut orchestrator, &pair("CRV", "yCRV", "0"))
			.await
			.is_err());
		assert!(prepare_swap(&mut orchestrator, &pair("CRV", "yCRV", "1.2.3"))
			.await
			.is_err());
	}
}
