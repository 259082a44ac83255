use crate::cli::{output::Display, PairArgs};
use anyhow::Result;
use zap_config::Config;
use zap_types::ApprovalStatus;

use super::{prepare_swap, print_quote, Session};

pub async fn run(config: Config, pair: &PairArgs) -> Result<()> {
	let session = Session::connect(config)?;
	let mut orchestrator = session.orchestrator();
	if let Some(account) = session.account() {
		orchestrator.connect(account);
	}
	let (input, output) = prepare_swap(&mut orchestrator, pair).await?;

	Display::header(&format!("{} {} → {}", pair.amount.trim(), input.symbol, output.symbol));
	Display::kv("Phase", &orchestrator.phase().to_string());
	if let Some(account) = orchestrator.state().account {
		Display::kv("Account", &account.to_string());
		let balances = orchestrator.balances();
		Display::kv(
			&format!("{} balance", input.symbol),
			&balances.formatted(&input.address).await,
		);
		Display::kv(
			&format!("{} balance", output.symbol),
			&balances.formatted(&output.address).await,
		);
	}
	Display::kv(
		"Input approval",
		describe(orchestrator.state().input_approval.status),
	);
	Display::kv(
		"Output approval",
		describe(orchestrator.state().output_approval.status),
	);
	if let Err(e) = print_quote(&orchestrator, &output) {
		Display::warning(&e.to_string());
	}

	let action = orchestrator.primary_action();
	let availability = if action.enabled { "" } else { " (disabled)" };
	Display::kv("Next action", &format!("{}{availability}", action.label));
	Ok(())
}

fn describe(status: ApprovalStatus) -> &'static str {
	match status {
		ApprovalStatus::Unknown => "unknown",
		ApprovalStatus::Checking => "checking",
		ApprovalStatus::Approved => "approved",
		ApprovalStatus::NotApproved => "not approved",
		ApprovalStatus::NotRequired => "not required",
	}
}
