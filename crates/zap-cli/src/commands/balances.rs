use crate::cli::output::Display;
use alloy_primitives::Address;
use anyhow::{anyhow, bail, Context, Result};
use zap_config::Config;
use zap_core::BalanceSnapshotProvider;

use super::Session;

pub async fn run(config: Config, account: Option<&str>) -> Result<()> {
	let session = Session::connect(config)?;
	let account = match account {
		Some(raw) => raw
			.trim()
			.parse::<Address>()
			.with_context(|| format!("Invalid account address '{raw}'"))?,
		None => session
			.account()
			.ok_or_else(|| anyhow!("No account configured; pass --account"))?,
	};

	let catalog = &session.config.tokens;
	let balances = BalanceSnapshotProvider::new(session.client.clone(), catalog);
	if !balances.refetch(Some(account)).await {
		bail!("Failed to read balances");
	}

	Display::header(&format!("Balances of {account}"));
	let mut rows = Vec::new();
	for token in catalog.union_addresses() {
		rows.push(vec![catalog.symbol_of(&token), balances.formatted(&token).await]);
	}
	Display::table(&["Token", "Balance"], &rows);
	Ok(())
}
