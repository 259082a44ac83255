use crate::cli::{output::Display, PairArgs};
use anyhow::Result;
use zap_config::Config;

use super::{prepare_swap, print_quote, Session};

pub async fn run(config: Config, pair: &PairArgs) -> Result<()> {
	let session = Session::connect(config)?;
	let mut orchestrator = session.orchestrator();
	let (input, output) = prepare_swap(&mut orchestrator, pair).await?;

	Display::header(&format!("{} {} → {}", pair.amount.trim(), input.symbol, output.symbol));
	print_quote(&orchestrator, &output)?;
	if orchestrator.policy().is_one_to_one(&input.address, &output.address) {
		Display::info("1:1 pair, no slippage applied");
	} else {
		Display::kv(
			"Slippage",
			&format!("{} bps", orchestrator.policy().slippage_bps),
		);
	}
	Ok(())
}
