//! Command implementations.
//!
//! Every command loads the configuration first. Commands that touch the
//! chain then build a `Session`: the delivery stack, the on-chain zap client
//! and the swap policy derived from the configuration.

mod balances;
mod quote;
mod status;
mod tokens;
mod zap;

use crate::cli::{output::Display, Cli, Commands, PairArgs};
use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use zap_config::Config;
use zap_core::{OnchainZapClient, SwapOrchestrator, ZapClient, ZapPolicy};
use zap_delivery::{AlloyDelivery, DeliveryService};
use zap_types::{format_amount, CatalogSide, TokenDescriptor, ZapEvent};

pub async fn run(cli: Cli) -> Result<()> {
	let config = load_config(&cli).await?;

	match cli.command {
		Commands::Tokens => tokens::run(&config),
		Commands::Balances { account } => balances::run(config, account.as_deref()).await,
		Commands::Quote(pair) => quote::run(config, &pair).await,
		Commands::Status(pair) => status::run(config, &pair).await,
		Commands::Zap { pair, yes } => zap::run(config, &pair, yes).await,
	}
}

async fn load_config(cli: &Cli) -> Result<Config> {
	match &cli.config {
		Some(path) => {
			tracing::info!(path = %path.display(), "Loading configuration from file");
			Config::from_file(path)
				.await
				.with_context(|| format!("Failed to load {}", path.display()))
		},
		None => {
			tracing::info!("Using embedded mainnet configuration");
			Config::mainnet().context("Embedded mainnet configuration is invalid")
		},
	}
}

/// Chain connection and swap policy for one command invocation.
pub(crate) struct Session {
	pub config: Config,
	pub client: Arc<OnchainZapClient>,
}

impl Session {
	pub fn connect(config: Config) -> Result<Self> {
		let delivery = AlloyDelivery::from_config(&config.network, &config.account)
			.context("Failed to set up chain connection")?;
		tracing::info!(
			chain_id = delivery.chain_id(),
			rpc_url = %config.network.rpc_url,
			"Connected delivery"
		);
		let service = Arc::new(DeliveryService::new(
			Arc::new(delivery),
			config.network.confirmations,
			Duration::from_secs(config.network.confirmation_timeout_seconds),
		));
		let client = Arc::new(OnchainZapClient::new(
			service,
			config.zap.router_address,
			config.network.multicall_address,
		));
		Ok(Self { config, client })
	}

	/// Builds an orchestrator for a single non-interactive command.
	///
	/// The amount is given once, so there is nothing to debounce.
	pub fn orchestrator(&self) -> SwapOrchestrator {
		let mut policy = ZapPolicy::from_config(&self.config);
		policy.debounce = Duration::ZERO;
		SwapOrchestrator::new(policy, self.client.clone())
	}

	pub fn account(&self) -> Option<zap_types::Address> {
		self.client.account()
	}
}

/// Resolves the pair, applies it to the orchestrator together with the
/// amount and waits until every read it triggered has answered.
pub(crate) async fn prepare_swap(
	orchestrator: &mut SwapOrchestrator,
	pair: &PairArgs,
) -> Result<(TokenDescriptor, TokenDescriptor)> {
	let catalog = &orchestrator.policy().catalog;
	let input = catalog
		.resolve(CatalogSide::Input, &pair.from)
		.cloned()
		.ok_or_else(|| anyhow!("'{}' is not an input token", pair.from))?;
	let output = catalog
		.resolve(CatalogSide::Output, &pair.to)
		.cloned()
		.ok_or_else(|| anyhow!("'{}' is not an output token", pair.to))?;
	if input.address == output.address {
		bail!("Input and output must differ");
	}

	orchestrator.select_input(input.address)?;
	if orchestrator.state().output != Some(output.address) {
		orchestrator.select_output(output.address)?;
	}
	orchestrator.set_amount(pair.amount.clone());
	orchestrator.settle().await;

	if let Some(error) = &orchestrator.state().amount_error {
		bail!("Invalid amount '{}': {error}", pair.amount);
	}
	if orchestrator.state().debounced_amount.is_none() {
		bail!("Amount must be greater than zero");
	}
	Ok((input, output))
}

/// Prints the expected and minimum output, or the quote error.
pub(crate) fn print_quote(orchestrator: &SwapOrchestrator, output: &TokenDescriptor) -> Result<()> {
	let state = orchestrator.state();
	match state.current_quote() {
		Some(quote) => {
			Display::kv(
				"Expected output",
				&format!("{} {}", format_amount(quote.expected_out, output.decimals), output.symbol),
			);
			Display::kv(
				"Minimum output",
				&format!("{} {}", format_amount(quote.min_out, output.decimals), output.symbol),
			);
			Ok(())
		},
		None => Err(anyhow!(
			"No quote available: {}",
			state.quote_error.as_deref().unwrap_or("the router did not answer")
		)),
	}
}

/// Prints every event published since the last call that a user should see.
pub(crate) fn print_events(events: &mut broadcast::Receiver<ZapEvent>) {
	loop {
		let event = match events.try_recv() {
			Ok(event) => event,
			Err(TryRecvError::Lagged(_)) => continue,
			Err(_) => return,
		};
		match event {
			ZapEvent::TransactionSubmitted { kind, hash } => {
				Display::info(&format!("{kind} transaction sent: {hash}"));
				Display::info("Waiting for confirmation...");
			},
			ZapEvent::TransactionConfirmed {
				kind,
				block_number,
				..
			} => Display::success(&format!("{kind} transaction confirmed in block {block_number}")),
			ZapEvent::TransactionFailed { kind, error } => {
				Display::error(&format!("{kind} transaction failed: {error}"))
			},
			ZapEvent::QuoteFailed { error } => Display::warning(&format!("Quote failed: {error}")),
			ZapEvent::BalancesRefreshed { success: false } => {
				Display::warning("Balances could not be refreshed")
			},
			ZapEvent::ConnectionRequested => Display::warning(
				"No account configured; set account.private_key or account.address",
			),
			_ => {},
		}
	}
}
