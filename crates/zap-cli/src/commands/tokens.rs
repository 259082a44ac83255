use crate::cli::output::Display;
use anyhow::Result;
use zap_config::Config;
use zap_core::ZapPolicy;
use zap_types::TokenDescriptor;

pub fn run(config: &Config) -> Result<()> {
	let policy = ZapPolicy::from_config(config);

	Display::header("Input tokens");
	Display::table(
		&["Symbol", "Address", "Notes"],
		&rows(&policy, &policy.catalog.inputs),
	);

	Display::header("Output tokens");
	Display::table(
		&["Symbol", "Address", "Notes"],
		&rows(&policy, &policy.catalog.outputs),
	);
	Ok(())
}

fn rows(policy: &ZapPolicy, tokens: &[TokenDescriptor]) -> Vec<Vec<String>> {
	tokens
		.iter()
		.map(|token| {
			vec![
				token.symbol.clone(),
				token.address.to_checksum(None),
				notes(policy, token),
			]
		})
		.collect()
}

fn notes(policy: &ZapPolicy, token: &TokenDescriptor) -> String {
	let mut notes = Vec::new();
	if policy.one_to_one.contains(&token.address) {
		notes.push("1:1".to_string());
	}
	if token.address == policy.staking_token {
		notes.push("staking".to_string());
	}
	if let Some(forced) = policy.forced_output(&token.address) {
		notes.push(format!("only into {}", policy.symbol_of(&forced)));
	}
	notes.join(", ")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_mainnet_notes() {
		let policy = ZapPolicy::from_config(&Config::mainnet().unwrap());
		let inputs = rows(&policy, &policy.catalog.inputs);

		let note_of = |symbol: &str| {
			inputs
				.iter()
				.find(|row| row[0] == symbol)
				.map(|row| row[2].clone())
				.unwrap()
		};
		assert_eq!(note_of("yCRV"), "1:1");
		assert_eq!(note_of("CRV"), "");
		assert_eq!(note_of("YBS"), "1:1, staking");
		assert_eq!(note_of("lp-yCRVv1"), "only into lp-yCRVv2");
	}
}
