//! Fixed-precision amount handling.
//!
//! Amounts typed by the user are decimal strings. They are scaled to raw
//! on-chain integers with exact string arithmetic so that no precision is
//! lost to floating point.

use alloy_primitives::U256;
use thiserror::Error;

/// Decimal precision shared by every token in the zap family.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Errors that can occur while parsing a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
	/// The input was empty or only whitespace.
	#[error("Amount is empty")]
	Empty,
	/// The input is not a plain non-negative decimal number.
	#[error("Invalid amount: {0}")]
	Invalid(String),
	/// The input has more fractional digits than the token precision.
	#[error("Amount {amount} has more than {decimals} decimal places")]
	TooManyDecimals { amount: String, decimals: u8 },
	/// The scaled value does not fit in 256 bits.
	#[error("Amount {0} is too large")]
	Overflow(String),
}

/// Parses a decimal string into a raw integer scaled by `decimals`.
pub fn parse_amount(text: &str, decimals: u8) -> Result<U256, AmountError> {
	let amount = text.trim();
	if amount.is_empty() {
		return Err(AmountError::Empty);
	}

	let (whole, fraction) = match amount.split_once('.') {
		Some((whole, fraction)) => (whole, fraction),
		None => (amount, ""),
	};

	if whole.is_empty() && fraction.is_empty() {
		return Err(AmountError::Invalid(amount.to_string()));
	}
	if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
	{
		return Err(AmountError::Invalid(amount.to_string()));
	}
	if fraction.len() > decimals as usize {
		return Err(AmountError::TooManyDecimals {
			amount: amount.to_string(),
			decimals,
		});
	}

	let padded = format!(
		"{}{:0<width$}",
		if whole.is_empty() { "0" } else { whole },
		fraction,
		width = decimals as usize
	);

	U256::from_str_radix(&padded, 10).map_err(|_| AmountError::Overflow(amount.to_string()))
}

/// Formats a raw integer amount as a human-readable decimal string.
///
/// Trailing fractional zeros are trimmed: `1.5`, `100`, `0`.
pub fn format_amount(raw: U256, decimals: u8) -> String {
	if decimals == 0 {
		return raw.to_string();
	}

	let divisor = U256::from(10u64).pow(U256::from(decimals));
	let whole = raw / divisor;
	let fraction = raw % divisor;

	if fraction.is_zero() {
		return whole.to_string();
	}

	let fraction_str = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
	format!("{}.{}", whole, fraction_str.trim_end_matches('0'))
}

/// Formats a raw amount keeping at most `places` fractional digits.
///
/// Digits beyond `places` are truncated, never rounded up, so a displayed
/// balance is never larger than what the account holds.
pub fn format_amount_truncated(raw: U256, decimals: u8, places: usize) -> String {
	let full = format_amount(raw, decimals);
	match full.split_once('.') {
		Some((whole, fraction)) => {
			let kept = fraction[..fraction.len().min(places)].trim_end_matches('0');
			if kept.is_empty() {
				whole.to_string()
			} else {
				format!("{}.{}", whole, kept)
			}
		},
		None => full,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn e18(n: u64) -> U256 {
		U256::from(n) * U256::from(10u64).pow(U256::from(18))
	}

	#[test]
	fn test_parse_whole_and_fractional_amounts() {
		assert_eq!(parse_amount("100", 18).unwrap(), e18(100));
		assert_eq!(
			parse_amount("1.5", 18).unwrap(),
			U256::from(1_500_000_000_000_000_000u128)
		);
		assert_eq!(
			parse_amount(".5", 18).unwrap(),
			U256::from(500_000_000_000_000_000u128)
		);
		assert_eq!(parse_amount("5.", 18).unwrap(), e18(5));
		assert_eq!(parse_amount(" 2 ", 18).unwrap(), e18(2));
		assert_eq!(parse_amount("0.000000000000000001", 18).unwrap(), U256::from(1));
	}

	#[test]
	fn test_parse_rejects_malformed_input() {
		assert_eq!(parse_amount("", 18), Err(AmountError::Empty));
		assert_eq!(parse_amount("   ", 18), Err(AmountError::Empty));
		assert!(matches!(parse_amount(".", 18), Err(AmountError::Invalid(_))));
		assert!(matches!(parse_amount("-1", 18), Err(AmountError::Invalid(_))));
		assert!(matches!(parse_amount("1.2.3", 18), Err(AmountError::Invalid(_))));
		assert!(matches!(parse_amount("abc", 18), Err(AmountError::Invalid(_))));
		assert!(matches!(parse_amount("1e18", 18), Err(AmountError::Invalid(_))));
	}

	#[test]
	fn test_parse_rejects_excess_precision() {
		let result = parse_amount("0.0000000000000000001", 18);
		assert!(matches!(
			result,
			Err(AmountError::TooManyDecimals { decimals: 18, .. })
		));
	}

	#[test]
	fn test_parse_overflow() {
		let huge = "9".repeat(80);
		assert!(matches!(parse_amount(&huge, 18), Err(AmountError::Overflow(_))));
	}

	#[test]
	fn test_format_amount() {
		assert_eq!(format_amount(e18(100), 18), "100");
		assert_eq!(
			format_amount(U256::from(1_500_000_000_000_000_000u128), 18),
			"1.5"
		);
		assert_eq!(format_amount(U256::ZERO, 18), "0");
		assert_eq!(format_amount(U256::from(1), 18), "0.000000000000000001");
		assert_eq!(format_amount(U256::from(42), 0), "42");
	}

	#[test]
	fn test_format_amount_truncated() {
		let raw = U256::from(98_970_300_000_000_000_000u128);
		assert_eq!(format_amount_truncated(raw, 18, 2), "98.97");
		assert_eq!(format_amount_truncated(raw, 18, 6), "98.9703");
		assert_eq!(format_amount_truncated(U256::from(1), 18, 4), "0");
		assert_eq!(format_amount_truncated(e18(3), 18, 4), "3");
	}
}
