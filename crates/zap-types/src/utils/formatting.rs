//! String formatting utilities.

use alloy_primitives::B256;

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Shortens a transaction hash for log lines: `0x1234abcd..ef01`.
pub fn truncate_hash(hash: &B256) -> String {
	let full = format!("{hash:?}");
	if full.len() <= 16 {
		full
	} else {
		format!("{}..{}", &full[..10], &full[full.len() - 4..])
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_with_0x_prefix() {
		assert_eq!(with_0x_prefix("abcd"), "0xabcd");
		assert_eq!(with_0x_prefix("0xabcd"), "0xabcd");
		assert_eq!(with_0x_prefix("0XABCD"), "0XABCD");
	}

	#[test]
	fn test_without_0x_prefix() {
		assert_eq!(without_0x_prefix("0xabcd"), "abcd");
		assert_eq!(without_0x_prefix("0Xabcd"), "abcd");
		assert_eq!(without_0x_prefix("abcd"), "abcd");
	}

	#[test]
	fn test_truncate_hash() {
		let hash = B256::repeat_byte(0xab);
		assert_eq!(truncate_hash(&hash), "0xabababab..abab");
	}
}
