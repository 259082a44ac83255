//! Utility functions for common formatting.

pub mod formatting;

pub use formatting::{truncate_hash, with_0x_prefix, without_0x_prefix};
