//! Error types for the zap core.

use thiserror::Error;
use zap_delivery::DeliveryError;
use zap_types::AmountError;

/// Errors that can occur while quoting, approving or swapping.
#[derive(Debug, Error)]
pub enum ZapError {
	/// Error from the underlying delivery layer.
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	/// A contract returned data that could not be decoded.
	#[error("Decode error: {0}")]
	Decode(String),
	/// The operation needs a connected account.
	#[error("No account connected")]
	NotConnected,
	/// The amount could not be parsed.
	#[error("Invalid amount: {0}")]
	InvalidAmount(#[from] AmountError),
	/// The token is not part of the catalog side it was used on.
	#[error("Unknown token: {0}")]
	UnknownToken(String),
	/// The requested operation is not allowed in the current state.
	#[error("Invalid state: {0}")]
	InvalidState(String),
}
