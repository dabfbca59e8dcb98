use crate::matcher::MatchFailure;
use thiserror::Error;

/// Failures of the oracle itself, as opposed to payments it refused.
#[derive(Debug, Error)]
pub enum OracleError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Signing unavailable: {0}")]
	SigningUnavailable(String),
	#[error("Token id allocation failed: {0}")]
	Allocation(String),
}

/// A payment the oracle looked at and declined to authorize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
	#[error("Transaction receipt not available")]
	ReceiptUnavailable,
	#[error("Transfer not verified: {0}")]
	TransferNotVerified(MatchFailure),
}

impl Rejection {
	pub fn kind(&self) -> &'static str {
		match self {
			Rejection::ReceiptUnavailable => "ReceiptUnavailable",
			Rejection::TransferNotVerified(_) => "TransferNotVerified",
		}
	}
}
