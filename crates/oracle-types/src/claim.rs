//! Payment claims made by buyers.

use alloy::primitives::{Address, TxHash};
use rust_decimal::Decimal;

/// A validated request to verify a payment and authorize a mint.
///
/// Built from the HTTP body at the boundary; all formats are checked before
/// any chain I/O happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
	/// Hash of the payment transaction.
	pub tx_hash: TxHash,
	/// Wallet that paid and will mint.
	pub wallet: Address,
	/// Amount the client believes it paid. Advisory only.
	pub claimed_amount: Option<Decimal>,
}

/// What a payment transaction is expected to show on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferClaim {
	pub tx_hash: TxHash,
	pub expected_sender: Address,
	pub expected_recipient: Address,
	/// Amount in whole token units (not base units).
	pub expected_amount: Decimal,
}
