//! Matching a payment claim against chain data.
//!
//! ERC-20 transfers are recognised by convention: a log whose first topic is
//! the `Transfer(address,address,uint256)` signature, with sender and recipient
//! as the two indexed topics and the value in the first data word. ERC-721
//! transfers share the signature but index the token id as a fourth topic,
//! which is how the two are told apart.

use alloy::primitives::{Address, B256, U256};
use alloy::sol;
use alloy::sol_types::SolEvent;
use oracle_types::{
	to_base_units, ReceiptLog, TransactionInfo, TransactionReceipt, TransferClaim,
};
use rust_decimal::Decimal;
use thiserror::Error;

sol! {
	event Transfer(address indexed from, address indexed to, uint256 value);
}

/// Why a payment did not match its claim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchFailure {
	#[error("Transaction reverted")]
	ReceiptFailed,
	#[error("Transaction body not found")]
	TransactionNotFound,
	#[error("Transaction sent by {actual}, expected {expected}")]
	SenderMismatch { expected: Address, actual: Address },
	#[error("No token transfer found in transaction")]
	NoTransferLogs,
	#[error("No transfer to {0} found in transaction")]
	RecipientNotFound(Address),
	#[error("Transfer value field is malformed")]
	MalformedAmount,
	#[error("Expected amount {0} cannot be expressed in base units")]
	UnrepresentableAmount(Decimal),
	#[error("Transferred {observed}, expected {expected} (tolerance {tolerance})")]
	AmountOutOfTolerance {
		expected: U256,
		observed: U256,
		tolerance: U256,
	},
}

impl MatchFailure {
	/// Stable identifier for API responses.
	pub fn kind(&self) -> &'static str {
		match self {
			MatchFailure::ReceiptFailed => "ReceiptFailed",
			MatchFailure::TransactionNotFound => "TransactionNotFound",
			MatchFailure::SenderMismatch { .. } => "SenderMismatch",
			MatchFailure::NoTransferLogs => "NoTransferLogs",
			MatchFailure::RecipientNotFound(_) => "RecipientNotFound",
			MatchFailure::MalformedAmount => "MalformedAmount",
			MatchFailure::UnrepresentableAmount(_) => "UnrepresentableAmount",
			MatchFailure::AmountOutOfTolerance { .. } => "AmountOutOfTolerance",
		}
	}
}

/// The transfer log that satisfied a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedTransfer {
	/// Position of the log within the receipt.
	pub log_index: usize,
	pub token: Address,
	pub from: Address,
	pub to: Address,
	pub amount: U256,
	/// Claimed amount in base units.
	pub expected: U256,
}

/// Checks receipts for an ERC-20 payment of the expected size.
#[derive(Debug, Clone)]
pub struct TransferMatcher {
	token_decimals: u8,
	tolerance_divisor: U256,
	token_address: Option<Address>,
}

impl TransferMatcher {
	/// `tolerance_divisor` of zero is treated as one (tolerance equals the
	/// expected amount); configuration validation rejects it earlier.
	pub fn new(token_decimals: u8, tolerance_divisor: u64, token_address: Option<Address>) -> Self {
		Self {
			token_decimals,
			tolerance_divisor: U256::from(tolerance_divisor.max(1)),
			token_address,
		}
	}

	pub fn match_transfer(
		&self,
		receipt: &TransactionReceipt,
		transaction: &TransactionInfo,
		claim: &TransferClaim,
	) -> Result<MatchedTransfer, MatchFailure> {
		if !receipt.success {
			return Err(MatchFailure::ReceiptFailed);
		}

		if transaction.from != claim.expected_sender {
			return Err(MatchFailure::SenderMismatch {
				expected: claim.expected_sender,
				actual: transaction.from,
			});
		}

		let mut transfers = receipt
			.logs
			.iter()
			.enumerate()
			.filter(|(_, log)| self.is_token_transfer(log))
			.peekable();
		if transfers.peek().is_none() {
			return Err(MatchFailure::NoTransferLogs);
		}

		let (log_index, log) = transfers
			.find(|(_, log)| Address::from_word(log.topics[2]) == claim.expected_recipient)
			.ok_or(MatchFailure::RecipientNotFound(claim.expected_recipient))?;

		let amount = log
			.data
			.get(..32)
			.map(U256::from_be_slice)
			.ok_or(MatchFailure::MalformedAmount)?;

		let expected = to_base_units(claim.expected_amount, self.token_decimals)
			.ok_or(MatchFailure::UnrepresentableAmount(claim.expected_amount))?;
		let tolerance = expected / self.tolerance_divisor;
		let difference = if amount > expected {
			amount - expected
		} else {
			expected - amount
		};

		if difference > tolerance {
			return Err(MatchFailure::AmountOutOfTolerance {
				expected,
				observed: amount,
				tolerance,
			});
		}

		Ok(MatchedTransfer {
			log_index,
			token: log.address,
			from: Address::from_word(log.topics[1]),
			to: Address::from_word(log.topics[2]),
			amount,
			expected,
		})
	}

	fn is_token_transfer(&self, log: &ReceiptLog) -> bool {
		log.topics.len() == 3
			&& log.signature() == Some(&Transfer::SIGNATURE_HASH)
			&& self.token_address.map_or(true, |token| token == log.address)
	}
}

/// Token id minted by a transaction: the first ERC-721 `Transfer` from the
/// zero address.
pub fn find_minted_token_id(receipt: &TransactionReceipt) -> Option<U256> {
	receipt
		.logs
		.iter()
		.find(|log| {
			log.topics.len() == 4
				&& log.topics[0] == Transfer::SIGNATURE_HASH
				&& log.topics[1] == B256::ZERO
		})
		.map(|log| U256::from_be_bytes(log.topics[3].0))
}
