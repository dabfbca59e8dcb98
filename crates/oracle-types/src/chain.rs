//! Chain data as consumed by the oracle.
//!
//! These are read-only projections of what the chain-data provider returns.
//! Only the fields the verification flow inspects are kept.

use alloy::primitives::{Address, Bytes, TxHash, B256};
use serde::{Deserialize, Serialize};

/// Receipt of an executed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TxHash,
	/// The block number where the transaction was included, if known.
	pub block_number: Option<u64>,
	/// Whether the transaction executed successfully.
	pub success: bool,
	/// Logs emitted during execution, in order.
	pub logs: Vec<ReceiptLog>,
}

/// A single event log from a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLog {
	/// Contract that emitted the log.
	pub address: Address,
	/// Indexed topics; the first one is the event signature.
	pub topics: Vec<B256>,
	/// Non-indexed event data.
	pub data: Bytes,
}

impl ReceiptLog {
	/// Returns the event signature topic, if any.
	pub fn signature(&self) -> Option<&B256> {
		self.topics.first()
	}
}

/// The parts of a transaction body the oracle needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
	/// The hash of the transaction.
	pub hash: TxHash,
	/// Account that signed the transaction.
	pub from: Address,
	/// Called contract or recipient, `None` for contract creation.
	pub to: Option<Address>,
}
