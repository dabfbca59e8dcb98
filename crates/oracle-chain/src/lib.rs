//! Chain access for the mint oracle.
//!
//! A [`ChainInterface`] answers single lookups against a chain-data provider.
//! [`ReceiptFetcher`] wraps one with a bounded [`RetryPolicy`], because a
//! payment the buyer just broadcast is often not indexed yet when the oracle
//! is asked about it.

use alloy::primitives::TxHash;
use async_trait::async_trait;
use oracle_types::{TransactionInfo, TransactionReceipt};
use std::sync::Arc;
use thiserror::Error;

pub mod retry;

pub mod implementations {
	pub mod rpc;
}

pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ChainError {
	#[error("Transport error: {0}")]
	Transport(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

/// One-shot reads against a chain-data provider.
///
/// `Ok(None)` means the provider does not know the transaction (yet).
#[async_trait]
pub trait ChainInterface: Send + Sync {
	async fn get_receipt(
		&self,
		tx_hash: &TxHash,
	) -> Result<Option<TransactionReceipt>, ChainError>;

	async fn get_transaction(
		&self,
		tx_hash: &TxHash,
	) -> Result<Option<TransactionInfo>, ChainError>;
}

/// Looks up receipts and transactions, retrying until they show up.
#[derive(Clone)]
pub struct ReceiptFetcher {
	chain: Arc<dyn ChainInterface>,
	policy: RetryPolicy,
}

impl ReceiptFetcher {
	pub fn new(chain: Arc<dyn ChainInterface>, policy: RetryPolicy) -> Self {
		Self { chain, policy }
	}

	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Returns `None` only after every attempt came back empty or failed.
	pub async fn fetch_receipt(&self, tx_hash: &TxHash) -> Option<TransactionReceipt> {
		self.policy
			.retry_until_some("receipt", tx_hash, || self.chain.get_receipt(tx_hash))
			.await
	}

	pub async fn fetch_transaction(&self, tx_hash: &TxHash) -> Option<TransactionInfo> {
		self.policy
			.retry_until_some("transaction", tx_hash, || {
				self.chain.get_transaction(tx_hash)
			})
			.await
	}
}
