//! JSON-RPC chain reader built on alloy.

use crate::{ChainError, ChainInterface};
use alloy::consensus::Transaction as ConsensusTransaction;
use alloy::network::{Ethereum, TransactionResponse};
use alloy::primitives::TxHash;
use alloy::providers::{Provider, RootProvider};
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use oracle_types::{ReceiptLog, TransactionInfo, TransactionReceipt};
use serde::Deserialize;
use std::sync::Arc;

/// Settings under `[chain.config]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
	/// HTTP(S) endpoint; hosted providers usually embed the API key in the path.
	pub rpc_url: String,
}

impl RpcConfig {
	pub fn from_toml(config: &toml::Value) -> Result<Self, ChainError> {
		let parsed: RpcConfig = config
			.clone()
			.try_into()
			.map_err(|e| ChainError::InvalidConfig(format!("chain.config: {}", e)))?;

		if !parsed.rpc_url.starts_with("http://") && !parsed.rpc_url.starts_with("https://") {
			return Err(ChainError::InvalidConfig(
				"rpc_url must start with http:// or https://".to_string(),
			));
		}
		Ok(parsed)
	}
}

/// Reads receipts and transactions over `eth_getTransactionReceipt` and
/// `eth_getTransactionByHash`.
pub struct AlloyChainReader {
	provider: RootProvider<Ethereum>,
}

impl AlloyChainReader {
	pub fn new(rpc_url: &str) -> Result<Self, ChainError> {
		let url: Url = rpc_url
			.parse()
			.map_err(|e| ChainError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;

		Ok(Self {
			provider: RootProvider::new_http(url),
		})
	}
}

#[async_trait]
impl ChainInterface for AlloyChainReader {
	async fn get_receipt(
		&self,
		tx_hash: &TxHash,
	) -> Result<Option<TransactionReceipt>, ChainError> {
		let receipt = self
			.provider
			.get_transaction_receipt(*tx_hash)
			.await
			.map_err(|e| ChainError::Transport(format!("Failed to get receipt: {}", e)))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: receipt.transaction_hash,
			block_number: receipt.block_number,
			success: receipt.status(),
			logs: receipt
				.inner
				.logs()
				.iter()
				.map(|log| ReceiptLog {
					address: log.address(),
					topics: log.topics().to_vec(),
					data: log.data().data.clone(),
				})
				.collect(),
		}))
	}

	async fn get_transaction(
		&self,
		tx_hash: &TxHash,
	) -> Result<Option<TransactionInfo>, ChainError> {
		let tx = self
			.provider
			.get_transaction_by_hash(*tx_hash)
			.await
			.map_err(|e| ChainError::Transport(format!("Failed to get transaction: {}", e)))?;

		Ok(tx.map(|tx| TransactionInfo {
			hash: TransactionResponse::tx_hash(&tx),
			from: TransactionResponse::from(&tx),
			to: ConsensusTransaction::to(&tx),
		}))
	}
}

/// Configuration parameters:
/// - `rpc_url`: HTTP(S) JSON-RPC endpoint (required)
pub fn create_chain_reader(config: &toml::Value) -> Result<Arc<dyn ChainInterface>, ChainError> {
	let config = RpcConfig::from_toml(config)?;
	tracing::info!(
		host = %config.rpc_url.split('/').nth(2).unwrap_or("unknown"),
		"Using JSON-RPC chain reader"
	);
	Ok(Arc::new(AlloyChainReader::new(&config.rpc_url)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table(rpc_url: &str) -> toml::Value {
		let mut table = toml::map::Map::new();
		table.insert("rpc_url".into(), toml::Value::String(rpc_url.into()));
		toml::Value::Table(table)
	}

	#[test]
	fn test_config_requires_http_url() {
		assert!(RpcConfig::from_toml(&table("https://base.example.com/v2/key")).is_ok());
		assert!(matches!(
			RpcConfig::from_toml(&table("wss://base.example.com")),
			Err(ChainError::InvalidConfig(_))
		));
		assert!(matches!(
			RpcConfig::from_toml(&toml::Value::Table(toml::map::Map::new())),
			Err(ChainError::InvalidConfig(_))
		));
	}

	#[tokio::test]
	async fn test_factory_builds_reader() {
		assert!(create_chain_reader(&table("http://127.0.0.1:8545")).is_ok());
	}
}
