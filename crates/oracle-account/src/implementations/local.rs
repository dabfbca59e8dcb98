//! Local private key wallet.

use crate::{AccountError, AccountInterface};
use alloy::primitives::{Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;

/// Holds a secp256k1 key in process memory.
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Accepts a hex key with or without `0x`.
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let trimmed = private_key_hex.trim();
		if trimmed.is_empty() {
			return Err(AccountError::MissingKey);
		}

		let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
		if digits.len() != 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
			return Err(AccountError::InvalidKey(
				"Private key must be 64 hex characters (32 bytes)".to_string(),
			));
		}

		// The parse error is not echoed; it may quote key material.
		let signer = digits
			.parse::<PrivateKeySigner>()
			.map_err(|_| AccountError::InvalidKey("Not a valid secp256k1 key".to_string()))?;

		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn address(&self) -> Address {
		self.signer.address()
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.signer
			.sign_hash(hash)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))
	}
}

/// Configuration parameters:
/// - `private_key`: hex-encoded key, normally `"${SIGNER_PRIVATE_KEY}"`
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or(AccountError::MissingKey)?;

	let wallet = LocalWallet::new(private_key)?;
	tracing::info!(signer = %wallet.address(), "Loaded local signing key");
	Ok(Box::new(wallet))
}
