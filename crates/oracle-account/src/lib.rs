//! Signing key management for mint authorizations.
//!
//! The oracle's only privileged capability is its signing key. The key holder
//! sits behind [`AccountInterface`]; [`AccountService`] turns a verified
//! payment into the signature the on-chain verifier expects.

use alloy::primitives::{Address, Signature, TxHash, B256};
use async_trait::async_trait;
use oracle_types::{MintSignature, TokenId};
use thiserror::Error;

pub mod message;

pub mod implementations {
	pub mod local;
}

pub use message::{mint_message_hash, pack_mint_message};

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing key is not configured")]
	MissingKey,
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Signing failed: {0}")]
	SigningFailed(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Address derived from the held key.
	fn address(&self) -> Address;

	/// Signs a 32-byte digest as-is, without any message prefix.
	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError>;
}

pub struct AccountService {
	provider: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(provider: Box<dyn AccountInterface>) -> Self {
		Self { provider }
	}

	pub fn signer_address(&self) -> Address {
		self.provider.address()
	}

	/// Produces the signature the mint contract checks for `token_id`.
	pub async fn sign_mint_authorization(
		&self,
		tx_hash: &TxHash,
		minter: &Address,
		token_id: TokenId,
	) -> Result<MintSignature, AccountError> {
		let digest = mint_message_hash(tx_hash, minter, token_id);
		let signature = self.provider.sign_hash(&digest).await?;
		Ok(MintSignature::from(signature))
	}
}
