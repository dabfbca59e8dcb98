//! Mint authorizations issued by the oracle.

use crate::TokenId;
use alloy::primitives::Signature;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Recoverable ECDSA signature in `r || s || v` layout, `v` being 27 or 28.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MintSignature(pub [u8; 65]);

impl MintSignature {
	/// Hex encoding with a `0x` prefix, the form the mint call expects.
	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(self.0))
	}
}

impl std::fmt::Debug for MintSignature {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "MintSignature({})", self.to_hex())
	}
}

impl From<Signature> for MintSignature {
	fn from(sig: Signature) -> Self {
		let mut bytes = [0u8; 65];
		bytes[..32].copy_from_slice(&sig.r().to_be_bytes::<32>());
		bytes[32..64].copy_from_slice(&sig.s().to_be_bytes::<32>());
		bytes[64] = if sig.v() { 28 } else { 27 };
		MintSignature(bytes)
	}
}

impl Serialize for MintSignature {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de> Deserialize<'de> for MintSignature {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		let raw = hex::decode(s.strip_prefix("0x").unwrap_or(&s))
			.map_err(serde::de::Error::custom)?;
		let bytes: [u8; 65] = raw
			.try_into()
			.map_err(|_| serde::de::Error::custom("signature must be 65 bytes"))?;
		Ok(MintSignature(bytes))
	}
}

/// Proof that a payment was verified, bound to one token id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintAuthorization {
	pub token_id: TokenId,
	pub verified: bool,
	pub signature: MintSignature,
	/// Amount the payment was checked against, in whole token units.
	pub expected_amount: Decimal,
}
