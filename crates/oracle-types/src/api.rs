//! Request and response bodies for the oracle HTTP API.
//!
//! Inbound payloads are deserialized loosely (every field optional) and then
//! validated into strongly typed values, so that a missing or malformed field
//! produces a precise 400 instead of a generic body-parsing failure.

use crate::{MintAuthorization, TokenId, VerificationRequest};
use alloy::primitives::{Address, TxHash};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons an inbound request is rejected before any chain I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
	#[error("Missing required parameter: {0}")]
	MissingField(&'static str),
	#[error("Invalid transaction hash: {0}")]
	InvalidTxHash(String),
	#[error("Invalid wallet address: {0}")]
	InvalidAddress(String),
	#[error("Amount must not be negative")]
	NegativeAmount,
	#[error("Malformed request body: {0}")]
	MalformedBody(String),
}

/// Body of `POST /api/verify-transfer`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTransferRequest {
	pub tx_hash: Option<String>,
	pub wallet_address: Option<String>,
	/// Amount the client displayed, in whole token units.
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		with = "rust_decimal::serde::float_option"
	)]
	pub amount: Option<Decimal>,
}

impl VerifyTransferRequest {
	/// Checks presence and format of every field.
	pub fn validate(&self) -> Result<VerificationRequest, RequestError> {
		let tx_hash = self
			.tx_hash
			.as_deref()
			.filter(|s| !s.is_empty())
			.ok_or(RequestError::MissingField("txHash"))?;
		let wallet = self
			.wallet_address
			.as_deref()
			.filter(|s| !s.is_empty())
			.ok_or(RequestError::MissingField("walletAddress"))?;

		if matches!(self.amount, Some(amount) if amount.is_sign_negative() && !amount.is_zero()) {
			return Err(RequestError::NegativeAmount);
		}

		Ok(VerificationRequest {
			tx_hash: parse_tx_hash(tx_hash)?,
			wallet: parse_address(wallet)?,
			claimed_amount: self.amount,
		})
	}
}

/// Parses a `0x`-prefixed, 32-byte hex transaction hash.
pub fn parse_tx_hash(value: &str) -> Result<TxHash, RequestError> {
	let digits = value
		.strip_prefix("0x")
		.ok_or_else(|| RequestError::InvalidTxHash(value.to_string()))?;
	if digits.len() != 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
		return Err(RequestError::InvalidTxHash(value.to_string()));
	}
	value
		.parse()
		.map_err(|_| RequestError::InvalidTxHash(value.to_string()))
}

/// Parses a `0x`-prefixed, 20-byte hex address in any letter case.
pub fn parse_address(value: &str) -> Result<Address, RequestError> {
	let digits = value
		.strip_prefix("0x")
		.ok_or_else(|| RequestError::InvalidAddress(value.to_string()))?;
	if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
		return Err(RequestError::InvalidAddress(value.to_string()));
	}
	value
		.parse()
		.map_err(|_| RequestError::InvalidAddress(value.to_string()))
}

/// Body returned by `POST /api/verify-transfer`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTransferResponse {
	pub verified: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub signature: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_id: Option<TokenId>,
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		with = "rust_decimal::serde::float_option"
	)]
	pub expected_amount: Option<Decimal>,
	/// Machine-readable rejection kind.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	/// Human-readable explanation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl VerifyTransferResponse {
	pub fn authorized(authorization: &MintAuthorization) -> Self {
		Self {
			verified: authorization.verified,
			signature: Some(authorization.signature.to_hex()),
			token_id: Some(authorization.token_id),
			expected_amount: Some(authorization.expected_amount),
			reason: None,
			error: None,
		}
	}

	pub fn rejected(reason: impl Into<String>, error: impl Into<String>) -> Self {
		Self {
			verified: false,
			reason: Some(reason.into()),
			error: Some(error.into()),
			..Default::default()
		}
	}
}

/// Body returned by `GET /api/pricing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponse {
	#[serde(with = "decimal_list")]
	pub tiers: Vec<Decimal>,
	pub next_token_id: TokenId,
	#[serde(with = "rust_decimal::serde::float")]
	pub next_amount: Decimal,
	pub recipient: Address,
	pub token_decimals: u8,
}

/// Body returned by `GET /api/mints/{txHash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintedTokenResponse {
	pub tx_hash: TxHash,
	/// Decimal string; ERC-721 ids are 256-bit.
	pub token_id: String,
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub signer: Address,
	pub timestamp: i64,
}

/// Generic error body for non-verification endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
}

mod decimal_list {
	use rust_decimal::prelude::ToPrimitive;
	use rust_decimal::Decimal;
	use serde::{Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S: Serializer>(values: &[Decimal], serializer: S) -> Result<S::Ok, S::Error> {
		let floats: Vec<f64> = values.iter().filter_map(|d| d.to_f64()).collect();
		floats.serialize(serializer)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Decimal>, D::Error> {
		let floats = Vec::<f64>::deserialize(deserializer)?;
		floats
			.into_iter()
			.map(|f| Decimal::try_from(f).map_err(serde::de::Error::custom))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const TX: &str = "0xabc0000000000000000000000000000000000000000000000000000000000001";
	const WALLET: &str = "0x00000000000000000000000000000000000000Aa";

	#[test]
	fn test_validate_accepts_well_formed_request() {
		let request: VerifyTransferRequest = serde_json::from_value(serde_json::json!({
			"txHash": TX,
			"walletAddress": WALLET,
			"amount": 4450
		}))
		.unwrap();

		let validated = request.validate().unwrap();
		assert_eq!(validated.tx_hash, TX.parse::<TxHash>().unwrap());
		assert_eq!(validated.wallet, WALLET.to_lowercase().parse::<Address>().unwrap());
		assert_eq!(validated.claimed_amount, Some(Decimal::from(4450)));
	}

	#[test]
	fn test_validate_reports_missing_fields() {
		let request = VerifyTransferRequest {
			wallet_address: Some(WALLET.to_string()),
			..Default::default()
		};
		assert_eq!(
			request.validate().unwrap_err(),
			RequestError::MissingField("txHash")
		);

		let request = VerifyTransferRequest {
			tx_hash: Some(TX.to_string()),
			wallet_address: Some(String::new()),
			..Default::default()
		};
		assert_eq!(
			request.validate().unwrap_err(),
			RequestError::MissingField("walletAddress")
		);
	}

	#[test]
	fn test_validate_rejects_bad_formats() {
		assert!(matches!(
			parse_tx_hash("abc"),
			Err(RequestError::InvalidTxHash(_))
		));
		assert!(matches!(
			parse_tx_hash(&TX[2..]),
			Err(RequestError::InvalidTxHash(_))
		));
		assert!(matches!(
			parse_tx_hash("0xzz00000000000000000000000000000000000000000000000000000000000000"),
			Err(RequestError::InvalidTxHash(_))
		));
		assert!(matches!(
			parse_address("0x1234"),
			Err(RequestError::InvalidAddress(_))
		));

		let request = VerifyTransferRequest {
			tx_hash: Some(TX.to_string()),
			wallet_address: Some(WALLET.to_string()),
			amount: Some(Decimal::from(-5)),
		};
		assert_eq!(request.validate().unwrap_err(), RequestError::NegativeAmount);
	}

	#[test]
	fn test_rejected_response_omits_authorization_fields() {
		let response = VerifyTransferResponse::rejected("ReceiptUnavailable", "not indexed yet");
		let json = serde_json::to_value(&response).unwrap();

		assert_eq!(json["verified"], false);
		assert_eq!(json["reason"], "ReceiptUnavailable");
		assert!(json.get("signature").is_none());
		assert!(json.get("tokenId").is_none());
	}
}
