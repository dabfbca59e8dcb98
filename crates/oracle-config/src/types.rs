//! Configuration types for the oracle.

use alloy::primitives::Address;
use oracle_types::{PriceSchedule, PricingError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Complete oracle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Service identity and HTTP settings.
	pub oracle: OracleSettings,
	/// Chain-data provider.
	pub chain: ChainConfig,
	/// Key holder for mint authorizations.
	pub account: AccountConfig,
	/// Backend for the reservation ledger.
	pub storage: StorageConfig,
	/// What a valid payment looks like.
	pub payment: PaymentConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleSettings {
	pub name: String,
	#[serde(default = "default_http_host")]
	pub http_host: String,
	#[serde(default = "default_http_port")]
	pub http_port: u16,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

/// Chain provider selection plus receipt polling policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Name of the chain reader implementation, e.g. "alloy".
	pub provider: String,
	/// Receipt lookups attempted before giving up.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Fixed pause between receipt lookups.
	#[serde(default = "default_retry_delay_ms")]
	pub retry_delay_ms: u64,
	/// Provider-specific settings.
	pub config: toml::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Name of the account implementation, e.g. "local".
	pub provider: String,
	pub config: toml::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Name of the storage backend, "file" or "memory".
	pub backend: String,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

/// Payment expectations shared by verification and price display.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentConfig {
	/// Wallet that must receive the payment.
	pub recipient: Address,
	/// ERC-20 contract whose transfers count. Any emitter is accepted if unset.
	#[serde(default)]
	pub token_address: Option<Address>,
	#[serde(default = "default_token_decimals")]
	pub token_decimals: u8,
	/// Tolerance is `expected / tolerance_divisor` base units.
	#[serde(default = "default_tolerance_divisor")]
	pub tolerance_divisor: u64,
	/// Client-claimed amounts further than this from the expected amount are logged.
	#[serde(default = "default_claimed_amount_slack")]
	pub claimed_amount_slack: Decimal,
	/// Required amount per sequence position, in whole token units.
	pub tiers: Vec<Decimal>,
}

impl PaymentConfig {
	pub fn price_schedule(&self) -> Result<PriceSchedule, PricingError> {
		PriceSchedule::new(self.tiers.clone())
	}
}

fn default_http_host() -> String {
	"0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
	3000
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_max_attempts() -> u32 {
	5
}

fn default_retry_delay_ms() -> u64 {
	2000
}

fn default_token_decimals() -> u8 {
	18
}

fn default_tolerance_divisor() -> u64 {
	1000
}

fn default_claimed_amount_slack() -> Decimal {
	Decimal::ONE
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}
