//! Configuration loading for the mint oracle.
//!
//! Configuration is a TOML file in which `${VAR}` references are replaced by
//! environment variables before parsing. Secrets such as the signing key and
//! the provider API key are expected to arrive this way. A reference to an
//! unset variable is an error, never an empty string.

use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "ORACLE_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let file_path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;

		if !Path::new(file_path).exists() {
			return Err(ConfigError::FileNotFound(file_path.clone()));
		}

		let content = tokio::fs::read_to_string(file_path).await?;
		self.load_from_str(&content)
	}

	/// Parses, overrides and validates configuration held in memory.
	pub fn load_from_str(&self, content: &str) -> Result<Config, ConfigError> {
		let substituted = substitute_env_vars(content)?;

		let mut config: Config =
			toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?;

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			debug!("Overriding log level from environment");
			config.oracle.log_level = log_level;
		}

		if let Ok(http_port) = env::var(format!("{}HTTP_PORT", self.env_prefix)) {
			debug!("Overriding HTTP port from environment");
			config.oracle.http_port = http_port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		Ok(())
	}
}

/// Replaces every `${VAR_NAME}` with the value of the environment variable.
/// Comment lines are copied as they are.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = regex::Regex::new(r"\$\{([^}]+)\}")
		.map_err(|e| ConfigError::ParseError(e.to_string()))?;

	let mut lines = Vec::new();
	for line in content.lines() {
		if line.trim_start().starts_with('#') {
			lines.push(line.to_string());
			continue;
		}

		let mut substituted = line.to_string();
		for cap in re.captures_iter(line) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			substituted = substituted.replace(full_match, &env_value);
		}
		lines.push(substituted);
	}

	Ok(lines.join("\n"))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
	if config.oracle.name.trim().is_empty() {
		return Err(ConfigError::ValidationError(
			"oracle.name must not be empty".to_string(),
		));
	}

	if config.chain.max_attempts == 0 {
		return Err(ConfigError::ValidationError(
			"chain.max_attempts must be at least 1".to_string(),
		));
	}

	if config.payment.tolerance_divisor == 0 {
		return Err(ConfigError::ValidationError(
			"payment.tolerance_divisor must be greater than zero".to_string(),
		));
	}

	if config.payment.token_decimals > 77 {
		return Err(ConfigError::ValidationError(
			"payment.token_decimals does not fit a 256-bit amount".to_string(),
		));
	}

	if config.payment.recipient.is_zero() {
		return Err(ConfigError::ValidationError(
			"payment.recipient must not be the zero address".to_string(),
		));
	}

	config
		.payment
		.price_schedule()
		.map_err(|e| ConfigError::ValidationError(format!("payment.tiers: {}", e)))?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal::Decimal;

	const BASE: &str = r#"
[oracle]
name = "voucher-oracle"
http_port = 8080

[chain]
provider = "alloy"

[chain.config]
rpc_url = "https://base-mainnet.example.com/v2/key"

[account]
provider = "local"

[account.config]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[storage]
backend = "memory"

[payment]
recipient = "0x0db12C0A67bc5B8942ea3126a465d7a0b23126C7"
token_address = "0x0578d8a44db98b23bf096a382e016e29a5ce0ffe"
tiers = ["4450", "8900", "17800", "35600", "71150"]
"#;

	#[test]
	fn test_toml_parsing_with_defaults() {
		let config = ConfigLoader::new()
			.with_env_prefix("ORACLE_TEST_DEFAULTS_")
			.load_from_str(BASE)
			.unwrap();

		assert_eq!(config.oracle.name, "voucher-oracle");
		assert_eq!(config.oracle.http_port, 8080);
		assert_eq!(config.oracle.http_host, "0.0.0.0");
		assert_eq!(config.chain.max_attempts, 5);
		assert_eq!(config.chain.retry_delay_ms, 2000);
		assert_eq!(config.payment.token_decimals, 18);
		assert_eq!(config.payment.tolerance_divisor, 1000);
		assert_eq!(config.payment.claimed_amount_slack, Decimal::ONE);
		assert!(config.payment.token_address.is_some());

		let schedule = config.payment.price_schedule().unwrap();
		assert_eq!(schedule.series_length(), 5);
		assert_eq!(schedule.expected_amount(1), Decimal::from(4450));
		assert_eq!(
			config.chain.config.get("rpc_url").and_then(|v| v.as_str()),
			Some("https://base-mainnet.example.com/v2/key")
		);
	}

	#[test]
	fn test_env_substitution() {
		env::set_var("ORACLE_TEST_SUBST_KEY", "secret-key");
		let content = "rpc_url = \"https://example.com/v2/${ORACLE_TEST_SUBST_KEY}\"";

		let result = substitute_env_vars(content).unwrap();
		assert_eq!(result, "rpc_url = \"https://example.com/v2/secret-key\"");
	}

	#[test]
	fn test_missing_env_var_is_an_error() {
		let content = "private_key = \"${ORACLE_TEST_SURELY_UNSET_VARIABLE}\"";

		let result = substitute_env_vars(content);
		assert!(matches!(
			result,
			Err(ConfigError::EnvVarNotFound(name)) if name == "ORACLE_TEST_SURELY_UNSET_VARIABLE"
		));
	}

	#[test]
	fn test_comment_lines_are_not_substituted() {
		let content = "# use ${ORACLE_TEST_SURELY_UNSET_VARIABLE} here\nname = \"oracle\"";

		let result = substitute_env_vars(content).unwrap();
		assert_eq!(result, content);
	}

	#[test]
	fn test_shipped_config_loads() {
		env::set_var("ALCHEMY_API_KEY", "alchemy-test-key");
		env::set_var(
			"SIGNER_PRIVATE_KEY",
			"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
		);

		let config = ConfigLoader::new()
			.with_env_prefix("ORACLE_TEST_SHIPPED_")
			.load_from_str(include_str!("../../../config/oracle.toml"))
			.unwrap();

		assert_eq!(config.chain.provider, "alloy");
		assert_eq!(
			config.chain.config.get("rpc_url").and_then(|v| v.as_str()),
			Some("https://base-mainnet.g.alchemy.com/v2/alchemy-test-key")
		);
		assert_eq!(config.storage.backend, "file");
		assert_eq!(config.payment.price_schedule().unwrap().series_length(), 5);
	}

	#[test]
	fn test_env_overrides() {
		env::set_var("ORACLE_TEST_OVERRIDE_HTTP_PORT", "9191");
		env::set_var("ORACLE_TEST_OVERRIDE_LOG_LEVEL", "debug");

		let config = ConfigLoader::new()
			.with_env_prefix("ORACLE_TEST_OVERRIDE_")
			.load_from_str(BASE)
			.unwrap();

		assert_eq!(config.oracle.http_port, 9191);
		assert_eq!(config.oracle.log_level, "debug");
	}

	#[test]
	fn test_validation_rejects_empty_tiers() {
		let content = BASE.replace(
			r#"tiers = ["4450", "8900", "17800", "35600", "71150"]"#,
			"tiers = []",
		);

		let result = ConfigLoader::new()
			.with_env_prefix("ORACLE_TEST_EMPTY_TIERS_")
			.load_from_str(&content);
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("at least one tier"));
	}

	#[test]
	fn test_validation_rejects_zero_attempts() {
		let content = BASE.replace(
			"provider = \"alloy\"",
			"provider = \"alloy\"\nmax_attempts = 0",
		);

		let result = ConfigLoader::new()
			.with_env_prefix("ORACLE_TEST_ZERO_ATTEMPTS_")
			.load_from_str(&content);
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[tokio::test]
	async fn test_load_missing_file() {
		let result = ConfigLoader::new()
			.with_file("/definitely/not/here.toml")
			.load()
			.await;
		assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
	}
}
