//! Transfer verification and mint authorization.
//!
//! [`EngineBuilder`] wires storage, chain access and the signing key from
//! configuration into a [`VerificationEngine`]. Concrete implementations are
//! registered by name, so the binary decides which ones exist and the config
//! file decides which one is used.

use oracle_account::{AccountError, AccountInterface, AccountService};
use oracle_allocator::StorageAllocator;
use oracle_chain::{ChainError, ChainInterface, ReceiptFetcher, RetryPolicy};
use oracle_config::Config;
use oracle_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub mod engine;
pub mod error;
pub mod matcher;

pub use engine::{PricingQuote, VerificationEngine, VerificationOutcome};
pub use error::{OracleError, Rejection};
pub use matcher::{find_minted_token_id, MatchFailure, MatchedTransfer, TransferMatcher};

type StorageFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> + Send>;
type ChainFactory =
	Box<dyn Fn(&toml::Value) -> Result<Arc<dyn ChainInterface>, ChainError> + Send>;
type AccountFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> + Send>;

pub struct EngineBuilder {
	config: Config,
	storage_factories: HashMap<String, StorageFactory>,
	chain_factories: HashMap<String, ChainFactory>,
	account_factories: HashMap<String, AccountFactory>,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
			chain_factories: HashMap::new(),
			account_factories: HashMap::new(),
		}
	}

	pub fn with_storage_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> + Send + 'static,
	{
		self.storage_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_chain_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Arc<dyn ChainInterface>, ChainError> + Send + 'static,
	{
		self.chain_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_account_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> + Send + 'static,
	{
		self.account_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn build(self) -> Result<VerificationEngine, OracleError> {
		let config = &self.config;

		let account_factory = self
			.account_factories
			.get(&config.account.provider)
			.ok_or_else(|| {
				OracleError::Config(format!(
					"Unknown account provider: {}",
					config.account.provider
				))
			})?;
		let account_provider = account_factory(&config.account.config).map_err(|e| match e {
			AccountError::MissingKey | AccountError::InvalidKey(_) => {
				OracleError::SigningUnavailable(e.to_string())
			}
			other => OracleError::Config(other.to_string()),
		})?;
		let account = Arc::new(AccountService::new(account_provider));

		let storage_factory = self
			.storage_factories
			.get(&config.storage.backend)
			.ok_or_else(|| {
				OracleError::Config(format!(
					"Unknown storage backend: {}",
					config.storage.backend
				))
			})?;
		let storage_backend = storage_factory(&config.storage.config)
			.map_err(|e| OracleError::Config(e.to_string()))?;
		let storage = Arc::new(StorageService::new(storage_backend));
		let allocator = Arc::new(StorageAllocator::new(storage));

		let chain_factory = self
			.chain_factories
			.get(&config.chain.provider)
			.ok_or_else(|| {
				OracleError::Config(format!("Unknown chain provider: {}", config.chain.provider))
			})?;
		let chain =
			chain_factory(&config.chain.config).map_err(|e| OracleError::Config(e.to_string()))?;
		let fetcher = ReceiptFetcher::new(
			chain,
			RetryPolicy::new(
				config.chain.max_attempts,
				Duration::from_millis(config.chain.retry_delay_ms),
			),
		);

		let payment = &config.payment;
		let schedule = payment
			.price_schedule()
			.map_err(|e| OracleError::Config(e.to_string()))?;
		let matcher = TransferMatcher::new(
			payment.token_decimals,
			payment.tolerance_divisor,
			payment.token_address,
		);

		tracing::info!(
			signer = %account.signer_address(),
			recipient = %payment.recipient,
			tiers = schedule.series_length(),
			"Verification engine ready"
		);

		Ok(VerificationEngine::new(
			fetcher,
			matcher,
			allocator,
			account,
			engine::PaymentTerms {
				schedule,
				recipient: payment.recipient,
				token_decimals: payment.token_decimals,
				claimed_amount_slack: payment.claimed_amount_slack,
			},
		))
	}
}
