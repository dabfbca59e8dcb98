//! Token id allocation for the voucher series.
//!
//! Every verification request reserves the token id it will be priced and
//! signed for before any chain I/O happens. Reservations are serialized and
//! persisted as a single ledger document, so two concurrent requests can never
//! be handed the same id. A payment transaction holds at most one reservation;
//! asking again with the same hash joins the existing one, and the id only
//! returns to the pool once every request holding it has released it.
//!
//! Ids start at 1. A reservation whose verification failed is released and its
//! id handed out again, keeping the issued sequence free of gaps. The lowest
//! released id is always handed out first, so authorizations are not
//! guaranteed to arrive in id order: id 2 may be authorized before a released
//! id 1 is taken again.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oracle_storage::{StorageError, StorageService};
use oracle_types::TokenId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

const LEDGER_NAMESPACE: &str = "allocator";
const LEDGER_ID: &str = "ledger";

#[derive(Debug, Error)]
pub enum AllocatorError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Token {0} is not reserved")]
	NotReserved(TokenId),
	#[error("Token {0} is reserved for another transaction")]
	ReservedForOther(TokenId),
	#[error("Token {0} already carries an authorization")]
	AlreadyAuthorized(TokenId),
	#[error("Token id space exhausted")]
	Exhausted,
}

impl From<StorageError> for AllocatorError {
	fn from(e: StorageError) -> Self {
		AllocatorError::Storage(e.to_string())
	}
}

/// Result of a reservation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
	pub token_id: TokenId,
	/// `false` when the transaction already held this id.
	pub fresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
	/// Verification in progress or failed without release.
	Pending,
	/// A mint signature was issued for this id.
	Authorized,
}

/// Persisted reservation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
	pub token_id: TokenId,
	pub tx_hash: TxHash,
	pub wallet: Address,
	pub status: ReservationStatus,
	/// Requests currently working on this reservation.
	#[serde(default = "single_holder")]
	pub holders: u32,
	pub reserved_at: DateTime<Utc>,
}

fn single_holder() -> u32 {
	1
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ledger {
	/// Highest id ever handed out, 0 when none.
	highest: TokenId,
	/// Ids below `highest` returned to the pool.
	released: BTreeSet<TokenId>,
	reservations: BTreeMap<TokenId, ReservationRecord>,
	/// Payment transaction hash to reserved id.
	by_tx: BTreeMap<String, TokenId>,
}

impl Ledger {
	fn next_id(&self) -> Option<TokenId> {
		match self.released.first() {
			Some(id) => Some(*id),
			None => self.highest.checked_add(1),
		}
	}

	fn take_next(&mut self) -> Result<TokenId, AllocatorError> {
		if let Some(id) = self.released.pop_first() {
			return Ok(id);
		}
		self.highest = self.highest.checked_add(1).ok_or(AllocatorError::Exhausted)?;
		Ok(self.highest)
	}

	fn give_back(&mut self, token_id: TokenId) {
		self.released.insert(token_id);
		// Collapse a released tail so `highest` stays the last id in use
		while self.highest > 0 && self.released.remove(&self.highest) {
			self.highest -= 1;
		}
	}

	/// Reservation of `token_id`, provided it belongs to `tx_hash`.
	fn owned_mut(
		&mut self,
		token_id: TokenId,
		tx_hash: &TxHash,
	) -> Result<&mut ReservationRecord, AllocatorError> {
		let record = self
			.reservations
			.get_mut(&token_id)
			.ok_or(AllocatorError::NotReserved(token_id))?;
		if record.tx_hash != *tx_hash {
			return Err(AllocatorError::ReservedForOther(token_id));
		}
		Ok(record)
	}
}

/// Interface the oracle uses to obtain and settle token ids.
#[async_trait]
pub trait AllocatorInterface: Send + Sync {
	/// Atomically claims the next unused id for a payment, or joins the
	/// reservation the payment already holds.
	async fn reserve(&self, tx_hash: TxHash, wallet: Address)
		-> Result<Reservation, AllocatorError>;

	/// Marks the reservation as carrying an issued signature.
	///
	/// Fails unless `token_id` is still reserved for `tx_hash`.
	async fn authorize(&self, token_id: TokenId, tx_hash: TxHash) -> Result<(), AllocatorError>;

	/// Drops one request's hold on a pending reservation. The id returns to
	/// the pool when the last holder lets go.
	async fn release(&self, token_id: TokenId, tx_hash: TxHash) -> Result<(), AllocatorError>;

	/// Id the next reservation would receive.
	async fn peek_next(&self) -> Result<TokenId, AllocatorError>;
}

/// Allocator whose ledger lives in a [`StorageService`].
///
/// The in-process mutex serializes read-modify-write cycles on the ledger.
/// Running several oracle processes against one storage backend is not
/// supported.
pub struct StorageAllocator {
	storage: Arc<StorageService>,
	lock: Mutex<()>,
}

impl StorageAllocator {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			lock: Mutex::new(()),
		}
	}

	async fn load(&self) -> Result<Ledger, AllocatorError> {
		Ok(self
			.storage
			.retrieve_optional(LEDGER_NAMESPACE, LEDGER_ID)
			.await?
			.unwrap_or_default())
	}

	async fn save(&self, ledger: &Ledger) -> Result<(), AllocatorError> {
		self.storage
			.store(LEDGER_NAMESPACE, LEDGER_ID, ledger)
			.await
			.map_err(AllocatorError::from)
	}
}

#[async_trait]
impl AllocatorInterface for StorageAllocator {
	async fn reserve(
		&self,
		tx_hash: TxHash,
		wallet: Address,
	) -> Result<Reservation, AllocatorError> {
		let _guard = self.lock.lock().await;
		let mut ledger = self.load().await?;

		if let Some(token_id) = ledger.by_tx.get(&tx_hash.to_string()).copied() {
			let record = ledger.owned_mut(token_id, &tx_hash)?;
			record.holders = record.holders.saturating_add(1);
			let holders = record.holders;
			self.save(&ledger).await?;

			debug!(%tx_hash, token_id, holders, "Transaction already holds a reservation");
			return Ok(Reservation {
				token_id,
				fresh: false,
			});
		}

		let token_id = ledger.take_next()?;
		ledger.reservations.insert(
			token_id,
			ReservationRecord {
				token_id,
				tx_hash,
				wallet,
				status: ReservationStatus::Pending,
				holders: 1,
				reserved_at: Utc::now(),
			},
		);
		ledger.by_tx.insert(tx_hash.to_string(), token_id);
		self.save(&ledger).await?;

		debug!(%tx_hash, %wallet, token_id, "Reserved token id");
		Ok(Reservation {
			token_id,
			fresh: true,
		})
	}

	async fn authorize(&self, token_id: TokenId, tx_hash: TxHash) -> Result<(), AllocatorError> {
		let _guard = self.lock.lock().await;
		let mut ledger = self.load().await?;

		let record = ledger.owned_mut(token_id, &tx_hash)?;
		if record.status == ReservationStatus::Authorized {
			return Ok(());
		}
		record.status = ReservationStatus::Authorized;
		self.save(&ledger).await?;

		info!(token_id, %tx_hash, "Token id authorized");
		Ok(())
	}

	async fn release(&self, token_id: TokenId, tx_hash: TxHash) -> Result<(), AllocatorError> {
		let _guard = self.lock.lock().await;
		let mut ledger = self.load().await?;

		let record = ledger.owned_mut(token_id, &tx_hash)?;
		if record.status == ReservationStatus::Authorized {
			return Err(AllocatorError::AlreadyAuthorized(token_id));
		}

		record.holders = record.holders.saturating_sub(1);
		if record.holders > 0 {
			let holders = record.holders;
			self.save(&ledger).await?;
			debug!(token_id, %tx_hash, holders, "Reservation still held");
			return Ok(());
		}

		ledger.reservations.remove(&token_id);
		ledger.by_tx.remove(&tx_hash.to_string());
		ledger.give_back(token_id);
		self.save(&ledger).await?;

		debug!(token_id, "Released token id");
		Ok(())
	}

	async fn peek_next(&self) -> Result<TokenId, AllocatorError> {
		let _guard = self.lock.lock().await;
		self.load().await?.next_id().ok_or(AllocatorError::Exhausted)
	}
}
