//! In-memory storage backend.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use dashmap::DashMap;

/// Volatile storage; everything is lost when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
	entries: DashMap<String, Vec<u8>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.entries
			.get(key)
			.map(|entry| entry.value().clone())
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.entries.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.entries.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.entries.contains_key(key))
	}
}

pub fn create_storage(_config: &toml::Value) -> Box<dyn StorageInterface> {
	tracing::warn!("Using in-memory storage; reservations will not survive a restart");
	Box::new(MemoryStorage::new())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_overwrite_and_delete() {
		let storage = MemoryStorage::new();

		storage.set_bytes("k", vec![1]).await.unwrap();
		storage.set_bytes("k", vec![2, 3]).await.unwrap();
		assert_eq!(storage.get_bytes("k").await.unwrap(), vec![2, 3]);

		storage.delete("k").await.unwrap();
		storage.delete("k").await.unwrap();
		assert!(!storage.exists("k").await.unwrap());
		assert!(matches!(
			storage.get_bytes("k").await,
			Err(StorageError::NotFound)
		));
	}
}
