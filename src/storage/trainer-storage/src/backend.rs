//! Storage backend trait definition.

use async_trait::async_trait;

use crate::error::StorageError;

/// Key/value store with string keys and byte values.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get a value by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Put a value with a key, replacing any previous value.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a value by key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List keys with a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Get a value as UTF-8 text.
    async fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.get(key).await? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StorageError::Serialization(format!("{key}: {e}"))),
            None => Ok(None),
        }
    }

    /// Remove every key.
    async fn clear(&self) -> Result<(), StorageError> {
        for key in self.list("").await? {
            self.delete(&key).await?;
        }
        Ok(())
    }
}
