//! # Trainer Storage - SQLite Backend
//!
//! SQLite implementation of the storage backend. Each namespace (the
//! cookie jar, the local store) gets its own database file so clearing one
//! can never touch the other.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use trainer_storage::{StorageBackend, StorageError};

/// SQLite storage backend for one namespace.
///
/// Data lives at `{base_path}/{namespace}.db`.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
    namespace: String,
    db_path: PathBuf,
}

impl SqliteBackend {
    /// Opens or creates the database for a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Namespace name is invalid
    /// - Directory cannot be created
    /// - Database connection fails
    pub async fn open(base_path: impl AsRef<Path>, namespace: &str) -> Result<Self, StorageError> {
        Self::validate_namespace(namespace)?;

        let base = base_path.as_ref();
        std::fs::create_dir_all(base).map_err(|e| {
            StorageError::ConnectionFailed(format!("failed to create directory: {e}"))
        })?;

        let db_path = base.join(format!("{namespace}.db"));
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        debug!(namespace = %namespace, path = %db_path.display(), "Opening SQLite store");

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect(&db_url)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let backend = Self {
            pool,
            namespace: namespace.to_string(),
            db_path,
        };

        backend.migrate().await?;

        info!(namespace = %namespace, "SQLite store ready");

        Ok(backend)
    }

    /// Namespace this store was opened for.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Location of the database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Only allows: lowercase letters, digits, underscore, hyphen.
    fn validate_namespace(namespace: &str) -> Result<(), StorageError> {
        if namespace.is_empty() {
            return Err(StorageError::InvalidInput("namespace cannot be empty".into()));
        }

        if namespace.len() > 64 {
            return Err(StorageError::InvalidInput("namespace too long".into()));
        }

        let valid = namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

        if !valid {
            return Err(StorageError::InvalidInput(
                "namespace must match [a-z0-9_-]+".into(),
            ));
        }

        Ok(())
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key        TEXT PRIMARY KEY,
                value      BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::ConnectionFailed(format!("migration failed: {e}")))?;

        Ok(())
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(row.map(|(v,)| v))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidInput("key cannot be empty".into()));
        }

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Self::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // substr() instead of LIKE so '%' and '_' in keys are literal.
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT key FROM kv_store WHERE substr(key, 1, length(?)) = ? ORDER BY key",
        )
        .bind(prefix)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(rows.into_iter().map(|(k,)| k).collect())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM kv_store")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        debug!(
            namespace = %self.namespace,
            removed = result.rows_affected(),
            "Store cleared"
        );

        Ok(())
    }
}
