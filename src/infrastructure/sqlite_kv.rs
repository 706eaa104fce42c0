use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};

use crate::domain::storage::KeyValueStorage;

#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteKeyValueStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        // Every connection to sqlite::memory: opens its own database, so pin the pool to one.
        let options = if is_memory_url(database_url) {
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(database_url).await?;
        tracing::debug!(database_url, "sqlite pool ready");
        Ok(Self { pool: Arc::new(pool) })
    }
}

#[async_trait]
impl KeyValueStorage for SqliteKeyValueStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn set_all(&self, entries: &[(&str, String)]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(*key)
            .bind(value)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for key in keys {
            sqlx::query("DELETE FROM kv WHERE key = ?1").bind(*key).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

pub fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:")
}

/// Filesystem path behind a `sqlite://` URL; `None` for in-memory or other URLs.
fn database_path(database_url: &str) -> Option<&Path> {
    if is_memory_url(database_url) { return None; }
    let path = database_url.strip_prefix("sqlite://")?;
    // Windows absolute paths arrive as /C:/path
    let path = match path.as_bytes() {
        [b'/', _, b':', ..] if cfg!(windows) => &path[1..],
        _ => path,
    };
    Some(Path::new(path))
}

/// Creates the database file and its parent directory for file-backed URLs.
pub fn prepare_sqlite_file(database_url: &str) -> Result<()> {
    let Some(path) = database_path(database_url) else { return Ok(()) };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}
