//! Durable key-value store mirroring the request ledger.
//!
//! The download handler may run in a different execution context than the
//! request handlers, so it never trusts an in-memory ledger: the snapshot
//! under [`LEDGER_KEY`] is the canonical copy. Every ledger mutation rewrites
//! it wholesale.

mod json_file;
mod memory;
mod sqlite;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use anyhow::{Context, Result};
use serde_json::Value;
use std::future::Future;

use crate::config::{self, HandoffConfig, StoreBackend};
use crate::ledger::RequestRecord;

/// Key under which the ledger snapshot is stored.
pub const LEDGER_KEY: &str = "httpRequests";

/// Host-style key-value persistence: whole JSON values by key.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>>> + Send;
    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<()>> + Send;
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Overwrite the persisted ledger snapshot.
pub async fn save_ledger<S: DurableStore>(store: &S, records: &[RequestRecord]) -> Result<()> {
    let value = serde_json::to_value(records).context("serialize ledger snapshot")?;
    store.set(LEDGER_KEY, value).await
}

/// Read the persisted ledger snapshot. A missing key is an empty ledger.
pub async fn load_ledger<S: DurableStore>(store: &S) -> Result<Vec<RequestRecord>> {
    match store.get(LEDGER_KEY).await? {
        Some(value) => serde_json::from_value(value).context("parse ledger snapshot"),
        None => Ok(Vec::new()),
    }
}

/// Store selected by `store_backend` in the config.
#[derive(Clone)]
pub enum ConfiguredStore {
    Json(JsonFileStore),
    Sqlite(SqliteStore),
}

impl ConfiguredStore {
    /// Open the configured backend under the XDG state dir.
    pub async fn open(cfg: &HandoffConfig) -> Result<Self> {
        let dir = config::state_dir()?;
        let store = match cfg.store_backend() {
            StoreBackend::Json => ConfiguredStore::Json(JsonFileStore::new(dir.join("storage.json"))),
            StoreBackend::Sqlite => {
                ConfiguredStore::Sqlite(SqliteStore::open_at(dir.join("storage.db")).await?)
            }
        };
        Ok(store)
    }
}

impl DurableStore for ConfiguredStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self {
            ConfiguredStore::Json(s) => s.get(key).await,
            ConfiguredStore::Sqlite(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        match self {
            ConfiguredStore::Json(s) => s.set(key, value).await,
            ConfiguredStore::Sqlite(s) => s.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match self {
            ConfiguredStore::Json(s) => s.remove(key).await,
            ConfiguredStore::Sqlite(s) => s.remove(key).await,
        }
    }
}
