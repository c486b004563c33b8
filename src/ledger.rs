use std::{
    io,
    path::{Path, PathBuf},
};

use alloy::primitives::B256;
use tokio::fs;
use tracing::warn;

use crate::types::{OrderStatus, SavedOrder};

/// Cap on stored entries; the oldest beyond it are evicted on upsert.
pub const MAX_ENTRIES: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: io::Error,
    },

    #[error("ledger serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistent order ledger: one JSON array file, newest entries first,
/// keyed by order hash.
///
/// The ledger is the durable record of every order this wallet created,
/// including ones the order book never accepted. Reads never fail: a
/// missing or corrupt file is logged and treated as empty. Writes go
/// through a temp file and rename. A mutex serializes read-modify-write
/// cycles in this process; concurrent writers from other processes remain
/// last-write-wins.
pub struct OrderLedger {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl OrderLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, newest first.
    pub async fn load(&self) -> Vec<SavedOrder> {
        let _guard = self.lock.lock().await;
        self.read_entries().await
    }

    /// The entry with `hash`, if present.
    pub async fn get(&self, hash: B256) -> Option<SavedOrder> {
        self.load()
            .await
            .into_iter()
            .find(|entry| entry.order_hash == hash)
    }

    /// Inserts `order`, replacing any entry with the same hash, then
    /// re-sorts newest first and evicts entries beyond [`MAX_ENTRIES`].
    pub async fn upsert(&self, order: SavedOrder) -> Result<(), LedgerError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await;
        entries.retain(|existing| existing.order_hash != order.order_hash);
        entries.push(order);
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(MAX_ENTRIES);
        self.write_entries(&entries).await
    }

    /// Sets the status of the entry with `hash`. Returns whether an entry
    /// was found.
    pub async fn set_status(&self, hash: B256, status: OrderStatus) -> Result<bool, LedgerError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await;
        let Some(entry) = entries.iter_mut().find(|entry| entry.order_hash == hash) else {
            return Ok(false);
        };
        entry.status = status;
        self.write_entries(&entries).await?;
        Ok(true)
    }

    /// Removes the ledger file.
    pub async fn clear(&self) -> Result<(), LedgerError> {
        let _guard = self.lock.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LedgerError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn read_entries(&self) -> Vec<SavedOrder> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ledger unreadable, starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ledger corrupt, starting empty");
                Vec::new()
            }
        }
    }

    async fn write_entries(&self, entries: &[SavedOrder]) -> Result<(), LedgerError> {
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).await.map_err(|source| LedgerError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| LedgerError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }
}
