//! Market-data REST client with a file-backed daily cache.
//!
//! Fully decoupled from the chain adapters: charting data comes from a plain
//! REST service keyed by `(symbol, function, interval)`. Successful payloads
//! are cached for a day; failures arm a backoff window and, after
//! [`MAX_FAILURES`] in a row, gate the feed until [`MarketDataClient::clear`].

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use itertools::Itertools;
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::{fs, io, sync::Mutex};
use tracing::{debug, warn};

/// How long a fetched payload counts as fresh.
pub const SUCCESS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Wait between retries of a failing feed.
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(2 * 60 * 60);

/// Consecutive failures after which the feed stays gated until cleared.
pub const MAX_FAILURES: u32 = 3;

/// Failure of a market-data read.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("market api rejected the request: {0}")]
    Rejected(String),

    #[error("feed {key} failed {failures} times, gated until cleared")]
    PermanentlyFailed { key: String, failures: u32 },

    #[error("feed {key} in backoff until {retry_at}")]
    InBackoff { key: String, retry_at: u64 },

    #[error("cache io error at {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// One feed of the market-data service.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarketQuery {
    symbol: String,
    function: String,
    interval: Option<String>,
}

impl MarketQuery {
    pub fn new(
        symbol: impl Into<String>,
        function: impl Into<String>,
        interval: Option<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            function: function.into(),
            interval,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn interval(&self) -> Option<&str> {
        self.interval.as_deref()
    }

    /// Cache key: the uppercased parts joined with `_`.
    pub fn key(&self) -> String {
        [Some(&self.symbol), Some(&self.function), self.interval.as_ref()]
            .into_iter()
            .flatten()
            .map(|part| part.to_uppercase())
            .join("_")
    }
}

/// Per-key fetch bookkeeping persisted in `market_meta.json`.
#[derive(Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchMeta {
    last_fetch: u64,
    success: bool,
    attempts: u32,
    next_retry: u64,
}

/// REST client plus the cache directory holding `market_meta.json` and one
/// `market_{KEY}.json` payload file per feed. Reads and writes of the cache
/// go through an in-process mutex; cross-process writers are last-write-wins.
#[derive(derive_more::Debug)]
pub struct MarketDataClient {
    #[debug(skip)]
    client: Client,
    base: Url,
    #[debug("***")]
    api_key: String,
    dir: PathBuf,
    #[debug(skip)]
    lock: Mutex<()>,
}

impl MarketDataClient {
    pub fn new(base: Url, api_key: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            base,
            api_key: api_key.into(),
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Payload for `query`, fetching only when the daily TTL lapsed.
    ///
    /// A failed fetch arms the 2-hour backoff and, from the third failure on,
    /// gates the feed until [`Self::clear`]. Whenever fetching is off the
    /// table (gated, in backoff, or failed just now) the last good payload is
    /// served if one exists. Cache writes are best effort: a storage error is
    /// logged and never masks the fetch result.
    pub async fn get(&self, query: &MarketQuery) -> Result<Value, MarketError> {
        let _guard = self.lock.lock().await;
        let key = query.key();
        let meta = self
            .read_meta()
            .await
            .get(&key)
            .copied()
            .unwrap_or_default();
        let now = unix_now();

        let fresh = meta.success && now.saturating_sub(meta.last_fetch) < SUCCESS_TTL.as_secs();
        if fresh && let Some(payload) = self.read_payload(&key).await {
            return Ok(payload);
        }

        if meta.attempts >= MAX_FAILURES {
            return match self.read_payload(&key).await {
                Some(stale) => {
                    debug!(key, "feed gated, serving stale payload");
                    Ok(stale)
                }
                None => Err(MarketError::PermanentlyFailed {
                    key,
                    failures: meta.attempts,
                }),
            };
        }
        if !meta.success && meta.attempts > 0 && now < meta.next_retry {
            return match self.read_payload(&key).await {
                Some(stale) => {
                    debug!(key, "feed in backoff, serving stale payload");
                    Ok(stale)
                }
                None => Err(MarketError::InBackoff {
                    key,
                    retry_at: meta.next_retry,
                }),
            };
        }

        match self.fetch(query).await {
            Ok(payload) => {
                // The payload is good whether or not it could be cached.
                if let Err(err) = self.store_success(&key, &payload, now).await {
                    warn!(key, %err, "failed to cache market payload");
                }
                Ok(payload)
            }
            Err(err) => {
                warn!(key, %err, "market fetch failed");
                if let Err(store_err) = self.store_failure(&key, now).await {
                    warn!(key, %store_err, "failed to record market failure");
                }
                match self.read_payload(&key).await {
                    Some(stale) => Ok(stale),
                    None => Err(err),
                }
            }
        }
    }

    /// Forgets everything recorded for `query`: the failure gate, the
    /// backoff window, and the cached payload.
    pub async fn clear(&self, query: &MarketQuery) -> Result<(), MarketError> {
        let _guard = self.lock.lock().await;
        let key = query.key();
        let mut meta = self.read_meta().await;
        if meta.remove(&key).is_some() {
            self.write_meta(&meta).await?;
        }
        match fs::remove_file(self.payload_path(&key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MarketError::Io {
                path: self.payload_path(&key),
                source,
            }),
        }
    }

    async fn fetch(&self, query: &MarketQuery) -> Result<Value, MarketError> {
        let mut params = vec![
            ("function", query.function().to_string()),
            ("symbol", query.symbol().to_string()),
            ("apikey", self.api_key.clone()),
        ];
        if let Some(interval) = query.interval() {
            params.push(("interval", interval.to_string()));
        }
        let resp = self
            .client
            .get(self.base.clone())
            .query(&params)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(MarketError::Rejected(format!("{status}: {body}")));
        }
        let payload: Value = serde_json::from_str(&body)?;
        if let Some(note) = rejection_note(&payload) {
            return Err(MarketError::Rejected(note.to_string()));
        }
        Ok(payload)
    }

    async fn store_success(
        &self,
        key: &str,
        payload: &Value,
        now: u64,
    ) -> Result<(), MarketError> {
        self.write_payload(key, payload).await?;
        let mut meta = self.read_meta().await;
        meta.insert(
            key.to_string(),
            FetchMeta {
                last_fetch: now,
                success: true,
                attempts: 0,
                next_retry: 0,
            },
        );
        self.write_meta(&meta).await
    }

    async fn store_failure(&self, key: &str, now: u64) -> Result<(), MarketError> {
        let mut meta = self.read_meta().await;
        let entry = meta.entry(key.to_string()).or_default();
        entry.last_fetch = now;
        entry.success = false;
        entry.attempts += 1;
        entry.next_retry = now + FAILURE_BACKOFF.as_secs();
        let attempts = entry.attempts;
        self.write_meta(&meta).await?;
        if attempts >= MAX_FAILURES {
            warn!(key, attempts, "feed gated until cleared");
        }
        Ok(())
    }

    fn meta_path(&self) -> PathBuf {
        self.dir.join("market_meta.json")
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("market_{key}.json"))
    }

    async fn read_meta(&self) -> HashMap<String, FetchMeta> {
        let path = self.meta_path();
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return HashMap::new(),
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable market meta, starting empty");
                return HashMap::new();
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(meta) => meta,
            Err(err) => {
                warn!(path = %path.display(), %err, "corrupt market meta, starting empty");
                HashMap::new()
            }
        }
    }

    async fn write_meta(&self, meta: &HashMap<String, FetchMeta>) -> Result<(), MarketError> {
        write_json(&self.meta_path(), &serde_json::to_vec_pretty(meta)?).await
    }

    async fn read_payload(&self, key: &str) -> Option<Value> {
        let raw = fs::read(self.payload_path(key)).await.ok()?;
        serde_json::from_slice(&raw).ok()
    }

    async fn write_payload(&self, key: &str, payload: &Value) -> Result<(), MarketError> {
        write_json(&self.payload_path(key), &serde_json::to_vec_pretty(payload)?).await
    }
}

/// A 200 body can still carry a rejection: an error message for a bad
/// request, or a rate-limit note. Both count as failed fetches.
fn rejection_note(payload: &Value) -> Option<&str> {
    ["Error Message", "Note", "Information"]
        .iter()
        .find_map(|field| payload.get(field).and_then(Value::as_str))
}

async fn write_json(path: &Path, bytes: &[u8]) -> Result<(), MarketError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| MarketError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)
        .await
        .map_err(|source| MarketError::Io {
            path: tmp.clone(),
            source,
        })?;
    fs::rename(&tmp, path).await.map_err(|source| MarketError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
