use std::time::Duration;

use alloy::{
    primitives::{Address, U256},
    providers::Provider,
};
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::{
    Chain,
    abi::oracle::IIndexOracle::{self, IIndexOracleInstance, IndexInfo},
    cache::{self, TtlCache},
    error::ChainError,
    types::{IndexId, IndexPoint, IndexSnapshot, OrderCondition},
};

/// Ids probed one by one when the id listing is unavailable.
const FALLBACK_SCAN_IDS: u64 = 32;

/// Read/manage client for the index oracle.
///
/// [`Self::list`] reads through a TTL cache and never fails: fetch errors
/// are absorbed into the last known listing (or an empty one). Single-feed
/// reads bypass the cache, order conditions need the live value.
pub struct IndexClient<P> {
    instance: IIndexOracleInstance<P>,
    provider: P,
    cache: TtlCache<(), Vec<IndexSnapshot>>,
}

impl<P: Provider + Clone + 'static> IndexClient<P> {
    pub fn new(chain: &Chain, provider: P) -> Self {
        Self::with_cache_ttl(chain, provider, cache::DEFAULT_TTL)
    }

    pub fn with_cache_ttl(chain: &Chain, provider: P, ttl: Duration) -> Self {
        Self {
            instance: IIndexOracle::new(chain.index_oracle(), provider.clone()),
            provider,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }

    /// All index feeds, sorted by id, served from the cache.
    ///
    /// The underlying fetch lists ids and aggregates `getIndexInfo` in one
    /// multicall. If that path fails it degrades to a bounded per-id value
    /// scan, skipping ids that error; only when the scan finds nothing does
    /// the original error reach the cache.
    pub async fn list(&self) -> Vec<IndexSnapshot> {
        let instance = self.instance.clone();
        let provider = self.provider.clone();
        self.cache
            .get_with((), move || fetch_all(instance, provider))
            .await
    }

    /// Live value of one index feed.
    pub async fn value(&self, id: IndexId) -> Result<IndexPoint, ChainError> {
        let ret = self.instance.getIndexValue(U256::from(id)).call().await?;
        Ok(IndexPoint::new(ret.value, ret.timestamp.to::<u64>()))
    }

    /// Live metadata and value of one index feed.
    pub async fn snapshot(&self, id: IndexId) -> Result<IndexSnapshot, ChainError> {
        let info = self.instance.getIndexInfo(U256::from(id)).call().await?;
        Ok(snapshot_from_info(id, info))
    }

    /// Reads the live value and evaluates `condition` against it.
    pub async fn check(&self, condition: &OrderCondition) -> Result<bool, ChainError> {
        let point = self.value(condition.index_id()).await?;
        Ok(condition.evaluate(point.value()))
    }

    /// Creates a new index feed and returns its id from the receipt log.
    pub async fn create_index(
        &self,
        initial_value: U256,
        name: &str,
        description: &str,
    ) -> Result<IndexId, ChainError> {
        let receipt = self
            .instance
            .createIndex(initial_value, name.to_string(), description.to_string())
            .send()
            .await?
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(ChainError::reverted_in_receipt());
        }
        let id = receipt
            .decoded_log::<IIndexOracle::IndexCreated>()
            .map(|log| log.data.indexId.to::<IndexId>())
            .ok_or_else(|| {
                ChainError::Fatal("IndexCreated log missing from receipt".to_string())
            })?;
        self.cache.invalidate(&());
        info!(id, value = %initial_value, "index created");
        Ok(id)
    }

    /// Publishes a new value for an index feed this wallet controls.
    pub async fn update_value(&self, id: IndexId, new_value: U256) -> Result<(), ChainError> {
        let receipt = self
            .instance
            .updateIndexValue(U256::from(id), new_value)
            .send()
            .await?
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(ChainError::reverted_in_receipt());
        }
        self.cache.invalidate(&());
        info!(id, value = %new_value, "index value updated");
        Ok(())
    }

    /// Drops the cached listing; the next [`Self::list`] fetches fresh.
    pub fn invalidate(&self) {
        self.cache.invalidate(&());
    }
}

async fn fetch_all<P: Provider + Clone>(
    instance: IIndexOracleInstance<P>,
    provider: P,
) -> Result<Vec<IndexSnapshot>, ChainError> {
    match fetch_batch(&instance, &provider).await {
        Ok(snapshots) => Ok(snapshots),
        Err(err) => {
            warn!(%err, "index listing batch failed, falling back to per-id scan");
            let scanned = scan_values(&instance).await;
            if scanned.is_empty() {
                Err(err)
            } else {
                Ok(scanned)
            }
        }
    }
}

async fn fetch_batch<P: Provider + Clone>(
    instance: &IIndexOracleInstance<P>,
    provider: &P,
) -> Result<Vec<IndexSnapshot>, ChainError> {
    let ids = instance.listIndexIds().call().await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let multicall = provider
        .multicall()
        .dynamic()
        .extend(ids.iter().map(|id| instance.getIndexInfo(*id)));
    let infos = multicall.aggregate().await?;
    Ok(ids
        .into_iter()
        .zip(infos)
        .map(|(id, info)| snapshot_from_info(id.to::<IndexId>(), info))
        .sorted_by_key(|snapshot| snapshot.id())
        .collect())
}

// One id at a time to bound parallel requests against a degraded node.
async fn scan_values<P: Provider + Clone>(
    instance: &IIndexOracleInstance<P>,
) -> Vec<IndexSnapshot> {
    let mut snapshots = Vec::new();
    for id in 0..FALLBACK_SCAN_IDS {
        match instance.getIndexValue(U256::from(id)).call().await {
            Ok(ret) => {
                snapshots.push(IndexSnapshot::from_value(id, ret.value, ret.timestamp.to::<u64>()));
            }
            Err(err) => debug!(id, %err, "per-id scan skipped an id"),
        }
    }
    snapshots
}

fn snapshot_from_info(id: IndexId, info: IndexInfo) -> IndexSnapshot {
    let creator = (!info.creator.is_zero()).then_some(info.creator);
    let created_at = (info.createdAt > U256::ZERO).then(|| info.createdAt.to::<u64>());
    let name = (!info.name.is_empty()).then_some(info.name);
    let description = (!info.description.is_empty()).then_some(info.description);
    IndexSnapshot::new(
        id,
        info.value,
        info.timestamp.to::<u64>(),
        info.active,
        name,
        description,
        creator,
        created_at,
    )
}
