use std::{
    collections::HashMap,
    fmt::Display,
    hash::Hash,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tokio::time::Instant;
use tracing::warn;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

struct Slot<V> {
    value: Option<(V, Instant)>,
    in_flight: Option<Shared<BoxFuture<'static, V>>>,
    // Bumped by invalidate so a fetch started before it cannot store its
    // result or clear a newer fetch's in-flight marker.
    epoch: u64,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: None,
            in_flight: None,
            epoch: 0,
        }
    }
}

/// Keyed read-through cache: values stay fresh for `ttl`, concurrent misses
/// on one key share a single fetch, and a failed fetch resolves to the last
/// cached value (or `V::default()`) instead of an error.
///
/// Instances are owned by the client that reads through them; nothing here
/// is global.
pub struct TtlCache<K, V> {
    ttl: Duration,
    slots: Arc<Mutex<HashMap<K, Slot<V>>>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<K, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Clone + Eq + Hash + Send + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    /// Returns the cached value for `key`, fetching through `fetch` when the
    /// slot is empty or older than the TTL. While a fetch is in flight every
    /// caller awaits that same fetch; `fetch` is not invoked again. A failed
    /// fetch is logged and absorbed: callers get the stale value if one
    /// exists, `V::default()` otherwise, and the stored timestamp is left
    /// untouched so the next call retries.
    pub async fn get_with<F, Fut, E>(&self, key: K, fetch: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let shared = {
            let mut slots = self.slots.lock().expect("cache lock");
            let slot = slots.entry(key.clone()).or_default();

            if let Some((value, stored_at)) = &slot.value
                && stored_at.elapsed() < self.ttl
            {
                return value.clone();
            }

            if let Some(in_flight) = &slot.in_flight {
                in_flight.clone()
            } else {
                let epoch = slot.epoch;
                let fut = fetch();
                let slots_handle = Arc::clone(&self.slots);
                let shared = async move {
                    let result = fut.await;
                    let mut slots = slots_handle.lock().expect("cache lock");
                    let slot = slots.entry(key).or_default();
                    let current = slot.epoch == epoch;
                    if current {
                        slot.in_flight = None;
                    }
                    match result {
                        Ok(value) => {
                            if current {
                                slot.value = Some((value.clone(), Instant::now()));
                            }
                            value
                        }
                        Err(err) => {
                            warn!(%err, "cache fetch failed, serving stale value");
                            match &slot.value {
                                Some((stale, _)) => stale.clone(),
                                None => V::default(),
                            }
                        }
                    }
                }
                .boxed()
                .shared();
                slot.in_flight = Some(shared.clone());
                shared
            }
        };
        shared.await
    }

    /// Drops the slot for `key`: cached value, timestamp, and the in-flight
    /// marker. The next read fetches fresh.
    pub fn invalidate(&self, key: &K) {
        let mut slots = self.slots.lock().expect("cache lock");
        if let Some(slot) = slots.get_mut(key) {
            slot.value = None;
            slot.in_flight = None;
            slot.epoch += 1;
        }
    }
}
