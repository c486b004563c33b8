use std::time::Duration;

use alloy::{primitives::U256, providers::Provider};
use futures::{Stream, stream};

use crate::{
    Chain,
    abi::oracle::IIndexOracle,
    error::ChainError,
    types::{IndexId, IndexPoint},
};

/// Returns an endless stream of values for one index feed.
///
/// Polls `getIndexValue` via the given [`Provider`] every `poll_interval`,
/// emitting the first read and then every read whose oracle timestamp
/// changed. Transport failures are yielded as `Err` items and polling
/// continues, so the consumer decides when a feed counts as dead.
///
/// It is recommended to set the provider up with
/// [`alloy::transports::layers::RetryBackoffLayer`].
///
/// `sleep` is injected (pass [`tokio::time::sleep`]) so tests control time.
pub fn values<P, S, SFut>(
    chain: &Chain,
    provider: P,
    index_id: IndexId,
    poll_interval: Duration,
    sleep: S,
) -> impl Stream<Item = Result<IndexPoint, ChainError>>
where
    P: Provider,
    S: Fn(Duration) -> SFut + Copy,
    SFut: Future<Output = ()>,
{
    let instance = IIndexOracle::new(chain.index_oracle(), provider);
    stream::unfold(
        (instance, None::<u64>, true),
        move |(instance, mut last_seen, first)| async move {
            if !first {
                sleep(poll_interval).await;
            }
            loop {
                match instance.getIndexValue(U256::from(index_id)).call().await {
                    Ok(ret) => {
                        let point = IndexPoint::new(ret.value, ret.timestamp.to::<u64>());
                        if last_seen != Some(point.timestamp()) {
                            last_seen = Some(point.timestamp());
                            return Some((Ok(point), (instance, last_seen, false)));
                        }
                        sleep(poll_interval).await;
                    }
                    Err(err) => {
                        return Some((
                            Err(ChainError::from(err)),
                            (instance, last_seen, false),
                        ));
                    }
                }
            }
        },
    )
}
