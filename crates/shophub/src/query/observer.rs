use serde::de::DeserializeOwned;
use tokio::sync::watch;

use shophub_core::{
    JsonSerializer, NoopMetrics, QueryKey, QueryMetrics, Result, Serializer, ShopError,
};

use super::{QueryClient, QueryState};

/// Active interest in one query
///
/// Keeps the entry out of garbage collection and makes invalidation refetch
/// it immediately. Dropping the observer starts the entry's gc window.
pub struct QueryObserver<S = JsonSerializer, M = NoopMetrics>
where
    S: Serializer,
    M: QueryMetrics,
{
    client: QueryClient<S, M>,
    key: QueryKey,
    version: watch::Receiver<u64>,
}

impl<S, M> QueryObserver<S, M>
where
    S: Serializer,
    M: QueryMetrics,
{
    pub(super) fn new(
        client: QueryClient<S, M>,
        key: QueryKey,
        version: watch::Receiver<u64>,
    ) -> Self {
        Self {
            client,
            key,
            version,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current data, regardless of freshness
    pub fn data<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.client.get_query_data(&self.key)
    }

    pub fn state(&self) -> Option<QueryState> {
        self.client.query_state(&self.key)
    }

    /// Wait until the entry changes (new data, error, or invalidation).
    ///
    /// Fails with `Cancelled` once the entry has been removed from the cache.
    pub async fn changed(&mut self) -> Result<()> {
        self.version.changed().await.map_err(|_| ShopError::Cancelled)
    }
}

impl<S, M> Drop for QueryObserver<S, M>
where
    S: Serializer,
    M: QueryMetrics,
{
    fn drop(&mut self) {
        self.client.unobserve(&self.key);
    }
}
