//! Infinite (cursor-paginated) queries

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

use shophub_core::{
    Cursor, InfiniteData, JsonSerializer, NoopMetrics, Page, QueryKey, QueryMetrics,
    QueryOperation, QueryOptions, Result, Serializer, ShopError,
};

use super::{Fetcher, QueryClient, QueryObserver, QueryState, Resolved};

type PageFetcher<P> = Arc<dyn Fn(Cursor) -> BoxFuture<'static, Result<P>> + Send + Sync>;
type NextCursor<P> = Arc<dyn Fn(&P) -> Option<Cursor> + Send + Sync>;

/// Handle to an infinite query
///
/// The entry under `key` holds an [`InfiniteData<P>`]: pages in fetch order
/// plus the cursor for the next one.
pub struct InfiniteQuery<P, S = JsonSerializer, M = NoopMetrics>
where
    S: Serializer,
    M: QueryMetrics,
{
    client: QueryClient<S, M>,
    key: QueryKey,
    fetch_page: PageFetcher<P>,
    next_cursor: NextCursor<P>,
    options: Resolved,
}

impl<S, M> QueryClient<S, M>
where
    S: Serializer,
    M: QueryMetrics,
{
    /// Load the first page of an infinite query (or serve it from cache) and
    /// return a handle for paging further.
    ///
    /// `get_next_cursor` maps a fetched page to the cursor of the page after
    /// it; `None` means the end was reached.
    pub async fn infinite_query<P, F, Fut, N>(
        &self,
        key: QueryKey,
        fetch_page: F,
        get_next_cursor: N,
        options: impl Into<QueryOptions>,
    ) -> Result<InfiniteQuery<P, S, M>>
    where
        P: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: Fn(Cursor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<P>> + Send + 'static,
        N: Fn(&P) -> Option<Cursor> + Send + Sync + 'static,
    {
        let query = self.infinite_handle(key, fetch_page, get_next_cursor, options.into());
        self.lookup(&query.key, query.refetcher(), &query.options).await?;
        Ok(query)
    }

    /// Load the first page of an infinite query ahead of use. Failures are
    /// logged and swallowed.
    pub async fn prefetch_infinite<P, F, Fut, N>(
        &self,
        key: QueryKey,
        fetch_page: F,
        get_next_cursor: N,
        options: impl Into<QueryOptions>,
    ) where
        P: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: Fn(Cursor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<P>> + Send + 'static,
        N: Fn(&P) -> Option<Cursor> + Send + Sync + 'static,
    {
        let query = self.infinite_handle(key, fetch_page, get_next_cursor, options.into());
        self.prefetch_erased(&query.key, query.refetcher(), &query.options)
            .await;
    }

    fn infinite_handle<P, F, Fut, N>(
        &self,
        key: QueryKey,
        fetch_page: F,
        get_next_cursor: N,
        options: QueryOptions,
    ) -> InfiniteQuery<P, S, M>
    where
        P: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: Fn(Cursor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<P>> + Send + 'static,
        N: Fn(&P) -> Option<Cursor> + Send + Sync + 'static,
    {
        InfiniteQuery {
            client: self.clone(),
            key,
            fetch_page: Arc::new(move |cursor| fetch_page(cursor).boxed()),
            next_cursor: Arc::new(get_next_cursor),
            options: self.resolve(&options),
        }
    }
}

impl<P, S, M> InfiniteQuery<P, S, M>
where
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Serializer,
    M: QueryMetrics,
{
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Accumulated pages and cursor, if anything is loaded
    pub fn data(&self) -> Result<Option<InfiniteData<P>>> {
        self.client.get_query_data(&self.key)
    }

    /// Loaded pages in fetch order
    pub fn pages(&self) -> Result<Vec<P>> {
        Ok(self.data()?.map(|data| data.pages).unwrap_or_default())
    }

    pub fn has_next_page(&self) -> bool {
        matches!(self.data(), Ok(Some(data)) if data.has_next_page())
    }

    /// Whether a fetch for this query (next page or refetch) is running
    pub fn is_fetching_next_page(&self) -> bool {
        self.client.coalescer.is_inflight(&self.key)
    }

    pub fn state(&self) -> Option<QueryState> {
        self.client.query_state(&self.key)
    }

    /// Observe the underlying entry
    pub fn observe(&self) -> QueryObserver<S, M> {
        self.client.observe(self.key.clone())
    }

    /// Fetch the page after the last loaded one and append it.
    ///
    /// Returns `Ok(false)` without fetching when no next cursor is known or a
    /// fetch for this query is already in flight.
    pub async fn fetch_next_page(&self) -> Result<bool> {
        if self.client.coalescer.is_inflight(&self.key) {
            debug!(key = %self.key, "next page skipped, fetch in flight");
            return Ok(false);
        }
        let Some(cursor) = self.data()?.and_then(|data| data.next_cursor) else {
            debug!(key = %self.key, "next page skipped, no cursor");
            return Ok(false);
        };

        let start = Instant::now();
        let flight = self
            .client
            .coalescer
            .do_request(&self.key, || self.append_page(cursor))
            .await;
        if flight.joined {
            self.client.stats.write().coalesced += 1;
        }
        self.client
            .metrics
            .record_latency(QueryOperation::FetchPage, start.elapsed());

        // Invalidated while appending: rebuild every page for live observers
        let follow_up = !flight.joined
            && self.client.entries.get(&self.key).is_some_and(|slot| {
                slot.entry.invalidated && slot.observers > 0 && slot.fetcher.is_some()
            });
        if follow_up {
            debug!(key = %self.key, "invalidated while appending, refetching");
            self.client.spawn_refetch(&self.key);
        }
        flight.result.map(|_| true)
    }

    /// Refetch every loaded page from the initial cursor
    pub async fn refetch(&self) -> Result<()> {
        if let Some(mut slot) = self.client.entries.get_mut(&self.key) {
            slot.entry.invalidated = true;
        }
        self.client.fetch_coalesced(&self.key).await.map(|_| ())
    }

    async fn append_page(&self, cursor: Cursor) -> Result<Vec<u8>> {
        let (current, retry, epoch) = {
            let slot = self
                .client
                .entries
                .get(&self.key)
                .ok_or(ShopError::Cancelled)?;
            let current = slot
                .entry
                .data
                .clone()
                .ok_or_else(|| ShopError::Internal(format!("no pages loaded for {}", self.key)))?;
            (current, slot.retry.clone(), slot.entry.epoch)
        };

        let mut data: InfiniteData<P> = self.client.serializer.deserialize(&current)?;
        // A follower taking over from a cancelled leader may find the page already appended
        if data.next_cursor != Some(cursor) {
            return Ok(current);
        }

        let (result, attempts) = self
            .client
            .fetch_with_retry(&self.key, &retry, || (self.fetch_page)(cursor))
            .await;

        let stored = result.and_then(|page| {
            let next = (self.next_cursor)(&page);
            data.push(page, cursor, next);
            self.client.serializer.serialize(&data)
        });
        self.client.store_result(&self.key, &stored, attempts, epoch);
        stored
    }

    /// Type-erased fetcher that rebuilds the entry from the initial cursor,
    /// fetching as many pages as were loaded before (at least one)
    fn refetcher(&self) -> Fetcher {
        let fetch_page = self.fetch_page.clone();
        let next_cursor = self.next_cursor.clone();
        let serializer = self.client.serializer.clone();
        let initial = self.options.initial_page;

        Arc::new(move |previous: Option<Vec<u8>>| {
            let fetch_page = fetch_page.clone();
            let next_cursor = next_cursor.clone();
            let serializer = serializer.clone();
            async move {
                let wanted = previous
                    .and_then(|bytes| serializer.deserialize::<InfiniteData<P>>(&bytes).ok())
                    .map_or(1, |data| data.pages.len().max(1));

                let first = fetch_page(initial).await?;
                let cursor = next_cursor(&first);
                let mut data = InfiniteData::first(first, initial, cursor);
                while data.pages.len() < wanted {
                    let Some(cursor) = data.next_cursor else {
                        break;
                    };
                    let page = fetch_page(cursor).await?;
                    let next = next_cursor(&page);
                    data.push(page, cursor, next);
                }
                serializer.serialize(&data)
            }
            .boxed()
        })
    }
}

impl<T, S, M> InfiniteQuery<Page<T>, S, M>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    S: Serializer,
    M: QueryMetrics,
{
    /// All items across loaded pages, in page order
    pub fn items(&self) -> Result<Vec<T>> {
        Ok(self.data()?.map(|data| data.items()).unwrap_or_default())
    }
}

impl<P, S, M> Clone for InfiniteQuery<P, S, M>
where
    S: Serializer,
    M: QueryMetrics,
{
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            key: self.key.clone(),
            fetch_page: self.fetch_page.clone(),
            next_cursor: self.next_cursor.clone(),
            options: self.options.clone(),
        }
    }
}
