//! Cancellable timers: debounced input and delayed prefetch
//!
//! Both spawn onto the current Tokio runtime and must be used from within one.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use shophub_core::{ProductFilters, ProductId, ProductSource, QueryMetrics, Serializer};

use crate::catalog::ProductService;

/// Handle to a scheduled callback. Dropping the handle does not cancel it.
#[derive(Debug)]
pub struct TimerHandle {
    abort: AbortHandle,
}

impl TimerHandle {
    /// Stop the callback if it has not started yet
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Run `f` once `after` has elapsed
///
/// # Panics
///
/// Panics when called outside a Tokio runtime.
pub fn schedule<F, Fut>(after: Duration, f: F) -> TimerHandle
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(after).await;
        f().await;
    });
    TimerHandle {
        abort: task.abort_handle(),
    }
}

struct Pending {
    generation: u64,
    timer: Option<TimerHandle>,
}

/// Delivers only the last value of a burst, `delay` after the burst ends
pub struct Debouncer<T> {
    delay: Duration,
    sink: Arc<dyn Fn(T) + Send + Sync>,
    pending: Arc<Mutex<Pending>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Delay used for search input
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

    pub fn new<F>(delay: Duration, sink: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            delay,
            sink: Arc::new(sink),
            pending: Arc::new(Mutex::new(Pending {
                generation: 0,
                timer: None,
            })),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending value with `value` and restart the delay
    pub fn call(&self, value: T) {
        let mut pending = self.pending.lock();
        if let Some(timer) = pending.timer.take() {
            timer.cancel();
        }
        pending.generation += 1;
        let generation = pending.generation;

        let state = self.pending.clone();
        let sink = self.sink.clone();
        pending.timer = Some(schedule(self.delay, move || async move {
            {
                let mut pending = state.lock();
                if pending.generation != generation {
                    return;
                }
                pending.timer = None;
            }
            sink(value);
        }));
    }

    /// Drop the pending value, if any
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock();
        pending.generation += 1;
        match pending.timer.take() {
            Some(timer) => {
                timer.cancel();
                debug!("debounced call cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().timer.is_some()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock();
        pending.generation += 1;
        if let Some(timer) = pending.timer.take() {
            timer.cancel();
        }
    }
}

struct Armed {
    generation: u64,
    timer: TimerHandle,
}

/// Delayed, cancellable product prefetch (hover intent) and page look-ahead
pub struct Prefetcher<R, S, M>
where
    R: ProductSource,
    S: Serializer,
    M: QueryMetrics,
{
    service: ProductService<R, S, M>,
    delay: Duration,
    timers: Arc<DashMap<ProductId, Armed>>,
    generation: Arc<AtomicU64>,
}

impl<R, S, M> Prefetcher<R, S, M>
where
    R: ProductSource,
    S: Serializer,
    M: QueryMetrics,
{
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

    pub fn new(service: ProductService<R, S, M>, delay: Duration) -> Self {
        Self {
            service,
            delay,
            timers: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Prefetch `id` after the default delay
    pub fn hover(&self, id: ProductId) {
        self.prefetch_product(id, self.delay);
    }

    /// Prefetch `id` once `delay` elapses, replacing any timer already armed
    /// for the same product
    pub fn prefetch_product(&self, id: ProductId, delay: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let timers = self.timers.clone();
        let service = self.service.clone();

        let fire = move || async move {
            // Only the timer still registered for `id` may fire
            if timers
                .remove_if(&id, |_, armed| armed.generation == generation)
                .is_none()
            {
                return;
            }
            debug!(product_id = id, "hover prefetch firing");
            service.prefetch_product(id).await;
        };

        // Arm while holding the entry so a zero delay cannot fire first
        match self.timers.entry(id) {
            Entry::Occupied(mut slot) => {
                let timer = schedule(delay, fire);
                let previous = slot.insert(Armed { generation, timer });
                previous.timer.cancel();
            }
            Entry::Vacant(slot) => {
                let timer = schedule(delay, fire);
                slot.insert(Armed { generation, timer });
            }
        }
    }

    /// Disarm the timer for `id`. Returns false when none was armed.
    pub fn cancel(&self, id: ProductId) -> bool {
        match self.timers.remove(&id) {
            Some((_, armed)) => {
                armed.timer.cancel();
                debug!(product_id = id, "hover prefetch cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        self.timers.retain(|_, armed| {
            armed.timer.cancel();
            false
        });
    }

    pub fn is_pending(&self, id: ProductId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Load the page after the last loaded one for `filters`.
    ///
    /// Failures are logged and swallowed. Returns true when a page was added.
    pub async fn prefetch_next_page(&self, filters: ProductFilters) -> bool {
        let outcome = async {
            let query = self.service.infinite_products(filters).await?;
            query.fetch_next_page().await
        }
        .await;
        match outcome {
            Ok(appended) => appended,
            Err(err) => {
                warn!(error = %err, "next page prefetch failed");
                false
            }
        }
    }
}

impl<R, S, M> Drop for Prefetcher<R, S, M>
where
    R: ProductSource,
    S: Serializer,
    M: QueryMetrics,
{
    fn drop(&mut self) {
        self.cancel_all();
    }
}
