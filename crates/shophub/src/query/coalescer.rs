use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use shophub_core::{QueryKey, Result};

type Inflight = broadcast::Sender<Result<Vec<u8>>>;

/// Result of a coalesced request
pub struct Flight {
    pub result: Result<Vec<u8>>,
    /// True when this caller attached to another caller's fetch
    pub joined: bool,
}

#[derive(Clone, Default)]
pub struct Coalescer {
    // Key -> sender the leader broadcasts its result on
    inflight: Arc<DashMap<QueryKey, Inflight>>,
    // Keys with a background refresh task running
    refreshing: Arc<DashMap<QueryKey, ()>>,
}

/// Removes the in-flight slot even when the leader's future is dropped mid-fetch
struct LeaderGuard<'a> {
    inflight: &'a DashMap<QueryKey, Inflight>,
    key: &'a QueryKey,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        self.inflight.remove(self.key);
    }
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a fetch for `key` is currently running
    pub fn is_inflight(&self, key: &QueryKey) -> bool {
        self.inflight.contains_key(key)
    }

    /// Run `f` for `key`, or wait for the fetch already running for it.
    ///
    /// If the leader is cancelled before publishing, a waiting follower takes
    /// over and runs `f` itself.
    pub async fn do_request<F, Fut>(&self, key: &QueryKey, f: F) -> Flight
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<u8>>>,
    {
        let mut joined = false;
        loop {
            // Scope the entry lock so it is released before awaiting
            let action = match self.inflight.entry(key.clone()) {
                Entry::Occupied(o) => Ok(o.get().subscribe()),
                Entry::Vacant(v) => {
                    let (tx, _rx) = broadcast::channel(1);
                    v.insert(tx.clone());
                    Err(tx)
                }
            };

            match action {
                Ok(mut rx) => {
                    joined = true;
                    match rx.recv().await {
                        Ok(result) => return Flight { result, joined },
                        // Leader went away without sending; try to lead
                        Err(_) => continue,
                    }
                }
                Err(tx) => {
                    let guard = LeaderGuard {
                        inflight: &self.inflight,
                        key,
                    };
                    let result = f().await;
                    drop(guard);

                    if tx.receiver_count() > 0 {
                        let _ = tx.send(result.clone());
                    }
                    return Flight { result, joined };
                }
            }
        }
    }

    /// Spawn a background refresh for `key` unless one is already running.
    ///
    /// Returns false when nothing was spawned (duplicate, or no runtime).
    pub fn try_spawn_refresh<F, Fut>(&self, key: &QueryKey, task_factory: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            return false;
        };

        match self.refreshing.entry(key.clone()) {
            Entry::Vacant(v) => {
                v.insert(());
            }
            Entry::Occupied(_) => return false,
        }

        let task = task_factory();
        let map = self.refreshing.clone();
        let key = key.clone();
        handle.spawn(async move {
            task.await;
            map.remove(&key);
        });
        true
    }

    /// Whether a background refresh for `key` is running
    pub fn is_refreshing(&self, key: &QueryKey) -> bool {
        self.refreshing.contains_key(key)
    }
}
