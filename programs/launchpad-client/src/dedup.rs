use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

type Pending<T> = Shared<BoxFuture<'static, T>>;

struct Entry {
    id: u64,
    pending: Box<dyn Any + Send + Sync>,
}

/// Collapses concurrent calls that share a key into one execution.
///
/// The first caller for a key starts the action; every caller arriving while
/// it is in flight awaits the same shared result. The entry is removed when the
/// action settles, whatever the outcome, so a later call runs fresh.
///
/// The action runs on its own task. A caller that stops awaiting only stops
/// waiting for the result; the submission and the entry cleanup still finish.
#[derive(Clone, Default)]
pub struct DedupGate {
    in_flight: Arc<Mutex<HashMap<String, Entry>>>,
    next_id: Arc<AtomicU64>,
}

impl DedupGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of keys currently in flight
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn join<T>(&self, key: &str) -> Option<Result<Pending<T>, ()>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let map = self.lock();
        map.get(key).map(|entry| {
            entry
                .pending
                .downcast_ref::<Pending<T>>()
                .cloned()
                .ok_or(())
        })
    }

    /// Run `action` unless an action for `key` is already in flight, in which
    /// case await that one's result instead.
    pub async fn run_exclusive<T, F, Fut>(&self, key: impl Into<String>, action: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let key = key.into();

        match self.join::<T>(&key) {
            Some(Ok(pending)) => {
                debug!(key = %key, "joining in-flight operation");
                drop(action);
                return pending.await;
            }
            Some(Err(())) => {
                warn!(key = %key, "key in flight with a different result type, running uncoordinated");
                return action().await;
            }
            None => {}
        }

        // Futures are lazy, so building one outside the lock has no side effects
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let in_flight = Arc::clone(&self.in_flight);
        let cleanup_key = key.clone();
        let work = action();
        let pending: Pending<T> = async move {
            let out = work.await;
            let mut map = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if map.get(&cleanup_key).map(|e| e.id) == Some(id) {
                map.remove(&cleanup_key);
            }
            out
        }
        .boxed()
        .shared();

        let pending = {
            let mut map = self.lock();
            match map.get(&key) {
                // Lost the race between lookup and insert; our future is never polled
                Some(entry) => match entry.pending.downcast_ref::<Pending<T>>() {
                    Some(existing) => existing.clone(),
                    None => pending,
                },
                None => {
                    debug!(key = %key, "starting operation");
                    map.insert(
                        key.clone(),
                        Entry {
                            id,
                            pending: Box::new(pending.clone()),
                        },
                    );
                    tokio::spawn(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }
}
