//! Cache-aside lookup with in-flight request coalescing.
//!
//! A request first reads the backend. On a miss it either joins the
//! computation already running for the same key or starts one. Each
//! computation is a spawned task whose shared handle sits in the in-flight
//! map until the task finishes, so a burst of identical requests costs one
//! engine search.
//!
//! Results carrying a fault are handed to every waiter but never stored.

use super::{cache_key, CacheBackend, DEFAULT_TTL};
use crate::evaluation::{Computed, Evaluation, EvaluationResult, Fault};
use crate::{Depth, Position};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type InFlight = Arc<Mutex<HashMap<String, Shared<BoxFuture<'static, Computed>>>>>;

/// Serves results from a [`CacheBackend`] and computes them on a miss.
///
/// Concurrent misses for the same key share one computation. The computation
/// runs as its own task, so it completes and stores its result even when every
/// waiting caller has gone away. Backend failures never fail a request: a read
/// error is a miss and a write error is logged and dropped.
#[derive(Clone)]
pub struct CacheAside {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    in_flight: InFlight,
}

impl CacheAside {
    /// Wrap `backend` with the default 24 hour expiry.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_ttl(backend, DEFAULT_TTL)
    }

    /// Wrap `backend` with a custom expiry.
    ///
    /// # Arguments
    ///
    /// * `backend` - Store read before and written after each computation
    /// * `ttl` - Expiry passed to every [`CacheBackend::set`]
    pub fn with_ttl(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached result for `(position, depth)`, or run `compute` and
    /// store what it produces when [`Computed::is_cacheable`].
    ///
    /// # Arguments
    ///
    /// * `position` - Position whose FEN text forms the key
    /// * `depth` - Search depth, part of the key
    /// * `compute` - Produces the result on a miss. Not called when the key
    ///   is cached or already being computed.
    ///
    /// # Returns
    ///
    /// An [`Evaluation`] with `cached` set only for a backend hit. A panic
    /// in `compute` yields an `ERROR:ANALYSIS_FAILED` result.
    pub async fn get_or_compute<F, Fut>(
        &self,
        position: &Position,
        depth: Depth,
        compute: F,
    ) -> Evaluation
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Computed> + Send + 'static,
    {
        let key = cache_key(position.fen(), depth);

        if let Some(result) = self.lookup(&key).await {
            tracing::debug!(key = %key, "Cache hit");
            return Evaluation {
                result,
                cached: true,
                fault: None,
            };
        }

        let pending = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&key) {
                Some(pending) => {
                    tracing::debug!(key = %key, "Joining in-flight evaluation");
                    pending.clone()
                }
                None => {
                    tracing::debug!(key = %key, "Cache miss");
                    let pending = self.start(key.clone(), compute);
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        let computed = pending.await;
        Evaluation {
            result: computed.result,
            cached: false,
            fault: computed.fault,
        }
    }

    /// Spawn the computation for `key`. Must be called with the in-flight map
    /// locked so the entry is registered before the task can remove it.
    fn start<F, Fut>(&self, key: String, compute: F) -> Shared<BoxFuture<'static, Computed>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Computed> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let ttl = self.ttl;
        let guard = InFlightGuard {
            key: key.clone(),
            in_flight: Arc::clone(&self.in_flight),
        };

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let computed = compute().await;
            if computed.is_cacheable() {
                store(backend.as_ref(), &key, &computed.result, ttl).await;
            }
            computed
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Evaluation task failed");
                Computed::failed(Fault::AnalysisFailed)
            })
        }
        .boxed()
        .shared()
    }

    async fn lookup(&self, key: &str) -> Option<EvaluationResult> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(key, error = %e, "Undecodable cache entry, treating as miss");
                None
            }
        }
    }
}

async fn store(backend: &dyn CacheBackend, key: &str, result: &EvaluationResult, ttl: Duration) {
    let value = match serde_json::to_string(result) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to encode result for cache");
            return;
        }
    };
    if let Err(e) = backend.set(key, &value, ttl).await {
        tracing::warn!(key, error = %e, "Cache write failed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the in-flight entry when the computation task ends, however it ends.
struct InFlightGuard {
    key: String,
    in_flight: InFlight,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.key);
    }
}
