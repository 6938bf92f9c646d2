//! Collapses concurrent identical requests into one upstream call.
//!
//! The first caller for a key stores a shared future; callers arriving while it
//! is outstanding await the same future instead of starting their own, so they
//! all observe the same value or the same error. The entry is removed as soon
//! as the future settles. Entries older than the request timeout are treated
//! as abandoned and replaced.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::debug;

use crate::store::{MemoryStore, Mutation, Store};

/// Age after which a pending entry no longer collapses new callers.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type SharedResult<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// An in-flight request for one key.
pub struct PendingRequest<T, E> {
    id: u64,
    started: Instant,
    future: SharedResult<T, E>,
}

impl<T, E> Clone for PendingRequest<T, E>
where
    T: Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            started: self.started,
            future: self.future.clone(),
        }
    }
}

pub struct RequestDeduplicator<T, E, S = MemoryStore<PendingRequest<T, E>>> {
    pending: S,
    timeout: Duration,
    next_id: AtomicU64,
    _result: PhantomData<fn() -> Result<T, E>>,
}

impl<T, E> RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(), REQUEST_TIMEOUT)
    }
}

impl<T, E> Default for RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E, S> RequestDeduplicator<T, E, S>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    S: Store<PendingRequest<T, E>>,
{
    pub fn with_store(pending: S, timeout: Duration) -> Self {
        Self {
            pending,
            timeout,
            next_id: AtomicU64::new(0),
            _result: PhantomData,
        }
    }

    /// Run `factory` for `key` unless a fresh call for the same key is already
    /// in flight, in which case its result is shared.
    pub async fn run<F, Fut>(&self, key: &str, factory: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let candidate = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timeout = self.timeout;
        let now = Instant::now();

        let (future, id, joined) = self
            .pending
            .update(key, move |existing| {
                if let Some(pending) = existing {
                    if now.saturating_duration_since(pending.started) < timeout {
                        return (Mutation::Keep, (pending.future.clone(), pending.id, true));
                    }
                }
                let future = factory().boxed().shared();
                let pending = PendingRequest {
                    id: candidate,
                    started: now,
                    future: future.clone(),
                };
                (Mutation::Set(pending), (future, candidate, false))
            })
            .await;

        if joined {
            debug!(%key, "joining in-flight request");
        }

        let result = future.await;

        // First settled caller clears the entry; a newer entry under the same key is left alone.
        self.pending
            .update(key, |existing| match existing {
                Some(pending) if pending.id == id => (Mutation::Remove, ()),
                _ => (Mutation::Keep, ()),
            })
            .await;

        result
    }

    /// Drop entries older than the timeout.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let timeout = self.timeout;
        self.pending
            .retain(|_, pending| now.saturating_duration_since(pending.started) < timeout)
            .await
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}
