//! Key-value storage behind the caches and limiters.
//!
//! Components are generic over [`Store`] so they can run on the in-process
//! [`MemoryStore`] or on a shared backend in a multi-instance deployment.
//! Every read-modify-write goes through [`Store::update`], which must be
//! atomic per key.

use std::sync::Arc;

use async_trait::async_trait;
use scc::hash_map::Entry;

/// What [`Store::update`] should do with the entry after the closure ran.
#[derive(Debug)]
pub enum Mutation<V> {
    Keep,
    Set(V),
    Remove,
}

#[async_trait]
pub trait Store<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V>;

    async fn set(&self, key: &str, value: V);

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> bool;

    /// Atomically inspect the entry for `key` and decide its next state.
    async fn update<F, R>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(Option<&V>) -> (Mutation<V>, R) + Send,
        R: Send;

    /// Drop every entry for which `keep` returns false. Returns how many were dropped.
    async fn retain<F>(&self, keep: F) -> usize
    where
        F: FnMut(&str, &V) -> bool + Send;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lock-free in-process store on top of `scc::HashMap`.
pub struct MemoryStore<V> {
    entries: scc::HashMap<String, V>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: scc::HashMap::new(),
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> Store<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        self.entries.read_async(key, |_, value| value.clone()).await
    }

    async fn set(&self, key: &str, value: V) {
        match self.entries.entry_async(key.to_string()).await {
            Entry::Occupied(mut occupied) => *occupied.get_mut() = value,
            Entry::Vacant(vacant) => {
                vacant.insert_entry(value);
            }
        }
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.remove_async(key).await.is_some()
    }

    async fn update<F, R>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(Option<&V>) -> (Mutation<V>, R) + Send,
        R: Send,
    {
        match self.entries.entry_async(key.to_string()).await {
            Entry::Occupied(mut occupied) => {
                let (mutation, output) = f(Some(occupied.get()));
                match mutation {
                    Mutation::Keep => {}
                    Mutation::Set(value) => *occupied.get_mut() = value,
                    Mutation::Remove => {
                        let _ = occupied.remove();
                    }
                }
                output
            }
            Entry::Vacant(vacant) => {
                let (mutation, output) = f(None);
                if let Mutation::Set(value) = mutation {
                    vacant.insert_entry(value);
                }
                output
            }
        }
    }

    async fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&str, &V) -> bool + Send,
    {
        let before = self.entries.len();
        self.entries
            .retain_async(|key, value| keep(key.as_str(), value))
            .await;
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Lets several components, or several pipelines, share one backing store.
#[async_trait]
impl<V, S> Store<V> for Arc<S>
where
    V: Clone + Send + Sync + 'static,
    S: Store<V> + ?Sized,
{
    async fn get(&self, key: &str) -> Option<V> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: V) {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> bool {
        (**self).delete(key).await
    }

    async fn update<F, R>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(Option<&V>) -> (Mutation<V>, R) + Send,
        R: Send,
    {
        (**self).update(key, f).await
    }

    async fn retain<F>(&self, keep: F) -> usize
    where
        F: FnMut(&str, &V) -> bool + Send,
    {
        (**self).retain(keep).await
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
