use std::{hash::Hash, num::NonZeroUsize, sync::Arc};

use async_trait::async_trait;
use sieve_cache::SieveCache;
use tessel_common::ConditionalSync;
use tokio::sync::Mutex;

use super::StorageBackend;
use crate::TesselStorageError;

/// Keeps recently used chunks in memory in front of a slower
/// [StorageBackend]. Writes go through to the backend and also warm the
/// cache; reads only reach the backend on a miss.
///
/// Chunks never change once written, so entries are evicted (SIEVE) but
/// never invalidated.
#[derive(Clone)]
pub struct StorageCache<Backend>
where
    Backend: StorageBackend,
    Backend::Key: Eq + Clone + Hash,
    Backend::Value: Clone,
{
    backend: Backend,
    capacity: NonZeroUsize,
    chunks: Arc<Mutex<SieveCache<Backend::Key, Backend::Value>>>,
}

impl<Backend> StorageCache<Backend>
where
    Backend: StorageBackend,
    Backend::Key: Eq + Clone + Hash,
    Backend::Value: Clone,
{
    /// Front `backend` with a cache holding up to `capacity` chunks
    pub fn new(backend: Backend, capacity: usize) -> Result<Self, TesselStorageError> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            TesselStorageError::StorageBackend("A chunk cache needs room for one chunk".into())
        })?;
        let chunks = SieveCache::new(capacity.get()).map_err(|error| {
            TesselStorageError::StorageBackend(format!("Chunk cache unavailable: {error}"))
        })?;

        Ok(Self {
            backend,
            capacity,
            chunks: Arc::new(Mutex::new(chunks)),
        })
    }

    /// The most chunks the cache keeps at once
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// The backend behind the cache
    pub fn inner(&self) -> &Backend {
        &self.backend
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<Backend> StorageBackend for StorageCache<Backend>
where
    Backend: StorageBackend + ConditionalSync,
    Backend::Key: Eq + Clone + Hash + ConditionalSync,
    Backend::Value: Clone + ConditionalSync,
{
    type Key = Backend::Key;
    type Value = Backend::Value;
    type Error = Backend::Error;

    async fn set(&mut self, key: Self::Key, value: Self::Value) -> Result<(), Self::Error> {
        self.backend.set(key.clone(), value.clone()).await?;
        self.chunks.lock().await.insert(key, value);
        Ok(())
    }

    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error> {
        if let Some(value) = self.chunks.lock().await.get(key) {
            return Ok(Some(value.clone()));
        }

        // The lock is released while the backend is consulted; a concurrent
        // miss on the same chunk just loads it twice
        let value = self.backend.get(key).await?;
        if let Some(value) = &value {
            self.chunks.lock().await.insert(key.clone(), value.clone());
        } else {
            tracing::trace!("Chunk cache miss on an absent chunk");
        }
        Ok(value)
    }
}
