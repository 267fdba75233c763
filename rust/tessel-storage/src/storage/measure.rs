use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tessel_common::ConditionalSync;

use super::StorageBackend;

/// Counts of the operations a [MeasuredStorageBackend] has passed through
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Measurement {
    /// Chunk loads, including ones that found nothing
    pub reads: usize,
    /// Chunk stores, including ones that rewrote an existing chunk
    pub writes: usize,
}

#[derive(Default)]
struct Counters {
    reads: AtomicUsize,
    writes: AtomicUsize,
}

/// Wraps a [StorageBackend] and counts the chunks read from and written to
/// it. This is how tests observe that a lookup or a diff only touched the
/// chunks it had to.
///
/// Clones share their counters, so a clone kept aside sees every operation
/// made through the storage that was handed to a map.
#[derive(Clone)]
pub struct MeasuredStorageBackend<Backend>
where
    Backend: StorageBackend,
{
    counters: Arc<Counters>,
    backend: Backend,
}

impl<Backend> MeasuredStorageBackend<Backend>
where
    Backend: StorageBackend,
{
    /// Start counting operations on `backend` from zero
    pub fn new(backend: Backend) -> Self {
        Self {
            counters: Arc::default(),
            backend,
        }
    }

    /// Chunks read so far
    pub fn reads(&self) -> usize {
        self.counters.reads.load(Ordering::Relaxed)
    }

    /// Chunks written so far
    pub fn writes(&self) -> usize {
        self.counters.writes.load(Ordering::Relaxed)
    }

    /// Both counts at once
    pub fn measurement(&self) -> Measurement {
        Measurement {
            reads: self.reads(),
            writes: self.writes(),
        }
    }

    /// Zero both counts, returning what they were
    pub fn reset(&self) -> Measurement {
        Measurement {
            reads: self.counters.reads.swap(0, Ordering::Relaxed),
            writes: self.counters.writes.swap(0, Ordering::Relaxed),
        }
    }

    /// The backend being measured
    pub fn inner(&self) -> &Backend {
        &self.backend
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<Backend> StorageBackend for MeasuredStorageBackend<Backend>
where
    Backend: StorageBackend + ConditionalSync,
{
    type Key = Backend::Key;
    type Value = Backend::Value;
    type Error = Backend::Error;

    async fn set(&mut self, key: Self::Key, value: Self::Value) -> Result<(), Self::Error> {
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        self.backend.set(key, value).await
    }

    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error> {
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        self.backend.get(key).await
    }
}
