use std::{collections::BTreeSet, future::Future, ops::ControlFlow, sync::Arc};

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::{TryStreamExt, future::try_join_all};
use tessel_storage::{ContentAddressedStorage, HashType};

use crate::{
    Chunker, ChunkingConfig, Cursor, Entry, KeyType, Kinded, MapDiff, MapType, Sequence,
    TesselMapError, ValueType, diff_sequences,
};

/// A persistent, ordered key-value map whose tree is cut into chunks by a
/// rolling hash over its content.
///
/// An [`OrderedMap`] is an immutable value: [`OrderedMap::set`] and
/// [`OrderedMap::remove`] return a new map and leave the original untouched.
/// Because chunk boundaries only depend on content, two maps holding the same
/// entries have the same [`OrderedMap::hash`] however they were built, and
/// versions of a map share every chunk an edit did not reach.
#[derive(Clone)]
pub struct OrderedMap<Key, Value, Storage>
where
    Key: KeyType,
    Value: ValueType,
    Storage: ContentAddressedStorage,
{
    storage: Storage,
    config: ChunkingConfig,
    root: Arc<Sequence<Key, Value, Storage::Hash>>,
}

impl<Key, Value, Storage> OrderedMap<Key, Value, Storage>
where
    Key: KeyType,
    Value: ValueType,
    Storage: ContentAddressedStorage,
{
    /// Creates an empty [`OrderedMap`] with the default [`ChunkingConfig`].
    pub async fn new(storage: Storage) -> Result<Self, TesselMapError> {
        Self::with_config(storage, ChunkingConfig::default()).await
    }

    /// Creates an empty [`OrderedMap`] that chunks according to `config`.
    pub async fn with_config(
        storage: Storage,
        config: ChunkingConfig,
    ) -> Result<Self, TesselMapError> {
        Self::from_entries_with_config(std::iter::empty(), storage, config).await
    }

    /// Creates an [`OrderedMap`] from entries in any order. When a key occurs
    /// more than once, the occurrence that comes last in `entries` wins.
    pub async fn from_entries<Entries>(
        entries: Entries,
        storage: Storage,
    ) -> Result<Self, TesselMapError>
    where
        Entries: IntoIterator<Item = (Key, Value)>,
    {
        Self::from_entries_with_config(entries, storage, ChunkingConfig::default()).await
    }

    /// Like [`OrderedMap::from_entries`], chunking according to `config`.
    pub async fn from_entries_with_config<Entries>(
        entries: Entries,
        storage: Storage,
        config: ChunkingConfig,
    ) -> Result<Self, TesselMapError>
    where
        Entries: IntoIterator<Item = (Key, Value)>,
    {
        let mut sorted: Vec<Entry<Key, Value>> = entries.into_iter().map(Entry::from).collect();
        // Stable, so duplicates keep their input order
        sorted.sort_by(|left, right| left.key.cmp(&right.key));

        let mut unique: Vec<Entry<Key, Value>> = Vec::with_capacity(sorted.len());
        for entry in sorted {
            match unique.last_mut() {
                Some(last) if last.key == entry.key => *last = entry,
                _ => unique.push(entry),
            }
        }

        let root = Chunker::build(unique, config, storage.clone()).await?;
        tracing::debug!(size = root.leaves(), hash = %root.hash().display(), "Built map");

        Ok(OrderedMap {
            storage,
            config,
            root,
        })
    }

    /// Hydrate an [`OrderedMap`] from the hash of its root chunk.
    pub async fn load(hash: &Storage::Hash, storage: Storage) -> Result<Self, TesselMapError> {
        Self::load_with_config(hash, storage, ChunkingConfig::default()).await
    }

    /// Like [`OrderedMap::load`], for maps built with a non-default
    /// [`ChunkingConfig`]. Edits to the loaded map keep using `config`.
    pub async fn load_with_config(
        hash: &Storage::Hash,
        storage: Storage,
        config: ChunkingConfig,
    ) -> Result<Self, TesselMapError> {
        let root = Arc::new(Sequence::load(hash, &storage).await?);
        tracing::debug!(size = root.leaves(), hash = %hash.display(), "Loaded map");

        Ok(OrderedMap {
            storage,
            config,
            root,
        })
    }

    /// The hash of the root chunk
    pub fn hash(&self) -> &Storage::Hash {
        self.root.hash()
    }

    /// The root chunk
    pub fn root(&self) -> &Arc<Sequence<Key, Value, Storage::Hash>> {
        &self.root
    }

    /// The chunking parameters edits of this map use
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// The [`ContentAddressedStorage`] used by this map
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The number of entries in the map
    pub fn size(&self) -> u64 {
        self.root.leaves()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// A cursor on the first entry.
    pub async fn cursor(&self) -> Result<Cursor<Key, Value, Storage::Hash>, TesselMapError> {
        Cursor::seek(self.root.clone(), None, false, false, &self.storage).await
    }

    /// A cursor on the first entry whose key is not less than `key`.
    pub async fn cursor_at(
        &self,
        key: &Key,
    ) -> Result<Cursor<Key, Value, Storage::Hash>, TesselMapError> {
        Cursor::seek(self.root.clone(), Some(key), false, false, &self.storage).await
    }

    /// Whether `key` is in the map
    pub async fn has(&self, key: &Key) -> Result<bool, TesselMapError> {
        let cursor = self.cursor_at(key).await?;
        Ok(cursor.current().is_some_and(|entry| entry.key == *key))
    }

    /// The value stored against `key`, if any
    pub async fn get(&self, key: &Key) -> Result<Option<Value>, TesselMapError> {
        let cursor = self.cursor_at(key).await?;
        Ok(cursor
            .current()
            .filter(|entry| entry.key == *key)
            .map(|entry| entry.value.clone()))
    }

    /// The entry with the smallest key
    pub async fn first(&self) -> Result<Option<Entry<Key, Value>>, TesselMapError> {
        let cursor = self.cursor().await?;
        Ok(cursor.current().cloned())
    }

    /// The entry with the largest key
    pub async fn last(&self) -> Result<Option<Entry<Key, Value>>, TesselMapError> {
        let cursor = Cursor::seek(self.root.clone(), None, false, true, &self.storage).await?;
        Ok(cursor.current().cloned())
    }

    /// A map with `key` set to `value`. If the map already holds an equal
    /// value for `key`, the result shares this map's root.
    pub async fn set(&self, key: Key, value: Value) -> Result<Self, TesselMapError> {
        let cursor = Cursor::seek(self.root.clone(), Some(&key), true, false, &self.storage).await?;

        let remove = match cursor.current() {
            Some(entry) if entry.key == key && entry.value == value => return Ok(self.clone()),
            Some(entry) if entry.key == key => 1,
            _ => 0,
        };

        self.splice(cursor, vec![Entry::new(key, value)], remove)
            .await
    }

    /// A map without `key`. If `key` is absent, the result shares this map's
    /// root.
    pub async fn remove(&self, key: &Key) -> Result<Self, TesselMapError> {
        let cursor = self.cursor_at(key).await?;

        if !cursor.current().is_some_and(|entry| entry.key == *key) {
            return Ok(self.clone());
        }

        self.splice(cursor, Vec::new(), 1).await
    }

    async fn splice(
        &self,
        cursor: Cursor<Key, Value, Storage::Hash>,
        insert: Vec<Entry<Key, Value>>,
        remove: usize,
    ) -> Result<Self, TesselMapError> {
        let root = Chunker::splice(cursor, insert, remove, self.config, self.storage.clone()).await?;
        tracing::debug!(
            level = root.level(),
            size = root.leaves(),
            hash = %root.hash().display(),
            "Spliced map"
        );

        Ok(OrderedMap {
            storage: self.storage.clone(),
            config: self.config,
            root,
        })
    }

    /// Every entry in ascending key order. Chunks are loaded as the stream
    /// reaches them; calling this again starts over from the beginning.
    pub fn stream(
        &self,
    ) -> impl Stream<Item = Result<Entry<Key, Value>, TesselMapError>> + '_ {
        self.stream_cursor(None)
    }

    /// Every entry whose key is not less than `key`, in ascending key order.
    pub fn stream_from<'a>(
        &'a self,
        key: &'a Key,
    ) -> impl Stream<Item = Result<Entry<Key, Value>, TesselMapError>> + 'a {
        self.stream_cursor(Some(key))
    }

    fn stream_cursor<'a>(
        &'a self,
        key: Option<&'a Key>,
    ) -> impl Stream<Item = Result<Entry<Key, Value>, TesselMapError>> + 'a {
        try_stream! {
            let mut cursor = Cursor::seek(self.root.clone(), key, false, false, &self.storage).await?;

            while let Some(entry) = cursor.current().cloned() {
                yield entry;
                cursor.advance(&self.storage).await?;
            }
        }
    }

    /// Every entry, collected in ascending key order
    pub async fn entries(&self) -> Result<Vec<Entry<Key, Value>>, TesselMapError> {
        self.stream().try_collect().await
    }

    /// Call `callback` with the value and key of every entry, in ascending key
    /// order. The futures it returns run concurrently and are all awaited
    /// before this returns; the first failure is reported.
    pub async fn for_each<Callback, Output, Error>(
        &self,
        mut callback: Callback,
    ) -> Result<(), TesselMapError>
    where
        Callback: FnMut(Value, Key) -> Output,
        Output: Future<Output = Result<(), Error>>,
        Error: std::fmt::Display,
    {
        let mut cursor = self.cursor().await?;
        let mut pending = Vec::new();

        cursor
            .iter(&self.storage, |entry| {
                pending.push(callback(entry.value.clone(), entry.key.clone()));
                ControlFlow::Continue(())
            })
            .await?;

        try_join_all(pending)
            .await
            .map_err(|error| TesselMapError::Callback(format!("{error}")))?;
        Ok(())
    }

    /// The keys that were added, removed or modified on the way from `from`
    /// to this map. Subtrees the two maps share are skipped without being
    /// loaded.
    pub async fn diff(&self, from: &Self) -> Result<MapDiff<Key>, TesselMapError> {
        diff_sequences(
            from.root.clone(),
            self.root.clone(),
            &from.storage,
            &self.storage,
        )
        .await
    }

    /// The kinds of keys and values the map holds.
    pub async fn map_type(&self) -> Result<MapType, TesselMapError>
    where
        Key: Kinded,
        Value: Kinded,
    {
        let mut keys = BTreeSet::new();
        let mut values = BTreeSet::new();
        let mut cursor = self.cursor().await?;

        cursor
            .iter(&self.storage, |entry| {
                keys.insert(entry.key.kind());
                values.insert(entry.value.kind());
                ControlFlow::Continue(())
            })
            .await?;

        Ok(MapType { keys, values })
    }
}

impl<Key, Value, Storage> std::fmt::Debug for OrderedMap<Key, Value, Storage>
where
    Key: KeyType,
    Value: ValueType,
    Storage: ContentAddressedStorage,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedMap")
            .field("hash", &self.root.hash().display())
            .field("size", &self.root.leaves())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::OrderedMap;
    use crate::TesselMapError;
    use anyhow::Result;
    use tessel_storage::{Blake3Hash, CborEncoder, MemoryStorageBackend, Storage};

    #[cfg(target_arch = "wasm32")]
    use wasm_bindgen_test::wasm_bindgen_test;

    type TestStorage = Storage<CborEncoder, MemoryStorageBackend<Blake3Hash, Vec<u8>>>;

    fn make_storage() -> TestStorage {
        Storage {
            encoder: CborEncoder,
            backend: MemoryStorageBackend::default(),
        }
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_keeps_the_last_duplicate() -> Result<()> {
        let map = OrderedMap::from_entries(
            vec![(3u32, "x"), (1, "a"), (3, "y"), (2, "b"), (3, "z")]
                .into_iter()
                .map(|(key, value)| (key, value.to_string())),
            make_storage(),
        )
        .await?;

        assert_eq!(map.size(), 3);
        assert_eq!(map.get(&3).await?, Some("z".to_string()));
        Ok(())
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_fails_for_callbacks_that_fail() -> Result<()> {
        let map =
            OrderedMap::from_entries((0u32..10).map(|key| (key, key)), make_storage()).await?;

        let result = map
            .for_each(|value, _| async move {
                if value == 7 {
                    Err("seven")
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(TesselMapError::Callback(_))));
        Ok(())
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_is_empty_when_new() -> Result<()> {
        let map = OrderedMap::<u32, u32, _>::new(make_storage()).await?;

        assert!(map.is_empty());
        assert_eq!(map.first().await?, None);
        assert_eq!(map.last().await?, None);
        assert!(!map.has(&1).await?);
        assert!(map.entries().await?.is_empty());
        Ok(())
    }
}
