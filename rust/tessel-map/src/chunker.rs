use std::sync::Arc;

use tessel_storage::{ContentAddressedStorage, HashType};

use crate::{
    BoundaryChecker, ChunkingConfig, Cursor, Entry, KeyType, MAXIMUM_TREE_DEPTH, MetaTuple,
    Sequence, SequenceItem, TesselMapError, ValueType,
};

struct Level<Key, Value, Hash> {
    /// Where the original items of this level continue; `None` once they
    /// have been consumed, or for levels that did not exist before
    cursor: Option<Cursor<Key, Value, Hash>>,
    /// Items of the chunk under construction
    current: Vec<SequenceItem<Key, Value, Hash>>,
    checker: BoundaryChecker,
}

/// Rebuilds the part of a tree around an edit.
///
/// A [`Chunker`] holds one level of state per tree level, leaves first. Items
/// are appended at the leaf level; every boundary turns the pending items
/// into a chunk and appends a [`MetaTuple`] for it to the level above. When
/// an edit is finished the remainder of the original tree is re-fed until
/// the new boundaries line up with the old ones, after which the original
/// chunks are reused as they are.
pub struct Chunker<Key, Value, Storage>
where
    Storage: ContentAddressedStorage,
{
    levels: Vec<Level<Key, Value, Storage::Hash>>,
    last_key: Option<Key>,
    config: ChunkingConfig,
    storage: Storage,
}

impl<Key, Value, Storage> Chunker<Key, Value, Storage>
where
    Key: KeyType,
    Value: ValueType,
    Storage: ContentAddressedStorage,
{
    /// Start chunking at `cursor`, or from scratch when there is none. The
    /// items that precede the cursor in its chunk (at every level) are
    /// re-fed so that boundary state matches the original tree.
    pub async fn new(
        cursor: Option<Cursor<Key, Value, Storage::Hash>>,
        config: ChunkingConfig,
        storage: Storage,
    ) -> Result<Self, TesselMapError> {
        let mut chunker = Chunker {
            levels: Vec::new(),
            last_key: None,
            config,
            storage,
        };

        let Some(cursor) = cursor else {
            chunker.push_level(None);
            return Ok(chunker);
        };

        // Inserts at the start of a chunk still have to follow the chunk before
        if cursor.is_leaf_level() {
            chunker.last_key = cursor.key_before_chunk().cloned();
        }

        let height = cursor.depth();
        for level in 0..height {
            chunker.push_level(cursor.ancestor(level));
        }
        for level in (0..height).rev() {
            chunker.resume(level).await?;
        }

        Ok(chunker)
    }

    /// Build a tree holding `entries`, which must be sorted by key without
    /// duplicates.
    pub async fn build(
        entries: Vec<Entry<Key, Value>>,
        config: ChunkingConfig,
        storage: Storage,
    ) -> Result<Arc<Sequence<Key, Value, Storage::Hash>>, TesselMapError> {
        let mut chunker = Chunker::new(None, config, storage).await?;
        for entry in entries {
            chunker.append(SequenceItem::Entry(entry)).await?;
        }
        chunker.done().await
    }

    /// Remove `remove` entries at `cursor`, insert `insert` in their place
    /// and return the new root.
    pub async fn splice(
        cursor: Cursor<Key, Value, Storage::Hash>,
        insert: Vec<Entry<Key, Value>>,
        remove: usize,
        config: ChunkingConfig,
        storage: Storage,
    ) -> Result<Arc<Sequence<Key, Value, Storage::Hash>>, TesselMapError> {
        if !cursor.is_leaf_level() {
            return Err(TesselMapError::Precondition(
                "Splicing requires a cursor positioned among the leaves".into(),
            ));
        }

        let mut chunker = Chunker::new(Some(cursor), config, storage).await?;
        for _ in 0..remove {
            chunker.skip().await?;
        }
        for entry in insert {
            chunker.append(SequenceItem::Entry(entry)).await?;
        }
        chunker.done().await
    }

    /// Append an item at the leaf level. Returns whether it ended a chunk.
    pub async fn append(
        &mut self,
        item: SequenceItem<Key, Value, Storage::Hash>,
    ) -> Result<bool, TesselMapError> {
        self.append_at(0, item).await
    }

    /// Drop the original entry under the leaf cursor.
    pub async fn skip(&mut self) -> Result<(), TesselMapError> {
        match &self.levels[0].cursor {
            Some(cursor) if cursor.valid() => self.skip_at(0).await,
            _ => Err(TesselMapError::Precondition(
                "Cannot remove more entries than follow the edit point".into(),
            )),
        }
    }

    /// Finish every level and return the root of the new tree.
    pub async fn done(mut self) -> Result<Arc<Sequence<Key, Value, Storage::Hash>>, TesselMapError> {
        let mut level = 0;

        loop {
            self.finalize_cursor(level).await?;

            if level + 1 < self.levels.len() && self.has_pending(level + 1) {
                if !self.levels[level].current.is_empty() {
                    let tuple = self.make_chunk(level).await?;
                    self.append_at(level + 1, SequenceItem::Tuple(tuple)).await?;
                }
                level += 1;
                continue;
            }

            return self.make_root(level).await;
        }
    }

    fn push_level(&mut self, cursor: Option<Cursor<Key, Value, Storage::Hash>>) {
        let checker = BoundaryChecker::new(self.config.boundary(self.levels.len()));
        self.levels.push(Level {
            cursor,
            current: Vec::new(),
            checker,
        });
    }

    fn has_pending(&self, from: usize) -> bool {
        self.levels[from..]
            .iter()
            .any(|level| !level.current.is_empty())
    }

    async fn resume(&mut self, level: usize) -> Result<(), TesselMapError> {
        let prefix = match &self.levels[level].cursor {
            Some(cursor) => match cursor.sequence() {
                Some(sequence) => {
                    let end = cursor.index_in_chunk().min(sequence.len());
                    (0..end)
                        .filter_map(|index| sequence.item(index))
                        .collect::<Vec<_>>()
                }
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        for item in prefix {
            self.append_at(level, item).await?;
        }
        Ok(())
    }

    async fn append_at(
        &mut self,
        level: usize,
        item: SequenceItem<Key, Value, Storage::Hash>,
    ) -> Result<bool, TesselMapError> {
        if level == 0 {
            if let Some(last_key) = &self.last_key {
                if last_key >= item.key() {
                    return Err(TesselMapError::Precondition(format!(
                        "Entries out of order: {:?} follows {:?}",
                        item.key(),
                        last_key
                    )));
                }
            }
            self.last_key = Some(item.key().clone());
        }

        let ended_chunk = self.push_item(level, item)?;

        if ended_chunk {
            let mut level = level;
            loop {
                let tuple = self.make_chunk(level).await?;
                level += 1;
                if !self.push_item(level, SequenceItem::Tuple(tuple))? {
                    break;
                }
            }
        }

        Ok(ended_chunk)
    }

    fn push_item(
        &mut self,
        level: usize,
        item: SequenceItem<Key, Value, Storage::Hash>,
    ) -> Result<bool, TesselMapError> {
        let bytes = item.boundary_bytes()?;
        let state = &mut self.levels[level];
        state.current.push(item);
        Ok(state.checker.write(&bytes))
    }

    /// Turn the pending items of `level` into a chunk, making sure there is
    /// a level above to receive its tuple.
    async fn make_chunk(
        &mut self,
        level: usize,
    ) -> Result<MetaTuple<Key, Value, Storage::Hash>, TesselMapError> {
        let state = &mut self.levels[level];
        state.checker.reset();
        let items = std::mem::take(&mut state.current);

        let sequence = Sequence::build(level, items, &mut self.storage).await?;
        tracing::trace!(
            level,
            items = sequence.len(),
            hash = %sequence.hash().display(),
            "Emitted chunk"
        );

        if self.levels.len() == level + 1 {
            if self.levels.len() >= MAXIMUM_TREE_DEPTH {
                return Err(TesselMapError::UnexpectedTreeShape(format!(
                    "Tree grew deeper than {MAXIMUM_TREE_DEPTH} levels"
                )));
            }
            self.push_level(None);
        }

        MetaTuple::for_child(sequence)
    }

    /// Move past the original item under the cursor of `level`. Moving into
    /// a new chunk means the chunk's tuple above has been consumed too.
    async fn skip_at(&mut self, level: usize) -> Result<(), TesselMapError> {
        let mut level = level;

        while level < self.levels.len() {
            let Some(cursor) = self.levels[level].cursor.as_mut() else {
                break;
            };
            if !(cursor.advance(&self.storage).await? && cursor.index_in_chunk() == 0) {
                break;
            }
            level += 1;
        }
        Ok(())
    }

    async fn skip_parent(&mut self, level: usize) -> Result<(), TesselMapError> {
        if level + 1 < self.levels.len() {
            self.skip_at(level + 1).await?;
        }
        Ok(())
    }

    /// Re-feed the original items after the cursor of `level` until a
    /// boundary lines up with the end of an original chunk.
    async fn finalize_cursor(&mut self, level: usize) -> Result<(), TesselMapError> {
        let Some(mut cursor) = self.levels[level].cursor.take() else {
            return Ok(());
        };

        if !cursor.valid() {
            return self.skip_parent(level).await;
        }

        let mut entered_chunk = true;
        loop {
            if entered_chunk {
                self.skip_parent(level).await?;
            }

            let item = cursor.current_item().ok_or_else(|| {
                TesselMapError::UnexpectedTreeShape("Cursor lost its position".into())
            })?;
            let boundary = self.append_at(level, item).await?;

            if boundary && cursor.at_last_item() {
                break;
            }
            if !cursor.advance(&self.storage).await? {
                break;
            }
            entered_chunk = cursor.index_in_chunk() == 0;
        }
        Ok(())
    }

    async fn make_root(
        &mut self,
        level: usize,
    ) -> Result<Arc<Sequence<Key, Value, Storage::Hash>>, TesselMapError> {
        let items = std::mem::take(&mut self.levels[level].current);

        if level == 0 || items.len() > 1 {
            return Sequence::build(level, items, &mut self.storage).await;
        }

        let Some(SequenceItem::Tuple(tuple)) = items.into_iter().next() else {
            return Err(TesselMapError::UnexpectedTreeShape(format!(
                "Level {level} finished without any chunks"
            )));
        };

        // A lone tuple is not a canonical root; use the first chunk below it
        // that holds more than one item.
        let mut root = tuple.resolve(&self.storage).await?;
        loop {
            let next = match root.as_ref() {
                Sequence::Meta(meta) if meta.tuples().len() == 1 => {
                    meta.tuples()[0].resolve(&self.storage).await?
                }
                _ => return Ok(root),
            };
            root = next;
        }
    }
}
