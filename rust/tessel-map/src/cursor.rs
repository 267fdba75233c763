use std::{ops::ControlFlow, sync::Arc};

use tessel_storage::{ContentAddressedStorage, HashType};

use crate::{Entry, KeyType, Sequence, SequenceItem, TesselMapError, ValueType};

/// Trees deeper than this are treated as corrupt
pub const MAXIMUM_TREE_DEPTH: usize = 32;

#[derive(Clone, Debug)]
struct Frame<Key, Value, Hash> {
    sequence: Arc<Sequence<Key, Value, Hash>>,
    index: usize,
}

/// A path from the root of a tree down to one position in it. The first
/// frame is the root and the last frame is the level the cursor moves
/// along (usually the leaves).
///
/// A cursor is valid while its position holds an item; advancing past the
/// last item leaves it invalid.
#[derive(Clone, Debug)]
pub struct Cursor<Key, Value, Hash> {
    frames: Vec<Frame<Key, Value, Hash>>,
}

impl<Key, Value, Hash> Cursor<Key, Value, Hash>
where
    Key: KeyType,
    Value: ValueType,
    Hash: HashType,
{
    /// Descend from `root` towards `key`, loading chunks as needed.
    ///
    /// At every level the cursor settles on the first item whose key is not
    /// less than `key`. If there is no such item in a meta chunk the descent
    /// stops there (and the cursor is invalid) unless `for_insertion` is
    /// set, in which case it follows the last tuple so that it ends up just
    /// past the final entry. Without a key the cursor settles on the first
    /// item, or the last one when `last` is set.
    pub async fn seek<Storage>(
        root: Arc<Sequence<Key, Value, Hash>>,
        key: Option<&Key>,
        for_insertion: bool,
        last: bool,
        storage: &Storage,
    ) -> Result<Self, TesselMapError>
    where
        Storage: ContentAddressedStorage<Hash = Hash>,
    {
        let mut frames = Vec::new();
        let mut sequence = root;

        loop {
            if frames.len() >= MAXIMUM_TREE_DEPTH {
                return Err(TesselMapError::UnexpectedTreeShape(format!(
                    "Tree is deeper than {MAXIMUM_TREE_DEPTH} levels"
                )));
            }

            let length = sequence.len();
            let index = match key {
                Some(key) => {
                    let index = sequence.search(key);
                    if index == length && for_insertion && sequence.is_meta() {
                        length - 1
                    } else {
                        index
                    }
                }
                None if last => length.saturating_sub(1),
                None => 0,
            };

            let child = if index < length && sequence.is_meta() {
                Some(sequence.tuple(index)?.resolve(storage).await?)
            } else {
                None
            };

            frames.push(Frame { sequence, index });

            match child {
                Some(child) => sequence = child,
                None => break,
            }
        }

        Ok(Cursor { frames })
    }

    /// Whether the cursor points at an item
    pub fn valid(&self) -> bool {
        self.frames
            .last()
            .map(|frame| frame.index < frame.sequence.len())
            .unwrap_or(false)
    }

    /// Whether the cursor moves along the leaves
    pub fn is_leaf_level(&self) -> bool {
        self.frames
            .last()
            .map(|frame| frame.sequence.is_leaf())
            .unwrap_or(false)
    }

    /// The number of levels from the root down to the cursor's own level
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The chunk the cursor is currently inside
    pub fn sequence(&self) -> Option<&Arc<Sequence<Key, Value, Hash>>> {
        self.frames.last().map(|frame| &frame.sequence)
    }

    /// The position within the current chunk
    pub fn index_in_chunk(&self) -> usize {
        self.frames.last().map(|frame| frame.index).unwrap_or(0)
    }

    /// Whether the cursor is on the final item of its chunk
    pub fn at_last_item(&self) -> bool {
        self.frames
            .last()
            .map(|frame| frame.index + 1 == frame.sequence.len())
            .unwrap_or(false)
    }

    /// The entry under the cursor, if it moves along the leaves
    pub fn current(&self) -> Option<&Entry<Key, Value>> {
        let frame = self.frames.last()?;
        match frame.sequence.as_ref() {
            Sequence::Leaf(leaf) => leaf.entries().get(frame.index),
            Sequence::Meta(_) => None,
        }
    }

    /// The key (or index key) under the cursor
    pub fn current_key(&self) -> Option<&Key> {
        let frame = self.frames.last()?;
        frame.sequence.key(frame.index)
    }

    /// A copy of the item under the cursor
    pub fn current_item(&self) -> Option<SequenceItem<Key, Value, Hash>> {
        let frame = self.frames.last()?;
        frame.sequence.item(frame.index)
    }

    /// The largest key that precedes the chunk the cursor is in, taken from
    /// the nearest ancestor that is not on its first tuple.
    pub fn key_before_chunk(&self) -> Option<&Key> {
        let (_, ancestors) = self.frames.split_last()?;
        let frame = ancestors.iter().rev().find(|frame| frame.index > 0)?;
        frame.sequence.key(frame.index - 1)
    }

    /// The same path cut off `height` levels above the cursor's own level.
    pub fn ancestor(&self, height: usize) -> Option<Self> {
        let depth = self.frames.len().checked_sub(height)?;
        if depth == 0 {
            return None;
        }
        Some(Cursor {
            frames: self.frames[..depth].to_vec(),
        })
    }

    /// Step forward by one item, crossing into the next chunk when the
    /// current one is exhausted. Returns false (leaving the cursor just past
    /// the last item) when there is nothing left.
    pub async fn advance<Storage>(&mut self, storage: &Storage) -> Result<bool, TesselMapError>
    where
        Storage: ContentAddressedStorage<Hash = Hash>,
    {
        let Some(depth) = self.frames.len().checked_sub(1) else {
            return Ok(false);
        };

        let frame = &mut self.frames[depth];
        let length = frame.sequence.len();

        if frame.index + 1 < length {
            frame.index += 1;
            return Ok(true);
        }

        if frame.index >= length {
            return Ok(false);
        }

        for ancestor in (0..depth).rev() {
            let frame = &mut self.frames[ancestor];
            if frame.index + 1 < frame.sequence.len() {
                frame.index += 1;
                self.sync(ancestor + 1, storage).await?;
                return Ok(true);
            }
        }

        self.frames[depth].index = length;
        Ok(false)
    }

    /// Call `callback` with every entry from the current one onwards, until
    /// it breaks or the entries run out.
    pub async fn iter<Storage, Callback>(
        &mut self,
        storage: &Storage,
        mut callback: Callback,
    ) -> Result<(), TesselMapError>
    where
        Storage: ContentAddressedStorage<Hash = Hash>,
        Callback: FnMut(&Entry<Key, Value>) -> ControlFlow<()>,
    {
        while let Some(entry) = self.current() {
            if callback(entry).is_break() {
                break;
            }
            self.advance(storage).await?;
        }
        Ok(())
    }

    async fn sync<Storage>(&mut self, from: usize, storage: &Storage) -> Result<(), TesselMapError>
    where
        Storage: ContentAddressedStorage<Hash = Hash>,
    {
        for depth in from..self.frames.len() {
            let child = {
                let parent = &self.frames[depth - 1];
                parent.sequence.tuple(parent.index)?.resolve(storage).await?
            };
            self.frames[depth] = Frame {
                sequence: child,
                index: 0,
            };
        }
        Ok(())
    }
}
