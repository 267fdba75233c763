use std::sync::{Arc, OnceLock};

use nonempty::NonEmpty;
use tessel_storage::{ContentAddressedStorage, HashType};

use crate::{Block, Entry, KeyType, Reference, TesselMapError, ValueType, content_digest};

/// An index entry of a [`MetaSequence`]: a [`Reference`] to a child chunk
/// and, once it has been loaded or built, the child itself.
#[derive(Clone, Debug)]
pub struct MetaTuple<Key, Value, Hash> {
    reference: Reference<Key, Hash>,
    child: OnceLock<Arc<Sequence<Key, Value, Hash>>>,
}

impl<Key, Value, Hash> MetaTuple<Key, Value, Hash>
where
    Key: KeyType,
    Value: ValueType,
    Hash: HashType,
{
    /// A tuple whose child will be loaded from storage on first use.
    pub fn new(reference: Reference<Key, Hash>) -> Self {
        MetaTuple {
            reference,
            child: OnceLock::new(),
        }
    }

    /// A tuple referencing a child that is already in memory.
    pub fn for_child(child: Arc<Sequence<Key, Value, Hash>>) -> Result<Self, TesselMapError> {
        let upper_bound = child.last_key().cloned().ok_or_else(|| {
            TesselMapError::UnexpectedTreeShape("Cannot reference an empty sequence".into())
        })?;
        let reference = Reference::new(upper_bound, child.leaves(), child.hash().clone());

        Ok(MetaTuple {
            reference,
            child: OnceLock::from(child),
        })
    }

    /// The serializable part of this tuple
    pub fn reference(&self) -> &Reference<Key, Hash> {
        &self.reference
    }

    /// The greatest key reachable through this tuple
    pub fn key(&self) -> &Key {
        self.reference.upper_bound()
    }

    /// The number of entries reachable through this tuple
    pub fn count(&self) -> u64 {
        self.reference.count()
    }

    /// The hash of the child chunk
    pub fn hash(&self) -> &Hash {
        self.reference.hash()
    }

    /// The child, if it is already resident in memory
    pub fn cached(&self) -> Option<&Arc<Sequence<Key, Value, Hash>>> {
        self.child.get()
    }

    /// The child chunk, loading it from `storage` if it has not been loaded
    /// through this tuple before.
    pub async fn resolve<Storage>(
        &self,
        storage: &Storage,
    ) -> Result<Arc<Sequence<Key, Value, Hash>>, TesselMapError>
    where
        Storage: ContentAddressedStorage<Hash = Hash>,
    {
        if let Some(child) = self.child.get() {
            return Ok(child.clone());
        }

        let child = Arc::new(Sequence::load(self.hash(), storage).await?);
        Ok(self.child.get_or_init(|| child).clone())
    }
}

/// One item of a [`Sequence`], as it is fed to the [`Chunker`].
///
/// [`Chunker`]: crate::Chunker
#[derive(Clone, Debug)]
pub enum SequenceItem<Key, Value, Hash> {
    /// An entry of a leaf sequence
    Entry(Entry<Key, Value>),
    /// A tuple of a meta sequence
    Tuple(MetaTuple<Key, Value, Hash>),
}

impl<Key, Value, Hash> SequenceItem<Key, Value, Hash>
where
    Key: KeyType,
    Value: ValueType,
    Hash: HashType,
{
    /// The key this item is ordered by
    pub fn key(&self) -> &Key {
        match self {
            SequenceItem::Entry(entry) => &entry.key,
            SequenceItem::Tuple(tuple) => tuple.key(),
        }
    }

    /// The bytes this item contributes to its level's rolling hash: the
    /// digest of the key for entries, the child hash for tuples.
    pub fn boundary_bytes(&self) -> Result<Vec<u8>, TesselMapError> {
        Ok(match self {
            SequenceItem::Entry(entry) => content_digest(&entry.key)?.to_vec(),
            SequenceItem::Tuple(tuple) => tuple.hash().as_ref().to_vec(),
        })
    }
}

/// A chunk holding a run of entries.
#[derive(Debug)]
pub struct LeafSequence<Key, Value, Hash> {
    entries: Vec<Entry<Key, Value>>,
    hash: Hash,
}

impl<Key, Value, Hash> LeafSequence<Key, Value, Hash>
where
    Key: KeyType,
    Hash: HashType,
{
    /// The entries, in ascending key order
    pub fn entries(&self) -> &[Entry<Key, Value>] {
        &self.entries
    }

    /// The key at `index`
    pub fn key(&self, index: usize) -> Option<&Key> {
        self.entries.get(index).map(|entry| &entry.key)
    }

    /// The hash of this chunk
    pub fn hash(&self) -> &Hash {
        &self.hash
    }
}

/// A chunk holding a run of [`MetaTuple`]s: one slice of a level of the
/// index above the leaves.
#[derive(Debug)]
pub struct MetaSequence<Key, Value, Hash> {
    level: u32,
    tuples: Vec<MetaTuple<Key, Value, Hash>>,
    leaves: u64,
    hash: Hash,
}

impl<Key, Value, Hash> MetaSequence<Key, Value, Hash>
where
    Key: KeyType,
    Value: ValueType,
    Hash: HashType,
{
    /// Height above the leaves
    pub fn level(&self) -> u32 {
        self.level
    }

    /// The tuples, in ascending key order
    pub fn tuples(&self) -> &[MetaTuple<Key, Value, Hash>] {
        &self.tuples
    }

    /// The index key of the tuple at `index`
    pub fn key(&self, index: usize) -> Option<&Key> {
        self.tuples.get(index).map(|tuple| tuple.key())
    }

    /// The hash of this chunk
    pub fn hash(&self) -> &Hash {
        &self.hash
    }
}

/// A chunk of an [`OrderedMap`] tree.
///
/// [`OrderedMap`]: crate::OrderedMap
#[derive(Debug)]
pub enum Sequence<Key, Value, Hash> {
    /// A leaf chunk
    Leaf(LeafSequence<Key, Value, Hash>),
    /// A meta chunk
    Meta(MetaSequence<Key, Value, Hash>),
}

impl<Key, Value, Hash> Sequence<Key, Value, Hash>
where
    Key: KeyType,
    Value: ValueType,
    Hash: HashType,
{
    /// Load and decode the chunk named by `hash`.
    pub async fn load<Storage>(hash: &Hash, storage: &Storage) -> Result<Self, TesselMapError>
    where
        Storage: ContentAddressedStorage<Hash = Hash>,
    {
        let block = storage
            .read::<Block<Key, Value, Hash>>(hash)
            .await
            .map_err(|error| TesselMapError::Storage(error.into()))?
            .ok_or_else(|| TesselMapError::MissingChunk(hash.display()))?;

        Ok(Self::from_block(block, hash.clone()))
    }

    /// Wrap a decoded [`Block`] that is known to hash to `hash`.
    pub fn from_block(block: Block<Key, Value, Hash>, hash: Hash) -> Self {
        match block {
            Block::Leaf(entries) => Sequence::Leaf(LeafSequence { entries, hash }),
            Block::Meta { level, references } => {
                let tuples: Vec<_> = Vec::from(references)
                    .into_iter()
                    .map(MetaTuple::new)
                    .collect();
                let leaves = tuples.iter().map(|tuple| tuple.count()).sum();
                Sequence::Meta(MetaSequence {
                    level,
                    tuples,
                    leaves,
                    hash,
                })
            }
        }
    }

    /// Write `items` to `storage` as a chunk at `level` (0 for leaves) and
    /// return the resulting sequence. Tuples keep their cached children.
    pub async fn build<Storage>(
        level: usize,
        items: Vec<SequenceItem<Key, Value, Hash>>,
        storage: &mut Storage,
    ) -> Result<Arc<Self>, TesselMapError>
    where
        Storage: ContentAddressedStorage<Hash = Hash>,
    {
        if level == 0 {
            let entries = items
                .into_iter()
                .map(|item| match item {
                    SequenceItem::Entry(entry) => Ok(entry),
                    SequenceItem::Tuple(_) => Err(TesselMapError::UnexpectedTreeShape(
                        "Found a meta tuple at the leaf level".into(),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let block = Block::<Key, Value, Hash>::Leaf(entries);
            let hash = storage
                .write(&block)
                .await
                .map_err(|error| TesselMapError::Storage(error.into()))?;

            return Ok(Arc::new(Self::from_block(block, hash)));
        }

        let tuples = items
            .into_iter()
            .map(|item| match item {
                SequenceItem::Tuple(tuple) => Ok(tuple),
                SequenceItem::Entry(_) => Err(TesselMapError::UnexpectedTreeShape(format!(
                    "Found an entry at meta level {level}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let references = NonEmpty::from_vec(
            tuples
                .iter()
                .map(|tuple| tuple.reference().clone())
                .collect(),
        )
        .ok_or_else(|| {
            TesselMapError::UnexpectedTreeShape(format!("Meta level {level} has no children"))
        })?;
        let level = level as u32;
        let hash = storage
            .write(&Block::<Key, Value, Hash>::Meta { level, references })
            .await
            .map_err(|error| TesselMapError::Storage(error.into()))?;
        let leaves = tuples.iter().map(|tuple| tuple.count()).sum();

        Ok(Arc::new(Sequence::Meta(MetaSequence {
            level,
            tuples,
            leaves,
            hash,
        })))
    }

    /// The hash of this chunk
    pub fn hash(&self) -> &Hash {
        match self {
            Sequence::Leaf(leaf) => leaf.hash(),
            Sequence::Meta(meta) => meta.hash(),
        }
    }

    /// Height above the leaves
    pub fn level(&self) -> u32 {
        match self {
            Sequence::Leaf(_) => 0,
            Sequence::Meta(meta) => meta.level(),
        }
    }

    /// Whether this is a leaf chunk
    pub fn is_leaf(&self) -> bool {
        matches!(self, Sequence::Leaf(_))
    }

    /// Whether this is a meta chunk
    pub fn is_meta(&self) -> bool {
        matches!(self, Sequence::Meta(_))
    }

    /// The number of items held directly by this chunk
    pub fn len(&self) -> usize {
        match self {
            Sequence::Leaf(leaf) => leaf.entries.len(),
            Sequence::Meta(meta) => meta.tuples.len(),
        }
    }

    /// Whether this chunk holds no items; only the root of an empty map does
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of entries reachable from this chunk
    pub fn leaves(&self) -> u64 {
        match self {
            Sequence::Leaf(leaf) => leaf.entries.len() as u64,
            Sequence::Meta(meta) => meta.leaves,
        }
    }

    /// The key (or index key) of the item at `index`
    pub fn key(&self, index: usize) -> Option<&Key> {
        match self {
            Sequence::Leaf(leaf) => leaf.key(index),
            Sequence::Meta(meta) => meta.key(index),
        }
    }

    /// The greatest key reachable from this chunk
    pub fn last_key(&self) -> Option<&Key> {
        self.len().checked_sub(1).and_then(|index| self.key(index))
    }

    /// A copy of the item at `index`
    pub fn item(&self, index: usize) -> Option<SequenceItem<Key, Value, Hash>> {
        match self {
            Sequence::Leaf(leaf) => leaf.entries.get(index).cloned().map(SequenceItem::Entry),
            Sequence::Meta(meta) => meta.tuples.get(index).cloned().map(SequenceItem::Tuple),
        }
    }

    /// The tuple at `index` of a meta chunk
    pub fn tuple(&self, index: usize) -> Result<&MetaTuple<Key, Value, Hash>, TesselMapError> {
        match self {
            Sequence::Meta(meta) => meta.tuples.get(index).ok_or_else(|| {
                TesselMapError::UnexpectedTreeShape(format!(
                    "No tuple at index {index} of a meta chunk with {} tuples",
                    meta.tuples.len()
                ))
            }),
            Sequence::Leaf(_) => Err(TesselMapError::UnexpectedTreeShape(
                "Cannot descend below a leaf chunk".into(),
            )),
        }
    }

    /// The index of the first item whose key is not less than `key`, or
    /// `len()` if there is none
    pub fn search(&self, key: &Key) -> usize {
        match self {
            Sequence::Leaf(leaf) => leaf.entries.partition_point(|entry| entry.key < *key),
            Sequence::Meta(meta) => meta.tuples.partition_point(|tuple| tuple.key() < key),
        }
    }

    /// The hashes of the chunks this chunk references directly. Leaves
    /// embed no references.
    pub fn chunks(&self) -> Vec<Hash> {
        match self {
            Sequence::Leaf(_) => Vec::new(),
            Sequence::Meta(meta) => meta.tuples.iter().map(|tuple| tuple.hash().clone()).collect(),
        }
    }
}
