//! Visiting every chunk of a map.
//!
//! Enumerating the chunks reachable from a root is how callers find out
//! which chunks a map depends on (for replication or garbage collection) and
//! how tests observe structural sharing between versions of a map.
//!
//! # Example
//!
//! ```no_run
//! use tessel_map::{ChunkHashes, OrderedMap, TraversalOrder};
//! use tessel_storage::{Blake3Hash, CborEncoder, MemoryStorageBackend, Storage};
//!
//! # type TestMap = OrderedMap<u64, String,
//! #     Storage<CborEncoder, MemoryStorageBackend<Blake3Hash, Vec<u8>>>>;
//! # async fn example(map: &TestMap) -> Result<(), Box<dyn std::error::Error>> {
//! let hashes = map.traverse(TraversalOrder::DepthFirst).into_hash_set().await?;
//! println!("Map is stored in {} chunks", hashes.len());
//! # Ok(())
//! # }
//! ```

use std::{collections::HashSet, collections::VecDeque, future::Future, sync::Arc};

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::TryStreamExt;
use tessel_storage::{ContentAddressedStorage, HashType};

use crate::{KeyType, OrderedMap, Sequence, TesselMapError, ValueType};

/// Which chunk [`OrderedMap::traverse`] hands out next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// A chunk's whole subtree comes out before its next sibling, so leaves
    /// appear in key order
    #[default]
    DepthFirst,
    /// Level by level, starting at the root
    BreadthFirst,
}

impl TraversalOrder {
    fn next<T>(self, pending: &mut VecDeque<T>) -> Option<T> {
        match self {
            TraversalOrder::DepthFirst => pending.pop_back(),
            TraversalOrder::BreadthFirst => pending.pop_front(),
        }
    }

    /// `children` are in key order; depth-first pops from the back, so they
    /// are stacked in reverse
    fn schedule<T>(self, pending: &mut VecDeque<T>, children: Vec<T>) {
        match self {
            TraversalOrder::DepthFirst => pending.extend(children.into_iter().rev()),
            TraversalOrder::BreadthFirst => pending.extend(children),
        }
    }
}

impl<Key, Value, Storage> OrderedMap<Key, Value, Storage>
where
    Key: KeyType,
    Value: ValueType,
    Storage: ContentAddressedStorage,
{
    /// Every chunk reachable from the root, starting with the root. Chunks
    /// are loaded as the stream reaches them.
    pub fn traverse(
        &self,
        order: TraversalOrder,
    ) -> impl Stream<Item = Result<Arc<Sequence<Key, Value, Storage::Hash>>, TesselMapError>> + '_
    {
        let root = self.root().clone();
        let storage = self.storage();

        try_stream! {
            let mut pending = VecDeque::from([root]);

            while let Some(sequence) = order.next(&mut pending) {
                if let Sequence::Meta(meta) = sequence.as_ref() {
                    let mut children = Vec::with_capacity(meta.tuples().len());
                    for tuple in meta.tuples() {
                        children.push(tuple.resolve(storage).await?);
                    }
                    order.schedule(&mut pending, children);
                }
                yield sequence;
            }
        }
    }
}

/// Extension methods for streams of chunks, such as the one returned by
/// [`OrderedMap::traverse`].
pub trait ChunkHashes<Key, Value, Hash>:
    Stream<Item = Result<Arc<Sequence<Key, Value, Hash>>, TesselMapError>>
where
    Hash: HashType,
{
    /// Collect the hash of every chunk into a set.
    fn into_hash_set(self) -> impl Future<Output = Result<HashSet<Hash>, TesselMapError>>;

    /// Collect the hashes of the leaf chunks, in the order they are visited.
    fn into_leaf_hashes(self) -> impl Future<Output = Result<Vec<Hash>, TesselMapError>>;
}

impl<Key, Value, Hash, S> ChunkHashes<Key, Value, Hash> for S
where
    Key: KeyType,
    Value: ValueType,
    Hash: HashType,
    S: Stream<Item = Result<Arc<Sequence<Key, Value, Hash>>, TesselMapError>>,
{
    fn into_hash_set(self) -> impl Future<Output = Result<HashSet<Hash>, TesselMapError>> {
        self.map_ok(|sequence| sequence.hash().clone()).try_collect()
    }

    fn into_leaf_hashes(self) -> impl Future<Output = Result<Vec<Hash>, TesselMapError>> {
        self.try_filter_map(|sequence| async move {
            Ok(sequence.is_leaf().then(|| sequence.hash().clone()))
        })
        .try_collect()
    }
}
