use std::{cmp::Ordering, sync::Arc};

use tessel_storage::{ContentAddressedStorage, HashType};

use crate::{Entry, KeyType, MetaTuple, Sequence, TesselMapError, ValueType};

/// The keys that differ between two maps, each list in ascending order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapDiff<Key> {
    /// Keys only present in the newer map
    pub added: Vec<Key>,
    /// Keys only present in the older map
    pub removed: Vec<Key>,
    /// Keys present in both maps with different values
    pub modified: Vec<Key>,
}

impl<Key> Default for MapDiff<Key> {
    fn default() -> Self {
        MapDiff {
            added: Vec::new(),
            removed: Vec::new(),
            modified: Vec::new(),
        }
    }
}

impl<Key> MapDiff<Key> {
    /// Whether the two maps hold the same entries
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

enum Pending<Key, Value, Hash> {
    Chunk {
        tuple: MetaTuple<Key, Value, Hash>,
        level: u32,
    },
    Entry(Entry<Key, Value>),
}

/// The not yet visited part of one tree, as a stack whose top holds the
/// smallest keys. Chunks stay unloaded until they have to be compared entry
/// by entry.
struct Frontier<'a, Key, Value, Storage>
where
    Storage: ContentAddressedStorage,
{
    pending: Vec<Pending<Key, Value, Storage::Hash>>,
    storage: &'a Storage,
}

impl<'a, Key, Value, Storage> Frontier<'a, Key, Value, Storage>
where
    Key: KeyType,
    Value: ValueType,
    Storage: ContentAddressedStorage,
{
    fn new(root: &Sequence<Key, Value, Storage::Hash>, storage: &'a Storage) -> Self {
        let mut frontier = Frontier {
            pending: Vec::new(),
            storage,
        };
        frontier.push(root);
        frontier
    }

    fn push(&mut self, sequence: &Sequence<Key, Value, Storage::Hash>) {
        match sequence {
            Sequence::Leaf(leaf) => {
                for entry in leaf.entries().iter().rev() {
                    self.pending.push(Pending::Entry(entry.clone()));
                }
            }
            Sequence::Meta(meta) => {
                let level = meta.level().saturating_sub(1);
                for tuple in meta.tuples().iter().rev() {
                    self.pending.push(Pending::Chunk {
                        tuple: tuple.clone(),
                        level,
                    });
                }
            }
        }
    }

    fn peek(&self) -> Option<&Pending<Key, Value, Storage::Hash>> {
        self.pending.last()
    }

    fn pop(&mut self) -> Option<Pending<Key, Value, Storage::Hash>> {
        self.pending.pop()
    }

    fn pop_key(&mut self) -> Option<Key> {
        match self.pending.pop() {
            Some(Pending::Entry(entry)) => Some(entry.key),
            _ => None,
        }
    }

    async fn expand(&mut self) -> Result<(), TesselMapError> {
        if let Some(Pending::Chunk { tuple, .. }) = self.pending.pop() {
            let child = tuple.resolve(self.storage).await?;
            self.push(&child);
        }
        Ok(())
    }
}

enum Step {
    Skip,
    ExpandBefore,
    ExpandAfter,
    ExpandBoth,
    Removed,
    Added,
    Modified,
}

/// Compare two trees, reporting the keys that were added, removed and
/// modified on the way from `from` to `to`.
///
/// Both trees are walked in key order at the granularity of chunks. Whenever
/// the next chunk on both sides has the same hash it is skipped as a whole;
/// only chunks that differ are loaded (taller chunks are opened first so
/// that both sides descend to the same height).
pub async fn diff_sequences<Key, Value, Before, After>(
    from: Arc<Sequence<Key, Value, Before::Hash>>,
    to: Arc<Sequence<Key, Value, After::Hash>>,
    from_storage: &Before,
    to_storage: &After,
) -> Result<MapDiff<Key>, TesselMapError>
where
    Key: KeyType,
    Value: ValueType,
    Before: ContentAddressedStorage,
    After: ContentAddressedStorage<Hash = Before::Hash>,
{
    let mut diff = MapDiff::default();

    if from.hash() == to.hash() {
        return Ok(diff);
    }

    let mut before = Frontier::new(&from, from_storage);
    let mut after = Frontier::new(&to, to_storage);

    loop {
        let step = match (before.peek(), after.peek()) {
            (None, None) => break,
            (Some(Pending::Chunk { .. }), None) => Step::ExpandBefore,
            (Some(Pending::Entry(_)), None) => Step::Removed,
            (None, Some(Pending::Chunk { .. })) => Step::ExpandAfter,
            (None, Some(Pending::Entry(_))) => Step::Added,
            (
                Some(Pending::Chunk {
                    tuple: left,
                    level: left_level,
                }),
                Some(Pending::Chunk {
                    tuple: right,
                    level: right_level,
                }),
            ) => {
                if left.hash() == right.hash() {
                    tracing::trace!(hash = %left.hash().display(), "Skipping shared chunk");
                    Step::Skip
                } else {
                    match left_level.cmp(right_level) {
                        Ordering::Greater => Step::ExpandBefore,
                        Ordering::Less => Step::ExpandAfter,
                        Ordering::Equal => Step::ExpandBoth,
                    }
                }
            }
            (Some(Pending::Chunk { .. }), Some(Pending::Entry(_))) => Step::ExpandBefore,
            (Some(Pending::Entry(_)), Some(Pending::Chunk { .. })) => Step::ExpandAfter,
            (Some(Pending::Entry(left)), Some(Pending::Entry(right))) => {
                match left.key.cmp(&right.key) {
                    Ordering::Less => Step::Removed,
                    Ordering::Greater => Step::Added,
                    Ordering::Equal if left.value == right.value => Step::Skip,
                    Ordering::Equal => Step::Modified,
                }
            }
        };

        match step {
            Step::Skip => {
                before.pop();
                after.pop();
            }
            Step::ExpandBefore => before.expand().await?,
            Step::ExpandAfter => after.expand().await?,
            Step::ExpandBoth => {
                before.expand().await?;
                after.expand().await?;
            }
            Step::Removed => diff.removed.extend(before.pop_key()),
            Step::Added => diff.added.extend(after.pop_key()),
            Step::Modified => {
                before.pop();
                diff.modified.extend(after.pop_key());
            }
        }
    }

    Ok(diff)
}
