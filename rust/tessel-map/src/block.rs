use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::{Entry, Reference};

/// The form a [`Sequence`] takes in storage. Cached children are never part
/// of a block, so a block's hash only depends on the entries or references
/// it lists.
///
/// [`Sequence`]: crate::Sequence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "Key: Serialize + Clone, Value: Serialize, Hash: Serialize + Clone",
    deserialize = "Key: Deserialize<'de> + Clone, Value: Deserialize<'de>, Hash: Deserialize<'de> + Clone"
))]
pub enum Block<Key, Value, Hash> {
    /// Entries of a leaf sequence, in ascending key order
    Leaf(Vec<Entry<Key, Value>>),
    /// References of a meta sequence, in ascending key order
    Meta {
        /// Height above the leaves; the lowest meta level is 1
        level: u32,
        /// One reference per child chunk
        references: NonEmpty<Reference<Key, Hash>>,
    },
}
