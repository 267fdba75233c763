use std::fmt::Display;

use base58::ToBase58;
use serde::{Deserialize, Serialize};
use tessel_storage::HashType;

/// The serialized form of a [`MetaTuple`]: the hash of a child chunk, the
/// greatest key reachable through it and the number of entries below it.
///
/// [`MetaTuple`]: crate::MetaTuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference<Key, Hash> {
    upper_bound: Key,
    count: u64,
    hash: Hash,
}

impl<Key, Hash> Reference<Key, Hash>
where
    Hash: HashType,
{
    /// Create a new [`Reference`].
    pub fn new(upper_bound: Key, count: u64, hash: Hash) -> Self {
        Reference {
            upper_bound,
            count,
            hash,
        }
    }

    /// The hash for this [`Reference`].
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// The upper bounds as a key for this [`Reference`].
    pub fn upper_bound(&self) -> &Key {
        &self.upper_bound
    }

    /// The number of leaf entries reachable through this [`Reference`].
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<Key, Hash> Display for Reference<Key, Hash>
where
    Hash: HashType,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.hash().as_ref().to_base58())
    }
}
