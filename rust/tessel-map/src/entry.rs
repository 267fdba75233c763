use serde::{Deserialize, Serialize};

/// A key-value entry in a leaf sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<Key, Value> {
    /// The key in this key/value pair.
    pub key: Key,
    /// The value in this key/value pair.
    pub value: Value,
}

impl<Key, Value> Entry<Key, Value> {
    /// Create a new [`Entry`].
    pub fn new(key: Key, value: Value) -> Self {
        Entry { key, value }
    }
}

impl<Key, Value> From<(Key, Value)> for Entry<Key, Value> {
    fn from((key, value): (Key, Value)) -> Self {
        Entry { key, value }
    }
}
