use serde::{Serialize, de::DeserializeOwned};
use tessel_common::ConditionalSync;
use tessel_storage::Blake3Hash;

use crate::TesselMapError;

/// A key used to order entries in an [`OrderedMap`].
///
/// Keys must be totally ordered and must have a deterministic canonical
/// encoding: the hash of that encoding decides where leaf chunks end. A
/// blanket implementation covers every type that satisfies the bounds.
///
/// [`OrderedMap`]: crate::OrderedMap
pub trait KeyType:
    std::fmt::Debug + ConditionalSync + Clone + Ord + Serialize + DeserializeOwned + 'static
{
}

impl<T> KeyType for T where
    T: std::fmt::Debug + ConditionalSync + Clone + Ord + Serialize + DeserializeOwned + 'static
{
}

/// A value that may be stored within an [`OrderedMap`]. Equality is used to
/// detect no-op writes and to classify modified keys in a diff.
///
/// [`OrderedMap`]: crate::OrderedMap
pub trait ValueType:
    std::fmt::Debug + ConditionalSync + Clone + PartialEq + Serialize + DeserializeOwned + 'static
{
}

impl<T> ValueType for T where
    T: std::fmt::Debug
        + ConditionalSync
        + Clone
        + PartialEq
        + Serialize
        + DeserializeOwned
        + 'static
{
}

/// BLAKE3 digest of the canonical DAG-CBOR encoding of `value`.
pub fn content_digest<T>(value: &T) -> Result<Blake3Hash, TesselMapError>
where
    T: Serialize,
{
    let bytes = serde_ipld_dagcbor::to_vec(value)
        .map_err(|error| TesselMapError::Encoding(format!("{error}")))?;
    Ok(blake3::hash(&bytes).into())
}
