use base58::ToBase58;
use serde::{Serialize, de::DeserializeOwned};
use tessel_common::ConditionalSync;

/// The representation of a common hash type (BLAKE3, in this case) that will
/// often be used as the key type for [`StorageBackend`]s and the
/// [`HashType`] for [`Encoder`]s.
///
/// [`StorageBackend`]: crate::StorageBackend
/// [`Encoder`]: crate::Encoder
pub type Blake3Hash = [u8; 32];

/// A trait that can be implemented for types that represent a hash. Two
/// chunks are the same chunk if and only if their hashes compare equal.
///
/// A blanket implementation is provided for any type that matches
/// `AsRef<[u8]>` and the other bounds below.
pub trait HashType:
    Clone
    + AsRef<[u8]>
    + ConditionalSync
    + Serialize
    + DeserializeOwned
    + std::fmt::Debug
    + PartialEq
    + Eq
    + std::hash::Hash
    + 'static
{
    /// Format the hash as a short display string
    fn display(&self) -> String {
        let bytes = self.as_ref();
        format!("#{}...", bytes[0..bytes.len().min(6)].to_base58())
    }
}

impl<T> HashType for T where
    T: Clone
        + AsRef<[u8]>
        + ConditionalSync
        + Serialize
        + DeserializeOwned
        + std::fmt::Debug
        + PartialEq
        + Eq
        + std::hash::Hash
        + 'static
{
}

#[cfg(test)]
mod tests {
    use super::{Blake3Hash, HashType};

    #[test]
    fn it_displays_a_short_base58_prefix() {
        let hash: Blake3Hash = blake3::hash(b"tessel").into();
        let display = hash.display();

        assert!(display.starts_with('#'));
        assert!(display.ends_with("..."));
        assert!(display.len() < 16);
    }
}
