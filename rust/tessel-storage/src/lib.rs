#![warn(missing_docs)]

//! This crate contains the content-addressed chunk store that tessel maps
//! persist their sequences into. A store is assembled from an [Encoder] (which
//! turns a chunk into bytes and names those bytes by their hash) and a
//! [StorageBackend] (which keeps bytes against a key):
//!
//! ```rust
//! use tessel_storage::{Storage, CborEncoder, MemoryStorageBackend};
//!
//! // Create a CBOR encoder for serialization/deserialization
//! let encoder = CborEncoder;
//!
//! // Create an in-memory storage backend with explicit types
//! // Using [u8; 32] as the key type and Vec<u8> as the value type
//! let backend = MemoryStorageBackend::<[u8; 32], Vec<u8>>::default();
//!
//! // Combine them into a Storage instance
//! let storage = Storage {
//!     encoder,
//!     backend
//! };
//! ```
//!
//! The prepared `storage` will automatically implement
//! [ContentAddressedStorage] for bounds-matching encoders and storage backends.

mod encoder;
pub use encoder::*;

mod error;
pub use error::*;

mod storage;
pub use storage::*;

mod hash;
pub use hash::*;
