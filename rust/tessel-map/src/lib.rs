#![warn(missing_docs)]

//! This crate provides a persistent, immutable, ordered key-value map whose
//! tree is cut into chunks by a rolling hash over its content, on top of a
//! content-addressed chunk store. Because chunk boundaries depend only on the
//! entries themselves, equal maps have equal root hashes, edits only rewrite
//! the chunks around the edited key, and two versions of a map can be
//! compared without loading the chunks they share.
//!
//! In order to use it, first construct a [`tessel_storage::Storage`] and then
//! build an [`OrderedMap`] with it:
//!
//! ```rust
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use tessel_map::OrderedMap;
//! use tessel_storage::{Blake3Hash, CborEncoder, MemoryStorageBackend, Storage};
//!
//! let storage = Storage {
//!     encoder: CborEncoder,
//!     backend: MemoryStorageBackend::<Blake3Hash, Vec<u8>>::default(),
//! };
//!
//! let before = OrderedMap::from_entries(
//!     [(1u64, "a".to_string()), (5, "b".to_string()), (9, "c".to_string())],
//!     storage,
//! )
//! .await?;
//!
//! // Every edit produces a new map; `before` is left as it was
//! let after = before.set(5, "B".to_string()).await?;
//!
//! assert_eq!(after.get(&5).await?, Some("B".to_string()));
//! assert_eq!(after.diff(&before).await?.modified, vec![5]);
//! # Ok(())
//! # }
//! ```

mod block;
pub use block::*;

mod boundary;
pub use boundary::*;

mod chunker;
pub use chunker::*;

mod config;
pub use config::*;

mod cursor;
pub use cursor::*;

mod diff;
pub use diff::*;

mod entry;
pub use entry::*;

mod error;
pub use error::*;

mod key;
pub use key::*;

mod map;
pub use map::*;

mod reference;
pub use reference::*;

mod sequence;
pub use sequence::*;

pub mod traversal;
pub use traversal::*;

mod value;
pub use value::*;
