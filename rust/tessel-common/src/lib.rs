#![warn(missing_docs)]

//! This crate constitutes a library of light weight helpers that are shared
//! across the other tessel crates. Their chief quality is that they have no
//! dependencies at all.

mod sync;
pub use sync::*;
