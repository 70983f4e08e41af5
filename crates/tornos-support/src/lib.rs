//! Support utilities for the tornos optimizer.
//!
//! This crate holds the allocation and interning primitives the rest of the
//! workspace is built on: a thread-safe bump [`Arena`] for short-lived string
//! data, a canonicalizing [`StringInterner`], and the fast hashing layer
//! ([`FastHashMap`], [`hash_bytes`]) used for all internal lookup tables.

pub mod arena;
pub mod hash;
pub mod interner;

pub use arena::Arena;
pub use hash::{hash_bytes, FastHashMap};
pub use interner::StringInterner;
