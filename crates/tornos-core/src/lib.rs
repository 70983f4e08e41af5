//! Core type system for the tornos optimizer.
//!
//! Defines the compact [`Type`] handle, constant [`Literal`] values, and the
//! process-wide canonicalizing type store. The whole point of the handle
//! design is that type equality is a single integer comparison: structural
//! deduplication happens once, at interning time, in [`store`].

pub mod literal;
pub mod store;
pub mod types;

pub use literal::Literal;
pub use store::{
    expand, intern_signature, intern_tuple, lookup_signature, lookup_tuple, signature_params,
    signature_results,
};
pub use types::{Signature, Type};
