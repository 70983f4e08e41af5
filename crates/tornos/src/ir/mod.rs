//! Intermediate representation for WebAssembly modules.
//!
//! A [`Module`] owns a flat arena of expression nodes addressed by [`ExprId`]
//! handles. Ids are tagged with their owning module, so attaching an
//! expression to the wrong module, or to two parents at once, is caught at
//! the builder boundary instead of corrupting the tree.

mod expr;
mod module;
pub mod ops;

pub use expr::{ExprId, ExprKind, ExprNode, ModuleId};
pub use module::{Export, Function, Module};
pub use ops::{BinaryOp, UnaryOp};
