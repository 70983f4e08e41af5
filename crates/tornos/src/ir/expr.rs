//! Expression nodes and their handles.

use crate::ir::ops::{BinaryOp, UnaryOp};
use std::sync::atomic::{AtomicU32, Ordering};
use tornos_core::{Literal, Type};

/// Process-unique identity of a [`Module`](crate::ir::Module).
///
/// Stamped into every [`ExprId`] the module hands out, so an id can never be
/// mistaken for one of another module's expressions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ModuleId(u32);

impl ModuleId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        ModuleId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to an expression inside its owning module's arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ExprId {
    owner: ModuleId,
    index: u32,
}

impl ExprId {
    pub(crate) fn new(owner: ModuleId, index: u32) -> Self {
        Self { owner, index }
    }

    /// The module this expression belongs to.
    pub fn owner(self) -> ModuleId {
        self.owner
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

/// One expression in a module's arena.
#[derive(Debug)]
pub struct ExprNode {
    /// The value type this expression produces ([`Type::NONE`] for
    /// statements, [`Type::UNREACHABLE`] for control transfers).
    pub ty: Type,
    pub kind: ExprKind,
    /// Set once the expression has been attached to a parent (or installed as
    /// a function body). An attached expression cannot be attached again.
    pub(crate) attached: bool,
}

/// The expression variants of the IR.
#[derive(Debug)]
pub enum ExprKind {
    /// A constant value.
    Const(Literal),
    /// An ordered sequence of child expressions with an optional label.
    Block {
        name: Option<String>,
        children: Vec<ExprId>,
    },
    Unary {
        op: UnaryOp,
        value: ExprId,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    /// Read a local variable.
    LocalGet {
        index: u32,
    },
    /// Write a local variable. Produces no value.
    LocalSet {
        index: u32,
        value: ExprId,
    },
    /// Return from the enclosing function, optionally with a value.
    Return {
        value: Option<ExprId>,
    },
    /// Evaluate a value expression and discard the result.
    Drop {
        value: ExprId,
    },
    Nop,
    /// Trap. Control never continues past this point.
    Unreachable,
}

impl ExprKind {
    /// The direct children of this expression, in evaluation order.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            ExprKind::Const(_)
            | ExprKind::LocalGet { .. }
            | ExprKind::Nop
            | ExprKind::Unreachable => Vec::new(),
            ExprKind::Block { children, .. } => children.clone(),
            ExprKind::Unary { value, .. }
            | ExprKind::LocalSet { value, .. }
            | ExprKind::Drop { value } => vec![*value],
            ExprKind::Binary { left, right, .. } => vec![*left, *right],
            ExprKind::Return { value } => value.iter().copied().collect(),
        }
    }
}
