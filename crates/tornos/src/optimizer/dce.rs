//! Dead code elimination.
//!
//! Inside every block, expressions after the first child that unconditionally
//! transfers control (typed [`Type::UNREACHABLE`], e.g. a `return`) can never
//! execute and are removed. The transferring child itself, and everything
//! before it, is kept.

use crate::ir::{ExprId, ExprKind, Module};
use tornos_core::Type;

/// Run dead code elimination over every function body.
pub fn run(module: &mut Module) {
    for i in 0..module.functions().len() {
        let body = module.functions()[i].body;
        visit(module, body);
    }
}

fn visit(module: &mut Module, id: ExprId) {
    for child in module.exprs[id.index()].kind.children() {
        visit(module, child);
    }

    let cut = match &module.exprs[id.index()].kind {
        ExprKind::Block { children, .. } => children
            .iter()
            .position(|c| module.exprs[c.index()].ty == Type::UNREACHABLE)
            .map(|p| p + 1),
        _ => None,
    };

    if let Some(cut) = cut {
        if let ExprKind::Block { children, .. } = &mut module.exprs[id.index()].kind {
            // Truncated children stay in the arena, detached, until the
            // module is dropped.
            children.truncate(cut);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
