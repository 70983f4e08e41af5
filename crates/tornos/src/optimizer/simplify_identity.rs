//! Identity simplification.
//!
//! Rewrites binary expressions whose constant operand makes them identities:
//!
//! - `x + 0`, `0 + x`, `x - 0` → `x`
//! - `x | 0`, `x ^ 0` → `x`
//! - `x * 1`, `1 * x` → `x`
//!
//! for both integer widths. Applied bottom-up, so chained patterns like
//! `(x + 0) * 1` collapse in a single run. The rewrite replaces the parent
//! node's content with the kept child's; the spliced-out constant stays in
//! the arena, detached, until the module is dropped.

use crate::ir::{BinaryOp, ExprId, ExprKind, Module};

/// Run identity simplification over every function body.
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
    try_simplify(module, id);
}

fn try_simplify(module: &mut Module, id: ExprId) {
    let (op, left, right) = match module.exprs[id.index()].kind {
        ExprKind::Binary { op, left, right } => (op, left, right),
        _ => return,
    };

    use BinaryOp::*;
    let keep = match op {
        I32Add | I64Add => {
            if is_zero(module, right) {
                Some(left)
            } else if is_zero(module, left) {
                Some(right)
            } else {
                None
            }
        }
        I32Sub | I64Sub | I32Or | I64Or | I32Xor | I64Xor => {
            is_zero(module, right).then_some(left)
        }
        I32Mul | I64Mul => {
            if is_one(module, right) {
                Some(left)
            } else if is_one(module, left) {
                Some(right)
            } else {
                None
            }
        }
        _ => None,
    };

    if let Some(child) = keep {
        splice(module, id, child);
    }
}

fn is_zero(module: &Module, id: ExprId) -> bool {
    matches!(&module.exprs[id.index()].kind, ExprKind::Const(lit) if lit.is_zero_int())
}

fn is_one(module: &Module, id: ExprId) -> bool {
    matches!(&module.exprs[id.index()].kind, ExprKind::Const(lit) if lit.is_one_int())
}

/// Overwrite `parent` with `child`'s type and content. The child's slot is
/// left as a detached nop.
fn splice(module: &mut Module, parent: ExprId, child: ExprId) {
    let (ty, kind) = {
        let node = &mut module.exprs[child.index()];
        (node.ty, std::mem::replace(&mut node.kind, ExprKind::Nop))
    };
    let node = &mut module.exprs[parent.index()];
    node.ty = ty;
    node.kind = kind;
}

// ── Tests ────────────────────────────────────────────────────────────────────
