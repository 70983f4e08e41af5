//! IR optimization passes.
//!
//! Each pass is a self-contained sub-module exposing a `run(&mut Module)`
//! that rewrites the expression tree in place. [`run_passes`] looks passes up
//! by name and applies them strictly in the order given.

use crate::ir::Module;
use anyhow::{bail, Result};
use tracing::debug;

pub mod dce;
pub mod simplify_identity;

/// Apply the named passes to `module`, in order.
///
/// Each pass sees the output of the previous one. An unrecognized name
/// aborts the batch with an error *without rolling back*: passes that
/// already ran stay applied, and the module remains fully consistent and
/// usable (it can be serialized, further transformed, or dropped).
pub fn run_passes(module: &mut Module, passes: &[&str]) -> Result<()> {
    for &name in passes {
        match name {
            "simplify-identity" => simplify_identity::run(module),
            "dce" => dce::run(module),
            _ => bail!("unknown pass: {name}"),
        }
        debug!(pass = name, "pass applied");
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, ExprKind};
    use tornos_core::{Literal, Type};

    /// Build a module whose single function computes `(x + 0) * 1` over its
    /// first parameter.
    fn identity_laden_module() -> Module {
        let mut m = Module::new();
        let x = m.local_get(0, Type::I32);
        let zero = m.const_(Literal::I32(0));
        let add = m.binary(BinaryOp::I32Add, x, zero, Type::I32).unwrap();
        let one = m.const_(Literal::I32(1));
        let mul = m.binary(BinaryOp::I32Mul, add, one, Type::I32).unwrap();
        m.add_function("f", Type::I32, Type::I32, vec![], mul).unwrap();
        m
    }

    #[test]
    fn passes_run_in_order() {
        let mut m = identity_laden_module();
        run_passes(&mut m, &["simplify-identity", "dce"]).unwrap();
        let body = m.node(m.functions()[0].body).unwrap();
        assert!(matches!(body.kind, ExprKind::LocalGet { index: 0 }));
    }

    #[test]
    fn empty_pass_list_is_a_no_op() {
        let mut m = identity_laden_module();
        run_passes(&mut m, &[]).unwrap();
        let body = m.node(m.functions()[0].body).unwrap();
        assert!(matches!(body.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn unknown_pass_aborts_with_partial_progress() {
        let mut m = identity_laden_module();
        let err = run_passes(&mut m, &["simplify-identity", "no-such-pass", "dce"]).unwrap_err();
        assert!(err.to_string().contains("unknown pass: no-such-pass"));

        // The first pass already ran and is NOT rolled back.
        let body = m.node(m.functions()[0].body).unwrap();
        assert!(matches!(body.kind, ExprKind::LocalGet { index: 0 }));

        // The module stays fully usable after the failed batch.
        run_passes(&mut m, &["dce"]).unwrap();
        assert!(crate::codegen::write_binary(&m).is_ok());
    }

    #[test]
    fn unknown_pass_first_leaves_module_untouched() {
        let mut m = identity_laden_module();
        assert!(run_passes(&mut m, &["no-such-pass", "simplify-identity"]).is_err());
        let body = m.node(m.functions()[0].body).unwrap();
        assert!(matches!(body.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn disjoint_passes_commute() {
        // A body with both an identity pattern and dead code: the two passes
        // rewrite disjoint pattern classes, so either order gives one result.
        fn build() -> Module {
            let mut m = Module::new();
            let x = m.local_get(0, Type::I32);
            let zero = m.const_(Literal::I32(0));
            let add = m.binary(BinaryOp::I32Add, x, zero, Type::I32).unwrap();
            let ret = m.return_(Some(add)).unwrap();
            let dead = m.const_(Literal::I32(99));
            let drop_dead = m.drop_(dead).unwrap();
            let body = m.block(None, vec![ret, drop_dead], Type::UNREACHABLE).unwrap();
            m.add_function("f", Type::I32, Type::I32, vec![], body).unwrap();
            m
        }

        let mut forward = build();
        run_passes(&mut forward, &["simplify-identity", "dce"]).unwrap();
        let mut backward = build();
        run_passes(&mut backward, &["dce", "simplify-identity"]).unwrap();

        for m in [&forward, &backward] {
            let body = m.node(m.functions()[0].body).unwrap();
            let ExprKind::Block { ref children, .. } = body.kind else {
                panic!("expected block body");
            };
            assert_eq!(children.len(), 1, "dead code after return must be gone");
            let ExprKind::Return { value: Some(v) } = m.node(children[0]).unwrap().kind else {
                panic!("expected return");
            };
            assert!(
                matches!(m.node(v).unwrap().kind, ExprKind::LocalGet { index: 0 }),
                "x + 0 must have simplified to x"
            );
        }
    }
}
