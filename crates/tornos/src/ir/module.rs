//! The IR module: expression arena, function table, exports.

use crate::ir::expr::{ExprId, ExprKind, ExprNode, ModuleId};
use crate::ir::ops::{BinaryOp, UnaryOp};
use anyhow::{bail, Result};
use tornos_core::{intern_signature, Literal, Type};

/// A function owned by a module.
#[derive(Debug)]
pub struct Function {
    /// Internal name, unique within the module.
    pub name: String,
    /// Parameter type handle (possibly a tuple for multiple parameters).
    pub params: Type,
    /// Result type handle ([`Type::NONE`] for void).
    pub results: Type,
    /// Declared local variables, excluding parameters.
    pub vars: Vec<Type>,
    /// Body expression, owned by the same module.
    pub body: ExprId,
}

impl Function {
    /// The canonical signature handle for this function's (params, results)
    /// pair, interned in the global type store.
    pub fn signature(&self) -> Type {
        intern_signature(self.params, self.results)
    }
}

/// An exported function: an external name bound to a function index.
#[derive(Debug, Clone)]
pub struct Export {
    pub name: String,
    pub func_index: u32,
}

/// The top-level IR container.
///
/// Owns the expression arena its functions reference. Expressions are built
/// through the builder methods below, which enforce the ownership rules: a
/// child must belong to this module and must not already be attached
/// elsewhere. Dropping the module releases all functions and expressions at
/// once.
#[derive(Debug)]
pub struct Module {
    pub(crate) id: ModuleId,
    pub(crate) exprs: Vec<ExprNode>,
    functions: Vec<Function>,
    exports: Vec<Export>,
}

impl Module {
    /// Create an empty module.
    pub fn new() -> Self {
        Self {
            id: ModuleId::fresh(),
            exprs: Vec::new(),
            functions: Vec::new(),
            exports: Vec::new(),
        }
    }

    // ─── Expression arena ──────────────────────────────────────────────────

    fn push(&mut self, ty: Type, kind: ExprKind) -> ExprId {
        let id = ExprId::new(self.id, self.exprs.len() as u32);
        self.exprs.push(ExprNode {
            ty,
            kind,
            attached: false,
        });
        id
    }

    /// Look up an expression node, or `None` for an id this module does not
    /// own.
    pub fn node(&self, id: ExprId) -> Option<&ExprNode> {
        if id.owner() != self.id {
            return None;
        }
        self.exprs.get(id.index())
    }

    /// Number of expressions allocated in the arena (including detached ones).
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Verify that `child` may be attached to a new parent.
    fn check_claimable(&self, child: ExprId) -> Result<()> {
        if child.owner() != self.id {
            bail!("expression belongs to a different module");
        }
        // An id with our tag always indexes into our arena.
        if self.exprs[child.index()].attached {
            bail!("expression is already attached elsewhere in this module");
        }
        Ok(())
    }

    /// Mark `child` as attached. Fails without side effects on misuse.
    fn claim(&mut self, child: ExprId) -> Result<ExprId> {
        self.check_claimable(child)?;
        self.exprs[child.index()].attached = true;
        Ok(child)
    }

    // ─── Expression builders ───────────────────────────────────────────────

    /// A constant expression; its type is the literal's own type.
    pub fn const_(&mut self, value: Literal) -> ExprId {
        self.push(value.ty(), ExprKind::Const(value))
    }

    /// Read local `index` with its declared type.
    pub fn local_get(&mut self, index: u32, ty: Type) -> ExprId {
        self.push(ty, ExprKind::LocalGet { index })
    }

    pub fn nop(&mut self) -> ExprId {
        self.push(Type::NONE, ExprKind::Nop)
    }

    pub fn unreachable(&mut self) -> ExprId {
        self.push(Type::UNREACHABLE, ExprKind::Unreachable)
    }

    /// A block with the given children and declared result type.
    ///
    /// Fails if any child belongs to another module, is already attached, or
    /// appears twice in `children`; no child is claimed unless all checks
    /// pass.
    pub fn block(&mut self, name: Option<&str>, children: Vec<ExprId>, ty: Type) -> Result<ExprId> {
        for (i, &child) in children.iter().enumerate() {
            self.check_claimable(child)?;
            if children[..i].contains(&child) {
                bail!("expression appears twice in one block");
            }
        }
        for &child in &children {
            self.exprs[child.index()].attached = true;
        }
        Ok(self.push(
            ty,
            ExprKind::Block {
                name: name.map(str::to_string),
                children,
            },
        ))
    }

    pub fn unary(&mut self, op: UnaryOp, value: ExprId, ty: Type) -> Result<ExprId> {
        let value = self.claim(value)?;
        Ok(self.push(ty, ExprKind::Unary { op, value }))
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId, ty: Type) -> Result<ExprId> {
        if left == right {
            bail!("expression appears as both operands of a binary expression");
        }
        self.check_claimable(left)?;
        self.check_claimable(right)?;
        self.exprs[left.index()].attached = true;
        self.exprs[right.index()].attached = true;
        Ok(self.push(ty, ExprKind::Binary { op, left, right }))
    }

    /// Write local `index`. Produces no value.
    pub fn local_set(&mut self, index: u32, value: ExprId) -> Result<ExprId> {
        let value = self.claim(value)?;
        Ok(self.push(Type::NONE, ExprKind::LocalSet { index, value }))
    }

    /// Return from the enclosing function. Typed unreachable: control never
    /// continues past it.
    pub fn return_(&mut self, value: Option<ExprId>) -> Result<ExprId> {
        let value = match value {
            Some(v) => Some(self.claim(v)?),
            None => None,
        };
        Ok(self.push(Type::UNREACHABLE, ExprKind::Return { value }))
    }

    /// Evaluate `value` and discard its result.
    pub fn drop_(&mut self, value: ExprId) -> Result<ExprId> {
        let value = self.claim(value)?;
        Ok(self.push(Type::NONE, ExprKind::Drop { value }))
    }

    // ─── Functions and exports ─────────────────────────────────────────────

    /// Register a function and return its index.
    ///
    /// `name` must be unique within the module; `body` is claimed like any
    /// other attachment. The (params, results) pair is canonicalized in the
    /// global type store.
    pub fn add_function(
        &mut self,
        name: &str,
        params: Type,
        results: Type,
        vars: Vec<Type>,
        body: ExprId,
    ) -> Result<u32> {
        if self.get_function(name).is_some() {
            bail!("duplicate function name: {name}");
        }
        let body = self.claim(body)?;
        intern_signature(params, results);
        let index = self.functions.len() as u32;
        self.functions.push(Function {
            name: name.to_string(),
            params,
            results,
            vars,
            body,
        });
        Ok(index)
    }

    /// Export the function at `func_index` under `external_name`.
    pub fn export_function(&mut self, func_index: u32, external_name: &str) -> Result<()> {
        if func_index as usize >= self.functions.len() {
            bail!("export refers to function index {func_index} which does not exist");
        }
        if self.exports.iter().any(|e| e.name == external_name) {
            bail!("duplicate export name: {external_name}");
        }
        self.exports.push(Export {
            name: external_name.to_string(),
            func_index,
        });
        Ok(())
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Rename the function at `index`. Used by the binary reader to apply
    /// name-section names after all functions are built.
    pub(crate) fn set_function_name(&mut self, index: usize, name: String) -> Result<()> {
        if index >= self.functions.len() {
            bail!("name refers to function index {index} which does not exist");
        }
        self.functions[index].name = name;
        Ok(())
    }

    /// Run the named passes in order; see [`crate::optimizer::run_passes`].
    pub fn run_passes(&mut self, passes: &[&str]) -> Result<()> {
        crate::optimizer::run_passes(self, passes)
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
