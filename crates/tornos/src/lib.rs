//! tornos — WebAssembly module optimizer core.
//!
//! This crate provides the IR and transformation pipeline: parse a module
//! from the binary or text format, rewrite it in place with named passes,
//! and serialize it back out.

pub mod codegen;
pub mod ir;
mod leb128;
pub mod optimizer;
pub mod parser;

// Re-export key types for convenience
pub use anyhow::{Context, Result};
pub use codegen::{to_text, write_binary};
pub use ir::{BinaryOp, ExprId, ExprKind, Export, Function, Module, UnaryOp};
pub use optimizer::run_passes;
pub use parser::{read_binary, read_text};
pub use tornos_core::{Literal, Type};

/// Optimize a WebAssembly binary with the named passes.
///
/// This is the main entry point for the optimization pipeline: it parses the
/// module, applies the passes in order, and serializes the result.
///
/// # Example
/// ```no_run
/// let wasm_bytes = std::fs::read("input.wasm").unwrap();
/// let optimized = tornos::optimize_binary(&wasm_bytes, &["simplify-identity", "dce"]).unwrap();
/// std::fs::write("output.wasm", optimized).unwrap();
/// ```
pub fn optimize_binary(bytes: &[u8], passes: &[&str]) -> Result<Vec<u8>> {
    let mut module = read_binary(bytes).context("failed to parse WebAssembly module")?;
    optimizer::run_passes(&mut module, passes).context("pass pipeline failed")?;
    write_binary(&module).context("failed to serialize optimized module")
}

/// The library version, for embedders that need to report it.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_nonempty() {
        assert!(!super::version().is_empty());
    }
}
