//! WebAssembly module serialization.
//!
//! [`write_binary`] emits the wire format; [`to_text`] goes through the
//! binary bridge (serialize, then disassemble with `wasmprinter`), mirroring
//! how the parser handles the text format.
//!
//! Emitted sections: type (1), function (3), export (7), code (10), and the
//! `name` custom section carrying function names so they survive round trips.

use crate::ir::{ExprId, ExprKind, Module};
use crate::leb128;
use anyhow::{bail, Context, Result};
use tornos_core::{expand, signature_params, signature_results, Literal, Type};
use tornos_support::FastHashMap;
use tracing::debug;

/// Serialize a module to the binary wire format.
///
/// For a module built through the builder API this should never fail; an
/// error here means an internal invariant was violated (e.g. a function body
/// referencing a node the module does not own) and is surfaced rather than
/// silently miswritten.
pub fn write_binary(module: &Module) -> Result<Vec<u8>> {
    let bytes = BinaryWriter::new().write_module(module)?;
    debug!(bytes = bytes.len(), "serialized binary module");
    Ok(bytes)
}

/// Render a module in the text format.
///
/// Output is re-formatted rather than byte-identical to any original source,
/// but preserves the module's structure: function names, export names,
/// expression forms and constant values.
pub fn to_text(module: &Module) -> Result<String> {
    let binary = write_binary(module)?;
    wasmprinter::print_bytes(&binary).context("failed to render module as text")
}

struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn write_module(mut self, module: &Module) -> Result<Vec<u8>> {
        // Magic number: \0asm, then version 1.
        self.buffer.extend_from_slice(&0x6D73_6100u32.to_le_bytes());
        self.buffer.extend_from_slice(&1u32.to_le_bytes());

        // Canonical signature handles make type deduplication a handle
        // comparison: collect each function's signature in first-use order.
        let mut sig_index: FastHashMap<Type, u32> = FastHashMap::default();
        let mut signatures: Vec<Type> = Vec::new();
        let mut func_type_indices: Vec<u32> = Vec::new();
        for func in module.functions() {
            let sig = func.signature();
            let index = *sig_index.entry(sig).or_insert_with(|| {
                signatures.push(sig);
                (signatures.len() - 1) as u32
            });
            func_type_indices.push(index);
        }

        if !signatures.is_empty() {
            let mut content = Vec::new();
            leb128::write_u32(&mut content, signatures.len() as u32);
            for &sig in &signatures {
                content.push(0x60);
                write_valtype_list(&mut content, &expand(signature_params(sig)))?;
                write_valtype_list(&mut content, &expand(signature_results(sig)))?;
            }
            self.write_section(1, &content);
        }

        if !func_type_indices.is_empty() {
            let mut content = Vec::new();
            leb128::write_u32(&mut content, func_type_indices.len() as u32);
            for &index in &func_type_indices {
                leb128::write_u32(&mut content, index);
            }
            self.write_section(3, &content);
        }

        if !module.exports().is_empty() {
            let mut content = Vec::new();
            leb128::write_u32(&mut content, module.exports().len() as u32);
            for export in module.exports() {
                write_name(&mut content, &export.name);
                content.push(0x00);
                leb128::write_u32(&mut content, export.func_index);
            }
            self.write_section(7, &content);
        }

        if !module.functions().is_empty() {
            let mut content = Vec::new();
            leb128::write_u32(&mut content, module.functions().len() as u32);
            for func in module.functions() {
                let mut body = Vec::new();
                write_local_groups(&mut body, &func.vars)?;
                write_body(module, func.body, &mut body)?;
                body.push(0x0B);

                leb128::write_u32(&mut content, body.len() as u32);
                content.extend_from_slice(&body);
            }
            self.write_section(10, &content);

            // Function names, so a binary round trip keeps them.
            let mut assoc = Vec::new();
            leb128::write_u32(&mut assoc, module.functions().len() as u32);
            for (i, func) in module.functions().iter().enumerate() {
                leb128::write_u32(&mut assoc, i as u32);
                write_name(&mut assoc, &func.name);
            }
            let mut names = Vec::new();
            write_name(&mut names, "name");
            names.push(0x01);
            leb128::write_u32(&mut names, assoc.len() as u32);
            names.extend_from_slice(&assoc);
            self.write_section(0, &names);
        }

        Ok(self.buffer)
    }

    fn write_section(&mut self, id: u8, content: &[u8]) {
        self.buffer.push(id);
        leb128::write_u32(&mut self.buffer, content.len() as u32);
        self.buffer.extend_from_slice(content);
    }
}

/// Write a function body. A top-level block is flattened into the body's own
/// instruction sequence (the body already is a block on the wire); the
/// reader re-wraps multi-statement bodies symmetrically.
fn write_body(module: &Module, id: ExprId, buf: &mut Vec<u8>) -> Result<()> {
    let node = module
        .node(id)
        .context("module invariant violated: dangling body expression id")?;
    if let ExprKind::Block { children, .. } = &node.kind {
        for &child in children {
            write_expr(module, child, buf)?;
        }
        return Ok(());
    }
    write_expr(module, id, buf)
}

fn write_expr(module: &Module, id: ExprId, buf: &mut Vec<u8>) -> Result<()> {
    let node = module
        .node(id)
        .context("module invariant violated: dangling expression id")?;
    match &node.kind {
        ExprKind::Const(value) => match *value {
            Literal::I32(v) => {
                buf.push(0x41);
                leb128::write_i32(buf, v);
            }
            Literal::I64(v) => {
                buf.push(0x42);
                leb128::write_i64(buf, v);
            }
            Literal::F32(v) => {
                buf.push(0x43);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Literal::F64(v) => {
                buf.push(0x44);
                buf.extend_from_slice(&v.to_le_bytes());
            }
        },
        ExprKind::Block { children, .. } => {
            buf.push(0x02);
            buf.push(blocktype_byte(node.ty)?);
            for &child in children {
                write_expr(module, child, buf)?;
            }
            buf.push(0x0B);
        }
        ExprKind::Unary { op, value } => {
            write_expr(module, *value, buf)?;
            buf.push(op.opcode());
        }
        ExprKind::Binary { op, left, right } => {
            write_expr(module, *left, buf)?;
            write_expr(module, *right, buf)?;
            buf.push(op.opcode());
        }
        ExprKind::LocalGet { index } => {
            buf.push(0x20);
            leb128::write_u32(buf, *index);
        }
        ExprKind::LocalSet { index, value } => {
            write_expr(module, *value, buf)?;
            buf.push(0x21);
            leb128::write_u32(buf, *index);
        }
        ExprKind::Return { value } => {
            if let Some(value) = value {
                write_expr(module, *value, buf)?;
            }
            buf.push(0x0F);
        }
        ExprKind::Drop { value } => {
            write_expr(module, *value, buf)?;
            buf.push(0x1A);
        }
        ExprKind::Nop => buf.push(0x01),
        ExprKind::Unreachable => buf.push(0x00),
    }
    Ok(())
}

fn write_name(buf: &mut Vec<u8>, name: &str) {
    leb128::write_u32(buf, name.len() as u32);
    buf.extend_from_slice(name.as_bytes());
}

fn write_valtype_list(buf: &mut Vec<u8>, types: &[Type]) -> Result<()> {
    leb128::write_u32(buf, types.len() as u32);
    for &ty in types {
        buf.push(valtype_byte(ty)?);
    }
    Ok(())
}

/// Run-length encode local declarations: consecutive equal types share one
/// (count, type) group.
fn write_local_groups(buf: &mut Vec<u8>, vars: &[Type]) -> Result<()> {
    let mut groups: Vec<(u32, Type)> = Vec::new();
    for &ty in vars {
        match groups.last_mut() {
            Some((count, last)) if *last == ty => *count += 1,
            _ => groups.push((1, ty)),
        }
    }
    leb128::write_u32(buf, groups.len() as u32);
    for (count, ty) in groups {
        leb128::write_u32(buf, count);
        buf.push(valtype_byte(ty)?);
    }
    Ok(())
}

fn valtype_byte(ty: Type) -> Result<u8> {
    Ok(match ty {
        Type::I32 => 0x7F,
        Type::I64 => 0x7E,
        Type::F32 => 0x7D,
        Type::F64 => 0x7C,
        Type::V128 => 0x7B,
        _ => bail!("type {ty} is not encodable as a value type"),
    })
}

fn blocktype_byte(ty: Type) -> Result<u8> {
    // A block typed unreachable (it ends in a control transfer) carries no
    // result on the wire; the reader re-derives unreachability.
    if ty == Type::NONE || ty == Type::UNREACHABLE {
        return Ok(0x40);
    }
    valtype_byte(ty).context("block result type is not encodable")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_module_is_just_the_header() {
        let module = Module::new();
        let bytes = write_binary(&module).unwrap();
        assert_eq!(bytes, [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn constant_function_encoding() {
        let mut module = Module::new();
        let c = module.const_(Literal::I32(42));
        let idx = module
            .add_function("answer", Type::NONE, Type::I32, vec![], c)
            .unwrap();
        module.export_function(idx, "answer").unwrap();

        let bytes = write_binary(&module).unwrap();
        assert_eq!(&bytes[0..8], &[0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
        // The i32.const 42 must appear verbatim in the code section.
        assert!(bytes.windows(2).any(|w| w == &[0x41, 0x2A][..]));
    }

    #[test]
    fn writer_output_validates() {
        let mut module = Module::new();
        let l = module.local_get(0, Type::I32);
        let c = module.const_(Literal::I32(1));
        let sum = module
            .binary(crate::ir::BinaryOp::I32Add, l, c, Type::I32)
            .unwrap();
        let idx = module
            .add_function("inc", Type::I32, Type::I32, vec![], sum)
            .unwrap();
        module.export_function(idx, "inc").unwrap();

        let bytes = write_binary(&module).unwrap();
        wasmparser::validate(&bytes).expect("writer must emit valid wasm");
    }

    #[test]
    fn shared_signatures_are_written_once() {
        let mut module = Module::new();
        let a = module.const_(Literal::I32(1));
        let b = module.const_(Literal::I32(2));
        module.add_function("f", Type::NONE, Type::I32, vec![], a).unwrap();
        module.add_function("g", Type::NONE, Type::I32, vec![], b).unwrap();

        let bytes = write_binary(&module).unwrap();
        // Exactly one functype (0x60) in the type section: count byte is 1.
        let type_section_count = bytes.iter().filter(|&&b| b == 0x60).count();
        assert_eq!(type_section_count, 1);
    }

    #[test]
    fn local_groups_are_run_length_encoded() {
        let mut buf = Vec::new();
        write_local_groups(
            &mut buf,
            &[Type::I32, Type::I32, Type::F64, Type::I32],
        )
        .unwrap();
        // 3 groups: (2 x i32), (1 x f64), (1 x i32)
        assert_eq!(buf, [0x03, 0x02, 0x7F, 0x01, 0x7C, 0x01, 0x7F]);
    }

    #[test]
    fn to_text_preserves_structure() {
        let mut module = Module::new();
        let c = module.const_(Literal::I32(42));
        let idx = module
            .add_function("answer", Type::NONE, Type::I32, vec![], c)
            .unwrap();
        module.export_function(idx, "answer").unwrap();

        let text = to_text(&module).unwrap();
        assert!(text.contains("module"));
        assert!(text.contains("i32.const 42"));
        assert!(text.contains("(export \"answer\""));
        assert!(text.contains("$answer"), "function name must survive: {text}");
    }

    #[test]
    fn composite_types_are_not_value_encodable() {
        let sig = tornos_core::intern_signature(Type::I32, Type::I32);
        assert!(valtype_byte(sig).is_err());
        assert!(valtype_byte(Type::NONE).is_err());
    }
}
