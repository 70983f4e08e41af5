//! WebAssembly module parsing.
//!
//! [`read_binary`] decodes the wire format directly into IR; [`read_text`]
//! goes through the binary bridge (`wat` assembles the text source, then the
//! binary reader takes over), so both entry points share one decoding path.
//!
//! Supported sections: type (1), function (3), export (7), code (10), and the
//! `name` custom section for function names. Unknown sections are skipped.

use crate::ir::{BinaryOp, ExprId, Module, UnaryOp};
use crate::leb128;
use anyhow::{bail, Context, Result};
use tornos_core::{expand, intern_tuple, Literal, Type};
use tracing::debug;

/// Parse a module from the binary wire format.
///
/// Fails on bad magic/version, truncated sections, malformed encodings, and
/// constructs outside the supported subset. Never panics on hostile input.
pub fn read_binary(bytes: &[u8]) -> Result<Module> {
    let module = BinaryReader::new(bytes).parse_module()?;
    debug!(functions = module.functions().len(), "parsed binary module");
    Ok(module)
}

/// Parse a module from the text format.
///
/// Uses the binary bridge: the source is assembled to the wire format first,
/// then decoded by [`read_binary`].
pub fn read_text(source: &str) -> Result<Module> {
    let binary = wat::parse_str(source).context("failed to parse text format")?;
    read_binary(&binary)
}

struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn parse_module(mut self) -> Result<Module> {
        let magic = self.read_u32_le().context("missing magic number")?;
        if magic != 0x6D73_6100 {
            bail!("invalid magic number: {magic:#010x}");
        }
        let version = self.read_u32_le().context("missing version field")?;
        if version != 1 {
            bail!("unsupported binary version: {version}");
        }

        let mut module = Module::new();
        let mut types: Vec<(Type, Type)> = Vec::new();
        let mut func_types: Vec<u32> = Vec::new();
        let mut exports: Vec<(String, u32)> = Vec::new();
        let mut names: Vec<(u32, String)> = Vec::new();
        let mut saw_code = false;

        while self.pos < self.data.len() {
            let section_id = self.read_u8().context("truncated section header")?;
            let size = self.read_leb_u32().context("truncated section size")? as usize;
            let end = self
                .pos
                .checked_add(size)
                .filter(|&e| e <= self.data.len())
                .context("section length exceeds module size")?;

            match section_id {
                0 => names.extend(self.parse_name_section(end)?),
                1 => types = self.parse_type_section()?,
                3 => func_types = self.parse_function_section()?,
                7 => exports = self.parse_export_section()?,
                10 => {
                    self.parse_code_section(&mut module, &types, &func_types)?;
                    saw_code = true;
                }
                // Sections outside the subset are skipped, not rejected.
                _ => {}
            }

            if self.pos > end {
                bail!("section {section_id} content overruns its declared length");
            }
            self.pos = end;
        }

        if !func_types.is_empty() && !saw_code {
            bail!("function section without a code section");
        }

        for (index, name) in names {
            module.set_function_name(index as usize, name)?;
        }
        let unique: std::collections::HashSet<&str> =
            module.functions().iter().map(|f| f.name.as_str()).collect();
        if unique.len() != module.functions().len() {
            bail!("duplicate function name in name section");
        }

        for (name, func_index) in exports {
            module.export_function(func_index, &name)?;
        }

        Ok(module)
    }

    // ─── Sections ──────────────────────────────────────────────────────────

    fn parse_type_section(&mut self) -> Result<Vec<(Type, Type)>> {
        let count = self.read_leb_u32()?;
        let mut types = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let form = self.read_u8()?;
            if form != 0x60 {
                bail!("unsupported type form: {form:#04x}");
            }
            let params = self.read_valtype_list()?;
            let results = self.read_valtype_list()?;
            if results.len() > 1 {
                bail!("multiple results are not supported");
            }
            types.push((intern_tuple(params), intern_tuple(results)));
        }
        Ok(types)
    }

    fn parse_function_section(&mut self) -> Result<Vec<u32>> {
        let count = self.read_leb_u32()?;
        let mut indices = Vec::with_capacity(count as usize);
        for _ in 0..count {
            indices.push(self.read_leb_u32()?);
        }
        Ok(indices)
    }

    fn parse_export_section(&mut self) -> Result<Vec<(String, u32)>> {
        let count = self.read_leb_u32()?;
        let mut exports = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = self.read_name()?;
            let kind = self.read_u8()?;
            if kind != 0x00 {
                bail!("unsupported export kind: {kind:#04x}");
            }
            let index = self.read_leb_u32()?;
            exports.push((name, index));
        }
        Ok(exports)
    }

    fn parse_code_section(
        &mut self,
        module: &mut Module,
        types: &[(Type, Type)],
        func_types: &[u32],
    ) -> Result<()> {
        let count = self.read_leb_u32()?;
        if count as usize != func_types.len() {
            bail!(
                "code section has {count} bodies but the function section declares {}",
                func_types.len()
            );
        }

        for (i, &type_index) in func_types.iter().enumerate() {
            let &(params, results) = types
                .get(type_index as usize)
                .with_context(|| format!("function {i} refers to unknown type {type_index}"))?;

            let body_size = self.read_leb_u32()? as usize;
            let body_end = self
                .pos
                .checked_add(body_size)
                .filter(|&e| e <= self.data.len())
                .context("function body length exceeds module size")?;

            let mut vars = Vec::new();
            let group_count = self.read_leb_u32()?;
            for _ in 0..group_count {
                let n = self.read_leb_u32()?;
                let ty = self.read_valtype()?;
                vars.extend(std::iter::repeat(ty).take(n as usize));
            }

            let mut locals = expand(params);
            locals.extend_from_slice(&vars);

            let list = self.read_expr_list(module, &locals, results)?;
            if self.pos != body_end {
                bail!("function body does not end at its declared length");
            }
            let body = assemble_body(module, list)?;
            module.add_function(&format!("func_{i}"), params, results, vars, body)?;
        }
        Ok(())
    }

    /// Function-names subsection of the `name` custom section.
    fn parse_name_section(&mut self, end: usize) -> Result<Vec<(u32, String)>> {
        let section_name = self.read_name()?;
        if section_name != "name" {
            self.pos = end;
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        while self.pos < end {
            let sub_id = self.read_u8()?;
            let sub_size = self.read_leb_u32()? as usize;
            let sub_end = self
                .pos
                .checked_add(sub_size)
                .filter(|&e| e <= end)
                .context("name subsection length exceeds its section")?;
            if sub_id == 1 {
                let count = self.read_leb_u32()?;
                for _ in 0..count {
                    let index = self.read_leb_u32()?;
                    let name = self.read_name()?;
                    names.push((index, name));
                }
            }
            self.pos = sub_end;
        }
        Ok(names)
    }

    // ─── Expressions ───────────────────────────────────────────────────────

    /// Decode instructions until the closing `end`, building IR nodes as we
    /// go. Operands are consumed from a value stack; whatever remains
    /// unconsumed when the `end` is reached becomes the sequence's children.
    fn read_expr_list(
        &mut self,
        module: &mut Module,
        locals: &[Type],
        results: Type,
    ) -> Result<Vec<ExprId>> {
        let mut stack: Vec<ExprId> = Vec::new();
        loop {
            let opcode = self.read_u8().context("unterminated expression body")?;
            match opcode {
                0x0B => return Ok(stack),
                0x00 => {
                    let e = module.unreachable();
                    stack.push(e);
                }
                0x01 => {
                    let e = module.nop();
                    stack.push(e);
                }
                0x02 => {
                    let declared = self.read_blocktype()?;
                    let inner = self.read_expr_list(module, locals, results)?;
                    let ty = sequence_type(module, &inner, declared);
                    stack.push(module.block(None, inner, ty)?);
                }
                0x0F => {
                    let value = if results != Type::NONE { stack.pop() } else { None };
                    stack.push(module.return_(value)?);
                }
                0x1A => {
                    let value = stack.pop().context("drop with empty operand stack")?;
                    stack.push(module.drop_(value)?);
                }
                0x20 => {
                    let index = self.read_leb_u32()?;
                    let ty = *locals
                        .get(index as usize)
                        .with_context(|| format!("local.get index {index} out of range"))?;
                    stack.push(module.local_get(index, ty));
                }
                0x21 => {
                    let index = self.read_leb_u32()?;
                    if index as usize >= locals.len() {
                        bail!("local.set index {index} out of range");
                    }
                    let value = stack.pop().context("local.set with empty operand stack")?;
                    stack.push(module.local_set(index, value)?);
                }
                0x41 => {
                    let v = leb128::read_i32(self.data, &mut self.pos)?;
                    stack.push(module.const_(Literal::I32(v)));
                }
                0x42 => {
                    let v = leb128::read_i64(self.data, &mut self.pos)?;
                    stack.push(module.const_(Literal::I64(v)));
                }
                0x43 => {
                    let bytes: [u8; 4] = self.read_bytes(4)?.try_into()?;
                    stack.push(module.const_(Literal::F32(f32::from_le_bytes(bytes))));
                }
                0x44 => {
                    let bytes: [u8; 8] = self.read_bytes(8)?.try_into()?;
                    stack.push(module.const_(Literal::F64(f64::from_le_bytes(bytes))));
                }
                other => {
                    if let Some(op) = UnaryOp::from_opcode(other) {
                        let value = stack
                            .pop()
                            .with_context(|| format!("{op:?} with empty operand stack"))?;
                        stack.push(module.unary(op, value, op.result_type())?);
                    } else if let Some(op) = BinaryOp::from_opcode(other) {
                        let right = stack
                            .pop()
                            .with_context(|| format!("{op:?} with empty operand stack"))?;
                        let left = stack
                            .pop()
                            .with_context(|| format!("{op:?} with one operand on the stack"))?;
                        stack.push(module.binary(op, left, right, op.result_type())?);
                    } else {
                        bail!("unsupported opcode: {other:#04x}");
                    }
                }
            }
        }
    }

    // ─── Primitive readers ─────────────────────────────────────────────────

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).context("unexpected end of input")?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.read_bytes(4)?.try_into()?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&e| e <= self.data.len())
            .context("unexpected end of input")?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_leb_u32(&mut self) -> Result<u32> {
        leb128::read_u32(self.data, &mut self.pos)
    }

    fn read_name(&mut self) -> Result<String> {
        let len = self.read_leb_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).context("name is not valid UTF-8")
    }

    fn read_valtype(&mut self) -> Result<Type> {
        let byte = self.read_u8()?;
        valtype_from_byte(byte)
    }

    fn read_valtype_list(&mut self) -> Result<Vec<Type>> {
        let count = self.read_leb_u32()?;
        let mut types = Vec::with_capacity(count as usize);
        for _ in 0..count {
            types.push(self.read_valtype()?);
        }
        Ok(types)
    }

    fn read_blocktype(&mut self) -> Result<Type> {
        let byte = self.read_u8()?;
        if byte == 0x40 {
            return Ok(Type::NONE);
        }
        valtype_from_byte(byte)
            .context("block types beyond the empty and single-value forms are not supported")
    }
}

fn valtype_from_byte(byte: u8) -> Result<Type> {
    Ok(match byte {
        0x7F => Type::I32,
        0x7E => Type::I64,
        0x7D => Type::F32,
        0x7C => Type::F64,
        0x7B => Type::V128,
        _ => bail!("unsupported value type: {byte:#04x}"),
    })
}

/// The result type of an instruction sequence: unreachable if any member is,
/// otherwise the declared type.
fn sequence_type(module: &Module, children: &[ExprId], declared: Type) -> Type {
    let unreachable = children
        .iter()
        .any(|&c| module.node(c).is_some_and(|n| n.ty == Type::UNREACHABLE));
    if unreachable {
        Type::UNREACHABLE
    } else {
        declared
    }
}

/// Collapse a decoded body into a single expression: empty bodies become a
/// nop, single expressions stand alone, anything else wraps in a block.
fn assemble_body(module: &mut Module, mut list: Vec<ExprId>) -> Result<ExprId> {
    match list.len() {
        0 => Ok(module.nop()),
        1 => Ok(list.remove(0)),
        _ => {
            let last = list[list.len() - 1];
            let last_ty = module.node(last).map_or(Type::NONE, |n| n.ty);
            let ty = sequence_type(module, &list, last_ty);
            module.block(None, list, ty)
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
