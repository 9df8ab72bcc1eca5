//! Minimal module encoder.
//!
//! Produces binaries with type, function, export, code and name sections,
//! enough to describe the functions the debugger is exercised against.
//! Function bodies are raw opcode bytes; the closing `end` is appended
//! automatically.

use crate::runtime::module::{Signature, WasmType};

/// Opcode bytes for hand-written bodies.
pub mod op {
    pub const UNREACHABLE: u8 = 0x00;
    pub const NOP: u8 = 0x01;
    pub const BLOCK: u8 = 0x02;
    pub const LOOP: u8 = 0x03;
    pub const IF: u8 = 0x04;
    pub const ELSE: u8 = 0x05;
    pub const END: u8 = 0x0b;
    pub const BR: u8 = 0x0c;
    pub const BR_IF: u8 = 0x0d;
    pub const RETURN: u8 = 0x0f;
    pub const CALL: u8 = 0x10;
    pub const DROP: u8 = 0x1a;
    pub const SELECT: u8 = 0x1b;
    pub const LOCAL_GET: u8 = 0x20;
    pub const LOCAL_SET: u8 = 0x21;
    pub const LOCAL_TEE: u8 = 0x22;
    pub const I32_CONST: u8 = 0x41;
    pub const I64_CONST: u8 = 0x42;
    pub const I32_EQZ: u8 = 0x45;
    pub const I32_EQ: u8 = 0x46;
    pub const I32_NE: u8 = 0x47;
    pub const I32_LT_S: u8 = 0x48;
    pub const I32_GT_S: u8 = 0x4a;
    pub const I32_LE_S: u8 = 0x4c;
    pub const I32_GE_S: u8 = 0x4e;
    pub const I64_EQZ: u8 = 0x50;
    pub const I32_ADD: u8 = 0x6a;
    pub const I32_SUB: u8 = 0x6b;
    pub const I32_MUL: u8 = 0x6c;
    pub const I32_AND: u8 = 0x71;
    pub const I32_OR: u8 = 0x72;
    pub const I32_XOR: u8 = 0x73;
    pub const I64_ADD: u8 = 0x7c;
    pub const I64_SUB: u8 = 0x7d;
    pub const I64_MUL: u8 = 0x7e;

    /// Block type byte for blocks without results.
    pub const VOID: u8 = 0x40;
    pub const TYPE_I32: u8 = 0x7f;
    pub const TYPE_I64: u8 = 0x7e;
}

/// `i32.const value` with a signed LEB128 immediate.
pub fn i32_const(value: i32) -> Vec<u8> {
    let mut bytes = vec![op::I32_CONST];
    write_i64(&mut bytes, value as i64);
    bytes
}

/// `i64.const value` with a signed LEB128 immediate.
pub fn i64_const(value: i64) -> Vec<u8> {
    let mut bytes = vec![op::I64_CONST];
    write_i64(&mut bytes, value);
    bytes
}

pub fn write_u32(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub fn write_i64(out: &mut Vec<u8>, mut value: i64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    write_u32(out, name.len() as u32);
    out.extend_from_slice(name.as_bytes());
}

fn type_byte(ty: WasmType) -> u8 {
    match ty {
        WasmType::I32 => 0x7f,
        WasmType::I64 => 0x7e,
        WasmType::F32 => 0x7d,
        WasmType::F64 => 0x7c,
        WasmType::V128 => 0x7b,
        WasmType::Ref => 0x70,
    }
}

#[derive(Debug, Clone)]
struct FunctionDef {
    name: String,
    type_index: u32,
    locals: Vec<(u32, WasmType)>,
    body: Vec<u8>,
    export: Option<String>,
}

#[derive(Debug, Default)]
pub struct ModuleBuilder {
    types: Vec<Signature>,
    functions: Vec<FunctionDef>,
}

/// Handle returned by [`ModuleBuilder::add_function`] for chained setup.
pub struct FunctionBuilder<'b> {
    builder: &'b mut ModuleBuilder,
    index: usize,
}

impl<'b> FunctionBuilder<'b> {
    pub fn locals(self, count: u32, ty: WasmType) -> Self {
        self.builder.functions[self.index].locals.push((count, ty));
        self
    }

    pub fn body(self, bytes: &[u8]) -> Self {
        let mut body = bytes.to_vec();
        body.push(op::END);
        self.builder.functions[self.index].body = body;
        self
    }

    pub fn export_as(self, name: &str) -> Self {
        self.builder.functions[self.index].export = Some(name.to_string());
        self
    }

    pub fn index(&self) -> u32 {
        self.index as u32
    }
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, name: &str, signature: Signature) -> FunctionBuilder<'_> {
        let type_index = match self.types.iter().position(|t| *t == signature) {
            Some(index) => index,
            None => {
                self.types.push(signature);
                self.types.len() - 1
            }
        } as u32;
        self.functions.push(FunctionDef {
            name: name.to_string(),
            type_index,
            locals: Vec::new(),
            body: vec![op::END],
            export: None,
        });
        let index = self.functions.len() - 1;
        FunctionBuilder {
            builder: self,
            index,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut module = b"\0asm".to_vec();
        module.extend_from_slice(&1u32.to_le_bytes());

        let mut types = Vec::new();
        write_u32(&mut types, self.types.len() as u32);
        for sig in &self.types {
            types.push(0x60);
            write_u32(&mut types, sig.params.len() as u32);
            types.extend(sig.params.iter().map(|t| type_byte(*t)));
            write_u32(&mut types, sig.results.len() as u32);
            types.extend(sig.results.iter().map(|t| type_byte(*t)));
        }
        section(&mut module, 1, &types);

        let mut functions = Vec::new();
        write_u32(&mut functions, self.functions.len() as u32);
        for f in &self.functions {
            write_u32(&mut functions, f.type_index);
        }
        section(&mut module, 3, &functions);

        let exported: Vec<(usize, &str)> = self
            .functions
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.export.as_deref().map(|name| (i, name)))
            .collect();
        let mut exports = Vec::new();
        write_u32(&mut exports, exported.len() as u32);
        for (index, name) in exported {
            write_name(&mut exports, name);
            exports.push(0x00);
            write_u32(&mut exports, index as u32);
        }
        section(&mut module, 7, &exports);

        let mut code = Vec::new();
        write_u32(&mut code, self.functions.len() as u32);
        for f in &self.functions {
            let mut entry = Vec::new();
            write_u32(&mut entry, f.locals.len() as u32);
            for (count, ty) in &f.locals {
                write_u32(&mut entry, *count);
                entry.push(type_byte(*ty));
            }
            entry.extend_from_slice(&f.body);
            write_u32(&mut code, entry.len() as u32);
            code.extend_from_slice(&entry);
        }
        section(&mut module, 10, &code);

        let mut names = Vec::new();
        write_u32(&mut names, self.functions.len() as u32);
        for (index, f) in self.functions.iter().enumerate() {
            write_u32(&mut names, index as u32);
            write_name(&mut names, &f.name);
        }
        let mut name_section = Vec::new();
        write_name(&mut name_section, "name");
        name_section.push(1);
        write_u32(&mut name_section, names.len() as u32);
        name_section.extend_from_slice(&names);
        section(&mut module, 0, &name_section);

        module
    }
}

fn section(module: &mut Vec<u8>, id: u8, contents: &[u8]) {
    module.push(id);
    write_u32(module, contents.len() as u32);
    module.extend_from_slice(contents);
}
