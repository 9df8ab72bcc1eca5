//! Read-only view of a loaded module.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::runtime::instruction::{BlockSpan, BlockType, Instruction};

/// Dense index of a function inside its module.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FunctionId(pub u32);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// WASM value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasmType {
    I32,
    I64,
    F32,
    F64,
    V128,
    Ref,
}

impl From<wasmparser::ValType> for WasmType {
    fn from(ty: wasmparser::ValType) -> Self {
        match ty {
            wasmparser::ValType::I32 => WasmType::I32,
            wasmparser::ValType::I64 => WasmType::I64,
            wasmparser::ValType::F32 => WasmType::F32,
            wasmparser::ValType::F64 => WasmType::F64,
            wasmparser::ValType::V128 => WasmType::V128,
            wasmparser::ValType::Ref(_) => WasmType::Ref,
        }
    }
}

impl fmt::Display for WasmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WasmType::I32 => write!(f, "i32"),
            WasmType::I64 => write!(f, "i64"),
            WasmType::F32 => write!(f, "f32"),
            WasmType::F64 => write!(f, "f64"),
            WasmType::V128 => write!(f, "v128"),
            WasmType::Ref => write!(f, "ref"),
        }
    }
}

/// Parameter and result types of a function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<WasmType>,
    pub results: Vec<WasmType>,
}

impl Signature {
    pub fn new(params: impl Into<Vec<WasmType>>, results: impl Into<Vec<WasmType>>) -> Self {
        Self {
            params: params.into(),
            results: results.into(),
        }
    }
}

impl From<&wasmparser::FuncType> for Signature {
    fn from(ty: &wasmparser::FuncType) -> Self {
        Self {
            params: ty.params().iter().map(|t| (*t).into()).collect(),
            results: ty.results().iter().map(|t| (*t).into()).collect(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|t| t.to_string()).collect();
        let results: Vec<String> = self.results.iter().map(|t| t.to_string()).collect();
        write!(f, "({}) -> [{}]", params.join(", "), results.join(", "))
    }
}

/// A byte offset inside a specific function.
///
/// Offsets are module-absolute, the same numbering as
/// [`Function::body_offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub function: FunctionId,
    pub offset: u32,
}

impl Location {
    pub fn new(function: FunctionId, offset: u32) -> Self {
        Self { function, offset }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func {} @ {}", self.function, self.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    pub function: FunctionId,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub(crate) id: FunctionId,
    pub(crate) name: String,
    pub(crate) signature: Signature,
    pub(crate) locals: Vec<WasmType>,
    pub(crate) body_offset: u32,
    pub(crate) body_end: u32,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) spans: Vec<Option<BlockSpan>>,
}

impl Function {
    pub fn id(&self) -> FunctionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Declared locals, parameters excluded.
    pub fn locals(&self) -> &[WasmType] {
        &self.locals
    }

    /// Offset of the first instruction, after the local declarations.
    pub fn body_offset(&self) -> u32 {
        self.body_offset
    }

    /// Offset one past the last instruction byte.
    pub fn body_end(&self) -> u32 {
        self.body_end
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn span(&self, index: usize) -> Option<BlockSpan> {
        self.spans.get(index).copied().flatten()
    }

    /// Index of the instruction starting exactly at `offset`.
    pub fn index_of(&self, offset: u32) -> Option<usize> {
        self.instructions
            .binary_search_by_key(&offset, |i| i.offset)
            .ok()
    }

    /// Index of the instruction beginning at or containing `offset`.
    pub fn index_containing(&self, offset: u32) -> Option<usize> {
        let index = self
            .instructions
            .partition_point(|i| i.offset <= offset)
            .checked_sub(1)?;
        self.instructions[index].contains(offset).then_some(index)
    }

    /// Instruction beginning at or containing `offset`.
    pub fn instruction_at(&self, offset: u32) -> Option<&Instruction> {
        self.index_containing(offset).map(|i| &self.instructions[i])
    }

    /// Index of the first instruction starting at or after `offset`.
    pub fn index_at_or_after(&self, offset: u32) -> Option<usize> {
        let index = self.instructions.partition_point(|i| i.offset < offset);
        (index < self.instructions.len()).then_some(index)
    }

    /// First instruction starting at or after `offset`.
    pub fn instruction_at_or_after(&self, offset: u32) -> Option<&Instruction> {
        self.index_at_or_after(offset).map(|i| &self.instructions[i])
    }

    pub fn is_breakable_offset(&self, offset: u32) -> bool {
        self.index_of(offset)
            .map(|i| self.instructions[i].breakable)
            .unwrap_or(false)
    }

    pub fn breakable_offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.instructions
            .iter()
            .filter(|i| i.breakable)
            .map(|i| i.offset)
    }

    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.body_offset && offset < self.body_end
    }

    pub fn entry_offset(&self) -> u32 {
        self.instructions
            .first()
            .map(|i| i.offset)
            .unwrap_or(self.body_offset)
    }
}

/// An immutable, loaded module.
#[derive(Debug, Clone)]
pub struct Module {
    pub(crate) url: String,
    pub(crate) types: Vec<Signature>,
    pub(crate) functions: Vec<Function>,
    pub(crate) exports: Vec<Export>,
}

impl Module {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.0 as usize)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    pub fn export(&self, name: &str) -> Option<FunctionId> {
        self.exports
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.function)
    }

    /// The function whose body holds `offset`, or the first one starting
    /// after it. Never looks backward.
    pub fn function_at_or_after(&self, offset: u32) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.contains(offset) || f.body_offset > offset)
    }

    /// Parameter and result counts of a structured block type.
    pub fn block_arity(&self, ty: BlockType) -> (usize, usize) {
        match ty {
            BlockType::Empty => (0, 0),
            BlockType::Value(_) => (0, 1),
            BlockType::Func(index) => self
                .types
                .get(index as usize)
                .map(|sig| (sig.params.len(), sig.results.len()))
                .unwrap_or((0, 0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::instruction::Opcode;

    fn function() -> Function {
        // local.get 0 | i32.const 1024 (3 bytes) | call 0 | end
        let instructions = vec![
            Instruction {
                offset: 20,
                len: 2,
                opcode: Opcode::LocalGet(0),
                breakable: true,
            },
            Instruction {
                offset: 22,
                len: 3,
                opcode: Opcode::I32Const(1024),
                breakable: true,
            },
            Instruction {
                offset: 25,
                len: 2,
                opcode: Opcode::Call(0),
                breakable: true,
            },
            Instruction {
                offset: 27,
                len: 1,
                opcode: Opcode::End,
                breakable: true,
            },
        ];
        Function {
            id: FunctionId(0),
            name: "f".into(),
            signature: Signature::default(),
            locals: vec![],
            body_offset: 20,
            body_end: 28,
            spans: vec![None; instructions.len()],
            instructions,
        }
    }

    #[test]
    fn instruction_lookup_includes_immediate_bytes() {
        let f = function();
        assert_eq!(f.instruction_at(23).map(|i| i.offset), Some(22));
        assert_eq!(f.instruction_at(24).map(|i| i.offset), Some(22));
        assert_eq!(f.instruction_at(25).map(|i| i.offset), Some(25));
        assert!(f.instruction_at(28).is_none());
        assert!(f.instruction_at(19).is_none());
    }

    #[test]
    fn exact_boundaries_only_for_breakable_offsets() {
        let f = function();
        assert!(f.is_breakable_offset(22));
        assert!(!f.is_breakable_offset(23));
        assert_eq!(f.breakable_offsets().collect::<Vec<_>>(), vec![20, 22, 25, 27]);
    }

    #[test]
    fn at_or_after_never_looks_backward() {
        let f = function();
        assert_eq!(f.index_at_or_after(3), Some(0));
        assert_eq!(f.index_at_or_after(22), Some(1));
        assert_eq!(f.index_at_or_after(23), Some(2));
        assert_eq!(f.instruction_at_or_after(26).map(|i| i.offset), Some(27));
        assert_eq!(f.index_at_or_after(28), None);
    }

    #[test]
    fn signature_display() {
        let sig = Signature::new([WasmType::I32], [WasmType::I32]);
        assert_eq!(sig.to_string(), "(i32) -> [i32]");
    }
}
