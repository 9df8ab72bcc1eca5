//! Instruction decoding and breakability.
//!
//! A function body is decoded once, at load time, into a flat list of
//! [`Instruction`]s. Each instruction records its module-absolute offset, its
//! byte length (immediates included) and whether a debugger may stop on it.
//! Structured openers (`block`, `loop`, `if`) also get a [`BlockSpan`] naming
//! their matching `else`/`end`, which the interpreter uses for branching.

use std::fmt;

use serde::{Deserialize, Serialize};
use wasmparser::{Operator, OperatorsReader};

use crate::error::{DebugResult, DebuggerError};
use crate::runtime::module::WasmType;

/// Type annotation of a structured control instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Empty,
    Value(WasmType),
    Func(u32),
}

impl From<wasmparser::BlockType> for BlockType {
    fn from(ty: wasmparser::BlockType) -> Self {
        match ty {
            wasmparser::BlockType::Empty => BlockType::Empty,
            wasmparser::BlockType::Type(ty) => BlockType::Value(ty.into()),
            wasmparser::BlockType::FuncType(index) => BlockType::Func(index),
        }
    }
}

/// Decoded opcode together with its immediates.
///
/// Only the integer and control subset executed by the reference interpreter
/// is spelled out; everything else decodes to [`Opcode::Other`], which still
/// has exact boundaries and can carry breakpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    Unreachable,
    Nop,
    Block(BlockType),
    Loop(BlockType),
    If(BlockType),
    Else,
    End,
    Br(u32),
    BrIf(u32),
    Return,
    Call(u32),
    Drop,
    Select,
    LocalGet(u32),
    LocalSet(u32),
    LocalTee(u32),
    I32Const(i32),
    I64Const(i64),
    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32GtS,
    I32LeS,
    I32GeS,
    I32Add,
    I32Sub,
    I32Mul,
    I32And,
    I32Or,
    I32Xor,
    I64Eqz,
    I64Add,
    I64Sub,
    I64Mul,
    Other(String),
}

impl Opcode {
    pub fn kind(&self) -> InstructionKind {
        match self {
            Opcode::Block(_) => InstructionKind::Block,
            Opcode::Loop(_) => InstructionKind::Loop,
            Opcode::If(_) => InstructionKind::If,
            Opcode::Else => InstructionKind::Else,
            Opcode::End => InstructionKind::End,
            _ => InstructionKind::Plain,
        }
    }

    pub fn mnemonic(&self) -> &str {
        match self {
            Opcode::Unreachable => "unreachable",
            Opcode::Nop => "nop",
            Opcode::Block(_) => "block",
            Opcode::Loop(_) => "loop",
            Opcode::If(_) => "if",
            Opcode::Else => "else",
            Opcode::End => "end",
            Opcode::Br(_) => "br",
            Opcode::BrIf(_) => "br_if",
            Opcode::Return => "return",
            Opcode::Call(_) => "call",
            Opcode::Drop => "drop",
            Opcode::Select => "select",
            Opcode::LocalGet(_) => "local.get",
            Opcode::LocalSet(_) => "local.set",
            Opcode::LocalTee(_) => "local.tee",
            Opcode::I32Const(_) => "i32.const",
            Opcode::I64Const(_) => "i64.const",
            Opcode::I32Eqz => "i32.eqz",
            Opcode::I32Eq => "i32.eq",
            Opcode::I32Ne => "i32.ne",
            Opcode::I32LtS => "i32.lt_s",
            Opcode::I32GtS => "i32.gt_s",
            Opcode::I32LeS => "i32.le_s",
            Opcode::I32GeS => "i32.ge_s",
            Opcode::I32Add => "i32.add",
            Opcode::I32Sub => "i32.sub",
            Opcode::I32Mul => "i32.mul",
            Opcode::I32And => "i32.and",
            Opcode::I32Or => "i32.or",
            Opcode::I32Xor => "i32.xor",
            Opcode::I64Eqz => "i64.eqz",
            Opcode::I64Add => "i64.add",
            Opcode::I64Sub => "i64.sub",
            Opcode::I64Mul => "i64.mul",
            Opcode::Other(name) => name,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Br(depth) | Opcode::BrIf(depth) => write!(f, "{} {}", self.mnemonic(), depth),
            Opcode::Call(index) => write!(f, "call {}", index),
            Opcode::LocalGet(index) | Opcode::LocalSet(index) | Opcode::LocalTee(index) => {
                write!(f, "{} {}", self.mnemonic(), index)
            }
            Opcode::I32Const(value) => write!(f, "i32.const {}", value),
            Opcode::I64Const(value) => write!(f, "i64.const {}", value),
            _ => f.write_str(self.mnemonic()),
        }
    }
}

/// Coarse classification used by the breakability policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    Block,
    Loop,
    If,
    Else,
    End,
    Plain,
}

/// One decoded instruction of a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Module-absolute offset of the opcode byte.
    pub offset: u32,
    /// Length in bytes, immediates included.
    pub len: u32,
    pub opcode: Opcode,
    pub breakable: bool,
}

impl Instruction {
    pub fn end(&self) -> u32 {
        self.offset + self.len
    }

    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.offset && offset < self.end()
    }
}

/// When an `end` marker may be stopped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndPolicy {
    /// Only the `end` closing the function body.
    #[default]
    FinalOnly,
    Always,
    Never,
}

/// Which structured-control markers count as breakable instructions.
///
/// Plain opcodes are always breakable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BreakablePolicy {
    pub block: bool,
    pub loop_head: bool,
    pub if_head: bool,
    pub else_marker: bool,
    pub end: EndPolicy,
}

impl Default for BreakablePolicy {
    fn default() -> Self {
        Self {
            block: false,
            loop_head: true,
            if_head: true,
            else_marker: false,
            end: EndPolicy::FinalOnly,
        }
    }
}

impl BreakablePolicy {
    pub fn is_breakable(&self, kind: InstructionKind, is_final: bool) -> bool {
        match kind {
            InstructionKind::Plain => true,
            InstructionKind::Block => self.block,
            InstructionKind::Loop => self.loop_head,
            InstructionKind::If => self.if_head,
            InstructionKind::Else => self.else_marker,
            InstructionKind::End => match self.end {
                EndPolicy::FinalOnly => is_final,
                EndPolicy::Always => true,
                EndPolicy::Never => false,
            },
        }
    }
}

/// Matching markers of a structured opener (or of an `else`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub else_index: Option<usize>,
    pub end_index: usize,
}

/// Instructions of one body plus the block spans aligned with them.
#[derive(Debug, Clone, Default)]
pub struct DecodedBody {
    pub instructions: Vec<Instruction>,
    pub spans: Vec<Option<BlockSpan>>,
}

/// Decodes operator streams into [`Instruction`]s under a [`BreakablePolicy`].
pub struct InstructionParser<'p> {
    policy: &'p BreakablePolicy,
}

impl<'p> InstructionParser<'p> {
    pub fn new(policy: &'p BreakablePolicy) -> Self {
        Self { policy }
    }

    pub fn parse(&self, mut reader: OperatorsReader<'_>) -> DebugResult<DecodedBody> {
        let mut raw: Vec<(u32, Opcode)> = Vec::new();
        while !reader.eof() {
            let (op, offset) = reader.read_with_offset().map_err(load_error)?;
            raw.push((offset as u32, convert(&op)));
        }
        let body_end = reader.original_position() as u32;

        let last = raw.len().saturating_sub(1);
        let mut instructions = Vec::with_capacity(raw.len());
        for (index, (offset, opcode)) in raw.iter().enumerate() {
            let next = raw.get(index + 1).map(|(o, _)| *o).unwrap_or(body_end);
            let breakable = self.policy.is_breakable(opcode.kind(), index == last);
            instructions.push(Instruction {
                offset: *offset,
                len: next - offset,
                opcode: opcode.clone(),
                breakable,
            });
        }

        let spans = match_blocks(&instructions)?;
        Ok(DecodedBody {
            instructions,
            spans,
        })
    }
}

fn match_blocks(instructions: &[Instruction]) -> DebugResult<Vec<Option<BlockSpan>>> {
    let mut spans = vec![None; instructions.len()];
    // (opener index, else index)
    let mut open: Vec<(usize, Option<usize>)> = Vec::new();

    for (index, instruction) in instructions.iter().enumerate() {
        match instruction.opcode.kind() {
            InstructionKind::Block | InstructionKind::Loop | InstructionKind::If => {
                open.push((index, None));
            }
            InstructionKind::Else => match open.last_mut() {
                Some((_, else_index)) => *else_index = Some(index),
                None => {
                    return Err(DebuggerError::ModuleLoad(format!(
                        "`else` without `if` at offset {}",
                        instruction.offset
                    )))
                }
            },
            InstructionKind::End => {
                if let Some((opener, else_index)) = open.pop() {
                    spans[opener] = Some(BlockSpan {
                        else_index,
                        end_index: index,
                    });
                    if let Some(else_index) = else_index {
                        spans[else_index] = Some(BlockSpan {
                            else_index: None,
                            end_index: index,
                        });
                    }
                }
            }
            InstructionKind::Plain => {}
        }
    }

    if let Some((opener, _)) = open.first() {
        return Err(DebuggerError::ModuleLoad(format!(
            "unterminated block at offset {}",
            instructions[*opener].offset
        )));
    }
    Ok(spans)
}

fn convert(op: &Operator<'_>) -> Opcode {
    match op {
        Operator::Unreachable => Opcode::Unreachable,
        Operator::Nop => Opcode::Nop,
        Operator::Block { blockty } => Opcode::Block((*blockty).into()),
        Operator::Loop { blockty } => Opcode::Loop((*blockty).into()),
        Operator::If { blockty } => Opcode::If((*blockty).into()),
        Operator::Else => Opcode::Else,
        Operator::End => Opcode::End,
        Operator::Br { relative_depth } => Opcode::Br(*relative_depth),
        Operator::BrIf { relative_depth } => Opcode::BrIf(*relative_depth),
        Operator::Return => Opcode::Return,
        Operator::Call { function_index } => Opcode::Call(*function_index),
        Operator::Drop => Opcode::Drop,
        Operator::Select => Opcode::Select,
        Operator::LocalGet { local_index } => Opcode::LocalGet(*local_index),
        Operator::LocalSet { local_index } => Opcode::LocalSet(*local_index),
        Operator::LocalTee { local_index } => Opcode::LocalTee(*local_index),
        Operator::I32Const { value } => Opcode::I32Const(*value),
        Operator::I64Const { value } => Opcode::I64Const(*value),
        Operator::I32Eqz => Opcode::I32Eqz,
        Operator::I32Eq => Opcode::I32Eq,
        Operator::I32Ne => Opcode::I32Ne,
        Operator::I32LtS => Opcode::I32LtS,
        Operator::I32GtS => Opcode::I32GtS,
        Operator::I32LeS => Opcode::I32LeS,
        Operator::I32GeS => Opcode::I32GeS,
        Operator::I32Add => Opcode::I32Add,
        Operator::I32Sub => Opcode::I32Sub,
        Operator::I32Mul => Opcode::I32Mul,
        Operator::I32And => Opcode::I32And,
        Operator::I32Or => Opcode::I32Or,
        Operator::I32Xor => Opcode::I32Xor,
        Operator::I64Eqz => Opcode::I64Eqz,
        Operator::I64Add => Opcode::I64Add,
        Operator::I64Sub => Opcode::I64Sub,
        Operator::I64Mul => Opcode::I64Mul,
        other => Opcode::Other(operator_name(other)),
    }
}

/// `F32Add`, `MemoryGrow { mem: 0 }` and friends, reduced to the variant name.
fn operator_name(op: &Operator<'_>) -> String {
    let debug = format!("{:?}", op);
    debug
        .split(|c: char| c == ' ' || c == '{' || c == '(')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn load_error(err: wasmparser::BinaryReaderError) -> DebuggerError {
    DebuggerError::ModuleLoad(err.to_string())
}
