//! Instruction execution.
//!
//! The debugger never interprets opcodes itself; it drives an [`Executor`]
//! one instruction at a time and reads positions from the shared
//! [`CallStack`]. [`Interpreter`] is the reference executor for the integer
//! and structured-control subset of the instruction set.

use tracing::{debug, trace};

use crate::debugger::call_stack::CallStack;
use crate::error::{DebugResult, DebuggerError};
use crate::runtime::instruction::Opcode;
use crate::runtime::module::{Function, FunctionId, Module};
use crate::runtime::value::Value;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Result of executing one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStep {
    /// More instructions remain; the call stack's top frame points at the next one.
    Continue,
    /// The outermost frame returned; the call stack is empty.
    Completed(Vec<Value>),
}

/// Executes instructions on behalf of the debugger.
///
/// Implementations keep [`CallStack`] in lockstep with their own
/// activations: `push` on every entry, `pop` on every return, and `advance`
/// to the next instruction after each step.
pub trait Executor {
    /// Enter `function` with already-typed `args`, pushing its frame.
    fn enter(
        &mut self,
        module: &Module,
        function: FunctionId,
        args: Vec<Value>,
        stack: &mut CallStack,
    ) -> DebugResult<()>;

    /// Execute the instruction the top frame points at.
    fn step(&mut self, module: &Module, stack: &mut CallStack) -> DebugResult<ExecStep>;

    /// Current locals (parameters first) of the frame at `index`, outermost
    /// frame at 0.
    fn frame_locals(&self, _index: usize) -> Vec<Value> {
        Vec::new()
    }

    /// Drop every activation, e.g. after a trap.
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy)]
struct Label {
    /// Instruction index a branch to this label continues at.
    continuation: usize,
    height: usize,
    arity: usize,
    is_loop: bool,
}

#[derive(Debug)]
struct Activation {
    function: FunctionId,
    index: usize,
    locals: Vec<Value>,
    labels: Vec<Label>,
    base: usize,
    arity: usize,
}

enum Flow {
    Next,
    Jump(usize),
    Call(FunctionId),
    Return,
}

/// Reference interpreter.
#[derive(Debug)]
pub struct Interpreter {
    activations: Vec<Activation>,
    values: Vec<Value>,
    max_call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALL_DEPTH)
    }
}

impl Interpreter {
    pub fn new(max_call_depth: usize) -> Self {
        Self {
            activations: Vec::new(),
            values: Vec::new(),
            max_call_depth,
        }
    }

    fn push_activation(
        &mut self,
        function: &Function,
        mut locals: Vec<Value>,
        stack: &mut CallStack,
    ) -> DebugResult<()> {
        if self.activations.len() >= self.max_call_depth {
            return Err(DebuggerError::Trap("call stack exhausted".to_string()));
        }
        for ty in function.locals() {
            let zero = Value::default_for(*ty)
                .ok_or_else(|| DebuggerError::Trap(format!("unsupported local type {}", ty)))?;
            locals.push(zero);
        }
        self.activations.push(Activation {
            function: function.id(),
            index: 0,
            locals,
            labels: Vec::new(),
            base: self.values.len(),
            arity: function.signature().results.len(),
        });
        stack.push(function.id(), function.entry_offset());
        trace!(function = %function.id(), depth = stack.depth(), "Entered function");
        Ok(())
    }
}

impl Executor for Interpreter {
    fn enter(
        &mut self,
        module: &Module,
        function: FunctionId,
        args: Vec<Value>,
        stack: &mut CallStack,
    ) -> DebugResult<()> {
        let function = module
            .function(function)
            .ok_or(DebuggerError::UnknownFunction(function))?;
        self.push_activation(function, args, stack)
    }

    fn step(&mut self, module: &Module, stack: &mut CallStack) -> DebugResult<ExecStep> {
        let activation = self
            .activations
            .last_mut()
            .ok_or_else(|| DebuggerError::Trap("no active frame".to_string()))?;
        let function = module
            .function(activation.function)
            .ok_or(DebuggerError::UnknownFunction(activation.function))?;
        let index = activation.index;
        let instruction = function.instruction(index).ok_or_else(|| {
            DebuggerError::Trap(format!("ran past the end of {}", function.name()))
        })?;
        let values = &mut self.values;

        let flow = match &instruction.opcode {
            Opcode::Unreachable => return Err(DebuggerError::Trap("unreachable executed".into())),
            Opcode::Nop => Flow::Next,
            Opcode::Block(ty) | Opcode::Loop(ty) => {
                let (params, results) = module.block_arity(*ty);
                let is_loop = matches!(instruction.opcode, Opcode::Loop(_));
                let continuation = if is_loop {
                    index + 1
                } else {
                    end_of(function, index)? + 1
                };
                activation.labels.push(Label {
                    continuation,
                    height: values.len().saturating_sub(params),
                    arity: if is_loop { params } else { results },
                    is_loop,
                });
                Flow::Next
            }
            Opcode::If(ty) => {
                let condition = pop_i32(values)?;
                let (params, results) = module.block_arity(*ty);
                let span = function.span(index).ok_or_else(|| unmatched(index))?;
                activation.labels.push(Label {
                    continuation: span.end_index + 1,
                    height: values.len().saturating_sub(params),
                    arity: results,
                    is_loop: false,
                });
                match (condition != 0, span.else_index) {
                    (true, _) => Flow::Next,
                    (false, Some(else_index)) => Flow::Jump(else_index + 1),
                    (false, None) => Flow::Jump(span.end_index),
                }
            }
            Opcode::Else => Flow::Jump(end_of(function, index)?),
            Opcode::End => match activation.labels.pop() {
                Some(_) => Flow::Next,
                None => Flow::Return,
            },
            Opcode::Br(depth) => branch(&mut activation.labels, values, *depth)?,
            Opcode::BrIf(depth) => {
                if pop_i32(values)? != 0 {
                    branch(&mut activation.labels, values, *depth)?
                } else {
                    Flow::Next
                }
            }
            Opcode::Return => Flow::Return,
            Opcode::Call(callee) => Flow::Call(FunctionId(*callee)),
            Opcode::Drop => {
                pop(values)?;
                Flow::Next
            }
            Opcode::Select => {
                let condition = pop_i32(values)?;
                let second = pop(values)?;
                let first = pop(values)?;
                values.push(if condition != 0 { first } else { second });
                Flow::Next
            }
            Opcode::LocalGet(local) => {
                values.push(*local_slot(&mut activation.locals, *local)?);
                Flow::Next
            }
            Opcode::LocalSet(local) => {
                let value = pop(values)?;
                *local_slot(&mut activation.locals, *local)? = value;
                Flow::Next
            }
            Opcode::LocalTee(local) => {
                let value = *values.last().ok_or_else(stack_underflow)?;
                *local_slot(&mut activation.locals, *local)? = value;
                Flow::Next
            }
            Opcode::I32Const(value) => {
                values.push(Value::I32(*value));
                Flow::Next
            }
            Opcode::I64Const(value) => {
                values.push(Value::I64(*value));
                Flow::Next
            }
            Opcode::I32Eqz => {
                let v = pop_i32(values)?;
                values.push(Value::I32((v == 0) as i32));
                Flow::Next
            }
            Opcode::I64Eqz => {
                let v = pop_i64(values)?;
                values.push(Value::I32((v == 0) as i32));
                Flow::Next
            }
            Opcode::I32Eq => i32_cmp(values, |a, b| a == b)?,
            Opcode::I32Ne => i32_cmp(values, |a, b| a != b)?,
            Opcode::I32LtS => i32_cmp(values, |a, b| a < b)?,
            Opcode::I32GtS => i32_cmp(values, |a, b| a > b)?,
            Opcode::I32LeS => i32_cmp(values, |a, b| a <= b)?,
            Opcode::I32GeS => i32_cmp(values, |a, b| a >= b)?,
            Opcode::I32Add => i32_binop(values, i32::wrapping_add)?,
            Opcode::I32Sub => i32_binop(values, i32::wrapping_sub)?,
            Opcode::I32Mul => i32_binop(values, i32::wrapping_mul)?,
            Opcode::I32And => i32_binop(values, |a, b| a & b)?,
            Opcode::I32Or => i32_binop(values, |a, b| a | b)?,
            Opcode::I32Xor => i32_binop(values, |a, b| a ^ b)?,
            Opcode::I64Add => i64_binop(values, i64::wrapping_add)?,
            Opcode::I64Sub => i64_binop(values, i64::wrapping_sub)?,
            Opcode::I64Mul => i64_binop(values, i64::wrapping_mul)?,
            Opcode::Other(name) => {
                return Err(DebuggerError::Trap(format!("unsupported instruction {}", name)))
            }
        };

        match flow {
            Flow::Next => {
                activation.index = index + 1;
                stack.advance(offset_of(function, index + 1));
            }
            Flow::Jump(target) => {
                activation.index = target;
                stack.advance(offset_of(function, target));
            }
            Flow::Call(callee_id) => {
                activation.index = index + 1;
                stack.advance(offset_of(function, index + 1));

                let callee = module
                    .function(callee_id)
                    .ok_or(DebuggerError::UnknownFunction(callee_id))?;
                let params = callee.signature().params.len();
                if self.values.len() < params {
                    return Err(stack_underflow());
                }
                let args = self.values.split_off(self.values.len() - params);
                self.push_activation(callee, args, stack)?;
            }
            Flow::Return => {
                let arity = activation.arity;
                if self.values.len() < arity {
                    return Err(stack_underflow());
                }
                let results = self.values.split_off(self.values.len() - arity);
                self.values.truncate(activation.base);
                self.activations.pop();
                stack.pop();
                trace!(depth = stack.depth(), "Returned from function");

                if self.activations.is_empty() {
                    debug!(results = results.len(), "Outermost frame returned");
                    return Ok(ExecStep::Completed(results));
                }
                self.values.extend(results);
            }
        }
        Ok(ExecStep::Continue)
    }

    fn frame_locals(&self, index: usize) -> Vec<Value> {
        self.activations
            .get(index)
            .map(|a| a.locals.clone())
            .unwrap_or_default()
    }

    fn reset(&mut self) {
        self.activations.clear();
        self.values.clear();
    }
}

fn branch(labels: &mut Vec<Label>, values: &mut Vec<Value>, depth: u32) -> DebugResult<Flow> {
    let depth = depth as usize;
    if depth >= labels.len() {
        return Ok(Flow::Return);
    }
    let target = labels.len() - 1 - depth;
    let label = labels[target];
    if values.len() < label.arity {
        return Err(stack_underflow());
    }
    let kept = values.split_off(values.len() - label.arity);
    values.truncate(label.height);
    values.extend(kept);
    labels.truncate(if label.is_loop { target + 1 } else { target });
    Ok(Flow::Jump(label.continuation))
}

fn end_of(function: &Function, index: usize) -> DebugResult<usize> {
    function
        .span(index)
        .map(|s| s.end_index)
        .ok_or_else(|| unmatched(index))
}

fn offset_of(function: &Function, index: usize) -> u32 {
    function
        .instruction(index)
        .map(|i| i.offset)
        .unwrap_or(function.body_end())
}

fn local_slot(locals: &mut [Value], index: u32) -> DebugResult<&mut Value> {
    locals
        .get_mut(index as usize)
        .ok_or_else(|| DebuggerError::Trap(format!("local {} out of range", index)))
}

fn pop(values: &mut Vec<Value>) -> DebugResult<Value> {
    values.pop().ok_or_else(stack_underflow)
}

fn pop_i32(values: &mut Vec<Value>) -> DebugResult<i32> {
    pop(values)?
        .as_i32()
        .ok_or_else(|| DebuggerError::Trap("type mismatch: expected i32".to_string()))
}

fn pop_i64(values: &mut Vec<Value>) -> DebugResult<i64> {
    pop(values)?
        .as_i64()
        .ok_or_else(|| DebuggerError::Trap("type mismatch: expected i64".to_string()))
}

fn i32_binop(values: &mut Vec<Value>, op: impl Fn(i32, i32) -> i32) -> DebugResult<Flow> {
    let b = pop_i32(values)?;
    let a = pop_i32(values)?;
    values.push(Value::I32(op(a, b)));
    Ok(Flow::Next)
}

fn i32_cmp(values: &mut Vec<Value>, op: impl Fn(i32, i32) -> bool) -> DebugResult<Flow> {
    i32_binop(values, |a, b| op(a, b) as i32)
}

fn i64_binop(values: &mut Vec<Value>, op: impl Fn(i64, i64) -> i64) -> DebugResult<Flow> {
    let b = pop_i64(values)?;
    let a = pop_i64(values)?;
    values.push(Value::I64(op(a, b)));
    Ok(Flow::Next)
}

fn stack_underflow() -> DebuggerError {
    DebuggerError::Trap("value stack underflow".to_string())
}

fn unmatched(index: usize) -> DebuggerError {
    DebuggerError::Trap(format!("unmatched structured instruction at index {}", index))
}
