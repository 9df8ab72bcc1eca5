//! Runtime sub-system: the bytecode model and its execution.
//!
//! Sub-modules:
//! - [`module`]: Loaded module, functions, signatures and locations.
//! - [`instruction`]: Instruction decoding and the breakability policy.
//! - [`loader`]: Validation and decoding of `.wasm` binaries.
//! - [`builder`]: Minimal binary encoder for fixtures and benchmarks.
//! - [`executor`]: The [`Executor`] seam and the reference [`Interpreter`].
//! - [`invoker`]: Export resolution and argument checking.
//! - [`parser`]: JSON argument parsing and type-aware normalisation.
//! - [`result`]: Pause, completion and outcome types.
//! - [`value`]: Runtime values.

pub mod builder;
pub mod executor;
pub mod instruction;
pub mod invoker;
pub mod loader;
pub mod module;
pub mod parser;
pub mod result;
pub mod value;

pub use executor::{ExecStep, Executor, Interpreter};
pub use instruction::{BreakablePolicy, EndPolicy, Instruction, InstructionParser, Opcode};
pub use invoker::{prepare_invocation, Invocation};
pub use loader::{load_module, load_module_file, parse_module};
pub use module::{Function, FunctionId, Location, Module, Signature, WasmType};
pub use result::{BreakpointId, CallFrameSnapshot, PauseReason, PausedEvent, RunCompletion, RunOutcome};
pub use value::Value;
