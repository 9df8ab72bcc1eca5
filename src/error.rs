use thiserror::Error;

use crate::runtime::FunctionId;

/// Application-level result, used at the loader, session and CLI edges.
pub type Result<T> = anyhow::Result<T>;

/// Result of the debugging core operations.
pub type DebugResult<T> = std::result::Result<T, DebuggerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebuggerError {
    #[error("No breakable instruction at or after offset {offset} in function {function}")]
    UnresolvableOffset { function: FunctionId, offset: u32 },

    #[error("No function body at or after module offset {0}")]
    UnresolvableModuleOffset(u32),

    #[error("Unknown breakpoint id: {0}")]
    UnknownBreakpointId(u32),

    #[error("Cannot step relative to an empty call stack")]
    InvalidStepInEmptyStack,

    #[error("Command rejected: execution is running")]
    CommandWhileRunning,

    #[error("An invocation is already in progress")]
    ExecutionInProgress,

    #[error("Unknown function: {0}")]
    UnknownFunction(FunctionId),

    #[error("Unknown export: {0}")]
    UnknownExport(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Failed to load module: {0}")]
    ModuleLoad(String),

    #[error("Execution trapped: {0}")]
    Trap(String),

    #[error("Debug session closed")]
    SessionClosed,

    #[error("Invalid configuration: {0}")]
    Config(String),
}
