//! Breakpoint resolution and call-frame stepping for WebAssembly bytecode.
//!
//! The crate is organised around three layers:
//! - [`runtime`]: the bytecode model, module loading and a reference interpreter.
//! - [`debugger`]: breakpoint resolution, the call-frame stack, the step
//!   controller and the pause/resume engine built on top of them.
//! - [`protocol`]: request, response and event types exchanged with clients.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod debugger;
pub mod error;
pub mod protocol;
pub mod runtime;

pub use config::Config;
pub use debugger::{Debugger, DebugSession, SessionClient};
pub use error::{DebugResult, DebuggerError, Result};
pub use runtime::{load_module, Module, Value};
