//! Debugging core.
//!
//! Sub-modules:
//! - [`breakpoint`]: Breakpoint table and forward offset resolution.
//! - [`call_stack`]: Call frames and the current execution depth.
//! - [`stepper`]: Step actions, step modes and the stop decision.
//! - [`engine`]: [`Debugger`], the pause/resume coordinator.
//! - [`state`]: Run state and state snapshots.
//! - [`session`]: Threaded, message-passing front end.

pub mod breakpoint;
pub mod call_stack;
pub mod engine;
pub mod session;
pub mod state;
pub mod stepper;

pub use breakpoint::{Breakpoint, BreakpointManager};
pub use call_stack::{CallFrame, CallStack};
pub use engine::Debugger;
pub use session::{DebugSession, SessionClient};
pub use state::{DebugState, RunState};
pub use stepper::{StepAction, StepController, StepMode};
