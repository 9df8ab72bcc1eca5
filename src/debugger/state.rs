use serde::{Deserialize, Serialize};
use std::fmt;

use crate::debugger::breakpoint::Breakpoint;
use crate::runtime::result::CallFrameSnapshot;

/// Whether an invocation is live, and if so whether it is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    /// No activation; breakpoints may be edited and an export invoked.
    #[default]
    Idle,
    Running,
    Paused,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::Paused => write!(f, "paused"),
        }
    }
}

/// Point-in-time view of a debugger, answered to `GetState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugState {
    pub state: RunState,
    pub export: Option<String>,
    /// Innermost frame first; empty when idle.
    pub call_frames: Vec<CallFrameSnapshot>,
    pub breakpoints: Vec<Breakpoint>,
}
