//! Outcome types of a debugged run.
//!
//! A call to [`crate::Debugger::run`] ends in one of three ways: it pauses
//! (a [`PausedEvent`] with the call-frame snapshot), the invoked export
//! returns (a [`RunCompletion`]), or a fuel slice runs out while execution is
//! still live.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::runtime::module::{FunctionId, Location};
use crate::runtime::value::Value;

/// Identifier handed out by the breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointId(pub u32);

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PauseReason {
    Breakpoint,
    Step,
    /// An explicit pause request.
    Requested,
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PauseReason::Breakpoint => write!(f, "breakpoint"),
            PauseReason::Step => write!(f, "step"),
            PauseReason::Requested => write!(f, "pause"),
        }
    }
}

/// One frame of a pause snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrameSnapshot {
    pub function: FunctionId,
    pub function_name: String,
    pub location: Location,
    pub depth: usize,
    pub locals: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedEvent {
    pub reason: PauseReason,
    pub hit_breakpoints: Vec<BreakpointId>,
    /// Innermost frame first.
    pub call_frames: Vec<CallFrameSnapshot>,
}

impl PausedEvent {
    pub fn top_frame(&self) -> Option<&CallFrameSnapshot> {
        self.call_frames.first()
    }

    pub fn location(&self) -> Option<Location> {
        self.top_frame().map(|f| f.location)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCompletion {
    /// The invoked export; `None` when nothing was running.
    pub export: Option<String>,
    pub results: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Paused(PausedEvent),
    Finished(RunCompletion),
    /// The fuel slice ran out; execution is still live.
    Yielded,
}

impl RunOutcome {
    pub fn paused(&self) -> Option<&PausedEvent> {
        match self {
            RunOutcome::Paused(event) => Some(event),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, RunOutcome::Finished(_))
    }
}

/// Render a pause the way the CLI prints it.
pub fn format_pause(event: &PausedEvent, url: &str) -> String {
    let mut out = match event.top_frame() {
        Some(frame) => format!(
            "Paused at {}:0:{} ({}, {})",
            url, frame.location.offset, frame.function_name, event.reason
        ),
        None => format!("Paused ({})", event.reason),
    };
    if !event.hit_breakpoints.is_empty() {
        let ids: Vec<String> = event.hit_breakpoints.iter().map(|id| id.to_string()).collect();
        out.push_str(&format!(" [breakpoint {}]", ids.join(", ")));
    }
    out
}

pub fn format_results(results: &[Value]) -> String {
    if results.is_empty() {
        return "()".to_string();
    }
    let parts: Vec<String> = results.iter().map(|v| v.to_string()).collect();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> PausedEvent {
        PausedEvent {
            reason: PauseReason::Breakpoint,
            hit_breakpoints: vec![BreakpointId(1)],
            call_frames: vec![CallFrameSnapshot {
                function: FunctionId(1),
                function_name: "wasm_B".into(),
                location: Location::new(FunctionId(1), 60),
                depth: 1,
                locals: vec![Value::I32(3)],
            }],
        }
    }

    #[test]
    fn pause_lines_use_script_columns() {
        assert_eq!(
            format_pause(&event(), "wasm://wasm/0123abcd"),
            "Paused at wasm://wasm/0123abcd:0:60 (wasm_B, breakpoint) [breakpoint 1]"
        );
    }

    #[test]
    fn pause_serializes_in_camel_case() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["reason"], "breakpoint");
        assert_eq!(json["hitBreakpoints"][0], 1);
        assert_eq!(json["callFrames"][0]["functionName"], "wasm_B");
        assert_eq!(json["callFrames"][0]["location"]["offset"], 60);
    }

    #[test]
    fn results_formatting() {
        assert_eq!(format_results(&[]), "()");
        assert_eq!(format_results(&[Value::I32(24)]), "24: i32");
    }
}
