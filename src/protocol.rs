use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::debugger::breakpoint::Breakpoint;
use crate::debugger::state::DebugState;
use crate::runtime::module::{FunctionId, Location};
use crate::runtime::result::{BreakpointId, PausedEvent, RunCompletion};

/// Where a client wants a breakpoint.
///
/// Without `function`, `offset` is looked up across the whole module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionId>,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DebugRequest {
    SetBreakpoint { location: BreakpointLocation },
    RemoveBreakpoint { breakpoint_id: BreakpointId },
    StepInto,
    StepOver,
    StepOut,
    Resume,
    Pause,
    /// Arguments are plain JSON numbers or `{"type", "value"}` envelopes.
    Invoke { export: String, args: Vec<JsonValue> },
    ListBreakpoints,
    GetState,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugResponse {
    Ok,
    Error(String),
    BreakpointSet {
        breakpoint_id: BreakpointId,
        actual_location: Location,
    },
    Breakpoints(Vec<Breakpoint>),
    State(DebugState),
}

/// Unsolicited notifications, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugEvent {
    ModuleParsed { url: String, functions: Vec<String> },
    Paused(PausedEvent),
    Resumed,
    Finished(RunCompletion),
    Trapped { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_use_external_tagging() {
        let request = DebugRequest::SetBreakpoint {
            location: BreakpointLocation {
                function: None,
                offset: 72,
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"SetBreakpoint": {"location": {"offset": 72}}})
        );
        assert_eq!(serde_json::to_value(DebugRequest::StepOver).unwrap(), json!("StepOver"));
    }

    #[test]
    fn requests_parse_from_client_json() {
        let request: DebugRequest =
            serde_json::from_value(json!({"Invoke": {"export": "fact", "args": [4]}})).unwrap();
        assert_eq!(
            request,
            DebugRequest::Invoke {
                export: "fact".into(),
                args: vec![json!(4)],
            }
        );

        let remove: DebugRequest =
            serde_json::from_value(json!({"RemoveBreakpoint": {"breakpoint_id": 3}})).unwrap();
        assert_eq!(
            remove,
            DebugRequest::RemoveBreakpoint {
                breakpoint_id: BreakpointId(3)
            }
        );
    }

    #[test]
    fn breakpoint_set_reports_the_actual_location() {
        let response = DebugResponse::BreakpointSet {
            breakpoint_id: BreakpointId(1),
            actual_location: Location::new(FunctionId(1), 73),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["BreakpointSet"]["actual_location"]["offset"], 73);
        assert_eq!(json["BreakpointSet"]["actual_location"]["function"], 1);
    }
}
