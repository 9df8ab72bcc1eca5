//! Step controller.
//!
//! Holds the client's step mode between stops and answers, at each breakable
//! boundary, whether execution should pause there. Depths are call-stack
//! sizes including the executing frame.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DebuggerError;
use crate::runtime::result::PauseReason;

/// What the client asked for when leaving a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepAction {
    Into,
    Over,
    Out,
    Resume,
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::Into => write!(f, "stepInto"),
            StepAction::Over => write!(f, "stepOver"),
            StepAction::Out => write!(f, "stepOut"),
            StepAction::Resume => write!(f, "resume"),
        }
    }
}

impl FromStr for StepAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "into" | "stepinto" | "step" | "s" => Ok(StepAction::Into),
            "over" | "stepover" | "next" | "n" => Ok(StepAction::Over),
            "out" | "stepout" | "finish" => Ok(StepAction::Out),
            "resume" | "continue" | "c" => Ok(StepAction::Resume),
            other => Err(format!(
                "Unknown step action '{}' (use into, over, out or resume)",
                other
            )),
        }
    }
}

/// Stop condition armed by the last step action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    #[default]
    None,
    Into,
    Over { origin_depth: usize },
    Out { origin_depth: usize },
}

#[derive(Debug, Default)]
pub struct StepController {
    mode: StepMode,
    pause_requested: bool,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> StepMode {
        self.mode
    }

    pub fn pause_requested(&self) -> bool {
        self.pause_requested
    }

    /// Arm the stop condition for `action` issued at `depth`.
    ///
    /// With an empty stack there is nothing to step relative to and the
    /// action degrades to a plain resume.
    pub fn arm(&mut self, action: StepAction, depth: usize) {
        self.mode = match (action, depth) {
            (StepAction::Resume, _) => StepMode::None,
            (_, 0) => {
                warn!("{}; treating {} as resume", DebuggerError::InvalidStepInEmptyStack, action);
                StepMode::None
            }
            (StepAction::Into, _) => StepMode::Into,
            (StepAction::Over, d) => StepMode::Over { origin_depth: d },
            (StepAction::Out, d) => StepMode::Out { origin_depth: d },
        };
        debug!(mode = ?self.mode, "Step armed");
    }

    /// Stop at the next breakable boundary regardless of the step mode.
    pub fn request_pause(&mut self) {
        self.pause_requested = true;
    }

    /// Decide whether to stop at a breakable boundary observed at `depth`.
    ///
    /// A satisfied step condition reports [`PauseReason::Step`] even when a
    /// breakpoint sits on the same boundary. A breakpoint reached before the
    /// step condition holds stops anyway.
    pub fn check(&self, depth: usize, breakpoint_hit: bool) -> Option<PauseReason> {
        if self.pause_requested {
            return Some(PauseReason::Requested);
        }
        let step_done = match self.mode {
            StepMode::None => false,
            StepMode::Into => true,
            StepMode::Over { origin_depth } => depth <= origin_depth,
            StepMode::Out { origin_depth } => depth < origin_depth,
        };
        if step_done {
            Some(PauseReason::Step)
        } else if breakpoint_hit {
            Some(PauseReason::Breakpoint)
        } else {
            None
        }
    }

    /// Forget the step mode and any pending pause; called after every stop.
    pub fn reset(&mut self) {
        self.mode = StepMode::None;
        self.pause_requested = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(action: StepAction, depth: usize) -> StepController {
        let mut controller = StepController::new();
        controller.arm(action, depth);
        controller
    }

    #[test]
    fn over_waits_for_the_origin_depth() {
        let controller = armed(StepAction::Over, 2);
        assert_eq!(controller.check(3, false), None);
        assert_eq!(controller.check(2, false), Some(PauseReason::Step));
        assert_eq!(controller.check(1, false), Some(PauseReason::Step));
    }

    #[test]
    fn out_needs_a_shallower_frame() {
        let controller = armed(StepAction::Out, 2);
        assert_eq!(controller.check(3, false), None);
        assert_eq!(controller.check(2, false), None);
        assert_eq!(controller.check(1, false), Some(PauseReason::Step));
    }

    #[test]
    fn into_stops_anywhere() {
        let controller = armed(StepAction::Into, 1);
        assert_eq!(controller.check(5, false), Some(PauseReason::Step));
    }

    #[test]
    fn breakpoints_interrupt_an_unfinished_step() {
        let controller = armed(StepAction::Over, 1);
        assert_eq!(controller.check(2, true), Some(PauseReason::Breakpoint));
        assert_eq!(controller.check(1, true), Some(PauseReason::Step));
    }

    #[test]
    fn resume_only_stops_on_breakpoints() {
        let controller = armed(StepAction::Resume, 3);
        assert_eq!(controller.mode(), StepMode::None);
        assert_eq!(controller.check(3, false), None);
        assert_eq!(controller.check(3, true), Some(PauseReason::Breakpoint));
    }

    #[test]
    fn steps_on_an_empty_stack_degrade_to_resume() {
        for action in [StepAction::Into, StepAction::Over, StepAction::Out] {
            assert_eq!(armed(action, 0).mode(), StepMode::None);
        }
    }

    #[test]
    fn pause_requests_win_and_reset_clears_them() {
        let mut controller = armed(StepAction::Over, 1);
        controller.request_pause();
        assert_eq!(controller.check(4, true), Some(PauseReason::Requested));

        controller.reset();
        assert!(!controller.pause_requested());
        assert_eq!(controller.mode(), StepMode::None);
        assert_eq!(controller.check(1, false), None);
    }

    #[test]
    fn actions_parse_from_cli_words() {
        assert_eq!("next".parse::<StepAction>(), Ok(StepAction::Over));
        assert_eq!("stepInto".parse::<StepAction>(), Ok(StepAction::Into));
        assert_eq!("finish".parse::<StepAction>(), Ok(StepAction::Out));
        assert_eq!("Resume".parse::<StepAction>(), Ok(StepAction::Resume));
        assert!("jump".parse::<StepAction>().is_err());
    }
}
