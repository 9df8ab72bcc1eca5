//! Line parser for the interactive prompt.

use crate::cli::BreakpointSpec;
use crate::debugger::stepper::StepAction;
use crate::runtime::result::BreakpointId;

pub const HELP: &str = "\
Commands:
  break <SPEC>            set a breakpoint (OFFSET, FUNCTION:OFFSET or FUNCTION:+OFFSET)
  delete <ID>             remove a breakpoint
  info breakpoints        list breakpoints
  invoke <EXPORT> [JSON]  call an export, e.g. invoke fact [4]
  step | next | finish    step into, over or out
  continue                resume until the next breakpoint
  pause                   stop at the next breakable instruction: on entry of the
                          next invocation, or after the next step or continue
  backtrace               show the call stack
  state                   show the run state
  help                    show this text
  quit                    leave the debugger";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Break(BreakpointSpec),
    Delete(BreakpointId),
    ListBreakpoints,
    Invoke { export: String, args: String },
    Step(StepAction),
    Pause,
    Backtrace,
    State,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one input line; `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        let Some((word, rest)) = split_word(line) else {
            return Ok(None);
        };

        let command = match word {
            "break" | "b" => ReplCommand::Break(rest.parse()?),
            "delete" | "d" => {
                let id = rest
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid breakpoint id '{}'", rest))?;
                ReplCommand::Delete(BreakpointId(id))
            }
            "info" if matches!(rest, "breakpoints" | "b") => ReplCommand::ListBreakpoints,
            "breakpoints" => ReplCommand::ListBreakpoints,
            "invoke" | "run" | "r" => {
                let (export, args) = split_word(rest).ok_or("Usage: invoke <EXPORT> [JSON]")?;
                ReplCommand::Invoke {
                    export: export.to_string(),
                    args: if args.is_empty() { "[]" } else { args }.to_string(),
                }
            }
            "pause" => ReplCommand::Pause,
            "backtrace" | "bt" | "where" => ReplCommand::Backtrace,
            "state" => ReplCommand::State,
            "help" | "h" | "?" => ReplCommand::Help,
            "quit" | "q" | "exit" => ReplCommand::Quit,
            other => match other.parse::<StepAction>() {
                Ok(action) if rest.is_empty() => ReplCommand::Step(action),
                _ => return Err(format!("Unknown command '{}'. Type 'help' for a list.", line)),
            },
        };
        Ok(Some(command))
    }
}

fn split_word(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OffsetSpec;

    fn parse(line: &str) -> ReplCommand {
        ReplCommand::parse(line).unwrap().unwrap()
    }

    #[test]
    fn stepping_words() {
        assert_eq!(parse("step"), ReplCommand::Step(StepAction::Into));
        assert_eq!(parse("next"), ReplCommand::Step(StepAction::Over));
        assert_eq!(parse("finish"), ReplCommand::Step(StepAction::Out));
        assert_eq!(parse("  c "), ReplCommand::Step(StepAction::Resume));
    }

    #[test]
    fn breakpoints_and_invocations() {
        assert_eq!(
            parse("break wasm_B:+15"),
            ReplCommand::Break(BreakpointSpec {
                function: Some("wasm_B".into()),
                offset: OffsetSpec::Relative(15),
            })
        );
        assert_eq!(parse("delete 2"), ReplCommand::Delete(BreakpointId(2)));
        assert_eq!(parse("info breakpoints"), ReplCommand::ListBreakpoints);
        assert_eq!(
            parse("invoke fact [4]"),
            ReplCommand::Invoke {
                export: "fact".into(),
                args: "[4]".into()
            }
        );
        assert_eq!(
            parse("run main"),
            ReplCommand::Invoke {
                export: "main".into(),
                args: "[]".into()
            }
        );
    }

    #[test]
    fn help_describes_both_pause_cases() {
        assert_eq!(parse("pause"), ReplCommand::Pause);
        assert!(HELP.contains("on entry of the"));
        assert!(HELP.contains("after the next step or continue"));
    }

    #[test]
    fn blank_and_bad_lines() {
        assert_eq!(ReplCommand::parse("   "), Ok(None));
        assert!(ReplCommand::parse("delete x").is_err());
        assert!(ReplCommand::parse("frobnicate").is_err());
        assert!(ReplCommand::parse("next 3").is_err());
        assert!(ReplCommand::parse("invoke").is_err());
    }
}
