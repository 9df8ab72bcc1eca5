//! Command-line interface of the `wasm-stepper` binary.

pub mod commands;
pub mod repl;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "wasm-stepper", version, about = "Breakpoints and single-stepping for WebAssembly modules")]
pub struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./wasm-stepper.toml when present)
    #[arg(long, global = true, env = "WASM_STEPPER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Invoke an export under the debugger, following a scripted list of step actions
    Run(RunArgs),
    /// Start an interactive debugging prompt
    Interactive(InteractiveArgs),
    /// Show function layout and breakable offsets
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the .wasm module
    pub module: PathBuf,

    /// Export to invoke
    #[arg(long)]
    pub invoke: String,

    /// Arguments as a JSON array, e.g. '[4]'
    #[arg(long)]
    pub args: Option<String>,

    /// Breakpoint as OFFSET or FUNCTION:OFFSET; `+N` offsets are relative to the body start
    #[arg(long = "breakpoint", short = 'b')]
    pub breakpoints: Vec<BreakpointSpec>,

    /// Comma-separated actions applied at successive pauses (into, over, out, resume)
    #[arg(long, value_delimiter = ',')]
    pub actions: Vec<String>,

    /// Pause on the first instruction of the export
    #[arg(long)]
    pub stop_on_entry: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Args, Debug)]
pub struct InteractiveArgs {
    /// Path to the .wasm module
    pub module: PathBuf,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the .wasm module
    pub module: PathBuf,

    /// Also list every decoded instruction
    #[arg(long)]
    pub instructions: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn to_log_level(self) -> String {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "debug",
        }
        .to_string()
    }
}

/// Byte offset as typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetSpec {
    /// Module-absolute.
    Absolute(u32),
    /// Relative to the function's body offset.
    Relative(u32),
}

/// `OFFSET`, `FUNCTION:OFFSET` or `FUNCTION:+OFFSET`, where FUNCTION is a
/// name or an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointSpec {
    pub function: Option<String>,
    pub offset: OffsetSpec,
}

impl FromStr for BreakpointSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (function, offset) = match s.rsplit_once(':') {
            Some((function, offset)) if !function.is_empty() => {
                (Some(function.to_string()), offset)
            }
            Some(_) => return Err(format!("Missing function name in '{}'", s)),
            None => (None, s),
        };

        let offset = match offset.strip_prefix('+') {
            Some(relative) => OffsetSpec::Relative(parse_offset(relative)?),
            None => OffsetSpec::Absolute(parse_offset(offset)?),
        };
        if function.is_none() && matches!(offset, OffsetSpec::Relative(_)) {
            return Err(format!(
                "Relative offset '{}' needs a function, e.g. main:{}",
                s, s
            ));
        }
        Ok(Self { function, offset })
    }
}

impl fmt::Display for BreakpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(function) = &self.function {
            write!(f, "{}:", function)?;
        }
        match self.offset {
            OffsetSpec::Absolute(offset) => write!(f, "{}", offset),
            OffsetSpec::Relative(offset) => write!(f, "+{}", offset),
        }
    }
}

fn parse_offset(text: &str) -> Result<u32, String> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| format!("Invalid offset '{}'", text))
}
