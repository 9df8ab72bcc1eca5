use std::path::Path;

use anyhow::{anyhow, Context};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde::Serialize;
use tracing::info;

use crate::analyzer::{LayoutAnalyzer, ModuleReport};
use crate::cli::repl::{ReplCommand, HELP};
use crate::cli::{
    BreakpointSpec, InspectArgs, InteractiveArgs, OffsetSpec, OutputFormat, RunArgs, Verbosity,
};
use crate::config::Config;
use crate::debugger::breakpoint::Breakpoint;
use crate::debugger::engine::Debugger;
use crate::debugger::stepper::StepAction;
use crate::error::DebuggerError;
use crate::runtime::loader::load_module_file;
use crate::runtime::module::{FunctionId, Module};
use crate::runtime::parser::parse_args;
use crate::runtime::result::{
    format_pause, format_results, CallFrameSnapshot, PausedEvent, RunOutcome,
};
use crate::runtime::value::Value;
use crate::Result;

/// JSON document printed by `run --output json`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub module: String,
    pub export: String,
    pub breakpoints: Vec<Breakpoint>,
    pub pauses: Vec<PausedEvent>,
    pub results: Vec<Value>,
}

/// Execute the run command.
pub fn run(args: RunArgs, verbosity: Verbosity, config: &Config) -> Result<()> {
    let module = load(&args.module, config)?;
    let mut debugger = Debugger::new(module, config);
    let text = args.output == OutputFormat::Text;

    let mut breakpoints = Vec::new();
    for spec in &args.breakpoints {
        let breakpoint = set_breakpoint(&mut debugger, spec)?;
        if text && verbosity != Verbosity::Quiet {
            println!("{} {}", "Breakpoint".green().bold(), breakpoint);
        }
        breakpoints.push(breakpoint);
    }

    let actions = args
        .actions
        .iter()
        .map(|a| a.parse::<StepAction>().map_err(|e| anyhow!(e)))
        .collect::<Result<Vec<_>>>()?;
    let mut actions = actions.into_iter();

    let call_args = parse_args(debugger.module(), &args.invoke, args.args.as_deref().unwrap_or("[]"))?;
    if args.stop_on_entry {
        debugger.request_pause();
    }

    let url = debugger.module().url().to_string();
    let mut pauses = Vec::new();
    let mut outcome = debugger.invoke(&args.invoke, call_args)?;
    let results = loop {
        match outcome {
            RunOutcome::Paused(event) => {
                if text {
                    println!("{}", format_pause(&event, &url).yellow());
                }
                pauses.push(event);
                let action = actions.next().unwrap_or(StepAction::Resume);
                info!("Continuing with {}", action);
                outcome = debugger.step(action)?;
            }
            RunOutcome::Yielded => outcome = debugger.run()?,
            RunOutcome::Finished(completion) => break completion.results,
        }
    };

    if text {
        println!("{} {}", "Result:".green().bold(), format_results(&results));
    } else {
        let report = RunReport {
            module: url,
            export: args.invoke,
            breakpoints,
            pauses,
            results,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Execute the inspect command.
pub fn inspect(args: InspectArgs, _verbosity: Verbosity, config: &Config) -> Result<()> {
    let module = load(&args.module, config)?;
    let report = LayoutAnalyzer::analyze(&module);

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            print!("{}", report);
            if args.instructions {
                print_instructions(&report);
            }
        }
    }
    Ok(())
}

/// Execute the interactive command.
pub fn interactive(args: InteractiveArgs, _verbosity: Verbosity, config: &Config) -> Result<()> {
    let module = load(&args.module, config)?;
    let url = module.url().to_string();
    println!("{} {}", "Loaded".green().bold(), url);
    println!("Type 'help' for commands.");

    let mut debugger = Debugger::new(module, config);
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;

    loop {
        let line = match editor.readline("(wasm-stepper) ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = editor.add_history_entry(line.as_str());

        let command = match ReplCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message.red());
                continue;
            }
        };
        if command == ReplCommand::Quit {
            break;
        }
        if let Err(err) = execute(&mut debugger, command, &url) {
            println!("{} {}", "Error:".red().bold(), err);
        }
    }
    Ok(())
}

fn execute(debugger: &mut Debugger, command: ReplCommand, url: &str) -> Result<()> {
    match command {
        ReplCommand::Break(spec) => {
            let breakpoint = set_breakpoint(debugger, &spec)?;
            println!("{} {}", "Breakpoint".green().bold(), breakpoint);
        }
        ReplCommand::Delete(id) => {
            if debugger.remove_breakpoint(id)? {
                println!("Deleted breakpoint {}", id);
            } else {
                // Removing an unknown id is not an error; just say so.
                println!("{}", DebuggerError::UnknownBreakpointId(id.0));
            }
        }
        ReplCommand::ListBreakpoints => {
            let breakpoints = debugger.breakpoints();
            if breakpoints.is_empty() {
                println!("No breakpoints.");
            }
            for breakpoint in breakpoints {
                println!("  {}", breakpoint);
            }
        }
        ReplCommand::Invoke { export, args } => {
            let call_args = parse_args(debugger.module(), &export, &args)?;
            let outcome = debugger.invoke(&export, call_args)?;
            report_outcome(debugger, outcome, url)?;
        }
        ReplCommand::Step(action) => {
            let outcome = debugger.step(action)?;
            report_outcome(debugger, outcome, url)?;
        }
        ReplCommand::Pause => {
            debugger.request_pause();
            println!("Will pause at the next breakable instruction.");
        }
        ReplCommand::Backtrace => print_backtrace(&debugger.call_frames()),
        ReplCommand::State => println!("State: {}", debugger.state()),
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn report_outcome(debugger: &mut Debugger, mut outcome: RunOutcome, url: &str) -> Result<()> {
    loop {
        match outcome {
            RunOutcome::Yielded => outcome = debugger.run()?,
            RunOutcome::Paused(event) => {
                println!("{}", format_pause(&event, url).yellow());
                return Ok(());
            }
            RunOutcome::Finished(completion) => {
                match completion.export {
                    Some(export) => println!(
                        "{} {} returned {}",
                        "Finished:".green().bold(),
                        export,
                        format_results(&completion.results)
                    ),
                    None => println!("Nothing is running."),
                }
                return Ok(());
            }
        }
    }
}

fn print_backtrace(frames: &[CallFrameSnapshot]) {
    if frames.is_empty() {
        println!("No call frames.");
        return;
    }
    for (index, frame) in frames.iter().enumerate() {
        let locals: Vec<String> = frame.locals.iter().map(|v| v.to_string()).collect();
        println!(
            "  #{} {} @ {} (depth {}) locals [{}]",
            index,
            frame.function_name,
            frame.location.offset,
            frame.depth,
            locals.join(", ")
        );
    }
}

fn print_instructions(report: &ModuleReport) {
    for function in &report.functions {
        println!();
        println!("{}", function.to_string().bold());
        for instruction in &function.instructions {
            let marker = if instruction.breakable { "*" } else { " " };
            println!(
                "  {} {:>6} +{:<4} {}",
                marker,
                instruction.offset,
                instruction.offset - function.body_offset,
                instruction.text
            );
        }
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn load(path: &Path, config: &Config) -> Result<Module> {
    let module = load_module_file(path, &config.breakable)?;
    info!("Loaded {} ({} functions)", module.url(), module.functions().len());
    Ok(module)
}

fn set_breakpoint(debugger: &mut Debugger, spec: &BreakpointSpec) -> Result<Breakpoint> {
    let Some(name) = &spec.function else {
        let OffsetSpec::Absolute(offset) = spec.offset else {
            return Err(anyhow!("Relative offset in '{}' needs a function", spec));
        };
        return Ok(debugger.set_breakpoint_at_offset(offset)?);
    };

    let function = resolve_function(debugger.module(), name)?;
    let offset = match spec.offset {
        OffsetSpec::Absolute(offset) => offset,
        OffsetSpec::Relative(relative) => {
            let body = debugger
                .module()
                .function(function)
                .map(|f| f.body_offset())
                .unwrap_or_default();
            body.checked_add(relative)
                .ok_or(DebuggerError::UnresolvableOffset {
                    function,
                    offset: relative,
                })?
        }
    };
    Ok(debugger.set_breakpoint(function, offset)?)
}

/// A function by name, export name or index.
fn resolve_function(module: &Module, name: &str) -> Result<FunctionId> {
    if let Some(function) = module.function_by_name(name) {
        return Ok(function.id());
    }
    if let Some(id) = module.export(name) {
        return Ok(id);
    }
    name.parse::<u32>()
        .ok()
        .map(FunctionId)
        .filter(|id| module.function(*id).is_some())
        .ok_or_else(|| anyhow!("Unknown function '{}'", name))
}
