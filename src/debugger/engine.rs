//! Pause/resume coordinator.
//!
//! [`Debugger`] owns the module, an [`Executor`], the call stack, the
//! breakpoint table and the step controller. It drives the executor one
//! instruction at a time and, before every breakable instruction, asks the
//! step controller whether to stop there. A stop produces a [`PausedEvent`]
//! carrying a snapshot of the call stack.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::debugger::breakpoint::{Breakpoint, BreakpointManager};
use crate::debugger::call_stack::{CallFrame, CallStack};
use crate::debugger::state::{DebugState, RunState};
use crate::debugger::stepper::{StepAction, StepController};
use crate::error::{DebugResult, DebuggerError};
use crate::runtime::executor::{ExecStep, Executor, Interpreter};
use crate::runtime::invoker::prepare_invocation;
use crate::runtime::module::{FunctionId, Module};
use crate::runtime::result::{
    BreakpointId, CallFrameSnapshot, PausedEvent, RunCompletion, RunOutcome,
};
use crate::runtime::value::Value;

pub struct Debugger<E: Executor = Interpreter> {
    module: Module,
    executor: E,
    stack: CallStack,
    breakpoints: BreakpointManager,
    stepper: StepController,
    state: RunState,
    export: Option<String>,
    last_pause: Option<PausedEvent>,
    /// Set when leaving a pause: the paused-on instruction runs unchecked.
    skip_check: bool,
    fuel_slice: Option<u64>,
}

impl Debugger<Interpreter> {
    pub fn new(module: Module, config: &Config) -> Self {
        let executor = Interpreter::new(config.execution.max_call_depth);
        Self::with_executor(module, executor, config)
    }
}

impl<E: Executor> Debugger<E> {
    pub fn with_executor(module: Module, executor: E, config: &Config) -> Self {
        Self {
            module,
            executor,
            stack: CallStack::new(),
            breakpoints: BreakpointManager::new(),
            stepper: StepController::new(),
            state: RunState::Idle,
            export: None,
            last_pause: None,
            skip_check: false,
            fuel_slice: config.execution.fuel_slice,
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn last_pause(&self) -> Option<&PausedEvent> {
        self.last_pause.as_ref()
    }

    pub fn fuel_slice(&self) -> Option<u64> {
        self.fuel_slice
    }

    /// Limit each [`Debugger::run`] call to `slice` instructions.
    pub fn set_fuel_slice(&mut self, slice: Option<u64>) {
        self.fuel_slice = slice;
    }

    // ── breakpoints ──────────────────────────────────────────────────────────

    pub fn set_breakpoint(&mut self, function: FunctionId, offset: u32) -> DebugResult<Breakpoint> {
        self.ensure_not_running()?;
        self.breakpoints.set(&self.module, function, offset)
    }

    pub fn set_breakpoint_at_offset(&mut self, offset: u32) -> DebugResult<Breakpoint> {
        self.ensure_not_running()?;
        self.breakpoints.set_at_offset(&self.module, offset)
    }

    /// Remove a breakpoint; unknown ids are a successful no-op.
    pub fn remove_breakpoint(&mut self, id: BreakpointId) -> DebugResult<bool> {
        self.ensure_not_running()?;
        Ok(self.breakpoints.remove(id))
    }

    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.breakpoints.list()
    }

    // ── execution ────────────────────────────────────────────────────────────

    /// Enter `export` with `args`. Only allowed while idle.
    pub fn start(&mut self, export: &str, args: Vec<Value>) -> DebugResult<()> {
        if self.state != RunState::Idle {
            return Err(DebuggerError::ExecutionInProgress);
        }
        let invocation = prepare_invocation(&self.module, export, args)?;

        self.executor.reset();
        self.stack.clear();
        self.executor
            .enter(&self.module, invocation.function, invocation.args, &mut self.stack)?;
        self.export = Some(invocation.export);
        self.skip_check = false;
        self.last_pause = None;
        self.state = RunState::Running;
        Ok(())
    }

    /// Leave the current pause with `action`.
    ///
    /// While idle this is accepted and does nothing; the next
    /// [`Debugger::run`] reports completion.
    pub fn continue_with(&mut self, action: StepAction) -> DebugResult<()> {
        match self.state {
            RunState::Running => Err(DebuggerError::CommandWhileRunning),
            RunState::Idle => {
                debug!("{} while idle; nothing to continue", action);
                Ok(())
            }
            RunState::Paused => {
                self.stepper.arm(action, self.stack.depth());
                self.skip_check = true;
                self.last_pause = None;
                self.state = RunState::Running;
                Ok(())
            }
        }
    }

    /// Execute until a stop, completion or trap, or until the fuel slice is
    /// used up.
    pub fn run(&mut self) -> DebugResult<RunOutcome> {
        match self.state {
            RunState::Idle => return Ok(RunOutcome::Finished(RunCompletion::default())),
            RunState::Paused => {
                if let Some(event) = &self.last_pause {
                    return Ok(RunOutcome::Paused(event.clone()));
                }
            }
            RunState::Running => {}
        }

        let mut fuel = self.fuel_slice;
        loop {
            if let Some(remaining) = fuel.as_mut() {
                if *remaining == 0 {
                    return Ok(RunOutcome::Yielded);
                }
                *remaining -= 1;
            }

            let Some(frame) = self.stack.current().copied() else {
                // The executor always reports completion when the last frame
                // pops, so an empty stack here means nothing is running.
                self.finish_idle();
                return Ok(RunOutcome::Finished(RunCompletion::default()));
            };

            if !std::mem::take(&mut self.skip_check) {
                if let Some(event) = self.check_boundary(&frame) {
                    info!(
                        reason = %event.reason,
                        offset = frame.instruction_pointer,
                        depth = frame.frame_depth,
                        "Paused"
                    );
                    self.stepper.reset();
                    self.state = RunState::Paused;
                    self.last_pause = Some(event.clone());
                    return Ok(RunOutcome::Paused(event));
                }
            }

            match self.executor.step(&self.module, &mut self.stack) {
                Ok(ExecStep::Continue) => {}
                Ok(ExecStep::Completed(results)) => {
                    let completion = RunCompletion {
                        export: self.export.take(),
                        results,
                    };
                    info!("Invocation finished");
                    self.finish_idle();
                    return Ok(RunOutcome::Finished(completion));
                }
                Err(err) => {
                    warn!("Execution trapped: {}", err);
                    self.executor.reset();
                    self.stack.clear();
                    self.export = None;
                    self.finish_idle();
                    return Err(err);
                }
            }
        }
    }

    /// Start `export` and run to the first stop or completion.
    pub fn invoke(&mut self, export: &str, args: Vec<Value>) -> DebugResult<RunOutcome> {
        self.start(export, args)?;
        self.run()
    }

    pub fn step(&mut self, action: StepAction) -> DebugResult<RunOutcome> {
        self.continue_with(action)?;
        self.run()
    }

    pub fn step_into(&mut self) -> DebugResult<RunOutcome> {
        self.step(StepAction::Into)
    }

    pub fn step_over(&mut self) -> DebugResult<RunOutcome> {
        self.step(StepAction::Over)
    }

    pub fn step_out(&mut self) -> DebugResult<RunOutcome> {
        self.step(StepAction::Out)
    }

    pub fn resume(&mut self) -> DebugResult<RunOutcome> {
        self.step(StepAction::Resume)
    }

    /// Stop at the next breakable instruction. While idle, the next
    /// invocation stops on entry.
    pub fn request_pause(&mut self) {
        debug!(state = %self.state, "Pause requested");
        self.stepper.request_pause();
    }

    // ── inspection ───────────────────────────────────────────────────────────

    /// Snapshot of the call stack, innermost frame first.
    pub fn call_frames(&self) -> Vec<CallFrameSnapshot> {
        self.stack
            .frames()
            .iter()
            .enumerate()
            .rev()
            .map(|(index, frame)| CallFrameSnapshot {
                function: frame.function,
                function_name: self
                    .module
                    .function(frame.function)
                    .map(|f| f.name().to_string())
                    .unwrap_or_else(|| format!("$func{}", frame.function)),
                location: frame.location(),
                depth: frame.frame_depth,
                locals: self.executor.frame_locals(index),
            })
            .collect()
    }

    pub fn snapshot(&self) -> DebugState {
        DebugState {
            state: self.state,
            export: self.export.clone(),
            call_frames: self.call_frames(),
            breakpoints: self.breakpoints(),
        }
    }

    // ── helpers ──────────────────────────────────────────────────────────────

    fn ensure_not_running(&self) -> DebugResult<()> {
        if self.state == RunState::Running {
            return Err(DebuggerError::CommandWhileRunning);
        }
        Ok(())
    }

    fn check_boundary(&self, frame: &CallFrame) -> Option<PausedEvent> {
        let breakable = self
            .module
            .function(frame.function)
            .map(|f| f.is_breakable_offset(frame.instruction_pointer))
            .unwrap_or(false);
        if !breakable {
            return None;
        }

        let hit = self.breakpoints.hit_at(frame.location());
        let reason = self.stepper.check(self.stack.depth(), hit.is_some())?;
        Some(PausedEvent {
            reason,
            hit_breakpoints: hit.into_iter().collect(),
            call_frames: self.call_frames(),
        })
    }

    fn finish_idle(&mut self) {
        self.stepper.reset();
        self.skip_check = false;
        self.last_pause = None;
        self.state = RunState::Idle;
    }
}
