//! Message-passing front end for a [`Debugger`].
//!
//! A [`DebugSession`] owns one debugger on a worker thread. Clients talk to
//! it through a [`SessionClient`]: every [`DebugRequest`] is answered with a
//! [`DebugResponse`] on a private reply channel, and everything that happens
//! asynchronously (module parsed, pauses, completion, traps) is published as
//! a [`DebugEvent`] on the event channel.
//!
//! While code is running the worker executes in fuel slices and drains
//! pending commands between slices, so requests are applied only between
//! instructions.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_SESSION_FUEL_SLICE;
use crate::debugger::engine::Debugger;
use crate::debugger::state::RunState;
use crate::debugger::stepper::StepAction;
use crate::error::{DebugResult, DebuggerError};
use crate::protocol::{DebugEvent, DebugRequest, DebugResponse};
use crate::runtime::executor::Executor;
use crate::runtime::parser::coerce_args;
use crate::runtime::result::{PausedEvent, RunCompletion, RunOutcome};
use crate::Result;

/// How long [`SessionClient`] waits for an event before giving up.
pub const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_secs(30);

struct Command {
    request: DebugRequest,
    reply: SyncSender<DebugResponse>,
}

pub struct DebugSession<E: Executor> {
    debugger: Debugger<E>,
    commands: Receiver<Command>,
    events: Sender<DebugEvent>,
}

impl<E: Executor + Send + 'static> DebugSession<E> {
    /// Move `debugger` onto a worker thread and return the client end.
    ///
    /// The first event published is [`DebugEvent::ModuleParsed`].
    pub fn spawn(mut debugger: Debugger<E>) -> SessionClient {
        if debugger.fuel_slice().is_none() {
            debugger.set_fuel_slice(Some(DEFAULT_SESSION_FUEL_SLICE));
        }
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let session = DebugSession {
            debugger,
            commands: command_rx,
            events: event_tx,
        };
        let handle = thread::spawn(move || session.serve());

        SessionClient {
            commands: command_tx,
            events: event_rx,
            handle: Some(handle),
            timeout: DEFAULT_EVENT_TIMEOUT,
        }
    }
}

impl<E: Executor> DebugSession<E> {
    fn serve(mut self) {
        let module = self.debugger.module();
        self.emit(DebugEvent::ModuleParsed {
            url: module.url().to_string(),
            functions: module.functions().iter().map(|f| f.name().to_string()).collect(),
        });

        loop {
            if self.debugger.state() == RunState::Running {
                loop {
                    match self.commands.try_recv() {
                        Ok(command) => {
                            if !self.handle(command) {
                                return;
                            }
                        }
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => return,
                    }
                }
                self.drive();
            } else {
                match self.commands.recv() {
                    Ok(command) => {
                        if !self.handle(command) {
                            return;
                        }
                    }
                    Err(_) => {
                        debug!("All clients gone; closing debug session");
                        return;
                    }
                }
            }
        }
    }

    /// Apply one command. Returns `false` once the client disconnects.
    fn handle(&mut self, command: Command) -> bool {
        let disconnect = command.request == DebugRequest::Disconnect;
        let response = match self.apply(command.request) {
            Ok(response) => response,
            Err(err) => {
                debug!("Request rejected: {}", err);
                DebugResponse::Error(err.to_string())
            }
        };
        if command.reply.send(response).is_err() {
            warn!("Client dropped its reply channel");
        }
        !disconnect
    }

    fn apply(&mut self, request: DebugRequest) -> DebugResult<DebugResponse> {
        match request {
            DebugRequest::SetBreakpoint { location } => {
                let breakpoint = match location.function {
                    Some(function) => self.debugger.set_breakpoint(function, location.offset)?,
                    None => self.debugger.set_breakpoint_at_offset(location.offset)?,
                };
                Ok(DebugResponse::BreakpointSet {
                    breakpoint_id: breakpoint.id,
                    actual_location: breakpoint.location(),
                })
            }
            DebugRequest::RemoveBreakpoint { breakpoint_id } => {
                self.debugger.remove_breakpoint(breakpoint_id)?;
                Ok(DebugResponse::Ok)
            }
            DebugRequest::StepInto => self.continue_with(StepAction::Into),
            DebugRequest::StepOver => self.continue_with(StepAction::Over),
            DebugRequest::StepOut => self.continue_with(StepAction::Out),
            DebugRequest::Resume => self.continue_with(StepAction::Resume),
            DebugRequest::Pause => {
                self.debugger.request_pause();
                Ok(DebugResponse::Ok)
            }
            DebugRequest::Invoke { export, args } => {
                let module = self.debugger.module();
                let function = module
                    .export(&export)
                    .and_then(|id| module.function(id))
                    .ok_or_else(|| DebuggerError::UnknownExport(export.clone()))?;
                let args = coerce_args(function.signature(), &args)?;
                self.debugger.start(&export, args)?;
                Ok(DebugResponse::Ok)
            }
            DebugRequest::ListBreakpoints => Ok(DebugResponse::Breakpoints(self.debugger.breakpoints())),
            DebugRequest::GetState => Ok(DebugResponse::State(self.debugger.snapshot())),
            DebugRequest::Disconnect => {
                info!("Client disconnected");
                Ok(DebugResponse::Ok)
            }
        }
    }

    fn continue_with(&mut self, action: StepAction) -> DebugResult<DebugResponse> {
        self.debugger.continue_with(action)?;
        match self.debugger.state() {
            RunState::Running => self.emit(DebugEvent::Resumed),
            // Nothing was running: report completion straight away.
            _ => self.drive(),
        }
        Ok(DebugResponse::Ok)
    }

    /// Run one slice and publish what it produced.
    fn drive(&mut self) {
        match self.debugger.run() {
            Ok(RunOutcome::Paused(event)) => self.emit(DebugEvent::Paused(event)),
            Ok(RunOutcome::Finished(completion)) => self.emit(DebugEvent::Finished(completion)),
            Ok(RunOutcome::Yielded) => {}
            Err(err) => self.emit(DebugEvent::Trapped {
                message: err.to_string(),
            }),
        }
    }

    fn emit(&self, event: DebugEvent) {
        if self.events.send(event).is_err() {
            debug!("No event listener; event dropped");
        }
    }
}

/// Client end of a [`DebugSession`].
pub struct SessionClient {
    commands: Sender<Command>,
    events: Receiver<DebugEvent>,
    handle: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl SessionClient {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `request` and wait for its response.
    pub fn send(&self, request: DebugRequest) -> Result<DebugResponse> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        self.commands
            .send(Command {
                request,
                reply: reply_tx,
            })
            .map_err(|_| DebuggerError::SessionClosed)?;
        Ok(reply_rx.recv().map_err(|_| DebuggerError::SessionClosed)?)
    }

    /// Like [`SessionClient::send`], turning [`DebugResponse::Error`] into an error.
    pub fn request(&self, request: DebugRequest) -> Result<DebugResponse> {
        match self.send(request)? {
            DebugResponse::Error(message) => Err(anyhow!(message)),
            response => Ok(response),
        }
    }

    /// Next event in publication order.
    pub fn next_event(&self) -> Result<DebugEvent> {
        self.events.recv_timeout(self.timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => anyhow!("Timed out after {:?} waiting for an event", self.timeout),
            RecvTimeoutError::Disconnected => DebuggerError::SessionClosed.into(),
        })
    }

    /// Consume events until the `n`th one (1-based) matching `predicate`.
    pub fn wait_for_nth(&self, n: usize, predicate: impl Fn(&DebugEvent) -> bool) -> Result<DebugEvent> {
        let mut seen = 0;
        loop {
            let event = self.next_event()?;
            if predicate(&event) {
                seen += 1;
                if seen >= n {
                    return Ok(event);
                }
            }
        }
    }

    /// Wait for the next pause, skipping `Resumed` and `ModuleParsed`.
    pub fn wait_for_pause(&self) -> Result<PausedEvent> {
        loop {
            match self.next_event()? {
                DebugEvent::Paused(event) => return Ok(event),
                DebugEvent::Finished(_) => bail!("Execution finished before pausing"),
                DebugEvent::Trapped { message } => bail!("Execution trapped before pausing: {}", message),
                DebugEvent::Resumed | DebugEvent::ModuleParsed { .. } => {}
            }
        }
    }

    /// Wait for the running invocation to finish.
    pub fn wait_for_completion(&self) -> Result<RunCompletion> {
        loop {
            match self.next_event()? {
                DebugEvent::Finished(completion) => return Ok(completion),
                DebugEvent::Trapped { message } => bail!("Execution trapped: {}", message),
                DebugEvent::Paused(event) => {
                    let offset = event.location().map(|l| l.offset).unwrap_or_default();
                    bail!("Execution paused at offset {} ({})", offset, event.reason)
                }
                DebugEvent::Resumed | DebugEvent::ModuleParsed { .. } => {}
            }
        }
    }

    /// Ask the session to stop and wait for its thread.
    pub fn disconnect(mut self) -> Result<()> {
        let result = self.send(DebugRequest::Disconnect).map(|_| ());
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("Debug session thread panicked"))?;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::protocol::BreakpointLocation;
    use crate::runtime::builder::{op, ModuleBuilder};
    use crate::runtime::load_module;
    use crate::runtime::module::{FunctionId, Signature, WasmType};
    use crate::runtime::result::PauseReason;
    use crate::runtime::value::Value;
    use serde_json::json;

    fn client() -> SessionClient {
        let mut builder = ModuleBuilder::new();
        builder
            .add_function("id", Signature::new([WasmType::I32], [WasmType::I32]))
            .body(&[op::NOP, op::LOCAL_GET, 0])
            .export_as("id");
        let module = load_module(&builder.build()).unwrap();
        DebugSession::spawn(Debugger::new(module, &Config::default()))
            .with_timeout(Duration::from_secs(5))
    }

    #[test]
    fn module_parsed_comes_first() {
        let client = client();
        let event = client
            .wait_for_nth(1, |e| matches!(e, DebugEvent::ModuleParsed { .. }))
            .unwrap();
        let DebugEvent::ModuleParsed { url, functions } = event else {
            unreachable!()
        };
        assert!(url.starts_with("wasm://wasm/"));
        assert_eq!(functions, vec!["id".to_string()]);
        client.disconnect().unwrap();
    }

    #[test]
    fn breakpoint_then_resume() {
        let client = client();
        let response = client
            .request(DebugRequest::SetBreakpoint {
                location: BreakpointLocation {
                    function: Some(FunctionId(0)),
                    offset: 0,
                },
            })
            .unwrap();
        let DebugResponse::BreakpointSet { actual_location, .. } = response else {
            panic!("unexpected response: {:?}", response);
        };

        client
            .request(DebugRequest::Invoke {
                export: "id".into(),
                args: vec![json!(9)],
            })
            .unwrap();
        let pause = client.wait_for_pause().unwrap();
        assert_eq!(pause.reason, PauseReason::Breakpoint);
        assert_eq!(pause.location(), Some(actual_location));

        client.request(DebugRequest::Resume).unwrap();
        let completion = client.wait_for_completion().unwrap();
        assert_eq!(completion.results, vec![Value::I32(9)]);
        client.disconnect().unwrap();
    }

    #[test]
    fn errors_come_back_as_responses() {
        let client = client();
        let response = client
            .send(DebugRequest::Invoke {
                export: "missing".into(),
                args: vec![],
            })
            .unwrap();
        assert_eq!(
            response,
            DebugResponse::Error(DebuggerError::UnknownExport("missing".into()).to_string())
        );
        // Removing an unknown breakpoint is not an error.
        assert_eq!(
            client
                .send(DebugRequest::RemoveBreakpoint {
                    breakpoint_id: crate::runtime::result::BreakpointId(7)
                })
                .unwrap(),
            DebugResponse::Ok
        );
        client.disconnect().unwrap();
    }

    #[test]
    fn resume_while_idle_finishes() {
        let client = client();
        client.request(DebugRequest::Resume).unwrap();
        assert_eq!(client.wait_for_completion().unwrap(), RunCompletion::default());
        client.disconnect().unwrap();
    }

    #[test]
    fn closed_sessions_report_it() {
        let client = client();
        let commands = client.commands.clone();
        client.disconnect().unwrap();

        let (reply, _) = mpsc::sync_channel(1);
        assert!(commands
            .send(Command {
                request: DebugRequest::GetState,
                reply,
            })
            .is_err());
    }
}
