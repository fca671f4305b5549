use std::{
    fmt, io,
    process::{Child, Command, Stdio},
    sync::{
        mpsc::{self, Receiver, TryRecvError},
        Mutex,
    },
    thread,
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{
    config::{SpinnerConfig, SpinnerStyle, DEFAULT_STYLE},
    error::{ExitError, RunError},
    Spinner, Status, Terminal,
};

/// How often the main flow checks whether the child has exited.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The external command: an executable looked up on `PATH` plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits `argv` into program and arguments. Returns `None` when it is empty.
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next()?;
        Some(Self::new(program, argv.collect()))
    }

    /// Only stdin is shared with the child, its output is discarded.
    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Starting,
    Running,
    Succeeded,
    Failed,
}

/// Runs one command behind a spinner.
pub struct Runner {
    command: CommandLine,
    style: &'static SpinnerStyle,
    state: RunState,
}

impl Runner {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            style: SpinnerStyle::named(DEFAULT_STYLE),
            state: RunState::NotStarted,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Starts the command, animates the spinner on `terminal` until the command
    /// exits and prints the outcome. Only the command decides the result, a spinner
    /// that cannot draw is logged and otherwise ignored.
    pub fn run(&mut self, terminal: Terminal) -> Result<(), RunError> {
        let label = self.command.to_string();
        let spinner = match Spinner::start(
            SpinnerConfig {
                text: format!("Running {label}"),
                style: self.style,
                remove_when_done: false,
            },
            terminal,
        ) {
            Ok(spinner) => Some(spinner),
            Err(e) => {
                warn!(error = %e, "failed to start spinner");
                None
            }
        };
        self.transition(RunState::Starting);

        let child = match self.command.command().spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = RunError::Launch(e);
                self.transition(RunState::Failed);
                report(spinner.as_deref(), Status::Fail, &err.to_string());
                return Err(err);
            }
        };
        info!(pid = child.id(), command = %label, "started");
        self.transition(RunState::Running);

        let done = wait_in_background(child);
        let result = wait_for_completion(&done);
        match &result {
            Ok(()) => {
                self.transition(RunState::Succeeded);
                report(spinner.as_deref(), Status::Success, &format!("{label} completed"));
            }
            Err(err) => {
                self.transition(RunState::Failed);
                report(spinner.as_deref(), Status::Fail, &format!("{label} failed: {err}"));
            }
        }
        result
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "state");
        self.state = next;
    }
}

fn report(spinner: Option<&Mutex<Spinner>>, status: Status, message: &str) {
    let Some(spinner) = spinner else {
        return;
    };
    let stopped = match status {
        Status::Success => Spinner::success(spinner, message),
        Status::Fail => Spinner::fail(spinner, message),
    };
    if let Err(e) = stopped {
        warn!(error = %e, "failed to stop spinner");
    }
}

/// Waits for `child` on its own thread. The result is sent exactly once.
fn wait_in_background(mut child: Child) -> Receiver<Result<(), RunError>> {
    let (tx, rx) = mpsc::sync_channel(1);
    thread::spawn(move || {
        let result = match child.wait() {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(ExitError::new(status).into()),
            Err(e) => {
                warn!(error = %e, "wait failed");
                Err(RunError::Wait(e))
            }
        };
        tx.send(result).ok();
    });
    rx
}

fn wait_for_completion(done: &Receiver<Result<(), RunError>>) -> Result<(), RunError> {
    loop {
        match done.try_recv() {
            Ok(result) => return result,
            Err(TryRecvError::Empty) => thread::sleep(POLL_INTERVAL),
            Err(TryRecvError::Disconnected) => {
                return Err(RunError::Wait(io::Error::new(
                    io::ErrorKind::Other,
                    "wait thread exited without a result",
                )))
            }
        }
    }
}
