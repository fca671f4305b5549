use std::{
    io,
    os::unix::process::ExitStatusExt,
    process::ExitStatus,
};

use thiserror::Error;

use crate::signal_description;

/// Why a wrapped command did not complete successfully.
#[derive(Debug, Error)]
pub enum RunError {
    /// The child could not be started.
    #[error("Failed to start command: {0}")]
    Launch(#[source] io::Error),
    /// The child ran and terminated with a failure condition.
    #[error(transparent)]
    Exit(#[from] ExitError),
    /// Waiting on the child failed.
    #[error("{0}")]
    Wait(#[source] io::Error),
}

/// A child that exited with a non-zero code or was killed by a signal.
#[derive(Debug, Error)]
#[error("{}", describe(.status))]
pub struct ExitError {
    status: ExitStatus,
}

impl ExitError {
    pub fn new(status: ExitStatus) -> Self {
        Self { status }
    }

    pub fn status(&self) -> ExitStatus {
        self.status
    }
}

fn describe(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        format!("exit status {code}")
    } else if let Some(sig) = status.signal() {
        let description = match signal_description(sig) {
            Some(description) => description.to_lowercase(),
            None => sig.to_string(),
        };
        if status.core_dumped() {
            format!("signal: {description} (core dumped)")
        } else {
            format!("signal: {description}")
        }
    } else {
        status.to_string()
    }
}
