//! Delegated execution of shell commands, optionally as another user.

use std::io;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

const RUNNER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runner");

/// Identity a delegated command runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunAs {
    /// Run as the invoking agent (typically root).
    Agent,
    /// Run as the named OS user.
    User(String),
}

impl RunAs {
    /// Builds a named-user identity.
    pub fn user(name: impl Into<String>) -> Self {
        Self::User(name.into())
    }
}

/// Executes a shell command on behalf of the controller.
///
/// A non-zero exit is surfaced as an error; callers that tolerate failure
/// must do so explicitly.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessRunner {
    /// Runs `command` through a shell under the given identity.
    fn run(&self, command: &str, run_as: &RunAs) -> Result<(), CommandError>;
}

/// Runner that spawns real processes via `sh -c`.
///
/// Named-user commands are wrapped in `su`, mirroring how the platform
/// agent drops privileges for service-owned actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    /// Builds a new system runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &str, run_as: &RunAs) -> Result<(), CommandError> {
        debug!(target: RUNNER_TARGET, command, ?run_as, "running delegated command");
        let mut invocation = match run_as {
            RunAs::User(user) => {
                let mut invocation = Command::new("su");
                invocation
                    .arg("-s")
                    .arg("/bin/sh")
                    .arg(user)
                    .arg("-c")
                    .arg(command);
                invocation
            }
            RunAs::Agent => {
                let mut invocation = Command::new("sh");
                invocation.arg("-c").arg(command);
                invocation
            }
        };
        let status = invocation
            .status()
            .map_err(|source| CommandError::Spawn {
                command: command.to_owned(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(CommandError::Failed {
                command: command.to_owned(),
                code: status.code(),
            })
        }
    }
}

/// Errors raised by delegated command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The shell process could not be spawned.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        /// Command that failed to spawn.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The command ran but exited unsuccessfully.
    #[error("command '{command}' exited with status {code:?}")]
    Failed {
        /// Command that failed.
        command: String,
        /// Exit code, when the process was not killed by a signal.
        code: Option<i32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_command_returns_ok() {
        let runner = SystemProcessRunner::new();
        assert!(runner.run("true", &RunAs::Agent).is_ok());
    }

    #[test]
    fn failing_command_surfaces_exit_code() {
        let runner = SystemProcessRunner::new();
        let error = runner
            .run("exit 3", &RunAs::Agent)
            .expect_err("non-zero exit should fail");
        match error {
            CommandError::Failed { code, .. } => assert_eq!(code, Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
