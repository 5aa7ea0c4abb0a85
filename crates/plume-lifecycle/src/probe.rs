//! PID-file based liveness probing for the managed daemon.

use std::fs;
use std::io;
use std::num::ParseIntError;

use camino::{Utf8Path, Utf8PathBuf};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use thiserror::Error;

/// Outcome of interpreting a PID file against the live process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessHealth {
    /// The recorded process is alive.
    Running {
        /// PID read from the file.
        pid: u32,
    },
    /// The PID file exists but records no process yet.
    Stopped,
    /// The PID file records a process that no longer exists.
    Stale {
        /// PID read from the file.
        pid: u32,
    },
}

/// Interprets a PID file against the live process table.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessStatusChecker {
    /// Reads `pid_file` and probes the recorded process.
    fn check(&self, pid_file: &Utf8Path) -> Result<ProcessHealth, StatusError>;
}

/// Checker that probes processes with a null signal.
///
/// `EPERM` counts as alive: the process exists even though this user may not
/// signal it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessProbe;

impl SystemProcessProbe {
    /// Builds a new system probe.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProcessStatusChecker for SystemProcessProbe {
    fn check(&self, pid_file: &Utf8Path) -> Result<ProcessHealth, StatusError> {
        let content = fs::read_to_string(pid_file).map_err(|source| StatusError::ReadPidFile {
            path: pid_file.to_path_buf(),
            source,
        })?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(ProcessHealth::Stopped);
        }
        let pid: u32 = trimmed.parse().map_err(|source| StatusError::ParsePid {
            path: pid_file.to_path_buf(),
            source,
        })?;
        let Ok(raw) = i32::try_from(pid) else {
            // Beyond the kernel's pid range, so no live process can match.
            return Ok(ProcessHealth::Stale { pid });
        };
        match kill(Pid::from_raw(raw), None) {
            Ok(()) | Err(Errno::EPERM) => Ok(ProcessHealth::Running { pid }),
            Err(Errno::ESRCH) | Err(Errno::ECHILD) => Ok(ProcessHealth::Stale { pid }),
            Err(source) => Err(StatusError::Probe { pid, source }),
        }
    }
}

/// Errors raised while probing daemon liveness.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The PID file could not be read.
    #[error("failed to read pid file '{path}': {source}")]
    ReadPidFile {
        /// Unreadable PID file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The PID file does not contain an integer.
    #[error("pid file '{path}' does not contain a pid: {source}")]
    ParsePid {
        /// Malformed PID file.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: ParseIntError,
    },
    /// Probing the recorded process failed.
    #[error("failed to probe process {pid}: {source}")]
    Probe {
        /// PID that could not be probed.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}
