//! Post-start readiness handling.
//!
//! The daemon performs its own initialisation after the start script
//! returns; interpreter reconciliation must not run before that settles.
//! The legacy behaviour is a fixed sleep. The poll strategy probes the PID
//! file at an interval instead, bounded by a deadline, which removes the
//! flakiness of a fixed delay without changing the ordering contract.

use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use plume_config::ReadinessStrategy;
use thiserror::Error;
use tracing::{debug, info};

use crate::probe::{ProcessHealth, ProcessStatusChecker, StatusError};

const READINESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::readiness");

/// Waits out daemon start-up according to `strategy`.
pub(crate) fn wait_for_daemon<C: ProcessStatusChecker>(
    strategy: ReadinessStrategy,
    checker: &C,
    pid_file: &Utf8Path,
) -> Result<(), ReadinessError> {
    match strategy {
        ReadinessStrategy::Settle { seconds } => {
            info!(
                target: READINESS_TARGET,
                seconds,
                "settling before interpreter reconciliation"
            );
            thread::sleep(Duration::from_secs(seconds));
            Ok(())
        }
        ReadinessStrategy::Poll {
            interval_ms,
            timeout_ms,
        } => {
            let deadline = Instant::now() + Duration::from_millis(timeout_ms);
            loop {
                match checker.check(pid_file)? {
                    ProcessHealth::Running { pid } => {
                        info!(target: READINESS_TARGET, pid, "daemon is ready");
                        return Ok(());
                    }
                    health => {
                        debug!(target: READINESS_TARGET, ?health, "daemon not ready yet");
                    }
                }
                if Instant::now() >= deadline {
                    return Err(ReadinessError::Timeout {
                        pid_file: pid_file.to_path_buf(),
                        timeout_ms,
                    });
                }
                thread::sleep(Duration::from_millis(interval_ms));
            }
        }
    }
}

/// Errors raised while waiting for daemon readiness.
#[derive(Debug, Error)]
pub enum ReadinessError {
    /// The daemon did not become ready before the deadline.
    #[error("daemon not ready after {timeout_ms} ms (pid file '{pid_file}')")]
    Timeout {
        /// PID file that was being probed.
        pid_file: Utf8PathBuf,
        /// Deadline that expired, in milliseconds.
        timeout_ms: u64,
    },
    /// A liveness probe failed outright.
    #[error("readiness probe failed: {0}")]
    Probe(#[from] StatusError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MockProcessStatusChecker;

    #[test]
    fn settle_strategy_never_probes() {
        let checker = MockProcessStatusChecker::new();
        wait_for_daemon(
            ReadinessStrategy::settle(0),
            &checker,
            Utf8Path::new("/var/run/notebook/notebook-notebook.pid"),
        )
        .expect("zero settle should succeed");
    }

    #[test]
    fn poll_strategy_returns_once_running() {
        let mut checker = MockProcessStatusChecker::new();
        let mut probes = 0u32;
        checker.expect_check().returning(move |_| {
            probes += 1;
            if probes < 3 {
                Ok(ProcessHealth::Stopped)
            } else {
                Ok(ProcessHealth::Running { pid: 4242 })
            }
        });
        wait_for_daemon(
            ReadinessStrategy::Poll {
                interval_ms: 1,
                timeout_ms: 5_000,
            },
            &checker,
            Utf8Path::new("/var/run/notebook/notebook-notebook.pid"),
        )
        .expect("poll should succeed once the daemon reports running");
    }

    #[test]
    fn poll_strategy_times_out_on_stale_process() {
        let mut checker = MockProcessStatusChecker::new();
        checker
            .expect_check()
            .returning(|_| Ok(ProcessHealth::Stale { pid: 7 }));
        let error = wait_for_daemon(
            ReadinessStrategy::Poll {
                interval_ms: 1,
                timeout_ms: 5,
            },
            &checker,
            Utf8Path::new("/var/run/notebook/notebook-notebook.pid"),
        )
        .expect_err("stale process should time out");
        assert!(matches!(error, ReadinessError::Timeout { .. }));
    }

    #[test]
    fn poll_strategy_propagates_probe_errors() {
        let mut checker = MockProcessStatusChecker::new();
        checker.expect_check().returning(|path| {
            Err(StatusError::ReadPidFile {
                path: path.to_path_buf(),
                source: std::io::Error::other("boom"),
            })
        });
        let error = wait_for_daemon(
            ReadinessStrategy::Poll {
                interval_ms: 1,
                timeout_ms: 5_000,
            },
            &checker,
            Utf8Path::new("/var/run/notebook/notebook-notebook.pid"),
        )
        .expect_err("probe failure should propagate");
        assert!(matches!(error, ReadinessError::Probe(_)));
    }
}
