//! Strategy for waiting out daemon start-up before reconciliation runs.

use std::time::Duration;

use serde::Deserialize;

/// Declarative post-start readiness strategy.
///
/// The legacy behaviour is a fixed settle delay; deployments that want
/// deterministic start-up can opt into a bounded liveness poll instead.
/// Either way, interpreter reconciliation only runs once the strategy
/// completes.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ReadinessStrategy {
    /// Sleep for a fixed number of seconds after launching the daemon.
    Settle {
        /// Settle interval in seconds.
        seconds: u64,
    },
    /// Probe daemon liveness at an interval until ready or the deadline.
    Poll {
        /// Delay between liveness probes, in milliseconds.
        interval_ms: u64,
        /// Overall deadline, in milliseconds.
        timeout_ms: u64,
    },
}

impl ReadinessStrategy {
    /// Builds a fixed settle delay.
    #[must_use]
    pub const fn settle(seconds: u64) -> Self {
        Self::Settle { seconds }
    }

    /// Builds a bounded liveness poll.
    ///
    /// Durations beyond `u64::MAX` milliseconds saturate.
    #[must_use]
    pub fn poll(interval: Duration, timeout: Duration) -> Self {
        Self::Poll {
            interval_ms: saturating_millis(interval),
            timeout_ms: saturating_millis(timeout),
        }
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for ReadinessStrategy {
    fn default() -> Self {
        Self::settle(20)
    }
}
