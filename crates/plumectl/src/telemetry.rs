//! Tracing subscriber installation for the harness process.
//!
//! Logs go to stderr so stdout stays reserved for operation output such as
//! the `status` line. The subscriber is installed at most once per process:
//! the binary only calls [`initialise`] once, but tests drive [`crate::run`]
//! repeatedly in-process and later calls must succeed without side effects.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use plume_config::{LogFormat, LoggingSettings};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression did not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Filter expression that failed to parse.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// A global subscriber was already set outside this module.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on the first call.
///
/// Later calls are no-ops and report success, whatever settings they carry.
pub fn initialise(settings: &LoggingSettings) -> Result<(), TelemetryError> {
    INSTALLED
        .get_or_try_init(|| {
            let subscriber = build_subscriber(settings)?;
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(())
        })
        .map(|_| ())
}

fn build_subscriber(
    settings: &LoggingSettings,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let filter = EnvFilter::try_new(&settings.filter).map_err(|source| TelemetryError::Filter {
        filter: settings.filter.clone(),
        message: source.to_string(),
    })?;
    let base = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());
    Ok(match settings.format {
        LogFormat::Json => Box::new(base.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(base.compact().finish()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialise_is_idempotent_across_calls() {
        let settings = LoggingSettings::default();
        initialise(&settings).expect("first call should install the subscriber");
        initialise(&settings).expect("repeat call should be a no-op");
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let settings = LoggingSettings {
            filter: "not==a==filter".to_owned(),
            ..LoggingSettings::default()
        };
        let Err(error) = build_subscriber(&settings) else {
            panic!("malformed filter should be rejected")
        };
        assert!(matches!(error, TelemetryError::Filter { .. }));
    }

    #[test]
    fn both_formats_build_a_subscriber() {
        for format in [LogFormat::Compact, LogFormat::Json] {
            let settings = LoggingSettings {
                format,
                ..LoggingSettings::default()
            };
            build_subscriber(&settings).expect("subscriber should build");
        }
    }
}
