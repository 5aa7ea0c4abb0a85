//! Configuration model for the Plume lifecycle controller.
//!
//! The hosting harness resolves every parameter the controller needs before
//! invoking an operation and hands them over as a single TOML document. This
//! crate parses that document into immutable snapshots: the full
//! [`ServiceParameters`] surface used by install/configure/start/stop, the
//! narrower [`StatusParameters`] needed by status checks, the discovered
//! [`ClusterTopology`] consumed by interpreter reconciliation, and the
//! [`ReadinessStrategy`] governing the post-start wait.
//!
//! Snapshots are constructed once per invocation and never mutated; there is
//! no ambient process-wide configuration state.

mod logging;
mod params;
mod readiness;
mod topology;

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

pub use logging::{LogFormat, LogFormatParseError, LoggingSettings};
pub use params::{ServiceParameters, StatusParameters, TemplateSet};
pub use readiness::ReadinessStrategy;
pub use topology::ClusterTopology;

/// Fully resolved configuration for one lifecycle invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Parameters describing the managed service instance.
    pub service: ServiceParameters,
    /// Discovered cluster endpoints used to patch interpreter settings.
    #[serde(default)]
    pub topology: ClusterTopology,
    /// Strategy for waiting out daemon start-up before reconciliation.
    #[serde(default)]
    pub readiness: ReadinessStrategy,
    /// Telemetry output settings for the harness.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Loads and validates a configuration document from `path`.
    pub fn load_from_path(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.service.validate()?;
        Ok(config)
    }
}

/// Errors raised while loading or validating the configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The parameter file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        /// Path of the unreadable document.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The parameter file is not valid TOML or misses required tables.
    #[error("failed to parse configuration '{path}': {source}")]
    Parse {
        /// Path of the malformed document.
        path: Utf8PathBuf,
        /// Underlying deserialisation error.
        #[source]
        source: toml::de::Error,
    },
    /// A required parameter resolved to an empty value.
    #[error("required parameter '{name}' is empty")]
    MissingParameter {
        /// Name of the offending field.
        name: &'static str,
    },
}
