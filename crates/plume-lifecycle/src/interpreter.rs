//! Reconciliation of interpreter settings against cluster topology.
//!
//! After the daemon comes up it owns `interpreter.json` in the conf
//! directory: a document with a top-level `interpreterSettings` map keyed by
//! opaque identifiers, each entry carrying a `group` tag and a `properties`
//! map of connection parameters. Reconciliation patches the endpoint URL of
//! the SQL-engine and secondary-store integrations to match the discovered
//! topology and rewrites the document in full. It is a targeted patch, not a
//! merge: no other key is touched, dropped, or reordered.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use plume_config::ClusterTopology;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

const INTERPRETER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::interpreter");

/// File name of the settings document inside the conf directory.
pub const SETTINGS_FILE: &str = "interpreter.json";

const SETTINGS_KEY: &str = "interpreterSettings";
const HIVE_GROUP: &str = "hive";
const PHOENIX_GROUP: &str = "phoenix";
const HIVE_URL_PROPERTY: &str = "hive.hiveserver2.url";
const PHOENIX_URL_PROPERTY: &str = "phoenix.jdbc.url";

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Number of interpreter entries whose endpoint URL was rewritten.
    pub patched: usize,
}

/// Patches the interpreter-settings document against discovered topology.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsReconciler {
    /// Reconciles `interpreter.json` under `conf_dir`.
    fn reconcile(
        &self,
        conf_dir: &Utf8Path,
        topology: &ClusterTopology,
    ) -> Result<ReconcileReport, ReconcileError>;
}

/// The production reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterReconciler;

impl InterpreterReconciler {
    /// Builds a new reconciler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SettingsReconciler for InterpreterReconciler {
    fn reconcile(
        &self,
        conf_dir: &Utf8Path,
        topology: &ClusterTopology,
    ) -> Result<ReconcileReport, ReconcileError> {
        let path = conf_dir.join(SETTINGS_FILE);
        let content = fs::read_to_string(&path).map_err(|source| ReconcileError::Read {
            path: path.clone(),
            source,
        })?;
        let mut document: Value =
            serde_json::from_str(&content).map_err(|source| ReconcileError::Parse {
                path: path.clone(),
                source,
            })?;

        let hive_url = topology.hive_jdbc_url();
        let phoenix_url = topology.phoenix_jdbc_url();
        let settings = document
            .get_mut(SETTINGS_KEY)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ReconcileError::MissingSettings { path: path.clone() })?;

        let mut patched = 0;
        for (id, entry) in settings.iter_mut() {
            let group = entry
                .get("group")
                .and_then(Value::as_str)
                .map(str::to_owned);
            let target = match group.as_deref() {
                Some(HIVE_GROUP) => hive_url.as_deref().map(|url| (HIVE_URL_PROPERTY, url)),
                Some(PHOENIX_GROUP) => {
                    phoenix_url.as_deref().map(|url| (PHOENIX_URL_PROPERTY, url))
                }
                _ => None,
            };
            let Some((property, url)) = target else {
                continue;
            };
            let Some(properties) = entry.get_mut("properties").and_then(Value::as_object_mut)
            else {
                continue;
            };
            properties.insert(property.to_owned(), Value::String(url.to_owned()));
            patched += 1;
            debug!(
                target: INTERPRETER_TARGET,
                setting = %id,
                property,
                "patched interpreter endpoint"
            );
        }

        let mut rendered =
            serde_json::to_string_pretty(&document).map_err(ReconcileError::Serialise)?;
        rendered.push('\n');
        fs::write(&path, rendered).map_err(|source| ReconcileError::Write {
            path: path.clone(),
            source,
        })?;
        info!(
            target: INTERPRETER_TARGET,
            file = %path,
            patched,
            "interpreter settings reconciled"
        );
        Ok(ReconcileReport { patched })
    }
}

/// Errors raised while reconciling the settings document.
///
/// All are fatal: a missing or malformed document is never retried here.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The settings document could not be read.
    #[error("failed to read settings document '{path}': {source}")]
    Read {
        /// Path of the unreadable document.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The settings document is not valid JSON.
    #[error("settings document '{path}' is not valid JSON: {source}")]
    Parse {
        /// Path of the malformed document.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The document lacks an `interpreterSettings` object.
    #[error("settings document '{path}' has no interpreterSettings object")]
    MissingSettings {
        /// Path of the incomplete document.
        path: Utf8PathBuf,
    },
    /// The patched document could not be serialised.
    #[error("failed to serialise settings document: {0}")]
    Serialise(#[source] serde_json::Error),
    /// The patched document could not be written back.
    #[error("failed to write settings document '{path}': {source}")]
    Write {
        /// Path of the unwritable document.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
