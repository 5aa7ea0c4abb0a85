//! Immutable parameter snapshots for lifecycle operations.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::ConfigError;

/// Immutable snapshot of the resolved parameters for one lifecycle
/// invocation.
///
/// Constructed once from the harness-supplied document and passed by
/// reference into every operation; nothing mutates it afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceParameters {
    /// Root directory of the installed service.
    pub service_dir: Utf8PathBuf,
    /// Directory holding the service package and its scripts.
    pub package_dir: Utf8PathBuf,
    /// Directory receiving the rendered configuration artefacts.
    pub conf_dir: Utf8PathBuf,
    /// Directory where the daemon writes its PID file.
    pub pid_dir: Utf8PathBuf,
    /// Directory for the service log file.
    pub log_dir: Utf8PathBuf,
    /// Log file name inside the log directory.
    pub log_file: String,
    /// OS user the daemon and delegated commands run as.
    pub user: String,
    /// OS group owning the service artefacts.
    pub group: String,
    /// Host the service binds to.
    pub service_host: String,
    /// Port the service listens on.
    pub service_port: u16,
    /// Remote metastore host handed to the setup script.
    pub metastore_host: String,
    /// Remote metastore port handed to the setup script.
    pub metastore_port: u16,
    /// Remote store server port handed to the setup script.
    pub store_server_port: u16,
    /// Whether platform views are provisioned by the setup script.
    pub views_enabled: bool,
    /// Runtime (JVM) installation the setup script should use.
    pub runtime_home: Utf8PathBuf,
    /// Detected execution-engine version, recorded for diagnostics.
    pub engine_version: String,
    /// Detected execution-engine home, recorded for diagnostics.
    pub engine_home: Utf8PathBuf,
    /// Distributed-filesystem directory receiving the engine dependency jar.
    pub engine_jar_dir: Utf8PathBuf,
    /// Shell command installing the service package; `None` leaves
    /// installation to the platform.
    #[serde(default)]
    pub package_install_command: Option<String>,
    /// Rendered configuration bodies.
    pub templates: TemplateSet,
}

impl ServiceParameters {
    /// Absolute path of the service log file.
    #[must_use]
    pub fn log_path(&self) -> Utf8PathBuf {
        self.log_dir.join(&self.log_file)
    }

    /// Rejects snapshots whose required parameters resolved empty.
    ///
    /// The harness substitutes values from several sources; a missing source
    /// surfaces here as an empty string rather than a TOML parse failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required: [(&'static str, &str); 8] = [
            ("service.service_dir", self.service_dir.as_str()),
            ("service.package_dir", self.package_dir.as_str()),
            ("service.conf_dir", self.conf_dir.as_str()),
            ("service.pid_dir", self.pid_dir.as_str()),
            ("service.log_dir", self.log_dir.as_str()),
            ("service.log_file", &self.log_file),
            ("service.user", &self.user),
            ("service.group", &self.group),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(ConfigError::MissingParameter { name });
            }
        }
        Ok(())
    }
}

/// Configuration bodies rendered into the conf directory.
///
/// Bodies are carried verbatim; substitution happens before the harness
/// hands them over. Empty bodies are legal and render as empty files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSet {
    /// Key/value pairs rendered into the structured site configuration.
    #[serde(default)]
    pub site_config: BTreeMap<String, String>,
    /// Body of the environment script.
    #[serde(default)]
    pub env_script: String,
    /// Body of the access-control configuration.
    #[serde(default)]
    pub access_control: String,
    /// Body of the logging configuration.
    #[serde(default)]
    pub logging_config: String,
}

/// Narrow snapshot sufficient for PID-file based status checks.
///
/// Resolvable without the full configuration surface so `status` keeps
/// working when the wider parameter set is unavailable.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusParameters {
    /// Directory where the daemon writes its PID file.
    pub pid_dir: Utf8PathBuf,
    /// OS user embedded in the PID file name.
    pub user: String,
}

impl StatusParameters {
    /// Derives the narrow snapshot from a full parameter set.
    #[must_use]
    pub fn from_service(params: &ServiceParameters) -> Self {
        Self {
            pid_dir: params.pid_dir.clone(),
            user: params.user.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample() -> ServiceParameters {
        ServiceParameters {
            service_dir: "/usr/lib/notebook".into(),
            package_dir: "/var/lib/notebook-package".into(),
            conf_dir: "/etc/notebook/conf".into(),
            pid_dir: "/var/run/notebook".into(),
            log_dir: "/var/log/notebook".into(),
            log_file: "notebook-setup.log".into(),
            user: "notebook".into(),
            group: "notebook".into(),
            service_host: "nb1.example".into(),
            service_port: 9995,
            metastore_host: "ms1.example".into(),
            metastore_port: 9083,
            store_server_port: 10000,
            views_enabled: true,
            runtime_home: "/usr/lib/jvm/java".into(),
            engine_version: "1.6.2".into(),
            engine_home: "/usr/lib/engine".into(),
            engine_jar_dir: "/apps/engine/jars".into(),
            package_install_command: None,
            templates: TemplateSet::default(),
        }
    }

    #[test]
    fn log_path_joins_directory_and_file() {
        let params = sample();
        assert_eq!(
            params.log_path().as_str(),
            "/var/log/notebook/notebook-setup.log"
        );
    }

    #[test]
    fn validate_accepts_complete_parameters() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user() {
        let mut params = sample();
        params.user = String::new();
        let error = params.validate().expect_err("empty user should be rejected");
        assert!(error.to_string().contains("service.user"));
    }

    #[test]
    fn status_parameters_derive_from_service() {
        let params = sample();
        let status = StatusParameters::from_service(&params);
        assert_eq!(status.pid_dir, params.pid_dir);
        assert_eq!(status.user, params.user);
    }
}
