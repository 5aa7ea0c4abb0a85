//! Ordered sequencing of the five lifecycle operations.

use std::fs;

use plume_config::{ClusterTopology, ReadinessStrategy, ServiceParameters, StatusParameters};
use tracing::{info, warn};

use crate::applier::{Ownership, ResourceApplier};
use crate::dfs::{DfsResource, DistributedFs};
use crate::discovery::{DiscoveredArtifact, find_unique};
use crate::errors::LifecycleError;
use crate::interpreter::SettingsReconciler;
use crate::packages::PackageInstaller;
use crate::probe::{ProcessHealth, ProcessStatusChecker, StatusError};
use crate::readiness;
use crate::runner::{ProcessRunner, RunAs};
use crate::users::{self, Provisioning};

const CONTROLLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::controller");

const PID_PREFIX: &str = "notebook";
const SITE_CONFIG_NAME: &str = "notebook-site.xml";
const ENV_SCRIPT_NAME: &str = "notebook-env.sh";
const ACCESS_CONTROL_NAME: &str = "access-control.ini";
const LOGGING_CONFIG_NAME: &str = "logging.properties";
const DAEMON_SCRIPT: &str = "bin/notebook-daemon.sh";
const SETUP_SCRIPT: &str = "scripts/setup_snapshot.sh";
const ENGINE_DEP_DIR: &str = "interpreter/engine/dep";
const ENGINE_DEP_PREFIX: &str = "notebook-engine-dependencies-";
const ENGINE_DEP_SUFFIX: &str = ".jar";
const APPS_DIR: &str = "/apps/notebook";
const DIR_MODE: u32 = 0o755;
const ENGINE_JAR_MODE: u32 = 0o444;

/// Reported run state of the managed daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The daemon process is alive.
    Running {
        /// PID recorded in the PID file.
        pid: u32,
    },
    /// No PID file exists; the daemon is not running.
    NotRunning,
    /// A PID file exists but its process is gone.
    Stale {
        /// PID recorded in the orphaned PID file.
        pid: u32,
    },
}

/// External collaborators the controller sequences.
///
/// Grouped so tests can swap each piece independently without a long
/// constructor argument list.
#[derive(Debug)]
pub struct Collaborators<A, R, P, F, C, N> {
    /// Filesystem resource applier.
    pub applier: A,
    /// Delegated command runner.
    pub runner: R,
    /// Platform package installer.
    pub installer: P,
    /// Distributed-filesystem client.
    pub dfs: F,
    /// PID liveness checker.
    pub checker: C,
    /// Interpreter-settings reconciler.
    pub reconciler: N,
}

/// Sequences install / configure / start / stop / status for one service
/// instance.
///
/// Operations are synchronous and expect to run one at a time against a
/// given instance; on-disk artefacts are the only state shared between
/// invocations. Every operation is idempotent at this layer except
/// `install`, whose one-time setup script is not safely re-entrant with
/// partial external state.
#[derive(Debug)]
pub struct LifecycleController<A, R, P, F, C, N> {
    collaborators: Collaborators<A, R, P, F, C, N>,
    readiness: ReadinessStrategy,
}

impl<A, R, P, F, C, N> LifecycleController<A, R, P, F, C, N>
where
    A: ResourceApplier,
    R: ProcessRunner,
    P: PackageInstaller,
    F: DistributedFs,
    C: ProcessStatusChecker,
    N: SettingsReconciler,
{
    /// Builds a controller around the given collaborators.
    pub fn new(collaborators: Collaborators<A, R, P, F, C, N>, readiness: ReadinessStrategy) -> Self {
        Self {
            collaborators,
            readiness,
        }
    }

    /// Installs the service: scripts made executable, principals ensured,
    /// package delegated, directories owned, then `configure` and the
    /// one-time setup script.
    ///
    /// Not safely re-entrant once the setup script has partially run; that
    /// risk sits with the invoking harness.
    pub fn install(&self, params: &ServiceParameters) -> Result<(), LifecycleError> {
        info!(target: CONTROLLER_TARGET, service_dir = %params.service_dir, "installing service");
        let runner = &self.collaborators.runner;
        runner.run(&format!("chmod -R 755 {}", params.package_dir), &RunAs::Agent)?;
        runner.run(
            &format!("chmod a+x {}", params.package_dir.join(SETUP_SCRIPT)),
            &RunAs::Agent,
        )?;

        let user_outcome = users::ensure_user(runner, &params.user)?;
        let group_outcome = users::ensure_group(runner, &params.group)?;
        if user_outcome == Provisioning::Created || group_outcome == Provisioning::Created {
            info!(
                target: CONTROLLER_TARGET,
                user = %params.user,
                group = %params.group,
                "provisioned service principals"
            );
        }

        self.collaborators.installer.install()?;

        runner.run(
            &format!(
                "chown -R {}:{} {}",
                params.user, params.group, params.service_dir
            ),
            &RunAs::Agent,
        )?;
        self.collaborators.applier.ensure_path(
            &[params.pid_dir.clone(), params.service_dir.clone()],
            &ownership(params),
            DIR_MODE,
            true,
        )?;

        runner.run(
            &format!(
                "echo engine_version:{} detected for engine_home: {} >> {}",
                params.engine_version,
                params.engine_home,
                params.log_path()
            ),
            &RunAs::user(&params.user),
        )?;

        self.configure(params)?;

        runner.run(
            &format!(
                "{} {} {} {} {} {} {} {} {} {} >> {}",
                params.package_dir.join(SETUP_SCRIPT),
                params.service_dir,
                params.metastore_host,
                params.metastore_port,
                params.store_server_port,
                params.service_host,
                params.service_port,
                params.views_enabled,
                params.package_dir,
                params.runtime_home,
                params.log_path()
            ),
            &RunAs::user(&params.user),
        )?;
        info!(target: CONTROLLER_TARGET, "service installed");
        Ok(())
    }

    /// Renders the four configuration artefacts into the conf directory.
    ///
    /// Safe to call repeatedly; every render is a full overwrite.
    pub fn configure(&self, params: &ServiceParameters) -> Result<(), LifecycleError> {
        let ownership = ownership(params);
        let applier = &self.collaborators.applier;
        applier.ensure_path(&[params.log_dir.clone()], &ownership, DIR_MODE, true)?;
        applier.render_structured_config(
            SITE_CONFIG_NAME,
            &params.conf_dir,
            &params.templates.site_config,
            &ownership,
        )?;
        applier.render_template(
            &params.conf_dir.join(ENV_SCRIPT_NAME),
            &params.templates.env_script,
            &ownership,
        )?;
        applier.render_template(
            &params.conf_dir.join(ACCESS_CONTROL_NAME),
            &params.templates.access_control,
            &ownership,
        )?;
        applier.render_template(
            &params.conf_dir.join(LOGGING_CONFIG_NAME),
            &params.templates.logging_config,
            &ownership,
        )?;
        info!(target: CONTROLLER_TARGET, conf_dir = %params.conf_dir, "configuration rendered");
        Ok(())
    }

    /// Starts the daemon: `configure`, one-time engine registration when the
    /// dependency jar is present, daemon launch, readiness wait, then
    /// interpreter reconciliation.
    pub fn start(
        &mut self,
        params: &ServiceParameters,
        topology: &ClusterTopology,
    ) -> Result<(), LifecycleError> {
        self.configure(params)?;

        let dep_dir = params.service_dir.join(ENGINE_DEP_DIR);
        if let Some(jar) = find_unique(&dep_dir, ENGINE_DEP_PREFIX, ENGINE_DEP_SUFFIX)? {
            self.register_engine_dependencies(params, &jar)?;
        }

        self.collaborators.runner.run(
            &format!(
                "{} start >> {}",
                params.service_dir.join(DAEMON_SCRIPT),
                params.log_path()
            ),
            &RunAs::user(&params.user),
        )?;

        let pattern = pid_pattern(&params.user);
        let pid_file = find_unique(&params.pid_dir, &pattern, ".pid")?.ok_or_else(|| {
            LifecycleError::MissingPidFile {
                dir: params.pid_dir.clone(),
                pattern: format!("{pattern}*.pid"),
            }
        })?;
        let contents =
            fs::read_to_string(&pid_file.path).map_err(|source| StatusError::ReadPidFile {
                path: pid_file.path.clone(),
                source,
            })?;
        info!(
            target: CONTROLLER_TARGET,
            pid_file = %pid_file.path,
            pid = contents.trim(),
            "daemon launched"
        );

        readiness::wait_for_daemon(
            self.readiness,
            &self.collaborators.checker,
            &pid_file.path,
        )?;

        let report = self
            .collaborators
            .reconciler
            .reconcile(&params.conf_dir, topology)?;
        info!(
            target: CONTROLLER_TARGET,
            patched = report.patched,
            "service started"
        );
        Ok(())
    }

    /// Stops the daemon via its stop script.
    ///
    /// Stopping an already-stopped daemon is indistinguishable from a normal
    /// stop here; the script's exit code is the sole failure signal.
    pub fn stop(&self, params: &ServiceParameters) -> Result<(), LifecycleError> {
        // The log directory may not exist if configure never ran on this
        // host.
        self.collaborators.applier.ensure_path(
            &[params.log_dir.clone()],
            &ownership(params),
            DIR_MODE,
            true,
        )?;
        self.collaborators.runner.run(
            &format!(
                "{} stop >> {}",
                params.service_dir.join(DAEMON_SCRIPT),
                params.log_path()
            ),
            &RunAs::user(&params.user),
        )?;
        info!(target: CONTROLLER_TARGET, "service stopped");
        Ok(())
    }

    /// Reports the daemon's run state without mutating anything.
    ///
    /// An absent PID file is a normal negative result, never an error.
    pub fn status(&self, params: &StatusParameters) -> Result<RunStatus, LifecycleError> {
        let pattern = pid_pattern(&params.user);
        let Some(pid_file) = find_unique(&params.pid_dir, &pattern, ".pid")? else {
            return Ok(RunStatus::NotRunning);
        };
        let status = match self.collaborators.checker.check(&pid_file.path)? {
            ProcessHealth::Running { pid } => RunStatus::Running { pid },
            ProcessHealth::Stopped => RunStatus::NotRunning,
            ProcessHealth::Stale { pid } => {
                warn!(
                    target: CONTROLLER_TARGET,
                    pid_file = %pid_file.path,
                    pid,
                    "pid file exists but its process is gone"
                );
                RunStatus::Stale { pid }
            }
        };
        Ok(status)
    }

    fn register_engine_dependencies(
        &mut self,
        params: &ServiceParameters,
        jar: &DiscoveredArtifact,
    ) -> Result<(), LifecycleError> {
        info!(
            target: CONTROLLER_TARGET,
            jar = %jar.path,
            "registering engine dependencies with the distributed filesystem"
        );
        let dfs = &mut self.collaborators.dfs;
        dfs.ensure(DfsResource::directory(
            format!("/user/{}", params.user),
            params.user.clone(),
        ))?;
        dfs.ensure(DfsResource::directory(
            format!("/user/{}/scratch", params.user),
            params.user.clone(),
        ))?;
        dfs.ensure(DfsResource::directory(APPS_DIR, params.user.clone()))?;
        dfs.ensure(DfsResource::File {
            path: params.engine_jar_dir.join(&jar.file_name),
            source: jar.path.clone(),
            owner: params.user.clone(),
            group: params.group.clone(),
            mode: ENGINE_JAR_MODE,
            replace_existing: true,
        })?;
        dfs.execute()?;
        Ok(())
    }
}

fn ownership(params: &ServiceParameters) -> Ownership {
    Ownership::new(params.user.clone(), params.group.clone())
}

fn pid_pattern(user: &str) -> String {
    format!("{PID_PREFIX}-{user}")
}
