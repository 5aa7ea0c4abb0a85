//! Aggregate error surface of the lifecycle operations.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::applier::ApplyError;
use crate::dfs::DfsError;
use crate::discovery::DiscoveryError;
use crate::interpreter::ReconcileError;
use crate::probe::StatusError;
use crate::readiness::ReadinessError;
use crate::runner::CommandError;
use crate::users::ProvisionError;

/// Fatal failure of a lifecycle operation.
///
/// The controller never retries and never rolls back: the first error aborts
/// the operation and prior side effects stay on disk.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A filesystem resource could not be applied.
    #[error("resource application failed: {0}")]
    Resource(#[from] ApplyError),
    /// A delegated command exited unsuccessfully.
    #[error("delegated command failed: {0}")]
    Command(#[from] CommandError),
    /// The service user or group could not be provisioned.
    #[error("principal provisioning failed: {0}")]
    Provision(#[from] ProvisionError),
    /// A distributed-filesystem resource could not be provisioned.
    #[error("distributed filesystem provisioning failed: {0}")]
    Dfs(#[from] DfsError),
    /// Artefact discovery failed or was ambiguous.
    #[error("artefact discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
    /// No PID file appeared after the daemon was launched.
    #[error("daemon started but no pid file matching '{pattern}' appeared in '{dir}'")]
    MissingPidFile {
        /// PID directory that was searched.
        dir: Utf8PathBuf,
        /// Pattern that found no match.
        pattern: String,
    },
    /// A liveness probe failed.
    #[error("status probe failed: {0}")]
    Status(#[from] StatusError),
    /// The daemon did not become ready.
    #[error("readiness wait failed: {0}")]
    Readiness(#[from] ReadinessError),
    /// The interpreter-settings document could not be reconciled.
    #[error("interpreter reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
}
