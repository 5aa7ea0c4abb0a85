//! Lifecycle control for a single long-running notebook service instance.
//!
//! The crate centres on two pieces of logic. [`LifecycleController`]
//! sequences the install / configure / start / stop / status operations as
//! ordered calls into a small set of collaborator traits: resource
//! application, delegated process execution, package installation,
//! distributed-filesystem provisioning, and PID-based status probing.
//! [`InterpreterReconciler`] runs after the daemon comes up and patches the
//! interpreter-settings JSON document against the discovered cluster
//! topology, leaving every unrelated entry untouched.
//!
//! Execution is single-threaded and synchronous: the hosting harness invokes
//! exactly one operation at a time, and on-disk artefacts (rendered configs,
//! the PID file, the settings document) are the only state crossing
//! operation boundaries. Every error is fatal to the current operation;
//! retry policy belongs to the harness.

mod applier;
mod controller;
mod dfs;
mod discovery;
mod interpreter;
mod packages;
mod probe;
mod readiness;
mod runner;
mod users;

pub use applier::{ApplyError, Ownership, ResourceApplier, SystemResourceApplier};
pub use controller::{Collaborators, LifecycleController, RunStatus};
pub use dfs::{DfsError, DfsResource, DistributedFs, ShellDistributedFs};
pub use discovery::{DiscoveredArtifact, DiscoveryError, find_unique};
pub use interpreter::{
    InterpreterReconciler, ReconcileError, ReconcileReport, SettingsReconciler,
};
pub use packages::{PackageInstaller, ShellPackageInstaller};
pub use probe::{ProcessHealth, ProcessStatusChecker, StatusError, SystemProcessProbe};
pub use readiness::ReadinessError;
pub use runner::{CommandError, ProcessRunner, RunAs, SystemProcessRunner};
pub use users::{Provisioning, ensure_group, ensure_user};

mod errors;
pub use errors::LifecycleError;

#[cfg(test)]
mod tests;
