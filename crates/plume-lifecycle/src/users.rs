//! Explicit exists-or-create provisioning of the service user and group.

use nix::unistd::{Group, User};
use thiserror::Error;
use tracing::info;

use crate::runner::{CommandError, ProcessRunner, RunAs};

const USERS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::users");

/// Outcome of an idempotent provisioning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    /// The principal already existed; nothing was done.
    Existing,
    /// The principal was created by this call.
    Created,
}

/// Ensures the OS user `name` exists, creating it when absent.
pub fn ensure_user<R: ProcessRunner>(
    runner: &R,
    name: &str,
) -> Result<Provisioning, ProvisionError> {
    match User::from_name(name) {
        Ok(Some(_)) => Ok(Provisioning::Existing),
        Ok(None) => {
            runner.run(&format!("useradd {name}"), &RunAs::Agent)?;
            info!(target: USERS_TARGET, user = name, "created service user");
            Ok(Provisioning::Created)
        }
        Err(source) => Err(ProvisionError::LookupUser {
            name: name.to_owned(),
            source,
        }),
    }
}

/// Ensures the OS group `name` exists, creating it when absent.
pub fn ensure_group<R: ProcessRunner>(
    runner: &R,
    name: &str,
) -> Result<Provisioning, ProvisionError> {
    match Group::from_name(name) {
        Ok(Some(_)) => Ok(Provisioning::Existing),
        Ok(None) => {
            runner.run(&format!("groupadd {name}"), &RunAs::Agent)?;
            info!(target: USERS_TARGET, group = name, "created service group");
            Ok(Provisioning::Created)
        }
        Err(source) => Err(ProvisionError::LookupGroup {
            name: name.to_owned(),
            source,
        }),
    }
}

/// Errors raised while provisioning the service principals.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The user database lookup failed outright.
    #[error("failed to look up user '{name}': {source}")]
    LookupUser {
        /// User name that could not be resolved.
        name: String,
        /// Underlying OS error.
        #[source]
        source: nix::Error,
    },
    /// The group database lookup failed outright.
    #[error("failed to look up group '{name}': {source}")]
    LookupGroup {
        /// Group name that could not be resolved.
        name: String,
        /// Underlying OS error.
        #[source]
        source: nix::Error,
    },
    /// The create command failed.
    #[error("failed to create principal: {0}")]
    Create(#[from] CommandError),
}
