//! Delegated installation of the service package.

use tracing::debug;

use crate::runner::{CommandError, ProcessRunner, RunAs};

const PACKAGES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::packages");

/// Installs the service package on behalf of the controller.
#[cfg_attr(test, mockall::automock)]
pub trait PackageInstaller {
    /// Installs the package; installing an already-installed package must
    /// succeed.
    fn install(&self) -> Result<(), CommandError>;
}

/// Installer that delegates to a platform-supplied shell command.
///
/// With no command configured the platform is assumed to have installed the
/// package out of band and this step is a no-op.
#[derive(Debug, Clone, Default)]
pub struct ShellPackageInstaller<R> {
    runner: R,
    command: Option<String>,
}

impl<R: ProcessRunner> ShellPackageInstaller<R> {
    /// Builds an installer around an optional install command.
    pub fn new(runner: R, command: Option<String>) -> Self {
        Self { runner, command }
    }
}

impl<R: ProcessRunner> PackageInstaller for ShellPackageInstaller<R> {
    fn install(&self) -> Result<(), CommandError> {
        match &self.command {
            Some(command) => self.runner.run(command, &RunAs::Agent),
            None => {
                debug!(
                    target: PACKAGES_TARGET,
                    "no install command configured; package installation left to the platform"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MockProcessRunner;

    #[test]
    fn configured_command_is_delegated() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|command, run_as| command == "yum install -y notebook" && run_as == &RunAs::Agent)
            .times(1)
            .returning(|_, _| Ok(()));
        let installer =
            ShellPackageInstaller::new(runner, Some("yum install -y notebook".to_owned()));
        installer.install().expect("install should succeed");
    }

    #[test]
    fn missing_command_is_a_no_op() {
        let runner = MockProcessRunner::new();
        let installer = ShellPackageInstaller::new(runner, None);
        installer.install().expect("no-op install should succeed");
    }
}
