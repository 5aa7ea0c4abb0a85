//! Harness runtime for the Plume lifecycle controller.
//!
//! The module owns argument parsing, parameter-document loading, telemetry
//! bootstrapping, and collaborator wiring. Each invocation sequences exactly
//! one lifecycle operation through [`plume_lifecycle::LifecycleController`]
//! and reports the outcome through the process exit code, so the hosting
//! platform can treat the binary as a conventional service-control command.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::error;

use plume_config::{Config, ConfigError, StatusParameters};
use plume_lifecycle::{
    Collaborators, InterpreterReconciler, LifecycleController, LifecycleError, RunStatus,
    ShellDistributedFs, ShellPackageInstaller, SystemProcessProbe, SystemProcessRunner,
    SystemResourceApplier,
};

mod cli;
pub mod telemetry;

use cli::{Cli, Operation};

const HARNESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::harness");

/// Exit code reported when the daemon is not running.
///
/// Follows the LSB `status` convention: 0 running, 3 stopped, 1 for a stale
/// PID file or any operational failure.
const EXIT_NOT_RUNNING: u8 = 3;

/// Runs the harness using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(usage) => {
            let _ = write!(stderr, "{usage}");
            return ExitCode::FAILURE;
        }
    };

    match execute(&cli, stdout) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            // Telemetry may not be installed yet, so mirror the failure on
            // stderr as well.
            error!(target: HARNESS_TARGET, %error, "lifecycle operation failed");
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(cli: &Cli, stdout: &mut W) -> Result<ExitCode, AppError> {
    let config = Config::load_from_path(&cli.config)?;
    telemetry::initialise(&config.logging)?;

    let runner = SystemProcessRunner::new();
    let mut controller = LifecycleController::new(
        Collaborators {
            applier: SystemResourceApplier::new(),
            runner,
            installer: ShellPackageInstaller::new(
                runner,
                config.service.package_install_command.clone(),
            ),
            dfs: ShellDistributedFs::new(runner),
            checker: SystemProcessProbe::new(),
            reconciler: InterpreterReconciler::new(),
        },
        config.readiness,
    );

    match cli.operation {
        Operation::Install => controller.install(&config.service)?,
        Operation::Configure => controller.configure(&config.service)?,
        Operation::Start => controller.start(&config.service, &config.topology)?,
        Operation::Stop => controller.stop(&config.service)?,
        Operation::Status => {
            let status = controller.status(&StatusParameters::from_service(&config.service))?;
            return Ok(report_status(status, stdout));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn report_status<W: Write>(status: RunStatus, stdout: &mut W) -> ExitCode {
    match status {
        RunStatus::Running { pid } => {
            let _ = writeln!(stdout, "running (pid {pid})");
            ExitCode::SUCCESS
        }
        RunStatus::NotRunning => {
            let _ = writeln!(stdout, "not running");
            ExitCode::from(EXIT_NOT_RUNNING)
        }
        RunStatus::Stale { pid } => {
            let _ = writeln!(stdout, "dead (stale pid file, pid {pid})");
            ExitCode::FAILURE
        }
    }
}

/// Errors surfaced to the operator by the harness.
#[derive(Debug, Error)]
enum AppError {
    /// The parameter document could not be loaded.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(#[from] ConfigError),
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] telemetry::TelemetryError),
    /// The lifecycle operation itself failed.
    #[error("{0}")]
    Lifecycle(#[from] LifecycleError),
}
