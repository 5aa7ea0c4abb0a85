//! CLI argument definitions for the lifecycle harness.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for the Plume lifecycle harness.
///
/// Exactly one lifecycle operation runs per invocation; the hosting platform
/// re-invokes the binary for each step and hands over a freshly resolved
/// parameter document every time.
#[derive(Parser, Debug)]
#[command(name = "plumectl", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Path to the resolved TOML parameter document for this invocation.
    #[arg(long, value_name = "PATH")]
    pub(crate) config: Utf8PathBuf,
    /// The lifecycle operation to perform.
    #[command(subcommand)]
    pub(crate) operation: Operation,
}

/// Lifecycle operations the harness can sequence.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    /// Installs the service package and runs one-time setup.
    Install,
    /// Renders the configuration artefacts without touching the daemon.
    Configure,
    /// Starts the daemon and reconciles interpreter settings.
    Start,
    /// Stops the daemon via its stop script.
    Stop,
    /// Reports whether the daemon is running.
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::install("install", Operation::Install)]
    #[case::configure("configure", Operation::Configure)]
    #[case::start("start", Operation::Start)]
    #[case::stop("stop", Operation::Stop)]
    #[case::status("status", Operation::Status)]
    fn operations_parse(#[case] name: &str, #[case] expected: Operation) {
        let cli = Cli::try_parse_from(["plumectl", "--config", "/etc/plume/params.toml", name])
            .expect("arguments should parse");
        assert_eq!(cli.operation, expected);
        assert_eq!(cli.config, "/etc/plume/params.toml");
    }

    #[test]
    fn config_path_is_required() {
        let error = Cli::try_parse_from(["plumectl", "status"])
            .expect_err("missing --config should be rejected");
        assert_eq!(error.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn operation_is_required() {
        Cli::try_parse_from(["plumectl", "--config", "/tmp/p.toml"])
            .expect_err("missing operation should be rejected");
    }
}
