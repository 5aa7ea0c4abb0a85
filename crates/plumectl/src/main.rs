//! Harness entrypoint for the Plume lifecycle controller.
//!
//! The binary delegates to [`plumectl::run`], which parses arguments, loads
//! the invocation's parameter document, initialises telemetry, and sequences
//! exactly one lifecycle operation.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    plumectl::run(std::env::args_os(), &mut stdout, &mut stderr)
}
