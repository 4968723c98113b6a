//! Entry point for the `hostctld` daemon.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match hostctld::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(io::stderr().lock(), "hostctld: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
