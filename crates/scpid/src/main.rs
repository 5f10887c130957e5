//! Entry point for the SCPI front-end server.
//!
//! Configuration comes from `SCPID_*` environment variables, an optional
//! TOML file and command-line flags; see [`scpi_config::Config`].

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match scpid::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = io::stderr().lock();
            writeln!(stderr, "scpid: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
