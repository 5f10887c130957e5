//! Test suites for the SCPI server.

mod process_behaviour;
mod session_behaviour;
mod support;
