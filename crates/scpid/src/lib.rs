//! SCPI front-end server for a network-test chassis.
//!
//! Clients connect over TCP or a Unix socket and send newline-framed SCPI
//! command lines. Each connection is one session: it logs in against the
//! chassis, selects an instrument, takes the instrument's test-unit lock and
//! issues commands that the server routes through abbreviation-aware
//! [`CommandTrees`] to their handlers.
//!
//! The crate is organised the way the request flows:
//!
//! - [`bootstrap_with`] loads configuration, installs telemetry, prepares the
//!   state directory, compiles the command trees and starts the listener.
//! - The transport accepts connections and frames requests.
//! - The [`Dispatcher`] runs the per-request state machine over a
//!   [`SessionContext`].
//! - Handlers reach the chassis through the [`Device`] trait; failures come
//!   back as [`DeviceError`] and are mapped onto SCPI codes by
//!   [`map_device_error`].
//!
//! Health reporting hooks emit structured events for bootstrap and session
//! lifecycle so operators can follow who is logged in and why a start failed.

mod bootstrap;
pub mod device;
mod dispatch;
mod health;
mod process;
pub mod session;
mod subsystems;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Server, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use device::{Device, DeviceConnector, DeviceError, SimulatedChassis};
pub use dispatch::{CommandError, Dispatcher, MappedError, SessionExit, map_device_error};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use session::SessionContext;
pub use subsystems::{CommandTrees, Handler};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
