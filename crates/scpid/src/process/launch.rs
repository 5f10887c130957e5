//! Runs the server until a shutdown signal arrives.

use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::device::{DeviceConnector, SimulatedChassis};
use crate::health::{HealthReporter, StructuredHealthReporter};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the server using the production collaborators.
///
/// No hardware library is linked into this build, so sessions talk to a
/// [`SimulatedChassis`].
///
/// # Errors
///
/// Fails when bootstrap fails, when signal handlers cannot be installed or
/// when the listener thread cannot be joined.
pub fn run_daemon() -> Result<(), LaunchError> {
    let reporter = Arc::new(StructuredHealthReporter::new());
    let connector = Arc::new(SimulatedChassis::new());
    run_daemon_with(
        &SystemConfigLoader,
        reporter,
        connector,
        &SystemShutdownSignal::new(),
    )
}

/// Runs the server with injected collaborators.
pub(crate) fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    connector: Arc<dyn DeviceConnector>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let server = bootstrap_with(loader, reporter, connector)?;
    shutdown.wait()?;
    info!(
        target: PROCESS_TARGET,
        listen = %server.config().listen(),
        "stopping listener"
    );
    server.shutdown()?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
