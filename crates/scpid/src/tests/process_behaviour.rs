//! Tests for the process lifecycle with injected collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::device::SimulatedChassis;
use crate::process::{LaunchError, ShutdownError, ShutdownSignal, run_daemon_with};

use super::support::{FailingConfigLoader, HealthEvent, RecordingHealthReporter, TestConfigLoader};

/// Shutdown signal that fires immediately and counts how often it was awaited.
#[derive(Default)]
struct ImmediateShutdown {
    waits: AtomicUsize,
}

impl ShutdownSignal for ImmediateShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn runs_until_shutdown_is_signalled() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let shutdown = ImmediateShutdown::default();
    run_daemon_with(
        &TestConfigLoader::new(),
        reporter.clone(),
        Arc::new(SimulatedChassis::new()),
        &shutdown,
    )
    .expect("server should start and stop");

    assert_eq!(shutdown.waits.load(Ordering::SeqCst), 1);
    assert!(reporter.events().contains(&HealthEvent::BootstrapSucceeded));
}

#[test]
fn bootstrap_failures_skip_the_shutdown_wait() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let shutdown = ImmediateShutdown::default();
    let error = run_daemon_with(
        &FailingConfigLoader,
        reporter,
        Arc::new(SimulatedChassis::new()),
        &shutdown,
    )
    .expect_err("bootstrap should fail");

    assert!(matches!(error, LaunchError::Bootstrap { .. }));
    assert_eq!(shutdown.waits.load(Ordering::SeqCst), 0);
}
