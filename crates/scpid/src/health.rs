//! Structured health reporting for server lifecycle and session events.

use std::sync::Arc;

use scpi_config::Config;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for lifecycle events that operators care about.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once the listener is bound and serving.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when any bootstrap stage fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a session authenticates against the chassis.
    fn session_login(&self, session_id: u64, user: &str, transport: &str);

    /// Invoked after a session releases its device handle.
    fn session_logout(&self, session_id: u64, user: &str);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn session_login(&self, session_id: u64, user: &str, transport: &str) {
        (**self).session_login(session_id, user, transport);
    }

    fn session_logout(&self, session_id: u64, user: &str) {
        (**self).session_logout(session_id, user);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting SCPI server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            listen = %config.listen(),
            device = config.device_address(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "SCPI server ready"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "SCPI server bootstrap failed"
        );
    }

    fn session_login(&self, session_id: u64, user: &str, transport: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_login",
            session = session_id,
            user,
            transport,
            "session logged in"
        );
    }

    fn session_logout(&self, session_id: u64, user: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_logout",
            session = session_id,
            user,
            "session logged out"
        );
    }
}
