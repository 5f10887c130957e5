//! Test harness utilities shared by the behavioural suites.

use std::ffi::OsString;
use std::sync::{Arc, Mutex};

use ortho_config::{OrthoConfig, OrthoError};
use scpi_config::{Config, SocketEndpoint};
use tempfile::TempDir;

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;

/// Loader that resolves a TCP listener on an ephemeral port and a
/// throwaway state directory.
pub struct TestConfigLoader {
    state_dir: TempDir,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        Self {
            state_dir: TempDir::new().expect("temp state dir"),
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let state_dir = self
            .state_dir
            .path()
            .to_str()
            .expect("utf-8 temp path")
            .into();
        Ok(Config {
            listen: SocketEndpoint::tcp("127.0.0.1", 0),
            state_dir,
            reset_settle_ms: 0,
            batch_settle_ms: 0,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an invalid listener.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("scpid"),
            OsString::from("--listen"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn session_login(&self, session_id: u64, user: &str, _transport: &str) {
        self.record(HealthEvent::SessionLogin(session_id, user.to_owned()));
    }

    fn session_logout(&self, session_id: u64, user: &str) {
        self.record(HealthEvent::SessionLogout(session_id, user.to_owned()));
    }
}

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// A session logged in.
    SessionLogin(u64, String),
    /// A session logged out.
    SessionLogout(u64, String),
}

/// Strips surrounding double quotes from a step argument if present.
pub fn strip_quotes(text: &str) -> &str {
    text.trim_matches('"')
}
