//! Server bootstrap orchestration.

use std::net::SocketAddr;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use scpi_config::{Config, SocketPreparationError, StatePaths, StatePathsError};
use scpi_lang::TreeBuildError;
use thiserror::Error;

use crate::device::DeviceConnector;
use crate::dispatch::{Dispatcher, SessionConnectionHandler};
use crate::health::HealthReporter;
use crate::session::SessionSettings;
use crate::subsystems::CommandTrees;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error when any source fails to parse.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The state directory could not be prepared.
    #[error("failed to prepare state directory: {source}")]
    StatePaths {
        /// Underlying filesystem error.
        #[source]
        source: StatePathsError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare listener socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// A command dictionary is inconsistent.
    #[error("failed to build command trees: {source}")]
    CommandTree {
        /// Underlying tree construction error.
        #[source]
        source: TreeBuildError,
    },
    /// The listener could not bind or start.
    #[error("failed to start listener: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

/// A running server: configuration plus the accept loop serving it.
pub struct Server {
    config: Config,
    telemetry: TelemetryHandle,
    local_addr: Option<SocketAddr>,
    listener: ListenerHandle,
}

impl Server {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Bound TCP address; `None` for Unix sockets.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stops accepting connections and waits for the accept loop to finish.
    ///
    /// # Errors
    ///
    /// Fails when the accept thread panicked.
    pub fn shutdown(self) -> Result<(), ListenerError> {
        self.listener.shutdown();
        self.listener.join()
    }
}

/// Bootstraps the server using the supplied collaborators.
///
/// # Errors
///
/// Returns the first stage that fails; the reporter is told about it before
/// the error is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    connector: Arc<dyn DeviceConnector>,
) -> Result<Server, BootstrapError> {
    reporter.bootstrap_starting();
    let fail = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| fail(BootstrapError::Configuration { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;
    let paths = StatePaths::from_config(&config)
        .map_err(|source| fail(BootstrapError::StatePaths { source }))?;
    config
        .listen()
        .prepare_filesystem()
        .map_err(|source| fail(BootstrapError::Socket { source }))?;
    let trees = CommandTrees::build().map_err(|source| fail(BootstrapError::CommandTree { source }))?;
    let listener = SocketListener::bind(config.listen())
        .map_err(|source| fail(BootstrapError::Listener { source }))?;
    let local_addr = listener.local_addr();

    let dispatcher = Dispatcher::new(Arc::new(trees), connector, Arc::clone(&reporter));
    let handler = Arc::new(SessionConnectionHandler::new(
        dispatcher,
        SessionSettings::from_config(&config, &paths),
        config.max_request_bytes(),
    ));
    let listener = listener
        .start(handler)
        .map_err(|source| fail(BootstrapError::Listener { source }))?;

    reporter.bootstrap_succeeded(&config);
    Ok(Server {
        config,
        telemetry,
        local_addr,
        listener,
    })
}
