//! Shared configuration for the SCPI front-end server.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! TOML file (`--config-path` or `SCPID_CONFIG_PATH`), then `SCPID_*`
//! environment variables, then command-line flags. `Config::load` and
//! `Config::load_from_iter` come from the [`OrthoConfig`] derive.

mod defaults;
mod logging;
mod paths;
mod socket;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BATCH_SETTLE_MS, DEFAULT_DEVICE_ADDRESS, DEFAULT_LOG_FILTER, DEFAULT_MAX_REQUEST_BYTES,
    DEFAULT_RESET_SETTLE_MS, DEFAULT_SCPI_PORT, default_device_address, default_listen_endpoint,
    default_log_filter, default_log_filter_string, default_log_format, default_state_dir,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{AUTOLOGIN_FILE_NAME, StatePaths, StatePathsError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SCPID")]
pub struct Config {
    /// Endpoint the SCPI listener binds to.
    #[ortho_config(default = default_listen_endpoint())]
    pub listen: SocketEndpoint,
    /// Address handed to the device library when a session logs in.
    #[ortho_config(default = default_device_address())]
    pub device_address: String,
    /// Directory holding persisted per-server state such as auto-login.
    #[ortho_config(default = default_state_dir())]
    pub state_dir: Utf8PathBuf,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Settle delay after a factory reset, in milliseconds.
    #[ortho_config(default = DEFAULT_RESET_SETTLE_MS)]
    pub reset_settle_ms: u64,
    /// Settle delay after a batch restart or stop, in milliseconds.
    #[ortho_config(default = DEFAULT_BATCH_SETTLE_MS)]
    pub batch_settle_ms: u64,
    /// Longest accepted command line in bytes.
    #[ortho_config(default = DEFAULT_MAX_REQUEST_BYTES)]
    pub max_request_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            device_address: default_device_address(),
            state_dir: default_state_dir(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            reset_settle_ms: DEFAULT_RESET_SETTLE_MS,
            batch_settle_ms: DEFAULT_BATCH_SETTLE_MS,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

impl Config {
    /// Endpoint the listener binds to.
    #[must_use]
    pub fn listen(&self) -> &SocketEndpoint {
        &self.listen
    }

    /// Device address used at login.
    #[must_use]
    pub fn device_address(&self) -> &str {
        self.device_address.as_str()
    }

    /// State directory for persisted settings.
    #[must_use]
    pub fn state_dir(&self) -> &Utf8Path {
        self.state_dir.as_path()
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Settle delay after `*RST`.
    #[must_use]
    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }

    /// Settle delay after `INIT ALL` or `ABOR ALL`.
    #[must_use]
    pub fn batch_settle(&self) -> Duration {
        Duration::from_millis(self.batch_settle_ms)
    }

    /// Longest accepted command line.
    #[must_use]
    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }
}
