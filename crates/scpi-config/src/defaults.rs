use camino::Utf8PathBuf;
use std::env;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Raw-socket port conventionally used by SCPI instruments.
pub const DEFAULT_SCPI_PORT: u16 = 5025;

/// Device address used when none is configured.
pub const DEFAULT_DEVICE_ADDRESS: &str = "127.0.0.1";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Settle delay after a factory reset.
pub const DEFAULT_RESET_SETTLE_MS: u64 = 2_000;

/// Settle delay after a batch restart or stop.
pub const DEFAULT_BATCH_SETTLE_MS: u64 = 3_000;

/// Longest accepted command line.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default device address.
#[must_use]
pub fn default_device_address() -> String {
    DEFAULT_DEVICE_ADDRESS.to_owned()
}

/// Default listener endpoint: loopback on the SCPI raw-socket port.
#[must_use]
pub fn default_listen_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_SCPI_PORT)
}

/// Default state directory, under the user's data directory when known.
#[must_use]
pub fn default_state_dir() -> Utf8PathBuf {
    let base = dirs::data_local_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .or_else(|| Utf8PathBuf::from_path_buf(env::temp_dir()).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("/tmp"));
    base.join("scpid")
}
