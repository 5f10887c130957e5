//! Structured logging for the SCPI server.
//!
//! Each session is served on a thread named `scpi-conn-N`, and thread names
//! are part of every event, so the request and response traffic logged on the
//! `scpid::dispatch` target can be followed per client. A filter such as
//! `info,scpid::dispatch=debug` turns that traffic on without the rest of the
//! debug noise.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use scpi_config::{Config, LogFormat};
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static INSTALLED: OnceCell<TelemetryHandle> = OnceCell::new();

/// Describes the subscriber the process logs through.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Output format chosen when the subscriber was installed.
    #[must_use]
    pub fn format(&self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Expression taken from `log_filter`.
        filter: String,
        /// Parser complaint.
        message: String,
    },
    /// Another subscriber is already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber on first use.
///
/// Later calls hand back the handle of the subscriber already in place, even
/// when their configuration asks for another format.
///
/// # Errors
///
/// Fails when the filter is malformed or a foreign subscriber is already
/// installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install_subscriber(config))
        .copied()
}

fn session_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter {
        filter: expression.to_owned(),
        message: error.to_string(),
    })
}

fn install_subscriber(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let filter = session_filter(config.log_filter())?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let format = config.log_format();
    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    Ok(TelemetryHandle { format })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("info")]
    #[case("info,scpid::dispatch=debug")]
    #[case("scpid::transport=trace")]
    fn accepts_per_target_filters(#[case] expression: &str) {
        assert!(session_filter(expression).is_ok());
    }

    #[test]
    fn malformed_filters_name_the_expression() {
        let error = session_filter("scpid::dispatch=loud").expect_err("filter should fail");
        assert!(
            error.to_string().contains("'scpid::dispatch=loud'"),
            "unexpected message: {error}"
        );
    }

    #[test]
    fn repeated_initialisation_keeps_the_first_subscriber() {
        let first = initialise(&Config::default()).expect("first install");
        let compact = Config {
            log_format: LogFormat::Compact,
            ..Config::default()
        };
        let second = initialise(&compact).expect("second install");
        assert_eq!(first, second);
    }
}
