//! Handler outcomes and their mapping onto SCPI error codes.
//!
//! Handlers return [`CommandError`]. Codes they choose themselves pass through
//! untouched; device failures go through [`map_device_error`], a pure
//! function from failure reason to code and optional detail text.

use scpi_lang::ErrorCode;
use thiserror::Error;

use crate::device::{DeviceError, NakReason, ServerReason};

/// Detail appended to the catch-all code for failures nobody classified.
pub(crate) const TRACE_DETAIL: &str = "See log for trace.";

/// Ways a command handler can fail.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The handler picked a specific code.
    #[error("command failed with {code}")]
    Code {
        code: ErrorCode,
        detail: Option<String>,
    },
    /// The device façade reported a failure.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// Something the handler did not anticipate.
    #[error("unexpected failure: {message}")]
    Unexpected { message: String },
}

impl CommandError {
    /// Fails with `code`.
    #[must_use]
    pub fn code(code: ErrorCode) -> Self {
        Self::Code { code, detail: None }
    }

    /// Fails with `code` and a detail appended to its description.
    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Code {
            code,
            detail: Some(detail.into()),
        }
    }

    /// Fails with the catch-all code.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }
}

/// The session must end; raised when the transport asks the server to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session exit requested")]
pub struct SessionExit;

/// A device failure translated for the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedError {
    pub code: ErrorCode,
    pub detail: Option<&'static str>,
}

impl MappedError {
    const fn bare(code: ErrorCode) -> Self {
        Self { code, detail: None }
    }

    const fn internal(tag: &'static str) -> Self {
        Self {
            code: ErrorCode::INTERNAL_UNHANDLED_ERROR,
            detail: Some(tag),
        }
    }
}

/// Maps a device failure onto the code reported to the client.
///
/// Returns `None` for [`DeviceError::ServerExit`], which ends the session
/// instead of producing a response.
#[must_use]
pub fn map_device_error(error: &DeviceError) -> Option<MappedError> {
    let mapped = match error {
        DeviceError::Nak(reason) => map_nak(*reason),
        DeviceError::Server(reason) => MappedError::bare(map_server(reason)),
        DeviceError::Link { .. } => MappedError::internal(TRACE_DETAIL),
        DeviceError::ServerExit => return None,
    };
    Some(mapped)
}

const fn map_nak(reason: NakReason) -> MappedError {
    match reason {
        NakReason::ResId => MappedError::internal("RES ID"),
        NakReason::MsgType => MappedError::internal("MSG TYPE"),
        NakReason::MsgLength => MappedError::internal("MSG LENGTH"),
        NakReason::Timeout => MappedError::internal("TIMEOUT"),
        NakReason::Busy => MappedError::internal("BUSY"),
        NakReason::NotSupported => MappedError::internal("NOT SUPPORTED"),
        NakReason::InvalidSetting => MappedError::bare(ErrorCode::INVALID_SETTING),
        NakReason::InvalidTestId => MappedError::bare(ErrorCode::TESTMGR_INVALID_TEST_ID),
        NakReason::OutOfService => MappedError::bare(ErrorCode::COMMON_OUT_OF_SERVICE),
        NakReason::InvalidLicense => MappedError::bare(ErrorCode::SYSCFG_INVALID_LICENSE),
        NakReason::ExpiredLicense => MappedError::bare(ErrorCode::COMMON_LICENSE_EXPIRED),
        NakReason::Unknown => MappedError::bare(ErrorCode::INVALID_RESULTS),
    }
}

const fn map_server(reason: &ServerReason) -> ErrorCode {
    match reason {
        ServerReason::AlreadyLoggedIn => ErrorCode::ADMIN_ALREADY_LOGGED_IN,
        ServerReason::NotLoggedIn => ErrorCode::ADMIN_NOT_LOGGED_IN,
        ServerReason::Unauthorized => ErrorCode::ADMIN_UNAUTHORIZED,
        ServerReason::UserNotFound => ErrorCode::ADMIN_USER_NOT_FOUND,
        ServerReason::InvalidPassword => ErrorCode::ADMIN_INVALID_PASSWORD,
        ServerReason::InvalidLoginName => ErrorCode::ADMIN_INVALID_LOGIN_NAME,
        ServerReason::SessionLimit => ErrorCode::ADMIN_SESSION_LIMIT,
        ServerReason::InvalidAddress => ErrorCode::COMMON_INVALID_ADDRESS,
        ServerReason::Other(_) => ErrorCode::INTERNAL_UNHANDLED_ERROR,
    }
}
