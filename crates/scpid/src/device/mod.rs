//! Interface to the instrument-control library.
//!
//! The server never talks to chassis hardware directly. A [`DeviceConnector`]
//! opens one [`Device`] per logged-in session, and every handler reaches the
//! chassis through that trait object. Failures come back as [`DeviceError`],
//! a closed set of reasons that the dispatcher maps onto SCPI codes.
//!
//! Test-unit locks are owned handles: [`Device::lock_test_unit`] returns a
//! [`TestUnitLock`] that gives the lock back to its [`LockRegistry`] when it
//! is dropped, so a session releases everything it holds simply by dropping
//! its handles.

mod simulated;
mod types;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::{Date, PrimitiveDateTime, Time};

pub use self::simulated::SimulatedChassis;
pub use self::types::{
    CardInfo, CardType, ClockKind, DeviceDefaults, Identity, LayerHandle, LayerKind,
    ProtocolEntry, ProtocolMode, ProtocolType, TestDuration, TestUnitId,
};

/// Reasons a protocol processor rejects a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NakReason {
    ResId,
    MsgType,
    MsgLength,
    Timeout,
    Busy,
    NotSupported,
    InvalidSetting,
    InvalidTestId,
    OutOfService,
    InvalidLicense,
    ExpiredLicense,
    Unknown,
}

impl fmt::Display for NakReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ResId => "resource id",
            Self::MsgType => "message type",
            Self::MsgLength => "message length",
            Self::Timeout => "timeout",
            Self::Busy => "busy",
            Self::NotSupported => "not supported",
            Self::InvalidSetting => "invalid setting",
            Self::InvalidTestId => "invalid test id",
            Self::OutOfService => "out of service",
            Self::InvalidLicense => "invalid license",
            Self::ExpiredLicense => "expired license",
            Self::Unknown => "unknown",
        };
        formatter.write_str(label)
    }
}

/// Reasons the chassis server refuses an account or session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReason {
    AlreadyLoggedIn,
    NotLoggedIn,
    Unauthorized,
    UserNotFound,
    InvalidPassword,
    InvalidLoginName,
    SessionLimit,
    InvalidAddress,
    /// Any reason the server reports that has no dedicated variant.
    Other(String),
}

impl fmt::Display for ServerReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyLoggedIn => formatter.write_str("already logged in"),
            Self::NotLoggedIn => formatter.write_str("not logged in"),
            Self::Unauthorized => formatter.write_str("unauthorized"),
            Self::UserNotFound => formatter.write_str("user not found"),
            Self::InvalidPassword => formatter.write_str("invalid password"),
            Self::InvalidLoginName => formatter.write_str("invalid login name"),
            Self::SessionLimit => formatter.write_str("session limit reached"),
            Self::InvalidAddress => formatter.write_str("invalid address"),
            Self::Other(reason) => write!(formatter, "{reason}"),
        }
    }
}

/// Errors reported by the device façade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// A protocol processor refused the request.
    #[error("device rejected the request: {0}")]
    Nak(NakReason),
    /// The chassis server raised an account or session exception.
    #[error("server exception: {0}")]
    Server(ServerReason),
    /// The transport asked the session to terminate.
    #[error("server exit requested")]
    ServerExit,
    /// The link to the chassis failed in a way the library did not classify.
    #[error("device link failure: {message}")]
    Link { message: String },
}

impl DeviceError {
    /// Creates a link failure.
    pub fn link(message: impl Into<String>) -> Self {
        Self::Link {
            message: message.into(),
        }
    }
}

/// Releases test-unit locks on behalf of dropped [`TestUnitLock`] handles.
pub trait LockRegistry: Send + Sync {
    /// Gives the lock on `unit` back if `owner` still holds it.
    fn release(&self, unit: TestUnitId, owner: &str);
}

/// Exclusive-write capability on a test unit, released on drop.
pub struct TestUnitLock {
    unit: TestUnitId,
    owner: String,
    registry: Arc<dyn LockRegistry>,
}

impl TestUnitLock {
    /// Wraps a lock that `registry` has already granted to `owner`.
    pub fn new(unit: TestUnitId, owner: impl Into<String>, registry: Arc<dyn LockRegistry>) -> Self {
        Self {
            unit,
            owner: owner.into(),
            registry,
        }
    }

    /// Test unit this lock covers.
    #[must_use]
    pub fn unit(&self) -> TestUnitId {
        self.unit
    }

    /// User identity that owns the lock.
    #[must_use]
    pub fn owner(&self) -> &str {
        self.owner.as_str()
    }
}

impl fmt::Debug for TestUnitLock {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TestUnitLock")
            .field("unit", &self.unit)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl Drop for TestUnitLock {
    fn drop(&mut self) {
        self.registry.release(self.unit, &self.owner);
    }
}

/// Opens device sessions.
pub trait DeviceConnector: Send + Sync {
    /// Authenticates against the chassis at `address`.
    fn connect(
        &self,
        address: &str,
        user: &str,
        password: &str,
    ) -> Result<Box<dyn Device>, DeviceError>;
}

/// One authenticated session with the chassis.
///
/// Methods mirror the operations the command handlers need. Everything that
/// can fail on the device side returns [`DeviceError`].
pub trait Device: Send {
    /// User this session authenticated as.
    fn user(&self) -> &str;

    /// Records command and response traffic on the device's monitor feed.
    fn monitor(&self, text: &[u8]);

    /// Ends the session.
    fn close(&mut self);

    fn identity(&self) -> Result<Identity, DeviceError>;

    /// Session defaults stored for this user.
    fn defaults(&self) -> Result<DeviceDefaults, DeviceError>;

    /// Persists session defaults for this user.
    fn store_defaults(&mut self, defaults: DeviceDefaults) -> Result<(), DeviceError>;

    /// Every protocol processor in the chassis, in inventory order.
    fn protocols(&self) -> Result<Vec<ProtocolEntry>, DeviceError>;

    /// Every populated slot.
    fn cards(&self) -> Result<Vec<CardInfo>, DeviceError>;

    /// Tries to lock `unit` for this session's user.
    ///
    /// Returns `Ok(None)` when another user holds the lock and `force` is
    /// false.
    fn lock_test_unit(
        &mut self,
        unit: TestUnitId,
        force: bool,
    ) -> Result<Option<TestUnitLock>, DeviceError>;

    /// User currently holding the lock on `unit`, if any.
    fn lock_owner(&self, unit: TestUnitId) -> Result<Option<String>, DeviceError>;

    fn reset_test_unit(&mut self, unit: TestUnitId) -> Result<(), DeviceError>;

    fn restart_test_unit(&mut self, unit: TestUnitId) -> Result<(), DeviceError>;

    fn stop_test_unit(&mut self, unit: TestUnitId) -> Result<(), DeviceError>;

    fn duration(&self, unit: TestUnitId) -> Result<TestDuration, DeviceError>;

    fn set_duration(&mut self, unit: TestUnitId, duration: TestDuration)
    -> Result<(), DeviceError>;

    /// Time since the test on `unit` was last started.
    fn elapsed(&self, unit: TestUnitId) -> Result<Duration, DeviceError>;

    /// Time left on `unit`; `None` for continuous tests.
    fn remaining(&self, unit: TestUnitId) -> Result<Option<Duration>, DeviceError>;

    fn protocol_mode(&self) -> Result<ProtocolMode, DeviceError>;

    fn set_protocol_mode(&mut self, mode: ProtocolMode) -> Result<(), DeviceError>;

    fn clock(&self) -> Result<ClockKind, DeviceError>;

    /// Clock sources the chassis controller can use.
    fn supported_clocks(&self) -> Result<Vec<ClockKind>, DeviceError>;

    fn set_clock(&mut self, clock: ClockKind) -> Result<(), DeviceError>;

    fn clock_status(&self) -> Result<String, DeviceError>;

    fn date_time(&self) -> Result<PrimitiveDateTime, DeviceError>;

    fn set_date(&mut self, date: Date) -> Result<(), DeviceError>;

    fn set_time(&mut self, time: Time) -> Result<(), DeviceError>;

    /// Time since the chassis booted.
    fn runtime(&self) -> Result<Duration, DeviceError>;

    fn version(&self) -> Result<String, DeviceError>;

    fn os_version(&self) -> Result<String, DeviceError>;

    fn license(&self) -> Result<String, DeviceError>;

    fn install_license(&mut self, key: &str) -> Result<(), DeviceError>;

    /// Remaining time on a timed licence; `None` when the licence is perpetual.
    fn license_time_remaining(&self) -> Result<Option<Duration>, DeviceError>;

    /// Multi-chassis controller address.
    fn mch_address(&self) -> Result<String, DeviceError>;

    fn set_mch_address(&mut self, address: &str) -> Result<(), DeviceError>;

    fn mch_status(&self) -> Result<String, DeviceError>;

    fn save_report(&mut self, slot: u32, port: u32, file_name: &str) -> Result<(), DeviceError>;

    fn reboot(&mut self) -> Result<(), DeviceError>;

    fn shutdown(&mut self) -> Result<(), DeviceError>;

    /// Reads a leaf setting from a protocol layer.
    fn read_setting(&self, layer: LayerHandle, key: &str) -> Result<String, DeviceError>;

    /// Writes a leaf setting to a protocol layer.
    fn write_setting(
        &mut self,
        layer: LayerHandle,
        key: &str,
        value: &str,
    ) -> Result<(), DeviceError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingRegistry {
        released: Mutex<Vec<(TestUnitId, String)>>,
    }

    impl LockRegistry for RecordingRegistry {
        fn release(&self, unit: TestUnitId, owner: &str) {
            self.released
                .lock()
                .expect("registry mutex")
                .push((unit, owner.to_owned()));
        }
    }

    #[test]
    fn dropping_a_lock_releases_it() {
        let registry = Arc::new(RecordingRegistry::default());
        let lock = TestUnitLock::new(7, "admin", registry.clone());
        assert_eq!(lock.unit(), 7);
        drop(lock);
        let released = registry.released.lock().expect("registry mutex").clone();
        assert_eq!(released, vec![(7, "admin".to_owned())]);
    }
}
