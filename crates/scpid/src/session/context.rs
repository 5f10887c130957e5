//! State carried by one SCPI session.

use std::time::Duration;

use scpi_config::{Config, StatePaths};
use scpi_lang::{ErrorCode, ErrorQueue, ResponseStyle, encode_error_with_detail};

use crate::device::{
    Device, DeviceDefaults, LayerHandle, LayerKind, ProtocolEntry, ProtocolType, TestUnitId,
    TestUnitLock,
};
use crate::dispatch::CommandError;

use super::autologin::{AutoLoginError, AutoLoginSettings, AutoLoginStore};

/// Post-action sleeps that let the chassis settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    /// After `*RST`.
    pub reset: Duration,
    /// After `INIT ALL` and `ABOR ALL`.
    pub batch: Duration,
}

impl SettleDelays {
    /// No settling at all; used by tests.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            reset: Duration::ZERO,
            batch: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            reset: config.reset_settle(),
            batch: config.batch_settle(),
        }
    }
}

/// Everything a new session needs that does not come from the client.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub transport: &'static str,
    pub device_address: String,
    pub autologin: AutoLoginStore,
    pub settle: SettleDelays,
}

impl SessionSettings {
    /// Settings derived from the server configuration.
    #[must_use]
    pub fn from_config(config: &Config, paths: &StatePaths) -> Self {
        Self {
            transport: config.listen().transport_kind(),
            device_address: config.device_address().to_owned(),
            autologin: AutoLoginStore::at(paths.autologin_path()),
            settle: SettleDelays::from_config(config),
        }
    }
}

/// Response-formatting and locking toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseFlags {
    /// Answer `+0` when a command succeeds silently.
    pub respond_always: bool,
    /// Pre-empt foreign locks when selecting an instrument.
    pub force_lock: bool,
    /// Render errors as a bare signed integer.
    pub legacy_response: bool,
}

/// The instrument subsequent subsystem commands apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Instrument-name symbol the client selected with.
    pub name: &'static str,
    /// Protocol processor backing the selection.
    pub entry: ProtocolEntry,
}

impl Selection {
    #[must_use]
    pub fn protocol_type(&self) -> ProtocolType {
        self.entry.protocol
    }

    #[must_use]
    pub fn test_unit(&self) -> TestUnitId {
        self.entry.test_unit
    }

    /// First handle of the given layer kind.
    #[must_use]
    pub fn layer(&self, kind: LayerKind) -> Option<LayerHandle> {
        self.entry
            .layers
            .iter()
            .copied()
            .find(|layer| layer.kind == kind)
    }
}

/// Per-connection state: identity, device handle, selection, flags, errors.
pub struct SessionContext {
    session_id: u64,
    transport: &'static str,
    device_address: String,
    user: String,
    device: Option<Box<dyn Device>>,
    selection: Option<Selection>,
    lock: Option<TestUnitLock>,
    flags: ResponseFlags,
    autologin: AutoLoginSettings,
    autologin_store: AutoLoginStore,
    errors: ErrorQueue,
    settle: SettleDelays,
}

impl SessionContext {
    /// Creates an anonymous session and reads the persisted auto-login settings.
    #[must_use]
    pub fn new(session_id: u64, settings: SessionSettings) -> Self {
        let autologin = settings.autologin.load();
        Self {
            session_id,
            transport: settings.transport,
            device_address: settings.device_address,
            user: String::new(),
            device: None,
            selection: None,
            lock: None,
            flags: ResponseFlags::default(),
            autologin,
            autologin_store: settings.autologin,
            errors: ErrorQueue::new(),
            settle: settings.settle,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    #[must_use]
    pub fn transport(&self) -> &'static str {
        self.transport
    }

    #[must_use]
    pub fn device_address(&self) -> &str {
        self.device_address.as_str()
    }

    /// Authenticated user; empty while anonymous.
    #[must_use]
    pub fn user(&self) -> &str {
        self.user.as_str()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.device.is_some()
    }

    /// The session's device handle.
    ///
    /// # Errors
    ///
    /// Fails with `+202` when nobody is logged in.
    pub fn device(&self) -> Result<&dyn Device, CommandError> {
        self.device
            .as_deref()
            .ok_or_else(|| CommandError::code(ErrorCode::ADMIN_NOT_LOGGED_IN))
    }

    /// Mutable access to the device handle.
    ///
    /// # Errors
    ///
    /// Fails with `+202` when nobody is logged in.
    pub fn device_mut(&mut self) -> Result<&mut (dyn Device + 'static), CommandError> {
        self.device
            .as_deref_mut()
            .ok_or_else(|| CommandError::code(ErrorCode::ADMIN_NOT_LOGGED_IN))
    }

    /// Binds a freshly opened device handle and applies its stored defaults.
    pub fn attach(&mut self, device: Box<dyn Device>, defaults: DeviceDefaults) {
        device.user().clone_into(&mut self.user);
        self.device = Some(device);
        self.flags.respond_always = defaults.respond_always;
        self.flags.force_lock = defaults.force_lock;
        self.autologin = self.autologin_store.load();
    }

    /// Releases the selection and lock, then closes the device handle.
    pub fn detach(&mut self) {
        self.lock = None;
        self.selection = None;
        if let Some(mut device) = self.device.take() {
            device.close();
        }
        self.user.clear();
    }

    #[must_use]
    pub fn flags(&self) -> ResponseFlags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut ResponseFlags {
        &mut self.flags
    }

    #[must_use]
    pub fn style(&self) -> ResponseStyle {
        ResponseStyle::from_legacy_flag(self.flags.legacy_response)
    }

    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Protocol family of the current selection.
    #[must_use]
    pub fn protocol_type(&self) -> ProtocolType {
        self.selection
            .as_ref()
            .map_or(ProtocolType::None, Selection::protocol_type)
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    #[must_use]
    pub fn held_lock(&self) -> Option<&TestUnitLock> {
        self.lock.as_ref()
    }

    /// Replaces the held lock; the previous one is released.
    pub fn set_lock(&mut self, lock: Option<TestUnitLock>) {
        self.lock = lock;
    }

    /// True when the session holds the lock of the selected test unit.
    #[must_use]
    pub fn holds_selected_lock(&self) -> bool {
        match (&self.selection, &self.lock) {
            (Some(selection), Some(lock)) => selection.test_unit() == lock.unit(),
            _ => false,
        }
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorQueue {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorQueue {
        &mut self.errors
    }

    /// Encodes an error for the wire and records it in the error queue.
    pub fn raise(&mut self, code: ErrorCode, detail: Option<&str>) -> Vec<u8> {
        self.errors.add(code);
        encode_error_with_detail(code, detail, self.style())
    }

    #[must_use]
    pub fn autologin(&self) -> &AutoLoginSettings {
        &self.autologin
    }

    /// Replaces and persists the auto-login settings.
    ///
    /// # Errors
    ///
    /// Fails when the settings cannot be written.
    pub fn store_autologin(&mut self, settings: AutoLoginSettings) -> Result<(), AutoLoginError> {
        self.autologin_store.save(&settings)?;
        self.autologin = settings;
        Ok(())
    }

    #[must_use]
    pub fn settle(&self) -> SettleDelays {
        self.settle
    }
}
