//! In-memory chassis used when no hardware library is linked.
//!
//! Sessions opened from one [`SimulatedChassis`] share its inventory, lock
//! table and settings, so several connections can contend for test units the
//! way they would on real hardware.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use tracing::debug;

use super::{
    CardInfo, CardType, ClockKind, Device, DeviceConnector, DeviceDefaults, DeviceError, Identity,
    LayerHandle, LayerKind, LockRegistry, NakReason, ProtocolEntry, ProtocolMode, ProtocolType,
    ServerReason, TestDuration, TestUnitId, TestUnitLock,
};

const DEVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::device");
const DEFAULT_SESSION_LIMIT: usize = 16;

/// Shared simulated chassis; also the connector that opens sessions on it.
#[derive(Clone)]
pub struct SimulatedChassis {
    shared: Arc<SharedChassis>,
}

struct SharedChassis {
    state: Mutex<ChassisState>,
}

struct ChassisState {
    users: HashMap<String, String>,
    session_limit: usize,
    active_sessions: usize,
    protocols: Vec<ProtocolEntry>,
    cards: Vec<CardInfo>,
    locks: HashMap<TestUnitId, String>,
    defaults: HashMap<String, DeviceDefaults>,
    settings: HashMap<(u32, String), String>,
    durations: HashMap<TestUnitId, TestDuration>,
    started: HashMap<TestUnitId, Instant>,
    mode: ProtocolMode,
    clock: ClockKind,
    supported_clocks: Vec<ClockKind>,
    date_time: PrimitiveDateTime,
    booted: Instant,
    license: Option<String>,
    mch_address: String,
    reports: Vec<String>,
}

impl SimulatedChassis {
    /// Builds a chassis with the stock inventory and an `admin`/`secret` account.
    #[must_use]
    pub fn new() -> Self {
        let now = OffsetDateTime::now_utc();
        let mut state = ChassisState {
            users: HashMap::from([("admin".to_owned(), "secret".to_owned())]),
            session_limit: DEFAULT_SESSION_LIMIT,
            active_sessions: 0,
            protocols: stock_protocols(),
            cards: stock_cards(),
            locks: HashMap::new(),
            defaults: HashMap::new(),
            settings: HashMap::new(),
            durations: HashMap::new(),
            started: HashMap::new(),
            mode: ProtocolMode::default(),
            clock: ClockKind::Internal,
            supported_clocks: vec![
                ClockKind::Internal,
                ClockKind::Bits,
                ClockKind::Sets,
                ClockKind::Gps,
                ClockKind::Sma10M,
                ClockKind::Sma1Pps,
            ],
            date_time: PrimitiveDateTime::new(now.date(), now.time()),
            booted: Instant::now(),
            license: None,
            mch_address: "0.0.0.0".to_owned(),
            reports: Vec::new(),
        };
        state.seed_settings();
        Self {
            shared: Arc::new(SharedChassis {
                state: Mutex::new(state),
            }),
        }
    }

    /// Adds an account.
    #[must_use]
    pub fn with_user(self, user: &str, password: &str) -> Self {
        self.shared
            .state()
            .users
            .insert(user.to_owned(), password.to_owned());
        self
    }

    /// Caps the number of concurrent sessions.
    #[must_use]
    pub fn with_session_limit(self, limit: usize) -> Self {
        self.shared.state().session_limit = limit;
        self
    }

    /// Stores session defaults for `user` as if set by an earlier session.
    #[must_use]
    pub fn with_defaults(self, user: &str, defaults: DeviceDefaults) -> Self {
        self.shared
            .state()
            .defaults
            .insert(user.to_owned(), defaults);
        self
    }

    /// User holding the lock on `unit`.
    #[must_use]
    pub fn lock_holder(&self, unit: TestUnitId) -> Option<String> {
        self.shared.state().locks.get(&unit).cloned()
    }

    /// True while a test on `unit` is running.
    #[must_use]
    pub fn is_running(&self, unit: TestUnitId) -> bool {
        self.shared.state().started.contains_key(&unit)
    }

    /// Marks `unit` as locked by `owner` without going through a session.
    pub fn hold_lock(&self, unit: TestUnitId, owner: &str) {
        self.shared.state().locks.insert(unit, owner.to_owned());
    }

    /// Current value of a layer setting.
    #[must_use]
    pub fn setting(&self, layer: u32, key: &str) -> Option<String> {
        self.shared
            .state()
            .settings
            .get(&(layer, key.to_owned()))
            .cloned()
    }

    /// Number of open sessions.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.shared.state().active_sessions
    }

    /// Reports saved so far.
    #[must_use]
    pub fn saved_reports(&self) -> Vec<String> {
        self.shared.state().reports.clone()
    }
}

impl Default for SimulatedChassis {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedChassis {
    fn state(&self) -> MutexGuard<'_, ChassisState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LockRegistry for SharedChassis {
    fn release(&self, unit: TestUnitId, owner: &str) {
        let mut state = self.state();
        if state.locks.get(&unit).is_some_and(|holder| holder == owner) {
            state.locks.remove(&unit);
            debug!(target: DEVICE_TARGET, unit, owner, "test unit unlocked");
        }
    }
}

impl ChassisState {
    fn seed_settings(&mut self) {
        let layers: Vec<LayerHandle> = self
            .protocols
            .iter()
            .flat_map(|entry| entry.layers.iter().copied())
            .collect();
        for layer in layers {
            for (key, value) in default_settings(layer.kind) {
                self.settings
                    .insert((layer.id, (*key).to_owned()), (*value).to_owned());
            }
        }
    }

    fn require_unit(&self, unit: TestUnitId) -> Result<(), DeviceError> {
        if self.protocols.iter().any(|entry| entry.test_unit == unit) {
            Ok(())
        } else {
            Err(DeviceError::Nak(NakReason::InvalidTestId))
        }
    }
}

impl DeviceConnector for SimulatedChassis {
    fn connect(
        &self,
        address: &str,
        user: &str,
        password: &str,
    ) -> Result<Box<dyn Device>, DeviceError> {
        if !is_plausible_address(address) {
            return Err(DeviceError::Server(ServerReason::InvalidAddress));
        }
        if user.is_empty() || !user.bytes().all(|byte| byte.is_ascii_graphic()) {
            return Err(DeviceError::Server(ServerReason::InvalidLoginName));
        }
        let mut state = self.shared.state();
        match state.users.get(user) {
            None => return Err(DeviceError::Server(ServerReason::UserNotFound)),
            Some(expected) if expected != password => {
                return Err(DeviceError::Server(ServerReason::InvalidPassword));
            }
            Some(_) => {}
        }
        if state.active_sessions >= state.session_limit {
            return Err(DeviceError::Server(ServerReason::SessionLimit));
        }
        state.active_sessions += 1;
        debug!(target: DEVICE_TARGET, user, address, "device session opened");
        Ok(Box::new(SimulatedDevice {
            user: user.to_owned(),
            shared: Arc::clone(&self.shared),
            open: true,
        }))
    }
}

fn is_plausible_address(address: &str) -> bool {
    address.parse::<IpAddr>().is_ok()
        || (!address.is_empty()
            && address
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-'))
}

struct SimulatedDevice {
    user: String,
    shared: Arc<SharedChassis>,
    open: bool,
}

impl SimulatedDevice {
    fn state(&self) -> MutexGuard<'_, ChassisState> {
        self.shared.state()
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.close();
    }
}

impl Device for SimulatedDevice {
    fn user(&self) -> &str {
        self.user.as_str()
    }

    fn monitor(&self, text: &[u8]) {
        debug!(
            target: DEVICE_TARGET,
            user = %self.user,
            text = %String::from_utf8_lossy(text),
            "monitor"
        );
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let mut state = self.state();
        state.active_sessions = state.active_sessions.saturating_sub(1);
        debug!(target: DEVICE_TARGET, user = %self.user, "device session closed");
    }

    fn identity(&self) -> Result<Identity, DeviceError> {
        Ok(Identity {
            company: "SIMULATED".to_owned(),
            product: "MPC-6000".to_owned(),
            serial: "SIM0001".to_owned(),
            feature_set: "SCPI".to_owned(),
        })
    }

    fn defaults(&self) -> Result<DeviceDefaults, DeviceError> {
        Ok(self
            .state()
            .defaults
            .get(&self.user)
            .copied()
            .unwrap_or_default())
    }

    fn store_defaults(&mut self, defaults: DeviceDefaults) -> Result<(), DeviceError> {
        let user = self.user.clone();
        self.state().defaults.insert(user, defaults);
        Ok(())
    }

    fn protocols(&self) -> Result<Vec<ProtocolEntry>, DeviceError> {
        Ok(self.state().protocols.clone())
    }

    fn cards(&self) -> Result<Vec<CardInfo>, DeviceError> {
        Ok(self.state().cards.clone())
    }

    fn lock_test_unit(
        &mut self,
        unit: TestUnitId,
        force: bool,
    ) -> Result<Option<TestUnitLock>, DeviceError> {
        {
            let mut state = self.state();
            state.require_unit(unit)?;
            let foreign = state
                .locks
                .get(&unit)
                .is_some_and(|holder| *holder != self.user);
            if foreign && !force {
                return Ok(None);
            }
            state.locks.insert(unit, self.user.clone());
        }
        debug!(target: DEVICE_TARGET, unit, user = %self.user, force, "test unit locked");
        let registry: Arc<dyn LockRegistry> = Arc::clone(&self.shared) as Arc<dyn LockRegistry>;
        Ok(Some(TestUnitLock::new(unit, self.user.clone(), registry)))
    }

    fn lock_owner(&self, unit: TestUnitId) -> Result<Option<String>, DeviceError> {
        let state = self.state();
        state.require_unit(unit)?;
        Ok(state.locks.get(&unit).cloned())
    }

    fn reset_test_unit(&mut self, unit: TestUnitId) -> Result<(), DeviceError> {
        let mut state = self.state();
        state.require_unit(unit)?;
        state.durations.remove(&unit);
        state.started.remove(&unit);
        let layers: Vec<LayerHandle> = state
            .protocols
            .iter()
            .filter(|entry| entry.test_unit == unit)
            .flat_map(|entry| entry.layers.iter().copied())
            .collect();
        for layer in layers {
            for (key, value) in default_settings(layer.kind) {
                state
                    .settings
                    .insert((layer.id, (*key).to_owned()), (*value).to_owned());
            }
        }
        Ok(())
    }

    fn restart_test_unit(&mut self, unit: TestUnitId) -> Result<(), DeviceError> {
        let mut state = self.state();
        state.require_unit(unit)?;
        state.started.insert(unit, Instant::now());
        Ok(())
    }

    fn stop_test_unit(&mut self, unit: TestUnitId) -> Result<(), DeviceError> {
        let mut state = self.state();
        state.require_unit(unit)?;
        state.started.remove(&unit);
        Ok(())
    }

    fn duration(&self, unit: TestUnitId) -> Result<TestDuration, DeviceError> {
        let state = self.state();
        state.require_unit(unit)?;
        Ok(state
            .durations
            .get(&unit)
            .copied()
            .unwrap_or(TestDuration::Continuous))
    }

    fn set_duration(
        &mut self,
        unit: TestUnitId,
        duration: TestDuration,
    ) -> Result<(), DeviceError> {
        let mut state = self.state();
        state.require_unit(unit)?;
        state.durations.insert(unit, duration);
        Ok(())
    }

    fn elapsed(&self, unit: TestUnitId) -> Result<Duration, DeviceError> {
        let state = self.state();
        state.require_unit(unit)?;
        Ok(state
            .started
            .get(&unit)
            .map(Instant::elapsed)
            .unwrap_or_default())
    }

    fn remaining(&self, unit: TestUnitId) -> Result<Option<Duration>, DeviceError> {
        let elapsed = self.elapsed(unit)?;
        match self.duration(unit)? {
            TestDuration::Continuous => Ok(None),
            TestDuration::Minutes(minutes) => Ok(Some(
                Duration::from_secs(u64::from(minutes) * 60).saturating_sub(elapsed),
            )),
        }
    }

    fn protocol_mode(&self) -> Result<ProtocolMode, DeviceError> {
        Ok(self.state().mode)
    }

    fn set_protocol_mode(&mut self, mode: ProtocolMode) -> Result<(), DeviceError> {
        self.state().mode = mode;
        Ok(())
    }

    fn clock(&self) -> Result<ClockKind, DeviceError> {
        Ok(self.state().clock)
    }

    fn supported_clocks(&self) -> Result<Vec<ClockKind>, DeviceError> {
        Ok(self.state().supported_clocks.clone())
    }

    fn set_clock(&mut self, clock: ClockKind) -> Result<(), DeviceError> {
        let mut state = self.state();
        if !state.supported_clocks.contains(&clock) {
            return Err(DeviceError::Nak(NakReason::NotSupported));
        }
        state.clock = clock;
        Ok(())
    }

    fn clock_status(&self) -> Result<String, DeviceError> {
        Ok(format!("{},LOCKED", self.state().clock))
    }

    fn date_time(&self) -> Result<PrimitiveDateTime, DeviceError> {
        Ok(self.state().date_time)
    }

    fn set_date(&mut self, date: Date) -> Result<(), DeviceError> {
        let mut state = self.state();
        state.date_time = state.date_time.replace_date(date);
        Ok(())
    }

    fn set_time(&mut self, time: Time) -> Result<(), DeviceError> {
        let mut state = self.state();
        state.date_time = state.date_time.replace_time(time);
        Ok(())
    }

    fn runtime(&self) -> Result<Duration, DeviceError> {
        Ok(self.state().booted.elapsed())
    }

    fn version(&self) -> Result<String, DeviceError> {
        Ok(concat!("SIM-", env!("CARGO_PKG_VERSION")).to_owned())
    }

    fn os_version(&self) -> Result<String, DeviceError> {
        Ok("SIMULATED-OS 1.0".to_owned())
    }

    fn license(&self) -> Result<String, DeviceError> {
        self.state()
            .license
            .clone()
            .ok_or(DeviceError::Nak(NakReason::InvalidLicense))
    }

    fn install_license(&mut self, key: &str) -> Result<(), DeviceError> {
        let valid = key.len() >= 8 && key.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-');
        if !valid {
            return Err(DeviceError::Nak(NakReason::InvalidLicense));
        }
        self.state().license = Some(key.to_owned());
        Ok(())
    }

    fn license_time_remaining(&self) -> Result<Option<Duration>, DeviceError> {
        if self.state().license.is_none() {
            return Err(DeviceError::Nak(NakReason::InvalidLicense));
        }
        Ok(None)
    }

    fn mch_address(&self) -> Result<String, DeviceError> {
        Ok(self.state().mch_address.clone())
    }

    fn set_mch_address(&mut self, address: &str) -> Result<(), DeviceError> {
        self.state().mch_address = address.to_owned();
        Ok(())
    }

    fn mch_status(&self) -> Result<String, DeviceError> {
        let state = self.state();
        if state.mch_address == "0.0.0.0" {
            Ok("STANDALONE".to_owned())
        } else {
            Ok(format!("MEMBER,{}", state.mch_address))
        }
    }

    fn save_report(&mut self, slot: u32, port: u32, file_name: &str) -> Result<(), DeviceError> {
        let mut state = self.state();
        if !state
            .protocols
            .iter()
            .any(|entry| entry.slot == slot && entry.port == port)
        {
            return Err(DeviceError::Nak(NakReason::InvalidTestId));
        }
        state.reports.push(format!("{slot}/{port}/{file_name}"));
        Ok(())
    }

    fn reboot(&mut self) -> Result<(), DeviceError> {
        debug!(target: DEVICE_TARGET, user = %self.user, "reboot requested");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DeviceError> {
        debug!(target: DEVICE_TARGET, user = %self.user, "shutdown requested");
        Ok(())
    }

    fn read_setting(&self, layer: LayerHandle, key: &str) -> Result<String, DeviceError> {
        self.state()
            .settings
            .get(&(layer.id, key.to_owned()))
            .cloned()
            .ok_or(DeviceError::Nak(NakReason::InvalidSetting))
    }

    fn write_setting(
        &mut self,
        layer: LayerHandle,
        key: &str,
        value: &str,
    ) -> Result<(), DeviceError> {
        let mut state = self.state();
        let slot = state
            .settings
            .get_mut(&(layer.id, key.to_owned()))
            .ok_or(DeviceError::Nak(NakReason::InvalidSetting))?;
        value.clone_into(slot);
        Ok(())
    }
}

fn default_settings(kind: LayerKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        LayerKind::Phy => &[
            ("tx.laser", "OFF"),
            ("tx.pattern", "PRBS31"),
            ("rx.power", "-3.50"),
            ("rx.out_threshold", "1.00E-06"),
        ],
        LayerKind::Otn => &[("fec", "RS"), ("trace.sapi", "")],
        LayerKind::SonetSdh => &[("rate", "OC192"), ("section.trace", "")],
        LayerKind::Ethernet => &[("frame.size", "1518"), ("rate", "100.00")],
        LayerKind::Otl | LayerKind::Pcs | LayerKind::Gfp | LayerKind::FibreChannel => &[],
    }
}

fn layer(kind: LayerKind, id: u32) -> LayerHandle {
    LayerHandle { kind, id }
}

fn entry(
    slot: u32,
    card: CardType,
    protocol: ProtocolType,
    test_unit: TestUnitId,
    layers: Vec<LayerHandle>,
) -> ProtocolEntry {
    ProtocolEntry {
        chassis: 0,
        slot,
        port: 1,
        card,
        protocol,
        test_unit,
        layers,
    }
}

fn stock_protocols() -> Vec<ProtocolEntry> {
    vec![
        entry(1, CardType::Mpm100G, ProtocolType::Phy, 1, vec![layer(LayerKind::Phy, 11)]),
        entry(
            1,
            CardType::Mpm100G,
            ProtocolType::Otn,
            1,
            vec![
                layer(LayerKind::Phy, 11),
                layer(LayerKind::Otl, 12),
                layer(LayerKind::Otn, 13),
            ],
        ),
        entry(
            1,
            CardType::Mpm100G,
            ProtocolType::Packet,
            1,
            vec![
                layer(LayerKind::Phy, 11),
                layer(LayerKind::Pcs, 14),
                layer(LayerKind::Ethernet, 15),
            ],
        ),
        entry(2, CardType::Mpm10G, ProtocolType::Phy, 2, vec![layer(LayerKind::Phy, 21)]),
        entry(
            2,
            CardType::Mpm10G,
            ProtocolType::SonetSdh,
            2,
            vec![layer(LayerKind::Phy, 21), layer(LayerKind::SonetSdh, 22)],
        ),
        entry(
            2,
            CardType::Mpm10G,
            ProtocolType::Otn,
            2,
            vec![layer(LayerKind::Phy, 21), layer(LayerKind::Otn, 23)],
        ),
        entry(
            2,
            CardType::Mpm10G,
            ProtocolType::Packet,
            2,
            vec![layer(LayerKind::Phy, 21), layer(LayerKind::Ethernet, 24)],
        ),
        entry(3, CardType::Mpm400G, ProtocolType::Phy, 3, vec![layer(LayerKind::Phy, 31)]),
        entry(
            3,
            CardType::Mpm400G,
            ProtocolType::Packet,
            3,
            vec![
                layer(LayerKind::Phy, 31),
                layer(LayerKind::Pcs, 32),
                layer(LayerKind::Ethernet, 33),
            ],
        ),
    ]
}

fn card(slot: u32, card: CardType, part: &str, serial: &str) -> CardInfo {
    CardInfo {
        slot,
        card,
        part_number: part.to_owned(),
        serial_number: serial.to_owned(),
        version: "1.0.0".to_owned(),
    }
}

fn stock_cards() -> Vec<CardInfo> {
    vec![
        card(0, CardType::Scm220, "SCM-220-01", "C0000"),
        card(1, CardType::Mpm100G, "MPM-100G-01", "M1001"),
        card(2, CardType::Mpm10G, "MPM-10G-02", "M1002"),
        card(3, CardType::Mpm400G, "MPM-400G-01", "M1003"),
        card(4, CardType::Osa, "OSA-01", "O1004"),
    ]
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn chassis() -> SimulatedChassis {
        SimulatedChassis::new().with_user("bob", "hunter2")
    }

    #[rstest]
    #[case("", "admin", "secret", ServerReason::InvalidAddress)]
    #[case("127.0.0.1", "", "secret", ServerReason::InvalidLoginName)]
    #[case("127.0.0.1", "carol", "secret", ServerReason::UserNotFound)]
    #[case("127.0.0.1", "admin", "wrong", ServerReason::InvalidPassword)]
    fn connect_rejects_bad_credentials(
        chassis: SimulatedChassis,
        #[case] address: &str,
        #[case] user: &str,
        #[case] password: &str,
        #[case] reason: ServerReason,
    ) {
        let error = chassis
            .connect(address, user, password)
            .err()
            .expect("connect should fail");
        assert_eq!(error, DeviceError::Server(reason));
    }

    #[rstest]
    fn session_limit_is_enforced(chassis: SimulatedChassis) {
        let chassis = chassis.with_session_limit(1);
        let first = chassis.connect("127.0.0.1", "admin", "secret").expect("first");
        let second = chassis.connect("127.0.0.1", "bob", "hunter2");
        assert_eq!(
            second.err(),
            Some(DeviceError::Server(ServerReason::SessionLimit))
        );
        drop(first);
        assert_eq!(chassis.active_sessions(), 0);
    }

    #[rstest]
    fn foreign_locks_need_force(chassis: SimulatedChassis) {
        let mut admin = chassis.connect("127.0.0.1", "admin", "secret").expect("admin");
        let mut bob = chassis.connect("127.0.0.1", "bob", "hunter2").expect("bob");

        let held = admin.lock_test_unit(1, false).expect("lock").expect("granted");
        assert!(bob.lock_test_unit(1, false).expect("lock").is_none());

        let forced = bob.lock_test_unit(1, true).expect("lock").expect("forced");
        assert_eq!(chassis.lock_holder(1).as_deref(), Some("bob"));

        drop(held);
        assert_eq!(chassis.lock_holder(1).as_deref(), Some("bob"));
        drop(forced);
        assert_eq!(chassis.lock_holder(1), None);
    }

    #[rstest]
    fn reset_restores_layer_defaults(chassis: SimulatedChassis) {
        let mut device = chassis.connect("127.0.0.1", "admin", "secret").expect("admin");
        let phy = layer(LayerKind::Phy, 11);
        device.write_setting(phy, "tx.laser", "ON").expect("write");
        assert_eq!(chassis.setting(11, "tx.laser").as_deref(), Some("ON"));
        device.reset_test_unit(1).expect("reset");
        assert_eq!(chassis.setting(11, "tx.laser").as_deref(), Some("OFF"));
    }

    #[rstest]
    fn unknown_units_are_rejected(chassis: SimulatedChassis) {
        let mut device = chassis.connect("127.0.0.1", "admin", "secret").expect("admin");
        assert_eq!(
            device.restart_test_unit(99),
            Err(DeviceError::Nak(NakReason::InvalidTestId))
        );
    }
}
