//! Fixed SCPI and vendor error codes with their descriptions.
//!
//! Negative codes come from the SCPI standard. Non-negative codes are vendor
//! specific and grouped by the subsystem that raises them. Descriptions are
//! part of the wire contract: automation clients match on them.

use std::fmt;

/// A SCPI error code.
///
/// Codes outside the table are representable so that unknown values read
/// back from a device still encode, rendering as `"Unknown error"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(i32);

macro_rules! error_codes {
    ($($(#[$doc:meta])* $name:ident = $value:literal => $text:literal;)+) => {
        impl ErrorCode {
            $(
                $(#[$doc])*
                pub const $name: Self = Self($value);
            )+

            /// Every code that carries a fixed description.
            pub const ALL: &'static [Self] = &[$(Self::$name),+];

            fn known_description(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some($text),)+
                    _ => None,
                }
            }
        }
    };
}

error_codes! {
    /// No error.
    NO_ERROR = 0 => "No error";

    // Common.
    /// A parameter was rejected by the device library.
    COMMON_INVALID_PARAMETER = 101 => "Invalid parameter";
    /// The device address could not be reached.
    COMMON_INVALID_ADDRESS = 102 => "Invalid address";
    /// The device did not answer in time.
    COMMON_TIMEOUT = 103 => "Operation timed out";
    /// The device resource is busy.
    COMMON_RESOURCE_BUSY = 104 => "Resource busy";
    /// The operation is not supported by this chassis.
    COMMON_NOT_SUPPORTED = 105 => "Operation not supported";
    /// The addressed unit is out of service.
    COMMON_OUT_OF_SERVICE = 106 => "Out of service";
    /// The licence for the feature has expired.
    COMMON_LICENSE_EXPIRED = 107 => "License expired";
    /// The instrument is not in a mode that allows the operation.
    COMMON_INVALID_MODE = 108 => "Invalid mode";

    // Account manager.
    /// The session already holds a device handle.
    ADMIN_ALREADY_LOGGED_IN = 201 => "User already logged-in";
    /// The session has no device handle.
    ADMIN_NOT_LOGGED_IN = 202 => "User not logged-in";
    /// The user may not perform the operation.
    ADMIN_UNAUTHORIZED = 203 => "Unauthorized access";
    /// The user name is unknown to the chassis.
    ADMIN_USER_NOT_FOUND = 204 => "User not found";
    /// The password did not match.
    ADMIN_INVALID_PASSWORD = 205 => "Invalid password";
    /// The login name is malformed.
    ADMIN_INVALID_LOGIN_NAME = 206 => "Invalid login name";
    /// The chassis session cap has been reached.
    ADMIN_SESSION_LIMIT = 207 => "Maximum number of sessions reached";
    /// The user already exists.
    ADMIN_USER_EXISTS = 208 => "User already exists";
    /// The account is locked.
    ADMIN_ACCOUNT_LOCKED = 209 => "Account locked";
    /// The password has expired.
    ADMIN_PASSWORD_EXPIRED = 210 => "Password expired";
    /// The user lacks the privilege level required.
    ADMIN_INSUFFICIENT_PRIVILEGE = 211 => "Insufficient privileges";

    // System configuration.
    /// The date could not be parsed or applied.
    SYSCFG_INVALID_DATE = 301 => "Invalid date";
    /// The time could not be parsed or applied.
    SYSCFG_INVALID_TIME = 302 => "Invalid time";
    /// The clock source name is unknown.
    SYSCFG_INVALID_CLOCK = 303 => "Invalid clock source";
    /// The controller cannot use the requested clock source.
    SYSCFG_CLOCK_NOT_SUPPORTED = 304 => "Clock source not supported by controller";
    /// The protocol mode name is unknown.
    SYSCFG_INVALID_PROTOCOL_MODE = 305 => "Invalid protocol mode";
    /// The IP address is malformed.
    SYSCFG_INVALID_IP_ADDRESS = 306 => "Invalid IP address";
    /// The multi-chassis address is malformed.
    SYSCFG_INVALID_CHASSIS_ADDRESS = 307 => "Invalid chassis address";
    /// The chassis refused to reboot.
    SYSCFG_REBOOT_FAILED = 308 => "Reboot failed";
    /// The chassis refused to shut down.
    SYSCFG_SHUTDOWN_FAILED = 309 => "Shutdown failed";
    /// The test duration is malformed or out of range.
    SYSCFG_INVALID_DURATION = 310 => "Invalid duration";
    /// The persisted configuration could not be read.
    SYSCFG_CONFIG_FILE_ERROR = 311 => "Configuration file error";
    /// No licence is installed for the feature.
    SYSCFG_LICENSE_NOT_INSTALLED = 312 => "License not installed";
    /// The licence key was rejected.
    SYSCFG_INVALID_LICENSE = 313 => "Invalid license";

    // Data manager.
    /// The test report could not be written.
    DATAMGR_REPORT_FAILED = 401 => "Unable to save report";

    // Protocol manager.
    /// The chassis number is not valid for this system.
    PROTMGR_INVALID_CHASSIS = 501 => "Invalid chassis";
    /// The slot number is not valid.
    PROTMGR_INVALID_SLOT = 502 => "Invalid slot";
    /// The port number is not valid.
    PROTMGR_INVALID_PORT = 503 => "Invalid port";
    /// The instrument name is not recognised.
    PROTMGR_INVALID_INSTRUMENT = 504 => "Invalid instrument name";
    /// No protocol matches the selection.
    PROTMGR_INSTRUMENT_NOT_FOUND = 505 => "Instrument not found";
    /// Another user holds the test unit lock.
    PROTMGR_TEST_UNIT_LOCKED = 506 => "Test unit locked by another user";
    /// The session does not hold the test unit lock.
    PROTMGR_TEST_UNIT_NOT_LOCKED = 507 => "Test unit not locked";
    /// No instrument is selected, or the selection lacks the needed layer.
    PROTMGR_INVALID_PP_MODE = 508 => "Invalid protocol processor mode";
    /// The protocol processor is not running.
    PROTMGR_NOT_RUNNING = 509 => "Protocol processor not running";

    // Test manager.
    /// A test is already running.
    TESTMGR_ALREADY_RUNNING = 601 => "Test already running";
    /// The test identifier is unknown.
    TESTMGR_INVALID_TEST_ID = 602 => "Invalid test ID";
    /// No test is running.
    TESTMGR_NOT_RUNNING = 603 => "Test not running";

    // Database.
    /// The result database failed.
    DATABASE_ERROR = 701 => "Database error";
    /// The record does not exist.
    DATABASE_RECORD_NOT_FOUND = 702 => "Record not found";

    // Miscellaneous.
    /// The registry key is unknown.
    MISC_INVALID_REGISTRY_KEY = 800 => "Invalid registry key";
    /// The registry value is malformed.
    MISC_INVALID_REGISTRY_VALUE = 801 => "Invalid registry value";
    /// The file could not be opened.
    MISC_FILE_OPEN_FAILED = 802 => "Unable to open file";
    /// The file could not be written.
    MISC_FILE_WRITE_FAILED = 803 => "Unable to write file";
    /// The feature is not available on this chassis.
    MISC_FEATURE_UNAVAILABLE = 804 => "Feature not available";

    /// Catch-all for failures without a dedicated code.
    INTERNAL_UNHANDLED_ERROR = 900 => "Unhandled internal error";

    // Domain specific.
    /// The transmitter is already enabled.
    TX_ALREADY_ON = 901 => "TX already on";
    /// The transmitter is already disabled.
    TX_ALREADY_OFF = 902 => "TX already off";
    /// The receiver is already enabled.
    RX_ALREADY_ON = 903 => "RX already on";
    /// The receiver is already disabled.
    RX_ALREADY_OFF = 904 => "RX already off";
    /// The laser must be on for the operation.
    LASER_OFF = 905 => "Laser is off";
    /// The laser must be off for the operation.
    LASER_ON = 906 => "Laser is on";
    /// No optical signal at the receiver.
    LOSS_OF_SIGNAL = 907 => "Loss of signal";
    /// The receiver has not achieved frame alignment.
    LOSS_OF_FRAME = 908 => "Loss of frame";
    /// The pattern detector is not synchronised.
    PATTERN_NOT_SYNCED = 909 => "Pattern not synchronized";
    /// The test pattern is not valid for the interface.
    INVALID_PATTERN = 910 => "Invalid pattern";
    /// The line rate is not valid for the interface.
    INVALID_RATE = 911 => "Invalid rate";
    /// The wavelength is outside the tunable range.
    INVALID_WAVELENGTH = 912 => "Invalid wavelength";
    /// The optical power is outside the allowed range.
    INVALID_POWER = 913 => "Invalid power level";
    /// The error-rate threshold is malformed.
    INVALID_THRESHOLD = 914 => "Invalid threshold";
    /// The lane number is out of range.
    INVALID_LANE = 915 => "Invalid lane";
    /// The FEC mode is not valid for the interface.
    INVALID_FEC_MODE = 916 => "Invalid FEC mode";
    /// The trace message is malformed.
    INVALID_TRACE = 917 => "Invalid trace message";
    /// The overhead byte is not valid.
    INVALID_OVERHEAD = 918 => "Invalid overhead byte";
    /// The mapping is not valid for the payload.
    INVALID_MAPPING = 919 => "Invalid mapping";
    /// The payload type is not valid.
    INVALID_PAYLOAD = 920 => "Invalid payload type";
    /// The tributary slot assignment is not valid.
    INVALID_TRIBUTARY = 921 => "Invalid tributary slot";
    /// The frame size is out of range.
    INVALID_FRAME_SIZE = 922 => "Invalid frame size";
    /// The MAC address is malformed.
    INVALID_MAC_ADDRESS = 923 => "Invalid MAC address";
    /// The VLAN identifier is out of range.
    INVALID_VLAN = 924 => "Invalid VLAN";
    /// The stream identifier is out of range.
    INVALID_STREAM = 925 => "Invalid stream";
    /// The traffic rate is out of range.
    INVALID_TRAFFIC_RATE = 926 => "Invalid traffic rate";
    /// The error injection setting is not valid.
    INVALID_INJECTION = 927 => "Invalid error injection";
    /// The alarm injection setting is not valid.
    INVALID_ALARM = 928 => "Invalid alarm injection";
    /// The transceiver is not present.
    TRANSCEIVER_MISSING = 929 => "Transceiver not present";
    /// The transceiver does not support the configuration.
    TRANSCEIVER_UNSUPPORTED = 930 => "Transceiver not supported";
    /// Results could not be produced.
    INVALID_RESULTS = 931 => "Invalid results";
    /// The device rejected the setting.
    INVALID_SETTING = 932 => "Invalid setting";
    /// Statistics are not available yet.
    STATS_UNAVAILABLE = 933 => "Statistics not available";
    /// The measurement is already running.
    MEASUREMENT_RUNNING = 934 => "Measurement running";
    /// The measurement is not running.
    MEASUREMENT_STOPPED = 935 => "Measurement stopped";
    /// The loopback configuration is not valid.
    INVALID_LOOPBACK = 936 => "Invalid loopback";
    /// The clock offset is out of range.
    INVALID_CLOCK_OFFSET = 937 => "Invalid clock offset";
    /// The skew value is out of range.
    INVALID_SKEW = 938 => "Invalid skew";
    /// The switch port is not valid.
    INVALID_SWITCH_PORT = 939 => "Invalid switch port";
    /// The attenuation is out of range.
    INVALID_ATTENUATION = 940 => "Invalid attenuation";
    /// The OSA sweep configuration is not valid.
    INVALID_SWEEP = 941 => "Invalid sweep";
    /// The OTDR acquisition configuration is not valid.
    INVALID_ACQUISITION = 942 => "Invalid acquisition";
    /// The card firmware is incompatible.
    FIRMWARE_MISMATCH = 943 => "Firmware mismatch";
    /// The card is still initialising.
    CARD_NOT_READY = 944 => "Card not ready";

    // Standard SCPI.
    /// Unrecognised or malformed command.
    CMD_ERR = -100 => "Command error";
    /// Write error.
    WRITE_ERR = -101 => "Write error";
    /// Parameter of the wrong type.
    DATA_TYPE_ERR = -104 => "Data type error";
    /// More parameters than the command accepts.
    PARAMETER_NOT_ALLOWED = -108 => "Parameter not allowed";
    /// Fewer parameters than the command requires.
    MISSING_PARAMETER = -109 => "Missing parameter";
    /// Malformed numeric parameter.
    NUMERIC_DATA_ERR = -120 => "Numeric data error";
    /// Generic execution failure.
    EXECUTION_ERR = -200 => "Execution error";
    /// The command needs write access the session does not have.
    COMMAND_PROTECTED = -203 => "Command protected";
    /// The initiate request was ignored.
    INIT_IGNORED = -213 => "Init ignored";
    /// Numeric parameter outside the allowed range.
    DATA_OUT_OF_RANGE = -222 => "Data out of range";
    /// Parameter value outside the allowed set.
    ILLEGAL_PARAMETER_VALUE = -224 => "Illegal parameter value";
    /// The addressed hardware is not fitted.
    HARDWARE_MISSING = -241 => "Hardware missing";
    /// The named file does not exist.
    FILE_NOT_FOUND = -256 => "File name not found";
    /// System controller failure.
    SYSTEM_CONTROLLER_ERR = -300 => "System controller error";
    /// System exception.
    SYSTEM_EXCEPTION = -310 => "System exception";
    /// The error queue overflowed.
    QUEUE_OVERFLOW = -350 => "Queue overflow";
}

impl ErrorCode {
    /// Wraps a raw integer code.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Raw integer value.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Fixed human description, `"Unknown error"` for codes outside the table.
    #[must_use]
    pub fn description(self) -> &'static str {
        self.known_description().unwrap_or("Unknown error")
    }

    /// Returns true for the "no error" code.
    #[must_use]
    pub const fn is_no_error(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:+}", self.0)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::*;

    #[test]
    fn codes_are_unique() {
        let values: HashSet<i32> = ErrorCode::ALL.iter().map(|code| code.value()).collect();
        assert_eq!(values.len(), ErrorCode::ALL.len());
    }

    #[test]
    fn codes_stay_in_range() {
        assert!(
            ErrorCode::ALL
                .iter()
                .all(|code| (-350..=944).contains(&code.value()))
        );
    }

    #[rstest]
    #[case(ErrorCode::CMD_ERR, "Command error")]
    #[case(ErrorCode::ADMIN_NOT_LOGGED_IN, "User not logged-in")]
    #[case(ErrorCode::PROTMGR_INVALID_PP_MODE, "Invalid protocol processor mode")]
    #[case(ErrorCode::MISC_INVALID_REGISTRY_KEY, "Invalid registry key")]
    #[case(ErrorCode::QUEUE_OVERFLOW, "Queue overflow")]
    #[case(ErrorCode::RX_ALREADY_ON, "RX already on")]
    #[case(ErrorCode::new(12345), "Unknown error")]
    fn descriptions(#[case] code: ErrorCode, #[case] expected: &str) {
        assert_eq!(code.description(), expected);
    }

    #[test]
    fn displays_with_explicit_sign() {
        assert_eq!(ErrorCode::NO_ERROR.to_string(), "+0");
        assert_eq!(ErrorCode::CMD_ERR.to_string(), "-100");
        assert_eq!(ErrorCode::MISC_INVALID_REGISTRY_KEY.to_string(), "+800");
    }
}
