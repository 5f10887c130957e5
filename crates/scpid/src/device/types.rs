//! Value types exchanged with the device façade.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr, VariantArray};

/// Identifier of a lockable test unit.
pub type TestUnitId = u32;

/// Card families that can occupy a chassis slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum CardType {
    /// Optical spectrum analyser.
    #[strum(serialize = "OSA")]
    Osa,
    /// Insertion-loss meter.
    #[strum(serialize = "IM-100")]
    Im100,
    /// Optical time-domain reflectometer.
    #[strum(serialize = "OTDR")]
    Otdr,
    /// Optical switch.
    #[strum(serialize = "OPSW")]
    Opsw,
    /// Chassis controller, first generation.
    #[strum(serialize = "SCM-210")]
    Scm210,
    /// 10G multi-protocol module.
    #[strum(serialize = "MPM-10G")]
    Mpm10G,
    /// 100G multi-protocol module.
    #[strum(serialize = "MPM-100G")]
    Mpm100G,
    /// 100G multi-protocol module, AR variant.
    #[strum(serialize = "MPM-100AR")]
    Mpm100Ar,
    /// 400G multi-protocol module.
    #[strum(serialize = "MPM-400G")]
    Mpm400G,
    /// 400G multi-protocol module, AR variant.
    #[strum(serialize = "MPM-400AR")]
    Mpm400Ar,
    /// 400G multi-protocol module with coherent optics.
    #[strum(serialize = "MPM-400DCO")]
    Mpm400Dco,
    /// 600G multi-protocol module.
    #[strum(serialize = "MPM-600G")]
    Mpm600G,
    /// Chassis controller, second generation.
    #[strum(serialize = "SCM-220")]
    Scm220,
    /// Card the library could not identify.
    #[strum(serialize = "<unknown>")]
    Unknown,
}

/// Protocol family of a selected instrument; picks the subsystem command tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProtocolType {
    /// Nothing selected.
    #[default]
    None,
    /// Physical layer (lasers, patterns, optics).
    Phy,
    /// Optical transport network.
    Otn,
    /// SONET or SDH framing.
    SonetSdh,
    /// Packet-class protocols (Ethernet, Fibre Channel).
    Packet,
}

impl fmt::Display for ProtocolType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "NONE",
            Self::Phy => "PHY",
            Self::Otn => "OTN",
            Self::SonetSdh => "SONET_SDH",
            Self::Packet => "PACKET",
        };
        formatter.write_str(label)
    }
}

/// Layers a protocol processor exposes handles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Phy,
    Otl,
    Pcs,
    Otn,
    SonetSdh,
    Gfp,
    Ethernet,
    FibreChannel,
}

/// Handle to one layer of a protocol processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerHandle {
    /// Layer this handle addresses.
    pub kind: LayerKind,
    /// Device-side identifier.
    pub id: u32,
}

/// One protocol processor as reported by the chassis inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolEntry {
    pub chassis: u32,
    pub slot: u32,
    pub port: u32,
    pub card: CardType,
    pub protocol: ProtocolType,
    pub test_unit: TestUnitId,
    pub layers: Vec<LayerHandle>,
}

/// A populated chassis slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    pub slot: u32,
    pub card: CardType,
    pub part_number: String,
    pub serial_number: String,
    pub version: String,
}

/// `*IDN?` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub company: String,
    pub product: String,
    pub serial: String,
    pub feature_set: String,
}

/// Per-user session defaults stored on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceDefaults {
    /// Answer `+0` for silent successes.
    pub respond_always: bool,
    /// Pre-empt foreign locks on instrument selection.
    pub force_lock: bool,
}

/// Chassis-wide protocol mode set by `PROTOCOL` and `*RST`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, IntoStaticStr, VariantArray,
)]
#[strum(ascii_case_insensitive)]
pub enum ProtocolMode {
    #[default]
    #[strum(serialize = "SONET")]
    Sonet,
    #[strum(serialize = "SDH")]
    Sdh,
    #[strum(serialize = "DS1_DS3")]
    Ds1Ds3,
    #[strum(serialize = "E1_DS3")]
    E1Ds3,
    #[strum(serialize = "E1_E3")]
    E1E3,
    #[strum(serialize = "SONET_DS1_DS3")]
    SonetDs1Ds3,
    #[strum(serialize = "SONET_E1_DS3")]
    SonetE1Ds3,
    #[strum(serialize = "SONET_E1_E3")]
    SonetE1E3,
    #[strum(serialize = "SDH_DS1_DS3")]
    SdhDs1Ds3,
    #[strum(serialize = "SDH_E1_DS3")]
    SdhE1Ds3,
    #[strum(serialize = "SDH_E1_E3")]
    SdhE1E3,
}

/// Reference clock sources a chassis controller may offer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr,
    VariantArray,
)]
#[strum(ascii_case_insensitive)]
pub enum ClockKind {
    #[default]
    #[strum(serialize = "INTERNAL")]
    Internal,
    #[strum(serialize = "INT_SETS")]
    IntSets,
    #[strum(serialize = "INT_BITS")]
    IntBits,
    #[strum(serialize = "INT_SETSSINE")]
    IntSetsSine,
    #[strum(serialize = "INT_BITSSINE")]
    IntBitsSine,
    #[strum(serialize = "BITS")]
    Bits,
    #[strum(serialize = "SETS")]
    Sets,
    #[strum(serialize = "SETSSINE")]
    SetsSine,
    #[strum(serialize = "GPS")]
    Gps,
    #[strum(serialize = "SMA_1544")]
    Sma1544,
    #[strum(serialize = "SMA_2048")]
    Sma2048,
    #[strum(serialize = "SMA_10M")]
    Sma10M,
    #[strum(serialize = "SMA_1PPS")]
    Sma1Pps,
    #[strum(serialize = "INT_10M")]
    Int10M,
    #[strum(serialize = "INT_1PPS")]
    Int1Pps,
    #[strum(serialize = "SMA_10M_1PPS")]
    Sma10M1Pps,
    #[strum(serialize = "SMA_1PPS_10M")]
    Sma1Pps10M,
    #[strum(serialize = "GPS_1PPS")]
    Gps1Pps,
    #[strum(serialize = "GPS_2048")]
    Gps2048,
    #[strum(serialize = "GPS_1544")]
    Gps1544,
    #[strum(serialize = "GPS_10M")]
    Gps10M,
    #[strum(serialize = "SMA_1544_NO_OUT")]
    Sma1544NoOut,
    #[strum(serialize = "SMA_2048_NO_OUT")]
    Sma2048NoOut,
}

/// Configured test duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestDuration {
    /// Run for the given number of minutes.
    Minutes(u32),
    /// Run until stopped.
    Continuous,
}

impl fmt::Display for TestDuration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(minutes) => write!(formatter, "{minutes}"),
            Self::Continuous => formatter.write_str("CONTINUOUS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("sonet_e1_e3", ProtocolMode::SonetE1E3)]
    #[case("DS1_DS3", ProtocolMode::Ds1Ds3)]
    fn protocol_modes_parse_case_insensitively(#[case] text: &str, #[case] mode: ProtocolMode) {
        assert_eq!(text.parse::<ProtocolMode>().ok(), Some(mode));
    }

    #[test]
    fn protocol_mode_set_is_closed() {
        assert_eq!(ProtocolMode::VARIANTS.len(), 11);
        assert!("SONET_SDH".parse::<ProtocolMode>().is_err());
    }

    #[test]
    fn clock_symbols_round_trip() {
        for clock in ClockKind::VARIANTS {
            assert_eq!(clock.to_string().parse::<ClockKind>().ok(), Some(*clock));
        }
        assert_eq!(ClockKind::VARIANTS.len(), 23);
    }

    #[test]
    fn unknown_cards_render_placeholder() {
        assert_eq!(CardType::Unknown.to_string(), "<unknown>");
        assert_eq!("mpm-100ar".parse::<CardType>().ok(), Some(CardType::Mpm100Ar));
    }
}
