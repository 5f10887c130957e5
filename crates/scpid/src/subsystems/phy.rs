//! Physical-layer commands: laser, test pattern and receive optics.

use scpi_lang::ErrorCode;
use scpi_lang::numeric::parse_scientific;

use crate::device::LayerKind;
use crate::dispatch::CommandError;
use crate::session::SessionContext;

use super::{Dictionary, no_parameters, on_off, read_setting, single_parameter, text, write_setting};

pub(super) const DICTIONARY: Dictionary = &[
    ("TX:LASer?", query_laser),
    ("TX:LASer", set_laser),
    ("TX:PATTern?", query_pattern),
    ("TX:PATTern", set_pattern),
    ("RX:POWer?", rx_power),
    ("RX:OUTTHRESHold?", query_out_threshold),
    ("RX:OUTTHRESHold", set_out_threshold),
];

/// Pattern labels are matched exactly; the trailing `i` marks inversion.
const PATTERNS: &[&str] = &[
    "PRBS7", "PRBS7i", "PRBS9", "PRBS9i", "PRBS11", "PRBS11i", "PRBS15", "PRBS15i", "PRBS20",
    "PRBS20i", "PRBS23", "PRBS23i", "PRBS31", "PRBS31i", "USER",
];

fn query_laser(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    read_setting(ctx, LayerKind::Phy, "tx.laser")
}

fn set_laser(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let state = on_off(single_parameter(raw)?)?;
    write_setting(ctx, LayerKind::Phy, "tx.laser", state)
}

fn query_pattern(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    read_setting(ctx, LayerKind::Phy, "tx.pattern")
}

fn set_pattern(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let pattern = text(single_parameter(raw)?);
    if !PATTERNS.contains(&pattern.as_str()) {
        return Err(CommandError::code(ErrorCode::INVALID_PATTERN));
    }
    write_setting(ctx, LayerKind::Phy, "tx.pattern", &pattern)
}

/// Received optical power in dBm.
fn rx_power(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    read_setting(ctx, LayerKind::Phy, "rx.power")
}

fn query_out_threshold(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    read_setting(ctx, LayerKind::Phy, "rx.out_threshold")
}

/// Error-rate threshold above which the receiver reports out-of-spec.
fn set_out_threshold(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let token = single_parameter(raw)?;
    match parse_scientific(token) {
        Some(rate) if rate > 0.0 && rate < 1.0 => {}
        _ => return Err(CommandError::code(ErrorCode::INVALID_THRESHOLD)),
    }
    write_setting(ctx, LayerKind::Phy, "rx.out_threshold", &text(token))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::device::SimulatedChassis;

    use super::super::fixtures::{assert_code, logged_in, text};
    use super::super::instrument::{select_instrument, select_read_only};
    use super::*;

    fn selected(chassis: &SimulatedChassis) -> SessionContext {
        let mut context = logged_in(chassis);
        select_instrument(&mut context, b"MPM100MLD").expect("select");
        context
    }

    #[test]
    fn laser_state_reaches_the_device() {
        let chassis = SimulatedChassis::new();
        let mut context = selected(&chassis);
        assert_eq!(text(query_laser(&mut context, b"")), "OFF");
        set_laser(&mut context, b"on").expect("set");
        assert_eq!(chassis.setting(11, "tx.laser").as_deref(), Some("ON"));
    }

    #[rstest]
    #[case(b"PRBS31i" as &[u8], true)]
    #[case(b"PRBS23", true)]
    #[case(b"prbs31", false)]
    #[case(b"PRBS31I", false)]
    fn pattern_labels_are_case_significant(#[case] raw: &[u8], #[case] accepted: bool) {
        let chassis = SimulatedChassis::new();
        let mut context = selected(&chassis);
        let result = set_pattern(&mut context, raw);
        if accepted {
            assert!(result.expect("accepted").is_empty());
        } else {
            assert_code(result, ErrorCode::INVALID_PATTERN);
        }
    }

    #[rstest]
    #[case(b"1.5E-4" as &[u8], Some("1.5E-4"))]
    #[case(b"2E-9", Some("2E-9"))]
    #[case(b"2e-9", None)]
    #[case(b"3", None)]
    #[case(b"bogus", None)]
    fn out_threshold_must_be_an_error_rate(#[case] raw: &[u8], #[case] stored: Option<&str>) {
        let chassis = SimulatedChassis::new();
        let mut context = selected(&chassis);
        let result = set_out_threshold(&mut context, raw);
        match stored {
            Some(value) => {
                result.expect("accepted");
                assert_eq!(text(query_out_threshold(&mut context, b"")), value);
            }
            None => assert_code(result, ErrorCode::INVALID_THRESHOLD),
        }
    }

    #[test]
    fn writes_without_the_lock_are_protected() {
        let chassis = SimulatedChassis::new();
        chassis.hold_lock(1, "operator");
        let mut context = logged_in(&chassis);
        select_read_only(&mut context, b"MPM100MLD").expect("select");
        assert_eq!(text(rx_power(&mut context, b"")), "-3.50");
        assert_code(set_laser(&mut context, b"ON"), ErrorCode::COMMAND_PROTECTED);
    }

    #[test]
    fn illegal_laser_states_are_rejected() {
        let chassis = SimulatedChassis::new();
        let mut context = selected(&chassis);
        assert_code(
            set_laser(&mut context, b"BRIGHT"),
            ErrorCode::ILLEGAL_PARAMETER_VALUE,
        );
    }
}
