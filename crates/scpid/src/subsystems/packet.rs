//! Packet-class commands: frame size and traffic rate.

use std::ops::RangeInclusive;

use scpi_lang::ErrorCode;
use scpi_lang::numeric::{parse_decimal, parse_fixed};

use crate::device::LayerKind;
use crate::dispatch::CommandError;
use crate::session::SessionContext;

use super::{Dictionary, no_parameters, read_setting, single_parameter, write_setting};

pub(super) const DICTIONARY: Dictionary = &[
    ("FRAMe:SIZE?", query_frame_size),
    ("FRAMe:SIZE", set_frame_size),
    ("RATE?", query_rate),
    ("RATE", set_rate),
];

const FRAME_SIZES: RangeInclusive<u64> = 64..=9600;

fn query_frame_size(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    read_setting(ctx, LayerKind::Ethernet, "frame.size")
}

fn set_frame_size(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let size = parse_decimal(single_parameter(raw)?)
        .ok_or_else(|| CommandError::code(ErrorCode::NUMERIC_DATA_ERR))?;
    if !FRAME_SIZES.contains(&size) {
        return Err(CommandError::code(ErrorCode::INVALID_FRAME_SIZE));
    }
    write_setting(ctx, LayerKind::Ethernet, "frame.size", &size.to_string())
}

/// Traffic rate as a percentage of line rate.
fn query_rate(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    read_setting(ctx, LayerKind::Ethernet, "rate")
}

fn set_rate(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let rate = match parse_fixed(single_parameter(raw)?) {
        Some(rate) if rate > 0.0 && rate <= 100.0 => rate,
        _ => return Err(CommandError::code(ErrorCode::INVALID_RATE)),
    };
    write_setting(ctx, LayerKind::Ethernet, "rate", &format!("{rate:.2}"))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::device::SimulatedChassis;

    use super::super::fixtures::{assert_code, logged_in, text};
    use super::super::instrument::select_instrument;
    use super::*;

    fn selected(chassis: &SimulatedChassis) -> SessionContext {
        let mut context = logged_in(chassis);
        select_instrument(&mut context, b"MPM400ETH").expect("select");
        context
    }

    #[rstest]
    #[case(b"64" as &[u8], Ok("64"))]
    #[case(b"9600", Ok("9600"))]
    #[case(b"63", Err(ErrorCode::INVALID_FRAME_SIZE))]
    #[case(b"jumbo", Err(ErrorCode::NUMERIC_DATA_ERR))]
    fn frame_size_is_bounded(#[case] raw: &[u8], #[case] expected: Result<&str, ErrorCode>) {
        let chassis = SimulatedChassis::new();
        let mut context = selected(&chassis);
        let result = set_frame_size(&mut context, raw);
        match expected {
            Ok(size) => {
                result.expect("accepted");
                assert_eq!(text(query_frame_size(&mut context, b"")), size);
            }
            Err(code) => assert_code(result, code),
        }
    }

    #[test]
    fn rate_is_a_percentage() {
        let chassis = SimulatedChassis::new();
        let mut context = selected(&chassis);
        set_rate(&mut context, b"12.5").expect("set");
        assert_eq!(chassis.setting(33, "rate").as_deref(), Some("12.50"));
        assert_code(set_rate(&mut context, b"100.1"), ErrorCode::INVALID_RATE);
        assert_code(set_rate(&mut context, b"-1"), ErrorCode::INVALID_RATE);
    }
}
