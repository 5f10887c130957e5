//! OTN commands: forward error correction and trail trace.

use scpi_lang::ErrorCode;

use crate::device::LayerKind;
use crate::dispatch::CommandError;
use crate::session::SessionContext;

use super::{
    Dictionary, no_parameters, read_setting, single_parameter, trace_text, upper, write_setting,
};

pub(super) const DICTIONARY: Dictionary = &[
    ("FEC?", query_fec),
    ("FEC", set_fec),
    ("TRACe:SAPI?", query_sapi),
    ("TRACe:SAPI", set_sapi),
];

const FEC_MODES: &[&str] = &["OFF", "RS", "EFEC", "SDFEC"];

fn query_fec(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    read_setting(ctx, LayerKind::Otn, "fec")
}

fn set_fec(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let mode = upper(single_parameter(raw)?);
    if !FEC_MODES.contains(&mode.as_str()) {
        return Err(CommandError::code(ErrorCode::INVALID_FEC_MODE));
    }
    write_setting(ctx, LayerKind::Otn, "fec", &mode)
}

fn query_sapi(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    read_setting(ctx, LayerKind::Otn, "trace.sapi")
}

fn set_sapi(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let sapi = trace_text(single_parameter(raw)?)?;
    write_setting(ctx, LayerKind::Otn, "trace.sapi", &sapi)
}

#[cfg(test)]
mod tests {
    use crate::device::SimulatedChassis;

    use super::super::fixtures::{assert_code, logged_in, text};
    use super::super::instrument::select_instrument;
    use super::*;

    fn selected(chassis: &SimulatedChassis) -> SessionContext {
        let mut context = logged_in(chassis);
        select_instrument(&mut context, b"MPM100OTN").expect("select");
        context
    }

    #[test]
    fn fec_mode_round_trips() {
        let chassis = SimulatedChassis::new();
        let mut context = selected(&chassis);
        assert_eq!(text(query_fec(&mut context, b"")), "RS");
        set_fec(&mut context, b"efec").expect("set");
        assert_eq!(text(query_fec(&mut context, b"")), "EFEC");
        assert_code(set_fec(&mut context, b"TURBO"), ErrorCode::INVALID_FEC_MODE);
    }

    #[test]
    fn sapi_is_limited_to_fifteen_characters() {
        let chassis = SimulatedChassis::new();
        let mut context = selected(&chassis);
        set_sapi(&mut context, b"NodeA-Port1").expect("set");
        assert_eq!(chassis.setting(13, "trace.sapi").as_deref(), Some("NodeA-Port1"));
        assert_code(
            set_sapi(&mut context, b"ThisTraceIsTooLong"),
            ErrorCode::INVALID_TRACE,
        );
    }
}
