//! SONET/SDH commands: line rate and section trace.

use scpi_lang::ErrorCode;

use crate::device::LayerKind;
use crate::dispatch::CommandError;
use crate::session::SessionContext;

use super::{
    Dictionary, no_parameters, read_setting, single_parameter, trace_text, upper, write_setting,
};

pub(super) const DICTIONARY: Dictionary = &[
    ("RATE?", query_rate),
    ("RATE", set_rate),
    ("SECTion:TRACe?", query_section_trace),
    ("SECTion:TRACe", set_section_trace),
];

const LINE_RATES: &[&str] = &[
    "OC3", "OC12", "OC48", "OC192", "STM1", "STM4", "STM16", "STM64",
];

fn query_rate(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    read_setting(ctx, LayerKind::SonetSdh, "rate")
}

fn set_rate(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let rate = upper(single_parameter(raw)?);
    if !LINE_RATES.contains(&rate.as_str()) {
        return Err(CommandError::code(ErrorCode::INVALID_RATE));
    }
    write_setting(ctx, LayerKind::SonetSdh, "rate", &rate)
}

fn query_section_trace(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    read_setting(ctx, LayerKind::SonetSdh, "section.trace")
}

fn set_section_trace(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let trace = trace_text(single_parameter(raw)?)?;
    write_setting(ctx, LayerKind::SonetSdh, "section.trace", &trace)
}
