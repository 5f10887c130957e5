//! IEEE-488.2 status commands and other stateless helpers.

use std::thread;
use std::time::Duration;

use scpi_lang::ErrorCode;
use scpi_lang::numeric::parse_decimal;

use crate::dispatch::CommandError;
use crate::session::SessionContext;

use super::{no_parameters, single_parameter};

/// Event status register bit reported while errors are queued.
const ESR_ERROR_BIT: u8 = 0x20;

pub(super) fn clear_status(_ctx: &mut SessionContext, _raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    Ok(b"0".to_vec())
}

pub(super) fn event_status(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let register = if ctx.errors().is_empty() {
        0
    } else {
        ESR_ERROR_BIT
    };
    Ok(format!("#B{register:b}").into_bytes())
}

pub(super) fn identify(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let identity = ctx.device()?.identity()?;
    Ok(format!(
        "{},{},{},{}",
        identity.company, identity.product, identity.serial, identity.feature_set
    )
    .into_bytes())
}

/// `*SAV` and `*RCL`; the chassis keeps no numbered setting slots.
pub(super) fn unsupported(_ctx: &mut SessionContext, _raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    Err(CommandError::code(ErrorCode::CMD_ERR))
}

pub(super) fn scpi_supported(_ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(b"YES".to_vec())
}

/// `DELAY <ms>` blocks this session only.
pub(super) fn delay(_ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let millis = parse_decimal(single_parameter(raw)?)
        .ok_or_else(|| CommandError::code(ErrorCode::NUMERIC_DATA_ERR))?;
    thread::sleep(Duration::from_millis(millis));
    Ok(Vec::new())
}
