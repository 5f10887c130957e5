//! Card inventory, licensing, protocol mode and report export.

use std::str::FromStr;

use scpi_lang::numeric::parse_decimal;
use scpi_lang::{ErrorCode, parameters};

use crate::device::{CardInfo, DeviceError, ProtocolMode};
use crate::dispatch::CommandError;
use crate::session::SessionContext;

use super::{no_parameters, single_parameter, text};

fn card_listing(
    ctx: &SessionContext,
    raw: &[u8],
    field: fn(&CardInfo) -> String,
) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let listing = ctx
        .device()?
        .cards()?
        .iter()
        .map(|card| format!("{}={}", card.card, field(card)))
        .collect::<Vec<_>>()
        .join(",");
    Ok(listing.into_bytes())
}

pub(super) fn part_numbers(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    card_listing(ctx, raw, |card| card.part_number.clone())
}

pub(super) fn serial_numbers(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    card_listing(ctx, raw, |card| card.serial_number.clone())
}

pub(super) fn versions(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    card_listing(ctx, raw, |card| card.version.clone())
}

/// `GET:PROTOcol?`: one `CARD=PROTOCOL` token per protocol processor.
pub(super) fn protocols(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let listing = ctx
        .device()?
        .protocols()?
        .iter()
        .map(|entry| format!("{}={}", entry.card, entry.protocol))
        .collect::<Vec<_>>()
        .join(",");
    Ok(listing.into_bytes())
}

pub(super) fn query_license(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.device()?.license()?.into_bytes())
}

pub(super) fn install_license(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let key = text(single_parameter(raw)?);
    ctx.device_mut()?.install_license(&key)?;
    Ok(Vec::new())
}

/// `TIMLIC?`: seconds left on a timed licence, `0` for a perpetual one.
pub(super) fn license_time(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let remaining = ctx.device()?.license_time_remaining()?;
    Ok(remaining
        .map_or(0, |left| left.as_secs())
        .to_string()
        .into_bytes())
}

pub(super) fn query_protocol(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.device()?.protocol_mode()?.to_string().into_bytes())
}

pub(super) fn set_protocol(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let mode = ProtocolMode::from_str(&text(single_parameter(raw)?))
        .map_err(|_| CommandError::code(ErrorCode::SYSCFG_INVALID_PROTOCOL_MODE))?;
    ctx.device_mut()?.set_protocol_mode(mode)?;
    Ok(Vec::new())
}

/// `SAVEREPORT [chassis] <slot> <port> <file>`.
pub(super) fn save_report(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let params = parameters(raw);
    let (slot, port, file) = match params.as_slice() {
        [slot, port, file] => (*slot, *port, *file),
        [chassis, slot, port, file] => {
            if parse_decimal(chassis) != Some(0) {
                return Err(CommandError::code(ErrorCode::PROTMGR_INVALID_CHASSIS));
            }
            (*slot, *port, *file)
        }
        [] | [_] | [_, _] => return Err(CommandError::code(ErrorCode::MISSING_PARAMETER)),
        _ => return Err(CommandError::code(ErrorCode::PARAMETER_NOT_ALLOWED)),
    };
    let slot = parse_index(slot, ErrorCode::PROTMGR_INVALID_SLOT)?;
    let port = parse_index(port, ErrorCode::PROTMGR_INVALID_PORT)?;
    let file = text(file);
    match ctx.device_mut()?.save_report(slot, port, &file) {
        Ok(()) => Ok(Vec::new()),
        Err(DeviceError::ServerExit) => Err(DeviceError::ServerExit.into()),
        Err(_) => Err(CommandError::code(ErrorCode::DATAMGR_REPORT_FAILED)),
    }
}

fn parse_index(token: &[u8], code: ErrorCode) -> Result<u32, CommandError> {
    parse_decimal(token)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| CommandError::code(code))
}
