//! Test execution: factory reset, start and stop, and the test clock.

use std::str::FromStr;
use std::thread;

use scpi_lang::numeric::parse_decimal;
use scpi_lang::{ErrorCode, parameters};
use tracing::warn;

use crate::device::{Device, DeviceError, ProtocolMode, TestDuration, TestUnitId};
use crate::dispatch::{CommandError, DISPATCH_TARGET};
use crate::session::SessionContext;

use super::instrument::resolve;
use super::{no_parameters, selected_unit, single_parameter, text, upper, writable_device};

const ALL_UNITS: &[u8] = b"ALL";

type UnitAction = fn(&mut dyn Device, TestUnitId) -> Result<(), DeviceError>;

/// Test units this session may act on: unlocked ones and its own.
fn available_units(ctx: &SessionContext) -> Result<Vec<TestUnitId>, CommandError> {
    let device = ctx.device()?;
    let mut units: Vec<TestUnitId> = Vec::new();
    for entry in device.protocols()? {
        if units.contains(&entry.test_unit) {
            continue;
        }
        let owner = device.lock_owner(entry.test_unit)?;
        if owner.is_none_or(|owner| owner == ctx.user()) {
            units.push(entry.test_unit);
        }
    }
    Ok(units)
}

fn parse_mode(token: &[u8]) -> Result<ProtocolMode, CommandError> {
    ProtocolMode::from_str(&text(token))
        .map_err(|_| CommandError::code(ErrorCode::SYSCFG_INVALID_PROTOCOL_MODE))
}

/// `*RST [mode]`.
pub(super) fn reset(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let mode = match parameters(raw).as_slice() {
        [] => None,
        [mode] => Some(parse_mode(mode)?),
        _ => return Err(CommandError::code(ErrorCode::PARAMETER_NOT_ALLOWED)),
    };
    let units = match ctx.selection() {
        Some(selection) if ctx.holds_selected_lock() => vec![selection.test_unit()],
        Some(_) => return Err(CommandError::code(ErrorCode::COMMON_INVALID_MODE)),
        None => available_units(ctx)?,
    };
    let device = ctx.device_mut()?;
    for unit in units {
        device.reset_test_unit(unit)?;
    }
    thread::sleep(ctx.settle().reset);
    let device = ctx.device_mut()?;
    if let Some(mode) = mode {
        device.set_protocol_mode(mode)?;
    }
    Ok(device.protocol_mode()?.to_string().into_bytes())
}

fn restart(device: &mut dyn Device, unit: TestUnitId) -> Result<(), DeviceError> {
    device.restart_test_unit(unit)
}

fn stop(device: &mut dyn Device, unit: TestUnitId) -> Result<(), DeviceError> {
    device.stop_test_unit(unit)
}

pub(super) fn initiate(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    apply_to_units(ctx, raw, "initiate", restart)
}

pub(super) fn abort(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    apply_to_units(ctx, raw, "abort", stop)
}

/// Shared body of `INITiate` and `ABORt`.
///
/// `ALL` is best effort: failures are logged and skipped, then the session
/// waits once for the whole batch to settle.
fn apply_to_units(
    ctx: &mut SessionContext,
    raw: &[u8],
    verb: &'static str,
    action: UnitAction,
) -> Result<Vec<u8>, CommandError> {
    let params = parameters(raw);
    match params.as_slice() {
        [] => {
            let unit = selected_unit(ctx)?;
            if !ctx.holds_selected_lock() {
                return Err(CommandError::code(ErrorCode::PROTMGR_TEST_UNIT_NOT_LOCKED));
            }
            action(ctx.device_mut()?, unit)?;
        }
        [all] if all.eq_ignore_ascii_case(ALL_UNITS) => {
            let units = available_units(ctx)?;
            let device = ctx.device_mut()?;
            for unit in units {
                if let Err(error) = action(device, unit) {
                    warn!(target: DISPATCH_TARGET, verb, unit, %error, "skipping test unit");
                }
            }
            thread::sleep(ctx.settle().batch);
        }
        address => {
            let unit = resolve(ctx.device()?, address)?.test_unit();
            let owner = ctx.device()?.lock_owner(unit)?;
            if owner.is_some_and(|owner| owner != ctx.user()) {
                return Err(CommandError::code(ErrorCode::PROTMGR_TEST_UNIT_LOCKED));
            }
            action(ctx.device_mut()?, unit)?;
        }
    }
    Ok(Vec::new())
}

pub(super) fn query_duration(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let unit = selected_unit(ctx)?;
    Ok(ctx.device()?.duration(unit)?.to_string().into_bytes())
}

pub(super) fn set_duration(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let value = single_parameter(raw)?;
    let unit = selected_unit(ctx)?;
    let duration = if upper(value) == "CONTINUOUS" {
        TestDuration::Continuous
    } else {
        let minutes = parse_decimal(value)
            .ok_or_else(|| CommandError::code(ErrorCode::ILLEGAL_PARAMETER_VALUE))?;
        match u32::try_from(minutes) {
            Ok(minutes) if minutes > 0 => TestDuration::Minutes(minutes),
            _ => return Err(CommandError::code(ErrorCode::DATA_OUT_OF_RANGE)),
        }
    };
    writable_device(ctx)?.set_duration(unit, duration)?;
    Ok(Vec::new())
}

/// Seconds since the selected test started.
pub(super) fn elapsed(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let unit = selected_unit(ctx)?;
    Ok(ctx.device()?.elapsed(unit)?.as_secs().to_string().into_bytes())
}

/// Seconds left on the selected test, or `CONTINUOUS`.
pub(super) fn remaining(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let unit = selected_unit(ctx)?;
    let rendered = match ctx.device()?.remaining(unit)? {
        Some(left) => left.as_secs().to_string(),
        None => TestDuration::Continuous.to_string(),
    };
    Ok(rendered.into_bytes())
}
