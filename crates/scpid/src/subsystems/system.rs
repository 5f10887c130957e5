//! Chassis-wide commands and the dictionary every instrument tree falls
//! back to.

use std::net::Ipv4Addr;
use std::str::FromStr;

use scpi_lang::ErrorCode;
use scpi_lang::numeric::parse_decimal;
use time::{Date, Month, Time};

use crate::device::{ClockKind, DeviceError};
use crate::dispatch::CommandError;
use crate::session::SessionContext;

use super::{
    Dictionary, common, execution, instrument, inventory, no_parameters, settings,
    single_parameter, text,
};

pub(super) const DICTIONARY: Dictionary = &[
    ("*CLS", common::clear_status),
    ("*ESR?", common::event_status),
    ("*IDN?", common::identify),
    ("*RST", execution::reset),
    ("*SAV", common::unsupported),
    ("*RCL", common::unsupported),
    ("ABORt", execution::abort),
    ("INITiate", execution::initiate),
    ("DELAY", common::delay),
    ("DURation?", execution::query_duration),
    ("DURation", execution::set_duration),
    ("ELAPSEdtime?", execution::elapsed),
    ("REMAINingtime?", execution::remaining),
    ("GET:PARTnumbers?", inventory::part_numbers),
    ("GET:PROTOcol?", inventory::protocols),
    ("GET:SERialnumbers?", inventory::serial_numbers),
    ("GET:VERsion?", inventory::versions),
    ("INSTrument?", instrument::query_instrument),
    ("INSTrument", instrument::select_instrument),
    ("INS_?", instrument::query_instrument),
    ("INS_", instrument::select_read_only),
    ("LICense?", inventory::query_license),
    ("LICense", inventory::install_license),
    ("TIMLIC?", inventory::license_time),
    ("PROTOCOL?", inventory::query_protocol),
    ("PROTOCOL", inventory::set_protocol),
    ("SAVEREPORT", inventory::save_report),
    ("SCPI?", common::scpi_supported),
    ("SYSTem:AUTOLOGIN:DETails", settings::autologin_details),
    ("SYSTem:AUTOLOGIN:USER?", settings::autologin_user),
    ("SYSTem:AUTOLOGIN:VALue?", settings::query_autologin),
    ("SYSTem:AUTOLOGIN:VALue", settings::set_autologin),
    ("SYSTem:CLOCK?", query_clock),
    ("SYSTem:CLOCK", set_clock),
    ("SYSTem:CLKSTATUS?", clock_status),
    ("SYSTem:DATE?", query_date),
    ("SYSTem:DATE", set_date),
    ("SYSTem:TIME?", query_time),
    ("SYSTem:TIME", set_time),
    ("SYSTem:RUNTIME?", runtime),
    ("SYSTem:VERSion?", version),
    ("SYSTem:WHOAMI?", whoami),
    ("SYSTem:OSVERSion?", os_version),
    ("SYSTem:REBOOT", reboot),
    ("SYSTem:SHUTDOWN", shutdown),
    ("SYSTem:MCHADDR?", query_mch_address),
    ("SYSTem:MCHADDR", set_mch_address),
    ("SYSTem:MCHSTATUS?", mch_status),
    ("SYSTem:DTESTUList?", test_unit_list),
    ("SYSTem:RESPonse?", settings::query_response),
    ("SYSTem:RESPonse", settings::set_response),
    ("SYSTem:LEGACYResponse?", settings::query_legacy),
    ("SYSTem:LEGACYResponse", settings::set_legacy),
    ("SYSTem:LOCK:FORCED?", settings::query_forced),
    ("SYSTem:LOCK:FORCED", settings::set_forced),
    ("SYSTem:LOCK:OWNER?", settings::lock_owner),
];

fn query_clock(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.device()?.clock()?.to_string().into_bytes())
}

fn set_clock(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let clock = ClockKind::from_str(&text(single_parameter(raw)?))
        .map_err(|_| CommandError::code(ErrorCode::SYSCFG_INVALID_CLOCK))?;
    if !ctx.device()?.supported_clocks()?.contains(&clock) {
        return Err(CommandError::code(ErrorCode::SYSCFG_CLOCK_NOT_SUPPORTED));
    }
    ctx.device_mut()?.set_clock(clock)?;
    Ok(Vec::new())
}

fn clock_status(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.device()?.clock_status()?.into_bytes())
}

fn query_date(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let date = ctx.device()?.date_time()?.date();
    Ok(format!("{}/{}/{}", u8::from(date.month()), date.day(), date.year()).into_bytes())
}

/// Splits `a<sep>b<sep>c` into three decimal fields.
fn three_fields(value: &[u8], separator: u8) -> Option<[u64; 3]> {
    let mut fields = value.split(|byte| *byte == separator).map(parse_decimal);
    let parsed = [fields.next()??, fields.next()??, fields.next()??];
    fields.next().is_none().then_some(parsed)
}

/// `SYSTem:DATE m/d/y`.
fn set_date(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let invalid = || CommandError::code(ErrorCode::SYSCFG_INVALID_DATE);
    let [month, day, year] = three_fields(single_parameter(raw)?, b'/').ok_or_else(invalid)?;
    let month = u8::try_from(month)
        .ok()
        .and_then(|month| Month::try_from(month).ok())
        .ok_or_else(invalid)?;
    let day = u8::try_from(day).map_err(|_| invalid())?;
    let year = i32::try_from(year).map_err(|_| invalid())?;
    let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;
    ctx.device_mut()?.set_date(date)?;
    Ok(Vec::new())
}

fn query_time(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let time = ctx.device()?.date_time()?.time();
    Ok(format!("{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second()).into_bytes())
}

/// `SYSTem:TIME h:m:s`.
fn set_time(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let invalid = || CommandError::code(ErrorCode::SYSCFG_INVALID_TIME);
    let fields = three_fields(single_parameter(raw)?, b':').ok_or_else(invalid)?;
    let [hour, minute, second] = fields.map(|field| u8::try_from(field).unwrap_or(u8::MAX));
    let time = Time::from_hms(hour, minute, second).map_err(|_| invalid())?;
    ctx.device_mut()?.set_time(time)?;
    Ok(Vec::new())
}

/// Seconds since the chassis booted.
fn runtime(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.device()?.runtime()?.as_secs().to_string().into_bytes())
}

fn version(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.device()?.version()?.into_bytes())
}

fn os_version(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.device()?.os_version()?.into_bytes())
}

fn whoami(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.user().as_bytes().to_vec())
}

/// Any failure other than a server exit becomes `code`.
fn or_code(result: Result<(), DeviceError>, code: ErrorCode) -> Result<Vec<u8>, CommandError> {
    match result {
        Ok(()) => Ok(Vec::new()),
        Err(DeviceError::ServerExit) => Err(DeviceError::ServerExit.into()),
        Err(_) => Err(CommandError::code(code)),
    }
}

fn reboot(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    or_code(ctx.device_mut()?.reboot(), ErrorCode::SYSCFG_REBOOT_FAILED)
}

fn shutdown(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    or_code(ctx.device_mut()?.shutdown(), ErrorCode::SYSCFG_SHUTDOWN_FAILED)
}

fn query_mch_address(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.device()?.mch_address()?.into_bytes())
}

fn set_mch_address(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let address = Ipv4Addr::from_str(&text(single_parameter(raw)?))
        .map_err(|_| CommandError::code(ErrorCode::SYSCFG_INVALID_CHASSIS_ADDRESS))?;
    ctx.device_mut()?.set_mch_address(&address.to_string())?;
    Ok(Vec::new())
}

fn mch_status(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.device()?.mch_status()?.into_bytes())
}

/// `SYSTem:DTESTUList?`: `unit=owner` for every test unit.
fn test_unit_list(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let device = ctx.device()?;
    let mut units = Vec::new();
    for entry in device.protocols()? {
        if !units.contains(&entry.test_unit) {
            units.push(entry.test_unit);
        }
    }
    let listing = units
        .into_iter()
        .map(|unit| {
            let owner = device.lock_owner(unit)?;
            Ok(format!("{unit}={}", owner.as_deref().unwrap_or("NONE")))
        })
        .collect::<Result<Vec<_>, DeviceError>>()?
        .join(",");
    Ok(listing.into_bytes())
}
