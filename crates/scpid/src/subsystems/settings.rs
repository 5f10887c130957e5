//! Per-session response flags, lock policy and auto-login settings.
//!
//! `DEFAULT_*` values update the session and also persist as the user's
//! defaults on the device, so the next login starts with them.

use scpi_lang::ErrorCode;
use tracing::warn;

use crate::dispatch::{CommandError, DISPATCH_TARGET};
use crate::session::{AutoLoginSettings, SessionContext};

use super::{no_parameters, parameters_exact, selected_unit, single_parameter, text, upper};

/// Parsed value of a two-state setting that may also persist as a default.
struct Toggle {
    enabled: bool,
    persist: bool,
}

fn parse_toggle(value: &[u8], on: &str, off: &str) -> Result<Toggle, CommandError> {
    let value = upper(value);
    let (setting, persist) = match value.strip_prefix("DEFAULT_") {
        Some(setting) => (setting, true),
        None => (value.as_str(), false),
    };
    let enabled = if setting == on {
        true
    } else if setting == off {
        false
    } else {
        return Err(CommandError::code(ErrorCode::ILLEGAL_PARAMETER_VALUE));
    };
    Ok(Toggle { enabled, persist })
}

fn parse_bool(value: &[u8]) -> Result<bool, CommandError> {
    match upper(value).as_str() {
        "TRUE" | "ON" | "1" => Ok(true),
        "FALSE" | "OFF" | "0" => Ok(false),
        _ => Err(CommandError::code(ErrorCode::ILLEGAL_PARAMETER_VALUE)),
    }
}

fn render_bool(value: bool) -> Vec<u8> {
    if value { b"TRUE".to_vec() } else { b"FALSE".to_vec() }
}

/// Writes the session's current flags back as the user's device defaults.
fn persist_defaults(ctx: &mut SessionContext) -> Result<(), CommandError> {
    let flags = ctx.flags();
    let device = ctx.device_mut()?;
    let mut defaults = device.defaults()?;
    defaults.respond_always = flags.respond_always;
    defaults.force_lock = flags.force_lock;
    device.store_defaults(defaults)?;
    Ok(())
}

pub(super) fn query_response(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let mode: &[u8] = if ctx.flags().respond_always {
        b"ALWAYS"
    } else {
        b"STANDARD"
    };
    Ok(mode.to_vec())
}

pub(super) fn set_response(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let toggle = parse_toggle(single_parameter(raw)?, "ALWAYS", "STANDARD")?;
    ctx.flags_mut().respond_always = toggle.enabled;
    if toggle.persist {
        persist_defaults(ctx)?;
    }
    Ok(Vec::new())
}

pub(super) fn query_legacy(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(render_bool(ctx.flags().legacy_response))
}

pub(super) fn set_legacy(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    ctx.flags_mut().legacy_response = parse_bool(single_parameter(raw)?)?;
    Ok(Vec::new())
}

pub(super) fn query_forced(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let state: &[u8] = if ctx.flags().force_lock { b"ON" } else { b"OFF" };
    Ok(state.to_vec())
}

pub(super) fn set_forced(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let toggle = parse_toggle(single_parameter(raw)?, "ON", "OFF")?;
    ctx.flags_mut().force_lock = toggle.enabled;
    if toggle.persist {
        persist_defaults(ctx)?;
    }
    Ok(Vec::new())
}

/// `SYSTem:LOCK:OWNER?`: holder of the selected unit's lock, or `NONE`.
pub(super) fn lock_owner(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let unit = selected_unit(ctx)?;
    let owner = ctx.device()?.lock_owner(unit)?;
    Ok(owner.unwrap_or_else(|| "NONE".to_owned()).into_bytes())
}

pub(super) fn autologin_details(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let [username, password] = parameters_exact::<2>(raw)?;
    let settings = AutoLoginSettings {
        username: text(username),
        password: text(password),
        ..ctx.autologin().clone()
    };
    store(ctx, settings)
}

pub(super) fn autologin_user(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.autologin().username.clone().into_bytes())
}

pub(super) fn query_autologin(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(render_bool(ctx.autologin().enabled))
}

pub(super) fn set_autologin(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let enabled = parse_bool(single_parameter(raw)?)?;
    let settings = AutoLoginSettings {
        enabled,
        ..ctx.autologin().clone()
    };
    store(ctx, settings)
}

fn store(ctx: &mut SessionContext, settings: AutoLoginSettings) -> Result<Vec<u8>, CommandError> {
    ctx.store_autologin(settings).map_err(|error| {
        warn!(target: DISPATCH_TARGET, %error, "auto-login settings not saved");
        CommandError::code(ErrorCode::EXECUTION_ERR)
    })?;
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use crate::device::{DeviceConnector, SimulatedChassis};
    use crate::session::{AutoLoginStore, SessionSettings, SettleDelays};

    use super::super::Handler;
    use super::super::fixtures::{assert_code, logged_in, text};
    use super::super::instrument::select_instrument;
    use super::*;

    #[rstest]
    #[case(b"ALWAYS" as &[u8], "ALWAYS")]
    #[case(b"standard", "STANDARD")]
    fn response_mode_round_trips(#[case] raw: &[u8], #[case] expected: &str) {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        set_response(&mut context, raw).expect("set");
        assert_eq!(text(query_response(&mut context, b"")), expected);
    }

    #[rstest]
    #[case(b"TRUE" as &[u8], "TRUE")]
    #[case(b"false", "FALSE")]
    fn legacy_flag_round_trips(#[case] raw: &[u8], #[case] expected: &str) {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        set_legacy(&mut context, raw).expect("set");
        assert_eq!(text(query_legacy(&mut context, b"")), expected);
    }

    #[test]
    fn default_variants_persist_on_the_device() {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        set_response(&mut context, b"DEFAULT_ALWAYS").expect("set");
        set_forced(&mut context, b"DEFAULT_ON").expect("set");

        let next = logged_in(&chassis);
        assert!(next.flags().respond_always);
        assert!(next.flags().force_lock);
    }

    #[test]
    fn plain_variants_stay_in_the_session() {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        set_forced(&mut context, b"ON").expect("set");
        assert_eq!(text(query_forced(&mut context, b"")), "ON");
        assert!(!logged_in(&chassis).flags().force_lock);
    }

    #[rstest]
    #[case(set_response as Handler, b"SOMETIMES" as &[u8])]
    #[case(set_forced, b"DEFAULT_MAYBE")]
    #[case(set_legacy, b"2")]
    fn unknown_toggle_values_are_illegal(#[case] handler: Handler, #[case] raw: &[u8]) {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        assert_code(handler(&mut context, raw), ErrorCode::ILLEGAL_PARAMETER_VALUE);
    }

    #[test]
    fn lock_owner_reports_the_holder() {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        assert_code(lock_owner(&mut context, b""), ErrorCode::PROTMGR_INVALID_PP_MODE);
        select_instrument(&mut context, b"MPM100MLD").expect("select");
        assert_eq!(text(lock_owner(&mut context, b"")), "admin");
    }

    #[test]
    fn autologin_settings_persist_across_sessions() {
        let dir = TempDir::new().expect("temp dir");
        let store = AutoLoginStore::at(dir.path().join("autologin.blob"));
        let settings = || SessionSettings {
            transport: "tcp",
            device_address: "127.0.0.1".to_owned(),
            autologin: store.clone(),
            settle: SettleDelays::none(),
        };
        let chassis = SimulatedChassis::new();
        let mut context = SessionContext::new(1, settings());
        let device = chassis
            .connect("127.0.0.1", "admin", "secret")
            .expect("connect");
        context.attach(device, Default::default());

        autologin_details(&mut context, b"admin secret").expect("details");
        set_autologin(&mut context, b"TRUE").expect("enable");
        assert_eq!(text(autologin_user(&mut context, b"")), "admin");

        let next = SessionContext::new(2, settings());
        assert!(next.autologin().enabled);
        assert_eq!(next.autologin().password, "secret");
    }

    #[test]
    fn autologin_details_need_both_credentials() {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        assert_code(
            autologin_details(&mut context, b"admin"),
            ErrorCode::MISSING_PARAMETER,
        );
    }
}
