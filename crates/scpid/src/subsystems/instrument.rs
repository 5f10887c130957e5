//! Instrument selection and the test-unit lock that comes with it.
//!
//! An instrument address is read from the end of the parameter list: the
//! instrument name is always last and may be preceded by `slot`, `slot port`
//! or `chassis slot port`. Omitted slot and port match anything, so the first
//! inventory entry satisfying every given filter wins.

use scpi_lang::numeric::parse_decimal;
use scpi_lang::{ErrorCode, parameters};
use tracing::debug;

use crate::device::{CardType, Device, ProtocolEntry, ProtocolType};
use crate::dispatch::CommandError;
use crate::session::{SESSION_TARGET, Selection, SessionContext};

use super::{no_parameters, upper};

const LOCKED_WARNING: &[u8] = b"Test unit is locked. Only read commands may be performed.";
const READ_ONLY_NOTICE: &[u8] = b"Only read commands may be performed.";
const NO_SELECTION: &str = "NONE";

struct InstrumentName {
    symbol: &'static str,
    cards: &'static [CardType],
    protocol: ProtocolType,
}

const MPM_100: &[CardType] = &[CardType::Mpm100G, CardType::Mpm100Ar];
const MPM_10: &[CardType] = &[CardType::Mpm10G];
const MPM_400: &[CardType] = &[CardType::Mpm400G, CardType::Mpm400Ar, CardType::Mpm400Dco];
const MPM_600: &[CardType] = &[CardType::Mpm600G];

const INSTRUMENTS: &[InstrumentName] = &[
    instrument("MPM100MLD", MPM_100, ProtocolType::Phy),
    instrument("MPM100OTN", MPM_100, ProtocolType::Otn),
    instrument("MPM100ETH", MPM_100, ProtocolType::Packet),
    instrument("MPM10GPHY", MPM_10, ProtocolType::Phy),
    instrument("MPM10GSONET", MPM_10, ProtocolType::SonetSdh),
    instrument("MPM10GOTN", MPM_10, ProtocolType::Otn),
    instrument("MPM10GETH", MPM_10, ProtocolType::Packet),
    instrument("MPM400MLD", MPM_400, ProtocolType::Phy),
    instrument("MPM400OTN", MPM_400, ProtocolType::Otn),
    instrument("MPM400ETH", MPM_400, ProtocolType::Packet),
    instrument("MPM600MLD", MPM_600, ProtocolType::Phy),
    instrument("MPM600OTN", MPM_600, ProtocolType::Otn),
    instrument("MPM600ETH", MPM_600, ProtocolType::Packet),
];

const fn instrument(
    symbol: &'static str,
    cards: &'static [CardType],
    protocol: ProtocolType,
) -> InstrumentName {
    InstrumentName {
        symbol,
        cards,
        protocol,
    }
}

/// True for the single parameter `NONE`.
pub(super) fn is_none(params: &[&[u8]]) -> bool {
    matches!(params, [only] if only.eq_ignore_ascii_case(NO_SELECTION.as_bytes()))
}

/// Resolves an instrument address against the chassis inventory.
pub(super) fn resolve(device: &dyn Device, params: &[&[u8]]) -> Result<Selection, CommandError> {
    let (chassis, slot, port, name) = match params {
        [] => return Err(CommandError::code(ErrorCode::MISSING_PARAMETER)),
        [name] => (None, None, None, *name),
        [slot, name] => (None, Some(*slot), None, *name),
        [slot, port, name] => (None, Some(*slot), Some(*port), *name),
        [chassis, slot, port, name] => (Some(*chassis), Some(*slot), Some(*port), *name),
        _ => return Err(CommandError::code(ErrorCode::PARAMETER_NOT_ALLOWED)),
    };
    if let Some(chassis) = chassis
        && parse_decimal(chassis) != Some(0)
    {
        return Err(CommandError::code(ErrorCode::PROTMGR_INVALID_CHASSIS));
    }
    let slot = parse_filter(slot, ErrorCode::PROTMGR_INVALID_SLOT)?;
    let port = parse_filter(port, ErrorCode::PROTMGR_INVALID_PORT)?;
    let wanted = upper(name);
    let instrument = INSTRUMENTS
        .iter()
        .find(|candidate| candidate.symbol == wanted)
        .ok_or_else(|| CommandError::code(ErrorCode::PROTMGR_INVALID_INSTRUMENT))?;

    let entry = device
        .protocols()?
        .into_iter()
        .find(|entry| matches_filters(entry, instrument, slot, port))
        .ok_or_else(|| CommandError::code(ErrorCode::PROTMGR_INSTRUMENT_NOT_FOUND))?;
    Ok(Selection {
        name: instrument.symbol,
        entry,
    })
}

fn parse_filter(token: Option<&[u8]>, code: ErrorCode) -> Result<Option<u32>, CommandError> {
    token
        .map(|token| {
            parse_decimal(token)
                .and_then(|value| u32::try_from(value).ok())
                .ok_or_else(|| CommandError::code(code))
        })
        .transpose()
}

fn matches_filters(
    entry: &ProtocolEntry,
    instrument: &InstrumentName,
    slot: Option<u32>,
    port: Option<u32>,
) -> bool {
    entry.protocol == instrument.protocol
        && instrument.cards.contains(&entry.card)
        && slot.is_none_or(|slot| slot == entry.slot)
        && port.is_none_or(|port| port == entry.port)
}

/// Drops the selection and any lock held for it.
pub(super) fn release_selection(ctx: &mut SessionContext) {
    ctx.set_lock(None);
    ctx.set_selection(None);
    debug!(target: SESSION_TARGET, session = ctx.session_id(), "instrument deselected");
}

/// Installs `selection`, releasing the held lock when the test unit changes.
fn switch_selection(ctx: &mut SessionContext, selection: Selection) {
    let unit = selection.test_unit();
    if ctx.held_lock().is_some_and(|lock| lock.unit() != unit) {
        ctx.set_lock(None);
    }
    debug!(
        target: SESSION_TARGET,
        session = ctx.session_id(),
        instrument = selection.name,
        slot = selection.entry.slot,
        unit,
        "instrument selected"
    );
    ctx.set_selection(Some(selection));
}

fn describe(ctx: &SessionContext) -> Vec<u8> {
    ctx.selection()
        .map_or_else(
            || NO_SELECTION.to_owned(),
            |selection| {
                format!(
                    "{},{},{},{}",
                    selection.entry.chassis, selection.entry.slot, selection.entry.port, selection.name
                )
            },
        )
        .into_bytes()
}

pub(super) fn query_instrument(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(describe(ctx))
}

/// `INSTrument`: select and lock.
pub(super) fn select_instrument(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let params = parameters(raw);
    if is_none(&params) {
        release_selection(ctx);
        return Ok(Vec::new());
    }
    let selection = resolve(ctx.device()?, &params)?;
    let unit = selection.test_unit();
    switch_selection(ctx, selection);
    if ctx.holds_selected_lock() {
        return Ok(Vec::new());
    }
    let force = ctx.flags().force_lock;
    match ctx.device_mut()?.lock_test_unit(unit, force)? {
        Some(lock) => {
            ctx.set_lock(Some(lock));
            Ok(Vec::new())
        }
        None => Ok(LOCKED_WARNING.to_vec()),
    }
}

/// `INS_`: select without locking.
pub(super) fn select_read_only(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    let params = parameters(raw);
    if is_none(&params) {
        release_selection(ctx);
    } else {
        let selection = resolve(ctx.device()?, &params)?;
        switch_selection(ctx, selection);
    }
    Ok(READ_ONLY_NOTICE.to_vec())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::device::SimulatedChassis;

    use super::super::fixtures::{assert_code, logged_in, text};
    use super::*;

    #[rstest]
    #[case(b"MPM100MLD" as &[u8], "0,1,1,MPM100MLD")]
    #[case(b"mpm10gsonet", "0,2,1,MPM10GSONET")]
    #[case(b"3 MPM400ETH", "0,3,1,MPM400ETH")]
    #[case(b"2 1 MPM10GOTN", "0,2,1,MPM10GOTN")]
    #[case(b"0,1,1,MPM100OTN", "0,1,1,MPM100OTN")]
    fn selection_resolves_addresses(#[case] raw: &[u8], #[case] expected: &str) {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        assert!(select_instrument(&mut context, raw).expect("select").is_empty());
        assert_eq!(text(query_instrument(&mut context, b"")), expected);
        assert!(context.holds_selected_lock());
    }

    #[rstest]
    #[case(b"" as &[u8], ErrorCode::MISSING_PARAMETER)]
    #[case(b"0 1 1 1 MPM100MLD", ErrorCode::PARAMETER_NOT_ALLOWED)]
    #[case(b"1 1 1 MPM100MLD", ErrorCode::PROTMGR_INVALID_CHASSIS)]
    #[case(b"X 1 MPM100MLD", ErrorCode::PROTMGR_INVALID_SLOT)]
    #[case(b"1 Y MPM100MLD", ErrorCode::PROTMGR_INVALID_PORT)]
    #[case(b"MPM999", ErrorCode::PROTMGR_INVALID_INSTRUMENT)]
    #[case(b"MPM600MLD", ErrorCode::PROTMGR_INSTRUMENT_NOT_FOUND)]
    #[case(b"2 MPM100MLD", ErrorCode::PROTMGR_INSTRUMENT_NOT_FOUND)]
    fn bad_addresses_fail_with_specific_codes(#[case] raw: &[u8], #[case] expected: ErrorCode) {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        assert_code(select_instrument(&mut context, raw), expected);
    }

    #[test]
    fn none_clears_the_selection_and_releases_the_lock() {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        select_instrument(&mut context, b"MPM100MLD").expect("select");
        assert_eq!(chassis.lock_holder(1).as_deref(), Some("admin"));

        select_instrument(&mut context, b"none").expect("deselect");
        assert_eq!(text(query_instrument(&mut context, b"")), "NONE");
        assert_eq!(chassis.lock_holder(1), None);
    }

    #[test]
    fn foreign_lock_leaves_the_session_read_only() {
        let chassis = SimulatedChassis::new();
        chassis.hold_lock(2, "operator");
        let mut context = logged_in(&chassis);
        let response = text(select_instrument(&mut context, b"MPM10GPHY"));
        assert_eq!(
            response,
            "Test unit is locked. Only read commands may be performed."
        );
        assert!(!context.holds_selected_lock());
        assert_eq!(context.protocol_type(), ProtocolType::Phy);
    }

    #[test]
    fn forced_lock_takes_over_foreign_locks() {
        let chassis = SimulatedChassis::new();
        chassis.hold_lock(2, "operator");
        let mut context = logged_in(&chassis);
        context.flags_mut().force_lock = true;
        assert!(select_instrument(&mut context, b"MPM10GPHY").expect("select").is_empty());
        assert_eq!(chassis.lock_holder(2).as_deref(), Some("admin"));
    }

    #[test]
    fn switching_units_releases_the_previous_lock() {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        select_instrument(&mut context, b"MPM100MLD").expect("select");
        select_instrument(&mut context, b"MPM10GETH").expect("select");
        assert_eq!(chassis.lock_holder(1), None);
        assert_eq!(chassis.lock_holder(2).as_deref(), Some("admin"));
    }

    #[test]
    fn same_unit_keeps_its_lock_across_layers() {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        select_instrument(&mut context, b"MPM100MLD").expect("select");
        select_read_only(&mut context, b"MPM100OTN").expect("select");
        assert!(context.holds_selected_lock());
        assert_eq!(context.protocol_type(), ProtocolType::Otn);
    }

    #[test]
    fn read_only_selection_never_locks() {
        let chassis = SimulatedChassis::new();
        let mut context = logged_in(&chassis);
        let response = text(select_read_only(&mut context, b"MPM400MLD"));
        assert_eq!(response, "Only read commands may be performed.");
        assert_eq!(chassis.lock_holder(3), None);
        assert_eq!(text(query_instrument(&mut context, b"")), "0,3,1,MPM400MLD");
    }
}
