//! Command dictionaries and the trees compiled from them.
//!
//! Each subsystem owns a static dictionary of `(canonical command, handler)`
//! pairs. Within a dictionary queries come before their setters and, where
//! two commands share a prefix, the longer one comes first. The dictionaries
//! are compiled once into [`CommandTrees`] and shared read-only by every
//! session.

mod common;
mod errors;
mod execution;
mod instrument;
mod inventory;
mod otn;
mod packet;
mod phy;
mod settings;
mod sonet;
mod system;

use std::cmp::Ordering;

use scpi_lang::{CommandTree, ErrorCode, TreeBuildError, parameters};

use crate::device::{Device, LayerHandle, LayerKind, ProtocolType, TestUnitId};
use crate::dispatch::CommandError;
use crate::session::SessionContext;

/// Signature shared by every command handler.
pub type Handler = fn(&mut SessionContext, &[u8]) -> Result<Vec<u8>, CommandError>;

type Dictionary = &'static [(&'static str, Handler)];

const MAX_TRACE_LEN: usize = 15;

/// Every command tree the dispatcher searches.
#[derive(Debug)]
pub struct CommandTrees {
    session: CommandTree<Handler>,
    system: CommandTree<Handler>,
    phy: CommandTree<Handler>,
    otn: CommandTree<Handler>,
    sonet: CommandTree<Handler>,
    packet: CommandTree<Handler>,
}

impl CommandTrees {
    /// Compiles every dictionary.
    ///
    /// # Errors
    ///
    /// Fails when a dictionary terminates two commands at the same path.
    pub fn build() -> Result<Self, TreeBuildError> {
        Ok(Self {
            session: CommandTree::build(errors::DICTIONARY)?,
            system: CommandTree::build(system::DICTIONARY)?,
            phy: CommandTree::build(phy::DICTIONARY)?,
            otn: CommandTree::build(otn::DICTIONARY)?,
            sonet: CommandTree::build(sonet::DICTIONARY)?,
            packet: CommandTree::build(packet::DICTIONARY)?,
        })
    }

    /// Commands that work without a device handle.
    #[must_use]
    pub fn session(&self) -> &CommandTree<Handler> {
        &self.session
    }

    /// Chassis-wide commands, consulted after the instrument's own tree.
    #[must_use]
    pub fn system(&self) -> &CommandTree<Handler> {
        &self.system
    }

    /// Tree for the selected protocol family, if it has one.
    #[must_use]
    pub fn instrument(&self, protocol: ProtocolType) -> Option<&CommandTree<Handler>> {
        match protocol {
            ProtocolType::None => None,
            ProtocolType::Phy => Some(&self.phy),
            ProtocolType::Otn => Some(&self.otn),
            ProtocolType::SonetSdh => Some(&self.sonet),
            ProtocolType::Packet => Some(&self.packet),
        }
    }
}

/// First parameter, or `-109` when there is none.
fn required_parameter(raw: &[u8]) -> Result<&[u8], CommandError> {
    parameters(raw)
        .first()
        .copied()
        .ok_or_else(|| CommandError::code(ErrorCode::MISSING_PARAMETER))
}

/// Exactly one parameter.
fn single_parameter(raw: &[u8]) -> Result<&[u8], CommandError> {
    let params = parameters(raw);
    match params.as_slice() {
        [] => Err(CommandError::code(ErrorCode::MISSING_PARAMETER)),
        [value] => Ok(value),
        _ => Err(CommandError::code(ErrorCode::PARAMETER_NOT_ALLOWED)),
    }
}

/// Exactly `N` parameters.
fn parameters_exact<const N: usize>(raw: &[u8]) -> Result<[&[u8]; N], CommandError> {
    let params = parameters(raw);
    match params.len().cmp(&N) {
        Ordering::Less => Err(CommandError::code(ErrorCode::MISSING_PARAMETER)),
        Ordering::Greater => Err(CommandError::code(ErrorCode::PARAMETER_NOT_ALLOWED)),
        Ordering::Equal => params
            .try_into()
            .map_err(|_| CommandError::unexpected("parameter count changed while splitting")),
    }
}

/// Rejects any parameter on commands that take none.
fn no_parameters(raw: &[u8]) -> Result<(), CommandError> {
    if parameters(raw).is_empty() {
        Ok(())
    } else {
        Err(CommandError::code(ErrorCode::PARAMETER_NOT_ALLOWED))
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn upper(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_ascii_uppercase()
}

/// Test unit of the current selection; `+508` when nothing is selected.
fn selected_unit(ctx: &SessionContext) -> Result<TestUnitId, CommandError> {
    ctx.selection()
        .map(crate::session::Selection::test_unit)
        .ok_or_else(|| CommandError::code(ErrorCode::PROTMGR_INVALID_PP_MODE))
}

/// Selected layer of `kind`; `+508` when the selection lacks it.
fn selected_layer(ctx: &SessionContext, kind: LayerKind) -> Result<LayerHandle, CommandError> {
    ctx.selection()
        .and_then(|selection| selection.layer(kind))
        .ok_or_else(|| CommandError::code(ErrorCode::PROTMGR_INVALID_PP_MODE))
}

/// Device handle for a write to the selected unit; `-203` without its lock.
fn writable_device(ctx: &mut SessionContext) -> Result<&mut (dyn Device + 'static), CommandError> {
    selected_unit(ctx)?;
    if !ctx.holds_selected_lock() {
        return Err(CommandError::code(ErrorCode::COMMAND_PROTECTED));
    }
    ctx.device_mut()
}

fn read_setting(ctx: &SessionContext, kind: LayerKind, key: &str) -> Result<Vec<u8>, CommandError> {
    let layer = selected_layer(ctx, kind)?;
    Ok(ctx.device()?.read_setting(layer, key)?.into_bytes())
}

fn write_setting(
    ctx: &mut SessionContext,
    kind: LayerKind,
    key: &str,
    value: &str,
) -> Result<Vec<u8>, CommandError> {
    let layer = selected_layer(ctx, kind)?;
    writable_device(ctx)?.write_setting(layer, key, value)?;
    Ok(Vec::new())
}

/// Trace identifiers are at most 15 printable ASCII characters.
fn trace_text(value: &[u8]) -> Result<String, CommandError> {
    if value.len() <= MAX_TRACE_LEN && value.iter().all(|byte| byte.is_ascii_graphic()) {
        Ok(text(value))
    } else {
        Err(CommandError::code(ErrorCode::INVALID_TRACE))
    }
}

fn on_off(value: &[u8]) -> Result<&'static str, CommandError> {
    match upper(value).as_str() {
        "ON" | "1" => Ok("ON"),
        "OFF" | "0" => Ok("OFF"),
        _ => Err(CommandError::code(ErrorCode::ILLEGAL_PARAMETER_VALUE)),
    }
}

#[cfg(test)]
mod fixtures {
    //! Session contexts shared by the handler tests.

    use scpi_lang::ErrorCode;

    use crate::device::{DeviceConnector, SimulatedChassis};
    use crate::dispatch::CommandError;
    use crate::session::{AutoLoginStore, SessionContext, SessionSettings, SettleDelays};

    pub(super) fn anonymous() -> SessionContext {
        SessionContext::new(
            1,
            SessionSettings {
                transport: "tcp",
                device_address: "127.0.0.1".to_owned(),
                autologin: AutoLoginStore::in_memory(),
                settle: SettleDelays::none(),
            },
        )
    }

    pub(super) fn logged_in(chassis: &SimulatedChassis) -> SessionContext {
        let mut context = anonymous();
        let device = chassis
            .connect("127.0.0.1", "admin", "secret")
            .expect("connect");
        let defaults = device.defaults().expect("defaults");
        context.attach(device, defaults);
        context
    }

    pub(super) fn assert_code(result: Result<Vec<u8>, CommandError>, expected: ErrorCode) {
        match result {
            Err(CommandError::Code { code, .. }) => assert_eq!(code, expected),
            other => panic!("expected {expected}, got {other:?}"),
        }
    }

    pub(super) fn text(result: Result<Vec<u8>, CommandError>) -> String {
        String::from_utf8(result.expect("handler should succeed")).expect("utf-8 response")
    }
}

#[cfg(test)]
mod tests {
    use scpi_lang::preparse_command;

    use super::*;

    fn all_dictionaries() -> Vec<Dictionary> {
        vec![
            errors::DICTIONARY,
            system::DICTIONARY,
            phy::DICTIONARY,
            otn::DICTIONARY,
            sonet::DICTIONARY,
            packet::DICTIONARY,
        ]
    }

    #[test]
    fn every_dictionary_compiles() {
        let trees = CommandTrees::build().expect("trees should build");
        assert!(!trees.system().is_empty());
        assert!(trees.instrument(ProtocolType::None).is_none());
    }

    #[test]
    fn every_entry_is_reachable_by_its_full_name() {
        for dictionary in all_dictionaries() {
            let tree = CommandTree::build(dictionary).expect("tree");
            for (command, handler) in dictionary {
                let upper = command.to_ascii_uppercase();
                let found = tree
                    .search(&preparse_command(upper.as_bytes()))
                    .unwrap_or_else(|| panic!("{command} should resolve"));
                assert!(
                    std::ptr::fn_addr_eq(found.handler, *handler),
                    "{command} resolved to another handler"
                );
            }
        }
    }

    #[test]
    fn every_entry_is_reachable_by_its_short_form() {
        for dictionary in all_dictionaries() {
            let tree = CommandTree::build(dictionary).expect("tree");
            for (command, _) in dictionary {
                let short: Vec<u8> = scpi_lang::canonical_words(command).join(&b':');
                assert!(
                    tree.search(&preparse_command(&short)).is_some(),
                    "{command} short form should resolve"
                );
            }
        }
    }
}
