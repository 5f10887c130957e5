//! Per-connection session state.

mod autologin;
mod context;

pub use self::autologin::{AutoLoginError, AutoLoginSettings, AutoLoginStore};
pub use self::context::{ResponseFlags, Selection, SessionContext, SessionSettings, SettleDelays};

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");
