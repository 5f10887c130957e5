//! Request dispatch for SCPI sessions.
//!
//! Each connection runs one session. The [`SessionConnectionHandler`] frames
//! request lines off the stream and hands them to the [`Dispatcher`], which
//! owns the per-request state machine:
//!
//! 1. `LOGIN`, `LOGOUT` and `CLOSE` are handled before any dictionary lookup.
//! 2. Commands that only touch the error queue work without a device handle.
//! 3. Everything else needs a logged-in session and is routed to the tree of
//!    the selected protocol family, falling back to the chassis-wide tree.
//!
//! Handler failures are encoded for the wire and recorded in the session's
//! error queue. A server-exit request from the device library is the one
//! failure that is never encoded; it ends the session instead.

mod dispatcher;
mod errors;
mod handler;
mod response;

pub use self::dispatcher::Dispatcher;
pub use self::errors::{CommandError, MappedError, SessionExit, map_device_error};
pub(crate) use self::handler::SessionConnectionHandler;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
