//! Socket transport for SCPI sessions.
//!
//! The listener accepts connections on a background thread and hands each
//! one to a [`ConnectionHandler`] running on its own thread. Requests are
//! newline-framed; [`LineReader`] does the framing.

mod errors;
mod handler;
mod lines;
mod listener;
#[cfg(test)]
mod listener_tests;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::lines::{Line, LineReader};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
