//! Errors raised while binding or running the SCPI listener.
//!
//! Every variant names the endpoint clients were meant to reach, rendered the
//! way it appears in configuration (`tcp://host:port` or `unix:///path`), so
//! a bootstrap failure points straight at the offending `--listen` value.

use std::io;

use thiserror::Error;

/// Failures surfaced by [`super::SocketListener`].
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP host name did not resolve.
    #[error("cannot resolve SCPI endpoint {endpoint}: {source}")]
    Resolve {
        /// Configured endpoint.
        endpoint: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// The TCP host name resolved to no addresses.
    #[error("SCPI endpoint {endpoint} resolved to no addresses")]
    NoAddress {
        /// Configured endpoint.
        endpoint: String,
    },
    /// The socket could not be bound.
    #[error("cannot bind SCPI endpoint {endpoint}: {source}")]
    Bind {
        /// Configured endpoint.
        endpoint: String,
        /// Bind error.
        #[source]
        source: io::Error,
    },
    /// The bound socket refused non-blocking mode.
    #[error("cannot poll SCPI endpoint {endpoint} for connections: {source}")]
    NonBlocking {
        /// Configured endpoint.
        endpoint: String,
        /// Socket option error.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be started.
    #[error("cannot start accepting sessions on {endpoint}: {source}")]
    SpawnAcceptLoop {
        /// Configured endpoint.
        endpoint: String,
        /// Thread creation error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked before it could be joined.
    #[error("accept loop for {endpoint} panicked")]
    AcceptLoopPanicked {
        /// Configured endpoint.
        endpoint: String,
    },
    /// Unix endpoints were configured on a platform without them.
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix {
        /// Configured endpoint.
        endpoint: String,
    },
    /// Another SCPI server already answers on the socket path.
    #[cfg(unix)]
    #[error("another SCPI server is listening on {path}")]
    UnixInUse {
        /// Socket path.
        path: String,
    },
    /// Something other than a socket occupies the path.
    #[cfg(unix)]
    #[error("{path} exists and is not a socket")]
    UnixNotSocket {
        /// Socket path.
        path: String,
    },
    /// The existing path could not be inspected.
    #[cfg(unix)]
    #[error("cannot inspect socket path {path}: {source}")]
    UnixMetadata {
        /// Socket path.
        path: String,
        /// Filesystem error.
        #[source]
        source: io::Error,
    },
    /// A socket left behind by a stopped server could not be removed.
    #[cfg(unix)]
    #[error("cannot remove stale socket {path}: {source}")]
    UnixCleanup {
        /// Socket path.
        path: String,
        /// Filesystem error.
        #[source]
        source: io::Error,
    },
}
