//! SCPI command language engine.
//!
//! This crate holds the parts of the SCPI front end that do not touch a
//! transport or a device: the lexical pre-parser, the abbreviation-aware
//! command tree, the numeric token helpers, and the error taxonomy together
//! with the bounded error queue and its response encoding.
//!
//! Everything operates on raw bytes. Header comparisons are ASCII
//! case-insensitive while parameter values are handed to callers untouched,
//! because some instrument settings (for example PRBS pattern labels) are
//! case-significant.
//!
//! The command tree is generic over its handler type so the server can store
//! plain function pointers while tests use whatever marker type suits them.

mod codes;
mod encode;
pub mod numeric;
mod preparse;
mod queue;
mod tree;

pub use codes::ErrorCode;
pub use encode::{ResponseStyle, encode_error, encode_error_with_detail};
pub use preparse::{
    COMMAND_SEPARATORS, PARAMETER_SEPARATORS, SubCommand, canonical_words, parameters,
    preparse_command, preparse_parameters,
};
pub use queue::{ERROR_QUEUE_CAPACITY, ErrorQueue};
pub use tree::{CommandMatch, CommandTree, TreeBuildError};
