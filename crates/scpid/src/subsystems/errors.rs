//! `SYSTem:ERRor` family. These work before login and never enqueue.

use scpi_lang::{ErrorCode, encode_error};

use crate::dispatch::CommandError;
use crate::session::SessionContext;

use super::{Dictionary, no_parameters};

pub(super) const DICTIONARY: Dictionary = &[
    ("SYSTem:ERRor:CODE:NEXT?", next_error),
    ("SYSTem:ERRor:CODE:LAST?", last_error),
    ("SYSTem:ERRor:CODE?", next_error),
    ("SYSTem:ERRor:NEXT?", next_error),
    ("SYSTem:ERRor:LAST?", last_error),
    ("SYSTem:ERRor:COUNt?", error_count),
    ("SYSTem:ERRor?", next_error),
];

fn render(ctx: &SessionContext, code: Option<ErrorCode>) -> Vec<u8> {
    encode_error(code.unwrap_or(ErrorCode::NO_ERROR), ctx.style())
}

fn next_error(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let code = ctx.errors_mut().next_error();
    Ok(render(ctx, code))
}

fn last_error(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    let code = ctx.errors_mut().last_error();
    Ok(render(ctx, code))
}

fn error_count(ctx: &mut SessionContext, raw: &[u8]) -> Result<Vec<u8>, CommandError> {
    no_parameters(raw)?;
    Ok(ctx.errors().count().to_string().into_bytes())
}
