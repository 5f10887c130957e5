//! Response encoding for error codes.

use crate::ErrorCode;

/// How errors are rendered on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseStyle {
    /// Signed integer followed by the quoted description.
    #[default]
    Standard,
    /// Signed integer only.
    Legacy,
}

impl ResponseStyle {
    /// Picks the style from the session's legacy-response flag.
    #[must_use]
    pub const fn from_legacy_flag(legacy: bool) -> Self {
        if legacy { Self::Legacy } else { Self::Standard }
    }
}

/// Encodes a code as `+N` (legacy) or `+N, "description"` (standard).
#[must_use]
pub fn encode_error(code: ErrorCode, style: ResponseStyle) -> Vec<u8> {
    encode_error_with_detail(code, None, style)
}

/// Encodes a code with an optional detail appended to the description.
///
/// The detail is separated from the description by a single space, so a
/// catch-all failure renders as `+900, "Unhandled internal error See log for
/// trace."`. Legacy style drops the detail along with the description.
#[must_use]
pub fn encode_error_with_detail(
    code: ErrorCode,
    detail: Option<&str>,
    style: ResponseStyle,
) -> Vec<u8> {
    match style {
        ResponseStyle::Legacy => code.to_string().into_bytes(),
        ResponseStyle::Standard => {
            let description = code.description();
            let text = match detail {
                Some(detail) if !detail.is_empty() => {
                    format!("{code}, \"{description} {detail}\"")
                }
                _ => format!("{code}, \"{description}\""),
            };
            text.into_bytes()
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ErrorCode::NO_ERROR, ResponseStyle::Legacy, "+0")]
    #[case(ErrorCode::CMD_ERR, ResponseStyle::Legacy, "-100")]
    #[case(ErrorCode::NO_ERROR, ResponseStyle::Standard, "+0, \"No error\"")]
    #[case(ErrorCode::CMD_ERR, ResponseStyle::Standard, "-100, \"Command error\"")]
    #[case(
        ErrorCode::MISC_INVALID_REGISTRY_KEY,
        ResponseStyle::Standard,
        "+800, \"Invalid registry key\""
    )]
    #[case(ErrorCode::new(-999), ResponseStyle::Standard, "-999, \"Unknown error\"")]
    fn encodes_codes(#[case] code: ErrorCode, #[case] style: ResponseStyle, #[case] expected: &str) {
        assert_eq!(encode_error(code, style), expected.as_bytes());
    }

    #[test]
    fn appends_detail_after_description() {
        let encoded = encode_error_with_detail(
            ErrorCode::INTERNAL_UNHANDLED_ERROR,
            Some("See log for trace."),
            ResponseStyle::Standard,
        );
        assert_eq!(
            encoded,
            b"+900, \"Unhandled internal error See log for trace.\"".to_vec()
        );
    }

    #[test]
    fn legacy_style_drops_detail() {
        let encoded = encode_error_with_detail(
            ErrorCode::INTERNAL_UNHANDLED_ERROR,
            Some("TIMEOUT"),
            ResponseStyle::Legacy,
        );
        assert_eq!(encoded, b"+900".to_vec());
    }
}
