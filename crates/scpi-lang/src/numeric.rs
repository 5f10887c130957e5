//! Numeric token helpers shared by command handlers.
//!
//! Each helper returns `None` for malformed input. Callers decide which SCPI
//! error to raise; nothing here fails loudly.

/// Parses a `#H`-prefixed hexadecimal integer such as `#H1F`.
#[must_use]
pub fn parse_hex(token: &[u8]) -> Option<u64> {
    let digits = strip_radix_prefix(token, b'H')?;
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u64::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()
}

/// Parses a `#B`-prefixed binary integer such as `#B1010`.
#[must_use]
pub fn parse_binary(token: &[u8]) -> Option<u64> {
    let digits = strip_radix_prefix(token, b'B')?;
    if !digits.iter().all(|byte| matches!(byte, b'0' | b'1')) {
        return None;
    }
    u64::from_str_radix(std::str::from_utf8(digits).ok()?, 2).ok()
}

/// Parses an unsigned decimal integer made only of digits.
#[must_use]
pub fn parse_decimal(token: &[u8]) -> Option<u64> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(token).ok()?.parse().ok()
}

/// Parses a fixed-point number: optional `-`, digits, at most one `.`, and a
/// digit in last position.
#[must_use]
pub fn parse_fixed(token: &[u8]) -> Option<f64> {
    if !is_fixed(token, false) {
        return None;
    }
    to_f64(token)
}

/// Parses a number in fixed or scientific notation (`-1.5E-3`).
///
/// The exponent is an optional signed integer introduced by an upper-case
/// `E`; `1e3` is rejected. When a decimal point is present it must be
/// preceded by a digit.
#[must_use]
pub fn parse_scientific(token: &[u8]) -> Option<f64> {
    let (mantissa, exponent) = match token.iter().position(|&byte| byte == b'E') {
        Some(pos) => {
            let (mantissa, rest) = token.split_at(pos);
            (mantissa, rest.get(1..))
        }
        None => (token, None),
    };
    if !is_fixed(mantissa, true) {
        return None;
    }
    if let Some(exponent) = exponent {
        let digits = match exponent.first() {
            Some(b'+' | b'-') => exponent.get(1..).unwrap_or_default(),
            _ => exponent,
        };
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
    }
    to_f64(token)
}

/// Parses an error-rate threshold of the exact form `D.DDE-DD`.
///
/// The token is upper-cased before matching, so `1.00e-09` is accepted.
#[must_use]
pub fn parse_error_rate(token: &[u8]) -> Option<f64> {
    let upper = token.to_ascii_uppercase();
    let [d0, b'.', d1, d2, b'E', b'-', e0, e1] = upper.as_slice() else {
        return None;
    };
    if ![d0, d1, d2, e0, e1].iter().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    to_f64(&upper)
}

fn strip_radix_prefix(token: &[u8], radix: u8) -> Option<&[u8]> {
    match token {
        [b'#', marker, digits @ ..] if marker.eq_ignore_ascii_case(&radix) && !digits.is_empty() => {
            Some(digits)
        }
        _ => None,
    }
}

fn is_fixed(token: &[u8], digit_before_point: bool) -> bool {
    let body = token.strip_prefix(b"-").unwrap_or(token);
    if !body.last().is_some_and(u8::is_ascii_digit) {
        return false;
    }
    let mut seen_point = false;
    let mut previous = None::<u8>;
    for &byte in body {
        match byte {
            b'0'..=b'9' => {}
            b'.' if !seen_point => {
                if digit_before_point && !previous.is_some_and(|prev| prev.is_ascii_digit()) {
                    return false;
                }
                seen_point = true;
            }
            _ => return false,
        }
        previous = Some(byte);
    }
    true
}

fn to_f64(token: &[u8]) -> Option<f64> {
    std::str::from_utf8(token).ok()?.parse().ok()
}
