//! Lexical pre-parsing of SCPI command lines.
//!
//! A command line is split into an ordered list of [`SubCommand`] tokens. Each
//! token carries the bytes up to the next separator (`head`) and everything
//! after it with leading separators removed (`tail`). The command tree walks
//! the heads level by level and, once it reaches a handler, passes that
//! token's tail on as the raw parameter string.

/// Separator class for command headers: space, tab and colon.
pub const COMMAND_SEPARATORS: &[u8] = b" \t:";

/// Separator class for parameter lists: space, tab and comma.
pub const PARAMETER_SEPARATORS: &[u8] = b" \t,";

/// One step of a pre-parsed command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubCommand<'a> {
    head: &'a [u8],
    tail: &'a [u8],
}

impl<'a> SubCommand<'a> {
    /// Builds a token from its head and tail slices.
    #[must_use]
    pub const fn new(head: &'a [u8], tail: &'a [u8]) -> Self {
        Self { head, tail }
    }

    /// Bytes before the first separator.
    #[must_use]
    pub const fn head(&self) -> &'a [u8] {
        self.head
    }

    /// Remainder after the separator run.
    #[must_use]
    pub const fn tail(&self) -> &'a [u8] {
        self.tail
    }
}

/// Splits a command line using [`COMMAND_SEPARATORS`].
///
/// An empty line yields a single empty token so callers always have a first
/// header to inspect.
#[must_use]
pub fn preparse_command(line: &[u8]) -> Vec<SubCommand<'_>> {
    preparse(line, COMMAND_SEPARATORS)
}

/// Splits a parameter string using [`PARAMETER_SEPARATORS`].
///
/// Input made only of separators (or nothing at all) yields no tokens.
#[must_use]
pub fn preparse_parameters(input: &[u8]) -> Vec<SubCommand<'_>> {
    if strip_leading(input, PARAMETER_SEPARATORS).is_empty() {
        return Vec::new();
    }
    preparse(input, PARAMETER_SEPARATORS)
}

/// Convenience wrapper returning only the heads of [`preparse_parameters`].
#[must_use]
pub fn parameters(input: &[u8]) -> Vec<&[u8]> {
    preparse_parameters(input)
        .into_iter()
        .map(|token| token.head())
        .collect()
}

fn preparse<'a>(input: &'a [u8], separators: &[u8]) -> Vec<SubCommand<'a>> {
    let mut tokens = Vec::new();
    let mut rest = input;
    loop {
        match rest.iter().position(|byte| separators.contains(byte)) {
            // A separator at the very start is skipped one byte at a time.
            Some(0) => rest = rest.get(1..).unwrap_or_default(),
            Some(pos) => {
                let (head, after) = rest.split_at(pos);
                let tail = strip_leading(after, separators);
                tokens.push(SubCommand::new(head, tail));
                if tail.is_empty() {
                    break;
                }
                rest = tail;
            }
            None => {
                tokens.push(SubCommand::new(rest, &[]));
                break;
            }
        }
    }
    tokens
}

fn strip_leading<'a>(bytes: &'a [u8], separators: &[u8]) -> &'a [u8] {
    let start = bytes
        .iter()
        .position(|byte| !separators.contains(byte))
        .unwrap_or(bytes.len());
    bytes.get(start..).unwrap_or_default()
}

/// Decomposes a canonical command into the stems the command tree is keyed on.
///
/// Each colon-separated word keeps its mandatory uppercase prefix. A word that
/// contains no lowercase letters is kept whole. A trailing `?` survives the
/// truncation so queries stay distinct from setters.
///
/// `GET:PROTOcol?` decomposes to `["GET", "PROTO?"]`.
#[must_use]
pub fn canonical_words(command: &str) -> Vec<Vec<u8>> {
    command
        .as_bytes()
        .split(|byte| *byte == b':')
        .filter(|word| !word.is_empty())
        .map(required_stem)
        .collect()
}

fn required_stem(word: &[u8]) -> Vec<u8> {
    let Some(first_lower) = word.iter().position(u8::is_ascii_lowercase) else {
        return word.to_vec();
    };
    let mut stem = word.get(..first_lower).unwrap_or_default().to_vec();
    if word.last() == Some(&b'?') {
        stem.push(b'?');
    }
    stem
}
