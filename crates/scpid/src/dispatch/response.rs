//! Response framing for the session loop.

use std::io::{self, Write};

/// Writes newline-terminated responses to a client stream.
///
/// Empty responses produce no output at all, so silent commands stay silent
/// on the wire.
pub(crate) struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one response and flushes the stream.
    pub(crate) fn write_response(&mut self, response: &[u8]) -> io::Result<()> {
        if response.is_empty() {
            return Ok(());
        }
        self.writer.write_all(response)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_a_newline() {
        let mut output = Vec::new();
        ResponseWriter::new(&mut output)
            .write_response(b"+0")
            .expect("write response");
        assert_eq!(output, b"+0\n".to_vec());
    }

    #[test]
    fn empty_responses_write_nothing() {
        let mut output = Vec::new();
        ResponseWriter::new(&mut output)
            .write_response(b"")
            .expect("write response");
        assert!(output.is_empty());
    }
}
