//! Newline framing for request streams.
//!
//! A request ends at `\n`; a `\r` immediately before it is dropped so Telnet
//! style clients work unchanged. Bytes left over after a newline stay
//! buffered for the next call, so pipelined requests are served in order.

use std::io::{self, Read};

const CHUNK_SIZE: usize = 1024;

/// One framed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line {
    /// A request within the size limit, without its terminator.
    Complete(Vec<u8>),
    /// A request longer than the limit; its bytes were discarded.
    TooLong,
}

/// Incremental line reader with a per-line size limit.
#[derive(Debug)]
pub(crate) struct LineReader {
    buffer: Vec<u8>,
    limit: usize,
    discarding: bool,
}

impl LineReader {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
            discarding: false,
        }
    }

    /// Reads the next request.
    ///
    /// Returns `Ok(None)` at end of stream. A final request without a
    /// terminator is still delivered.
    pub(crate) fn next_line<R: Read>(&mut self, stream: &mut R) -> io::Result<Option<Line>> {
        let mut chunk = [0_u8; CHUNK_SIZE];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if self.buffer.len() > self.limit {
                self.buffer.clear();
                self.discarding = true;
            }
            let read = read_with_retry(stream, &mut chunk)?;
            let Some(bytes) = chunk.get(..read).filter(|bytes| !bytes.is_empty()) else {
                return Ok(self.take_remainder());
            };
            self.buffer.extend_from_slice(bytes);
        }
    }

    fn take_line(&mut self) -> Option<Line> {
        let newline = self.buffer.iter().position(|byte| *byte == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
        line.pop();
        if std::mem::take(&mut self.discarding) {
            return Some(Line::TooLong);
        }
        Some(self.frame(line))
    }

    fn take_remainder(&mut self) -> Option<Line> {
        if std::mem::take(&mut self.discarding) {
            self.buffer.clear();
            return Some(Line::TooLong);
        }
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Some(self.frame(line))
    }

    fn frame(&self, mut line: Vec<u8>) -> Line {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.len() > self.limit {
            Line::TooLong
        } else {
            Line::Complete(line)
        }
    }
}

fn read_with_retry<R: Read>(stream: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    fn collect(input: &[u8], limit: usize) -> Vec<Line> {
        let mut reader = LineReader::new(limit);
        let mut stream = Cursor::new(input.to_vec());
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line(&mut stream).expect("read") {
            lines.push(line);
        }
        lines
    }

    fn complete(text: &str) -> Line {
        Line::Complete(text.as_bytes().to_vec())
    }

    #[test]
    fn pipelined_requests_arrive_in_order() {
        let lines = collect(b"*IDN?\r\nSYST:ERR?\nDUR?", 64);
        assert_eq!(
            lines,
            vec![complete("*IDN?"), complete("SYST:ERR?"), complete("DUR?")]
        );
    }

    #[test]
    fn blank_lines_are_delivered_empty() {
        assert_eq!(collect(b"\n\r\n", 64), vec![complete(""), complete("")]);
    }

    #[rstest]
    #[case(b"0123456789ABCDEF\nDUR?\n" as &[u8])]
    #[case(&[b'X'; 5000])]
    fn oversized_requests_are_reported_once(#[case] input: &[u8]) {
        let lines = collect(input, 8);
        assert_eq!(lines.first(), Some(&Line::TooLong));
        assert_eq!(
            lines.iter().filter(|line| **line == Line::TooLong).count(),
            1
        );
    }

    #[test]
    fn reading_resumes_after_an_oversized_request() {
        let mut input = vec![b'X'; 3000];
        input.extend_from_slice(b"\n*ESR?\n");
        assert_eq!(collect(&input, 16), vec![Line::TooLong, complete("*ESR?")]);
    }

    #[test]
    fn empty_stream_yields_nothing() {
        assert!(collect(b"", 8).is_empty());
    }
}
