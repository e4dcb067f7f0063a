//! Splits an upstream byte stream into text lines.

use thiserror::Error;

/// Longest unterminated line held before the stream is abandoned.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Error, Debug, PartialEq)]
#[error("upstream line exceeds {0} bytes")]
pub struct LineTooLong(pub usize);

/// Accumulates chunks and yields every complete, non-empty line.
///
/// Lines end at `\n`; a trailing `\r` is stripped. Decoding happens per line so a
/// multi-byte character split across chunks survives.
#[derive(Debug)]
pub struct LineDecoder {
    buf: Vec<u8>,
    // Prefix of `buf` already known to hold no newline.
    scanned: usize,
    max_line: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    pub fn with_limit(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            max_line,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, LineTooLong> {
        let mut start = self.scanned;
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buf[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            if let Some(line) = decode(&self.buf[consumed..end]) {
                lines.push(line);
            }
            consumed = end + 1;
            start = consumed;
        }

        self.buf.drain(..consumed);
        self.scanned = self.buf.len();

        if self.buf.len() > self.max_line {
            return Err(LineTooLong(self.max_line));
        }
        Ok(lines)
    }

    /// Emits whatever is left once the upstream has finished cleanly.
    pub fn finish(self) -> Option<String> {
        decode(&self.buf)
    }
}

fn decode(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(raw).into_owned())
}
