// DrainSleuth - core/sink.rs
//
// Pluggable destinations for bytes streamed by the tail reader.
//
// Two implementations of one `ReadAction` contract ("copy everything from an
// offset to the current end of a source, return how many bytes moved"):
//   - `LineSink` decodes complete lines and hands them to a callback.  It
//     keeps a carry-over buffer because a read boundary rarely falls on a
//     newline.  An unterminated trailing fragment is never emitted.
//   - `RawCopySink` forwards bytes verbatim to any `io::Write`.
//
// Rule 11 compliance:
//   - The carry-over buffer is capped at MAX_PARTIAL_LINE_BYTES; an over-long
//     line is dropped (with a warning) up to its terminating newline.

use crate::core::model::TextEncoding;
use crate::util::constants::{DEFAULT_CHUNK_SIZE, MAX_PARTIAL_LINE_BYTES};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// A readable, seekable byte source whose length may grow between reads.
pub trait ByteSource: Read + Seek {}

impl<T: Read + Seek> ByteSource for T {}

// =============================================================================
// ReadAction
// =============================================================================

/// Consumer of a byte range read from a tailed file.
pub trait ReadAction {
    /// Accept the next chunk of bytes, in file order.
    fn consume(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Called once after every transfer.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Forget any buffered state, e.g. after the source was truncated.
    fn reset(&mut self) {}

    /// Copy every byte from `from_offset` to the current end of `source`.
    ///
    /// Returns the number of bytes copied, not an absolute offset.  An offset
    /// at or past the end copies nothing.
    fn apply(&mut self, source: &mut dyn ByteSource, from_offset: u64) -> io::Result<u64> {
        let end = source.seek(SeekFrom::End(0))?;
        if from_offset >= end {
            return Ok(0);
        }
        source.seek(SeekFrom::Start(from_offset))?;

        let mut buf = vec![0u8; DEFAULT_CHUNK_SIZE];
        let mut remaining = end - from_offset;
        let mut copied: u64 = 0;

        while remaining > 0 {
            let want = (buf.len() as u64).min(remaining) as usize;
            let n = match source.read(&mut buf[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.consume(&buf[..n])?;
            copied += n as u64;
            remaining -= n as u64;
        }

        self.flush()?;
        Ok(copied)
    }
}

// =============================================================================
// LineSink
// =============================================================================

/// Splits a byte stream into `\n`-terminated lines and decodes each one.
///
/// The terminator (and a `\r` right before it) is not part of the line
/// handed to the callback.
pub struct LineSink<F> {
    on_line: F,
    encoding: TextEncoding,
    /// Bytes of the current line seen so far (no newline yet).
    partial: Vec<u8>,
    /// Set once `partial` overflowed; bytes are dropped until the next newline.
    discarding: bool,
    lines: u64,
}

impl<F: FnMut(&str)> LineSink<F> {
    pub fn new(encoding: TextEncoding, on_line: F) -> Self {
        Self {
            on_line,
            encoding,
            partial: Vec::new(),
            discarding: false,
            lines: 0,
        }
    }

    /// Number of complete lines emitted so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Length of the buffered, not-yet-terminated line.
    pub fn pending_bytes(&self) -> usize {
        self.partial.len()
    }

    fn emit(&mut self, bytes: &[u8]) {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        let text = self.encoding.decode(bytes);
        (self.on_line)(&text);
        self.lines += 1;
    }

    fn buffer(&mut self, bytes: &[u8]) {
        if self.discarding {
            return;
        }
        if self.partial.len() + bytes.len() > MAX_PARTIAL_LINE_BYTES {
            tracing::warn!(
                buffered = self.partial.len() + bytes.len(),
                limit = MAX_PARTIAL_LINE_BYTES,
                "Line exceeds maximum length; dropping it"
            );
            self.partial.clear();
            self.discarding = true;
            return;
        }
        self.partial.extend_from_slice(bytes);
    }
}

impl<F: FnMut(&str)> ReadAction for LineSink<F> {
    fn consume(&mut self, chunk: &[u8]) -> io::Result<()> {
        let mut rest = chunk;
        while let Some(nl) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(nl);
            rest = &tail[1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }

            if self.partial.is_empty() {
                self.emit(head);
            } else {
                self.buffer(head);
                if self.discarding {
                    self.discarding = false;
                    continue;
                }
                let line = std::mem::take(&mut self.partial);
                self.emit(&line);
                // Keep the allocation for the next split line.
                self.partial = line;
                self.partial.clear();
            }
        }

        if !rest.is_empty() {
            self.buffer(rest);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.partial.clear();
        self.discarding = false;
    }
}

// =============================================================================
// RawCopySink
// =============================================================================

/// Copies bytes verbatim into a destination writer.
pub struct RawCopySink<W> {
    out: W,
}

impl<W: Write> RawCopySink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReadAction for RawCopySink<W> {
    fn consume(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.out.write_all(chunk)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
