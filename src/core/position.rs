// DrainSleuth - core/position.rs
//
// Start-offset resolution for a line-count directive.
//
// Pure function of (file size, scan access, directive): no shared state and
// no side effects beyond moving the scanner's cursor.  The file is never
// loaded whole; forward and backward scans read bounded chunks.
//
// Line boundaries are 0x0A bytes.  When scanning from the end, the newline
// that closes the final line is not a boundary: in "a\nb\n" the last line is
// "b\n", so FromEnd(1) resolves to 2, not 4.

use crate::core::model::LineCountDirective;
use crate::util::constants::DEFAULT_CHUNK_SIZE;
use std::io::{self, Read, Seek, SeekFrom};

/// Resolve the byte offset at which tailing begins.
///
/// `file_size` is the size the caller observed; bytes beyond it are ignored
/// even if the file has grown since.  A zero-length file resolves every
/// directive to 0.
pub fn resolve<R: Read + Seek + ?Sized>(
    file_size: u64,
    scanner: &mut R,
    directive: LineCountDirective,
) -> io::Result<u64> {
    resolve_with_chunk(file_size, scanner, directive, DEFAULT_CHUNK_SIZE)
}

/// [`resolve`] with an explicit scan chunk size.
pub(crate) fn resolve_with_chunk<R: Read + Seek + ?Sized>(
    file_size: u64,
    scanner: &mut R,
    directive: LineCountDirective,
    chunk_size: usize,
) -> io::Result<u64> {
    assert!(chunk_size > 0, "scan chunk size must be positive");

    if file_size == 0 {
        return Ok(0);
    }

    let offset = match directive {
        LineCountDirective::FromStart(0) => 0,
        LineCountDirective::FromEnd(0) => file_size,
        LineCountDirective::FromStart(n) => scan_forward(file_size, scanner, n, chunk_size)?,
        LineCountDirective::FromEnd(n) => scan_backward(file_size, scanner, n, chunk_size)?,
    };

    tracing::trace!(?directive, file_size, offset, "Resolved tail start offset");
    Ok(offset)
}

/// Offset just past the `lines`-th newline, or `file_size` if there are
/// fewer newlines than that.
fn scan_forward<R: Read + Seek + ?Sized>(
    file_size: u64,
    scanner: &mut R,
    lines: u64,
    chunk_size: usize,
) -> io::Result<u64> {
    scanner.seek(SeekFrom::Start(0))?;
    let mut buf = vec![0u8; chunk_size];
    let mut pos: u64 = 0;
    let mut found: u64 = 0;

    while pos < file_size {
        let want = chunk_size.min((file_size - pos) as usize);
        let n = match scanner.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        for (i, &b) in buf[..n].iter().enumerate() {
            if b == b'\n' {
                found += 1;
                if found == lines {
                    return Ok(pos + i as u64 + 1);
                }
            }
        }
        pos += n as u64;
    }

    Ok(file_size)
}

/// Start of the `lines`-th line counted back from the end, or 0 if the file
/// holds no more than `lines` lines.
fn scan_backward<R: Read + Seek + ?Sized>(
    file_size: u64,
    scanner: &mut R,
    lines: u64,
    chunk_size: usize,
) -> io::Result<u64> {
    let mut buf = vec![0u8; chunk_size];
    // The last byte is never a boundary: either it terminates the final line
    // or it belongs to an unterminated final line.
    let mut end = file_size - 1;
    let mut found: u64 = 0;

    while end > 0 {
        let start = end.saturating_sub(chunk_size as u64);
        let len = (end - start) as usize;
        scanner.seek(SeekFrom::Start(start))?;
        scanner.read_exact(&mut buf[..len])?;

        for i in (0..len).rev() {
            if buf[i] == b'\n' {
                found += 1;
                if found == lines {
                    return Ok(start + i as u64 + 1);
                }
            }
        }
        end = start;
    }

    Ok(0)
}
