// DrainSleuth - platform/fs.rs
//
// Filesystem helpers for the tail reader: opening a tail target and mapping
// a byte range of it into memory.

use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io;
use std::path::Path;

/// Open `path` read-only, rejecting anything that is not a regular file.
///
/// Returns `Ok(None)` when the path exists but is a directory, FIFO, etc.
pub fn open_regular_file(path: &Path) -> io::Result<Option<File>> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Ok(None);
    }
    Ok(Some(file))
}

/// Current length of an open file.
pub fn current_len(file: &File) -> io::Result<u64> {
    Ok(file.metadata()?.len())
}

/// Map `len` bytes of `file` starting at `offset`.
///
/// The caller must only pass a range that lies within the file's current
/// length.
pub fn map_region(file: &File, offset: u64, len: usize) -> io::Result<Mmap> {
    // SAFETY: the map is read-only and never outlives the transfer that
    // created it.  We accept the documented risk that a concurrent truncation
    // of the log file during that transfer could fault, which is acceptable
    // for a reader of append-only log files.
    unsafe { MmapOptions::new().offset(offset).len(len).map(file) }
}
