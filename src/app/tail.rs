// DrainSleuth - app/tail.rs
//
// Tail reader: streams one file from a resolved start offset through a sink,
// then optionally follows appended bytes until closed.
//
// Architecture:
//   - `TailReader` is driven by a single thread; `tail_read` blocks for the
//     full duration of a follow-mode call.
//   - `TailHandle` is a cloneable view shared with other threads.  Its
//     `close()` sets an `AtomicBool` and wakes the poll wait through a
//     `Condvar`, so cancellation latency is bounded by one poll interval
//     at most and usually far less.
//   - `total_read_bytes` is an `AtomicU64` readable from any thread while a
//     transfer is in progress.
//
// States: Idle -> Reading -> (Following <-> PollWait) -> Closed.
//
// Rule 11 compliance:
//   - I/O errors end the current `tail_read` call; nothing is retried, since a
//     garbled tail is worse than a reported failure.
//   - Truncated/rotated files (size < consumed position) reset the position
//     to 0 and discard the sink's partial line, then keep following.
//   - Cancel is checked before every wait and immediately after waking.

use crate::core::model::LineCountDirective;
use crate::core::position;
use crate::core::sink::ReadAction;
use crate::platform::fs;
use crate::util::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_POLL_INTERVAL_MS, MMAP_THRESHOLD_BYTES};
use crate::util::error::TailError;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

// =============================================================================
// Options and state
// =============================================================================

/// Tunables for a `TailReader`.
#[derive(Debug, Clone)]
pub struct TailOptions {
    /// Interval between size checks in follow mode.  Must be non-zero.
    pub poll_interval: Duration,
    /// Serve large catch-up transfers from a memory map.
    pub use_mmap: bool,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            use_mmap: true,
        }
    }
}

/// Lifecycle of a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Open, no transfer running.
    Idle,
    /// Catch-up transfer from the resolved start offset.
    Reading,
    /// Transferring bytes appended since the last check.
    Following,
    /// Waiting for the next size check.
    PollWait,
    /// Terminal.
    Closed,
}

/// State shared between the reading thread and any `TailHandle`.
#[derive(Debug, Default)]
struct Shared {
    closed: AtomicBool,
    total_read_bytes: AtomicU64,
    lock: Mutex<()>,
    wake: Condvar,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Taking the lock orders this notify after any waiter's flag check.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.wake.notify_all();
    }

    /// Sleep up to `timeout`; returns `true` if the reader was closed.
    fn wait(&self, timeout: Duration) -> bool {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = self
            .wake
            .wait_timeout_while(guard, timeout, |_| !self.is_closed())
            .unwrap_or_else(PoisonError::into_inner);
        self.is_closed()
    }

    fn add_bytes(&self, n: u64) {
        self.total_read_bytes.fetch_add(n, Ordering::SeqCst);
    }
}

// =============================================================================
// TailHandle
// =============================================================================

/// Thread-safe handle for cancelling and observing a `TailReader`.
#[derive(Debug, Clone)]
pub struct TailHandle {
    shared: Arc<Shared>,
}

impl TailHandle {
    /// Ask the reader to stop.  Idempotent; an in-progress `tail_read`
    /// returns `Ok` once it observes the signal.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Bytes pushed through the sink so far.
    pub fn total_read_bytes(&self) -> u64 {
        self.shared.total_read_bytes.load(Ordering::SeqCst)
    }
}

// =============================================================================
// TailReader
// =============================================================================

/// Streams one file through a sink.
pub struct TailReader<S> {
    path: PathBuf,
    file: Option<File>,
    sink: S,
    options: TailOptions,
    shared: Arc<Shared>,
    state: ReaderState,
}

impl<S: ReadAction> TailReader<S> {
    /// Open `path` for tailing.
    ///
    /// # Panics
    /// If `options.poll_interval` is zero.
    pub fn open(path: impl AsRef<Path>, sink: S, options: TailOptions) -> Result<Self, TailError> {
        assert!(
            !options.poll_interval.is_zero(),
            "poll interval must be non-zero"
        );
        let path = path.as_ref().to_path_buf();
        let file = fs::open_regular_file(&path)
            .map_err(|e| TailError::io(&path, "open", e))?
            .ok_or_else(|| TailError::NotAFile { path: path.clone() })?;

        tracing::debug!(file = %path.display(), "Tail: opened");

        Ok(Self {
            path,
            file: Some(file),
            sink,
            options,
            shared: Arc::new(Shared::default()),
            state: ReaderState::Idle,
        })
    }

    pub fn handle(&self) -> TailHandle {
        TailHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Bytes pushed through the sink so far.
    pub fn total_read_bytes(&self) -> u64 {
        self.shared.total_read_bytes.load(Ordering::SeqCst)
    }

    /// Stop following and release the file.  Idempotent.
    pub fn close(&mut self) {
        self.shared.close();
        if self.file.take().is_some() {
            tracing::debug!(file = %self.path.display(), "Tail: closed");
        }
        self.state = ReaderState::Closed;
    }

    /// Stream from the position `directive` resolves to, then, with `follow`,
    /// keep streaming appended bytes until the reader is closed.
    ///
    /// A close observed during follow mode ends the call with `Ok(())`.
    pub fn tail_read(&mut self, directive: LineCountDirective, follow: bool) -> Result<(), TailError> {
        if self.shared.is_closed() || self.file.is_none() {
            self.close();
            return Err(TailError::Closed {
                path: self.path.clone(),
            });
        }

        let result = self.run(directive, follow);

        if self.shared.is_closed() {
            self.close();
        } else if self.state != ReaderState::Closed {
            self.state = ReaderState::Idle;
        }
        result
    }

    fn run(&mut self, directive: LineCountDirective, follow: bool) -> Result<(), TailError> {
        let Self {
            path,
            file,
            sink,
            options,
            shared,
            state,
        } = self;
        let file = file.as_mut().ok_or_else(|| TailError::Closed { path: path.clone() })?;

        *state = ReaderState::Reading;
        // A fragment left by an earlier call does not precede the new start.
        sink.reset();
        let size = fs::current_len(file).map_err(|e| TailError::io(&*path, "stat", e))?;
        let start = position::resolve(size, &mut *file, directive)
            .map_err(|e| TailError::io(&*path, "resolve start position", e))?;

        tracing::debug!(file = %path.display(), size, start, ?directive, "Tail: catch-up");

        let copied = if options.use_mmap && size - start >= MMAP_THRESHOLD_BYTES {
            transfer_mapped(file, &mut *sink, start, size)
        } else {
            sink.apply(&mut *file, start)
        }
        .map_err(|e| TailError::io(&*path, "read", e))?;
        shared.add_bytes(copied);
        let mut position = start + copied;

        if !follow {
            return Ok(());
        }

        loop {
            if shared.is_closed() {
                break;
            }
            *state = ReaderState::PollWait;
            if shared.wait(options.poll_interval) {
                break;
            }
            *state = ReaderState::Following;

            let size = fs::current_len(file).map_err(|e| TailError::io(&*path, "stat", e))?;
            if size < position {
                tracing::warn!(
                    file = %path.display(),
                    old_offset = position,
                    new_size = size,
                    "Tail: file truncated or rotated; restarting from offset 0"
                );
                sink.reset();
                position = 0;
            }
            if size == position {
                continue;
            }

            let copied = sink
                .apply(&mut *file, position)
                .map_err(|e| TailError::io(&*path, "read", e))?;
            shared.add_bytes(copied);
            position += copied;
            tracing::trace!(file = %path.display(), copied, position, "Tail: appended bytes");
        }

        tracing::debug!(
            file = %path.display(),
            total = shared.total_read_bytes.load(Ordering::SeqCst),
            "Tail: cancelled"
        );
        Ok(())
    }
}

/// Push `[start, end)` through `sink` straight from a memory map.
fn transfer_mapped<S: ReadAction>(
    file: &File,
    sink: &mut S,
    start: u64,
    end: u64,
) -> std::io::Result<u64> {
    let len = usize::try_from(end - start)
        .map_err(|_| std::io::Error::other("mapped region exceeds address space"))?;
    let map = fs::map_region(file, start, len)?;
    for chunk in map.chunks(DEFAULT_CHUNK_SIZE) {
        sink.consume(chunk)?;
    }
    sink.flush()?;
    Ok(len as u64)
}
