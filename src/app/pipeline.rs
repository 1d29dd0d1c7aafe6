// DrainSleuth - app/pipeline.rs
//
// Run loop wiring one tailed file to the template miner:
//   TailReader -> LineSink -> LineStart (preprocess) -> Drain
//
// Also hosts the raw-copy variant used by `--raw`, which streams bytes
// unchanged to a writer instead of mining them.
//
// Both entry points hand the caller a `TailHandle` right after the file is
// opened, so another thread (Ctrl-C handler, test harness) can close the
// reader and end follow mode cleanly.

use crate::app::tail::{TailHandle, TailOptions, TailReader};
use crate::core::drain::{Drain, DrainConfig};
use crate::core::model::{LineCountDirective, TextEncoding};
use crate::core::preprocess::LineStart;
use crate::core::sink::{LineSink, RawCopySink};
use crate::util::constants::PROGRESS_EVERY_LINES;
use crate::util::error::TailError;
use crate::util::logging;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

/// Everything needed to mine one file.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub directive: LineCountDirective,
    pub follow: bool,
    pub encoding: TextEncoding,
    pub line_start: LineStart,
    pub drain: DrainConfig,
    pub tail: TailOptions,
    /// Report the running cluster count every PROGRESS_EVERY_LINES lines.
    pub verbose: bool,
}

/// Result of a completed mining run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Complete lines handed to the miner.
    pub lines: u64,
    /// Bytes pulled from the file.
    pub bytes: u64,
    pub elapsed: Duration,
    pub drain: Drain,
}

/// Mine templates from `path`.
///
/// `on_open` receives the reader's handle before any byte is read.
pub fn drain_file(
    path: &Path,
    options: &PipelineOptions,
    on_open: impl FnOnce(TailHandle),
) -> Result<PipelineReport, TailError> {
    let started = Instant::now();
    let mut drain = Drain::new(options.drain.clone());
    let mut lines: u64 = 0;
    let verbose = options.verbose;
    let line_start = &options.line_start;

    let bytes = {
        let sink = LineSink::new(options.encoding, |line: &str| {
            lines += 1;
            let content = line_start.apply(line);
            if drain.parse_log_message(content).is_none() {
                tracing::trace!(line = logging::preview(line), "Skipping line without tokens");
            }
            if lines % PROGRESS_EVERY_LINES == 0 {
                if verbose {
                    tracing::info!(lines, clusters = drain.cluster_count(), "Clusters so far");
                } else {
                    tracing::debug!(lines, clusters = drain.cluster_count(), "Clusters so far");
                }
            }
        });

        let mut reader = TailReader::open(path, sink, options.tail.clone())?;
        on_open(reader.handle());
        reader.tail_read(options.directive, options.follow)?;
        reader.total_read_bytes()
    };

    let elapsed = started.elapsed();
    if verbose {
        tracing::info!(
            file = %path.display(),
            lines,
            bytes,
            elapsed_ms = elapsed.as_millis() as u64,
            clusters = drain.cluster_count(),
            "Done processing file"
        );
    }

    Ok(PipelineReport {
        lines,
        bytes,
        elapsed,
        drain,
    })
}

/// Stream `path` unchanged into `out`, returning the number of bytes copied.
pub fn copy_file<W: Write>(
    path: &Path,
    directive: LineCountDirective,
    follow: bool,
    tail: TailOptions,
    out: W,
    on_open: impl FnOnce(TailHandle),
) -> Result<u64, TailError> {
    let mut reader = TailReader::open(path, RawCopySink::new(out), tail)?;
    on_open(reader.handle());
    reader.tail_read(directive, follow)?;
    Ok(reader.total_read_bytes())
}
