// DrainSleuth - tests/e2e_tail.rs
//
// End-to-end tests for the tail reading engine and the mining pipeline.
//
// These tests exercise the real filesystem: a committed fixture for offset
// resolution, and temp files grown by a writer thread for follow mode.
// No mocks, no stubs.

use drainsleuth::app::pipeline::{drain_file, PipelineOptions};
use drainsleuth::app::tail::{ReaderState, TailHandle, TailOptions, TailReader};
use drainsleuth::core::model::{LineCountDirective, TemplateSlot, TextEncoding};
use drainsleuth::core::position;
use drainsleuth::core::sink::{LineSink, RawCopySink, ReadAction};
use drainsleuth::util::error::TailError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to the on-disk fixture files.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fast() -> TailOptions {
    TailOptions {
        poll_interval: Duration::from_millis(20),
        use_mmap: false,
    }
}

/// Append a few batches of lines with pauses in between.
/// Returns (bytes written, lines written).
fn append_lines(path: &Path, batches: usize) -> (u64, u64) {
    let mut written = 0u64;
    let mut lines = 0u64;
    for batch in 0..batches {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        let mut buf = String::new();
        for _ in 0..=(batch % 4) {
            buf.push_str(&format!("worker {lines} finished task\n"));
            lines += 1;
        }
        file.write_all(buf.as_bytes()).unwrap();
        written += buf.len() as u64;
        thread::sleep(Duration::from_millis(30));
    }
    (written, lines)
}

/// Append `text` to `path` without a trailing newline of its own.
fn append(path: &Path, text: &str) -> u64 {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    text.len() as u64
}

/// A line sink collecting into a vector shared with the test body.
fn collecting_sink() -> (LineSink<impl FnMut(&str)>, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let in_sink = Arc::clone(&lines);
    let sink = LineSink::new(TextEncoding::Utf8, move |l: &str| {
        in_sink.lock().unwrap().push(l.to_string());
    });
    (sink, lines)
}

/// Once the writer is done, wait for the reader to catch up, then close it.
fn close_when_caught_up(
    handle: TailHandle,
    writer: thread::JoinHandle<(u64, u64)>,
) -> thread::JoinHandle<(u64, u64)> {
    thread::spawn(move || {
        let (bytes, lines) = writer.join().unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        while handle.total_read_bytes() < bytes && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        handle.close();
        (bytes, lines)
    })
}

// =============================================================================
// Offset resolution
// =============================================================================

#[test]
fn e2e_three_line_fixture_offsets() {
    let path = fixture("3-lines.txt");
    let mut file = File::open(&path).unwrap();
    let size = file.metadata().unwrap().len();
    assert_eq!(size, 183);

    let mut at = |d| position::resolve(size, &mut file, d).unwrap();
    assert_eq!(at(LineCountDirective::FromEnd(10)), 0);
    assert_eq!(at(LineCountDirective::FromEnd(2)), 42);
    assert_eq!(at(LineCountDirective::FromEnd(0)), 183);
    assert_eq!(at(LineCountDirective::FromStart(0)), 0);
    assert_eq!(at(LineCountDirective::FromStart(2)), 181);
    assert_eq!(at(LineCountDirective::FromStart(10)), 183);
}

#[test]
fn e2e_raw_copy_from_position() {
    let mut file = File::open(fixture("3-lines.txt")).unwrap();
    let mut sink = RawCopySink::new(std::io::sink());
    assert_eq!(sink.apply(&mut file, 0).unwrap(), 183);
    assert_eq!(sink.apply(&mut file, 41).unwrap(), 142);
}

#[test]
fn e2e_tail_last_two_lines_of_fixture() {
    let mut lines = Vec::new();
    {
        let sink = LineSink::new(TextEncoding::Utf8, |l: &str| lines.push(l.to_string()));
        let mut reader = TailReader::open(fixture("3-lines.txt"), sink, fast()).unwrap();
        reader
            .tail_read(LineCountDirective::FromEnd(2), false)
            .unwrap();
        assert_eq!(reader.total_read_bytes(), 141);
    }
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("connection pool exhausted"));
    assert_eq!(lines[1], "x");
}

// =============================================================================
// Follow mode
// =============================================================================

/// A reader following an initially empty file reports exactly the bytes an
/// external writer appended, once it has been closed.
#[test]
fn e2e_follow_with_line_sink_counts_every_byte() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("growing.log");
    File::create(&path).unwrap();

    let seen = Arc::new(AtomicU64::new(0));
    let seen_in_sink = Arc::clone(&seen);
    let sink = LineSink::new(TextEncoding::Utf8, move |_: &str| {
        seen_in_sink.fetch_add(1, Ordering::SeqCst);
    });
    let mut reader = TailReader::open(&path, sink, fast()).unwrap();

    let writer_path = path.clone();
    let writer = thread::spawn(move || append_lines(&writer_path, 12));
    let closer = close_when_caught_up(reader.handle(), writer);

    reader
        .tail_read(LineCountDirective::FromStart(0), true)
        .unwrap();
    let (bytes, lines) = closer.join().unwrap();

    assert_eq!(reader.state(), ReaderState::Closed);
    assert_eq!(reader.total_read_bytes(), bytes);
    assert_eq!(seen.load(Ordering::SeqCst), lines);
}

#[test]
fn e2e_follow_with_raw_sink_copies_file_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("growing.log");
    File::create(&path).unwrap();

    let mut reader = TailReader::open(&path, RawCopySink::new(Vec::new()), fast()).unwrap();
    let writer_path = path.clone();
    let writer = thread::spawn(move || append_lines(&writer_path, 8));
    let closer = close_when_caught_up(reader.handle(), writer);

    reader
        .tail_read(LineCountDirective::FromStart(0), true)
        .unwrap();
    let (bytes, _) = closer.join().unwrap();

    assert_eq!(reader.total_read_bytes(), bytes);
    let copied = reader.into_sink().into_inner();
    assert_eq!(copied, std::fs::read(&path).unwrap());
}

/// `FromEnd(0)` emits nothing that existed before the call.
#[test]
fn e2e_follow_from_end_skips_existing_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("existing.log");
    std::fs::write(&path, "old line one\nold line two\n").unwrap();

    let mut reader = TailReader::open(&path, RawCopySink::new(Vec::new()), fast()).unwrap();
    let writer_path = path.clone();
    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        append_lines(&writer_path, 3)
    });
    let closer = close_when_caught_up(reader.handle(), writer);

    reader
        .tail_read(LineCountDirective::FromEnd(0), true)
        .unwrap();
    let (bytes, _) = closer.join().unwrap();

    assert_eq!(reader.total_read_bytes(), bytes);
    let copied = String::from_utf8(reader.into_sink().into_inner()).unwrap();
    assert!(!copied.contains("old line"));
    assert!(copied.starts_with("worker 0 finished task\n"));
}

/// A line written in two appends, with a poll in between, comes out whole.
#[test]
fn e2e_follow_joins_line_split_across_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("split.log");
    File::create(&path).unwrap();

    let (sink, lines) = collecting_sink();
    let mut reader = TailReader::open(&path, sink, fast()).unwrap();
    let writer_path = path.clone();
    let writer = thread::spawn(move || {
        let mut bytes = append(&writer_path, "hello wor");
        thread::sleep(Duration::from_millis(150));
        bytes += append(&writer_path, "ld\nbye\n");
        (bytes, 2)
    });
    let closer = close_when_caught_up(reader.handle(), writer);

    reader
        .tail_read(LineCountDirective::FromStart(0), true)
        .unwrap();
    let (bytes, _) = closer.join().unwrap();

    assert_eq!(reader.total_read_bytes(), bytes);
    assert_eq!(*lines.lock().unwrap(), vec!["hello world", "bye"]);
}

/// Truncation restarts from offset 0 and drops the unterminated fragment
/// that was pending before it.
#[test]
fn e2e_follow_restarts_after_truncation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rotated.log");
    File::create(&path).unwrap();

    let (sink, lines) = collecting_sink();
    let mut reader = TailReader::open(&path, sink, fast()).unwrap();
    let writer_path = path.clone();
    let writer = thread::spawn(move || {
        let before = append(&writer_path, "old one\nold two\ndangling");
        thread::sleep(Duration::from_millis(200));
        std::fs::write(&writer_path, "new\n").unwrap();
        // Everything the reader consumes: the old content, then the new file.
        (before + 4, 3)
    });
    let closer = close_when_caught_up(reader.handle(), writer);

    reader
        .tail_read(LineCountDirective::FromStart(0), true)
        .unwrap();
    let (bytes, _) = closer.join().unwrap();

    assert_eq!(reader.total_read_bytes(), bytes);
    assert_eq!(reader.sink().pending_bytes(), 0);
    assert_eq!(*lines.lock().unwrap(), vec!["old one", "old two", "new"]);
}

#[test]
fn e2e_tail_read_after_close_is_closed_error() {
    let mut reader =
        TailReader::open(fixture("3-lines.txt"), RawCopySink::new(std::io::sink()), fast()).unwrap();
    reader
        .tail_read(LineCountDirective::FromStart(0), false)
        .unwrap();
    reader.close();
    reader.close();
    let err = reader
        .tail_read(LineCountDirective::FromStart(0), false)
        .unwrap_err();
    assert!(matches!(err, TailError::Closed { .. }), "{err:?}");
    assert_eq!(reader.total_read_bytes(), 183);
}

// =============================================================================
// Mining pipeline
// =============================================================================

#[test]
fn e2e_pipeline_generalises_last_token() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.log");
    std::fs::write(&path, "user login id=5\nuser login id=9\n").unwrap();

    let report = drain_file(&path, &PipelineOptions::default(), |_| {}).unwrap();
    assert_eq!(report.lines, 2);
    assert_eq!(report.bytes, 32);

    let clusters = report.drain.clusters();
    assert_eq!(clusters.len(), 1);
    assert_eq!(
        clusters[0].template(),
        &[
            TemplateSlot::Fixed("user".into()),
            TemplateSlot::Fixed("login".into()),
            TemplateSlot::Wildcard,
        ]
    );
    assert_eq!(clusters[0].sightings(), 2);
}

#[test]
fn e2e_pipeline_follow_mines_appended_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workers.log");
    File::create(&path).unwrap();

    let options = PipelineOptions {
        follow: true,
        tail: fast(),
        ..PipelineOptions::default()
    };

    let writer_path = path.clone();
    let (tx, rx) = std::sync::mpsc::channel();
    let writer = thread::spawn(move || {
        let handle: TailHandle = rx.recv().unwrap();
        let written = append_lines(&writer_path, 6);
        close_when_caught_up(handle, thread::spawn(move || written))
            .join()
            .unwrap()
    });

    let report = drain_file(&path, &options, |handle| tx.send(handle).unwrap()).unwrap();
    let (bytes, lines) = writer.join().unwrap();

    assert_eq!(report.bytes, bytes);
    assert_eq!(report.lines, lines);
    // "worker N finished task": the numeric token routes to one wildcard.
    assert_eq!(report.drain.cluster_count(), 1);
    assert_eq!(report.drain.clusters()[0].sightings(), lines);
}
