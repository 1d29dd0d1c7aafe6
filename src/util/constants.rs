// DrainSleuth - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Referenced by DevWorkflow Part A Rule 11 (explicit named-constant limits).

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "DrainSleuth";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "DrainSleuth";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Reading limits
// =============================================================================

/// Read chunk size in bytes for streaming transfers and position scans.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024; // 64 KB

/// Catch-up transfers at least this large are served from a memory map
/// instead of buffered reads.
pub const MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MB

/// Maximum accumulated size of the carry-over buffer holding a line that has
/// not been terminated yet.
///
/// Guards against OOM when the input contains no newlines at all (binary
/// content, a file opened by mistake).  Lines longer than this are dropped
/// with a warning rather than buffered without bound (Rule 11).
pub const MAX_PARTIAL_LINE_BYTES: usize = 4 * 1024 * 1024; // 4 MiB

// =============================================================================
// Follow mode
// =============================================================================

/// How often follow mode re-checks the file size for appended bytes (ms).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Minimum user-configurable poll interval (ms).
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Maximum user-configurable poll interval (ms).
pub const MAX_POLL_INTERVAL_MS: u64 = 10_000; // 10 s

// =============================================================================
// Template mining
// =============================================================================

/// Default number of prefix-tree levels below the token-count level.
pub const DEFAULT_DEPTH: usize = 4;

/// Hard upper bound on the prefix-tree depth.
pub const MAX_DEPTH: usize = 32;

/// Extra token separators used in addition to whitespace.
pub const DEFAULT_ADDITIONAL_DELIMITERS: &str = "_";

/// Minimum similarity (matched fixed tokens / token count) for a line to
/// reinforce an existing cluster instead of seeding a new one.
pub const SIMILARITY_THRESHOLD: f64 = 0.4;

/// Maximum number of exact-token branches per tree node.  Further distinct
/// tokens at that level route through the wildcard branch.
pub const MAX_CHILDREN: usize = 100;

/// Rendering of a wildcard slot in a printed template.
pub const WILDCARD_TEXT: &str = "<*>";

/// Key of the fallback branch at each prefix-tree level.
pub const WILDCARD_BRANCH: &str = "<*>";

// =============================================================================
// Pipeline reporting
// =============================================================================

/// Verbose mode reports the running cluster count every this many lines.
pub const PROGRESS_EVERY_LINES: u64 = 10_000;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
/// Prevents accidental exposure of sensitive data in long lines.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
