// DrainSleuth - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation (DevWorkflow Part A Rule 13).
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for DrainSleuth configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/drainsleuth/ or %APPDATA%\DrainSleuth\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation (Rule 13)
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility -- a newer
/// config file can be used with an older binary without crashing.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[tail]` section.
    pub tail: TailSection,
    /// `[drain]` section.
    pub drain: DrainSection,
    /// `[output]` section.
    pub output: OutputSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[tail]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct TailSection {
    /// Follow-mode poll interval in ms.
    pub poll_interval_ms: Option<u64>,
    /// Memory-map large catch-up transfers.
    pub use_mmap: Option<bool>,
    /// Text encoding name ("utf8" or "latin1").
    pub encoding: Option<String>,
}

/// `[drain]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DrainSection {
    /// Prefix-tree depth below the token-count level.
    pub depth: Option<usize>,
    /// Extra token separators, one per character.
    pub additional_delimiters: Option<String>,
    /// Drop this many leading characters before mining.
    pub parse_after_col: Option<usize>,
    /// Mine only the text after this marker.
    pub parse_after_str: Option<String>,
}

/// `[output]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// "text" or "json".
    pub format: Option<String>,
    /// Print at most this many clusters.
    pub top: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// All values are validated against named constants at load time (Rule 13).
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Tail --
    pub poll_interval_ms: u64,
    pub use_mmap: bool,
    pub encoding: String,

    // -- Drain --
    pub depth: usize,
    pub additional_delimiters: String,
    pub parse_after_col: usize,
    pub parse_after_str: String,

    // -- Output --
    pub format: String,
    pub top: Option<usize>,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            use_mmap: true,
            encoding: "utf8".to_string(),
            depth: constants::DEFAULT_DEPTH,
            additional_delimiters: constants::DEFAULT_ADDITIONAL_DELIMITERS.to_string(),
            parse_after_col: 0,
            parse_after_str: String::new(),
            format: "text".to_string(),
            top: None,
            log_level: None,
        }
    }
}

/// Load and validate a config file.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unparseable, returns defaults with a warning so the tool
/// still runs but the user is informed.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            warnings.push(format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            ));
            return (AppConfig::default(), warnings);
        }
    };

    match toml::from_str::<RawConfig>(&content) {
        Ok(raw) => validate(raw),
        Err(e) => {
            warnings.push(format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            ));
            (AppConfig::default(), warnings)
        }
    }
}

/// Validate each field against named constants, accumulating all problems.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let mut config = AppConfig::default();

    // -- Tail: poll_interval_ms --
    if let Some(ms) = raw.tail.poll_interval_ms {
        if (constants::MIN_POLL_INTERVAL_MS..=constants::MAX_POLL_INTERVAL_MS).contains(&ms) {
            config.poll_interval_ms = ms;
        } else {
            warnings.push(format!(
                "[tail] poll_interval_ms = {ms} is out of range ({}-{}). Using default ({}).",
                constants::MIN_POLL_INTERVAL_MS,
                constants::MAX_POLL_INTERVAL_MS,
                constants::DEFAULT_POLL_INTERVAL_MS,
            ));
        }
    }

    if let Some(use_mmap) = raw.tail.use_mmap {
        config.use_mmap = use_mmap;
    }

    // -- Tail: encoding --
    if let Some(ref encoding) = raw.tail.encoding {
        if crate::core::model::TextEncoding::from_name(encoding).is_some() {
            config.encoding = encoding.clone();
        } else {
            warnings.push(format!(
                "[tail] encoding = \"{encoding}\" is not recognised. \
                 Valid values: utf8, latin1. Using default (utf8).",
            ));
        }
    }

    // -- Drain: depth --
    if let Some(depth) = raw.drain.depth {
        if (1..=constants::MAX_DEPTH).contains(&depth) {
            config.depth = depth;
        } else {
            warnings.push(format!(
                "[drain] depth = {depth} is out of range (1-{}). Using default ({}).",
                constants::MAX_DEPTH,
                constants::DEFAULT_DEPTH,
            ));
        }
    }

    if let Some(delims) = raw.drain.additional_delimiters {
        config.additional_delimiters = delims;
    }
    if let Some(col) = raw.drain.parse_after_col {
        config.parse_after_col = col;
    }
    if let Some(marker) = raw.drain.parse_after_str {
        config.parse_after_str = marker;
    }

    // -- Output: format --
    if let Some(ref format) = raw.output.format {
        if crate::core::export::OutputFormat::from_name(format).is_some() {
            config.format = format.clone();
        } else {
            warnings.push(format!(
                "[output] format = \"{format}\" is not recognised. \
                 Expected \"text\" or \"json\". Using default (text).",
            ));
        }
    }

    // -- Output: top --
    match raw.output.top {
        Some(0) => warnings.push("[output] top = 0 would print nothing. Showing all clusters.".to_string()),
        Some(n) => config.top = Some(n),
        None => {}
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    (config, warnings)
}
