// DrainSleuth - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and validation
// 3. Logging initialisation (debug mode support)
// 4. Running the mining pipeline (or raw copy) and printing ranked clusters

pub use drainsleuth::app;
pub use drainsleuth::core;
pub use drainsleuth::platform;
pub use drainsleuth::util;

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::app::pipeline::{self, PipelineOptions};
use crate::app::tail::{TailHandle, TailOptions};
use crate::core::drain::DrainConfig;
use crate::core::export::{self, OutputFormat};
use crate::core::model::{LineCountDirective, TextEncoding};
use crate::core::preprocess::LineStart;
use crate::platform::config::{self as app_config, AppConfig, PlatformPaths};
use crate::util::constants;
use crate::util::error::{ConfigError, ExportError};

/// DrainSleuth - mine log templates from a file, optionally following it.
///
/// Reads a log file from a chosen line, groups structurally similar lines
/// into templates and prints them ranked by how often they were seen.
#[derive(Parser, Debug)]
#[command(name = "drainsleuth", version, about)]
struct Cli {
    /// Log file to read.
    file: PathBuf,

    /// Start at the N-th line before the end of the file.
    #[arg(short = 'n', long = "tail", conflicts_with = "from_start")]
    tail: Option<u64>,

    /// Skip the first N lines of the file.
    #[arg(short = 's', long = "from-start")]
    from_start: Option<u64>,

    /// Keep reading appended lines until interrupted (Ctrl-C).
    #[arg(short = 'f', long = "follow")]
    follow: bool,

    /// Copy the selected bytes to stdout instead of mining templates.
    #[arg(long = "raw")]
    raw: bool,

    /// Prefix-tree depth below the token-count level.
    #[arg(long = "depth")]
    depth: Option<usize>,

    /// Extra token separators, in addition to whitespace.
    #[arg(long = "delimiters")]
    delimiters: Option<String>,

    /// Ignore the first N characters of every line.
    #[arg(long = "parse-after-col")]
    parse_after_col: Option<usize>,

    /// Only mine the text after the first occurrence of this marker.
    #[arg(long = "parse-after-str")]
    parse_after_str: Option<String>,

    /// Text encoding of the file: utf8 or latin1.
    #[arg(long = "encoding", value_parser = parse_encoding)]
    encoding: Option<TextEncoding>,

    /// Output format: text or json.
    #[arg(long = "format", value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Print only the N most frequent clusters.
    #[arg(long = "top")]
    top: Option<usize>,

    /// Alternative config.toml location.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Report progress and a run summary.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn parse_encoding(s: &str) -> Result<TextEncoding, String> {
    TextEncoding::from_name(s).ok_or_else(|| format!("unknown encoding '{s}' (expected utf8 or latin1)"))
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_name(s).ok_or_else(|| format!("unknown format '{s}' (expected text or json)"))
}

impl Cli {
    fn directive(&self) -> LineCountDirective {
        match (self.tail, self.from_start) {
            (Some(n), _) => LineCountDirective::FromEnd(n),
            (None, Some(n)) => LineCountDirective::FromStart(n),
            (None, None) => LineCountDirective::FromStart(0),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_file());
    let (config, config_warnings) = app_config::load_config(&config_path);

    util::logging::init(cli.debug, config.log_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        file = %cli.file.display(),
        "DrainSleuth starting"
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config validation warning");
    }

    if let Err(e) = run(&cli, &config) {
        tracing::error!(error = %e, "Run failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli, config: &AppConfig) -> util::error::Result<()> {
    let tail = TailOptions {
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        use_mmap: config.use_mmap,
    };

    if cli.raw {
        let stdout = std::io::stdout();
        let bytes = pipeline::copy_file(
            &cli.file,
            cli.directive(),
            cli.follow,
            tail,
            stdout.lock(),
            close_on_ctrlc,
        )?;
        tracing::debug!(bytes, "Raw copy finished");
        return Ok(());
    }

    let depth = cli.depth.unwrap_or(config.depth);
    if !(1..=constants::MAX_DEPTH).contains(&depth) {
        return Err(ConfigError::ValueOutOfRange {
            field: "depth".to_string(),
            value: depth.to_string(),
            expected: format!("1-{}", constants::MAX_DEPTH),
        }
        .into());
    }

    let delimiters = cli
        .delimiters
        .as_deref()
        .unwrap_or(&config.additional_delimiters);
    let options = PipelineOptions {
        directive: cli.directive(),
        follow: cli.follow,
        encoding: cli
            .encoding
            .or_else(|| TextEncoding::from_name(&config.encoding))
            .unwrap_or_default(),
        line_start: LineStart::from_options(
            cli.parse_after_col.unwrap_or(config.parse_after_col),
            cli.parse_after_str
                .as_deref()
                .unwrap_or(&config.parse_after_str),
        ),
        drain: DrainConfig {
            depth,
            additional_delimiters: delimiters.chars().collect(),
            ..DrainConfig::default()
        },
        tail,
        verbose: cli.verbose,
    };

    let report = pipeline::drain_file(&cli.file, &options, close_on_ctrlc)?;

    let format = cli
        .format
        .or_else(|| OutputFormat::from_name(&config.format))
        .unwrap_or_default();
    let top = cli.top.or(config.top);
    let ranked = export::rank(report.drain.clusters());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    export::write_clusters(&ranked, format, top, &mut out)?;
    out.flush().map_err(|e| ExportError::Io { source: e })?;
    Ok(())
}

/// Close the reader on Ctrl-C so follow mode ends and results still print.
fn close_on_ctrlc(handle: TailHandle) {
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Interrupt received, stopping");
        handle.close();
    }) {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_directive_defaults_to_whole_file() {
        let cli = Cli::parse_from(["drainsleuth", "app.log"]);
        assert_eq!(cli.directive(), LineCountDirective::FromStart(0));
    }

    #[test]
    fn test_cli_tail_and_from_start_conflict() {
        assert!(Cli::try_parse_from(["drainsleuth", "a.log", "-n", "5", "-s", "2"]).is_err());
        let cli = Cli::parse_from(["drainsleuth", "a.log", "--tail", "5", "-f"]);
        assert_eq!(cli.directive(), LineCountDirective::FromEnd(5));
        assert!(cli.follow);
    }

    #[test]
    fn test_cli_rejects_unknown_encoding() {
        assert!(Cli::try_parse_from(["drainsleuth", "a.log", "--encoding", "utf16"]).is_err());
        let cli = Cli::parse_from(["drainsleuth", "a.log", "--encoding", "latin1", "--format", "json"]);
        assert_eq!(cli.encoding, Some(TextEncoding::Latin1));
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }
}
