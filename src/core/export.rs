// DrainSleuth - core/export.rs
//
// Ranking and rendering of learned clusters (text and JSON).
// Core layer: writes to any Write trait object.

use crate::core::model::{LogCluster, TemplateSlot};
use crate::util::error::ExportError;
use serde::Serialize;
use std::io::Write;

/// Output rendering selected on the CLI or in config.toml.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One `"{sightings} {template}"` line per cluster.
    #[default]
    Text,
    /// A pretty-printed JSON array.
    Json,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Clusters ordered by sightings, most frequent first.
///
/// The sort is stable, so equally frequent clusters keep creation order.
pub fn rank(clusters: &[LogCluster]) -> Vec<&LogCluster> {
    let mut ranked: Vec<&LogCluster> = clusters.iter().collect();
    ranked.sort_by(|a, b| b.sightings().cmp(&a.sightings()));
    ranked
}

#[derive(Serialize)]
struct ClusterRecord<'a> {
    rank: usize,
    id: usize,
    sightings: u64,
    template: String,
    slots: &'a [TemplateSlot],
}

/// Write ranked clusters in the requested format, at most `top` of them.
///
/// Returns the number of clusters written.
pub fn write_clusters<W: Write>(
    ranked: &[&LogCluster],
    format: OutputFormat,
    top: Option<usize>,
    writer: W,
) -> Result<usize, ExportError> {
    let limit = top.unwrap_or(ranked.len()).min(ranked.len());
    let shown = &ranked[..limit];
    match format {
        OutputFormat::Text => export_text(shown, writer),
        OutputFormat::Json => export_json(shown, writer),
    }
}

/// Plain text, one cluster per line.
pub fn export_text<W: Write>(ranked: &[&LogCluster], mut writer: W) -> Result<usize, ExportError> {
    for cluster in ranked {
        writeln!(writer, "{cluster}").map_err(|e| ExportError::Io { source: e })?;
    }
    writer.flush().map_err(|e| ExportError::Io { source: e })?;
    Ok(ranked.len())
}

/// JSON array of `{rank, id, sightings, template, slots}` objects.
pub fn export_json<W: Write>(ranked: &[&LogCluster], mut writer: W) -> Result<usize, ExportError> {
    let records: Vec<ClusterRecord<'_>> = ranked
        .iter()
        .enumerate()
        .map(|(i, c)| ClusterRecord {
            rank: i + 1,
            id: c.id(),
            sightings: c.sightings(),
            template: c.template_text(),
            slots: c.template(),
        })
        .collect();

    serde_json::to_writer_pretty(&mut writer, &records)
        .map_err(|e| ExportError::Json { source: e })?;
    writeln!(writer).map_err(|e| ExportError::Io { source: e })?;
    Ok(records.len())
}
