// DrainSleuth - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies (Atlas Layer Rule: Core depends on std, serde and tracing only).
//
// These types are the shared vocabulary across all layers.

use serde::Serialize;
use std::fmt;

// =============================================================================
// Start position
// =============================================================================

/// Where tailing begins, expressed in whole lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCountDirective {
    /// Skip `count` complete lines from the beginning of the file.
    FromStart(u64),
    /// Begin at the start of the `count`-th line before end-of-file.
    FromEnd(u64),
}

impl Default for LineCountDirective {
    /// Replay the whole file.
    fn default() -> Self {
        Self::FromStart(0)
    }
}

// =============================================================================
// Text encoding
// =============================================================================

/// Byte-oriented encodings the line decoder understands.
///
/// Only encodings in which `\n` is a single 0x0A byte are supported, since
/// line boundaries are located on raw bytes before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// UTF-8; malformed sequences decode to U+FFFD.
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    Latin1,
}

impl TextEncoding {
    /// Parse a user-supplied encoding name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Some(Self::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Some(Self::Latin1),
            _ => None,
        }
    }

    /// Decode one complete line.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

// =============================================================================
// Templates and clusters
// =============================================================================

/// Stable index of a cluster inside its tree's arena.
pub type ClusterId = usize;

/// One position of a learned template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSlot {
    /// A literal token every sighting so far agreed on.
    Fixed(String),
    /// A position where sightings disagreed. Never reverts to `Fixed`.
    Wildcard,
}

impl TemplateSlot {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

impl fmt::Display for TemplateSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(text) => f.write_str(text),
            Self::Wildcard => f.write_str(crate::util::constants::WILDCARD_TEXT),
        }
    }
}

/// One learned template plus its sighting counter.
///
/// `token_count` is fixed at creation; `sightings` only increases and
/// `template` only generalises (Fixed -> Wildcard).  Fields are private so
/// those invariants can only be changed through [`LogCluster::reinforce`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogCluster {
    id: ClusterId,
    template: Vec<TemplateSlot>,
    sightings: u64,
}

impl LogCluster {
    /// Seed a cluster from the tokens of its first sighting.
    pub fn new(id: ClusterId, tokens: &[&str]) -> Self {
        Self {
            id,
            template: tokens
                .iter()
                .map(|t| TemplateSlot::Fixed((*t).to_string()))
                .collect(),
            sightings: 1,
        }
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn token_count(&self) -> usize {
        self.template.len()
    }

    pub fn template(&self) -> &[TemplateSlot] {
        &self.template
    }

    pub fn sightings(&self) -> u64 {
        self.sightings
    }

    /// Number of fixed slots equal to the token at the same position.
    ///
    /// Wildcards count neither as a match nor as a mismatch.
    pub fn matching_tokens(&self, tokens: &[&str]) -> usize {
        self.template
            .iter()
            .zip(tokens)
            .filter(|&(slot, &token)| matches!(slot, TemplateSlot::Fixed(text) if text == token))
            .count()
    }

    /// Fraction of positions whose fixed slot equals the line's token.
    pub fn similarity(&self, tokens: &[&str]) -> f64 {
        if self.template.is_empty() {
            return 0.0;
        }
        self.matching_tokens(tokens) as f64 / self.template.len() as f64
    }

    /// Record a sighting: every fixed slot that disagrees with `tokens`
    /// becomes a wildcard.
    pub fn reinforce(&mut self, tokens: &[&str]) {
        debug_assert_eq!(tokens.len(), self.template.len());
        for (slot, &token) in self.template.iter_mut().zip(tokens) {
            let differs = matches!(slot, TemplateSlot::Fixed(text) if text.as_str() != token);
            if differs {
                *slot = TemplateSlot::Wildcard;
            }
        }
        self.sightings += 1;
    }

    /// The template rendered with single spaces between slots.
    pub fn template_text(&self) -> String {
        self.template
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for LogCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8} {}", self.sightings, self.template_text())
    }
}
