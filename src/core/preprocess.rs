// DrainSleuth - core/preprocess.rs
//
// Trims the volatile head of a line (timestamps, hostnames, pids) before it
// is tokenised, so templates are mined from the message part only.

/// Where the message part of a line begins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LineStart {
    /// Use the whole line.
    #[default]
    Whole,
    /// Drop the first N characters.
    AfterColumn(usize),
    /// Keep the text after the first occurrence of a marker.  Lines without
    /// the marker are kept whole.
    AfterMarker(String),
}

impl LineStart {
    /// Build from the two config knobs; a column wins over a marker.
    pub fn from_options(parse_after_col: usize, parse_after_str: &str) -> Self {
        if parse_after_col > 0 {
            Self::AfterColumn(parse_after_col)
        } else if !parse_after_str.is_empty() {
            Self::AfterMarker(parse_after_str.to_string())
        } else {
            Self::Whole
        }
    }

    /// The part of `line` that should be mined.
    pub fn apply<'a>(&self, line: &'a str) -> &'a str {
        match self {
            Self::Whole => line,
            Self::AfterColumn(col) => match line.char_indices().nth(*col) {
                Some((idx, _)) => &line[idx..],
                None => "",
            },
            Self::AfterMarker(marker) => match line.find(marker.as_str()) {
                Some(idx) => &line[idx + marker.len()..],
                None => line,
            },
        }
    }
}
