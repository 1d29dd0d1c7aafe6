// DrainSleuth - core/drain.rs
//
// Online log template mining over a fixed-depth prefix tree.
//
// Layout:
//   - Level 0 buckets lines by token count; lines of different lengths never
//     share a cluster.
//   - Levels 1..=depth key on the token at that position.  Each node has at
//     most one wildcard branch ("<*>") absorbing tokens with no exact branch.
//     Tokens containing a digit, and tokens arriving at a node that already
//     has MAX_CHILDREN exact branches, are routed to the wildcard branch.
//   - The final token of a line never forms a branch, so lines that differ
//     only in their last token land in the same leaf.
//   - Leaves hold cluster ids; clusters live in an arena owned by the tree
//     and are never re-indexed after creation.
//
// Not thread-safe by itself: `parse_log_message` takes `&mut self`.

use crate::core::model::{ClusterId, LogCluster};
use crate::util::constants::{
    DEFAULT_ADDITIONAL_DELIMITERS, DEFAULT_DEPTH, MAX_CHILDREN, SIMILARITY_THRESHOLD,
    WILDCARD_BRANCH,
};
use std::collections::HashMap;

// =============================================================================
// Configuration
// =============================================================================

/// Parameters of the template miner.
#[derive(Debug, Clone)]
pub struct DrainConfig {
    /// Prefix-tree levels below the token-count level.  Must be positive.
    pub depth: usize,
    /// Token separators used in addition to whitespace.
    pub additional_delimiters: Vec<char>,
    /// Minimum similarity for a line to reinforce an existing cluster.
    pub similarity_threshold: f64,
    /// Maximum exact-token branches per node.
    pub max_children: usize,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            additional_delimiters: DEFAULT_ADDITIONAL_DELIMITERS.chars().collect(),
            similarity_threshold: SIMILARITY_THRESHOLD,
            max_children: MAX_CHILDREN,
        }
    }
}

// =============================================================================
// Tokenizer
// =============================================================================

/// Split `line` on whitespace and on any of `additional_delimiters`.
///
/// Empty tokens are discarded, so an empty or all-separator line yields none.
pub fn tokenize<'a>(line: &'a str, additional_delimiters: &[char]) -> Vec<&'a str> {
    line.split(|c: char| c.is_whitespace() || additional_delimiters.contains(&c))
        .filter(|t| !t.is_empty())
        .collect()
}

fn has_digit(token: &str) -> bool {
    token.bytes().any(|b| b.is_ascii_digit())
}

// =============================================================================
// Prefix tree
// =============================================================================

#[derive(Debug, Default)]
struct Node {
    children: HashMap<String, Node>,
    /// Populated on leaves only, in insertion order.
    clusters: Vec<ClusterId>,
}

impl Node {
    fn exact_children(&self) -> usize {
        self.children.len() - usize::from(self.children.contains_key(WILDCARD_BRANCH))
    }

    fn child_for(&self, token: &str) -> Option<&Node> {
        self.children
            .get(token)
            .or_else(|| self.children.get(WILDCARD_BRANCH))
    }
}

/// Template miner: routes each line to a leaf group, scores it against the
/// clusters there, then reinforces the best one or seeds a new cluster.
#[derive(Debug)]
pub struct Drain {
    config: DrainConfig,
    /// Level 0, keyed by token count.
    roots: HashMap<usize, Node>,
    /// Arena; a cluster's id is its index.
    clusters: Vec<LogCluster>,
}

impl Drain {
    /// Build an empty miner.
    ///
    /// # Panics
    /// If `config.depth` is zero or the similarity threshold is outside
    /// `0.0..=1.0`; both indicate a caller bug.
    pub fn new(config: DrainConfig) -> Self {
        assert!(config.depth > 0, "drain depth must be at least 1");
        assert!(
            (0.0..=1.0).contains(&config.similarity_threshold),
            "similarity threshold must lie in 0.0..=1.0"
        );
        Self {
            config,
            roots: HashMap::new(),
            clusters: Vec::new(),
        }
    }

    pub fn config(&self) -> &DrainConfig {
        &self.config
    }

    /// Every cluster learned so far, in creation order.
    ///
    /// Ranking is left to the caller (see `core::export::rank`).
    pub fn clusters(&self) -> &[LogCluster] {
        &self.clusters
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&LogCluster> {
        self.clusters.get(id)
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Feed one line.
    ///
    /// Returns the id of the cluster that absorbed or was seeded by the line,
    /// or `None` when the line has no tokens.
    pub fn parse_log_message(&mut self, line: &str) -> Option<ClusterId> {
        let tokens = tokenize(line, &self.config.additional_delimiters);
        if tokens.is_empty() {
            return None;
        }

        match self.tree_search(&tokens) {
            Some(id) => {
                self.clusters[id].reinforce(&tokens);
                Some(id)
            }
            None => {
                let id = self.clusters.len();
                self.clusters.push(LogCluster::new(id, &tokens));
                self.add_to_prefix_tree(&tokens, id);
                tracing::trace!(id, tokens = tokens.len(), "New cluster");
                Some(id)
            }
        }
    }

    /// Number of prefix levels walked for a line of `token_count` tokens.
    fn prefix_len(&self, token_count: usize) -> usize {
        self.config.depth.min(token_count.saturating_sub(1))
    }

    /// Best cluster in the line's leaf group, if it is similar enough.
    fn tree_search(&self, tokens: &[&str]) -> Option<ClusterId> {
        let mut node = self.roots.get(&tokens.len())?;
        for token in &tokens[..self.prefix_len(tokens.len())] {
            node = node.child_for(token)?;
        }

        let (id, similarity) = self.best_candidate(&node.clusters, tokens)?;
        (similarity >= self.config.similarity_threshold).then_some(id)
    }

    /// Highest-similarity candidate; ties keep the earliest inserted.
    fn best_candidate(&self, candidates: &[ClusterId], tokens: &[&str]) -> Option<(ClusterId, f64)> {
        let mut best: Option<(ClusterId, f64)> = None;
        for &id in candidates {
            let cluster = &self.clusters[id];
            if cluster.token_count() != tokens.len() {
                continue;
            }
            let similarity = cluster.similarity(tokens);
            if best.map_or(true, |(_, s)| similarity > s) {
                best = Some((id, similarity));
            }
        }
        best
    }

    fn add_to_prefix_tree(&mut self, tokens: &[&str], id: ClusterId) {
        let prefix = self.prefix_len(tokens.len());
        let max_children = self.config.max_children;

        let mut node = self.roots.entry(tokens.len()).or_default();
        for &token in &tokens[..prefix] {
            let key = if node.children.contains_key(token) {
                token
            } else if has_digit(token) || node.exact_children() >= max_children {
                WILDCARD_BRANCH
            } else {
                token
            };
            node = node.children.entry(key.to_string()).or_default();
        }
        node.clusters.push(id);
    }
}

impl Default for Drain {
    fn default() -> Self {
        Self::new(DrainConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::TemplateSlot;

    fn fixed(s: &str) -> TemplateSlot {
        TemplateSlot::Fixed(s.to_string())
    }

    #[test]
    fn test_tokenize_whitespace_and_extra_delimiters() {
        assert_eq!(
            tokenize("  a_b\tc  d__e ", &['_']),
            vec!["a", "b", "c", "d", "e"]
        );
        assert!(tokenize("", &['_']).is_empty());
        assert!(tokenize(" _ \t", &['_']).is_empty());
    }

    #[test]
    fn test_empty_line_is_noop() {
        let mut drain = Drain::default();
        assert_eq!(drain.config().depth, DEFAULT_DEPTH);
        assert_eq!(drain.config().additional_delimiters, vec!['_']);
        assert_eq!(drain.parse_log_message("   "), None);
        assert_eq!(drain.cluster_count(), 0);
    }

    #[test]
    fn test_same_line_twice_reinforces_one_cluster() {
        let mut drain = Drain::default();
        let a = drain.parse_log_message("connection closed by peer");
        let b = drain.parse_log_message("connection closed by peer");
        assert_eq!(a, b);
        assert_eq!(drain.cluster_count(), 1);
        assert_eq!(drain.clusters()[0].sightings(), 2);
    }

    #[test]
    fn test_last_token_generalises() {
        let mut drain = Drain::default();
        drain.parse_log_message("user login id=5");
        drain.parse_log_message("user login id=9");
        assert_eq!(drain.cluster_count(), 1);
        let c = &drain.clusters()[0];
        assert_eq!(
            c.template(),
            &[fixed("user"), fixed("login"), TemplateSlot::Wildcard]
        );
        assert_eq!(c.sightings(), 2);
    }

    #[test]
    fn test_generalisation_is_monotonic() {
        let mut drain = Drain::default();
        drain.parse_log_message("job alpha on node1 started ok");
        drain.parse_log_message("job alpha on node1 finished ok");
        drain.parse_log_message("job alpha on node1 started ok");
        assert_eq!(drain.cluster_count(), 1);
        let c = &drain.clusters()[0];
        assert_eq!(c.template()[4], TemplateSlot::Wildcard);
        assert_eq!(c.sightings(), 3);
    }

    #[test]
    fn test_different_token_counts_never_merge() {
        let mut drain = Drain::default();
        drain.parse_log_message("disk full");
        drain.parse_log_message("disk full now");
        assert_eq!(drain.cluster_count(), 2);
        assert!(drain.clusters().iter().all(|c| c.sightings() == 1));
    }

    #[test]
    fn test_dissimilar_lines_in_same_leaf_stay_apart() {
        let mut drain = Drain::new(DrainConfig {
            depth: 1,
            ..DrainConfig::default()
        });
        // Same leaf ("kernel"), but only 1/5 fixed tokens agree.
        drain.parse_log_message("kernel a b c d");
        drain.parse_log_message("kernel v w x y");
        assert_eq!(drain.cluster_count(), 2);
    }

    #[test]
    fn test_numeric_prefix_tokens_share_wildcard_branch() {
        let mut drain = Drain::default();
        drain.parse_log_message("pid 100 exited with status 0");
        drain.parse_log_message("pid 200 exited with status 0");
        assert_eq!(drain.cluster_count(), 1);
        assert_eq!(drain.clusters()[0].template_text(), "pid <*> exited with status 0");
    }

    #[test]
    fn test_additional_delimiter_splits_tokens() {
        let mut drain = Drain::default();
        drain.parse_log_message("worker_3 ready");
        let c = &drain.clusters()[0];
        assert_eq!(c.token_count(), 3);
    }

    #[test]
    fn test_max_children_overflow_routes_to_wildcard() {
        let mut drain = Drain::new(DrainConfig {
            max_children: 2,
            ..DrainConfig::default()
        });
        drain.parse_log_message("alpha service up");
        drain.parse_log_message("beta service up");
        // Third distinct first token goes to the wildcard branch.
        drain.parse_log_message("gamma service up");
        // Fourth also lands under the wildcard and merges with gamma.
        drain.parse_log_message("delta service up");
        assert_eq!(drain.cluster_count(), 3);
        let merged = drain.cluster(2).unwrap();
        assert_eq!(merged.template_text(), "<*> service up");
        assert_eq!(merged.sightings(), 2);
    }

    #[test]
    fn test_tie_keeps_first_inserted_cluster() {
        let mut drain = Drain::new(DrainConfig {
            depth: 1,
            similarity_threshold: 0.5,
            ..DrainConfig::default()
        });
        // Both seeds land in the "get" leaf but agree on 1/4 tokens only.
        drain.parse_log_message("get a b x");
        drain.parse_log_message("get c d y");
        assert_eq!(drain.cluster_count(), 2);
        // Equally similar (2/4) to both clusters.
        let id = drain.parse_log_message("get a d z");
        assert_eq!(id, Some(0));
    }

    #[test]
    #[should_panic(expected = "depth")]
    fn test_zero_depth_is_rejected() {
        let _ = Drain::new(DrainConfig {
            depth: 0,
            ..DrainConfig::default()
        });
    }
}
