//! Free-text to entry-node matching
//!
//! A small token scorer: exact words, crude stems, domain synonyms and
//! typo tolerance, plus bonuses for phrase order and specific levels. It
//! only proposes entry nodes; the engine never sees the text.

use indexmap::IndexMap;
use intent_graph::{HierarchyLevel, NodeId, NodeMap};
use intent_rationalization::levenshtein;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const DEFAULT_STOP_WORDS: [&str; 21] = [
    "i", "want", "to", "need", "the", "a", "an", "and", "or", "but", "in", "on", "at", "for", "with", "from", "by",
    "about", "my", "our", "we",
];

const SUFFIXES: [&str; 9] = ["ing", "ed", "er", "est", "ly", "ness", "ment", "s", "es"];

/// Confidence band of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    /// Score above 0.7
    High,
    /// Score above 0.4
    Medium,
    /// Anything kept below that
    Low,
}

impl MatchConfidence {
    /// Band for a score
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Self::High
        } else if score > 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One scored candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Candidate node
    pub node: NodeId,
    /// Its label
    pub label: String,
    /// Its level
    pub level: HierarchyLevel,
    /// Score in `(min_score, 1.0]`
    pub score: f64,
    /// Node tokens that matched, in input order
    pub matched_words: Vec<String>,
    /// Band
    pub confidence: MatchConfidence,
}

/// Tables and limits for [`TokenMatcher`]
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Tokens dropped from both input and labels
    pub stop_words: HashSet<String>,
    /// Synonym groups: key plus its synonyms are interchangeable
    pub synonyms: IndexMap<String, Vec<String>>,
    /// Irregular word form to base form
    pub word_forms: IndexMap<String, String>,
    /// Candidates must score strictly above this
    pub min_score: f64,
    /// Default result count
    pub top_n: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(ToString::to_string).collect(),
            synonyms: IndexMap::new(),
            word_forms: IndexMap::new(),
            min_score: 0.2,
            top_n: 5,
        }
    }
}

impl MatcherConfig {
    /// With synonym groups
    #[must_use]
    pub fn with_synonyms(mut self, synonyms: IndexMap<String, Vec<String>>) -> Self {
        self.synonyms = synonyms
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.into_iter().map(|s| s.to_lowercase()).collect()))
            .collect();
        self
    }

    /// With word forms
    #[must_use]
    pub fn with_word_forms(mut self, word_forms: IndexMap<String, String>) -> Self {
        self.word_forms = word_forms
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
            .collect();
        self
    }

    /// With result count
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Lowercase word tokens without stop words
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty() && !self.stop_words.contains(*w))
            .map(str::to_string)
            .collect()
    }

    /// Base form via the word-form table, else by stripping one suffix
    #[must_use]
    pub fn stem(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if let Some(base) = self.word_forms.get(&lower) {
            return base.clone();
        }
        for suffix in SUFFIXES {
            if lower.len() > suffix.len() + 2 && lower.ends_with(suffix) {
                return lower[..lower.len() - suffix.len()].to_string();
            }
        }
        lower
    }

    /// Both words appear in one synonym group
    #[must_use]
    pub fn are_synonyms(&self, a: &str, b: &str) -> bool {
        self.synonyms.iter().any(|(key, group)| {
            let has = |w: &str| key == w || group.iter().any(|s| s == w);
            has(a) && has(b)
        })
    }

    fn word_score(&self, input: &str, node: &str) -> (f64, MatchKind) {
        if input == node {
            return (1.0, MatchKind::Exact);
        }
        if self.stem(input) == self.stem(node) {
            return (0.8, MatchKind::Stem);
        }
        if self.are_synonyms(input, node) {
            return (0.7, MatchKind::Synonym);
        }
        let distance = levenshtein(input, node);
        let max_len = input.chars().count().max(node.chars().count());
        if max_len > 4 && distance <= 2 {
            #[allow(clippy::cast_precision_loss)]
            let score = 0.5 * (1.0 - distance as f64 / max_len as f64);
            return (score, MatchKind::Fuzzy);
        }
        (0.0, MatchKind::Fuzzy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Exact,
    Stem,
    Synonym,
    Fuzzy,
}

/// Proposes entry nodes for free text
pub trait NodeMatcher {
    /// Up to `top_n` candidates, best first
    fn find_best_matches(&self, text: &str, top_n: usize) -> Vec<MatchResult>;

    /// Single best candidate
    fn find_best_match(&self, text: &str) -> Option<MatchResult> {
        self.find_best_matches(text, 1).into_iter().next()
    }
}

/// Entry node proposed for a query, with ambiguity information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuery {
    /// Original text
    pub text: String,
    /// Node to resolve
    pub entry_node: NodeId,
    /// Score of the chosen node
    pub match_confidence: f64,
    /// Label of the chosen node
    pub matched_node_label: String,
    /// Several products offer the same function
    pub is_ambiguous: bool,
    /// Other candidates
    pub alternatives: Vec<MatchResult>,
}

/// Token-similarity matcher over one node map
#[derive(Debug, Clone)]
pub struct TokenMatcher<'a> {
    nodes: &'a NodeMap,
    config: &'a MatcherConfig,
}

impl<'a> TokenMatcher<'a> {
    /// Create matcher
    #[must_use]
    pub fn new(nodes: &'a NodeMap, config: &'a MatcherConfig) -> Self {
        Self { nodes, config }
    }

    fn score(&self, input: &[String], level: HierarchyLevel, label: &str) -> (f64, Vec<String>) {
        let label_tokens = self.config.tokenize(label);
        let mut used: HashSet<&str> = HashSet::new();
        let mut matched: Vec<String> = Vec::new();
        let mut total = 0.0;
        let (mut exact, mut synonym) = (0_u32, 0_u32);

        for word in input {
            let mut best: Option<(&str, f64, MatchKind)> = None;
            for token in &label_tokens {
                if used.contains(token.as_str()) {
                    continue;
                }
                let (score, kind) = self.config.word_score(word, token);
                if score > best.map_or(0.0, |(_, s, _)| s) {
                    best = Some((token.as_str(), score, kind));
                }
            }
            if let Some((token, score, kind)) = best {
                total += score;
                matched.push(token.to_string());
                used.insert(token);
                match kind {
                    MatchKind::Exact => exact += 1,
                    MatchKind::Synonym => synonym += 1,
                    MatchKind::Stem | MatchKind::Fuzzy => {}
                }
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let n = input.len() as f64;
        #[allow(clippy::cast_precision_loss)]
        let ratio = matched.len() as f64 / n;

        let exact_bonus = f64::from(exact) / n * 0.15;
        let synonym_penalty = f64::from(synonym) / n * -0.05;
        let compound_bonus = if ratio > 0.5 { (ratio - 0.5) * 0.1 } else { 0.0 };

        let input_phrase = input.join(" ");
        let label_phrase = label_tokens.join(" ");
        let order_bonus = if label_phrase == input_phrase {
            0.2
        } else if label_phrase.contains(&input_phrase) {
            0.1
        } else {
            0.0
        };
        let level_boost = match level {
            HierarchyLevel::Action => 0.1,
            HierarchyLevel::Step => 0.05,
            _ => 0.0,
        };

        let score = (total / n + exact_bonus + synonym_penalty + compound_bonus + order_bonus + level_boost).min(1.0);
        (score, matched)
    }

    /// Propose an entry node for `text`
    ///
    /// With rationalization off, a shared node whose label ties with
    /// per-product candidates is preferred, so the caller sees the overlap
    /// instead of silently picking one product.
    #[must_use]
    pub fn generate_query(&self, text: &str, rationalized: bool, shared_marker: &str) -> Option<GeneratedQuery> {
        let matches = self.find_best_matches(text, 10);
        let best = matches.first()?;

        if !rationalized {
            let key = best.label.to_lowercase();
            let same_label: Vec<&MatchResult> = matches
                .iter()
                .take(5)
                .filter(|m| m.label.to_lowercase() == key)
                .collect();

            let mut products: HashSet<String> = HashSet::new();
            for m in &same_label {
                if let Some(node) = self.nodes.get(m.node.as_str()) {
                    products.extend(node.products.iter().map(|p| p.to_lowercase()));
                }
            }
            let shared = same_label.iter().find(|m| m.node.has_marker(shared_marker));

            if same_label.len() > 1 && (products.len() > 1 || shared.is_some()) {
                if let Some(shared) = shared {
                    tracing::debug!(text, entry = %shared.node, "query maps to overlapping functions");
                    return Some(GeneratedQuery {
                        text: text.to_string(),
                        entry_node: shared.node.clone(),
                        match_confidence: shared.score,
                        matched_node_label: shared.label.clone(),
                        is_ambiguous: true,
                        alternatives: same_label
                            .iter()
                            .filter(|m| m.node != shared.node)
                            .map(|m| (*m).clone())
                            .collect(),
                    });
                }
                return Some(self.query_from(text, &matches, true));
            }
        }

        Some(self.query_from(text, &matches, false))
    }

    fn query_from(&self, text: &str, matches: &[MatchResult], is_ambiguous: bool) -> GeneratedQuery {
        let best = &matches[0];
        GeneratedQuery {
            text: text.to_string(),
            entry_node: best.node.clone(),
            match_confidence: best.score,
            matched_node_label: best.label.clone(),
            is_ambiguous,
            alternatives: matches.iter().skip(1).take(3).cloned().collect(),
        }
    }
}

impl NodeMatcher for TokenMatcher<'_> {
    fn find_best_matches(&self, text: &str, top_n: usize) -> Vec<MatchResult> {
        let input = self.config.tokenize(text);
        if input.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<MatchResult> = self
            .nodes
            .values()
            .filter_map(|node| {
                let (score, matched_words) = self.score(&input, node.level, &node.label);
                (score > self.config.min_score).then(|| MatchResult {
                    node: node.id.clone(),
                    label: node.label.clone(),
                    level: node.level,
                    score,
                    matched_words,
                    confidence: MatchConfidence::from_score(score),
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_n);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intent_graph::{node_map, FunctionalNode};
    use pretty_assertions::assert_eq;

    fn nodes() -> NodeMap {
        node_map([
            FunctionalNode::new("outcome-revenue", HierarchyLevel::Outcome, "Grow Revenue"),
            FunctionalNode::new("step-invoice", HierarchyLevel::Step, "Create Invoice"),
            FunctionalNode::new("action-send", HierarchyLevel::Action, "Send Invoice Reminder"),
            FunctionalNode::new("scenario-report-sap", HierarchyLevel::Scenario, "Financial Reporting")
                .with_products(["sap"]),
            FunctionalNode::new("scenario-report-bi", HierarchyLevel::Scenario, "Financial Reporting")
                .with_products(["bi"]),
            FunctionalNode::new("scenario-report-shared", HierarchyLevel::Scenario, "Financial Reporting")
                .with_products(["sap", "bi"]),
        ])
    }

    #[test]
    fn tokenize_drops_stop_words_and_punctuation() {
        let config = MatcherConfig::default();
        assert_eq!(config.tokenize("I want to create an invoice, please!"), vec!["create", "invoice", "please"]);
    }

    #[test]
    fn stems_and_word_forms() {
        let config = MatcherConfig::default().with_word_forms(IndexMap::from([("ran".to_string(), "run".to_string())]));
        assert_eq!(config.stem("reporting"), "report");
        assert_eq!(config.stem("ran"), "run");
        assert_eq!(config.stem("bus"), "bus");
    }

    #[test]
    fn exact_phrase_scores_high() {
        let nodes = nodes();
        let config = MatcherConfig::default();
        let matcher = TokenMatcher::new(&nodes, &config);
        let best = matcher.find_best_match("create invoice").unwrap();
        assert_eq!(best.node, "step-invoice");
        assert_eq!(best.confidence, MatchConfidence::High);
        assert_eq!(best.matched_words, vec!["create", "invoice"]);
        assert!((best.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn synonyms_and_typos_still_match() {
        let nodes = nodes();
        let config = MatcherConfig::default()
            .with_synonyms(IndexMap::from([("increase".to_string(), vec!["grow".to_string()])]));
        let matcher = TokenMatcher::new(&nodes, &config);

        let best = matcher.find_best_match("increase revenue").unwrap();
        assert_eq!(best.node, "outcome-revenue");

        let typo = matcher.find_best_match("invoise reminder").unwrap();
        assert_eq!(typo.node, "action-send");
    }

    #[test]
    fn nothing_for_stop_words_only() {
        let nodes = nodes();
        let config = MatcherConfig::default();
        let matcher = TokenMatcher::new(&nodes, &config);
        assert!(matcher.find_best_matches("I want to", 5).is_empty());
        assert!(matcher.find_best_matches("zebra", 5).is_empty());
    }

    #[test]
    fn results_are_sorted_and_truncated() {
        let nodes = nodes();
        let config = MatcherConfig::default();
        let matcher = TokenMatcher::new(&nodes, &config);
        let results = matcher.find_best_matches("invoice", 2);
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn overlapping_query_prefers_shared_node_when_unrationalized() {
        let nodes = nodes();
        let config = MatcherConfig::default();
        let matcher = TokenMatcher::new(&nodes, &config);

        let query = matcher.generate_query("financial reporting", false, "-shared").unwrap();
        assert!(query.is_ambiguous);
        assert_eq!(query.entry_node, "scenario-report-shared");
        assert_eq!(query.alternatives.len(), 2);

        let query = matcher.generate_query("financial reporting", true, "-shared").unwrap();
        assert!(!query.is_ambiguous);
        assert_eq!(query.entry_node, "scenario-report-sap");
    }
}
