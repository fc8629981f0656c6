//! Domain loading and per-domain preparation
//!
//! A domain is authored as plain data ([`DomainData`]). Preparing it runs the
//! shared-node preprocessor once, overlays hand-written alternatives, builds
//! the duplicate index and the base graph, and defers the rationalized view
//! until a unified-mode request needs it. [`DomainCatalog`] memoizes prepared
//! domains per id.

use crate::config::EngineConfig;
use crate::engine::ResolutionEngine;
use crate::error::ResolutionError;
use crate::matcher::{MatcherConfig, TokenMatcher};
use crate::types::{Resolution, ResolutionRequest};
use dashmap::DashMap;
use indexmap::IndexMap;
use intent_graph::{node_map, FunctionalGraph, FunctionalNode, IntegrityValidator, NodeId, NodeMap, ValidationReport};
use intent_rationalization::{
    DuplicateIndex, LabelIndex, RationalizationOutcome, RationalizationProcessor, RationalizedAlternatives,
    SharedNodeGenerator,
};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result alias for catalog operations
pub type Result<T> = std::result::Result<T, ResolutionError>;

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// A domain as authored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainData {
    /// Domain id; defaults to the file stem when loaded from disk
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Nodes
    pub nodes: Vec<FunctionalNode>,
    /// Hand-written alternatives, overlaid on generated ones
    #[serde(default)]
    pub alternatives: RationalizedAlternatives,
    /// Matcher synonym groups
    #[serde(default)]
    pub synonyms: IndexMap<String, Vec<String>>,
    /// Matcher word forms
    #[serde(default)]
    pub word_forms: IndexMap<String, String>,
}

struct RationalizedView {
    outcome: RationalizationOutcome,
    graph: FunctionalGraph,
}

/// A domain ready for resolution
pub struct PreparedDomain {
    id: String,
    name: String,
    description: String,
    alternatives: RationalizedAlternatives,
    duplicates: DuplicateIndex,
    labels: LabelIndex,
    duplicate_nodes: Vec<NodeId>,
    shared_nodes: Vec<NodeId>,
    graph: FunctionalGraph,
    rationalized: OnceCell<RationalizedView>,
    config: EngineConfig,
    matcher: MatcherConfig,
}

impl fmt::Debug for PreparedDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedDomain")
            .field("id", &self.id)
            .field("nodes", &self.graph.len())
            .field("shared_nodes", &self.shared_nodes.len())
            .field("duplicate_nodes", &self.duplicate_nodes.len())
            .field("rationalized", &self.rationalized.get().is_some())
            .finish_non_exhaustive()
    }
}

impl PreparedDomain {
    /// Prepare a domain without integrity checks
    #[must_use]
    pub fn prepare(data: DomainData, config: EngineConfig) -> Self {
        let nodes = node_map(data.nodes);
        let output = SharedNodeGenerator::new()
            .with_skip_marker(config.shared_marker.clone())
            .generate(&nodes);

        let mut alternatives = output.alternatives;
        for (shared, products) in &data.alternatives {
            for (product, duplicate) in products {
                alternatives.insert(shared.clone(), product.to_lowercase(), duplicate.clone());
            }
        }

        let mut duplicate_nodes = output.duplicate_nodes;
        for id in alternatives.duplicate_ids() {
            if !duplicate_nodes.contains(&id) {
                duplicate_nodes.push(id);
            }
        }

        let mut shared_nodes = output.shared_nodes;
        for id in alternatives.shared_ids() {
            if output.nodes.contains_key(id.as_str()) && !shared_nodes.contains(id) {
                shared_nodes.push(id.clone());
            }
        }

        let duplicates = DuplicateIndex::from_alternatives(&alternatives);
        let graph = FunctionalGraph::from_nodes(output.nodes);
        let labels = LabelIndex::from_nodes(graph.nodes());
        let matcher = MatcherConfig::default()
            .with_synonyms(data.synonyms)
            .with_word_forms(data.word_forms);

        tracing::info!(
            domain = %data.id,
            nodes = graph.len(),
            shared = shared_nodes.len(),
            duplicates = duplicate_nodes.len(),
            "prepared domain"
        );

        Self {
            id: data.id,
            name: data.name,
            description: data.description,
            alternatives,
            duplicates,
            labels,
            duplicate_nodes,
            shared_nodes,
            graph,
            rationalized: OnceCell::new(),
            config,
            matcher,
        }
    }

    /// Prepare a domain, rejecting integrity errors
    ///
    /// # Errors
    /// Returns [`ResolutionError::Invalid`] when validation finds errors.
    pub fn prepare_strict(data: DomainData, config: EngineConfig) -> Result<Self> {
        let prepared = Self::prepare(data, config);
        match prepared.validate().into_result() {
            Ok(report) => {
                for issue in report.warnings() {
                    tracing::debug!(domain = %prepared.id, kind = ?issue.kind, "{}", issue.message);
                }
                Ok(prepared)
            }
            Err(source) => Err(ResolutionError::Invalid {
                domain: prepared.id,
                source,
            }),
        }
    }

    /// Integrity report over nodes and alternatives
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut report = IntegrityValidator::new()
            .with_shared_marker(self.config.shared_marker.clone())
            .validate(self.graph.nodes());
        report.extend(self.alternatives.validate(self.graph.nodes()));
        report
    }

    fn rationalized_view(&self) -> &RationalizedView {
        self.rationalized.get_or_init(|| {
            let outcome = RationalizationProcessor::process(self.graph.nodes(), &self.alternatives);
            let graph = outcome.graph();
            tracing::debug!(domain = %self.id, warnings = outcome.warnings.len(), "built rationalized view");
            RationalizedView { outcome, graph }
        })
    }

    /// Graph view for the rationalization toggle
    #[must_use]
    pub fn graph(&self, rationalize: bool) -> &FunctionalGraph {
        if rationalize {
            &self.rationalized_view().graph
        } else {
            &self.graph
        }
    }

    /// Processor output of the unified view, built on first use
    #[must_use]
    pub fn rationalization(&self) -> &RationalizationOutcome {
        &self.rationalized_view().outcome
    }

    /// Resolve `entry` against the view selected by the request
    #[must_use]
    pub fn resolve(&self, entry: &str, request: &ResolutionRequest) -> Resolution {
        let view = self.graph(request.toggles.rationalize);
        ResolutionEngine::with_index(view.nodes(), &self.alternatives, &self.duplicates, view)
            .with_labels(&self.labels)
            .with_config(&self.config)
            .resolve(entry, request.context.as_ref(), request.toggles, &request.recent_actions)
    }

    /// Text matcher over the base nodes
    #[must_use]
    pub fn matcher(&self) -> TokenMatcher<'_> {
        TokenMatcher::new(self.graph.nodes(), &self.matcher)
    }

    /// Domain id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Preprocessed nodes
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &NodeMap {
        self.graph.nodes()
    }

    /// Generated and hand-written alternatives
    #[inline]
    #[must_use]
    pub fn alternatives(&self) -> &RationalizedAlternatives {
        &self.alternatives
    }

    /// Duplicate relation
    #[inline]
    #[must_use]
    pub fn duplicates(&self) -> &DuplicateIndex {
        &self.duplicates
    }

    /// Duplicate ids, including descendants of duplicates
    #[inline]
    #[must_use]
    pub fn duplicate_nodes(&self) -> &[NodeId] {
        &self.duplicate_nodes
    }

    /// Shared ids present in the node map
    #[inline]
    #[must_use]
    pub fn shared_nodes(&self) -> &[NodeId] {
        &self.shared_nodes
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Where domain data comes from
pub trait DomainSource: Send + Sync + fmt::Debug {
    /// Load one domain
    ///
    /// # Errors
    /// Unknown domain, unreadable or malformed data.
    fn load(&self, domain: &str) -> Result<DomainData>;

    /// Known domain ids
    ///
    /// # Errors
    /// The backing store could not be listed.
    fn list(&self) -> Result<Vec<String>>;
}

/// Reads `<root>/<domain>.{json,yaml,yml}`
#[derive(Debug, Clone)]
pub struct JsonDomainSource {
    root: PathBuf,
}

impl JsonDomainSource {
    /// Source over a directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory being read
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DomainSource for JsonDomainSource {
    fn load(&self, domain: &str) -> Result<DomainData> {
        let path = EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{domain}.{ext}")))
            .find(|p| p.is_file())
            .ok_or_else(|| ResolutionError::UnknownDomain(domain.to_string()))?;
        load_domain_file(&path)
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| ResolutionError::io(&self.root, e))?;
        let mut ids: Vec<String> = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ResolutionError::io(&self.root, e))?.path();
            let known = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e));
            if let (true, Some(stem)) = (known, path.file_stem().and_then(|s| s.to_str())) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

/// Parse a domain file by extension
///
/// A missing `id` is filled from the file stem.
///
/// # Errors
/// Unreadable file, unsupported extension or malformed content.
pub fn load_domain_file(path: &Path) -> Result<DomainData> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if !EXTENSIONS.contains(&ext) {
        return Err(ResolutionError::UnsupportedFormat(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path).map_err(|e| ResolutionError::io(path, e))?;
    let mut data: DomainData = if ext == "json" {
        serde_json::from_str(&text).map_err(|e| ResolutionError::parse(path, e))?
    } else {
        serde_yaml::from_str(&text).map_err(|e| ResolutionError::parse(path, e))?
    };

    if data.id.is_empty() {
        data.id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
    }
    tracing::debug!(path = %path.display(), domain = %data.id, nodes = data.nodes.len(), "loaded domain file");
    Ok(data)
}

/// In-memory domains
#[derive(Debug, Default)]
pub struct StaticDomainSource {
    domains: RwLock<IndexMap<String, DomainData>>,
}

impl StaticDomainSource {
    /// Empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a domain
    pub fn register(&self, data: DomainData) {
        self.domains.write().insert(data.id.clone(), data);
    }

    /// Source holding `domains`
    #[must_use]
    pub fn with_domains(domains: impl IntoIterator<Item = DomainData>) -> Self {
        let source = Self::new();
        for data in domains {
            source.register(data);
        }
        source
    }
}

impl DomainSource for StaticDomainSource {
    fn load(&self, domain: &str) -> Result<DomainData> {
        self.domains
            .read()
            .get(domain)
            .cloned()
            .ok_or_else(|| ResolutionError::UnknownDomain(domain.to_string()))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.domains.read().keys().cloned().collect())
    }
}

/// Memoizing catalog of prepared domains
#[derive(Debug)]
pub struct DomainCatalog {
    source: Box<dyn DomainSource>,
    prepared: DashMap<String, Arc<PreparedDomain>>,
    config: EngineConfig,
    strict: bool,
}

impl DomainCatalog {
    /// Catalog over a source
    #[must_use]
    pub fn new(source: impl DomainSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            prepared: DashMap::new(),
            config: EngineConfig::default(),
            strict: false,
        }
    }

    /// Catalog over a directory of domain files
    #[must_use]
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(JsonDomainSource::new(root))
    }

    /// With engine configuration
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Reject domains with integrity errors
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Prepared domain, loading it on first use
    ///
    /// # Errors
    /// Loading failed, or strict validation rejected the domain.
    pub fn get(&self, domain: &str) -> Result<Arc<PreparedDomain>> {
        if let Some(prepared) = self.prepared.get(domain) {
            return Ok(Arc::clone(prepared.value()));
        }

        let mut data = self.source.load(domain)?;
        if data.id.is_empty() {
            data.id = domain.to_string();
        }
        let prepared = if self.strict {
            PreparedDomain::prepare_strict(data, self.config.clone())?
        } else {
            PreparedDomain::prepare(data, self.config.clone())
        };

        let entry = self
            .prepared
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(prepared));
        Ok(Arc::clone(entry.value()))
    }

    /// Resolve in one domain
    ///
    /// # Errors
    /// The domain could not be loaded.
    pub fn resolve(&self, domain: &str, entry: &str, request: &ResolutionRequest) -> Result<Resolution> {
        Ok(self.get(domain)?.resolve(entry, request))
    }

    /// Domains the source knows
    ///
    /// # Errors
    /// The source could not be listed.
    pub fn domains(&self) -> Result<Vec<String>> {
        self.source.list()
    }

    /// Domains prepared so far
    #[must_use]
    pub fn cached(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.prepared.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intent_graph::HierarchyLevel;

    fn data() -> DomainData {
        DomainData {
            id: "finance".to_string(),
            name: "Finance".to_string(),
            nodes: vec![
                FunctionalNode::new("outcome-a", HierarchyLevel::Outcome, "Close")
                    .with_products(["sap"])
                    .with_children(["scenario-a"]),
                FunctionalNode::new("outcome-b", HierarchyLevel::Outcome, "Report")
                    .with_products(["bi"])
                    .with_children(["scenario-b"]),
                FunctionalNode::new("scenario-a", HierarchyLevel::Scenario, "Reconcile")
                    .with_products(["sap"])
                    .with_parents(["outcome-a"]),
                FunctionalNode::new("scenario-b", HierarchyLevel::Scenario, "Reconcile")
                    .with_products(["bi"])
                    .with_parents(["outcome-b"]),
            ],
            ..DomainData::default()
        }
    }

    #[test]
    fn prepare_generates_shared_node() {
        let prepared = PreparedDomain::prepare(data(), EngineConfig::default());
        assert_eq!(prepared.shared_nodes(), &[NodeId::from("scenario-reconcile-shared")]);
        assert!(prepared.duplicates().is_duplicate("scenario-a"));
        assert!(prepared.nodes().contains_key("scenario-reconcile-shared"));
    }

    #[test]
    fn rationalized_view_is_lazy() {
        let prepared = PreparedDomain::prepare(data(), EngineConfig::default());
        assert!(prepared.rationalized.get().is_none());
        let _ = prepared.graph(false);
        assert!(prepared.rationalized.get().is_none());
        let _ = prepared.graph(true);
        assert!(prepared.rationalized.get().is_some());
    }

    #[test]
    fn catalog_memoizes() {
        let catalog = DomainCatalog::new(StaticDomainSource::with_domains([data()]));
        let a = catalog.get("finance").unwrap();
        let b = catalog.get("finance").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(catalog.cached(), vec!["finance".to_string()]);
        assert!(matches!(catalog.get("nope"), Err(ResolutionError::UnknownDomain(_))));
    }

    #[test]
    fn strict_catalog_rejects_broken_domain() {
        let mut broken = data();
        broken.nodes[0].children.push(NodeId::from("missing"));
        let catalog = DomainCatalog::new(StaticDomainSource::with_domains([broken])).strict(true);
        assert!(matches!(catalog.get("finance"), Err(ResolutionError::Invalid { .. })));
    }
}
