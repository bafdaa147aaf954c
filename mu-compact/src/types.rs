//! Request, result and report types exchanged with the compactor.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::graph::{CodeGraph, SymbolKind};

/// Strategy-specific diagnostics attached to a result.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Metadata key set by the size strategy when nothing had to be removed.
pub const NO_ACTION_KEY: &str = "no_action";

/// A single compaction request.
#[derive(Clone, Debug, Default)]
pub struct CompactRequest {
    /// Graph to compact. `None` is rejected with `InvalidRequest`.
    pub graph: Option<Arc<CodeGraph>>,
    /// Strategy name. Empty selects the controller default (or adaptive selection).
    pub strategy: String,
    /// Target maximum graph size. Non-positive values use the configured default.
    pub max_size: i64,
    /// Optional per-item priority weights (file path or symbol id -> weight).
    pub priorities: HashMap<String, f64>,
    /// Preservation requirements. `None` means nothing is preserved.
    pub requirements: Option<CompactRequirements>,
    /// Opaque caller context, echoed nowhere and never interpreted.
    pub context: HashMap<String, serde_json::Value>,
}

impl CompactRequest {
    /// Create a request for a graph with the controller's default strategy.
    pub fn new(graph: Arc<CodeGraph>) -> Self {
        Self {
            graph: Some(graph),
            ..Default::default()
        }
    }

    /// Builder: set the strategy name.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    /// Builder: set the maximum size.
    pub fn with_max_size(mut self, max_size: i64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Builder: set the preservation requirements.
    pub fn with_requirements(mut self, requirements: CompactRequirements) -> Self {
        self.requirements = Some(requirements);
        self
    }

    /// Requirements, or an empty set when none were given.
    pub fn requirements_or_default(&self) -> CompactRequirements {
        self.requirements.clone().unwrap_or_default()
    }

    /// Maximum size as an unsigned target. Callers validate positivity first.
    pub fn target_size(&self) -> usize {
        self.max_size.max(0) as usize
    }
}

/// What must survive compaction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompactRequirements {
    /// Exact file paths to keep.
    #[serde(default)]
    pub preserve_files: BTreeSet<String>,
    /// Path fragments; any file whose path contains one is kept.
    #[serde(default)]
    pub preserve_paths: BTreeSet<String>,
    /// Exact symbol ids to keep.
    #[serde(default)]
    pub preserve_symbols: BTreeSet<String>,
    #[serde(default)]
    pub required_kinds: BTreeSet<SymbolKind>,
    #[serde(default)]
    pub languages: BTreeSet<String>,
    #[serde(default)]
    pub min_dependency_depth: usize,
}

impl CompactRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: preserve an exact file path.
    pub fn preserve_file(mut self, path: impl Into<String>) -> Self {
        self.preserve_files.insert(path.into());
        self
    }

    /// Builder: preserve every file whose path contains `pattern`.
    pub fn preserve_path(mut self, pattern: impl Into<String>) -> Self {
        self.preserve_paths.insert(pattern.into());
        self
    }

    /// Builder: preserve an exact symbol id.
    pub fn preserve_symbol(mut self, id: impl Into<String>) -> Self {
        self.preserve_symbols.insert(id.into());
        self
    }

    /// Check if no constraint is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Outcome of a compaction.
#[derive(Clone, Debug, Serialize)]
pub struct CompactResult {
    pub compacted_graph: CodeGraph,
    pub original_size: usize,
    pub compacted_size: usize,
    pub compression_ratio: f64,
    pub strategy_used: String,
    #[serde(with = "duration_ms")]
    pub execution_time: Duration,
    pub removed: RemovedItems,
    pub metadata: Metadata,
    pub warnings: Vec<String>,
}

impl CompactResult {
    /// Build a result for `compacted`, measuring sizes against `original`.
    pub fn new(original: &CodeGraph, compacted: CodeGraph, strategy: impl Into<String>) -> Self {
        let original_size = original.size();
        let compacted_size = compacted.size();
        Self {
            compacted_graph: compacted,
            original_size,
            compacted_size,
            compression_ratio: compression_ratio(original_size, compacted_size),
            strategy_used: strategy.into(),
            execution_time: Duration::ZERO,
            removed: RemovedItems::default(),
            metadata: Metadata::new(),
            warnings: Vec::new(),
        }
    }

    /// Whether the strategy decided no removal was necessary.
    pub fn no_action(&self) -> bool {
        self.metadata
            .get(NO_ACTION_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Recompute sizes and ratio against `original`.
    pub fn measure(&mut self, original: &CodeGraph) {
        self.original_size = original.size();
        self.compacted_size = self.compacted_graph.size();
        self.compression_ratio = compression_ratio(self.original_size, self.compacted_size);
    }
}

/// `compacted / original`, or 0 for an empty original.
pub fn compression_ratio(original: usize, compacted: usize) -> f64 {
    if original == 0 {
        0.0
    } else {
        compacted as f64 / original as f64
    }
}

/// Report of everything removed by a compaction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RemovedItems {
    pub files: Vec<String>,
    pub symbols: Vec<String>,
    pub edges: Vec<String>,
    pub nodes: Vec<String>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactAnalysis>,
}

impl RemovedItems {
    /// Total number of removed elements.
    pub fn total(&self) -> usize {
        self.files.len() + self.symbols.len() + self.edges.len() + self.nodes.len()
    }

    /// Append another report, skipping ids already listed.
    pub fn merge(&mut self, other: RemovedItems) {
        extend_unique(&mut self.files, other.files);
        extend_unique(&mut self.symbols, other.symbols);
        extend_unique(&mut self.edges, other.edges);
        extend_unique(&mut self.nodes, other.nodes);
        if !other.reason.is_empty() {
            if self.reason.is_empty() {
                self.reason = other.reason;
            } else {
                self.reason = format!("{}; {}", self.reason, other.reason);
            }
        }
    }
}

fn extend_unique(target: &mut Vec<String>, items: Vec<String>) {
    let mut seen: BTreeSet<String> = target.iter().cloned().collect();
    for item in items {
        if seen.insert(item.clone()) {
            target.push(item);
        }
    }
}

/// Estimated consequences of a removal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    /// Remaining files that depended on something removed.
    pub dependent_files: Vec<String>,
    pub broken_references: usize,
    pub isolated_symbols: usize,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

/// Coarse risk classification of a removal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// A strategy's estimate of what it could remove from a graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyAnalysis {
    pub strategy: String,
    pub estimated_compression_ratio: f64,
    pub removable_files: usize,
    pub removable_symbols: usize,
    /// 0.0 (guess) to 1.0 (exact).
    pub confidence: f64,
    pub warnings: Vec<String>,
}

impl StrategyAnalysis {
    /// Build an estimate from removable counts against the graph size.
    pub fn estimate(
        strategy: &str,
        graph: &CodeGraph,
        removable_files: usize,
        removable_symbols: usize,
        confidence: f64,
    ) -> Self {
        let total = graph.size();
        let mut warnings = Vec::new();
        let ratio = if total == 0 {
            warnings.push("graph is empty".to_string());
            1.0
        } else {
            let remaining = total.saturating_sub(removable_files + removable_symbols);
            remaining as f64 / total as f64
        };
        Self {
            strategy: strategy.to_string(),
            estimated_compression_ratio: ratio,
            removable_files,
            removable_symbols,
            confidence: if total == 0 { 0.0 } else { confidence },
            warnings,
        }
    }
}

/// Controller-level comparison of every analyzable strategy.
#[derive(Clone, Debug, Serialize)]
pub struct CompactionAnalysis {
    pub total_size: usize,
    pub strategies: BTreeMap<String, StrategyAnalysis>,
    pub recommended_strategy: Option<String>,
    pub estimated_savings: f64,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_ratio_guard() {
        assert_eq!(compression_ratio(0, 0), 0.0);
        assert_eq!(compression_ratio(10, 10), 1.0);
        assert_eq!(compression_ratio(8, 2), 0.25);
    }

    #[test]
    fn test_removed_items_merge_dedupes() {
        let mut first = RemovedItems {
            files: vec!["a.py".into(), "b.py".into()],
            reason: "relevance".into(),
            ..Default::default()
        };
        let second = RemovedItems {
            files: vec!["b.py".into(), "c.py".into()],
            symbols: vec!["s1".into()],
            reason: "frequency".into(),
            ..Default::default()
        };
        first.merge(second);
        assert_eq!(first.files, vec!["a.py", "b.py", "c.py"]);
        assert_eq!(first.symbols, vec!["s1"]);
        assert_eq!(first.reason, "relevance; frequency");
        assert_eq!(first.total(), 4);
    }

    #[test]
    fn test_requirements_builder() {
        let req = CompactRequirements::new()
            .preserve_file("src/main.rs")
            .preserve_path("core/")
            .preserve_symbol("fn:main");
        assert!(!req.is_empty());
        assert!(req.preserve_files.contains("src/main.rs"));
        assert!(CompactRequirements::new().is_empty());
    }

    #[test]
    fn test_estimate_empty_graph() {
        let analysis = StrategyAnalysis::estimate("size", &CodeGraph::new(), 0, 0, 0.9);
        assert_eq!(analysis.estimated_compression_ratio, 1.0);
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.warnings.len(), 1);
    }

    #[test]
    fn test_request_target_size_clamps() {
        let req = CompactRequest::default().with_max_size(-5);
        assert_eq!(req.target_size(), 0);
        assert!(req.graph.is_none());
        assert!(req.requirements_or_default().is_empty());
    }
}
