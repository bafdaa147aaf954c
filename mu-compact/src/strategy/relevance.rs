//! Relevance propagation.
//!
//! Every file and symbol starts at a base score (or its caller-supplied
//! priority); preserved items are pinned to 1.0. A single pass over the edges,
//! in edge-id order, lets each file pass a share of its score to the files it
//! points at. Anything still below the threshold is removed.
//!
//! The pass is deliberately not iterated to a fixpoint, which keeps it
//! O(edges).

use std::collections::HashMap;
use std::time::Instant;

use serde_json::json;
use tracing::debug;

use super::base::{
    cleanup_orphans, deep_copy, is_file_preserved, is_symbol_preserved, remove_file,
    remove_symbol, require_graph, sorted_keys,
};
use super::{CompactionStrategy, PotentialAnalyzer, RELEVANCE};
use crate::config::StrategyOverrides;
use crate::context::CompactContext;
use crate::error::Result;
use crate::graph::CodeGraph;
use crate::types::{CompactRequest, CompactRequirements, CompactResult, RemovedItems, StrategyAnalysis};

/// Starting score of an unpreserved, unprioritized item.
pub const BASE_SCORE: f64 = 0.1;
/// Score of a preserved item.
pub const PRESERVED_SCORE: f64 = 1.0;

/// Scores computed for one graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelevanceScores {
    pub files: HashMap<String, f64>,
    pub symbols: HashMap<String, f64>,
}

impl RelevanceScores {
    pub fn len(&self) -> usize {
        self.files.len() + self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes files and symbols whose propagated relevance stays low.
#[derive(Clone, Debug)]
pub struct RelevanceStrategy {
    threshold: f64,
    propagation_factor: f64,
}

impl Default for RelevanceStrategy {
    fn default() -> Self {
        Self::from_overrides(&StrategyOverrides::default())
    }
}

impl RelevanceStrategy {
    pub fn new(threshold: f64, propagation_factor: f64) -> Self {
        Self {
            threshold,
            propagation_factor,
        }
    }

    pub fn from_overrides(overrides: &StrategyOverrides) -> Self {
        Self::new(overrides.relevance_threshold, overrides.propagation_factor)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score every file and symbol of `graph`.
    pub fn score(
        &self,
        ctx: &CompactContext,
        graph: &CodeGraph,
        requirements: &CompactRequirements,
        priorities: &HashMap<String, f64>,
    ) -> Result<RelevanceScores> {
        let initial = |id: &str, preserved: bool| {
            if preserved {
                PRESERVED_SCORE
            } else {
                priorities
                    .get(id)
                    .map(|p| p.clamp(0.0, 1.0))
                    .unwrap_or(BASE_SCORE)
            }
        };

        let mut scores = RelevanceScores::default();
        for path in graph.files.keys() {
            let score = initial(path, is_file_preserved(path, requirements));
            scores.files.insert(path.clone(), score);
        }
        for id in graph.symbols.keys() {
            let score = initial(id, is_symbol_preserved(id, requirements));
            scores.symbols.insert(id.clone(), score);
        }

        for (i, edge) in graph.sorted_edges().into_iter().enumerate() {
            ctx.checkpoint(i)?;
            let (Some(&source), Some(&target)) = (
                scores.files.get(&edge.source),
                scores.files.get(&edge.target),
            ) else {
                continue;
            };
            let propagated = (target + source * self.propagation_factor).min(1.0);
            scores.files.insert(edge.target.clone(), propagated);
        }

        Ok(scores)
    }
}

impl CompactionStrategy for RelevanceStrategy {
    fn name(&self) -> &str {
        RELEVANCE
    }

    fn description(&self) -> &str {
        "Propagates relevance along dependencies and drops low-scoring files and symbols"
    }

    fn compact(&self, ctx: &CompactContext, request: &CompactRequest) -> Result<CompactResult> {
        let started = Instant::now();
        let graph = require_graph(request)?;
        let requirements = request.requirements_or_default();
        let scores = self.score(ctx, graph, &requirements, &request.priorities)?;

        let mut compacted = deep_copy(graph);
        let mut removed = RemovedItems {
            reason: format!("relevance score below {:.2}", self.threshold),
            ..Default::default()
        };

        for path in sorted_keys(&scores.files) {
            if scores.files[&path] < self.threshold && !is_file_preserved(&path, &requirements) {
                remove_file(&mut compacted, &path, &mut removed);
            }
        }
        for id in sorted_keys(&scores.symbols) {
            if scores.symbols[&id] < self.threshold && !is_symbol_preserved(&id, &requirements) {
                remove_symbol(&mut compacted, &id, &mut removed);
            }
        }
        cleanup_orphans(ctx, &mut compacted, &mut removed)?;

        debug!(
            files = removed.files.len(),
            symbols = removed.symbols.len(),
            threshold = self.threshold,
            "relevance pruning finished"
        );

        let mut result = CompactResult::new(graph, compacted, RELEVANCE);
        result.removed = removed;
        result.execution_time = started.elapsed();
        result.metadata.insert("threshold".into(), json!(self.threshold));
        result
            .metadata
            .insert("scored_elements".into(), json!(scores.len()));
        Ok(result)
    }

    fn as_analyzer(&self) -> Option<&dyn PotentialAnalyzer> {
        Some(self)
    }
}

impl PotentialAnalyzer for RelevanceStrategy {
    fn analyze_potential(&self, graph: &CodeGraph) -> StrategyAnalysis {
        let scores = self
            .score(
                &CompactContext::new(),
                graph,
                &CompactRequirements::default(),
                &HashMap::new(),
            )
            .unwrap_or_default();
        let low = |map: &HashMap<String, f64>| map.values().filter(|s| **s < self.threshold).count();
        StrategyAnalysis::estimate(RELEVANCE, graph, low(&scores.files), low(&scores.symbols), 0.7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode, SourceFile, Symbol, SymbolKind};
    use std::sync::Arc;

    /// a.py -> b.py -> c.py, plus an unconnected d.py and one symbol.
    fn chain_graph() -> CodeGraph {
        let mut graph = CodeGraph::new();
        for path in ["a.py", "b.py", "c.py", "d.py"] {
            graph.add_file(SourceFile::new(path, "python"));
            graph.add_node(GraphNode::new(path, "file"));
        }
        graph.add_symbol(Symbol::new("func:a", "a", SymbolKind::Function));
        graph.add_edge(GraphEdge::new("e1", "a.py", "b.py", "imports"));
        graph.add_edge(GraphEdge::new("e2", "b.py", "c.py", "imports"));
        graph
    }

    #[test]
    fn test_preserved_file_scores_one() {
        let graph = chain_graph();
        let req = CompactRequirements::new().preserve_file("a.py");
        let scores = RelevanceStrategy::default()
            .score(&CompactContext::new(), &graph, &req, &HashMap::new())
            .unwrap();
        assert_eq!(scores.files["a.py"], 1.0);
        assert_eq!(scores.files["d.py"], BASE_SCORE);
        assert_eq!(scores.len(), 5);
    }

    #[test]
    fn test_single_pass_propagation() {
        let graph = chain_graph();
        let req = CompactRequirements::new().preserve_file("a.py");
        let scores = RelevanceStrategy::default()
            .score(&CompactContext::new(), &graph, &req, &HashMap::new())
            .unwrap();
        // b = 0.1 + 1.0 * 0.5, then c = 0.1 + 0.6 * 0.5 (e1 visited before e2)
        assert!((scores.files["b.py"] - 0.6).abs() < 1e-9);
        assert!((scores.files["c.py"] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_compact_removes_low_scores_and_keeps_preserved() {
        let graph = Arc::new(chain_graph());
        let req = CompactRequirements::new().preserve_file("a.py");
        let request = CompactRequest::new(graph.clone()).with_requirements(req);
        let result = RelevanceStrategy::default()
            .compact(&CompactContext::new(), &request)
            .unwrap();

        let kept = &result.compacted_graph.files;
        assert!(kept.contains_key("a.py"));
        assert!(kept.contains_key("b.py"));
        assert!(kept.contains_key("c.py"));
        assert!(!kept.contains_key("d.py"));
        assert_eq!(result.removed.files, vec!["d.py"]);
        assert_eq!(result.removed.symbols, vec!["func:a"]);
        assert_eq!(result.removed.nodes, vec!["d.py"]);
        assert_eq!(result.metadata["threshold"], json!(0.3));
        assert_eq!(result.metadata["scored_elements"], json!(5));
        // Input untouched
        assert_eq!(graph.files.len(), 4);
    }

    #[test]
    fn test_priorities_seed_scores() {
        let graph = Arc::new(chain_graph());
        let mut request = CompactRequest::new(graph);
        request.priorities.insert("d.py".into(), 0.9);
        request.priorities.insert("func:a".into(), 7.0);
        let result = RelevanceStrategy::default()
            .compact(&CompactContext::new(), &request)
            .unwrap();
        assert!(result.compacted_graph.files.contains_key("d.py"));
        assert!(result.compacted_graph.symbols.contains_key("func:a"));
    }

    #[test]
    fn test_analyzer_counts_low_scores() {
        let analysis = RelevanceStrategy::default().analyze_potential(&chain_graph());
        // Nothing preserved: every file and the symbol stay below 0.3
        assert_eq!(analysis.removable_files, 4);
        assert_eq!(analysis.removable_symbols, 1);
        assert!(analysis.estimated_compression_ratio < 1.0);
    }
}
