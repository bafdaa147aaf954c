//! Frequency-based pruning.
//!
//! Files are ranked by how many edge endpoints touch them, symbols by how
//! many files list them. The least-referenced share of each ranking is
//! removed; preserved entries keep their slot but are skipped.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde_json::json;
use tracing::debug;

use super::base::{
    cleanup_orphans, deep_copy, is_file_preserved, is_symbol_preserved, remove_file,
    remove_symbol, require_graph,
};
use super::{CompactionStrategy, PotentialAnalyzer, FREQUENCY};
use crate::config::StrategyOverrides;
use crate::context::CompactContext;
use crate::error::Result;
use crate::graph::CodeGraph;
use crate::types::{CompactRequest, CompactResult, RemovedItems, StrategyAnalysis};

/// Removes the least-referenced files and symbols.
#[derive(Clone, Debug)]
pub struct FrequencyStrategy {
    removal_percentage: f64,
}

impl Default for FrequencyStrategy {
    fn default() -> Self {
        Self::from_overrides(&StrategyOverrides::default())
    }
}

impl FrequencyStrategy {
    pub fn new(removal_percentage: f64) -> Self {
        Self {
            removal_percentage: removal_percentage.clamp(0.0, 1.0),
        }
    }

    pub fn from_overrides(overrides: &StrategyOverrides) -> Self {
        Self::new(overrides.removal_percentage)
    }

    /// Number of ranking slots visited for `len` entries.
    pub fn removal_slots(&self, len: usize) -> usize {
        (len as f64 * self.removal_percentage).floor() as usize
    }

    /// File reference counts, ascending by (count, path).
    pub fn rank_files(
        &self,
        ctx: &CompactContext,
        graph: &CodeGraph,
    ) -> Result<Vec<(String, usize)>> {
        let mut counts: HashMap<&str, usize> =
            graph.files.keys().map(|path| (path.as_str(), 0)).collect();
        for (i, edge) in graph.edges.values().enumerate() {
            ctx.checkpoint(i)?;
            for endpoint in [&edge.source, &edge.target] {
                if let Some(count) = counts.get_mut(endpoint.as_str()) {
                    *count += 1;
                }
            }
        }
        Ok(ascending(counts))
    }

    /// Symbol reference counts, ascending by (count, id).
    pub fn rank_symbols(
        &self,
        ctx: &CompactContext,
        graph: &CodeGraph,
    ) -> Result<Vec<(String, usize)>> {
        let mut counts: HashMap<&str, usize> =
            graph.symbols.keys().map(|id| (id.as_str(), 0)).collect();
        for (i, file) in graph.files.values().enumerate() {
            ctx.checkpoint(i)?;
            let listed: HashSet<&str> = file.symbols.iter().map(String::as_str).collect();
            for id in listed {
                if let Some(count) = counts.get_mut(id) {
                    *count += 1;
                }
            }
        }
        Ok(ascending(counts))
    }
}

/// Sort by count, then id, so equal counts never make the removal set vary.
fn ascending(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(id, count)| (id.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

impl CompactionStrategy for FrequencyStrategy {
    fn name(&self) -> &str {
        FREQUENCY
    }

    fn description(&self) -> &str {
        "Removes the least-referenced share of files and symbols"
    }

    fn compact(&self, ctx: &CompactContext, request: &CompactRequest) -> Result<CompactResult> {
        let started = Instant::now();
        let graph = require_graph(request)?;
        let requirements = request.requirements_or_default();

        let files = self.rank_files(ctx, graph)?;
        let symbols = self.rank_symbols(ctx, graph)?;

        let mut compacted = deep_copy(graph);
        let mut removed = RemovedItems {
            reason: format!(
                "lowest {:.0}% by reference count",
                self.removal_percentage * 100.0
            ),
            ..Default::default()
        };

        for (path, _) in files.iter().take(self.removal_slots(files.len())) {
            if !is_file_preserved(path, &requirements) {
                remove_file(&mut compacted, path, &mut removed);
            }
        }
        for (id, _) in symbols.iter().take(self.removal_slots(symbols.len())) {
            if !is_symbol_preserved(id, &requirements) {
                remove_symbol(&mut compacted, id, &mut removed);
            }
        }
        cleanup_orphans(ctx, &mut compacted, &mut removed)?;

        debug!(
            files = removed.files.len(),
            symbols = removed.symbols.len(),
            "frequency pruning finished"
        );

        let mut result = CompactResult::new(graph, compacted, FREQUENCY);
        result.removed = removed;
        result.execution_time = started.elapsed();
        result
            .metadata
            .insert("removal_percentage".into(), json!(self.removal_percentage));
        result.metadata.insert("files_analyzed".into(), json!(files.len()));
        result
            .metadata
            .insert("symbols_analyzed".into(), json!(symbols.len()));
        Ok(result)
    }

    fn as_analyzer(&self) -> Option<&dyn PotentialAnalyzer> {
        Some(self)
    }
}

impl PotentialAnalyzer for FrequencyStrategy {
    fn analyze_potential(&self, graph: &CodeGraph) -> StrategyAnalysis {
        StrategyAnalysis::estimate(
            FREQUENCY,
            graph,
            self.removal_slots(graph.files.len()),
            self.removal_slots(graph.symbols.len()),
            0.8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, SourceFile, Symbol, SymbolKind};
    use crate::types::CompactRequirements;
    use std::sync::Arc;

    /// Ten files where fN.py is the target of N edges from an external id.
    fn ranked_graph() -> CodeGraph {
        let mut graph = CodeGraph::new();
        for n in 0..10 {
            let path = format!("f{}.py", n);
            graph.add_file(SourceFile::new(&path, "python"));
            for k in 0..n {
                graph.add_edge(GraphEdge::new(
                    format!("e{}_{}", n, k),
                    "ext:caller",
                    &path,
                    "imports",
                ));
            }
        }
        graph
    }

    #[test]
    fn test_removes_lowest_thirty_percent() {
        let request = CompactRequest::new(Arc::new(ranked_graph()));
        let result = FrequencyStrategy::default()
            .compact(&CompactContext::new(), &request)
            .unwrap();
        assert_eq!(result.removed.files, vec!["f0.py", "f1.py", "f2.py"]);
        assert_eq!(result.metadata["files_analyzed"], json!(10));
        assert_eq!(result.metadata["removal_percentage"], json!(0.3));
    }

    #[test]
    fn test_preserved_entries_consume_slots() {
        let request = CompactRequest::new(Arc::new(ranked_graph()))
            .with_requirements(CompactRequirements::new().preserve_file("f0.py"));
        let result = FrequencyStrategy::default()
            .compact(&CompactContext::new(), &request)
            .unwrap();
        assert_eq!(result.removed.files, vec!["f1.py", "f2.py"]);
        assert!(result.compacted_graph.files.contains_key("f0.py"));
    }

    #[test]
    fn test_ties_break_by_id() {
        let mut graph = CodeGraph::new();
        for path in ["c.py", "a.py", "b.py", "d.py"] {
            graph.add_file(SourceFile::new(path, "python"));
        }
        let strategy = FrequencyStrategy::new(0.5);
        let ranked = strategy.rank_files(&CompactContext::new(), &graph).unwrap();
        let order: Vec<&str> = ranked.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(order, vec!["a.py", "b.py", "c.py", "d.py"]);

        let request = CompactRequest::new(Arc::new(graph));
        for _ in 0..5 {
            let result = strategy.compact(&CompactContext::new(), &request).unwrap();
            assert_eq!(result.removed.files, vec!["a.py", "b.py"]);
        }
    }

    #[test]
    fn test_symbol_counts_once_per_file() {
        let mut graph = CodeGraph::new();
        graph.add_file(SourceFile::new("a.py", "python").with_symbols(["s1", "s1", "s2"]));
        graph.add_file(SourceFile::new("b.py", "python").with_symbols(["s2"]));
        graph.add_symbol(Symbol::new("s1", "one", SymbolKind::Function));
        graph.add_symbol(Symbol::new("s2", "two", SymbolKind::Function));
        graph.add_symbol(Symbol::new("s3", "three", SymbolKind::Function));

        let ranked = FrequencyStrategy::default()
            .rank_symbols(&CompactContext::new(), &graph)
            .unwrap();
        assert_eq!(
            ranked,
            vec![("s3".to_string(), 0), ("s1".to_string(), 1), ("s2".to_string(), 2)]
        );
    }

    #[test]
    fn test_analyzer_estimate() {
        let analysis = FrequencyStrategy::default().analyze_potential(&ranked_graph());
        assert_eq!(analysis.removable_files, 3);
        assert_eq!(analysis.removable_symbols, 0);
        assert_eq!(analysis.confidence, 0.8);
    }
}
