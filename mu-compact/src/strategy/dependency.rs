//! Structural pruning based on dependency degrees.
//!
//! A file with no incoming and no outgoing edge contributes nothing to the
//! dependency picture and is removed. Symbols only take part when the graph
//! carries symbol-level edges: a symbol referenced at most once and
//! referencing nothing is considered weak and removed.

use std::collections::HashMap;
use std::time::Instant;

use petgraph::algo::{condensation, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde_json::json;
use tracing::debug;

use super::base::{
    cleanup_orphans, deep_copy, is_file_preserved, is_symbol_preserved, remove_file,
    remove_symbol, require_graph, sorted_keys,
};
use super::{CompactionStrategy, PotentialAnalyzer, DEPENDENCY};
use crate::context::CompactContext;
use crate::error::Result;
use crate::graph::CodeGraph;
use crate::types::{CompactRequest, CompactRequirements, CompactResult, RemovedItems, StrategyAnalysis};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Degree {
    incoming: usize,
    outgoing: usize,
}

/// In/out degrees of files and of edge-touched symbols.
#[derive(Debug, Default)]
struct DegreeTable {
    files: HashMap<String, Degree>,
    symbols: HashMap<String, Degree>,
}

impl DegreeTable {
    fn build(ctx: &CompactContext, graph: &CodeGraph) -> Result<Self> {
        let mut table = DegreeTable {
            files: graph
                .files
                .keys()
                .map(|path| (path.clone(), Degree::default()))
                .collect(),
            symbols: HashMap::new(),
        };

        for (i, edge) in graph.edges.values().enumerate() {
            ctx.checkpoint(i)?;
            if let Some(degree) = table.files.get_mut(&edge.source) {
                degree.outgoing += 1;
            }
            if let Some(degree) = table.files.get_mut(&edge.target) {
                degree.incoming += 1;
            }
            if graph.symbols.contains_key(&edge.source) {
                table.symbols.entry(edge.source.clone()).or_default().outgoing += 1;
            }
            if graph.symbols.contains_key(&edge.target) {
                table.symbols.entry(edge.target.clone()).or_default().incoming += 1;
            }
        }
        Ok(table)
    }

    fn isolated_files(&self, requirements: &CompactRequirements) -> Vec<String> {
        sorted_keys(&self.files)
            .into_iter()
            .filter(|path| self.files[path] == Degree::default())
            .filter(|path| !is_file_preserved(path, requirements))
            .collect()
    }

    fn weak_symbols(&self, requirements: &CompactRequirements) -> Vec<String> {
        sorted_keys(&self.symbols)
            .into_iter()
            .filter(|id| {
                let degree = self.symbols[id];
                degree.incoming <= 1 && degree.outgoing == 0
            })
            .filter(|id| !is_symbol_preserved(id, requirements))
            .collect()
    }
}

/// Length, in edges, of the longest chain in the file dependency graph.
///
/// Strongly connected components are collapsed first, so import cycles count
/// as a single step.
pub fn dependency_depth(graph: &CodeGraph) -> usize {
    let mut deps: DiGraph<String, ()> = DiGraph::new();
    let mut index: HashMap<String, NodeIndex> = HashMap::new();
    for path in sorted_keys(&graph.files) {
        let idx = deps.add_node(path.clone());
        index.insert(path, idx);
    }
    for edge in graph.sorted_edges() {
        if let (Some(&from), Some(&to)) = (index.get(&edge.source), index.get(&edge.target)) {
            deps.add_edge(from, to, ());
        }
    }

    let dag = condensation(deps, true);
    let Ok(order) = toposort(&dag, None) else {
        return 0;
    };

    let mut depth = vec![0usize; dag.node_count()];
    for node in order {
        let here = depth[node.index()];
        for next in dag.neighbors_directed(node, Direction::Outgoing) {
            if depth[next.index()] < here + 1 {
                depth[next.index()] = here + 1;
            }
        }
    }
    depth.into_iter().max().unwrap_or(0)
}

/// Removes isolated files and weakly referenced symbols.
#[derive(Clone, Debug, Default)]
pub struct DependencyStrategy;

impl DependencyStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl CompactionStrategy for DependencyStrategy {
    fn name(&self) -> &str {
        DEPENDENCY
    }

    fn description(&self) -> &str {
        "Removes files without dependencies and weakly referenced symbols"
    }

    fn compact(&self, ctx: &CompactContext, request: &CompactRequest) -> Result<CompactResult> {
        let started = Instant::now();
        let graph = require_graph(request)?;
        let requirements = request.requirements_or_default();
        let table = DegreeTable::build(ctx, graph)?;

        let isolated_files = table.isolated_files(&requirements);
        let weak_symbols = table.weak_symbols(&requirements);

        let mut compacted = deep_copy(graph);
        let mut removed = RemovedItems {
            reason: "no dependency relationships".to_string(),
            ..Default::default()
        };
        for path in &isolated_files {
            remove_file(&mut compacted, path, &mut removed);
        }
        for id in &weak_symbols {
            remove_symbol(&mut compacted, id, &mut removed);
        }
        cleanup_orphans(ctx, &mut compacted, &mut removed)?;

        let depth = dependency_depth(&compacted);
        debug!(
            isolated_files = isolated_files.len(),
            weak_symbols = weak_symbols.len(),
            depth,
            "dependency pruning finished"
        );

        let mut result = CompactResult::new(graph, compacted, DEPENDENCY);
        result.removed = removed;
        result.execution_time = started.elapsed();
        result
            .metadata
            .insert("isolated_files".into(), json!(isolated_files.len()));
        result
            .metadata
            .insert("isolated_symbols".into(), json!(weak_symbols.len()));
        result.metadata.insert("dependency_depth".into(), json!(depth));
        Ok(result)
    }

    fn as_analyzer(&self) -> Option<&dyn PotentialAnalyzer> {
        Some(self)
    }
}

impl PotentialAnalyzer for DependencyStrategy {
    fn analyze_potential(&self, graph: &CodeGraph) -> StrategyAnalysis {
        let requirements = CompactRequirements::default();
        let (files, symbols) = DegreeTable::build(&CompactContext::new(), graph)
            .map(|table| {
                (
                    table.isolated_files(&requirements).len(),
                    table.weak_symbols(&requirements).len(),
                )
            })
            .unwrap_or_default();
        StrategyAnalysis::estimate(DEPENDENCY, graph, files, symbols, 0.9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode, SourceFile, Symbol, SymbolKind};
    use std::sync::Arc;

    fn files_graph(paths: &[&str], edges: &[(&str, &str)]) -> CodeGraph {
        let mut graph = CodeGraph::new();
        for path in paths {
            graph.add_file(SourceFile::new(*path, "rust"));
            graph.add_node(GraphNode::new(*path, "file"));
        }
        for (i, (from, to)) in edges.iter().enumerate() {
            graph.add_edge(GraphEdge::new(format!("e{}", i), *from, *to, "imports"));
        }
        graph
    }

    #[test]
    fn test_removes_isolated_files() {
        let graph = files_graph(&["a.rs", "b.rs", "lonely.rs"], &[("a.rs", "b.rs")]);
        let request = CompactRequest::new(Arc::new(graph));
        let result = DependencyStrategy::new()
            .compact(&CompactContext::new(), &request)
            .unwrap();
        assert_eq!(result.removed.files, vec!["lonely.rs"]);
        assert_eq!(result.removed.nodes, vec!["lonely.rs"]);
        assert_eq!(result.metadata["isolated_files"], json!(1));
        assert_eq!(result.metadata["isolated_symbols"], json!(0));
        assert_eq!(result.metadata["dependency_depth"], json!(1));
    }

    #[test]
    fn test_preserved_isolated_file_survives() {
        let graph = files_graph(&["a.rs", "main.rs"], &[]);
        let request = CompactRequest::new(Arc::new(graph))
            .with_requirements(CompactRequirements::new().preserve_file("main.rs"));
        let result = DependencyStrategy::new()
            .compact(&CompactContext::new(), &request)
            .unwrap();
        assert_eq!(result.removed.files, vec!["a.rs"]);
        assert!(result.compacted_graph.files.contains_key("main.rs"));
    }

    #[test]
    fn test_symbols_untouched_without_symbol_edges() {
        let mut graph = files_graph(&["a.rs", "b.rs"], &[("a.rs", "b.rs")]);
        graph.add_symbol(Symbol::new("fn:x", "x", SymbolKind::Function));
        let request = CompactRequest::new(Arc::new(graph));
        let result = DependencyStrategy::new()
            .compact(&CompactContext::new(), &request)
            .unwrap();
        assert!(result.removed.symbols.is_empty());
        assert!(result.compacted_graph.symbols.contains_key("fn:x"));
    }

    #[test]
    fn test_weak_symbols_removed() {
        let mut graph = files_graph(&["a.rs", "b.rs"], &[("a.rs", "b.rs")]);
        for id in ["fn:caller", "fn:leaf", "fn:shared"] {
            graph.add_symbol(Symbol::new(id, id, SymbolKind::Function));
            graph.add_node(GraphNode::new(id, "symbol"));
        }
        graph.add_edge(GraphEdge::new("s1", "fn:caller", "fn:leaf", "calls"));
        graph.add_edge(GraphEdge::new("s2", "fn:caller", "fn:shared", "calls"));
        graph.add_edge(GraphEdge::new("s3", "b.rs", "fn:shared", "calls"));

        let request = CompactRequest::new(Arc::new(graph));
        let result = DependencyStrategy::new()
            .compact(&CompactContext::new(), &request)
            .unwrap();
        // caller has out-degree 2, shared has in-degree 2
        assert_eq!(result.removed.symbols, vec!["fn:leaf"]);
        assert_eq!(result.removed.nodes, vec!["fn:leaf"]);
        assert_eq!(result.removed.edges, vec!["s1"]);
    }

    #[test]
    fn test_edges_to_missing_nodes_dropped() {
        let mut graph = files_graph(&["a.py", "b.py"], &[("a.py", "b.py")]);
        graph.add_edge(GraphEdge::new("ghost", "a.py", "ext:requests", "imports"));

        let request = CompactRequest::new(Arc::new(graph));
        let result = DependencyStrategy::new()
            .compact(&CompactContext::new(), &request)
            .unwrap();
        assert!(result.removed.files.is_empty());
        assert_eq!(result.removed.edges, vec!["ghost"]);
        assert!(result.compacted_graph.edges.contains_key("e0"));
    }

    #[test]
    fn test_dependency_depth_collapses_cycles() {
        let chain = files_graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
        assert_eq!(dependency_depth(&chain), 3);

        let cyclic = files_graph(&["a", "b", "c"], &[("a", "b"), ("b", "a"), ("b", "c")]);
        assert_eq!(dependency_depth(&cyclic), 1);

        assert_eq!(dependency_depth(&CodeGraph::new()), 0);
    }

    #[test]
    fn test_analyzer_counts_isolated() {
        let graph = files_graph(&["a.rs", "b.rs", "c.rs"], &[("a.rs", "b.rs")]);
        let analysis = DependencyStrategy::new().analyze_potential(&graph);
        assert_eq!(analysis.removable_files, 1);
        assert_eq!(analysis.confidence, 0.9);
    }
}
