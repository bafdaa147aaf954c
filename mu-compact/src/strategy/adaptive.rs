//! Strategy selection from graph shape.
//!
//! [`analyze_graph`] measures a few characteristics, [`select_strategy`] maps
//! them to a built-in strategy through a fixed decision table, and
//! [`AdaptiveStrategy`] runs the selected one. Selection is pure, so the same
//! graph always picks the same strategy.

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::base::require_graph;
use super::{
    CompactionStrategy, DependencyStrategy, FrequencyStrategy, RelevanceStrategy, SizeStrategy,
    ADAPTIVE, DEPENDENCY, FREQUENCY, RELEVANCE, SIZE,
};
use crate::config::CompactConfig;
use crate::context::CompactContext;
use crate::error::Result;
use crate::graph::CodeGraph;
use crate::types::{CompactRequest, CompactResult};

/// Cut-off values for the decision table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdaptiveThresholds {
    pub connectivity: f64,
    pub large_file_size: f64,
    pub unused_symbol_ratio: f64,
}

impl Default for AdaptiveThresholds {
    fn default() -> Self {
        Self::from_config(&CompactConfig::default())
    }
}

impl AdaptiveThresholds {
    pub fn from_config(config: &CompactConfig) -> Self {
        Self {
            connectivity: config.adaptive_threshold,
            large_file_size: config.large_file_threshold,
            unused_symbol_ratio: config.unused_symbol_threshold,
        }
    }
}

/// Measured shape of a graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GraphCharacteristics {
    pub file_count: usize,
    pub symbol_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
    /// `edges / (nodes * (nodes - 1))`, 0 below two nodes.
    pub connectivity_ratio: f64,
    pub avg_file_size: f64,
    /// Share of symbols listed by no file.
    pub unused_symbol_ratio: f64,
    pub high_connectivity: bool,
    pub large_files: bool,
    pub many_unused_symbols: bool,
}

pub fn analyze_graph(graph: &CodeGraph, thresholds: &AdaptiveThresholds) -> GraphCharacteristics {
    let file_count = graph.files.len();
    let symbol_count = graph.symbols.len();
    let node_count = graph.nodes.len();
    let edge_count = graph.edges.len();

    let connectivity_ratio = if node_count < 2 {
        0.0
    } else {
        edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };

    let avg_file_size = if file_count == 0 {
        0.0
    } else {
        graph.files.values().map(|f| f.size as f64).sum::<f64>() / file_count as f64
    };

    let listed: HashSet<&str> = graph
        .files
        .values()
        .flat_map(|f| f.symbols.iter().map(String::as_str))
        .collect();
    let unused = graph
        .symbols
        .keys()
        .filter(|id| !listed.contains(id.as_str()))
        .count();
    let unused_symbol_ratio = if symbol_count == 0 {
        0.0
    } else {
        unused as f64 / symbol_count as f64
    };

    GraphCharacteristics {
        file_count,
        symbol_count,
        node_count,
        edge_count,
        connectivity_ratio,
        avg_file_size,
        unused_symbol_ratio,
        high_connectivity: connectivity_ratio > thresholds.connectivity,
        large_files: avg_file_size > thresholds.large_file_size,
        many_unused_symbols: unused_symbol_ratio > thresholds.unused_symbol_ratio,
    }
}

type Rule = (fn(&GraphCharacteristics) -> bool, &'static str);

/// First matching rule wins; relevance is the fallback.
const DECISION_TABLE: &[Rule] = &[
    (is_highly_connected, DEPENDENCY),
    (has_large_files, SIZE),
    (has_many_unused_symbols, FREQUENCY),
];

fn is_highly_connected(c: &GraphCharacteristics) -> bool {
    c.high_connectivity
}

fn has_large_files(c: &GraphCharacteristics) -> bool {
    c.large_files
}

fn has_many_unused_symbols(c: &GraphCharacteristics) -> bool {
    c.many_unused_symbols
}

/// Name of the strategy the decision table picks for `characteristics`.
pub fn select_strategy(characteristics: &GraphCharacteristics) -> &'static str {
    DECISION_TABLE
        .iter()
        .find(|(applies, _)| applies(characteristics))
        .map_or(RELEVANCE, |&(_, name)| name)
}

/// Delegates to whichever built-in suits the graph.
pub struct AdaptiveStrategy {
    thresholds: AdaptiveThresholds,
    relevance: RelevanceStrategy,
    frequency: FrequencyStrategy,
    dependency: DependencyStrategy,
    size: SizeStrategy,
}

impl Default for AdaptiveStrategy {
    fn default() -> Self {
        Self::from_config(&CompactConfig::default())
    }
}

impl AdaptiveStrategy {
    pub fn from_config(config: &CompactConfig) -> Self {
        Self {
            thresholds: AdaptiveThresholds::from_config(config),
            relevance: RelevanceStrategy::from_overrides(&config.strategies),
            frequency: FrequencyStrategy::from_overrides(&config.strategies),
            dependency: DependencyStrategy::new(),
            size: SizeStrategy::new(config.max_context_size),
        }
    }

    pub fn thresholds(&self) -> &AdaptiveThresholds {
        &self.thresholds
    }

    fn delegate(&self, name: &str) -> &dyn CompactionStrategy {
        match name {
            DEPENDENCY => &self.dependency,
            SIZE => &self.size,
            FREQUENCY => &self.frequency,
            _ => &self.relevance,
        }
    }
}

impl CompactionStrategy for AdaptiveStrategy {
    fn name(&self) -> &str {
        ADAPTIVE
    }

    fn description(&self) -> &str {
        "Selects a strategy from graph connectivity, file size and symbol usage"
    }

    fn compact(&self, ctx: &CompactContext, request: &CompactRequest) -> Result<CompactResult> {
        let started = Instant::now();
        let graph = require_graph(request)?;
        let characteristics = analyze_graph(graph, &self.thresholds);
        let selected = select_strategy(&characteristics);
        debug!(
            selected,
            connectivity = characteristics.connectivity_ratio,
            avg_file_size = characteristics.avg_file_size,
            unused_ratio = characteristics.unused_symbol_ratio,
            "adaptive selection"
        );

        let mut result = self.delegate(selected).compact(ctx, request)?;
        result.strategy_used = ADAPTIVE.to_string();
        result.execution_time = started.elapsed();
        result
            .metadata
            .insert("selected_strategy".into(), json!(selected));
        result
            .metadata
            .insert("characteristics".into(), json!(characteristics));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode, SourceFile, Symbol, SymbolKind};
    use std::sync::Arc;

    fn characteristics(high: bool, large: bool, unused: bool) -> GraphCharacteristics {
        GraphCharacteristics {
            high_connectivity: high,
            large_files: large,
            many_unused_symbols: unused,
            ..Default::default()
        }
    }

    #[test]
    fn test_decision_table_priority() {
        assert_eq!(select_strategy(&characteristics(true, true, true)), "dependency");
        assert_eq!(select_strategy(&characteristics(false, true, true)), "size");
        assert_eq!(select_strategy(&characteristics(false, false, true)), "frequency");
        assert_eq!(select_strategy(&characteristics(false, false, false)), "relevance");
    }

    #[test]
    fn test_connectivity_ratio() {
        let mut graph = CodeGraph::new();
        graph.add_node(GraphNode::new("a", "file"));
        let single = analyze_graph(&graph, &AdaptiveThresholds::default());
        assert_eq!(single.connectivity_ratio, 0.0);

        graph.add_node(GraphNode::new("b", "file"));
        graph.add_edge(GraphEdge::new("e1", "a", "b", "imports"));
        let pair = analyze_graph(&graph, &AdaptiveThresholds::default());
        assert_eq!(pair.connectivity_ratio, 0.5);
        assert!(pair.high_connectivity);
    }

    #[test]
    fn test_unused_symbol_ratio() {
        let mut graph = CodeGraph::new();
        graph.add_file(SourceFile::new("a.py", "python").with_symbols(["s1"]));
        for id in ["s1", "s2", "s3", "s4"] {
            graph.add_symbol(Symbol::new(id, id, SymbolKind::Function));
        }
        let c = analyze_graph(&graph, &AdaptiveThresholds::default());
        assert_eq!(c.unused_symbol_ratio, 0.75);
        assert!(c.many_unused_symbols);
        assert_eq!(select_strategy(&c), "frequency");
    }

    #[test]
    fn test_large_files_select_size() {
        let mut graph = CodeGraph::new();
        graph.add_file(SourceFile::new("big.rs", "rust").with_size(50_000, 1_000));
        let c = analyze_graph(&graph, &AdaptiveThresholds::default());
        assert!(c.large_files);
        assert_eq!(select_strategy(&c), "size");
    }

    #[test]
    fn test_compact_tags_selection() {
        let mut graph = CodeGraph::new();
        graph.add_file(SourceFile::new("a.py", "python"));
        graph.add_file(SourceFile::new("b.py", "python"));
        let request = CompactRequest::new(Arc::new(graph));

        let strategy = AdaptiveStrategy::default();
        let first = strategy.compact(&CompactContext::new(), &request).unwrap();
        let second = strategy.compact(&CompactContext::new(), &request).unwrap();

        assert_eq!(first.strategy_used, "adaptive");
        assert_eq!(first.metadata["selected_strategy"], json!("relevance"));
        assert_eq!(
            first.metadata["selected_strategy"],
            second.metadata["selected_strategy"]
        );
        assert_eq!(first.metadata["characteristics"]["file_count"], json!(2));
    }
}
