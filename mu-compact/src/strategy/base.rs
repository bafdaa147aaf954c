//! Helpers shared by every built-in strategy.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::context::CompactContext;
use crate::error::{CompactError, Result};
use crate::graph::CodeGraph;
use crate::types::{CompactRequest, CompactRequirements, RemovedItems};

/// Produce a graph that shares nothing with `graph`.
///
/// All collections own their data, so a clone is a full deep copy: mutating
/// the copy can never be observed through the caller's graph.
pub fn deep_copy(graph: &CodeGraph) -> CodeGraph {
    graph.clone()
}

/// Borrow the request graph or fail with `InvalidRequest`.
pub fn require_graph(request: &CompactRequest) -> Result<&CodeGraph> {
    request
        .graph
        .as_deref()
        .ok_or_else(|| CompactError::invalid_request("graph is required"))
}

/// Exact path match, or the path contains one of the preserve patterns.
pub fn is_file_preserved(path: &str, requirements: &CompactRequirements) -> bool {
    requirements.preserve_files.contains(path)
        || requirements
            .preserve_paths
            .iter()
            .any(|pattern| !pattern.is_empty() && path.contains(pattern.as_str()))
}

/// Exact symbol id match only.
pub fn is_symbol_preserved(id: &str, requirements: &CompactRequirements) -> bool {
    requirements.preserve_symbols.contains(id)
}

/// Uniform graph size: files + symbols + nodes + edges.
pub fn calculate_graph_size(graph: &CodeGraph) -> usize {
    graph.size()
}

/// Remove a file from the copy and record it.
pub fn remove_file(graph: &mut CodeGraph, path: &str, removed: &mut RemovedItems) -> bool {
    if graph.files.remove(path).is_some() {
        removed.files.push(path.to_string());
        true
    } else {
        false
    }
}

/// Remove a symbol from the copy and record it.
pub fn remove_symbol(graph: &mut CodeGraph, id: &str, removed: &mut RemovedItems) -> bool {
    if graph.symbols.remove(id).is_some() {
        removed.symbols.push(id.to_string());
        true
    } else {
        false
    }
}

/// Drop nodes and edges left dangling by file/symbol removal.
///
/// A node whose id names a removed file or symbol goes with it. An edge is
/// kept only while both its source and target exist in the node map.
pub fn cleanup_orphans(
    ctx: &CompactContext,
    graph: &mut CodeGraph,
    removed: &mut RemovedItems,
) -> Result<()> {
    let gone: HashSet<String> = removed
        .files
        .iter()
        .chain(removed.symbols.iter())
        .chain(removed.nodes.iter())
        .cloned()
        .collect();

    let mut orphan_nodes: Vec<String> = graph
        .nodes
        .keys()
        .filter(|id| gone.contains(*id))
        .cloned()
        .collect();
    orphan_nodes.sort();
    for id in orphan_nodes {
        graph.nodes.remove(&id);
        removed.nodes.push(id);
    }

    let mut orphan_edges = Vec::new();
    for (i, edge) in graph.edges.values().enumerate() {
        ctx.checkpoint(i)?;
        if !graph.nodes.contains_key(&edge.source) || !graph.nodes.contains_key(&edge.target) {
            orphan_edges.push(edge.id.clone());
        }
    }
    orphan_edges.sort();
    for id in orphan_edges {
        graph.edges.remove(&id);
        removed.edges.push(id);
    }

    debug!(
        nodes = removed.nodes.len(),
        edges = removed.edges.len(),
        "orphan cleanup finished"
    );
    Ok(())
}

/// Edge ids grouped by endpoint, for repeated cascading removals.
pub fn edges_by_endpoint(graph: &CodeGraph) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for edge in graph.edges.values() {
        index
            .entry(edge.source.clone())
            .or_default()
            .push(edge.id.clone());
        if edge.target != edge.source {
            index
                .entry(edge.target.clone())
                .or_default()
                .push(edge.id.clone());
        }
    }
    index
}

/// Sorted keys of a map, for deterministic visit order.
pub fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}
