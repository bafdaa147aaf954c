//! Size-bounded pruning.
//!
//! Files are costed by bytes, lines and contained symbols. The most expensive
//! unpreserved files go first, each taking its node and incident edges with
//! it, until the graph fits the requested size.

use std::time::Instant;

use serde_json::json;
use tracing::{debug, warn};

use super::base::{
    calculate_graph_size, cleanup_orphans, deep_copy, edges_by_endpoint, is_file_preserved,
    remove_file, require_graph,
};
use super::{CompactionStrategy, PotentialAnalyzer, SIZE};
use crate::context::CompactContext;
use crate::error::{CompactError, Result};
use crate::graph::{CodeGraph, SourceFile};
use crate::types::{
    CompactRequest, CompactRequirements, CompactResult, RemovedItems, StrategyAnalysis,
    NO_ACTION_KEY,
};

/// Weight of one contained symbol in a file's cost.
pub const SYMBOL_COST: u64 = 10;

/// Cost of keeping a file in the graph.
pub fn file_cost(file: &SourceFile) -> u64 {
    file.size + file.symbol_count as u64 * SYMBOL_COST + file.lines
}

/// Removes the costliest files until the graph fits a size target.
#[derive(Clone, Debug)]
pub struct SizeStrategy {
    default_target: usize,
    strict: bool,
}

impl Default for SizeStrategy {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl SizeStrategy {
    /// `default_target` applies when a request carries no positive size.
    pub fn new(default_target: usize) -> Self {
        Self {
            default_target,
            strict: false,
        }
    }

    /// Fail with `PreservationUnsatisfiable` instead of returning an
    /// oversized graph when preserved files alone exceed the target.
    pub fn strict(default_target: usize) -> Self {
        Self {
            default_target,
            strict: true,
        }
    }

    fn target(&self, request: &CompactRequest) -> usize {
        if request.max_size > 0 {
            request.target_size()
        } else {
            self.default_target
        }
    }

    /// Unpreserved files, most expensive first, ties by path.
    fn candidates<'g>(
        &self,
        graph: &'g CodeGraph,
        requirements: &CompactRequirements,
    ) -> Vec<(&'g str, u64)> {
        let mut files: Vec<(&str, u64)> = graph
            .files
            .values()
            .filter(|file| !is_file_preserved(&file.path, requirements))
            .map(|file| (file.path.as_str(), file_cost(file)))
            .collect();
        files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        files
    }
}

impl CompactionStrategy for SizeStrategy {
    fn name(&self) -> &str {
        SIZE
    }

    fn description(&self) -> &str {
        "Removes the largest files until the graph fits the size target"
    }

    fn compact(&self, ctx: &CompactContext, request: &CompactRequest) -> Result<CompactResult> {
        let started = Instant::now();
        let graph = require_graph(request)?;
        let requirements = request.requirements_or_default();
        let target = self.target(request);
        let initial = calculate_graph_size(graph);

        if initial <= target {
            debug!(initial, target, "graph already within size target");
            let mut result = CompactResult::new(graph, deep_copy(graph), SIZE);
            result.execution_time = started.elapsed();
            result.metadata.insert(NO_ACTION_KEY.into(), json!(true));
            result.metadata.insert("target_size".into(), json!(target));
            result.metadata.insert("initial_size".into(), json!(initial));
            return Ok(result);
        }

        let mut compacted = deep_copy(graph);
        let mut removed = RemovedItems {
            reason: format!("graph size above target {}", target),
            ..Default::default()
        };
        let incident = edges_by_endpoint(graph);
        let mut current = initial;

        for (i, (path, _)) in self.candidates(graph, &requirements).into_iter().enumerate() {
            ctx.checkpoint(i)?;
            if current <= target {
                break;
            }
            remove_file(&mut compacted, path, &mut removed);
            if compacted.nodes.remove(path).is_some() {
                removed.nodes.push(path.to_string());
            }
            let mut edges: Vec<&String> = incident
                .get(path)
                .map(|ids| ids.iter().collect())
                .unwrap_or_default();
            edges.sort();
            for id in edges {
                if compacted.edges.remove(id).is_some() {
                    removed.edges.push(id.clone());
                }
            }
            current = calculate_graph_size(&compacted);
        }
        cleanup_orphans(ctx, &mut compacted, &mut removed)?;
        current = calculate_graph_size(&compacted);

        let mut result = CompactResult::new(graph, compacted, SIZE);
        if current > target {
            let preserved_files = result.compacted_graph.files.len();
            if self.strict {
                return Err(CompactError::PreservationUnsatisfiable {
                    preserved: current,
                    max_size: target,
                });
            }
            warn!(current, target, preserved_files, "size target not reachable");
            result.warnings.push(format!(
                "size target {} not reached ({} remaining, {} preserved files)",
                target, current, preserved_files
            ));
        }

        debug!(
            removed_files = removed.files.len(),
            initial,
            current,
            target,
            "size pruning finished"
        );

        result.removed = removed;
        result.execution_time = started.elapsed();
        result.metadata.insert(NO_ACTION_KEY.into(), json!(false));
        result.metadata.insert("target_size".into(), json!(target));
        result.metadata.insert("initial_size".into(), json!(initial));
        Ok(result)
    }

    fn as_analyzer(&self) -> Option<&dyn PotentialAnalyzer> {
        Some(self)
    }
}

impl PotentialAnalyzer for SizeStrategy {
    fn analyze_potential(&self, graph: &CodeGraph) -> StrategyAnalysis {
        // Each removal frees the file, its node and its incident edges.
        let incident = edges_by_endpoint(graph);
        let mut over = calculate_graph_size(graph).saturating_sub(self.default_target);
        let mut files = 0;
        for (path, _) in self.candidates(graph, &CompactRequirements::default()) {
            if over == 0 {
                break;
            }
            let node = usize::from(graph.nodes.contains_key(path));
            let edges = incident.get(path).map_or(0, Vec::len);
            over = over.saturating_sub(1 + node + edges);
            files += 1;
        }
        StrategyAnalysis::estimate(SIZE, graph, files, 0, 0.95)
    }
}
