//! Relevance, frequency and dependency pruning chained together.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value};
use tracing::debug;

use super::base::require_graph;
use super::{
    CompactionStrategy, DependencyStrategy, FrequencyStrategy, RelevanceStrategy, HYBRID,
};
use crate::config::StrategyOverrides;
use crate::context::CompactContext;
use crate::error::Result;
use crate::types::{CompactRequest, CompactResult, RemovedItems};

/// Runs each stage on the previous stage's output.
pub struct HybridStrategy {
    stages: Vec<Box<dyn CompactionStrategy>>,
}

impl Default for HybridStrategy {
    fn default() -> Self {
        Self::from_overrides(&StrategyOverrides::default())
    }
}

impl HybridStrategy {
    pub fn from_overrides(overrides: &StrategyOverrides) -> Self {
        Self {
            stages: vec![
                Box::new(RelevanceStrategy::from_overrides(overrides)),
                Box::new(FrequencyStrategy::from_overrides(overrides)),
                Box::new(DependencyStrategy::new()),
            ],
        }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }
}

impl CompactionStrategy for HybridStrategy {
    fn name(&self) -> &str {
        HYBRID
    }

    fn description(&self) -> &str {
        "Applies relevance, frequency and dependency pruning in sequence"
    }

    fn compact(&self, ctx: &CompactContext, request: &CompactRequest) -> Result<CompactResult> {
        let started = Instant::now();
        let original = require_graph(request)?;

        let mut current = Arc::new(original.clone());
        let mut removed = RemovedItems::default();
        let mut warnings = Vec::new();
        let mut stage_metadata = Map::new();

        for stage in &self.stages {
            ctx.check()?;
            let stage_request = CompactRequest {
                graph: Some(current),
                ..request.clone()
            };
            let outcome = stage.compact(ctx, &stage_request)?;
            debug!(
                stage = stage.name(),
                removed = outcome.removed.total(),
                size = outcome.compacted_size,
                "hybrid stage finished"
            );

            removed.merge(outcome.removed);
            warnings.extend(outcome.warnings);
            stage_metadata.insert(
                stage.name().to_string(),
                Value::Object(outcome.metadata.into_iter().collect()),
            );
            current = Arc::new(outcome.compacted_graph);
        }

        let compacted = Arc::try_unwrap(current).unwrap_or_else(|shared| (*shared).clone());
        let mut result = CompactResult::new(original, compacted, HYBRID);
        result.removed = removed;
        result.warnings = warnings;
        result.execution_time = started.elapsed();
        result
            .metadata
            .insert("stages_applied".into(), json!(self.stages.len()));
        result
            .metadata
            .insert("stage_metadata".into(), Value::Object(stage_metadata));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{CodeGraph, GraphEdge, GraphNode, SourceFile};
    use crate::types::CompactRequirements;

    fn sample() -> CodeGraph {
        let mut graph = CodeGraph::new();
        for n in 0..6 {
            let path = format!("src/m{}.rs", n);
            graph.add_file(SourceFile::new(&path, "rust"));
            graph.add_node(GraphNode::new(&path, "file"));
        }
        graph.add_edge(GraphEdge::new("e1", "src/m0.rs", "src/m1.rs", "imports"));
        graph.add_edge(GraphEdge::new("e2", "src/m1.rs", "src/m2.rs", "imports"));
        graph
    }

    #[test]
    fn test_reports_three_stages() {
        let request = CompactRequest::new(Arc::new(sample()));
        let result = HybridStrategy::default()
            .compact(&CompactContext::new(), &request)
            .unwrap();

        assert_eq!(result.strategy_used, "hybrid");
        assert_eq!(result.metadata["stages_applied"], json!(3));
        let stages = result.metadata["stage_metadata"].as_object().unwrap();
        assert_eq!(stages.len(), 3);
        for name in ["relevance", "frequency", "dependency"] {
            assert!(stages.contains_key(name), "missing stage {}", name);
        }
    }

    #[test]
    fn test_removed_lists_have_no_duplicates() {
        let request = CompactRequest::new(Arc::new(sample()))
            .with_requirements(CompactRequirements::new().preserve_file("src/m0.rs"));
        let result = HybridStrategy::default()
            .compact(&CompactContext::new(), &request)
            .unwrap();

        let mut files = result.removed.files.clone();
        files.sort();
        files.dedup();
        assert_eq!(files.len(), result.removed.files.len());
        assert!(result.compacted_graph.files.contains_key("src/m0.rs"));
        assert!(result.compacted_size <= result.original_size);
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(
            HybridStrategy::default().stage_names(),
            vec!["relevance", "frequency", "dependency"]
        );
    }
}
