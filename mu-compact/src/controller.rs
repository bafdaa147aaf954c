//! Compaction controller.
//!
//! The controller owns the strategy registry and the running metrics. It
//! validates requests, resolves which strategy runs (explicit name, adaptive
//! selection, or the configured default), and decorates the strategy's result
//! with requirement warnings and an impact analysis.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::CompactConfig;
use crate::context::CompactContext;
use crate::error::{CompactError, Result};
use crate::graph::CodeGraph;
use crate::impact::analyze_impact;
use crate::metrics::CompactionMetrics;
use crate::registry::{StrategyInfo, StrategyRegistry};
use crate::requirements::verify_requirements;
use crate::strategy::base::require_graph;
use crate::strategy::{
    analyze_graph, select_strategy, AdaptiveThresholds, CompactionStrategy, ADAPTIVE,
};
use crate::types::{CompactRequest, CompactResult, CompactionAnalysis, RiskLevel, StrategyAnalysis};

/// Strategy name reported when compaction is disabled.
pub const DISABLED_STRATEGY: &str = "none";

/// Entry point for compacting graphs.
pub struct CompactController {
    config: CompactConfig,
    registry: StrategyRegistry,
    metrics: Mutex<CompactionMetrics>,
}

/// How a request's strategy was chosen.
struct Resolved {
    name: String,
    strategy: Arc<dyn CompactionStrategy>,
    adaptive: Option<serde_json::Value>,
}

impl CompactController {
    /// Create a controller with the built-in strategies registered.
    pub fn new(config: CompactConfig) -> Result<Self> {
        config.validate()?;
        let registry = StrategyRegistry::with_builtins(&config);
        debug!(strategies = registry.len(), "compact controller ready");
        Ok(Self {
            config,
            registry,
            metrics: Mutex::new(CompactionMetrics::default()),
        })
    }

    pub fn config(&self) -> &CompactConfig {
        &self.config
    }

    /// Register or replace a strategy under `name`.
    pub fn register_strategy(&self, name: impl Into<String>, strategy: Arc<dyn CompactionStrategy>) {
        self.registry.register_as(name, strategy);
    }

    pub fn get_strategy(&self, name: &str) -> Option<Arc<dyn CompactionStrategy>> {
        self.registry.get(name)
    }

    pub fn list_strategies(&self) -> Vec<StrategyInfo> {
        self.registry.list()
    }

    /// Snapshot of the running metrics.
    pub fn metrics(&self) -> CompactionMetrics {
        self.metrics.lock().clone()
    }

    pub fn reset_metrics(&self) {
        *self.metrics.lock() = CompactionMetrics::default();
    }

    /// Compact a single graph.
    pub fn compact(&self, ctx: &CompactContext, request: &CompactRequest) -> Result<CompactResult> {
        let started = Instant::now();
        let graph = require_graph(request)?;
        ctx.check()?;

        if !self.config.enabled {
            return Ok(disabled_result(graph, started));
        }

        let mut normalized = request.clone();
        if normalized.max_size <= 0 {
            normalized.max_size = self.config.max_context_size as i64;
        }
        let requirements = normalized.requirements_or_default();
        normalized.requirements = Some(requirements.clone());

        let resolved = self.resolve(&normalized.strategy, graph)?;
        debug!(
            strategy = %resolved.name,
            size = graph.size(),
            max_size = normalized.max_size,
            "running compaction"
        );

        let mut result = resolved
            .strategy
            .compact(ctx, &normalized)
            .map_err(|e| e.in_strategy(resolved.name.as_str()))?;
        result.strategy_used = resolved.name.clone();

        result.compacted_graph.refresh_metadata();
        result.measure(graph);
        if let Some(characteristics) = resolved.adaptive {
            result.metadata.insert("adaptive_override".into(), json!(true));
            result
                .metadata
                .insert("adaptive_characteristics".into(), characteristics);
        }

        result
            .warnings
            .extend(verify_requirements(graph, &result.compacted_graph, &requirements));
        if result.original_size > 0
            && !result.no_action()
            && result.compression_ratio > self.config.compression_ratio_target
        {
            result.warnings.push(format!(
                "compression ratio {:.2} above target {:.2}",
                result.compression_ratio, self.config.compression_ratio_target
            ));
        }

        if self.config.impact_analysis && result.removed.total() > 0 {
            let impact = analyze_impact(graph, &result.compacted_graph, &result.removed);
            if impact.risk_level >= RiskLevel::High {
                warn!(
                    risk = %impact.risk_level,
                    broken = impact.broken_references,
                    "compaction removed heavily referenced items"
                );
            }
            result.removed.impact = Some(impact);
        }

        result.execution_time = started.elapsed();
        if self.config.enable_metrics {
            self.metrics.lock().record(&result);
        }

        info!(
            strategy = %result.strategy_used,
            original = result.original_size,
            compacted = result.compacted_size,
            ratio = result.compression_ratio,
            elapsed_ms = result.execution_time.as_millis() as u64,
            "compaction finished"
        );
        Ok(result)
    }

    /// Compact several requests, returning results in request order.
    ///
    /// The first failing request (lowest index) fails the whole batch. When
    /// running in parallel every request still runs to completion before the
    /// failure is reported.
    pub fn compact_multiple(
        &self,
        ctx: &CompactContext,
        requests: &[CompactRequest],
    ) -> Result<Vec<CompactResult>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        if !self.config.parallel_processing || requests.len() == 1 {
            let mut results = Vec::with_capacity(requests.len());
            for (index, request) in requests.iter().enumerate() {
                results.push(self.compact(ctx, request).map_err(|e| e.in_batch(index))?);
            }
            return Ok(results);
        }

        let workers = self.config.batch_size.min(requests.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .ok();
        debug!(requests = requests.len(), workers, "running batch in parallel");

        let run = |request: &CompactRequest| self.compact(ctx, request);
        let outcomes: Vec<Result<CompactResult>> = match pool {
            Some(pool) => pool.install(|| requests.par_iter().map(run).collect()),
            None => requests.par_iter().map(run).collect(),
        };

        outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| outcome.map_err(|e| e.in_batch(index)))
            .collect()
    }

    /// Ask every analyzable strategy what it could remove from `graph`.
    pub fn analyze_compaction_potential(&self, graph: &CodeGraph) -> CompactionAnalysis {
        let total_size = graph.size();
        let strategies: BTreeMap<String, StrategyAnalysis> = self
            .registry
            .entries()
            .into_iter()
            .filter_map(|(name, strategy)| {
                let analysis = strategy.as_analyzer()?.analyze_potential(graph);
                Some((name, analysis))
            })
            .collect();

        // BTreeMap order plus strict `<` keeps the first name on ties.
        let mut best: Option<(&String, f64)> = None;
        for (name, analysis) in &strategies {
            let ratio = analysis.estimated_compression_ratio;
            if best.map_or(true, |(_, r)| ratio < r) {
                best = Some((name, ratio));
            }
        }

        let recommended_strategy = best.map(|(name, _)| name.clone());
        let estimated_savings = best.map_or(0.0, |(_, ratio)| total_size as f64 * (1.0 - ratio));
        CompactionAnalysis {
            total_size,
            recommended_strategy,
            estimated_savings,
            strategies,
        }
    }

    fn resolve(&self, requested: &str, graph: &CodeGraph) -> Result<Resolved> {
        let requested = requested.trim();
        let lookup = |name: &str| {
            self.registry
                .get(name)
                .ok_or_else(|| CompactError::UnknownStrategy {
                    name: name.to_string(),
                })
        };

        if (requested.is_empty() || requested == ADAPTIVE) && self.config.adaptive_enabled {
            let characteristics =
                analyze_graph(graph, &AdaptiveThresholds::from_config(&self.config));
            let selected = select_strategy(&characteristics);
            debug!(selected, "adaptive selection overrides request");
            return Ok(Resolved {
                name: selected.to_string(),
                strategy: lookup(selected)?,
                adaptive: Some(json!(characteristics)),
            });
        }

        let name = if requested.is_empty() {
            self.config.default_strategy.as_str()
        } else {
            requested
        };
        Ok(Resolved {
            name: name.to_string(),
            strategy: lookup(name)?,
            adaptive: None,
        })
    }
}

fn disabled_result(graph: &CodeGraph, started: Instant) -> CompactResult {
    let mut result = CompactResult::new(graph, graph.clone(), DISABLED_STRATEGY);
    result.compression_ratio = 1.0;
    result
        .metadata
        .insert("compaction_disabled".into(), json!(true));
    result.warnings.push("compaction disabled".to_string());
    result.execution_time = started.elapsed();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphNode, SourceFile};

    fn graph() -> Arc<CodeGraph> {
        let mut graph = CodeGraph::new();
        for path in ["a.py", "b.py", "c.py"] {
            graph.add_file(SourceFile::new(path, "python"));
            graph.add_node(GraphNode::new(path, "file"));
        }
        Arc::new(graph)
    }

    fn controller() -> CompactController {
        CompactController::new(CompactConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CompactConfig {
            max_context_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            CompactController::new(config),
            Err(CompactError::Config { .. })
        ));
    }

    #[test]
    fn test_missing_graph_is_invalid_request() {
        let err = controller()
            .compact(&CompactContext::new(), &CompactRequest::default())
            .unwrap_err();
        assert!(matches!(err, CompactError::InvalidRequest { .. }));
    }

    #[test]
    fn test_unknown_strategy() {
        let request = CompactRequest::new(graph()).with_strategy("quantum");
        let err = controller()
            .compact(&CompactContext::new(), &request)
            .unwrap_err();
        assert!(matches!(err, CompactError::UnknownStrategy { ref name } if name == "quantum"));
    }

    #[test]
    fn test_empty_name_uses_adaptive_override() {
        let result = controller()
            .compact(&CompactContext::new(), &CompactRequest::new(graph()))
            .unwrap();
        assert_eq!(result.metadata["adaptive_override"], json!(true));
        assert!(result.metadata.contains_key("adaptive_characteristics"));
        assert_eq!(result.strategy_used, "relevance");
    }

    #[test]
    fn test_empty_name_without_adaptive_uses_default() {
        let controller = CompactController::new(CompactConfig {
            adaptive_enabled: false,
            default_strategy: "dependency".into(),
            ..Default::default()
        })
        .unwrap();
        let result = controller
            .compact(&CompactContext::new(), &CompactRequest::new(graph()))
            .unwrap();
        assert_eq!(result.strategy_used, "dependency");
        assert!(!result.metadata.contains_key("adaptive_override"));
    }

    #[test]
    fn test_impact_attached_on_removal() {
        let request = CompactRequest::new(graph()).with_strategy("dependency");
        let result = controller()
            .compact(&CompactContext::new(), &request)
            .unwrap();
        assert_eq!(result.removed.files.len(), 3);
        assert!(result.removed.impact.is_some());
    }

    #[test]
    fn test_cancelled_context() {
        let ctx = CompactContext::new();
        ctx.cancel();
        let err = controller()
            .compact(&ctx, &CompactRequest::new(graph()))
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_analysis_recommends_lowest_ratio() {
        let analysis = controller().analyze_compaction_potential(&graph());
        assert_eq!(analysis.total_size, 6);
        assert_eq!(analysis.strategies.len(), 4);
        let best = analysis.recommended_strategy.clone().unwrap();
        let best_ratio = analysis.strategies[&best].estimated_compression_ratio;
        for entry in analysis.strategies.values() {
            assert!(best_ratio <= entry.estimated_compression_ratio);
        }
        assert!((analysis.estimated_savings - 6.0 * (1.0 - best_ratio)).abs() < 1e-9);
    }
}
