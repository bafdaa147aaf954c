//! Compact command - Shrink a code graph to fit a size budget
//!
//! Loads a serialized graph, runs one compaction strategy over it and
//! reports what was removed. The compacted graph is written with `--output`.

use super::{build_controller, load_graph, run_cancellable, write_graph};
use crate::config::MuConfig;
use crate::output::{emit, percent, OutputConfig, OutputFormat, TableDisplay};
use anyhow::Result;
use colored::Colorize;
use mu_compact::{
    CompactContext, CompactRequest, CompactRequirements, CompactResult, ImpactAnalysis,
    RemovedItems, RiskLevel,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Options collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct CompactOptions {
    pub graph: PathBuf,
    pub strategy: Option<String>,
    pub max_size: Option<i64>,
    pub preserve_files: Vec<String>,
    pub preserve_paths: Vec<String>,
    pub preserve_symbols: Vec<String>,
    pub output: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl CompactOptions {
    fn requirements(&self) -> Option<CompactRequirements> {
        let requirements = self
            .preserve_files
            .iter()
            .fold(CompactRequirements::new(), |r, p| r.preserve_file(p.as_str()));
        let requirements = self
            .preserve_paths
            .iter()
            .fold(requirements, |r, p| r.preserve_path(p.as_str()));
        let requirements = self
            .preserve_symbols
            .iter()
            .fold(requirements, |r, s| r.preserve_symbol(s.as_str()));

        (!requirements.is_empty()).then_some(requirements)
    }
}

/// Summary of a single compaction.
#[derive(Debug, Clone, Serialize)]
pub struct CompactReport {
    pub graph: String,
    pub strategy: String,
    pub original_size: usize,
    pub compacted_size: usize,
    pub compression_ratio: f64,
    pub execution_time_ms: u64,
    pub removed: RemovedItems,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub warnings: Vec<String>,
    /// Where the compacted graph was written, if anywhere.
    pub output: Option<String>,
}

impl CompactReport {
    fn new(graph: String, result: CompactResult, output: Option<String>) -> Self {
        Self {
            graph,
            strategy: result.strategy_used,
            original_size: result.original_size,
            compacted_size: result.compacted_size,
            compression_ratio: result.compression_ratio,
            execution_time_ms: result.execution_time.as_millis() as u64,
            removed: result.removed,
            metadata: result.metadata,
            warnings: result.warnings,
            output,
        }
    }
}

fn risk_label(risk: RiskLevel) -> colored::ColoredString {
    let label = risk.to_string();
    match risk {
        RiskLevel::Low => label.green(),
        RiskLevel::Medium => label.yellow(),
        RiskLevel::High | RiskLevel::Critical => label.red().bold(),
    }
}

fn impact_lines(impact: &ImpactAnalysis, lines: &mut Vec<String>) {
    lines.push(format!("  {}: {}", "Risk".cyan(), risk_label(impact.risk_level)));
    lines.push(format!(
        "  {}: {}",
        "Broken refs".cyan(),
        impact.broken_references
    ));
    if !impact.dependent_files.is_empty() {
        lines.push(format!(
            "  {}: {}",
            "Dependents".cyan(),
            impact.dependent_files.join(", ")
        ));
    }
    for recommendation in &impact.recommendations {
        lines.push(format!("    - {}", recommendation));
    }
}

impl TableDisplay for CompactReport {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "{} {}",
            "Compacted".green().bold(),
            self.graph.bold()
        ));
        lines.push(format!("  {}: {}", "Strategy".cyan(), self.strategy));
        lines.push(format!(
            "  {}: {} -> {} ({})",
            "Size".cyan(),
            self.original_size,
            self.compacted_size,
            percent(self.compression_ratio)
        ));
        lines.push(format!(
            "  {}: {} files, {} symbols, {} nodes, {} edges",
            "Removed".cyan(),
            self.removed.files.len(),
            self.removed.symbols.len(),
            self.removed.nodes.len(),
            self.removed.edges.len()
        ));
        if !self.removed.reason.is_empty() {
            lines.push(format!("  {}: {}", "Reason".cyan(), self.removed.reason));
        }

        if let Some(impact) = &self.removed.impact {
            impact_lines(impact, &mut lines);
        }

        if let Some(path) = &self.output {
            lines.push(format!("  {}: {}", "Written to".cyan(), path));
        }

        if !self.warnings.is_empty() {
            lines.push(String::new());
            for warning in &self.warnings {
                lines.push(format!("{} {}", "warning:".yellow(), warning));
            }
        }

        lines.push(format!(
            "\n{}",
            format!("({} ms)", self.execution_time_ms).dimmed()
        ));

        lines.join("\n")
    }
}

/// Run the compact command.
pub async fn run(options: CompactOptions, config: &MuConfig, format: OutputFormat) -> Result<()> {
    let graph = Arc::new(load_graph(&options.graph)?);
    let controller = build_controller(config.compact_config(false))?;

    let mut request = CompactRequest::new(graph);
    if let Some(strategy) = &options.strategy {
        request = request.with_strategy(strategy.as_str());
    }
    if let Some(max_size) = options.max_size {
        request = request.with_max_size(max_size);
    }
    if let Some(requirements) = options.requirements() {
        request = request.with_requirements(requirements);
    }

    let mut ctx = CompactContext::new();
    if let Some(secs) = options.timeout_secs {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    let result = run_cancellable(ctx, move |ctx| controller.compact(ctx, &request)).await?;

    let output = match &options.output {
        Some(path) => {
            write_graph(path, &result.compacted_graph)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let report = CompactReport::new(options.graph.display().to_string(), result, output);
    emit(&report, format)
}
