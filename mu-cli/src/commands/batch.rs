//! Batch command - Compact several graphs in one run
//!
//! Requests run on a bounded worker pool unless `--sequential` is given.
//! Results are reported in the order the graphs were named.

use super::{build_controller, load_graph, run_cancellable};
use crate::config::MuConfig;
use crate::output::{emit, percent, OutputConfig, OutputFormat, ReportTable, TableDisplay};
use anyhow::Result;
use colored::Colorize;
use mu_compact::{CompactContext, CompactRequest, CompactResult, CompactionMetrics};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub graphs: Vec<PathBuf>,
    pub strategy: Option<String>,
    pub max_size: Option<i64>,
    pub sequential: bool,
}

/// One line of the batch report.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRow {
    pub graph: String,
    pub strategy: String,
    pub original_size: usize,
    pub compacted_size: usize,
    pub compression_ratio: f64,
    pub removed: usize,
    pub warnings: Vec<String>,
}

impl BatchRow {
    fn new(graph: &Path, result: &CompactResult) -> Self {
        Self {
            graph: graph.display().to_string(),
            strategy: result.strategy_used.clone(),
            original_size: result.original_size,
            compacted_size: result.compacted_size,
            compression_ratio: result.compression_ratio,
            removed: result.removed.total(),
            warnings: result.warnings.clone(),
        }
    }
}

/// Results of a batch plus the controller metrics it produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub parallel: bool,
    pub results: Vec<BatchRow>,
    pub metrics: CompactionMetrics,
}

impl TableDisplay for BatchReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut table = ReportTable::new(&["Graph", "Strategy", "Original", "Compacted", "Removed"])
            .numeric(&[2, 3, 4]);
        for row in &self.results {
            table.push_row(vec![
                row.graph.clone(),
                row.strategy.clone(),
                row.original_size.to_string(),
                row.compacted_size.to_string(),
                row.removed.to_string(),
            ]);
        }

        let mut lines = vec![table.render(config)];

        lines.push(format!(
            "{}: {} ({})",
            "Compactions".cyan(),
            self.metrics.total_compactions,
            if self.parallel { "parallel" } else { "sequential" }
        ));
        lines.push(format!(
            "{}: {}",
            "Average ratio".cyan(),
            percent(self.metrics.average_compression_ratio)
        ));
        lines.push(format!(
            "{}: {}",
            "Size saved".cyan(),
            self.metrics.total_size_saved
        ));

        for row in &self.results {
            for warning in &row.warnings {
                lines.push(format!("{} {}: {}", "warning:".yellow(), row.graph, warning));
            }
        }

        lines.join("\n")
    }
}

/// Run the batch command.
pub async fn run(options: BatchOptions, config: &MuConfig, format: OutputFormat) -> Result<()> {
    if options.graphs.is_empty() {
        anyhow::bail!("No graph files given");
    }

    let compact_config = config.compact_config(options.sequential);
    let parallel = compact_config.parallel_processing;
    let controller = build_controller(compact_config)?;

    let mut requests = Vec::with_capacity(options.graphs.len());
    for path in &options.graphs {
        let mut request = CompactRequest::new(Arc::new(load_graph(path)?));
        if let Some(strategy) = &options.strategy {
            request = request.with_strategy(strategy.as_str());
        }
        if let Some(max_size) = options.max_size {
            request = request.with_max_size(max_size);
        }
        requests.push(request);
    }

    let worker = Arc::clone(&controller);
    let results = run_cancellable(CompactContext::new(), move |ctx| {
        worker.compact_multiple(ctx, &requests)
    })
    .await?;

    let report = BatchReport {
        parallel,
        results: options
            .graphs
            .iter()
            .zip(&results)
            .map(|(path, result)| BatchRow::new(path, result))
            .collect(),
        metrics: controller.metrics(),
    };
    emit(&report, format)
}
