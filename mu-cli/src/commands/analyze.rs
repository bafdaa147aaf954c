//! Analyze command - Estimate what each strategy could remove
//!
//! Runs every analyzable strategy in dry-run mode and reports the graph
//! characteristics the adaptive strategy would base its choice on.

use super::{build_controller, load_graph};
use crate::config::MuConfig;
use crate::output::{emit, percent, OutputConfig, OutputFormat, ReportTable, TableDisplay};
use anyhow::Result;
use colored::Colorize;
use mu_compact::strategy::{analyze_graph, select_strategy, AdaptiveThresholds, GraphCharacteristics};
use mu_compact::CompactionAnalysis;
use serde::Serialize;
use std::path::Path;

/// Potential analysis for a single graph.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeReport {
    pub graph: String,
    pub analysis: CompactionAnalysis,
    pub characteristics: GraphCharacteristics,
    /// Strategy the adaptive selector would pick for this graph.
    pub adaptive_choice: String,
}

impl TableDisplay for AnalyzeReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "{} {} (size {})",
            "Compaction potential".green().bold(),
            self.graph.bold(),
            self.analysis.total_size
        ));

        let mut table =
            ReportTable::new(&["Strategy", "Est. ratio", "Files", "Symbols", "Confidence"])
                .numeric(&[1, 2, 3, 4]);
        for a in self.analysis.strategies.values() {
            table.push_row(vec![
                a.strategy.clone(),
                percent(a.estimated_compression_ratio),
                a.removable_files.to_string(),
                a.removable_symbols.to_string(),
                format!("{:.2}", a.confidence),
            ]);
        }
        lines.push(table.render(config));

        match &self.analysis.recommended_strategy {
            Some(best) => lines.push(format!(
                "{}: {} (saves ~{:.0})",
                "Recommended".cyan(),
                best.bold(),
                self.analysis.estimated_savings
            )),
            None => lines.push(format!("{}: -", "Recommended".cyan())),
        }

        let c = &self.characteristics;
        lines.push(format!(
            "{}: {} (connectivity {:.2}, avg file {:.0}, unused {})",
            "Adaptive pick".cyan(),
            self.adaptive_choice,
            c.connectivity_ratio,
            c.avg_file_size,
            percent(c.unused_symbol_ratio)
        ));

        for analysis in self.analysis.strategies.values() {
            for warning in &analysis.warnings {
                lines.push(format!(
                    "{} {}: {}",
                    "warning:".yellow(),
                    analysis.strategy,
                    warning
                ));
            }
        }

        lines.join("\n")
    }
}

/// Run the analyze command.
pub async fn run(path: &Path, config: &MuConfig, format: OutputFormat) -> Result<()> {
    let graph = load_graph(path)?;
    let compact_config = config.compact_config(false);
    let thresholds = AdaptiveThresholds::from_config(&compact_config);
    let controller = build_controller(compact_config)?;

    let characteristics = analyze_graph(&graph, &thresholds);
    let report = AnalyzeReport {
        graph: path.display().to_string(),
        analysis: controller.analyze_compaction_potential(&graph),
        adaptive_choice: select_strategy(&characteristics).to_string(),
        characteristics,
    };
    emit(&report, format)
}
