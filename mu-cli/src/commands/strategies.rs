//! Strategies command - List registered compaction strategies

use super::build_controller;
use crate::config::MuConfig;
use crate::output::{emit, OutputConfig, OutputFormat, ReportTable, TableDisplay};
use anyhow::Result;
use colored::Colorize;
use mu_compact::StrategyInfo;
use serde::Serialize;

/// Registered strategies and the configured default.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyList {
    pub default_strategy: String,
    pub adaptive_enabled: bool,
    pub strategies: Vec<StrategyInfo>,
}

impl TableDisplay for StrategyList {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut table = ReportTable::new(&["Name", "Analyzable", "Description"]);
        for info in &self.strategies {
            table.push_row(vec![
                info.name.clone(),
                if info.analyzable { "yes" } else { "no" }.to_string(),
                info.description.clone(),
            ]);
        }

        let mut lines = vec![table.render(config)];
        lines.push(format!(
            "{}: {}{}",
            "Default".cyan(),
            self.default_strategy,
            if self.adaptive_enabled {
                " (adaptive selection on)"
            } else {
                ""
            }
        ));
        lines.join("\n")
    }
}

/// Run the strategies command.
pub async fn run(config: &MuConfig, format: OutputFormat) -> Result<()> {
    let compact_config = config.compact_config(false);
    let list = StrategyList {
        default_strategy: compact_config.default_strategy.clone(),
        adaptive_enabled: compact_config.adaptive_enabled,
        strategies: build_controller(compact_config)?.list_strategies(),
    };
    emit(&list, format)
}
