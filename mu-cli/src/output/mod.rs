//! Output formatting module for MU CLI
//!
//! Provides unified output formatting across all commands with support for
//! two formats: table (human-readable) and json (machine-readable).
//!
//! Automatically detects TTY context to adjust truncation behavior.

use clap::ValueEnum;
use serde::Serialize;
use std::io::IsTerminal;
use std::str::FromStr;

mod json;
mod table;

pub use self::json::JsonOutput;
pub use self::table::ReportTable;

/// Output format for CLI results
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format (default)
    #[default]
    Table,
    /// JSON format for machine consumption
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: '{}'", s)),
        }
    }
}

/// Configuration for output rendering
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// The output format to use
    pub format: OutputFormat,
    /// Disable truncation of long values
    pub no_truncate: bool,
    /// Override terminal width (None = auto-detect)
    pub width: Option<usize>,
    /// Compact mode (less whitespace)
    pub compact: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with the specified format
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            no_truncate: false,
            width: None,
            compact: false,
        }
    }

    /// Create an OutputConfig with automatic TTY detection
    ///
    /// When output is not a TTY (piped or redirected) truncation is disabled.
    pub fn auto_detect(format: OutputFormat) -> Self {
        let is_tty = std::io::stdout().is_terminal();
        Self {
            format,
            no_truncate: !is_tty,
            width: None,
            compact: false,
        }
    }

    /// Get the effective terminal width
    pub fn effective_width(&self) -> usize {
        self.width.unwrap_or_else(|| {
            terminal_size::terminal_size()
                .map(|(w, _)| w.0 as usize)
                .unwrap_or(80)
        })
    }

    /// Check if truncation should be applied
    pub fn should_truncate(&self) -> bool {
        !self.no_truncate
    }

    /// Builder: disable truncation
    #[cfg(test)]
    pub fn without_truncation(mut self) -> Self {
        self.no_truncate = true;
        self
    }

    /// Builder: fix the terminal width
    #[cfg(test)]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Builder: enable compact mode
    #[cfg(test)]
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }
}

/// Reports that render either as a human-readable table or as JSON.
pub trait TableDisplay: Serialize {
    /// Render the table form of the report
    fn to_table(&self, config: &OutputConfig) -> String;
}

/// Print a report to stdout in the configured format
pub fn emit<T: TableDisplay>(report: &T, format: OutputFormat) -> anyhow::Result<()> {
    let config = OutputConfig::auto_detect(format);
    let rendered = match config.format {
        OutputFormat::Table => report.to_table(&config),
        OutputFormat::Json => JsonOutput::format(report, &config),
    };
    println!("{}", rendered);
    Ok(())
}

// ============================================================================
// Utility functions
// ============================================================================

/// Truncate a string to a maximum width with ellipsis
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let truncated: String = s.chars().take(max_width - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a ratio as a percentage with one decimal.
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}
