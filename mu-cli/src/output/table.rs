//! Report tables rendered with `tabled`.
//!
//! Cells arrive preformatted; numeric columns are right-aligned and long
//! cells are cut to a fair share of the terminal width.

use super::{truncate, OutputConfig};
use tabled::{
    builder::Builder,
    settings::{object::Columns, style::Style, Alignment, Modify, Width},
};

/// Header plus preformatted rows for one report section.
#[derive(Debug, Clone)]
pub struct ReportTable {
    headers: Vec<&'static str>,
    numeric: Vec<usize>,
    rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            numeric: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Mark columns (by index) whose values are numbers.
    pub fn numeric(mut self, columns: &[usize]) -> Self {
        self.numeric = columns.to_vec();
        self
    }

    pub fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn render(&self, config: &OutputConfig) -> String {
        if self.rows.is_empty() {
            return "(no results)".to_string();
        }

        let term_width = config.effective_width();
        let cell_width = term_width.saturating_sub(self.headers.len() * 3) / self.headers.len().max(1);

        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().copied());
        for row in &self.rows {
            builder.push_record(row.iter().map(|cell| {
                if config.should_truncate() && cell_width > 0 {
                    truncate(cell, cell_width)
                } else {
                    cell.clone()
                }
            }));
        }

        let mut table = builder.build();
        if config.compact {
            table.with(Style::blank());
        } else {
            table.with(Style::rounded());
        }
        for &column in &self.numeric {
            table.with(Modify::new(Columns::single(column)).with(Alignment::right()));
        }
        if config.should_truncate() {
            table.with(Width::wrap(term_width));
        }

        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::super::OutputFormat;
    use super::*;

    fn strategies() -> ReportTable {
        let mut table = ReportTable::new(&["Strategy", "Removed"]).numeric(&[1]);
        table.push_row(vec!["relevance".to_string(), "12".to_string()]);
        table.push_row(vec!["dependency".to_string(), "3".to_string()]);
        table
    }

    #[test]
    fn test_render_rows() {
        let config = OutputConfig::new(OutputFormat::Table).without_truncation();
        let output = strategies().render(&config);

        assert!(output.contains("Strategy"));
        assert!(output.contains("relevance"));
        assert!(output.contains("12"));
    }

    #[test]
    fn test_empty_table() {
        let config = OutputConfig::new(OutputFormat::Table);
        let output = ReportTable::new(&["Graph"]).render(&config);
        assert_eq!(output, "(no results)");
    }

    #[test]
    fn test_long_cells_truncated_to_share() {
        let mut table = ReportTable::new(&["Graph", "Ratio"]);
        table.push_row(vec!["x".repeat(100), "50.0%".to_string()]);

        let config = OutputConfig::new(OutputFormat::Table).with_width(40);
        let output = table.render(&config);
        assert!(output.contains("..."));
        assert!(!output.contains(&"x".repeat(100)));
    }

    #[test]
    fn test_compact_style_has_no_borders() {
        let config = OutputConfig::new(OutputFormat::Table)
            .without_truncation()
            .compact();
        let output = strategies().render(&config);
        assert!(!output.contains('╭'));
    }
}
