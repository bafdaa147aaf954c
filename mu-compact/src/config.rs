//! Compaction configuration.
//!
//! Deserialized from the `[compact]` section of `.murc.toml` by the CLI.
//! Every field has a default, so an empty section (or none at all) yields a
//! working configuration.
//!
//! ```toml
//! [compact]
//! enabled = true
//! default_strategy = "hybrid"
//! max_context_size = 10000
//! adaptive_enabled = true
//!
//! [compact.strategies]
//! relevance_threshold = 0.3
//! removal_percentage = 0.3
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CompactError, Result};

/// Controller configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactConfig {
    /// Master switch. When `false`, requests return the input unchanged.
    pub enabled: bool,
    /// Strategy used when a request names none and adaptive selection is off.
    pub default_strategy: String,
    /// Maximum graph size used when a request gives a non-positive one.
    pub max_context_size: usize,
    /// Results compressing worse than this ratio carry a warning.
    pub compression_ratio_target: f64,
    /// Whether running metrics are updated.
    pub enable_metrics: bool,
    /// Whether removal reports carry an impact analysis.
    pub impact_analysis: bool,
    /// Whether empty/"adaptive" requests are routed through adaptive selection.
    pub adaptive_enabled: bool,
    /// Connectivity ratio above which a graph counts as highly connected.
    pub adaptive_threshold: f64,
    /// Average file size (bytes) above which a graph counts as having large files.
    pub large_file_threshold: f64,
    /// Unused-symbol ratio above which frequency pruning is chosen.
    pub unused_symbol_threshold: f64,
    /// Worker count for parallel batches.
    pub batch_size: usize,
    /// Run batches on a worker pool instead of sequentially.
    pub parallel_processing: bool,
    /// Per-strategy parameter overrides.
    pub strategies: StrategyOverrides,
}

impl Default for CompactConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_strategy: "hybrid".to_string(),
            max_context_size: 10_000,
            compression_ratio_target: 0.5,
            enable_metrics: true,
            impact_analysis: true,
            adaptive_enabled: true,
            adaptive_threshold: 0.1,
            large_file_threshold: 10_000.0,
            unused_symbol_threshold: 0.2,
            batch_size: 4,
            parallel_processing: true,
            strategies: StrategyOverrides::default(),
        }
    }
}

/// Tunable parameters of the built-in strategies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyOverrides {
    /// Relevance score below which items are removed.
    pub relevance_threshold: f64,
    /// Share of a source's score passed along each edge.
    pub propagation_factor: f64,
    /// Share of least-referenced files and symbols removed by frequency pruning.
    pub removal_percentage: f64,
}

impl Default for StrategyOverrides {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.3,
            propagation_factor: 0.5,
            removal_percentage: 0.3,
        }
    }
}

impl CompactConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.default_strategy.trim().is_empty() {
            return Err(config_error("default_strategy must not be empty"));
        }
        if self.max_context_size == 0 {
            return Err(config_error("max_context_size must be positive"));
        }
        if self.batch_size == 0 {
            return Err(config_error("batch_size must be positive"));
        }
        check_unit("compression_ratio_target", self.compression_ratio_target)?;
        check_unit("adaptive_threshold", self.adaptive_threshold)?;
        check_unit("unused_symbol_threshold", self.unused_symbol_threshold)?;
        check_unit("relevance_threshold", self.strategies.relevance_threshold)?;
        check_unit("propagation_factor", self.strategies.propagation_factor)?;
        check_unit("removal_percentage", self.strategies.removal_percentage)?;
        if self.large_file_threshold < 0.0 {
            return Err(config_error("large_file_threshold must not be negative"));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(config_error(format!(
            "{} must be between 0.0 and 1.0, got {}",
            name, value
        )))
    }
}

fn config_error(message: impl Into<String>) -> CompactError {
    CompactError::Config {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CompactConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.enabled);
        assert_eq!(config.default_strategy, "hybrid");
        assert_eq!(config.strategies.relevance_threshold, 0.3);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: CompactConfig = toml::from_str(
            r#"
default_strategy = "size"
max_context_size = 500
parallel_processing = false

[strategies]
removal_percentage = 0.5
"#,
        )
        .unwrap();
        assert_eq!(config.default_strategy, "size");
        assert_eq!(config.max_context_size, 500);
        assert!(!config.parallel_processing);
        assert_eq!(config.strategies.removal_percentage, 0.5);
        // Untouched fields keep defaults
        assert_eq!(config.strategies.relevance_threshold, 0.3);
        assert!(config.adaptive_enabled);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = CompactConfig::default();
        config.strategies.removal_percentage = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("removal_percentage"));

        let config = CompactConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
