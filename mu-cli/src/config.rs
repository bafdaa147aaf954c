//! MU configuration loading from `.murc.toml`.
//!
//! Configuration is optional: a missing file, or one that fails to parse,
//! yields defaults. Only `[output]` and `[compact]` are read; other sections
//! (such as `[mu]`) are ignored.
//!
//! # Example Configuration
//!
//! ```toml
//! [output]
//! format = "table"
//! color = true
//!
//! [compact]
//! default_strategy = "hybrid"
//! max_context_size = 10000
//! parallel_processing = true
//! batch_size = 4
//!
//! [compact.strategies]
//! relevance_threshold = 0.3
//! removal_percentage = 0.3
//! ```

use mu_compact::CompactConfig;
use serde::Deserialize;
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".murc.toml";

/// Root configuration structure loaded from `.murc.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct MuConfig {
    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,

    /// Graph compaction settings.
    #[serde(default)]
    pub compact: CompactConfig,
}

/// Output formatting preferences.
///
/// Command-line flags (e.g., `--format json`) override these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Default output format for CLI commands.
    ///
    /// Valid values: `table`, `json`
    /// Default: `table`
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output.
    ///
    /// Defaults to `true` when stdout is a TTY.
    #[serde(default)]
    pub color: Option<bool>,
}

impl MuConfig {
    /// Load configuration from `.murc.toml` in the given directory.
    ///
    /// Parse errors are logged as warnings and defaults are used instead.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }
        Self::default()
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Check if colored output should be used.
    ///
    /// Returns the configured value, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    /// Compaction settings with CLI overrides applied.
    pub fn compact_config(&self, sequential: bool) -> CompactConfig {
        let mut config = self.compact.clone();
        if sequential {
            config.parallel_processing = false;
        }
        config
    }
}
