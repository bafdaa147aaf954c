//! Running compaction statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::CompactResult;

/// Smoothing factor of the moving averages.
pub const EMA_ALPHA: f64 = 0.1;

/// Aggregated statistics over every compaction since the last reset.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CompactionMetrics {
    pub total_compactions: u64,
    /// Exponential moving average, seeded with the first sample.
    pub average_execution_time_ms: f64,
    /// Exponential moving average, seeded with the first sample.
    pub average_compression_ratio: f64,
    pub strategy_usage: BTreeMap<String, u64>,
    /// Sum of `original_size - compacted_size`.
    pub total_size_saved: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl CompactionMetrics {
    /// Fold one result into the statistics.
    pub fn record(&mut self, result: &CompactResult) {
        let elapsed_ms = result.execution_time.as_secs_f64() * 1000.0;
        if self.total_compactions == 0 {
            self.average_execution_time_ms = elapsed_ms;
            self.average_compression_ratio = result.compression_ratio;
        } else {
            self.average_execution_time_ms = ema(self.average_execution_time_ms, elapsed_ms);
            self.average_compression_ratio =
                ema(self.average_compression_ratio, result.compression_ratio);
        }

        self.total_compactions += 1;
        *self
            .strategy_usage
            .entry(result.strategy_used.clone())
            .or_insert(0) += 1;
        self.total_size_saved += result.original_size.saturating_sub(result.compacted_size) as u64;
        self.last_updated = Some(Utc::now());
    }

    /// Most used strategy, ties by name.
    pub fn most_used_strategy(&self) -> Option<&str> {
        self.strategy_usage
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, _)| name.as_str())
    }
}

fn ema(previous: f64, sample: f64) -> f64 {
    EMA_ALPHA * sample + (1.0 - EMA_ALPHA) * previous
}
