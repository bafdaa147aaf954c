//! Named strategy registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::config::CompactConfig;
use crate::strategy::{
    AdaptiveStrategy, CompactionStrategy, DependencyStrategy, FrequencyStrategy, HybridStrategy,
    RelevanceStrategy, SizeStrategy,
};

/// Listing entry for a registered strategy.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
    /// Whether the strategy can estimate its effect without running.
    pub analyzable: bool,
}

/// Thread-safe map of strategy name to implementation.
///
/// Registration may happen at any time, including while other threads are
/// compacting; lookups hand out `Arc` clones so a strategy replaced mid-run
/// stays alive for the callers already using it.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: RwLock<BTreeMap<String, Arc<dyn CompactionStrategy>>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the six built-in strategies, tuned by `config`.
    pub fn with_builtins(config: &CompactConfig) -> Self {
        let registry = Self::new();
        let overrides = &config.strategies;
        registry.register(Arc::new(RelevanceStrategy::from_overrides(overrides)));
        registry.register(Arc::new(FrequencyStrategy::from_overrides(overrides)));
        registry.register(Arc::new(DependencyStrategy::new()));
        registry.register(Arc::new(SizeStrategy::new(config.max_context_size)));
        registry.register(Arc::new(HybridStrategy::from_overrides(overrides)));
        registry.register(Arc::new(AdaptiveStrategy::from_config(config)));
        registry
    }

    /// Register under the strategy's own name.
    pub fn register(&self, strategy: Arc<dyn CompactionStrategy>) {
        let name = strategy.name().to_string();
        self.register_as(name, strategy);
    }

    /// Register under an explicit name, replacing any previous entry.
    pub fn register_as(&self, name: impl Into<String>, strategy: Arc<dyn CompactionStrategy>) {
        let name = name.into();
        let replaced = self.strategies.write().insert(name.clone(), strategy).is_some();
        debug!(name = %name, replaced, "strategy registered");
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CompactionStrategy>> {
        self.strategies.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.strategies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.read().is_empty()
    }

    /// Name-sorted listing.
    pub fn list(&self) -> Vec<StrategyInfo> {
        self.strategies
            .read()
            .iter()
            .map(|(name, strategy)| StrategyInfo {
                name: name.clone(),
                description: strategy.description().to_string(),
                analyzable: strategy.as_analyzer().is_some(),
            })
            .collect()
    }

    /// Snapshot of all entries, name-sorted, taken under one read lock.
    pub fn entries(&self) -> Vec<(String, Arc<dyn CompactionStrategy>)> {
        self.strategies
            .read()
            .iter()
            .map(|(name, strategy)| (name.clone(), Arc::clone(strategy)))
            .collect()
    }
}
