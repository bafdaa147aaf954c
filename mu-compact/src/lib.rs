//! MU Compact - Graph compaction engine.
//!
//! This crate shrinks a code graph (files, symbols, nodes, edges) so it fits
//! an LLM context budget while keeping what the caller marks as important.
//!
//! # Features
//!
//! - **Pluggable strategies**: relevance, frequency, dependency, size, hybrid
//!   and adaptive, plus any caller-registered [`CompactionStrategy`]
//! - **Preservation**: exact files, path fragments and symbol ids survive
//! - **Batching**: many requests on a bounded rayon pool, results in order
//! - **Metrics**: moving averages of ratio and latency, per-strategy usage
//! - **Cancellation**: cooperative via [`CompactContext`]
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mu_compact::{CodeGraph, CompactConfig, CompactContext, CompactController, CompactRequest};
//!
//! let controller = CompactController::new(CompactConfig::default())?;
//! let graph = Arc::new(CodeGraph::new());
//! let request = CompactRequest::new(graph).with_strategy("size").with_max_size(500);
//! let result = controller.compact(&CompactContext::new(), &request)?;
//! println!("{} -> {}", result.original_size, result.compacted_size);
//! # Ok::<(), mu_compact::CompactError>(())
//! ```

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod graph;
pub mod impact;
pub mod metrics;
pub mod registry;
pub mod requirements;
pub mod strategy;
pub mod types;

pub use config::{CompactConfig, StrategyOverrides};
pub use context::CompactContext;
pub use controller::CompactController;
pub use error::{CompactError, Result};
pub use graph::{CodeGraph, GraphEdge, GraphMetadata, GraphNode, SourceFile, Symbol, SymbolKind};
pub use metrics::CompactionMetrics;
pub use registry::{StrategyInfo, StrategyRegistry};
pub use strategy::{CompactionStrategy, PotentialAnalyzer};
pub use types::{
    CompactRequest, CompactRequirements, CompactResult, CompactionAnalysis, ImpactAnalysis,
    RemovedItems, RiskLevel, StrategyAnalysis,
};
