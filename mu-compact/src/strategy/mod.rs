//! Pluggable graph-reduction strategies.
//!
//! Every strategy works on its own deep copy of the request graph and reports
//! what it removed. Built-ins:
//!
//! | Name         | Policy                                                      |
//! |--------------|-------------------------------------------------------------|
//! | `relevance`  | one-pass score propagation, drop items below a threshold    |
//! | `frequency`  | drop the least-referenced share of files and symbols        |
//! | `dependency` | drop isolated files and weakly referenced symbols           |
//! | `size`       | drop the most expensive files until the graph fits          |
//! | `hybrid`     | relevance -> frequency -> dependency                        |
//! | `adaptive`   | pick one of the above from graph characteristics            |

use crate::context::CompactContext;
use crate::error::Result;
use crate::graph::CodeGraph;
use crate::types::{CompactRequest, CompactResult, StrategyAnalysis};

pub mod adaptive;
pub mod base;
pub mod dependency;
pub mod frequency;
pub mod hybrid;
pub mod relevance;
pub mod size;

pub use adaptive::{analyze_graph, select_strategy, AdaptiveStrategy, AdaptiveThresholds, GraphCharacteristics};
pub use dependency::{dependency_depth, DependencyStrategy};
pub use frequency::FrequencyStrategy;
pub use hybrid::HybridStrategy;
pub use relevance::{RelevanceScores, RelevanceStrategy};
pub use size::SizeStrategy;

pub const RELEVANCE: &str = "relevance";
pub const FREQUENCY: &str = "frequency";
pub const DEPENDENCY: &str = "dependency";
pub const SIZE: &str = "size";
pub const HYBRID: &str = "hybrid";
pub const ADAPTIVE: &str = "adaptive";

/// A graph-reduction algorithm.
///
/// Implementations must never mutate the request graph; they copy it with
/// [`base::deep_copy`] and remove elements from the copy.
pub trait CompactionStrategy: Send + Sync {
    /// Registry name, e.g. `"relevance"`.
    fn name(&self) -> &str;

    /// One-line human description.
    fn description(&self) -> &str;

    /// Produce a compacted copy of `request.graph`.
    fn compact(&self, ctx: &CompactContext, request: &CompactRequest) -> Result<CompactResult>;

    /// Optional potential-analysis capability.
    fn as_analyzer(&self) -> Option<&dyn PotentialAnalyzer> {
        None
    }
}

/// Estimates how much a strategy could remove without running it.
pub trait PotentialAnalyzer {
    fn analyze_potential(&self, graph: &CodeGraph) -> StrategyAnalysis;
}
