//! Error types for mu-compact.

use thiserror::Error;

/// Result type alias for compaction operations.
pub type Result<T> = std::result::Result<T, CompactError>;

/// Errors that can occur while compacting a graph.
#[derive(Error, Debug)]
pub enum CompactError {
    /// The request cannot be executed (e.g. no graph attached).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what is wrong with the request.
        message: String,
    },

    /// The requested strategy name is not registered.
    #[error("Unknown strategy: {name}")]
    UnknownStrategy {
        /// Name that was looked up.
        name: String,
    },

    /// A strategy failed while running.
    #[error("Strategy '{strategy}' failed: {source}")]
    StrategyExecution {
        /// Name of the strategy that failed.
        strategy: String,
        /// Underlying failure.
        #[source]
        source: Box<CompactError>,
    },

    /// A request inside a batch failed; the whole batch is aborted.
    #[error("Batch request {index} failed: {source}")]
    Batch {
        /// Position of the failing request in the input batch.
        index: usize,
        /// Underlying failure.
        #[source]
        source: Box<CompactError>,
    },

    /// The caller cancelled the operation.
    #[error("Compaction cancelled")]
    Cancelled,

    /// The context deadline passed before the operation finished.
    #[error("Compaction deadline exceeded")]
    DeadlineExceeded,

    /// The preserved set alone does not fit into the requested size.
    #[error("Preserved items (size {preserved}) exceed the requested maximum size ({max_size})")]
    PreservationUnsatisfiable {
        /// Graph size left once every removable item is gone.
        preserved: usize,
        /// Requested maximum size.
        max_size: usize,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

impl CompactError {
    /// Build an `InvalidRequest` error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        CompactError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Wrap an error with the name of the strategy that produced it.
    pub fn in_strategy(self, strategy: impl Into<String>) -> Self {
        CompactError::StrategyExecution {
            strategy: strategy.into(),
            source: Box::new(self),
        }
    }

    /// Wrap an error with the index of the failing batch request.
    pub fn in_batch(self, index: usize) -> Self {
        CompactError::Batch {
            index,
            source: Box::new(self),
        }
    }

    /// Whether this error (or its root cause) is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            CompactError::Cancelled | CompactError::DeadlineExceeded => true,
            CompactError::StrategyExecution { source, .. } | CompactError::Batch { source, .. } => {
                source.is_cancelled()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CompactError::UnknownStrategy {
            name: "magic".to_string(),
        };
        assert!(err.to_string().contains("magic"));

        let err = CompactError::PreservationUnsatisfiable {
            preserved: 40,
            max_size: 10,
        };
        assert!(err.to_string().contains("40"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_wrapping_keeps_context() {
        let err = CompactError::Cancelled.in_strategy("size").in_batch(3);
        let text = err.to_string();
        assert!(text.contains("Batch request 3"));
        assert!(text.contains("size"));
        assert!(err.is_cancelled());

        let err = CompactError::invalid_request("no graph").in_strategy("size");
        assert!(!err.is_cancelled());
    }
}
