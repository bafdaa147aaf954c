//! Command implementations for MU CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod analyze;
pub mod batch;
pub mod compact;
pub mod strategies;

use anyhow::{Context, Result};
use mu_compact::{CodeGraph, CompactConfig, CompactContext, CompactController};
use std::path::Path;
use std::sync::Arc;

/// Read a serialized code graph from disk.
pub fn load_graph(path: &Path) -> Result<CodeGraph> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph file {}", path.display()))?;
    let graph: CodeGraph = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse graph file {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        files = graph.files.len(),
        size = graph.size(),
        "loaded graph"
    );
    Ok(graph)
}

/// Write a code graph to disk as pretty-printed JSON.
pub fn write_graph(path: &Path, graph: &CodeGraph) -> Result<()> {
    let json = serde_json::to_string_pretty(graph).context("Failed to serialize graph")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write graph file {}", path.display()))
}

/// Build a controller from validated configuration.
pub fn build_controller(config: CompactConfig) -> Result<Arc<CompactController>> {
    let controller = CompactController::new(config).context("Invalid [compact] configuration")?;
    Ok(Arc::new(controller))
}

/// Run blocking compaction work off the async runtime.
///
/// Ctrl-C cancels the context; strategies observe it at their next checkpoint.
pub async fn run_cancellable<T, F>(ctx: CompactContext, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CompactContext) -> mu_compact::Result<T> + Send + 'static,
{
    let token = ctx.token().clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling compaction");
            token.cancel();
        }
    });

    let outcome = tokio::task::spawn_blocking(move || work(&ctx))
        .await
        .context("Compaction task panicked")?;
    watcher.abort();

    Ok(outcome?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mu_compact::{CompactError, SourceFile};
    use tempfile::TempDir;

    #[test]
    fn test_graph_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.json");
        let mut graph = CodeGraph::new();
        graph.add_file(SourceFile::new("src/lib.rs", "rust").with_size(120, 12));

        write_graph(&path, &graph).unwrap();
        let loaded = load_graph(&path).unwrap();
        assert_eq!(loaded, graph);
    }

    #[test]
    fn test_load_graph_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_graph(&path).unwrap_err();
        assert!(format!("{}", err).contains("broken.json"));
    }

    #[test]
    fn test_load_graph_accepts_sparse_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sparse.json");
        std::fs::write(&path, r#"{"files": {"a.py": {"path": "a.py"}}}"#).unwrap();

        let graph = load_graph(&path).unwrap();
        assert_eq!(graph.size(), 1);
    }

    #[tokio::test]
    async fn test_run_cancellable_propagates_errors() {
        let ctx = CompactContext::new();
        let outcome: Result<()> = run_cancellable(ctx, |ctx| {
            ctx.cancel();
            ctx.check()
        })
        .await;

        let err = outcome.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompactError>(),
            Some(CompactError::Cancelled)
        ));
    }
}
