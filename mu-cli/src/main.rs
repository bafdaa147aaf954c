//! MU CLI - Command-line interface for graph compaction
//!
//! Shrinks serialized code graphs so they fit an LLM context budget while
//! keeping the files and symbols the caller marks as important.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::batch::BatchOptions;
use commands::compact::CompactOptions;
use commands::*;
use config::MuConfig;
use output::OutputFormat;

/// Parse and validate a maximum size (must be positive)
fn parse_max_size(s: &str) -> Result<i64, String> {
    let value: i64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value <= 0 {
        return Err(format!("max size must be positive, got {}", value));
    }
    Ok(value)
}

/// Graph compaction for AI-native development.
///
/// MU compacts a serialized code graph with pluggable strategies until it
/// fits a size budget, preserving the files and symbols you name.
#[derive(Parser)]
#[command(name = "mu")]
#[command(author, version)]
#[command(about = "Graph compaction for AI-native development")]
#[command(propagate_version = true)]
#[command(next_help_heading = "Options")]
#[command(after_help = "Examples:
  mu compact graph.json --max-size 500          Compact with the default strategy
  mu compact graph.json -s size -o small.json   Drop the largest files first
  mu batch a.json b.json --strategy hybrid      Compact several graphs at once
  mu analyze graph.json                         Estimate each strategy's effect")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compact a graph file
    Compact {
        /// Path to the serialized graph (JSON)
        graph: PathBuf,

        /// Strategy to use (default: adaptive selection or config default)
        #[arg(short, long)]
        strategy: Option<String>,

        /// Maximum graph size after compaction
        #[arg(short, long, value_parser = parse_max_size)]
        max_size: Option<i64>,

        /// File path that must survive (repeatable)
        #[arg(long = "preserve-file", value_name = "PATH")]
        preserve_files: Vec<String>,

        /// Path fragment whose files must survive (repeatable)
        #[arg(long = "preserve-path", value_name = "PATTERN")]
        preserve_paths: Vec<String>,

        /// Symbol id that must survive (repeatable)
        #[arg(long = "preserve-symbol", value_name = "ID")]
        preserve_symbols: Vec<String>,

        /// Write the compacted graph to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Abort if compaction takes longer than this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Compact several graph files in one run
    Batch {
        /// Paths to serialized graphs (JSON)
        #[arg(required = true)]
        graphs: Vec<PathBuf>,

        /// Strategy to use for every graph
        #[arg(short, long)]
        strategy: Option<String>,

        /// Maximum graph size after compaction
        #[arg(short, long, value_parser = parse_max_size)]
        max_size: Option<i64>,

        /// Run requests one after another instead of in parallel
        #[arg(long)]
        sequential: bool,
    },

    /// Estimate what each strategy could remove without changing anything
    Analyze {
        /// Path to the serialized graph (JSON)
        graph: PathBuf,
    },

    /// List available compaction strategies
    Strategies,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration from .murc.toml
    let config = MuConfig::load(std::path::Path::new("."));

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    // Apply color override from config if set
    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    match command {
        Commands::Compact {
            graph,
            strategy,
            max_size,
            preserve_files,
            preserve_paths,
            preserve_symbols,
            output,
            timeout_secs,
        } => {
            let options = CompactOptions {
                graph,
                strategy,
                max_size,
                preserve_files,
                preserve_paths,
                preserve_symbols,
                output,
                timeout_secs,
            };
            compact::run(options, &config, format).await
        }
        Commands::Batch {
            graphs,
            strategy,
            max_size,
            sequential,
        } => {
            let options = BatchOptions {
                graphs,
                strategy,
                max_size,
                sequential,
            };
            batch::run(options, &config, format).await
        }
        Commands::Analyze { graph } => analyze::run(&graph, &config, format).await,
        Commands::Strategies => strategies::run(&config, format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_max_size() {
        assert_eq!(parse_max_size("500"), Ok(500));
        assert!(parse_max_size("0").is_err());
        assert!(parse_max_size("-3").is_err());
        assert!(parse_max_size("lots").is_err());
    }

    #[test]
    fn test_repeatable_preserve_flags() {
        let cli = Cli::try_parse_from([
            "mu",
            "compact",
            "graph.json",
            "--preserve-file",
            "a.py",
            "--preserve-file",
            "b.py",
            "--preserve-path",
            "core/",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Compact {
                preserve_files,
                preserve_paths,
                ..
            }) => {
                assert_eq!(preserve_files, vec!["a.py", "b.py"]);
                assert_eq!(preserve_paths, vec!["core/"]);
            }
            _ => panic!("expected compact command"),
        }
    }
}
