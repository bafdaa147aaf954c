//! Code graph model consumed and produced by the compaction engine.
//!
//! A [`CodeGraph`] is built by the analysis pipeline (scanner + parser) and
//! handed to the compactor read-only. It holds four keyed collections:
//!
//! - **files** keyed by path
//! - **symbols** keyed by symbol id (e.g. `"func:src/auth.py:login"`)
//! - **nodes** keyed by node id; a node usually mirrors a file (id = path) or a symbol
//! - **edges** keyed by edge id, each connecting two node ids
//!
//! The size of a graph is the uniform count `|files| + |symbols| + |nodes| + |edges|`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current graph serialization format version.
pub const GRAPH_FORMAT_VERSION: &str = "1.0";

/// In-memory dependency graph of a codebase.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeGraph {
    #[serde(default)]
    pub files: HashMap<String, SourceFile>,
    #[serde(default)]
    pub symbols: HashMap<String, Symbol>,
    #[serde(default)]
    pub nodes: HashMap<String, GraphNode>,
    #[serde(default)]
    pub edges: HashMap<String, GraphEdge>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

impl CodeGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uniform graph size: files + symbols + nodes + edges.
    pub fn size(&self) -> usize {
        self.files.len() + self.symbols.len() + self.nodes.len() + self.edges.len()
    }

    /// Check if the graph has no elements at all.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Insert a file, replacing any file with the same path.
    pub fn add_file(&mut self, file: SourceFile) {
        self.files.insert(file.path.clone(), file);
    }

    /// Insert a symbol, replacing any symbol with the same id.
    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.id.clone(), symbol);
    }

    /// Insert a node, replacing any node with the same id.
    pub fn add_node(&mut self, node: GraphNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Insert an edge, replacing any edge with the same id.
    pub fn add_edge(&mut self, edge: GraphEdge) {
        self.edges.insert(edge.id.clone(), edge);
    }

    /// Recompute the totals stored in the metadata from the collections.
    pub fn refresh_metadata(&mut self) {
        self.metadata.total_files = self.files.len();
        self.metadata.total_symbols = self.symbols.len();
        self.metadata.total_nodes = self.nodes.len();
        self.metadata.total_edges = self.edges.len();
    }

    /// Edges sorted by id, for passes whose outcome depends on visit order.
    pub fn sorted_edges(&self) -> Vec<&GraphEdge> {
        let mut edges: Vec<&GraphEdge> = self.edges.values().collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        edges
    }
}

/// Graph-level bookkeeping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    #[serde(default)]
    pub total_files: usize,
    #[serde(default)]
    pub total_symbols: usize,
    #[serde(default)]
    pub total_nodes: usize,
    #[serde(default)]
    pub total_edges: usize,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    GRAPH_FORMAT_VERSION.to_string()
}

impl Default for GraphMetadata {
    fn default() -> Self {
        Self {
            total_files: 0,
            total_symbols: 0,
            total_nodes: 0,
            total_edges: 0,
            generated_at: Utc::now(),
            version: default_version(),
        }
    }
}

/// A source file in the graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    #[serde(default)]
    pub language: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub lines: u64,
    #[serde(default)]
    pub symbol_count: u64,
    #[serde(default)]
    pub import_count: u64,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub is_generated: bool,
    /// Ids of the symbols defined in this file.
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            ..Default::default()
        }
    }

    /// Builder: set byte size and line count.
    pub fn with_size(mut self, size: u64, lines: u64) -> Self {
        self.size = size;
        self.lines = lines;
        self
    }

    /// Builder: attach symbol ids (also updates `symbol_count`).
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self.symbol_count = self.symbols.len() as u64;
        self
    }
}

/// Kind of a code symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Trait,
    Enum,
    Variable,
    Constant,
    Type,
    Module,
    #[default]
    Other,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Trait => "trait",
            SymbolKind::Enum => "enum",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Type => "type",
            SymbolKind::Module => "module",
            SymbolKind::Other => "other",
        }
    }
}

/// Line/column span of a symbol in its file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

/// A named code entity (function, class, ...).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: SymbolKind,
    #[serde(default)]
    pub location: SourceLocation,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub language: String,
}

impl Symbol {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            ..Default::default()
        }
    }
}

/// Generic visualization node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            node_type: node_type.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// Directed relationship between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default = "default_edge_type")]
    pub edge_type: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_edge_type() -> String {
    "imports".to_string()
}

fn default_weight() -> f64 {
    1.0
}

impl GraphEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            edge_type: edge_type.into(),
            weight: default_weight(),
        }
    }

    /// Check if either endpoint is the given node id.
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}
