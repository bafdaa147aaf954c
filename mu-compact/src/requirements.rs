//! Post-compaction requirement checks.
//!
//! Strategies honour preservation while they run; everything else a request
//! can ask for (symbol kinds, languages, dependency depth) is checked here
//! after the fact and reported as warnings.

use std::collections::BTreeSet;

use tracing::warn;

use crate::graph::{CodeGraph, SymbolKind};
use crate::strategy::base::is_file_preserved;
use crate::strategy::dependency_depth;
use crate::types::CompactRequirements;

/// Warnings for every requirement `compacted` no longer meets.
///
/// Only requirements that `original` itself satisfied are reported, so a
/// request asking for something the input never had stays quiet.
pub fn verify_requirements(
    original: &CodeGraph,
    compacted: &CodeGraph,
    requirements: &CompactRequirements,
) -> Vec<String> {
    let mut warnings = Vec::new();
    if requirements.is_empty() {
        return warnings;
    }

    let mut lost_files: Vec<&String> = original
        .files
        .keys()
        .filter(|path| is_file_preserved(path, requirements))
        .filter(|path| !compacted.files.contains_key(*path))
        .collect();
    lost_files.sort();
    for path in lost_files {
        warn!(path = %path, "preserved file was removed");
        warnings.push(format!("preserved file removed: {}", path));
    }

    for id in &requirements.preserve_symbols {
        if original.symbols.contains_key(id) && !compacted.symbols.contains_key(id) {
            warn!(symbol = %id, "preserved symbol was removed");
            warnings.push(format!("preserved symbol removed: {}", id));
        }
    }

    let kinds = |graph: &CodeGraph| -> BTreeSet<SymbolKind> {
        graph.symbols.values().map(|s| s.kind).collect()
    };
    let (before, after) = (kinds(original), kinds(compacted));
    for kind in &requirements.required_kinds {
        if before.contains(kind) && !after.contains(kind) {
            warnings.push(format!("no {} symbols left", kind.as_str()));
        }
    }

    let has_language = |graph: &CodeGraph, language: &str| {
        graph
            .files
            .values()
            .any(|f| f.language.eq_ignore_ascii_case(language))
    };
    for language in &requirements.languages {
        if has_language(original, language) && !has_language(compacted, language) {
            warnings.push(format!("all {} files removed", language));
        }
    }

    if requirements.min_dependency_depth > 0 {
        let depth = dependency_depth(compacted);
        if depth < requirements.min_dependency_depth
            && dependency_depth(original) >= requirements.min_dependency_depth
        {
            warnings.push(format!(
                "dependency depth {} below required {}",
                depth, requirements.min_dependency_depth
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, SourceFile, Symbol};

    fn graph() -> CodeGraph {
        let mut graph = CodeGraph::new();
        graph.add_file(SourceFile::new("api/main.go", "go"));
        graph.add_file(SourceFile::new("web/app.ts", "typescript"));
        graph.add_symbol(Symbol::new("type:User", "User", SymbolKind::Struct));
        graph.add_symbol(Symbol::new("fn:main", "main", SymbolKind::Function));
        graph.add_edge(GraphEdge::new("e1", "web/app.ts", "api/main.go", "calls"));
        graph
    }

    #[test]
    fn test_empty_requirements_never_warn() {
        let original = graph();
        let warnings = verify_requirements(&original, &CodeGraph::new(), &CompactRequirements::new());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_reports_lost_items() {
        let original = graph();
        let mut compacted = original.clone();
        compacted.files.remove("web/app.ts");
        compacted.symbols.remove("type:User");
        compacted.edges.clear();

        let mut req = CompactRequirements::new()
            .preserve_path("web/")
            .preserve_symbol("type:User");
        req.required_kinds.insert(SymbolKind::Struct);
        req.languages.insert("TypeScript".into());
        req.min_dependency_depth = 1;

        let warnings = verify_requirements(&original, &compacted, &req);
        assert_eq!(
            warnings,
            vec![
                "preserved file removed: web/app.ts",
                "preserved symbol removed: type:User",
                "no struct symbols left",
                "all TypeScript files removed",
                "dependency depth 0 below required 1",
            ]
        );
    }

    #[test]
    fn test_satisfied_requirements_are_quiet() {
        let original = graph();
        let mut req = CompactRequirements::new().preserve_file("api/main.go");
        req.required_kinds.insert(SymbolKind::Function);
        req.languages.insert("go".into());
        assert!(verify_requirements(&original, &original, &req).is_empty());
    }
}
