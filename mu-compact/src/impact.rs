//! Consequence estimate for a removal.

use std::collections::{BTreeSet, HashSet};

use crate::graph::CodeGraph;
use crate::types::{ImpactAnalysis, RemovedItems, RiskLevel};

/// Classify a broken-reference share into a risk level.
pub fn risk_level(broken_share: f64) -> RiskLevel {
    if broken_share < 0.05 {
        RiskLevel::Low
    } else if broken_share < 0.15 {
        RiskLevel::Medium
    } else if broken_share < 0.30 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Estimate what `removed` breaks in `original`, given the resulting `compacted` graph.
pub fn analyze_impact(
    original: &CodeGraph,
    compacted: &CodeGraph,
    removed: &RemovedItems,
) -> ImpactAnalysis {
    let gone: HashSet<&str> = removed
        .files
        .iter()
        .chain(removed.nodes.iter())
        .chain(removed.symbols.iter())
        .map(String::as_str)
        .collect();

    let mut dependent_files = BTreeSet::new();
    let mut broken_references = 0;
    for edge in original.edges.values() {
        let source_gone = gone.contains(edge.source.as_str());
        let target_gone = gone.contains(edge.target.as_str());
        if !source_gone && !target_gone {
            continue;
        }
        broken_references += 1;
        if target_gone && compacted.files.contains_key(&edge.source) {
            dependent_files.insert(edge.source.clone());
        }
    }

    let listed: HashSet<&str> = compacted
        .files
        .values()
        .flat_map(|f| f.symbols.iter().map(String::as_str))
        .collect();
    let isolated_symbols = compacted
        .symbols
        .keys()
        .filter(|id| !listed.contains(id.as_str()))
        .count();

    let broken_share = if original.edges.is_empty() {
        0.0
    } else {
        broken_references as f64 / original.edges.len() as f64
    };
    let risk = risk_level(broken_share);

    let dependent_files: Vec<String> = dependent_files.into_iter().collect();
    ImpactAnalysis {
        recommendations: recommendations(risk, &dependent_files, isolated_symbols),
        dependent_files,
        broken_references,
        isolated_symbols,
        risk_level: risk,
    }
}

fn recommendations(risk: RiskLevel, dependent_files: &[String], isolated: usize) -> Vec<String> {
    let mut out = Vec::new();
    match risk {
        RiskLevel::Low => {}
        RiskLevel::Medium => {
            out.push("Review the removed files before relying on the compacted graph".to_string())
        }
        RiskLevel::High | RiskLevel::Critical => out.push(
            "Consider a less aggressive strategy or a larger maximum size".to_string(),
        ),
    }
    if !dependent_files.is_empty() {
        out.push(format!(
            "{} remaining file(s) depended on removed items; add them to preserve_files if needed",
            dependent_files.len()
        ));
    }
    if isolated > 0 {
        out.push(format!(
            "{} symbol(s) are no longer listed by any remaining file",
            isolated
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, SourceFile, Symbol, SymbolKind};

    #[test]
    fn test_risk_thresholds() {
        assert_eq!(risk_level(0.0), RiskLevel::Low);
        assert_eq!(risk_level(0.049), RiskLevel::Low);
        assert_eq!(risk_level(0.05), RiskLevel::Medium);
        assert_eq!(risk_level(0.2), RiskLevel::High);
        assert_eq!(risk_level(0.3), RiskLevel::Critical);
    }

    #[test]
    fn test_no_removal_is_low_risk() {
        let mut graph = CodeGraph::new();
        graph.add_file(SourceFile::new("a.go", "go"));
        let impact = analyze_impact(&graph, &graph, &RemovedItems::default());
        assert_eq!(impact.risk_level, RiskLevel::Low);
        assert_eq!(impact.broken_references, 0);
        assert!(impact.recommendations.is_empty());
    }

    #[test]
    fn test_dependents_and_isolated_symbols() {
        let mut original = CodeGraph::new();
        original.add_file(SourceFile::new("main.go", "go"));
        original.add_file(SourceFile::new("util.go", "go").with_symbols(["fn:helper"]));
        original.add_symbol(Symbol::new("fn:helper", "helper", SymbolKind::Function));
        original.add_edge(GraphEdge::new("e1", "main.go", "util.go", "imports"));

        let mut compacted = original.clone();
        compacted.files.remove("util.go");
        compacted.edges.remove("e1");
        let removed = RemovedItems {
            files: vec!["util.go".into()],
            edges: vec!["e1".into()],
            ..Default::default()
        };

        let impact = analyze_impact(&original, &compacted, &removed);
        assert_eq!(impact.dependent_files, vec!["main.go"]);
        assert_eq!(impact.broken_references, 1);
        assert_eq!(impact.isolated_symbols, 1);
        assert_eq!(impact.risk_level, RiskLevel::Critical);
        assert_eq!(impact.recommendations.len(), 3);
    }
}
