//! Static loop-nesting analysis.
//!
//! Classifies a snippet's asymptotic complexity from its syntax tree
//! alone. The heuristic is deliberately coarse: counted and conditional
//! loops are treated identically, and the notation is a fixed function of
//! the maximum nesting depth reached anywhere in the tree. The result is
//! advisory, so every failure mode maps to a defined report instead of an
//! error.

use tree_sitter::{Node, Parser};

use crate::types::ComplexityReport;

#[derive(Default)]
struct LoopStats {
    max_depth: u32,
    loop_count: u32,
}

/// Analyze `source` as Python and report its loop-nesting profile.
///
/// Never executes the input. Syntactically invalid input yields the
/// `"N/A"` report; an internal analyzer fault yields the `"Error"`
/// report. Neither raises.
pub fn analyze(source: &str) -> ComplexityReport {
    match loop_profile(source) {
        Ok(Some(stats)) => report_for(stats.max_depth, stats.loop_count),
        Ok(None) => ComplexityReport {
            notation: "N/A".to_string(),
            max_depth: 0,
            loop_count: 0,
            explanation: "Code contains syntax errors. Analysis aborted.".to_string(),
        },
        Err(message) => ComplexityReport {
            notation: "Error".to_string(),
            max_depth: 0,
            loop_count: 0,
            explanation: format!("Complexity analyzer failed: {}", message),
        },
    }
}

/// Parse and walk the tree. `Ok(None)` means the input did not parse;
/// `Err` is an internal fault unrelated to the input's syntax.
fn loop_profile(source: &str) -> Result<Option<LoopStats>, String> {
    let mut parser = Parser::new();
    parser
        .set_language(tree_sitter_python::language())
        .map_err(|e| format!("failed to load Python grammar: {:?}", e))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| "parser produced no syntax tree".to_string())?;

    let root = tree.root_node();
    if root.has_error() {
        return Ok(None);
    }

    let mut stats = LoopStats::default();
    walk(root, 0, &mut stats);
    Ok(Some(stats))
}

fn is_loop(kind: &str) -> bool {
    matches!(kind, "for_statement" | "while_statement")
}

fn walk(node: Node, depth: u32, stats: &mut LoopStats) {
    let depth = if is_loop(node.kind()) {
        stats.loop_count += 1;
        stats.max_depth = stats.max_depth.max(depth + 1);
        depth + 1
    } else {
        depth
    };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, depth, stats);
    }
}

fn report_for(max_depth: u32, loop_count: u32) -> ComplexityReport {
    let (notation, explanation) = match max_depth {
        0 => (
            "O(1)".to_string(),
            "No loops detected. Operations are constant time.".to_string(),
        ),
        1 => (
            "O(n)".to_string(),
            "Single loop detected. Time complexity grows linearly with input.".to_string(),
        ),
        2 => (
            "O(n²)".to_string(),
            "Nested loops detected. This indicates quadratic time complexity.".to_string(),
        ),
        depth => (
            format!("O(n^{})", depth),
            format!("Deeply nested loops (depth {}) detected.", depth),
        ),
    };

    ComplexityReport {
        notation,
        max_depth,
        loop_count,
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_loops_is_constant_time() {
        let report = analyze("x = 1\ny = x + 2\nprint(y)\n");
        assert_eq!(report.notation, "O(1)");
        assert_eq!(report.max_depth, 0);
        assert_eq!(report.loop_count, 0);
    }

    #[test]
    fn empty_source_is_constant_time() {
        let report = analyze("");
        assert_eq!(report.notation, "O(1)");
        assert_eq!(report.max_depth, 0);
    }

    #[test]
    fn single_loop_is_linear() {
        let report = analyze("for i in range(3): print(i)\n");
        assert_eq!(report.notation, "O(n)");
        assert_eq!(report.max_depth, 1);
        assert_eq!(report.loop_count, 1);
    }

    #[test]
    fn while_loop_counts_like_for() {
        let report = analyze("i = 0\nwhile i < 10:\n    i += 1\n");
        assert_eq!(report.notation, "O(n)");
        assert_eq!(report.max_depth, 1);
        assert_eq!(report.loop_count, 1);
    }

    #[test]
    fn nested_loops_are_quadratic() {
        let source = "for i in range(3):\n    for j in range(3):\n        print(i, j)\n";
        let report = analyze(source);
        assert_eq!(report.notation, "O(n²)");
        assert_eq!(report.max_depth, 2);
        assert_eq!(report.loop_count, 2);
    }

    #[test]
    fn triple_nesting_reports_cubic() {
        let source = "for i in range(2):\n    for j in range(2):\n        for k in range(2):\n            pass\n";
        let report = analyze(source);
        assert_eq!(report.notation, "O(n^3)");
        assert_eq!(report.max_depth, 3);
        assert_eq!(report.loop_count, 3);
    }

    #[test]
    fn sequential_loops_do_not_nest() {
        let source = "for i in range(3):\n    pass\nfor j in range(3):\n    pass\n";
        let report = analyze(source);
        assert_eq!(report.notation, "O(n)");
        assert_eq!(report.max_depth, 1);
        assert_eq!(report.loop_count, 2);
    }

    #[test]
    fn mixed_nesting_records_the_deepest_chain() {
        let source = "\
while True:
    for i in range(3):
        pass
for j in range(3):
    pass
";
        let report = analyze(source);
        assert_eq!(report.max_depth, 2);
        assert_eq!(report.loop_count, 3);
        assert!(report.loop_count >= report.max_depth);
    }

    #[test]
    fn invalid_syntax_yields_not_applicable() {
        let report = analyze("x = 1 +");
        assert_eq!(report.notation, "N/A");
        assert_eq!(report.max_depth, 0);
        assert_eq!(report.loop_count, 0);
        assert!(report.explanation.contains("syntax errors"));
    }
}
