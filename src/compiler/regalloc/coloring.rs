//! Kempe coloring.
//!
//! A node with fewer than `k` neighbors can always be colored once the rest of
//! the graph is: at most `k - 1` colors are taken around it. Simplification removes
//! such nodes one at a time (lowest degree first, ties by name) onto a stack, then
//! colors them in reverse removal order with the lowest free color. If every
//! remaining node has `k` or more neighbors the graph is not simplifiable and
//! allocation fails; there is no spilling.

use std::collections::{BTreeMap, BTreeSet};

use crate::compiler::regalloc::InterferenceGraph;

/// Variable name to register name.
pub type ColorMap = BTreeMap<String, String>;

/// Colors `graph` with `registers`.
///
/// Returns the nodes left when simplification got stuck, sorted, on failure.
pub fn color(graph: &InterferenceGraph, registers: &[String]) -> Result<ColorMap, Vec<String>> {
    let k = registers.len();
    let mut work = graph.clone();
    let mut stack = Vec::with_capacity(graph.len());

    while !work.is_empty() {
        let pick = work
            .nodes()
            .map(|n| (work.degree(n), n))
            .filter(|&(degree, _)| degree < k)
            .min()
            .map(|(_, n)| n.to_string());
        let Some(node) = pick else {
            return Err(work.nodes().map(str::to_string).collect());
        };
        work.remove_node(&node);
        stack.push(node);
    }

    let mut colors = ColorMap::new();
    while let Some(node) = stack.pop() {
        let taken: BTreeSet<&str> = graph
            .neighbors(&node)
            .filter_map(|n| colors.get(n).map(String::as_str))
            .collect();
        let Some(free) = registers.iter().find(|r| !taken.contains(r.as_str())) else {
            return Err(vec![node]);
        };
        colors.insert(node, free.clone());
    }
    Ok(colors)
}

/// Returns `true` if no two neighbors share a color and every node is colored.
#[must_use]
pub fn is_valid_coloring(graph: &InterferenceGraph, colors: &ColorMap) -> bool {
    graph.nodes().all(|n| colors.contains_key(n))
        && graph.edges().all(|(a, b)| colors.get(a) != colors.get(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registers(names: &[&str]) -> Vec<String> {
        names.iter().map(|r| (*r).to_string()).collect()
    }

    fn triangle() -> InterferenceGraph {
        let mut graph = InterferenceGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "c");
        graph.add_edge("a", "c");
        graph.add_node("lonely");
        graph
    }

    #[test]
    fn test_colors_triangle() {
        let graph = triangle();
        let colors = color(&graph, &registers(&["r0", "r1", "r2"])).unwrap();
        assert!(is_valid_coloring(&graph, &colors));
        assert_eq!(colors["lonely"], "r0");
        assert_eq!(colors.len(), 4);
    }

    #[test]
    fn test_deterministic() {
        let graph = triangle();
        let regs = registers(&["r0", "r1", "r2"]);
        assert_eq!(color(&graph, &regs), color(&graph, &regs));
    }

    #[test]
    fn test_not_simplifiable() {
        let graph = triangle();
        let remaining = color(&graph, &registers(&["r0", "r1"])).unwrap_err();
        assert_eq!(remaining, ["a", "b", "c"]);
    }

    #[test]
    fn test_no_registers() {
        let mut graph = InterferenceGraph::new();
        graph.add_node("x");
        assert_eq!(color(&graph, &[]).unwrap_err(), ["x"]);
        assert_eq!(color(&InterferenceGraph::new(), &[]), Ok(ColorMap::new()));
    }
}
