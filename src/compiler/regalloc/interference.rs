//! Interference graphs.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::{
    dataflow::{AnalysisResults, LiveVariables},
    Cfg,
};

/// An undirected graph over variable names. An edge means the two variables are
/// live at the same time and cannot share a register.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterferenceGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl InterferenceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the interference graph of `cfg` from its liveness.
    ///
    /// One forward pass per block over the live sets after each instruction: a
    /// definition interferes with every other variable live right after it. A
    /// definition that is never read still interferes, since its register is
    /// written. Parameters arrive together, so they interfere with each other and
    /// with everything live on entry.
    #[must_use]
    pub fn build(cfg: &Cfg, liveness: &AnalysisResults<BTreeSet<String>>) -> Self {
        let mut graph = Self::new();
        let params: Vec<&str> = cfg.params().iter().map(|p| p.name.as_str()).collect();
        for (i, a) in params.iter().enumerate() {
            graph.add_node(a);
            for b in &params[i + 1..] {
                graph.add_edge(a, b);
            }
        }
        if let Some(live_in) = liveness.in_state(&cfg.entry().name) {
            for param in &params {
                for var in live_in {
                    graph.add_edge(param, var);
                }
            }
        }

        let empty = BTreeSet::new();
        for block in cfg.blocks() {
            let live_out = liveness.out_state(&block.name).unwrap_or(&empty);
            let after = LiveVariables::live_after_each(block, live_out);
            for (instr, live) in block.instrs.iter().zip(&after) {
                for arg in instr.args() {
                    graph.add_node(arg);
                }
                if let Some(dest) = instr.dest() {
                    graph.add_node(dest);
                    for var in live {
                        graph.add_edge(dest, var);
                    }
                }
            }
        }
        graph
    }

    /// Adds a node without edges.
    pub fn add_node(&mut self, node: &str) {
        if !self.edges.contains_key(node) {
            self.edges.insert(node.to_string(), BTreeSet::new());
        }
    }

    /// Adds an edge. Self-edges are ignored.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.edges.entry(a.to_string()).or_default().insert(b.to_string());
        self.edges.entry(b.to_string()).or_default().insert(a.to_string());
    }

    /// Returns `true` if `a` and `b` interfere.
    #[must_use]
    pub fn interferes(&self, a: &str, b: &str) -> bool {
        self.edges.get(a).is_some_and(|n| n.contains(b))
    }

    /// Returns `true` if `node` is in the graph.
    #[must_use]
    pub fn contains(&self, node: &str) -> bool {
        self.edges.contains_key(node)
    }

    /// Returns the neighbors of `node`, sorted.
    pub fn neighbors(&self, node: &str) -> impl Iterator<Item = &str> {
        self.edges.get(node).into_iter().flatten().map(String::as_str)
    }

    /// Returns the number of neighbors of `node`.
    #[must_use]
    pub fn degree(&self, node: &str) -> usize {
        self.edges.get(node).map_or(0, BTreeSet::len)
    }

    /// Iterates over the nodes, sorted.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Iterates over the edges as `(a, b)` with `a < b`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().flat_map(|(a, ns)| {
            ns.iter()
                .filter(move |b| a < *b)
                .map(move |b| (a.as_str(), b.as_str()))
        })
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Removes `node` and its edges.
    pub fn remove_node(&mut self, node: &str) {
        if let Some(neighbors) = self.edges.remove(node) {
            for n in neighbors {
                if let Some(set) = self.edges.get_mut(&n) {
                    set.remove(node);
                }
            }
        }
    }

    /// Merges `from` into `into`: `into` inherits every edge of `from`.
    pub fn merge(&mut self, from: &str, into: &str) {
        let Some(neighbors) = self.edges.get(from).cloned() else {
            return;
        };
        self.remove_node(from);
        self.add_node(into);
        for n in neighbors {
            self.add_edge(into, &n);
        }
    }

    /// Returns the adjacency as an ordered map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.edges.clone()
    }
}
