//! Dominance analysis.
//!
//! Block `d` dominates block `n` if every path from the entry to `n` passes through
//! `d`. [`Dominance`] computes, for every block reachable from the entry:
//!
//! - the dominator set `dom[n]` (including `n` itself)
//! - the immediate dominator and the dominator tree, with children in lexicographic
//!   order so tree walks are deterministic
//! - the dominance frontier, where phi nodes for definitions in `n` are needed
//!
//! Dominator sets use the classic iterative data-flow formulation
//! `dom[n] = {n} ∪ ⋂ dom[p]` over the predecessors `p` of `n`, evaluated in reverse
//! post-order so that it settles in a handful of passes. Unreachable blocks take no
//! part in the fixpoint (they would intersect everything down to the empty set) and
//! are absent from every result.
//!
//! All results are keyed by block name so they can be looked up directly with the
//! names of the CFG's block map.
//!
//! # Example
//!
//! ```rust
//! use irkit::analysis::{Cfg, Dominance};
//! use irkit::ir::{FunctionBuilder, Type};
//!
//! let f = FunctionBuilder::new("f")
//!     .param("c", Type::Bool)
//!     .br("c", "then", "join")
//!     .label("then")
//!     .label("join")
//!     .ret(None)
//!     .build();
//! let cfg = Cfg::from_function(&f)?;
//! let dom = Dominance::compute(&cfg)?;
//!
//! assert!(dom.dominates("f_0", "join"));
//! assert!(!dom.dominates("then", "join"));
//! assert_eq!(dom.immediate_dominator("join"), Some("f_0"));
//! assert_eq!(dom.frontier("then"), ["join"]);
//! # Ok::<(), irkit::Error>(())
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    analysis::Cfg,
    utils::{
        graph::{algorithms, DirectedGraph, NodeId, Predecessors, Successors},
        BitSet,
    },
    Error, Result,
};

/// Dominator sets, dominator tree and dominance frontiers of a CFG.
#[derive(Debug, Clone)]
pub struct Dominance {
    names: Vec<String>,
    index: HashMap<String, usize>,
    entry: usize,
    graph: DirectedGraph,
    reachable: BitSet,
    dom: Vec<BitSet>,
    idom: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    frontier: Vec<BitSet>,
}

impl Dominance {
    /// Computes dominance for `cfg`, rooted at its entry block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if a terminator names a missing block.
    pub fn compute(cfg: &Cfg) -> Result<Self> {
        if cfg.is_empty() {
            return Err(malformed_error!("CFG of '{}' has no blocks", cfg.name()));
        }
        Self::from_successors(&cfg.successors_map(), &cfg.entry().name)
    }

    /// Computes dominance from a successor map and an entry block name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if `entry` or any successor is not a key of
    /// `successors`, and [`Error::NonConvergence`] if the fixpoint does not settle.
    pub fn from_successors(successors: &BTreeMap<String, Vec<String>>, entry: &str) -> Result<Self> {
        let names: Vec<String> = successors.keys().cloned().collect();
        let index: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        let mut graph = DirectedGraph::with_nodes(names.len());
        for (from, targets) in successors {
            let from = index[from];
            for target in targets {
                let to = *index
                    .get(target)
                    .ok_or_else(|| Error::UnknownBlock(target.clone()))?;
                graph.add_edge(NodeId::new(from), NodeId::new(to));
            }
        }
        let entry = *index
            .get(entry)
            .ok_or_else(|| Error::UnknownBlock(entry.to_string()))?;

        let mut dominance = Self {
            reachable: BitSet::new(names.len()),
            dom: vec![BitSet::new(names.len()); names.len()],
            idom: vec![None; names.len()],
            children: vec![Vec::new(); names.len()],
            frontier: vec![BitSet::new(names.len()); names.len()],
            names,
            index,
            entry,
            graph,
        };
        dominance.compute_dominators()?;
        dominance.compute_tree();
        dominance.compute_frontiers();
        Ok(dominance)
    }

    fn compute_dominators(&mut self) -> Result<()> {
        let n = self.names.len();
        let rpo = algorithms::reverse_postorder(&self.graph, NodeId::new(self.entry));
        for node in &rpo {
            self.reachable.insert(node.index());
        }

        for node in &rpo {
            self.dom[node.index()] = self.reachable.clone();
        }
        self.dom[self.entry] = BitSet::new(n);
        self.dom[self.entry].insert(self.entry);

        // Reverse post-order settles reducible graphs in two passes plus one to notice
        let max_passes = n + 2;
        let mut passes = 0;
        let mut changed = true;
        while changed {
            changed = false;
            passes += 1;
            if passes > max_passes {
                return Err(Error::NonConvergence {
                    analysis: "dominators",
                    iterations: passes,
                });
            }

            for &node in rpo.iter().filter(|n| n.index() != self.entry) {
                let mut new_dom = self.reachable.clone();
                for pred in self.graph.predecessors(node) {
                    if self.reachable.contains(pred.index()) {
                        new_dom.intersect_with(&self.dom[pred.index()]);
                    }
                }
                new_dom.insert(node.index());

                if new_dom != self.dom[node.index()] {
                    self.dom[node.index()] = new_dom;
                    changed = true;
                }
            }
        }
        log::trace!("dominators settled after {passes} passes over {} blocks", rpo.len());
        Ok(())
    }

    fn compute_tree(&mut self) {
        for node in self.reachable.iter() {
            if node == self.entry {
                continue;
            }
            let depth = self.dom[node].count();
            self.idom[node] = self.dom[node]
                .iter()
                .find(|&d| d != node && self.dom[d].count() + 1 == depth);
        }

        for node in self.reachable.iter() {
            if let Some(parent) = self.idom[node] {
                self.children[parent].push(node);
            }
        }
        // Indices follow sorted key order, so index order is lexicographic order
        for children in &mut self.children {
            children.sort_unstable();
        }
    }

    fn compute_frontiers(&mut self) {
        for n in self.reachable.iter() {
            for d in self.reachable.iter() {
                if !self.dom[d].contains(n) {
                    continue;
                }
                for succ in self.graph.successors(NodeId::new(d)) {
                    let s = succ.index();
                    let strictly_dominated = s != n && self.dom[s].contains(n);
                    if !strictly_dominated {
                        self.frontier[n].insert(s);
                    }
                }
            }
        }
    }

    fn idx(&self, block: &str) -> Option<usize> {
        self.index
            .get(block)
            .copied()
            .filter(|&i| self.reachable.contains(i))
    }

    fn names_of(&self, set: &BitSet) -> Vec<&str> {
        set.iter().map(|i| self.names[i].as_str()).collect()
    }

    /// Returns the entry block name.
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.names[self.entry]
    }

    /// Returns `true` if `block` is reachable from the entry.
    #[must_use]
    pub fn contains(&self, block: &str) -> bool {
        self.idx(block).is_some()
    }

    /// Iterates over the reachable block names in lexicographic order.
    pub fn blocks(&self) -> impl Iterator<Item = &str> {
        self.reachable.iter().map(|i| self.names[i].as_str())
    }

    /// Returns `true` if `a` dominates `b`. Every block dominates itself.
    #[must_use]
    pub fn dominates(&self, a: &str, b: &str) -> bool {
        match (self.idx(a), self.idx(b)) {
            (Some(a), Some(b)) => self.dom[b].contains(a),
            _ => false,
        }
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: &str, b: &str) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns `dom[block]`: the blocks dominating `block`, itself included.
    #[must_use]
    pub fn dominators(&self, block: &str) -> Vec<&str> {
        self.idx(block)
            .map(|i| self.names_of(&self.dom[i]))
            .unwrap_or_default()
    }

    /// Returns the blocks dominated by `block`, itself included.
    #[must_use]
    pub fn dominated_by(&self, block: &str) -> Vec<&str> {
        let Some(n) = self.idx(block) else {
            return Vec::new();
        };
        self.reachable
            .iter()
            .filter(|&d| self.dom[d].contains(n))
            .map(|d| self.names[d].as_str())
            .collect()
    }

    /// Returns the immediate dominator, `None` for the entry and unknown blocks.
    #[must_use]
    pub fn immediate_dominator(&self, block: &str) -> Option<&str> {
        let parent = self.idom[self.idx(block)?]?;
        Some(self.names[parent].as_str())
    }

    /// Returns the dominator-tree children of `block`, in lexicographic order.
    #[must_use]
    pub fn children(&self, block: &str) -> Vec<&str> {
        self.idx(block)
            .map(|i| {
                self.children[i]
                    .iter()
                    .map(|&c| self.names[c].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the dominance frontier of `block`, in lexicographic order.
    #[must_use]
    pub fn frontier(&self, block: &str) -> Vec<&str> {
        self.idx(block)
            .map(|i| self.names_of(&self.frontier[i]))
            .unwrap_or_default()
    }

    /// Returns the depth of `block` in the dominator tree (entry is 0).
    #[must_use]
    pub fn depth(&self, block: &str) -> Option<usize> {
        self.idx(block).map(|i| self.dom[i].count() - 1)
    }

    /// Returns the dominator tree in pre-order, children visited lexicographically.
    #[must_use]
    pub fn preorder(&self) -> Vec<&str> {
        let mut order = Vec::with_capacity(self.reachable.count());
        let mut stack = vec![self.entry];
        while let Some(node) = stack.pop() {
            order.push(self.names[node].as_str());
            stack.extend(self.children[node].iter().rev());
        }
        order
    }

    /// Returns every dominator set, keyed by block name.
    #[must_use]
    pub fn dom_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.map_of(|i| self.dom[i].iter().collect())
    }

    /// Returns every dominance frontier, keyed by block name.
    #[must_use]
    pub fn frontier_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.map_of(|i| self.frontier[i].iter().collect())
    }

    /// Returns the dominator tree as block name to children, keyed by block name.
    #[must_use]
    pub fn tree_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.map_of(|i| self.children[i].clone())
    }

    /// Returns the immediate dominator of every non-entry block.
    #[must_use]
    pub fn idom_map(&self) -> BTreeMap<String, String> {
        self.reachable
            .iter()
            .filter_map(|i| {
                self.idom[i].map(|p| (self.names[i].clone(), self.names[p].clone()))
            })
            .collect()
    }

    fn map_of(&self, members: impl Fn(usize) -> Vec<usize>) -> BTreeMap<String, BTreeSet<String>> {
        self.reachable
            .iter()
            .map(|i| {
                let set = members(i)
                    .into_iter()
                    .map(|m| self.names[m].clone())
                    .collect();
                (self.names[i].clone(), set)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, Literal, Opcode, Type};

    fn succs(edges: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        edges
            .iter()
            .map(|(from, to)| {
                (
                    (*from).to_string(),
                    to.iter().map(|t| (*t).to_string()).collect(),
                )
            })
            .collect()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_dominator_single_node() {
        let dom = Dominance::from_successors(&succs(&[("a", &[])]), "a").unwrap();
        assert_eq!(dom.dominators("a"), ["a"]);
        assert_eq!(dom.immediate_dominator("a"), None);
        assert!(dom.frontier("a").is_empty());
        assert_eq!(dom.preorder(), ["a"]);
    }

    #[test]
    fn test_dominator_diamond() {
        let dom = Dominance::from_successors(
            &succs(&[("a", &["b", "c"]), ("b", &["d"]), ("c", &["d"]), ("d", &[])]),
            "a",
        )
        .unwrap();
        assert_eq!(dom.dominators("d"), ["a", "d"]);
        assert_eq!(dom.children("a"), ["b", "c", "d"]);
        assert_eq!(dom.frontier("b"), ["d"]);
        assert_eq!(dom.frontier("c"), ["d"]);
        assert!(dom.frontier("a").is_empty());
        assert!(dom.strictly_dominates("a", "d"));
        assert!(!dom.strictly_dominates("d", "d"));
        assert_eq!(dom.depth("d"), Some(1));
    }

    #[test]
    fn test_while_loop_scenario() {
        // entry -> test -> {body, exit}, body -> test
        let f = FunctionBuilder::new("w")
            .param("x", Type::Int)
            .constant("ten", Type::Int, Literal::Int(10))
            .jmp("test")
            .label("test")
            .op(Opcode::Lt, "c", Type::Bool, ["x", "ten"])
            .br("c", "body", "exit")
            .label("body")
            .constant("one", Type::Int, Literal::Int(1))
            .op(Opcode::Add, "x", Type::Int, ["x", "one"])
            .jmp("test")
            .label("exit")
            .ret(None)
            .build();
        let cfg = Cfg::from_function(&f).unwrap();
        assert_eq!(cfg.len(), 4);
        let entry = cfg.entry().name.clone();

        let dom = Dominance::compute(&cfg).unwrap();
        assert_eq!(dom.dom_map()["body"], set(&[&entry, "test", "body"]));
        assert_eq!(dom.frontier_map()["test"], set(&["test"]));
        assert_eq!(dom.frontier("body"), ["test"]);
        assert_eq!(dom.children("test"), ["body", "exit"]);
    }

    #[test]
    fn test_unreachable_blocks_are_excluded() {
        let dom = Dominance::from_successors(
            &succs(&[("a", &["b"]), ("b", &[]), ("z", &["b"])]),
            "a",
        )
        .unwrap();
        assert!(!dom.contains("z"));
        assert_eq!(dom.dominators("b"), ["a", "b"]);
        assert!(!dom.dom_map().contains_key("z"));
        assert!(!dom.dominates("z", "b"));
    }

    #[test]
    fn test_irreducible_loop() {
        // a -> {b, c}, b <-> c
        let dom = Dominance::from_successors(
            &succs(&[("a", &["b", "c"]), ("b", &["c"]), ("c", &["b"])]),
            "a",
        )
        .unwrap();
        assert_eq!(dom.immediate_dominator("b"), Some("a"));
        assert_eq!(dom.immediate_dominator("c"), Some("a"));
        assert_eq!(dom.frontier("b"), ["c"]);
        assert_eq!(dom.frontier("c"), ["b"]);
    }

    #[test]
    fn test_nested_if_tree_matches_dom() {
        let dom = Dominance::from_successors(
            &succs(&[
                ("a", &["b", "f"]),
                ("b", &["c", "d"]),
                ("c", &["e"]),
                ("d", &["e"]),
                ("e", &["f"]),
                ("f", &[]),
            ]),
            "a",
        )
        .unwrap();
        assert_eq!(dom.children("b"), ["c", "d", "e"]);
        assert_eq!(dom.frontier("e"), ["f"]);
        assert_eq!(dom.frontier("b"), ["f"]);

        // The transitive closure of the tree is the strict dominance relation
        for block in dom.blocks() {
            let mut below = BTreeSet::new();
            let mut stack = dom.children(block);
            while let Some(child) = stack.pop() {
                below.insert(child.to_string());
                stack.extend(dom.children(child));
            }
            let mut strict: BTreeSet<String> =
                dom.dominated_by(block).into_iter().map(str::to_string).collect();
            strict.remove(block);
            assert_eq!(below, strict, "subtree of {block}");
        }
        assert_eq!(dom.preorder(), ["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_unknown_names() {
        assert!(matches!(
            Dominance::from_successors(&succs(&[("a", &["q"])]), "a"),
            Err(Error::UnknownBlock(_))
        ));
        assert!(matches!(
            Dominance::from_successors(&succs(&[("a", &[])]), "q"),
            Err(Error::UnknownBlock(_))
        ));
    }
}
