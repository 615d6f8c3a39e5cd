//! Control-flow graphs.
//!
//! A [`Cfg`] is a function's body partitioned into [`BasicBlock`]s, kept as an
//! ordered map from block name to block. The first block is the entry. Edges are
//! never stored: they are derived from the block terminators whenever they are
//! asked for, so a pass that rewrites a terminator automatically rewires the graph.
//!
//! # Construction
//!
//! [`Cfg::from_function`] (or [`CfgBuilder`] when events should be recorded):
//!
//! 1. validates the function ([`Function::validate`])
//! 2. forms blocks: a block starts at the first instruction and at every label, and
//!    ends after every terminator or right before the next label
//! 3. [`Cfg::add_entry`] inserts a fresh entry block if the first block has
//!    predecessors, so dominance has a unique source without in-edges
//! 4. [`Cfg::add_terminators`] gives every block exactly one terminator: a `jmp`
//!    to the next block, or `ret` for the last one
//!
//! # Example
//!
//! ```rust
//! use irkit::analysis::Cfg;
//! use irkit::ir::{FunctionBuilder, Opcode, Type};
//!
//! let f = FunctionBuilder::new("main")
//!     .param("x", Type::Int)
//!     .label("loop")
//!     .op(Opcode::Lt, "c", Type::Bool, ["x", "x"])
//!     .br("c", "loop", "done")
//!     .label("done")
//!     .build();
//!
//! let cfg = Cfg::from_function(&f)?;
//! let names: Vec<&str> = cfg.names().collect();
//! assert_eq!(names, ["main_entry", "loop", "done"]);
//! assert_eq!(cfg.predecessors_of("loop"), ["main_entry", "loop"]);
//! # Ok::<(), irkit::Error>(())
//! ```

mod block;
mod builder;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt::Write,
};

pub use block::BasicBlock;
pub use builder::CfgBuilder;

use crate::{
    ir::{Function, InstrKind, Instruction, Param, Position, Type},
    utils::{
        escape_dot,
        graph::{algorithms, DirectedGraph, NodeId},
    },
    Error, Result,
};

/// A function body as an ordered map of basic blocks.
#[derive(Debug, Clone)]
pub struct Cfg {
    name: String,
    params: Vec<Param>,
    return_type: Option<Type>,
    pos: Option<Position>,
    blocks: Vec<BasicBlock>,
    index: HashMap<String, usize>,
    next_key: u64,
    next_block: usize,
}

impl PartialEq for Cfg {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params == other.params
            && self.return_type == other.return_type
            && self.blocks == other.blocks
    }
}

impl Eq for Cfg {}

impl Cfg {
    /// Builds the CFG of `function`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the function is structurally invalid.
    pub fn from_function(function: &Function) -> Result<Self> {
        CfgBuilder::new(function).build()
    }

    pub(crate) fn with_blocks(function: &Function, blocks: Vec<BasicBlock>, next_block: usize) -> Self {
        let mut cfg = Self {
            name: function.name.clone(),
            params: function.params.clone(),
            return_type: function.return_type.clone(),
            pos: function.pos,
            blocks,
            index: HashMap::new(),
            next_key: function.max_key() + 1,
            next_block,
        };
        cfg.reindex();
        cfg
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the function parameters.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns the function return type.
    #[must_use]
    pub fn return_type(&self) -> Option<&Type> {
        self.return_type.as_ref()
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the CFG has no blocks. Never the case after construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the blocks in order.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns the blocks for in-place instruction rewriting.
    ///
    /// Block names must not be changed through this slice.
    pub fn blocks_mut(&mut self) -> &mut [BasicBlock] {
        &mut self.blocks
    }

    /// Iterates over the block names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|b| b.name.as_str())
    }

    /// Returns the entry block.
    ///
    /// # Panics
    ///
    /// Panics on an empty CFG, which construction never produces.
    #[must_use]
    pub fn entry(&self) -> &BasicBlock {
        &self.blocks[0]
    }

    /// Returns the position of the block called `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Looks up a block by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BasicBlock> {
        self.index_of(name).map(|i| &self.blocks[i])
    }

    /// Looks up a block by name, failing with [`Error::UnknownBlock`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if no block has that name.
    pub fn block(&self, name: &str) -> Result<&BasicBlock> {
        self.get(name)
            .ok_or_else(|| Error::UnknownBlock(name.to_string()))
    }

    /// Looks up a block by name for modification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if no block has that name.
    pub fn block_mut(&mut self, name: &str) -> Result<&mut BasicBlock> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| Error::UnknownBlock(name.to_string()))?;
        Ok(&mut self.blocks[idx])
    }

    /// Returns the successor names of `name`. Unknown blocks have none.
    #[must_use]
    pub fn successors_of(&self, name: &str) -> Vec<&str> {
        self.get(name).map(BasicBlock::successors).unwrap_or_default()
    }

    /// Returns the predecessor names of `name`, in block order.
    #[must_use]
    pub fn predecessors_of(&self, name: &str) -> Vec<&str> {
        self.blocks
            .iter()
            .filter(|b| b.successors().contains(&name))
            .map(|b| b.name.as_str())
            .collect()
    }

    /// Returns block name to successor names for every block.
    #[must_use]
    pub fn successors_map(&self) -> BTreeMap<String, Vec<String>> {
        self.blocks
            .iter()
            .map(|b| {
                let succs = b.successors().into_iter().map(str::to_string).collect();
                (b.name.clone(), succs)
            })
            .collect()
    }

    /// Returns block name to predecessor names for every block.
    #[must_use]
    pub fn predecessors_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut preds: BTreeMap<String, Vec<String>> = self
            .blocks
            .iter()
            .map(|b| (b.name.clone(), Vec::new()))
            .collect();
        for block in &self.blocks {
            for succ in block.successors() {
                if let Some(list) = preds.get_mut(succ) {
                    list.push(block.name.clone());
                }
            }
        }
        preds
    }

    /// Returns the dense graph view: node `i` is the `i`-th block.
    ///
    /// Edges to names that are not blocks are skipped; construction rejects them.
    #[must_use]
    pub fn graph(&self) -> DirectedGraph {
        let mut graph = DirectedGraph::with_nodes(self.blocks.len());
        for (i, block) in self.blocks.iter().enumerate() {
            for succ in block.successors() {
                if let Some(j) = self.index_of(succ) {
                    graph.add_edge(NodeId::new(i), NodeId::new(j));
                }
            }
        }
        graph
    }

    /// Returns a fresh instruction sequence key.
    pub fn fresh_key(&mut self) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        key
    }

    /// Returns an unused block name of the form `<function>_<n>`.
    pub fn fresh_block_name(&mut self) -> String {
        loop {
            let name = format!("{}_{}", self.name, self.next_block);
            self.next_block += 1;
            if !self.index.contains_key(&name) {
                return name;
            }
        }
    }

    /// Returns the number of instructions across all blocks.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instrs.len()).sum()
    }

    /// Inserts a block at position `at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if a block with the same name exists.
    pub fn insert_block(&mut self, at: usize, block: BasicBlock) -> Result<()> {
        if self.index.contains_key(&block.name) {
            return Err(malformed_error!("Duplicate block '{}' in '{}'", block.name, self.name));
        }
        self.blocks.insert(at.min(self.blocks.len()), block);
        self.reindex();
        Ok(())
    }

    /// Ensures the entry block has no predecessors.
    ///
    /// If the first block is the target of some edge, a new block that jumps to it
    /// is placed in front. Returns the name of the inserted block.
    pub fn add_entry(&mut self) -> Option<String> {
        let first = self.blocks.first()?.name.clone();
        if self.predecessors_of(&first).is_empty() {
            return None;
        }

        let preferred = format!("{}_entry", self.name);
        let name = if self.index.contains_key(&preferred) {
            self.fresh_block_name()
        } else {
            preferred
        };
        let jmp = Instruction::jmp(first).with_key(self.fresh_key());
        self.blocks.insert(0, BasicBlock::new(name.clone(), vec![jmp]));
        self.reindex();
        Some(name)
    }

    /// Gives every block a terminator.
    ///
    /// A block that falls through gets `jmp` to the next block; the last block gets
    /// `ret`. Returns the names of the blocks that were changed.
    pub fn add_terminators(&mut self) -> Vec<String> {
        let mut changed = Vec::new();
        for i in 0..self.blocks.len() {
            if self.blocks[i].terminator().is_some() {
                continue;
            }
            let term = match self.blocks.get(i + 1) {
                Some(next) => Instruction::jmp(next.name.clone()),
                None => Instruction::ret(None),
            };
            let term = term.with_key(self.fresh_key());
            self.blocks[i].instrs.push(term);
            changed.push(self.blocks[i].name.clone());
        }
        changed
    }

    /// Deletes blocks that cannot be reached from the entry.
    ///
    /// Phi operands flowing in from deleted blocks are dropped as well. Returns the
    /// names of the deleted blocks.
    pub fn remove_unreachable(&mut self) -> Vec<String> {
        if self.blocks.is_empty() {
            return Vec::new();
        }
        let reachable = algorithms::reachable(&self.graph(), NodeId::new(0));
        if reachable.count() == self.blocks.len() {
            return Vec::new();
        }

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(reachable.count());
        for (i, block) in std::mem::take(&mut self.blocks).into_iter().enumerate() {
            if reachable.contains(i) {
                kept.push(block);
            } else {
                removed.push(block.name);
            }
        }
        self.blocks = kept;
        self.reindex();

        let gone: HashSet<&str> = removed.iter().map(String::as_str).collect();
        for block in &mut self.blocks {
            for phi in block.instrs.iter_mut().take_while(|i| i.is_phi()) {
                retain_incoming(phi, |label| !gone.contains(label));
            }
        }
        removed
    }

    /// Splits the edge `from -> to` by routing it through a new block.
    ///
    /// The new block is placed right after `from`, contains only `jmp to`, and takes
    /// over `from`'s role in the phi operands of `to`. Returns its name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] for unknown names and [`Error::Malformed`] if
    /// there is no such edge.
    pub fn split_edge(&mut self, from: &str, to: &str) -> Result<String> {
        let from_idx = self
            .index_of(from)
            .ok_or_else(|| Error::UnknownBlock(from.to_string()))?;
        if self.index_of(to).is_none() {
            return Err(Error::UnknownBlock(to.to_string()));
        }
        if !self.blocks[from_idx].successors().contains(&to) {
            return Err(malformed_error!("No edge {} -> {} in '{}'", from, to, self.name));
        }

        let name = self.fresh_block_name();
        if let Some(term) = self.blocks[from_idx].terminator_mut() {
            for label in term.labels_mut() {
                if *label == to {
                    label.clone_from(&name);
                }
            }
        }
        let to_block = self.block_mut(to)?;
        for phi in to_block.instrs.iter_mut().take_while(|i| i.is_phi()) {
            for label in phi.labels_mut() {
                if *label == from {
                    label.clone_from(&name);
                }
            }
        }

        let jmp = Instruction::jmp(to).with_key(self.fresh_key());
        self.insert_block(from_idx + 1, BasicBlock::new(name.clone(), vec![jmp]))?;
        Ok(name)
    }

    /// Flattens the CFG back into a labelled instruction stream.
    #[must_use]
    pub fn into_function(mut self) -> Function {
        let mut instrs = Vec::with_capacity(self.instruction_count() + self.blocks.len());
        for block in std::mem::take(&mut self.blocks) {
            instrs.push(Instruction::label(block.name).with_key(self.fresh_key()));
            instrs.extend(block.instrs);
        }
        Function {
            name: self.name,
            params: self.params,
            return_type: self.return_type,
            instrs,
            pos: self.pos,
        }
    }

    /// Renders the CFG in Graphviz DOT format.
    ///
    /// `br` edges are labelled `T` and `F`.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "digraph \"{}\" {{", escape_dot(&self.name));
        let _ = writeln!(dot, "  node [shape=box, fontname=\"monospace\"];");
        for block in &self.blocks {
            let mut label = format!("{}:\n", block.name);
            for instr in &block.instrs {
                let _ = writeln!(label, "  {instr}");
            }
            let _ = writeln!(
                dot,
                "  \"{}\" [label=\"{}\"];",
                escape_dot(&block.name),
                escape_dot(&label)
            );
        }
        for block in &self.blocks {
            let Some(term) = block.terminator() else {
                continue;
            };
            let labels = term.labels();
            for (i, target) in labels.iter().enumerate() {
                let attr = match (labels.len(), i) {
                    (2, 0) => " [label=\"T\"]",
                    (2, _) => " [label=\"F\"]",
                    _ => "",
                };
                let _ = writeln!(
                    dot,
                    "  \"{}\" -> \"{}\"{};",
                    escape_dot(&block.name),
                    escape_dot(target),
                    attr
                );
            }
        }
        dot.push_str("}\n");
        dot
    }

    fn reindex(&mut self) {
        self.index = self
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
    }
}

/// Keeps only the phi operands whose incoming label satisfies `keep`.
pub(crate) fn retain_incoming(phi: &mut Instruction, mut keep: impl FnMut(&str) -> bool) {
    if let InstrKind::Value { args, labels, .. } = &mut phi.kind {
        let mut pairs: Vec<(String, String)> = std::mem::take(args)
            .into_iter()
            .zip(std::mem::take(labels))
            .collect();
        pairs.retain(|(_, label)| keep(label));
        let (kept_args, kept_labels): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
        *args = kept_args;
        *labels = kept_labels;
    }
}
