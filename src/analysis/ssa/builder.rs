//! SSA construction.
//!
//! The classic three phases:
//!
//! 1. collect, for every variable, the blocks that write it
//! 2. place phi nodes on the iterated dominance frontier of those blocks
//! 3. rename every definition to a fresh `<var>.<n>` by walking the dominator tree
//!    with one stack of live names per original variable
//!
//! Phase 3 walks the tree with an explicit work stack, so deeply nested control flow
//! cannot exhaust the call stack.
//!
//! A variable that is undefined along some path into a phi gets an explicit
//! `x.undef.<n> = undef` at the end of that predecessor.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::{
    analysis::{ssa::NameGenerator, Cfg, Dominance},
    compiler::{EventKind, EventLog},
    ir::{Instruction, Type},
    Result,
};

/// A phi under construction: one per (block, original variable).
#[derive(Debug)]
struct PendingPhi {
    var: String,
    dest: String,
    ty: Type,
    incoming: Vec<(String, String)>,
}

enum Frame {
    Enter(String),
    Exit(Vec<String>),
}

/// Converts a [`Cfg`] into SSA form.
///
/// ```rust
/// use irkit::analysis::{ssa::SsaBuilder, Cfg};
/// use irkit::ir::{FunctionBuilder, Literal, Type};
///
/// let f = FunctionBuilder::new("f")
///     .param("c", Type::Bool)
///     .br("c", "l", "r")
///     .label("l")
///     .constant("x", Type::Int, Literal::Int(1))
///     .jmp("j")
///     .label("r")
///     .constant("x", Type::Int, Literal::Int(2))
///     .label("j")
///     .print(["x"])
///     .build();
/// let ssa = SsaBuilder::new(Cfg::from_function(&f)?).build()?;
///
/// let join = ssa.block("j")?;
/// assert_eq!(join.phi_count(), 1);
/// assert_eq!(join.instrs[0].dest(), Some("x.0"));
/// assert_eq!(join.instrs[1].args(), ["x.0"]);
/// # Ok::<(), irkit::Error>(())
/// ```
pub struct SsaBuilder<'a> {
    cfg: Cfg,
    events: Option<&'a EventLog>,
}

impl<'a> SsaBuilder<'a> {
    /// Starts converting `cfg`.
    #[must_use]
    pub fn new(cfg: Cfg) -> Self {
        Self { cfg, events: None }
    }

    /// Records inserted phis, undefs and removed blocks into `events`.
    #[must_use]
    pub fn with_events(mut self, events: &'a EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Runs the conversion.
    ///
    /// Blocks unreachable from the entry are removed first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the CFG already contains phi nodes.
    pub fn build(mut self) -> Result<Cfg> {
        if let Some(block) = self.cfg.blocks().iter().find(|b| b.phi_count() > 0) {
            return Err(malformed_error!(
                "Block '{}' of '{}' already contains phi nodes",
                block.name,
                self.cfg.name()
            ));
        }
        if self.cfg.is_empty() {
            return Ok(self.cfg);
        }

        for removed in self.cfg.remove_unreachable() {
            self.event(EventKind::BlockRemoved, &removed, "unreachable");
        }

        let dominance = Dominance::compute(&self.cfg)?;
        let (def_blocks, types) = self.collect_definitions();
        let placement = place_phis(&dominance, &def_blocks);
        let mut phis = create_phis(&placement, &types);
        let mut names = NameGenerator::for_cfg(&self.cfg);
        self.rename(&dominance, &mut phis, &mut names)?;
        self.insert_phis(phis);

        log::debug!("converted '{}' to ssa", self.cfg.name());
        Ok(self.cfg)
    }

    /// Phase 1: variable -> defining blocks, and variable -> declared type.
    fn collect_definitions(&self) -> (BTreeMap<String, BTreeSet<String>>, HashMap<String, Type>) {
        let mut def_blocks: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut types: HashMap<String, Type> = HashMap::new();

        for param in self.cfg.params() {
            types.insert(param.name.clone(), param.ty.clone());
            def_blocks
                .entry(param.name.clone())
                .or_default()
                .insert(self.cfg.entry().name.clone());
        }
        for block in self.cfg.blocks() {
            for instr in &block.instrs {
                if let (Some(dest), Some(ty)) = (instr.dest(), instr.ty()) {
                    types.entry(dest.to_string()).or_insert_with(|| ty.clone());
                    def_blocks
                        .entry(dest.to_string())
                        .or_default()
                        .insert(block.name.clone());
                }
            }
        }
        (def_blocks, types)
    }

    /// Phase 3.
    fn rename(
        &mut self,
        dominance: &Dominance,
        phis: &mut HashMap<String, Vec<PendingPhi>>,
        names: &mut NameGenerator,
    ) -> Result<()> {
        let mut stacks: HashMap<String, Vec<String>> = self
            .cfg
            .params()
            .iter()
            .map(|p| (p.name.clone(), vec![p.name.clone()]))
            .collect();

        let mut work = vec![Frame::Enter(dominance.entry().to_string())];
        while let Some(frame) = work.pop() {
            let block_name = match frame {
                Frame::Enter(name) => name,
                Frame::Exit(pushed) => {
                    for var in pushed {
                        if let Some(stack) = stacks.get_mut(&var) {
                            stack.pop();
                        }
                    }
                    continue;
                }
            };

            let mut pushed = Vec::new();
            if let Some(block_phis) = phis.get_mut(&block_name) {
                for phi in block_phis {
                    phi.dest = names.fresh(&phi.var);
                    stacks.entry(phi.var.clone()).or_default().push(phi.dest.clone());
                    pushed.push(phi.var.clone());
                }
            }

            let block = self.cfg.block_mut(&block_name)?;
            for instr in &mut block.instrs {
                for arg in instr.args_mut() {
                    if let Some(top) = stacks.get(arg.as_str()).and_then(|s| s.last()) {
                        arg.clone_from(top);
                    }
                }
                if let Some(dest) = instr.dest_mut() {
                    let original = std::mem::take(dest);
                    *dest = names.fresh(&original);
                    stacks.entry(original.clone()).or_default().push(dest.clone());
                    pushed.push(original);
                }
            }

            self.fill_successor_phis(&block_name, &stacks, phis, names)?;

            work.push(Frame::Exit(pushed));
            for child in dominance.children(&block_name).into_iter().rev() {
                work.push(Frame::Enter(child.to_string()));
            }
        }
        Ok(())
    }

    /// Records this block's current names as incoming values of its successors' phis.
    fn fill_successor_phis(
        &mut self,
        block_name: &str,
        stacks: &HashMap<String, Vec<String>>,
        phis: &mut HashMap<String, Vec<PendingPhi>>,
        names: &mut NameGenerator,
    ) -> Result<()> {
        let successors: Vec<String> = self
            .cfg
            .successors_of(block_name)
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut undefs: HashMap<String, String> = HashMap::new();
        let mut undef_instrs = Vec::new();
        for succ in successors {
            let Some(succ_phis) = phis.get_mut(&succ) else {
                continue;
            };
            for phi in succ_phis {
                let value = match stacks.get(&phi.var).and_then(|s| s.last()) {
                    Some(name) => name.clone(),
                    None => undefs
                        .entry(phi.var.clone())
                        .or_insert_with(|| {
                            let name = names.fresh(&format!("{}.undef", phi.var));
                            undef_instrs.push(Instruction::undef(name.clone(), phi.ty.clone()));
                            name
                        })
                        .clone(),
                };
                phi.incoming.push((block_name.to_string(), value));
            }
        }

        if undef_instrs.is_empty() {
            return Ok(());
        }
        let keyed: Vec<Instruction> = undef_instrs
            .into_iter()
            .map(|i| i.with_key(self.cfg.fresh_key()))
            .collect();
        for instr in &keyed {
            if let Some(dest) = instr.dest() {
                self.event(EventKind::UndefInserted, block_name, dest);
            }
        }
        let block = self.cfg.block_mut(block_name)?;
        let at = block.insertion_point();
        block.instrs.splice(at..at, keyed);
        Ok(())
    }

    /// Prepends the finished phis to their blocks, ordered by variable name.
    fn insert_phis(&mut self, mut phis: HashMap<String, Vec<PendingPhi>>) {
        let function = self.cfg.name().to_string();
        let mut order: Vec<String> = phis.keys().cloned().collect();
        order.sort();

        for block_name in order {
            let Some(mut block_phis) = phis.remove(&block_name) else {
                continue;
            };
            block_phis.sort_by(|a, b| a.var.cmp(&b.var));

            let mut instrs = Vec::with_capacity(block_phis.len());
            for phi in block_phis {
                let (labels, args): (Vec<String>, Vec<String>) = phi.incoming.into_iter().unzip();
                if let Some(events) = self.events {
                    events
                        .record(EventKind::PhiInserted)
                        .function(&function)
                        .block(&block_name)
                        .pass("ssa")
                        .message(format!("{} for {}", phi.dest, phi.var));
                }
                instrs.push(Instruction::phi(phi.dest, phi.ty, args, labels).with_key(self.cfg.fresh_key()));
            }
            if let Ok(block) = self.cfg.block_mut(&block_name) {
                block.instrs.splice(0..0, instrs);
            }
        }
    }

    fn event(&self, kind: EventKind, block: &str, message: &str) {
        if let Some(events) = self.events {
            events
                .record(kind)
                .function(self.cfg.name())
                .block(block)
                .pass("ssa")
                .message(message);
        }
    }
}

fn create_phis(
    placement: &BTreeMap<String, BTreeSet<String>>,
    types: &HashMap<String, Type>,
) -> HashMap<String, Vec<PendingPhi>> {
    let mut phis: HashMap<String, Vec<PendingPhi>> = HashMap::new();
    for (block, vars) in placement {
        for var in vars {
            let Some(ty) = types.get(var) else {
                continue;
            };
            phis.entry(block.clone()).or_default().push(PendingPhi {
                var: var.clone(),
                dest: String::new(),
                ty: ty.clone(),
                incoming: Vec::new(),
            });
        }
    }
    phis
}

/// Phase 2: block -> variables needing a phi there.
///
/// A block that gains a phi for `v` becomes a definition site of `v` itself, so the
/// flood continues from it.
fn place_phis(
    dominance: &Dominance,
    def_blocks: &BTreeMap<String, BTreeSet<String>>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut placement: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (var, blocks) in def_blocks {
        let mut placed: HashSet<&str> = HashSet::new();
        let mut worklist: Vec<&str> = blocks
            .iter()
            .map(String::as_str)
            .filter(|b| dominance.contains(b))
            .collect();

        while let Some(block) = worklist.pop() {
            for frontier in dominance.frontier(block) {
                if placed.insert(frontier) {
                    placement
                        .entry(frontier.to_string())
                        .or_default()
                        .insert(var.clone());
                    if !blocks.contains(frontier) {
                        worklist.push(frontier);
                    }
                }
            }
        }
    }
    placement
}
