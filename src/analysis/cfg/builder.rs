//! CFG construction from a flat instruction stream.

use std::collections::HashSet;

use crate::{
    analysis::cfg::{BasicBlock, Cfg},
    compiler::{EventKind, EventLog},
    ir::{Function, InstrKind, Instruction},
    Result,
};

/// Builds a [`Cfg`] from a [`Function`], optionally recording what it synthesized.
///
/// ```rust
/// use irkit::analysis::CfgBuilder;
/// use irkit::compiler::{EventKind, EventLog};
/// use irkit::ir::Function;
///
/// let log = EventLog::new();
/// let cfg = CfgBuilder::new(&Function::new("empty")).with_events(&log).build()?;
/// assert_eq!(cfg.len(), 1);
/// assert_eq!(log.count_kind(EventKind::TerminatorInserted), 1);
/// # Ok::<(), irkit::Error>(())
/// ```
pub struct CfgBuilder<'a> {
    function: &'a Function,
    events: Option<&'a EventLog>,
}

impl<'a> CfgBuilder<'a> {
    /// Starts building the CFG of `function`.
    #[must_use]
    pub fn new(function: &'a Function) -> Self {
        Self {
            function,
            events: None,
        }
    }

    /// Records inserted entries and terminators into `events`.
    #[must_use]
    pub fn with_events(mut self, events: &'a EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Validates the function and builds the normalized CFG.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the function is structurally invalid or
    /// a phi names a block that does not exist.
    pub fn build(self) -> Result<Cfg> {
        self.function.validate()?;

        let (blocks, next_block) = self.form_blocks();
        let mut cfg = Cfg::with_blocks(self.function, blocks, next_block);
        check_phi_labels(&cfg)?;

        if let Some(entry) = cfg.add_entry() {
            if let Some(events) = self.events {
                events
                    .record(EventKind::EntryInserted)
                    .function(cfg.name())
                    .block(entry);
            }
        }

        for block in cfg.add_terminators() {
            if let Some(events) = self.events {
                events
                    .record(EventKind::TerminatorInserted)
                    .function(cfg.name())
                    .block(block);
            }
        }

        log::debug!("built cfg for '{}': {} blocks", cfg.name(), cfg.len());
        Ok(cfg)
    }

    /// Partitions the instruction stream. Returns the blocks and the next free
    /// synthesized-name counter.
    fn form_blocks(&self) -> (Vec<BasicBlock>, usize) {
        let mut pending: Vec<(Option<String>, Vec<Instruction>)> = Vec::new();
        let mut name: Option<String> = None;
        let mut current: Vec<Instruction> = Vec::new();

        for instr in &self.function.instrs {
            if let InstrKind::Label { name: label } = &instr.kind {
                if name.is_some() || !current.is_empty() {
                    pending.push((name.take(), std::mem::take(&mut current)));
                }
                name = Some(label.clone());
                continue;
            }

            current.push(instr.clone());
            if instr.is_terminator() {
                pending.push((name.take(), std::mem::take(&mut current)));
            }
        }
        if name.is_some() || !current.is_empty() || pending.is_empty() {
            pending.push((name, current));
        }

        let labels: HashSet<String> = pending
            .iter()
            .filter_map(|(name, _)| name.clone())
            .collect();
        let mut counter = 0usize;
        let blocks = pending
            .into_iter()
            .map(|(name, instrs)| {
                let name = name.unwrap_or_else(|| loop {
                    let candidate = format!("{}_{}", self.function.name, counter);
                    counter += 1;
                    if !labels.contains(&candidate) {
                        break candidate;
                    }
                });
                BasicBlock::new(name, instrs)
            })
            .collect();
        (blocks, counter)
    }
}

fn check_phi_labels(cfg: &Cfg) -> Result<()> {
    for block in cfg.blocks() {
        for phi in block.instrs.iter().filter(|i| i.is_phi()) {
            if let Some(missing) = phi.labels().iter().find(|l| cfg.get(l).is_none()) {
                return Err(malformed_error!(
                    "Phi in block '{}' of '{}' names unknown block '{}'",
                    block.name,
                    cfg.name(),
                    missing
                ));
            }
        }
    }
    Ok(())
}
