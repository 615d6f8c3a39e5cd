//! Copy coalescing.
//!
//! A copy `d = id s` whose two sides do not interfere can use one register for
//! both, after which the copy moves a register onto itself and disappears. The
//! merge renames one side to the other in the instruction stream and in the
//! interference graph, and repeats until no such copy is left.

use std::collections::HashSet;

use crate::{
    analysis::Cfg,
    compiler::{regalloc::InterferenceGraph, EventKind, EventLog},
    ir::{InstrKind, Opcode},
};

/// Finds the next coalescible copy as `(from, into)`.
fn next_candidate(cfg: &Cfg, graph: &InterferenceGraph, params: &HashSet<String>) -> Option<(String, String)> {
    for block in cfg.blocks() {
        for instr in &block.instrs {
            let InstrKind::Value {
                op: Opcode::Id,
                dest,
                args,
                ..
            } = &instr.kind
            else {
                continue;
            };
            let [src] = args.as_slice() else {
                continue;
            };
            if dest == src || graph.interferes(dest, src) {
                continue;
            }
            match (params.contains(dest), params.contains(src)) {
                (true, true) => continue,
                (false, true) => return Some((dest.clone(), src.clone())),
                _ => return Some((src.clone(), dest.clone())),
            }
        }
    }
    None
}

/// Renames `from` to `into` in every destination and argument of `cfg`.
fn rename(cfg: &mut Cfg, from: &str, into: &str) {
    for block in cfg.blocks_mut() {
        for instr in &mut block.instrs {
            if let Some(dest) = instr.dest_mut() {
                if dest == from {
                    *dest = into.to_string();
                }
            }
            for arg in instr.args_mut() {
                if arg == from {
                    *arg = into.to_string();
                }
            }
        }
    }
}

/// Deletes every `x = id x`. Returns how many were deleted.
fn remove_self_copies(cfg: &mut Cfg) -> usize {
    let mut removed = 0;
    for block in cfg.blocks_mut() {
        block.instrs.retain(|instr| {
            let self_copy = instr.op() == Some(Opcode::Id)
                && instr.args().len() == 1
                && instr.dest() == Some(instr.args()[0].as_str());
            removed += usize::from(self_copy);
            !self_copy
        });
    }
    removed
}

/// Coalesces copies of `cfg` until none is left. Returns the number of merges.
///
/// Two parameters are never merged, and a parameter is never renamed away, so the
/// function signature is unchanged.
pub fn coalesce(cfg: &mut Cfg, graph: &mut InterferenceGraph, events: &EventLog) -> usize {
    let params: HashSet<String> = cfg.params().iter().map(|p| p.name.clone()).collect();
    let mut merges = 0;

    while let Some((from, into)) = next_candidate(cfg, graph, &params) {
        rename(cfg, &from, &into);
        graph.merge(&from, &into);
        merges += 1;
        events
            .record(EventKind::CopyCoalesced)
            .function(cfg.name())
            .pass("regalloc")
            .message(format!("{from} -> {into}"));
    }

    let removed = remove_self_copies(cfg);
    if removed > 0 {
        log::debug!("'{}': {merges} merges, {removed} copies removed", cfg.name());
    }
    merges
}
