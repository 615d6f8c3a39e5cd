//! Structured event logging for the optimization pipeline.
//!
//! Every pass reports what it changed as an [`Event`]: which transformation, in
//! which function and block, and a short human-readable message. Events are
//! collected in an [`EventLog`] which can be queried, summarized or ignored.
//!
//! The log is append-only and backed by `boxcar::Vec`, so it can be shared by
//! reference between functions optimized in parallel without locking.
//!
//! # Example
//!
//! ```rust
//! use irkit::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::ConstantFolded)
//!     .function("main")
//!     .block("loop")
//!     .message("x = add 2 3 -> 5");
//! log.info("starting gvn");
//!
//! assert_eq!(log.count_kind(EventKind::ConstantFolded), 1);
//! assert_eq!(log.summary(), "1 constant folded");
//! ```

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    time::Duration,
};

/// The category of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    // Transformations
    /// An instruction was replaced by a constant
    ConstantFolded,
    /// An instruction was replaced by a copy of an existing value
    CopyPropagated,
    /// A recomputation of an available expression was eliminated
    ExpressionReused,
    /// A phi instruction was placed during SSA construction
    PhiInserted,
    /// A meaningless or redundant phi was replaced
    PhiSimplified,
    /// An explicit undefined value was materialized for a phi operand
    UndefInserted,
    /// A dead instruction was deleted
    InstructionRemoved,
    /// An unreachable block was deleted
    BlockRemoved,
    /// A synthetic entry block was added
    EntryInserted,
    /// A missing terminator was synthesized
    TerminatorInserted,
    /// A critical edge was split
    EdgeSplit,
    /// A copy was removed by register coalescing
    CopyCoalesced,

    // Engine
    /// A pass started on a function
    PassStarted,
    /// A pass finished on a function
    PassCompleted,

    // Diagnostics
    /// Informational message
    Info,
    /// Something looked wrong but processing continued
    Warning,
    /// Processing of a function failed
    Error,
}

impl EventKind {
    /// Returns a short lowercase description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::ConstantFolded => "constant folded",
            Self::CopyPropagated => "copy propagated",
            Self::ExpressionReused => "expression reused",
            Self::PhiInserted => "phi inserted",
            Self::PhiSimplified => "phi simplified",
            Self::UndefInserted => "undef inserted",
            Self::InstructionRemoved => "instruction removed",
            Self::BlockRemoved => "block removed",
            Self::EntryInserted => "entry inserted",
            Self::TerminatorInserted => "terminator inserted",
            Self::EdgeSplit => "edge split",
            Self::CopyCoalesced => "copy coalesced",
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns `true` if this kind records a change to the IR.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        !matches!(
            self,
            Self::PassStarted | Self::PassCompleted | Self::Info | Self::Warning | Self::Error
        )
    }

    /// Returns `true` for info, warning and error.
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Info | Self::Warning | Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// What happened
    pub kind: EventKind,
    /// The function it happened in
    pub function: Option<String>,
    /// The block it happened in
    pub block: Option<String>,
    /// Human-readable detail
    pub message: String,
    /// The pass that produced it
    pub pass: Option<String>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(pass) = &self.pass {
            write!(f, " {pass}")?;
        }
        match (&self.function, &self.block) {
            (Some(func), Some(block)) => write!(f, " @{func}.{block}")?,
            (Some(func), None) => write!(f, " @{func}")?,
            _ => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// Fluent builder for an [`Event`]; the event is committed when the builder drops.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    function: Option<String>,
    block: Option<String>,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            function: None,
            block: None,
            message: None,
            pass: None,
        }
    }

    /// Sets the function.
    pub fn function(mut self, name: impl Into<String>) -> Self {
        self.function = Some(name.into());
        self
    }

    /// Sets the block.
    pub fn block(mut self, name: impl Into<String>) -> Self {
        self.block = Some(name.into());
        self
    }

    /// Sets the message. Defaults to the kind's description.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Sets the producing pass.
    pub fn pass(mut self, name: impl Into<String>) -> Self {
        self.pass = Some(name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            function: self.function.take(),
            block: self.block.take(),
            message,
            pass: self.pass.take(),
        });
    }
}

/// An append-only, thread-safe collection of events.
#[derive(Debug, Default)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts recording an event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.record(EventKind::Info).message(message);
    }

    /// Records a warning.
    pub fn warn(&self, message: impl Into<String>) {
        self.record(EventKind::Warning).message(message);
    }

    /// Records an error.
    pub fn error(&self, message: impl Into<String>) {
        self.record(EventKind::Error).message(message);
    }

    /// Appends copies of all events of `other`.
    pub fn merge(&self, other: &EventLog) {
        for event in other {
            self.events.push(event.clone());
        }
    }

    /// Returns `true` if an event of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind == kind)
    }

    /// Counts the events of `kind`.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.filter_kind(kind).count()
    }

    /// Iterates over all events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Iterates over the events of `kind`.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Iterates over the events recorded for `function`.
    pub fn filter_function<'a>(&'a self, function: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.iter()
            .filter(move |e| e.function.as_deref() == Some(function))
    }

    /// Iterates over the warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Warning)
    }

    /// Iterates over the errors.
    pub fn errors(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Error)
    }

    /// Counts events per kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for event in self {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of distinct functions with at least one transformation.
    #[must_use]
    pub fn functions_affected(&self) -> usize {
        self.iter()
            .filter(|e| e.kind.is_transformation())
            .filter_map(|e| e.function.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Returns a one-line summary of the transformations, e.g.
    /// `"2 constant folded, 1 instruction removed"`.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let counts: BTreeMap<EventKind, usize> = self
            .count_by_kind()
            .into_iter()
            .filter(|(kind, _)| kind.is_transformation())
            .collect();
        if counts.is_empty() {
            return format!("{} events", self.len());
        }

        counts
            .iter()
            .map(|(kind, count)| format!("{count} {kind}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Iterator over the events of an [`EventLog`].
pub struct EventLogIter<'a> {
    inner: boxcar::Iter<'a, Event>,
}

impl<'a> Iterator for EventLogIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, e)| e)
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = EventLogIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        EventLogIter {
            inner: self.events.iter(),
        }
    }
}

impl FromIterator<Event> for EventLog {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        let log = Self::new();
        for event in iter {
            log.events.push(event);
        }
        log
    }
}

/// Aggregate numbers derived from an [`EventLog`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizationStats {
    /// Functions with at least one transformation
    pub functions_transformed: usize,
    /// Constants folded
    pub constants_folded: usize,
    /// Copies propagated and expressions reused
    pub values_reused: usize,
    /// Phis placed by SSA construction
    pub phis_inserted: usize,
    /// Phis simplified by GVN
    pub phis_simplified: usize,
    /// Instructions removed
    pub instructions_removed: usize,
    /// Blocks removed
    pub blocks_removed: usize,
    /// Copies coalesced by the register allocator
    pub copies_coalesced: usize,
    /// Warnings
    pub warnings: usize,
    /// Errors
    pub errors: usize,
    /// Fixpoint iterations of the pass scheduler
    pub iterations: usize,
    /// Wall time
    pub total_time: Duration,
}

impl OptimizationStats {
    /// Derives statistics from the events of `log`.
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        let counts = log.count_by_kind();
        let get = |kind: EventKind| counts.get(&kind).copied().unwrap_or(0);

        Self {
            functions_transformed: log.functions_affected(),
            constants_folded: get(EventKind::ConstantFolded),
            values_reused: get(EventKind::CopyPropagated) + get(EventKind::ExpressionReused),
            phis_inserted: get(EventKind::PhiInserted),
            phis_simplified: get(EventKind::PhiSimplified),
            instructions_removed: get(EventKind::InstructionRemoved),
            blocks_removed: get(EventKind::BlockRemoved),
            copies_coalesced: get(EventKind::CopyCoalesced),
            warnings: get(EventKind::Warning),
            errors: get(EventKind::Error),
            iterations: 0,
            total_time: Duration::ZERO,
        }
    }

    /// Sets the iteration count.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the wall time.
    #[must_use]
    pub fn with_time(mut self, time: Duration) -> Self {
        self.total_time = time;
        self
    }
}

impl fmt::Display for OptimizationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let mut push = |count: usize, what: &str| {
            if count > 0 {
                parts.push(format!("{count} {what}"));
            }
        };
        push(self.functions_transformed, "functions");
        push(self.constants_folded, "constants folded");
        push(self.values_reused, "values reused");
        push(self.phis_inserted, "phis inserted");
        push(self.phis_simplified, "phis simplified");
        push(self.instructions_removed, "instructions removed");
        push(self.blocks_removed, "blocks removed");
        push(self.copies_coalesced, "copies coalesced");
        push(self.warnings, "warnings");
        push(self.errors, "errors");

        if parts.is_empty() {
            write!(f, "no changes")?;
        } else {
            write!(f, "{}", parts.join(", "))?;
        }
        if self.iterations > 0 {
            write!(f, " ({} iterations", self.iterations)?;
            if !self.total_time.is_zero() {
                write!(f, ", {:.2?}", self.total_time)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_commits_on_drop() {
        let log = EventLog::new();
        assert!(log.is_empty());

        log.record(EventKind::InstructionRemoved)
            .function("f")
            .block("b1")
            .pass("dce");
        let event = log.iter().next().unwrap();
        assert_eq!(event.message, "instruction removed");
        assert_eq!(event.block.as_deref(), Some("b1"));
        assert_eq!(event.to_string(), "[instruction removed] dce @f.b1: instruction removed");
    }

    #[test]
    fn test_queries() {
        let log = EventLog::new();
        log.record(EventKind::ConstantFolded).function("f");
        log.record(EventKind::ConstantFolded).function("g");
        log.record(EventKind::CopyPropagated).function("f");
        log.warn("careful");

        assert_eq!(log.len(), 4);
        assert_eq!(log.count_kind(EventKind::ConstantFolded), 2);
        assert_eq!(log.filter_function("f").count(), 2);
        assert_eq!(log.functions_affected(), 2);
        assert_eq!(log.warnings().count(), 1);
        assert_eq!(log.summary(), "2 constant folded, 1 copy propagated");
    }

    #[test]
    fn test_merge_and_clone() {
        let a = EventLog::new();
        a.info("one");
        let b = EventLog::new();
        b.error("two");
        a.merge(&b);
        let c = a.clone();
        assert_eq!(c.len(), 2);
        assert!(c.has(EventKind::Error));
        assert_eq!(c.summary(), "2 events");
    }

    #[test]
    fn test_stats() {
        let log = EventLog::new();
        log.record(EventKind::ConstantFolded).function("f");
        log.record(EventKind::InstructionRemoved).function("f");
        log.record(EventKind::InstructionRemoved).function("f");
        let stats = OptimizationStats::from_log(&log).with_iterations(3);
        assert_eq!(stats.instructions_removed, 2);
        assert_eq!(
            stats.to_string(),
            "1 functions, 1 constants folded, 2 instructions removed (3 iterations)"
        );
    }
}
