//! Program-level procedure registry: the graph cache and the method filter.
//!
//! The interprocedural driver resolves call targets through a [`Program`], a cache of
//! procedure graphs keyed by [`ProcedureId`]. A procedure may be registered *without* a
//! body (native/intrinsic stubs); looking it up returns `None` and callers treat the
//! invoke as opaque rather than as an error.
//!
//! Analysis scope is bounded by a [`MethodFilter`]: procedures the filter skips (for
//! example, trusted runtime/library code) are never entered.

use std::collections::HashMap;
use std::fmt;

use crate::ir::ProcedureGraph;

/// A strongly-typed identifier for procedures.
///
/// Procedure identity is assigned by the host when graphs are registered and stays
/// stable across the whole multi-procedure analysis run; summaries are keyed by it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcedureId(pub(crate) u32);

impl ProcedureId {
    /// Creates a new `ProcedureId` from a raw index value.
    #[must_use]
    #[inline]
    pub const fn new(index: u32) -> Self {
        ProcedureId(index)
    }

    /// Returns the raw index value of this procedure identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ProcedureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcedureId({})", self.0)
    }
}

impl fmt::Display for ProcedureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Predicate bounding the set of procedures the driver will analyze.
///
/// Skipped procedures are treated exactly like procedures without a body: their invokes
/// are opaque and root analysis of them is not performed.
///
/// Any `Fn(ProcedureId) -> bool + Send + Sync` closure implements this trait, with
/// `true` meaning "skip".
pub trait MethodFilter: Send + Sync {
    /// Returns `true` if the given procedure should be excluded from analysis.
    fn should_skip(&self, procedure: ProcedureId) -> bool;
}

impl<F> MethodFilter for F
where
    F: Fn(ProcedureId) -> bool + Send + Sync,
{
    fn should_skip(&self, procedure: ProcedureId) -> bool {
        self(procedure)
    }
}

/// The default filter: analyze everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeAll;

impl MethodFilter for AnalyzeAll {
    fn should_skip(&self, _procedure: ProcedureId) -> bool {
        false
    }
}

/// The per-program cache of procedure graphs.
///
/// Read-mostly after construction; the driver shares one instance across all recursive
/// and parallel analysis invocations.
#[derive(Debug, Default)]
pub struct Program {
    /// Graphs keyed by procedure identity. Procedures registered via
    /// [`register_stub`](Self::register_stub) have no entry here.
    graphs: HashMap<ProcedureId, ProcedureGraph>,
    /// Optional symbolic names, used only in diagnostics.
    names: HashMap<ProcedureId, String>,
    /// Next identity to hand out.
    next_id: u32,
}

impl Program {
    /// Creates an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a procedure with a body and returns its identity.
    pub fn register(&mut self, name: impl Into<String>, graph: ProcedureGraph) -> ProcedureId {
        let id = self.fresh_id();
        self.graphs.insert(id, graph);
        self.names.insert(id, name.into());
        id
    }

    /// Registers a body-less procedure (native/intrinsic stub) and returns its identity.
    ///
    /// Invokes of such a procedure are treated as opaque; this is not an error.
    pub fn register_stub(&mut self, name: impl Into<String>) -> ProcedureId {
        let id = self.fresh_id();
        self.names.insert(id, name.into());
        id
    }

    /// Replaces the graph of an already-registered procedure.
    ///
    /// Useful when a body becomes available after the identity was handed out.
    pub fn attach_graph(&mut self, id: ProcedureId, graph: ProcedureGraph) {
        self.graphs.insert(id, graph);
    }

    /// Looks up the graph for a procedure.
    ///
    /// Returns `None` for stubs and unknown identities; callers treat both as opaque.
    #[must_use]
    pub fn graph(&self, id: ProcedureId) -> Option<&ProcedureGraph> {
        self.graphs.get(&id)
    }

    /// The symbolic name of a procedure, if one was registered.
    #[must_use]
    pub fn name(&self, id: ProcedureId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// The number of registered procedures (with or without bodies).
    #[must_use]
    pub fn procedure_count(&self) -> usize {
        self.names.len()
    }

    /// Iterates the identities of all procedures that have a body.
    pub fn procedures_with_bodies(&self) -> impl Iterator<Item = ProcedureId> + '_ {
        self.graphs.keys().copied()
    }

    fn fresh_id(&mut self) -> ProcedureId {
        let id = ProcedureId::new(self.next_id);
        self.next_id += 1;
        id
    }
}
