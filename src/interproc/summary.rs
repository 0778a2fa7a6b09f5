//! Procedure summaries and the concurrent summary cache.
//!
//! A [`Summary`] memoizes one callee analysis: the argument abstractions it was entered
//! with, the entry state derived from them, and the joined exit state. Summaries are
//! immutable once published; the cache hands them out behind [`Arc`], so readers never
//! observe a partially constructed entry and lookups are lock-free reads on the
//! [`DashMap`] shard holding the procedure.
//!
//! Reuse is by *subsumption*, not exact match: a cached summary computed for more
//! general arguments soundly answers any call site whose actual arguments lie below
//! them in the lattice order.

use std::sync::Arc;

use dashmap::DashMap;

use crate::domain::AbstractDomain;
use crate::ir::ProcedureId;

/// The memoized result of analyzing one procedure under one argument abstraction.
#[derive(Debug, Clone)]
pub struct Summary<D> {
    arguments: Vec<D>,
    precondition: D,
    postcondition: D,
}

impl<D: AbstractDomain> Summary<D> {
    /// Creates a summary; the driver publishes it after the callee's fixpoint completes.
    #[must_use]
    pub fn new(arguments: Vec<D>, precondition: D, postcondition: D) -> Self {
        Self {
            arguments,
            precondition,
            postcondition,
        }
    }

    /// The argument abstractions the callee was analyzed under.
    #[must_use]
    pub fn arguments(&self) -> &[D] {
        &self.arguments
    }

    /// The entry state the analysis started from.
    #[must_use]
    pub fn precondition(&self) -> &D {
        &self.precondition
    }

    /// The joined exit state over all of the callee's returns.
    #[must_use]
    pub fn postcondition(&self) -> &D {
        &self.postcondition
    }

    /// Returns `true` if this summary soundly covers a call with the given actual
    /// arguments: every recorded argument sits at or above the corresponding actual in
    /// the lattice order.
    #[must_use]
    pub fn subsumes(&self, actuals: &[D]) -> bool {
        self.arguments.len() == actuals.len()
            && actuals
                .iter()
                .zip(&self.arguments)
                .all(|(actual, recorded)| actual.le(recorded))
    }
}

/// Concurrent map from procedure to its published summaries.
///
/// Shared by every analysis thread of a run; reads vastly outnumber writes, which is the
/// access pattern the sharded map is built for. Multiple summaries per procedure are
/// kept - analyses under different argument abstractions produce distinct entries, and
/// a lookup scans for the first subsuming one.
#[derive(Debug)]
pub struct SummaryCache<D> {
    entries: DashMap<ProcedureId, Vec<Arc<Summary<D>>>>,
}

impl<D: AbstractDomain> SummaryCache<D> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Finds a published summary subsuming the given actual arguments.
    #[must_use]
    pub fn lookup(&self, procedure: ProcedureId, actuals: &[D]) -> Option<Arc<Summary<D>>> {
        self.entries.get(&procedure).and_then(|summaries| {
            summaries
                .iter()
                .find(|summary| summary.subsumes(actuals))
                .cloned()
        })
    }

    /// Publishes a summary for a procedure.
    pub fn insert(&self, procedure: ProcedureId, summary: Arc<Summary<D>>) {
        self.entries.entry(procedure).or_default().push(summary);
    }

    /// All summaries published for a procedure, for downstream tooling.
    #[must_use]
    pub fn summaries(&self, procedure: ProcedureId) -> Vec<Arc<Summary<D>>> {
        self.entries
            .get(&procedure)
            .map(|summaries| summaries.clone())
            .unwrap_or_default()
    }

    /// The number of procedures with at least one published summary.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been published yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<D: AbstractDomain> Default for SummaryCache<D> {
    fn default() -> Self {
        Self::new()
    }
}
