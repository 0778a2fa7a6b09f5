//! Interprocedural analysis: invoke handling, summaries, and the driver.
//!
//! Crossing a call site is delegated through the [`InvokeHandler`] seam so the same node
//! interpreters serve both strategies:
//!
//! - **Opaque** ([`OpaqueInvokes`]): every call result is top. Never recurses, always
//!   sound, maximally imprecise. This is also the fallback the summarizing strategy
//!   degrades to for callees without a body and for recursive calls found on the current
//!   analysis stack.
//! - **Summarizing** ([`Driver`] with [`InvokePolicy::Summarize`]): the callee is
//!   analyzed from its own entry under the abstraction of the actual arguments, the
//!   result is published as an immutable [`Summary`], and later call sites whose
//!   arguments are subsumed by a cached summary reuse its postcondition without
//!   re-analysis.
//!
//! The [`Analysis`] trait is the seam a domain plugs in through: it builds the node
//! interpreter for one procedure run and supplies the entry state. [`Driver`] owns the
//! cross-procedure machinery - program, filter, summary cache, fixpoint budget - and
//! dispatches independent roots on a rayon worker pool.

use crate::domain::AbstractDomain;
use crate::interp::NodeInterpreter;
use crate::ir::{ProcedureGraph, ProcedureId};
use crate::Result;

pub mod driver;
pub mod summary;

pub use driver::{Driver, InvokePolicy, RootOutcome};
pub use summary::{Summary, SummaryCache};

/// Strategy for interpreting a call site.
///
/// The node interpreter hands the callee identity and the abstractions of the actual
/// arguments to its handler and uses the returned value as the callee's postcondition -
/// the abstraction of the returned value for value domains, the callee's exit state for
/// state domains.
pub trait InvokeHandler<D: AbstractDomain> {
    /// Interprets a call to `callee` with the given argument abstractions.
    ///
    /// # Errors
    ///
    /// Surfaces the failure of a recursive callee analysis (irreducible callee CFG,
    /// exhausted budget). Missing bodies and recursion cutoffs are handled internally
    /// and never error.
    fn invoke(&mut self, callee: ProcedureId, arguments: &[D]) -> Result<D>;
}

impl<D: AbstractDomain, T: InvokeHandler<D> + ?Sized> InvokeHandler<D> for &mut T {
    fn invoke(&mut self, callee: ProcedureId, arguments: &[D]) -> Result<D> {
        (**self).invoke(callee, arguments)
    }
}

/// The intra-procedural strategy: every call is opaque and returns top.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueInvokes;

impl<D: AbstractDomain> InvokeHandler<D> for OpaqueInvokes {
    fn invoke(&mut self, _callee: ProcedureId, _arguments: &[D]) -> Result<D> {
        Ok(D::top())
    }
}

/// A pluggable analysis: a domain plus the recipe for interpreting one procedure.
///
/// The driver calls [`interpreter`](Self::interpreter) once per procedure run, handing
/// in the actual-argument abstractions and the invoke handler for the run's strategy.
pub trait Analysis: Send + Sync {
    /// The lattice this analysis computes over.
    type Domain: AbstractDomain;

    /// The node interpreter type built for one run; borrows the invoke handler.
    type Interp<'h>: NodeInterpreter<Domain = Self::Domain>
    where
        Self: 'h;

    /// Builds the interpreter for one procedure run.
    fn interpreter<'h>(
        &'h self,
        arguments: Vec<Self::Domain>,
        invokes: &'h mut dyn InvokeHandler<Self::Domain>,
    ) -> Self::Interp<'h>;

    /// The state seeded into the entry block's first node before iteration starts.
    fn entry_state(&self, graph: &ProcedureGraph, arguments: &[Self::Domain]) -> Self::Domain;
}
