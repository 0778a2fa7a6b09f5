//! Node interpreters: the transfer functions of an analysis.
//!
//! A [`NodeInterpreter`] gives every [`NodeKind`](crate::ir::NodeKind) variant exactly one
//! transfer rule over its domain, resolved by a single exhaustive match, so the rule set
//! stays auditable and the compiler flags a missing rule when a node kind is added.
//!
//! The fixpoint iterator drives an interpreter but never inspects domain values itself:
//! it calls [`transfer_node`](NodeInterpreter::transfer_node) for each node of a block in
//! program order, threads the state between consecutive nodes through
//! [`flow_after`](NodeInterpreter::flow_after), and calls
//! [`transfer_edge`](NodeInterpreter::transfer_edge) for each outgoing edge once the
//! block's nodes are done.
//!
//! # State Conventions
//!
//! - A node's *precondition* is the join of everything flowing into it: predecessor
//!   block exits (via `transfer_edge`) and the preceding node of its own block (via
//!   `flow_after`).
//! - A node's *postcondition* is the interpreter's output for it. Updates must be
//!   monotone: implementations join the newly computed value into the stored one, so a
//!   node's state only ever moves up the lattice across cycle rounds.
//! - Operands are interpreted on demand: a transfer rule needing an operand that has not
//!   been visited this round interprets it first. The operand walk follows the acyclic
//!   data dependencies inside the procedure, so it terminates; back-edge phi operands are
//!   exempt and contribute bottom until their round comes.
//!
//! # Provided Interpreters
//!
//! - [`interval`] - value analysis over the [`Interval`](crate::domain::Interval) domain,
//!   with comparison narrowing on branch edges
//! - [`resource`] - state analysis over the
//!   [`ResourceState`](crate::domain::ResourceState) domain, counting acquire/release
//!   pairs

use crate::domain::AbstractDomain;
use crate::ir::{BlockEdge, NodeId, ProcedureGraph};
use crate::state::StateMap;
use crate::Result;

pub mod interval;
pub mod resource;

pub use interval::{IntervalAnalysis, IntervalInterpreter};
pub use resource::{ResourceAnalysis, ResourceInterpreter};

/// The transfer functions of one analysis over one domain.
///
/// Implementations hold per-run context (actual-argument abstractions, the invoke
/// handler, domain models); one interpreter instance serves exactly one procedure run.
pub trait NodeInterpreter {
    /// The lattice this interpreter computes over.
    type Domain: AbstractDomain;

    /// Applies the transfer rule of `node`, updating its postcondition in `states`.
    ///
    /// Must be idempotent within a round: a node already marked visited is left
    /// untouched. Postcondition updates must be monotone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingNode`](crate::Error::MissingNode) on an unresolvable
    /// operand reference, or whatever the invoke handler surfaces for a failed callee
    /// analysis.
    fn transfer_node(
        &mut self,
        graph: &ProcedureGraph,
        node: NodeId,
        states: &mut StateMap<Self::Domain>,
    ) -> Result<()>;

    /// Propagates the state across one control flow edge, joining into the destination
    /// block's entry precondition.
    ///
    /// Conditional edges may refine the flowing state with the branch condition (true
    /// arm) or its logical inverse (false arm) before the join.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBlock`](crate::Error::MissingBlock) /
    /// [`Error::MissingNode`](crate::Error::MissingNode) on unresolvable references.
    fn transfer_edge(
        &mut self,
        graph: &ProcedureGraph,
        edge: &BlockEdge,
        states: &mut StateMap<Self::Domain>,
    ) -> Result<()>;

    /// The state a successor observes after `node`.
    ///
    /// Defaults to the node's precondition: value-producing nodes do not change the
    /// state threading past them. Stateful interpreters override this for effectful
    /// nodes (an invoke that acquires a resource flows its postcondition onward).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingNode`](crate::Error::MissingNode) if `node` does not
    /// resolve.
    fn flow_after(
        &self,
        graph: &ProcedureGraph,
        node: NodeId,
        states: &StateMap<Self::Domain>,
    ) -> Result<Self::Domain> {
        let _ = graph;
        Ok(states.pre(node).clone())
    }
}
