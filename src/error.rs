use thiserror::Error;

use crate::ir::{BlockId, NodeId};

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all possible failure conditions that can occur while ordering a control
/// flow graph, iterating a procedure to a fixpoint, or driving an interprocedural analysis.
/// Each variant provides specific context about the failure mode to enable appropriate error
/// handling.
///
/// # Error Categories
///
/// ## Construction-Time Defects
/// - [`Error::IrreducibleControlFlow`] - The host IR violated the reducibility guarantee
/// - [`Error::DomainContract`] - A domain cannot guarantee termination
/// - [`Error::RecursionLimit`] - Maximum traversal depth exceeded
///
/// ## Analysis Failures
/// - [`Error::CycleBudgetExceeded`] - A cycle failed to stabilize within the configured round budget
/// - [`Error::StepBudgetExceeded`] - The global interpretation budget of one run was exhausted
///
/// ## Integrity Errors
/// - [`Error::MissingNode`] - A node index did not resolve in its graph
/// - [`Error::MissingBlock`] - A block index did not resolve in its graph
///
/// Note that two conditions from the analysis taxonomy are deliberately *not* errors: a callee
/// without a body is treated as an opaque call, and a recursive call detected on the current
/// analysis stack is cut off with an opaque result. Both are logged and analysis continues.
///
/// # Examples
///
/// ```rust,ignore
/// use absint::{Error, interproc::RootOutcome};
///
/// match driver.analyze_root(root) {
///     RootOutcome::Failed(Error::IrreducibleControlFlow { block }) => {
///         eprintln!("irreducible region entered at {}", block);
///     }
///     outcome => {
///         println!("{:?}", outcome);
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The control flow graph is not reducible with respect to its entry block.
    ///
    /// The weak topological ordering builder found an edge entering a cycle at a block other
    /// than the cycle's head. Multiple-entry loops are a defect in the surrounding IR's
    /// reducibility guarantee, not a recoverable runtime condition, so analysis of the
    /// affected procedure fails fast rather than mis-ordering its blocks.
    #[error("Irreducible control flow - cycle entered at non-head block {block}")]
    IrreducibleControlFlow {
        /// The cycle member that was entered from outside the cycle
        block: BlockId,
    },

    /// The abstract domain cannot guarantee termination.
    ///
    /// A domain that declares an infinite lattice height must supply a widening operator.
    /// This is checked when the fixpoint iterator is constructed, before any iteration
    /// starts, so a non-terminating configuration is rejected instead of looping forever.
    #[error("Domain contract violation - {0}")]
    DomainContract(&'static str),

    /// A cycle failed to stabilize within the configured round budget.
    ///
    /// Even with widening applied past the threshold, the cycle headed by the given block
    /// did not reach a fixpoint. This is surfaced as a reportable per-procedure failure;
    /// callers may retry with a coarser domain or skip the procedure.
    #[error("Cycle budget exceeded - cycle at {head} still unstable after {rounds} rounds")]
    CycleBudgetExceeded {
        /// The head block of the unstable cycle
        head: BlockId,
        /// The number of rounds performed before giving up
        rounds: usize,
    },

    /// The global step budget of one fixpoint run was exhausted.
    ///
    /// Counts every scheduled node interpretation across all components of the run, so
    /// pathological graphs are bounded even when no single cycle exceeds its round
    /// budget.
    #[error("Step budget exceeded - {steps} node interpretations without reaching a fixpoint")]
    StepBudgetExceeded {
        /// The number of node interpretations performed before giving up
        steps: usize,
    },

    /// Recursion limit reached.
    ///
    /// To prevent stack overflow during the depth-first traversal that builds the weak
    /// topological ordering, a maximum recursion depth is enforced. This error indicates
    /// that limit was exceeded.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// A node index did not resolve to a node in the procedure graph.
    ///
    /// Node identity is stable for the duration of one analysis run; encountering an
    /// unresolvable index means the graph was mutated mid-run or the index belongs to a
    /// different graph.
    #[error("Node {0} does not exist in this graph")]
    MissingNode(NodeId),

    /// A block index did not resolve to a block in the procedure graph.
    #[error("Block {0} does not exist in this graph")]
    MissingBlock(BlockId),
}
