//! Node identifiers and typed instruction nodes.
//!
//! This module provides [`NodeId`], a strongly-typed identifier for instruction nodes, and
//! [`NodeKind`], the closed enumeration of instruction kinds the engine knows how to
//! interpret. The newtype wrapper provides type safety and prevents accidental confusion
//! between node indices and other integer values.
//!
//! # Closed Node Vocabulary
//!
//! Node kinds are represented as a tagged enumeration with one transfer-rule implementation
//! per variant, resolved by a single exhaustive match in each node interpreter. This keeps
//! the rule set auditable and lets the compiler enforce exhaustiveness when a new node kind
//! is added. Host IR constructs outside this vocabulary are mapped to [`NodeKind::Opaque`],
//! which interpreters handle with a conservative "unknown effect" rule.

use std::fmt;

use crate::ir::{BlockId, ProcedureId};

/// A strongly-typed identifier for instruction nodes within a procedure graph.
///
/// `NodeId` wraps a `usize` index into the graph's flat node arena. Node IDs are assigned
/// sequentially starting from 0 when nodes are added to a graph, and stay stable for the
/// duration of one analysis run.
///
/// # Usage
///
/// Node IDs are created by [`ProcedureGraph::add_node`](crate::ir::ProcedureGraph::add_node)
/// and are used to:
///
/// - Reference operand nodes from other nodes
/// - Look up per-node abstract states in a [`StateMap`](crate::state::StateMap)
/// - Query node data during interpretation
///
/// # Thread Safety
///
/// `NodeId` is [`Copy`], [`Send`], and [`Sync`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw index value.
    ///
    /// This constructor is primarily intended for internal use and testing. Normal usage
    /// should obtain `NodeId` values from
    /// [`ProcedureGraph::add_node`](crate::ir::ProcedureGraph::add_node).
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw index value of this node identifier.
    ///
    /// The index is a 0-based position that can be used to index into side tables that
    /// store per-node data.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BinaryOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
}

/// Comparison operators used by [`NodeKind::Compare`] nodes.
///
/// The false edge of a conditional branch is narrowed with the *logical inverse* of the
/// branch condition, obtained via [`CompareOp::negate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CompareOp {
    /// Strictly less than
    Lt,
    /// Less than or equal
    Le,
    /// Strictly greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Equal
    Eq,
    /// Not equal
    Ne,
}

impl CompareOp {
    /// Returns the logical inverse of this comparison.
    ///
    /// `negate(x < y)` is `x >= y`, and so on. Used to narrow the false edge of a
    /// conditional branch.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
            Self::Ge => Self::Lt,
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
        }
    }

    /// Returns the comparison with its operands swapped.
    ///
    /// `swap(x < y)` is `y > x`. Used to narrow the right-hand operand of a comparison
    /// when the left-hand side is the statically bounded one.
    #[must_use]
    pub const fn swap(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
        }
    }
}

/// One incoming value of a phi node: the predecessor block it flows in from, and the node
/// producing the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhiOperand {
    /// The predecessor block this operand flows in from
    pub block: BlockId,
    /// The node producing the merged value
    pub value: NodeId,
}

/// The typed kinds of instruction nodes the engine interprets.
///
/// Every variant has exactly one transfer rule per interpreter; see the
/// [`interp`](crate::interp) module. Value-producing kinds (`Constant`, `Parameter`,
/// `Binary`, `Compare`, `Phi`, `Invoke`) carry their operands as node references into the
/// same graph; control kinds (`Branch`, `Return`) terminate a block.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// An integer literal.
    Constant(i64),

    /// The n-th formal parameter of the enclosing procedure.
    ///
    /// Its abstraction is bound from the actual-argument values the analysis was entered
    /// with, or top for a root analyzed without a known call site.
    Parameter(u32),

    /// A binary arithmetic operation over two operand nodes.
    Binary {
        /// The arithmetic operator
        op: BinaryOp,
        /// Left operand node
        lhs: NodeId,
        /// Right operand node
        rhs: NodeId,
    },

    /// A comparison of two operand nodes.
    ///
    /// The node's postcondition is the refinement the comparison implies when it holds;
    /// branch edges consume it (or its inverse) to narrow destination preconditions.
    Compare {
        /// The comparison operator
        op: CompareOp,
        /// Left operand node
        lhs: NodeId,
        /// Right operand node
        rhs: NodeId,
    },

    /// A merge value: joins one incoming value per predecessor edge of its block.
    Phi {
        /// Incoming values, one per predecessor edge
        operands: Vec<PhiOperand>,
    },

    /// A frame/state marker emitted by the host IR. No abstract effect.
    FrameState,

    /// A loop-header marker. No abstract effect; cycle scheduling is derived from the
    /// weak topological ordering, not from this marker.
    LoopBegin,

    /// A conditional branch terminating its block.
    ///
    /// The true/false successor edges are recorded on the block; `condition` references
    /// a [`NodeKind::Compare`] node.
    Branch {
        /// The condition node this branch tests
        condition: NodeId,
    },

    /// A call to another procedure.
    ///
    /// Interpretation is delegated to the configured
    /// [`InvokeHandler`](crate::interproc::InvokeHandler) rather than handled inline.
    Invoke {
        /// The resolved callee identity
        callee: ProcedureId,
        /// Ordered actual-argument nodes
        arguments: Vec<NodeId>,
    },

    /// A return terminating its block, optionally yielding a value node.
    Return {
        /// The returned value node, if any
        value: Option<NodeId>,
    },

    /// A host-IR construct with no transfer rule in this engine.
    ///
    /// Interpreters fall back to joining the node's postcondition with its precondition
    /// and log the gap, so one unsupported node does not abort a whole procedure.
    Opaque,
}

impl NodeKind {
    /// Returns `true` if this kind terminates a basic block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(self, Self::Branch { .. } | Self::Return { .. })
    }

    /// Returns a short static name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Constant(_) => "constant",
            Self::Parameter(_) => "parameter",
            Self::Binary { .. } => "binary",
            Self::Compare { .. } => "compare",
            Self::Phi { .. } => "phi",
            Self::FrameState => "frame-state",
            Self::LoopBegin => "loop-begin",
            Self::Branch { .. } => "branch",
            Self::Invoke { .. } => "invoke",
            Self::Return { .. } => "return",
            Self::Opaque => "opaque",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_roundtrip() {
        let node = NodeId::new(42);
        assert_eq!(node.index(), 42);
        assert_eq!(usize::from(node), 42);
        assert_eq!(NodeId::from(42usize), node);
    }

    #[test]
    fn test_node_id_display_format() {
        let node = NodeId::new(7);
        assert_eq!(format!("{node}"), "n7");
        assert_eq!(format!("{node:?}"), "NodeId(7)");
    }

    #[test]
    fn test_compare_op_negate_involution() {
        for op in [
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Gt,
            CompareOp::Ge,
            CompareOp::Eq,
            CompareOp::Ne,
        ] {
            assert_eq!(op.negate().negate(), op);
        }
    }

    #[test]
    fn test_compare_op_negate_pairs() {
        assert_eq!(CompareOp::Lt.negate(), CompareOp::Ge);
        assert_eq!(CompareOp::Le.negate(), CompareOp::Gt);
        assert_eq!(CompareOp::Eq.negate(), CompareOp::Ne);
    }

    #[test]
    fn test_terminator_classification() {
        assert!(NodeKind::Branch {
            condition: NodeId::new(0)
        }
        .is_terminator());
        assert!(NodeKind::Return { value: None }.is_terminator());
        assert!(!NodeKind::Constant(1).is_terminator());
        assert!(!NodeKind::FrameState.is_terminator());
    }
}
