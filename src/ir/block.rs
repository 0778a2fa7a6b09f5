//! Basic blocks and control flow edge kinds.
//!
//! A [`BasicBlock`] is an ordered list of instruction nodes ending in at most one
//! terminator. Outgoing edges live on the owning [`ProcedureGraph`](crate::ir::ProcedureGraph)
//! and carry an [`EdgeKind`] distinguishing fall-through flow from the two arms of a
//! conditional branch; the edge kind selects whether the destination precondition is
//! narrowed with the branch condition or with its logical inverse.

use std::fmt;

use crate::ir::NodeId;

/// A strongly-typed identifier for basic blocks within a procedure graph.
///
/// `BlockId` wraps a `usize` index into the graph's flat block arena. Block IDs are
/// assigned sequentially starting from 0 when blocks are added; the default value is the
/// entry-block index 0.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Creates a new `BlockId` from a raw index value.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        BlockId(index)
    }

    /// Returns the raw index value of this block identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl From<usize> for BlockId {
    #[inline]
    fn from(index: usize) -> Self {
        BlockId(index)
    }
}

impl From<BlockId> for usize {
    #[inline]
    fn from(block: BlockId) -> Self {
        block.0
    }
}

/// Classification of control flow edges between basic blocks.
///
/// The kind determines how the destination's precondition is updated when the edge is
/// interpreted: unconditional edges plainly join the source state, while conditional
/// edges additionally meet it with the branch condition's refinement (true arm) or the
/// refinement of the negated condition (false arm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EdgeKind {
    /// Fall-through or unconditional jump.
    Unconditional,
    /// The taken arm of a conditional branch.
    ConditionalTrue,
    /// The not-taken arm of a conditional branch.
    ConditionalFalse,
}

/// A directed control flow edge between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEdge {
    /// Source block
    pub source: BlockId,
    /// Destination block
    pub destination: BlockId,
    /// Edge classification
    pub kind: EdgeKind,
}

/// A basic block: an ordered sequence of instruction nodes.
///
/// Blocks own no successor storage themselves; edges are kept on the graph so that the
/// block arena stays free of cross-references (flat vectors indexed by id, never owning
/// pointers).
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    /// Instruction nodes in program order.
    nodes: Vec<NodeId>,
}

impl BasicBlock {
    /// Creates an empty basic block.
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// The block's instruction nodes in program order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The first instruction node, if the block is non-empty.
    ///
    /// Incoming edges update the precondition of this node.
    #[must_use]
    pub fn entry_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// The last instruction node, if the block is non-empty.
    ///
    /// Outgoing edges read the state after this node.
    #[must_use]
    pub fn terminator_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Returns `true` if the block contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn push_node(&mut self, node: NodeId) {
        self.nodes.push(node);
    }
}
