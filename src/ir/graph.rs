//! Procedure graph: the arena-indexed control flow view the engine consumes.
//!
//! A [`ProcedureGraph`] stores blocks and instruction nodes in flat vectors referenced by
//! integer indices ([`BlockId`] / [`NodeId`]), never by owning pointers, so the abstract
//! state side table can be keyed by the same indices without ownership cycles. The graph
//! is mutated only while the host builds it; the analysis engine treats it as read-only.
//!
//! # Construction
//!
//! ```rust,ignore
//! use absint::ir::{ProcedureGraph, NodeKind, EdgeKind};
//!
//! let mut graph = ProcedureGraph::new();
//! let entry = graph.add_block();
//! let exit = graph.add_block();
//!
//! let five = graph.add_node(entry, NodeKind::Constant(5));
//! graph.add_node(exit, NodeKind::Return { value: Some(five) });
//! graph.add_edge(entry, exit, EdgeKind::Unconditional);
//! ```

use crate::ir::{BasicBlock, BlockEdge, BlockId, EdgeKind, NodeId, NodeKind};
use crate::{Error, Result};

/// An instruction node stored in the graph's node arena: its kind plus the block that
/// contains it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The typed instruction kind
    pub kind: NodeKind,
    /// The block this node belongs to
    pub block: BlockId,
}

/// The control flow graph of one procedure, with its typed instruction nodes.
///
/// Provides the two accessors the engine requires - a designated entry block and ordered
/// successor lists - plus reverse edges for phi evaluation and precondition merging.
///
/// # Thread Safety
///
/// `ProcedureGraph` is `Send + Sync`; after construction it is only read, so a single
/// instance may back concurrent analysis runs of the same procedure from different roots.
#[derive(Debug, Clone, Default)]
pub struct ProcedureGraph {
    /// Block arena, indexed by `BlockId`.
    blocks: Vec<BasicBlock>,
    /// Node arena, indexed by `NodeId`.
    nodes: Vec<Node>,
    /// Outgoing edges per block, in successor order.
    successors: Vec<Vec<(BlockId, EdgeKind)>>,
    /// Incoming edges per block.
    predecessors: Vec<Vec<BlockId>>,
    /// The designated start block.
    entry: BlockId,
}

impl ProcedureGraph {
    /// Creates an empty procedure graph.
    ///
    /// The first block added becomes the entry block unless [`set_entry`](Self::set_entry)
    /// overrides it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            nodes: Vec::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            entry: BlockId::new(0),
        }
    }

    /// Appends a new empty block and returns its identifier.
    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(BasicBlock::new());
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        id
    }

    /// Appends a new instruction node at the end of `block` and returns its identifier.
    ///
    /// # Panics
    ///
    /// Panics if `block` does not exist; graphs are built by the host, which controls
    /// the indices it hands back in.
    pub fn add_node(&mut self, block: BlockId, kind: NodeKind) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node { kind, block });
        self.blocks[block.index()].push_node(id);
        id
    }

    /// Adds a directed edge between two blocks.
    ///
    /// Successor order is the insertion order, which the weak topological ordering
    /// builder follows during traversal.
    ///
    /// # Panics
    ///
    /// Panics if either block does not exist.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId, kind: EdgeKind) {
        assert!(from.index() < self.blocks.len(), "source block must exist");
        assert!(to.index() < self.blocks.len(), "target block must exist");
        self.successors[from.index()].push((to, kind));
        self.predecessors[to.index()].push(from);
    }

    /// Overrides the designated start block.
    pub fn set_entry(&mut self, entry: BlockId) {
        self.entry = entry;
    }

    /// The designated start block of this procedure.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    /// Returns the block with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBlock`] if the index does not resolve.
    pub fn block(&self, id: BlockId) -> Result<&BasicBlock> {
        self.blocks.get(id.index()).ok_or(Error::MissingBlock(id))
    }

    /// Returns the node with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingNode`] if the index does not resolve.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.index()).ok_or(Error::MissingNode(id))
    }

    /// The kind of the node with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingNode`] if the index does not resolve.
    pub fn node_kind(&self, id: NodeId) -> Result<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    /// The block containing the given node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingNode`] if the index does not resolve.
    pub fn containing_block(&self, id: NodeId) -> Result<BlockId> {
        self.node(id).map(|n| n.block)
    }

    /// Ordered successors of a block, with the kind of each edge.
    #[must_use]
    pub fn successors(&self, block: BlockId) -> &[(BlockId, EdgeKind)] {
        self.successors
            .get(block.index())
            .map_or(&[], Vec::as_slice)
    }

    /// Predecessors of a block, in edge insertion order.
    #[must_use]
    pub fn predecessors(&self, block: BlockId) -> &[BlockId] {
        self.predecessors
            .get(block.index())
            .map_or(&[], Vec::as_slice)
    }

    /// Iterates the outgoing edges of a block as [`BlockEdge`] values.
    pub fn outgoing_edges(&self, block: BlockId) -> impl Iterator<Item = BlockEdge> + '_ {
        self.successors(block)
            .iter()
            .map(move |&(destination, kind)| BlockEdge {
                source: block,
                destination,
                kind,
            })
    }

    /// The number of blocks in this graph.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The number of instruction nodes in this graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph contains no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterates all block identifiers in arena order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId::new)
    }

    /// Iterates all node identifiers in arena order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// The number of formal parameters declared by this graph's `Parameter` nodes.
    ///
    /// Computed as one past the highest parameter index present.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| match n.kind {
                NodeKind::Parameter(i) => Some(i as usize + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_arena_indices() {
        let mut graph = ProcedureGraph::new();
        let b0 = graph.add_block();
        let b1 = graph.add_block();

        let n0 = graph.add_node(b0, NodeKind::Constant(1));
        let n1 = graph.add_node(b1, NodeKind::Return { value: Some(n0) });

        assert_eq!(b0.index(), 0);
        assert_eq!(b1.index(), 1);
        assert_eq!(n0.index(), 0);
        assert_eq!(n1.index(), 1);
        assert_eq!(graph.containing_block(n1).unwrap(), b1);
        assert_eq!(graph.entry(), b0);
    }

    #[test]
    fn test_graph_edges_both_directions() {
        let mut graph = ProcedureGraph::new();
        let b0 = graph.add_block();
        let b1 = graph.add_block();
        let b2 = graph.add_block();

        graph.add_edge(b0, b1, EdgeKind::ConditionalTrue);
        graph.add_edge(b0, b2, EdgeKind::ConditionalFalse);
        graph.add_edge(b1, b2, EdgeKind::Unconditional);

        assert_eq!(graph.successors(b0).len(), 2);
        assert_eq!(graph.predecessors(b2), &[b0, b1]);

        let edges: Vec<_> = graph.outgoing_edges(b0).collect();
        assert_eq!(edges[0].kind, EdgeKind::ConditionalTrue);
        assert_eq!(edges[1].destination, b2);
    }

    #[test]
    fn test_default_graph_matches_new() {
        let graph = ProcedureGraph::default();
        assert!(graph.is_empty());
        assert_eq!(graph.entry(), BlockId::new(0));
    }

    #[test]
    fn test_graph_missing_indices_error() {
        let graph = ProcedureGraph::new();
        assert!(matches!(
            graph.block(BlockId::new(0)),
            Err(Error::MissingBlock(_))
        ));
        assert!(matches!(
            graph.node(NodeId::new(7)),
            Err(Error::MissingNode(_))
        ));
    }

    #[test]
    fn test_parameter_count() {
        let mut graph = ProcedureGraph::new();
        let b0 = graph.add_block();
        graph.add_node(b0, NodeKind::Parameter(0));
        graph.add_node(b0, NodeKind::Parameter(2));
        assert_eq!(graph.parameter_count(), 3);
    }
}
