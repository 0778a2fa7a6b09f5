//! Per-node abstract state storage.
//!
//! A [`StateMap`] owns every abstract state for one analysis run of one procedure: a
//! `(precondition, postcondition)` pair per instruction node plus a "visited" flag used
//! to detect first-time interpretation, so dependent sub-expressions are interpreted on
//! demand and not twice within a round.
//!
//! Alongside the per-node table the map keeps one *entry state* per block: the join of
//! everything flowing in over the block's interpreted incoming edges. Keeping this at the
//! block level (rather than on the block's first node) means a block without any nodes
//! still forwards the merged state to its successors instead of dropping it.
//!
//! The tables are flat side tables indexed by [`NodeId`] / [`BlockId`], mirroring the
//! graph's arenas; the map holds no references into the graph. Each run exclusively owns
//! its map - there is no sharing across procedures or threads.

use crate::domain::AbstractDomain;
use crate::ir::{BasicBlock, BlockId, NodeId, ProcedureGraph};

/// The abstract state attached to one node.
#[derive(Debug, Clone)]
struct NodeState<D> {
    /// Join of all predecessor postconditions reaching this node along analyzed edges.
    pre: D,
    /// The interpreter's output for this node given its precondition.
    post: D,
    /// Whether the node has been interpreted in the current round.
    visited: bool,
}

/// Owns the pre-/postcondition pairs for every node of one procedure graph.
///
/// Downstream checkers query the completed map through [`pre`](Self::pre) and
/// [`post`](Self::post) after the fixpoint iterator returns.
#[derive(Debug, Clone)]
pub struct StateMap<D> {
    states: Vec<NodeState<D>>,
    /// Entry state per block: the join of all interpreted incoming edge flows.
    entries: Vec<D>,
}

/// The states of one block captured at the start of a cycle round: the block entry state
/// plus the `(pre, post)` pair of every node.
#[derive(Debug, Clone)]
pub struct BlockSnapshot<D> {
    entry: D,
    nodes: Vec<(D, D)>,
}

impl<D: AbstractDomain> StateMap<D> {
    /// Creates a state map for the given graph, with every state at bottom and every
    /// node unvisited.
    #[must_use]
    pub fn new(graph: &ProcedureGraph) -> Self {
        Self {
            states: (0..graph.node_count())
                .map(|_| NodeState {
                    pre: D::bottom(),
                    post: D::bottom(),
                    visited: false,
                })
                .collect(),
            entries: (0..graph.block_count()).map(|_| D::bottom()).collect(),
        }
    }

    /// The precondition of a node.
    ///
    /// # Panics
    ///
    /// Panics if the node does not belong to the graph this map was created for.
    #[must_use]
    pub fn pre(&self, node: NodeId) -> &D {
        &self.states[node.index()].pre
    }

    /// The postcondition of a node.
    ///
    /// # Panics
    ///
    /// Panics if the node does not belong to the graph this map was created for.
    #[must_use]
    pub fn post(&self, node: NodeId) -> &D {
        &self.states[node.index()].post
    }

    /// Replaces a node's precondition.
    pub fn set_pre(&mut self, node: NodeId, pre: D) {
        self.states[node.index()].pre = pre;
    }

    /// Replaces a node's postcondition.
    pub fn set_post(&mut self, node: NodeId, post: D) {
        self.states[node.index()].post = post;
    }

    /// Joins `value` into a node's precondition.
    pub fn join_pre(&mut self, node: NodeId, value: &D) {
        let state = &mut self.states[node.index()];
        state.pre = state.pre.join(value);
    }

    /// The merged state flowing into a block over its interpreted incoming edges.
    ///
    /// # Panics
    ///
    /// Panics if the block does not belong to the graph this map was created for.
    #[must_use]
    pub fn block_entry(&self, block: BlockId) -> &D {
        &self.entries[block.index()]
    }

    /// Joins `value` into a block's entry state.
    pub fn join_block_entry(&mut self, block: BlockId, value: &D) {
        let entry = &mut self.entries[block.index()];
        *entry = entry.join(value);
    }

    /// Whether the node has been interpreted in the current round.
    #[must_use]
    pub fn is_visited(&self, node: NodeId) -> bool {
        self.states[node.index()].visited
    }

    /// Marks a node as interpreted.
    pub fn mark_visited(&mut self, node: NodeId) {
        self.states[node.index()].visited = true;
    }

    /// Clears the visited flags of every node in `block`, so a new cycle round
    /// re-interprets them.
    pub fn clear_visited(&mut self, block: &BasicBlock) {
        for &node in block.nodes() {
            self.states[node.index()].visited = false;
        }
    }

    /// Captures the entry state and the `(pre, post)` pairs of every node in `block`,
    /// for stabilization comparison at the end of a cycle round.
    #[must_use]
    pub fn snapshot(&self, block: BlockId, body: &BasicBlock) -> BlockSnapshot<D> {
        BlockSnapshot {
            entry: self.entries[block.index()].clone(),
            nodes: body
                .nodes()
                .iter()
                .map(|&node| {
                    let state = &self.states[node.index()];
                    (state.pre.clone(), state.post.clone())
                })
                .collect(),
        }
    }

    /// Compares the current states of `block` against a snapshot using domain equality.
    #[must_use]
    pub fn differs_from(&self, block: BlockId, body: &BasicBlock, snapshot: &BlockSnapshot<D>) -> bool {
        self.entries[block.index()] != snapshot.entry
            || body
                .nodes()
                .iter()
                .zip(&snapshot.nodes)
                .any(|(&node, (pre, post))| {
                    let state = &self.states[node.index()];
                    state.pre != *pre || state.post != *post
                })
    }

    /// Widens every state of `block` from a snapshot towards its current value.
    ///
    /// Applied at cycle heads once the plain-join round threshold is exceeded, forcing
    /// convergence on infinite-height domains.
    pub fn widen_from(&mut self, block: BlockId, body: &BasicBlock, snapshot: &BlockSnapshot<D>) {
        let entry = &mut self.entries[block.index()];
        *entry = snapshot.entry.widen(entry);
        for (&node, (pre, post)) in body.nodes().iter().zip(&snapshot.nodes) {
            let state = &mut self.states[node.index()];
            state.pre = pre.widen(&state.pre);
            state.post = post.widen(&state.post);
        }
    }

    /// The number of node states owned by this map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if the map holds no states.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
