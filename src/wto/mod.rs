//! Weak topological ordering of control flow graphs.
//!
//! A weak topological ordering (WTO) linearizes a possibly cyclic CFG into an ordered
//! sequence of components - plain [`Vertex`](WtoComponent::Vertex) blocks and nested
//! [`Cycle`](WtoComponent::Cycle) components headed by loop entries - suitable for
//! fixpoint scheduling: the iterator processes components in order and only ever revisits
//! the inside of a cycle.
//!
//! # Algorithm
//!
//! The builder runs Bourdoncle's depth-first algorithm: each block receives a strictly
//! increasing discovery number ("dfn") on first visit; the minimum dfn reachable through
//! a block's successors is propagated back, and a block whose own dfn comes back equal to
//! that minimum seals a component - a cycle if some successor reached back at or below it,
//! a singleton vertex otherwise. Sealed blocks have their dfn pinned to "infinity" so
//! they are never re-entered; blocks popped while sealing a cycle are reset and
//! re-visited inside the new cycle so nested cycles are discovered. The collected
//! sequence is reversed into forward (entry-to-exit) order.
//!
//! The traversal recursion is depth-bounded ([`Error::RecursionLimit`]); hosts with
//! unusually deep graphs can raise the bound via
//! [`WeakTopologicalOrder::build_with_depth_limit`].
//!
//! # Reducibility
//!
//! Cycles with multiple entry points (irreducible control flow) are **not** supported:
//! the ordering produced for such a region would not have the property that re-iteration
//! of the cycle from its head reaches a fixpoint. Construction validates every cycle and
//! fails fast with [`Error::IrreducibleControlFlow`] when an edge from outside a cycle
//! targets one of its non-head members.
//!
//! # Reference
//!
//! Bourdoncle, "Efficient chaotic iteration strategies with widenings", 1993.

use std::collections::HashSet;
use std::fmt;

use crate::ir::{BlockId, ProcedureGraph};
use crate::{Error, Result};

/// Discovery number for blocks not yet visited.
const UNDISCOVERED: usize = 0;
/// Discovery number for sealed blocks, never re-entered.
const SEALED: usize = usize::MAX;

/// Default bound on the depth-first traversal depth.
const DEFAULT_DEPTH_LIMIT: usize = 4096;

/// One element of a weak topological ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WtoComponent {
    /// A single block outside any cycle.
    Vertex(BlockId),
    /// A cycle headed by a loop entry, containing nested components.
    Cycle(WtoCycle),
}

impl WtoComponent {
    /// The block heading this component: the vertex itself, or the cycle head.
    #[must_use]
    pub const fn head(&self) -> BlockId {
        match self {
            Self::Vertex(block) => *block,
            Self::Cycle(cycle) => cycle.head,
        }
    }
}

/// A cycle component: a head block plus the ordered nested components of the loop body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WtoCycle {
    head: BlockId,
    components: Vec<WtoComponent>,
}

impl WtoCycle {
    /// The head block, which every iteration of the cycle re-enters.
    #[must_use]
    pub const fn head(&self) -> BlockId {
        self.head
    }

    /// The nested components in forward order, excluding the head.
    #[must_use]
    pub fn components(&self) -> &[WtoComponent] {
        &self.components
    }

    /// Every block inside this cycle, head included, in no particular order.
    pub fn member_blocks(&self) -> Vec<BlockId> {
        let mut members = vec![self.head];
        collect_blocks(&self.components, &mut members);
        members
    }
}

/// An ordered weak topological ordering covering every reachable block exactly once.
#[derive(Debug, Clone)]
pub struct WeakTopologicalOrder {
    components: Vec<WtoComponent>,
}

impl WeakTopologicalOrder {
    /// Builds the WTO of `graph` from its designated entry block.
    ///
    /// # Errors
    ///
    /// - [`Error::IrreducibleControlFlow`] if a cycle has an entry besides its head
    /// - [`Error::RecursionLimit`] if the traversal exceeds the default depth bound
    /// - [`Error::MissingBlock`] if the graph's entry does not resolve
    pub fn build(graph: &ProcedureGraph) -> Result<Self> {
        Self::build_with_depth_limit(graph, DEFAULT_DEPTH_LIMIT)
    }

    /// Builds the WTO with an explicit bound on traversal depth.
    ///
    /// # Errors
    ///
    /// As for [`build`](Self::build), with the supplied limit in place of the default.
    pub fn build_with_depth_limit(graph: &ProcedureGraph, depth_limit: usize) -> Result<Self> {
        if graph.is_empty() {
            return Ok(Self {
                components: Vec::new(),
            });
        }
        graph.block(graph.entry())?;

        let mut builder = Builder {
            graph,
            dfn: vec![UNDISCOVERED; graph.block_count()],
            stack: Vec::new(),
            next_dfn: 0,
            depth_limit,
        };

        let mut components = Vec::new();
        builder.visit(graph.entry(), &mut components, 0)?;
        components.reverse();

        let wto = Self { components };
        wto.validate_reducible(graph)?;
        Ok(wto)
    }

    /// The top-level components in forward (entry-to-exit) order.
    #[must_use]
    pub fn components(&self) -> &[WtoComponent] {
        &self.components
    }

    /// Every reachable block, flattened out of the component nesting.
    #[must_use]
    pub fn blocks(&self) -> Vec<BlockId> {
        let mut blocks = Vec::new();
        collect_blocks(&self.components, &mut blocks);
        blocks
    }

    /// The number of cycle components, counting nested cycles.
    ///
    /// For a reducible CFG this equals the number of natural loops.
    #[must_use]
    pub fn cycle_count(&self) -> usize {
        count_cycles(&self.components)
    }

    /// Checks that no cycle is entered from outside at a non-head block.
    fn validate_reducible(&self, graph: &ProcedureGraph) -> Result<()> {
        let mut cycles = Vec::new();
        collect_cycles(&self.components, &mut cycles);

        for cycle in cycles {
            let members: HashSet<BlockId> = cycle.member_blocks().into_iter().collect();
            for &member in &members {
                if member == cycle.head() {
                    continue;
                }
                for &pred in graph.predecessors(member) {
                    if !members.contains(&pred) {
                        return Err(Error::IrreducibleControlFlow { block: member });
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for WeakTopologicalOrder {
    /// Formats the ordering in Bourdoncle's notation, e.g. `b0 (b1 b2) b3`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_components(&self.components, f)
    }
}

fn fmt_components(components: &[WtoComponent], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, component) in components.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        match component {
            WtoComponent::Vertex(block) => write!(f, "{block}")?,
            WtoComponent::Cycle(cycle) => {
                write!(f, "({}", cycle.head)?;
                if !cycle.components.is_empty() {
                    write!(f, " ")?;
                    fmt_components(&cycle.components, f)?;
                }
                write!(f, ")")?;
            }
        }
    }
    Ok(())
}

fn collect_blocks(components: &[WtoComponent], out: &mut Vec<BlockId>) {
    for component in components {
        match component {
            WtoComponent::Vertex(block) => out.push(*block),
            WtoComponent::Cycle(cycle) => {
                out.push(cycle.head);
                collect_blocks(&cycle.components, out);
            }
        }
    }
}

fn collect_cycles<'a>(components: &'a [WtoComponent], out: &mut Vec<&'a WtoCycle>) {
    for component in components {
        if let WtoComponent::Cycle(cycle) = component {
            out.push(cycle);
            collect_cycles(&cycle.components, out);
        }
    }
}

fn count_cycles(components: &[WtoComponent]) -> usize {
    components
        .iter()
        .map(|c| match c {
            WtoComponent::Vertex(_) => 0,
            WtoComponent::Cycle(cycle) => 1 + count_cycles(&cycle.components),
        })
        .sum()
}

/// Transient traversal state for one build.
struct Builder<'g> {
    graph: &'g ProcedureGraph,
    /// Discovery number per block: [`UNDISCOVERED`], a 1-based dfn, or [`SEALED`].
    dfn: Vec<usize>,
    /// Blocks discovered but not yet sealed into a component.
    stack: Vec<BlockId>,
    next_dfn: usize,
    depth_limit: usize,
}

impl Builder<'_> {
    /// Visits `block`, appending sealed components to `partition` in reverse order.
    ///
    /// Returns the minimum dfn reachable from `block`.
    fn visit(
        &mut self,
        block: BlockId,
        partition: &mut Vec<WtoComponent>,
        depth: usize,
    ) -> Result<usize> {
        if depth >= self.depth_limit {
            return Err(Error::RecursionLimit(self.depth_limit));
        }

        self.stack.push(block);
        self.next_dfn += 1;
        self.dfn[block.index()] = self.next_dfn;

        let mut head = self.dfn[block.index()];
        let mut is_loop = false;

        for &(successor, _) in self.graph.successors(block) {
            let min = if self.dfn[successor.index()] == UNDISCOVERED {
                self.visit(successor, partition, depth + 1)?
            } else {
                self.dfn[successor.index()]
            };
            if min <= head {
                head = min;
                is_loop = true;
            }
        }

        if head == self.dfn[block.index()] {
            self.dfn[block.index()] = SEALED;
            let mut element = self.stack.pop().unwrap_or(block);
            if is_loop {
                // Reset everything popped above the head so the cycle body is
                // re-traversed, allowing nested cycles to be discovered.
                while element != block {
                    self.dfn[element.index()] = UNDISCOVERED;
                    element = self.stack.pop().unwrap_or(block);
                }
                let cycle = self.component(block, depth)?;
                partition.push(WtoComponent::Cycle(cycle));
            } else {
                partition.push(WtoComponent::Vertex(block));
            }
        }

        Ok(head)
    }

    /// Seals the cycle headed by `head` by re-visiting its body.
    fn component(&mut self, head: BlockId, depth: usize) -> Result<WtoCycle> {
        let mut nested = Vec::new();
        for &(successor, _) in self.graph.successors(head) {
            if self.dfn[successor.index()] == UNDISCOVERED {
                self.visit(successor, &mut nested, depth + 1)?;
            }
        }
        nested.reverse();
        Ok(WtoCycle {
            head,
            components: nested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::EdgeKind;

    /// Builds a graph with `n` blocks and the given edges.
    fn graph_with_edges(n: usize, edges: &[(usize, usize)]) -> ProcedureGraph {
        let mut graph = ProcedureGraph::new();
        let blocks: Vec<BlockId> = (0..n).map(|_| graph.add_block()).collect();
        for &(from, to) in edges {
            graph.add_edge(blocks[from], blocks[to], EdgeKind::Unconditional);
        }
        graph
    }

    #[test]
    fn test_straight_line_is_all_vertices() {
        let graph = graph_with_edges(3, &[(0, 1), (1, 2)]);
        let wto = WeakTopologicalOrder::build(&graph).unwrap();

        assert_eq!(wto.cycle_count(), 0);
        assert_eq!(
            wto.blocks(),
            vec![BlockId::new(0), BlockId::new(1), BlockId::new(2)]
        );
    }

    #[test]
    fn test_diamond_order_respects_edges() {
        // 0 -> 1, 0 -> 2, 1 -> 3, 2 -> 3
        let graph = graph_with_edges(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let wto = WeakTopologicalOrder::build(&graph).unwrap();

        let blocks = wto.blocks();
        assert_eq!(blocks.len(), 4);
        assert_eq!(wto.cycle_count(), 0);

        let pos = |b: usize| blocks.iter().position(|&x| x.index() == b).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(0) < pos(2));
        assert!(pos(1) < pos(3));
        assert!(pos(2) < pos(3));
    }

    #[test]
    fn test_single_loop_forms_cycle_at_header() {
        // 0 -> 1 (header) -> 2 -> 1, 1 -> 3
        let graph = graph_with_edges(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        let wto = WeakTopologicalOrder::build(&graph).unwrap();

        assert_eq!(wto.cycle_count(), 1);
        let cycle = wto
            .components()
            .iter()
            .find_map(|c| match c {
                WtoComponent::Cycle(cycle) => Some(cycle),
                WtoComponent::Vertex(_) => None,
            })
            .unwrap();
        assert_eq!(cycle.head(), BlockId::new(1));
        assert_eq!(cycle.member_blocks().len(), 2);
    }

    #[test]
    fn test_nested_loops_nest_cycles() {
        // outer: 1 -> 2 -> 4 -> 1; inner: 2 -> 3 -> 2; exit 1 -> 5
        let graph = graph_with_edges(6, &[(0, 1), (1, 2), (2, 3), (3, 2), (2, 4), (4, 1), (1, 5)]);
        let wto = WeakTopologicalOrder::build(&graph).unwrap();

        assert_eq!(wto.cycle_count(), 2);

        let outer = wto
            .components()
            .iter()
            .find_map(|c| match c {
                WtoComponent::Cycle(cycle) => Some(cycle),
                WtoComponent::Vertex(_) => None,
            })
            .unwrap();
        assert_eq!(outer.head(), BlockId::new(1));

        let inner = outer
            .components()
            .iter()
            .find_map(|c| match c {
                WtoComponent::Cycle(cycle) => Some(cycle),
                WtoComponent::Vertex(_) => None,
            })
            .unwrap();
        assert_eq!(inner.head(), BlockId::new(2));
    }

    #[test]
    fn test_self_loop() {
        let graph = graph_with_edges(2, &[(0, 0), (0, 1)]);
        let wto = WeakTopologicalOrder::build(&graph).unwrap();

        assert_eq!(wto.cycle_count(), 1);
        assert_eq!(wto.blocks().len(), 2);
    }

    #[test]
    fn test_every_reachable_block_exactly_once() {
        let graph = graph_with_edges(
            7,
            &[(0, 1), (1, 2), (2, 1), (1, 3), (3, 4), (4, 5), (5, 3), (3, 6)],
        );
        let wto = WeakTopologicalOrder::build(&graph).unwrap();

        let mut blocks = wto.blocks();
        blocks.sort();
        blocks.dedup();
        assert_eq!(blocks.len(), 7);
    }

    #[test]
    fn test_unreachable_blocks_excluded() {
        // Block 2 has no incoming path from entry.
        let graph = graph_with_edges(3, &[(0, 1)]);
        let wto = WeakTopologicalOrder::build(&graph).unwrap();
        assert_eq!(wto.blocks().len(), 2);
    }

    #[test]
    fn test_irreducible_two_entry_loop_rejected() {
        // 0 branches to both 1 and 2; 1 <-> 2 form a loop with two entries.
        let graph = graph_with_edges(3, &[(0, 1), (0, 2), (1, 2), (2, 1)]);
        let result = WeakTopologicalOrder::build(&graph);
        assert!(matches!(
            result,
            Err(Error::IrreducibleControlFlow { .. })
        ));
    }

    #[test]
    fn test_depth_limit_enforced() {
        let graph = graph_with_edges(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        let result = WeakTopologicalOrder::build_with_depth_limit(&graph, 3);
        assert!(matches!(result, Err(Error::RecursionLimit(3))));
    }

    #[test]
    fn test_display_notation() {
        let graph = graph_with_edges(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        let wto = WeakTopologicalOrder::build(&graph).unwrap();
        assert_eq!(wto.to_string(), "b0 (b1 b2) b3");
    }
}
