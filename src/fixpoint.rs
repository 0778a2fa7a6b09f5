//! Fixpoint iteration over a weak topological ordering.
//!
//! The iterator processes the components of a [`WeakTopologicalOrder`] strictly in
//! order. A vertex component is interpreted exactly once: its block's nodes in program
//! order, then its outgoing edges. A cycle component is iterated in rounds - head, then
//! nested components - until the head block's states stop changing; early rounds merge
//! with plain joins for precision, and once the round count passes the widening
//! threshold the head's states are widened against the pre-round snapshot so
//! infinite-height domains converge.
//!
//! # Budgets
//!
//! Two budgets bound the iteration: a per-cycle round limit
//! ([`Error::CycleBudgetExceeded`]) and a global step budget counting scheduled node
//! interpretations ([`Error::StepBudgetExceeded`]). Exhausting either is a reportable
//! per-procedure failure, never a hang.

use std::marker::PhantomData;

use crate::domain::AbstractDomain;
use crate::interp::NodeInterpreter;
use crate::ir::{BlockId, ProcedureGraph};
use crate::state::StateMap;
use crate::wto::{WeakTopologicalOrder, WtoComponent, WtoCycle};
use crate::{Error, Result};

/// Tuning knobs for one fixpoint run.
#[derive(Debug, Clone, Copy)]
pub struct FixpointConfig {
    /// Rounds of plain joins before a cycle head starts widening. The default of 2
    /// lets bounded loops settle exactly before precision is given up.
    pub widening_threshold: usize,
    /// Maximum rounds per cycle before the run fails with
    /// [`Error::CycleBudgetExceeded`].
    pub max_cycle_rounds: usize,
    /// Global budget of node interpretations across the whole run; exceeding it fails
    /// the run with [`Error::StepBudgetExceeded`].
    pub max_steps: usize,
}

impl Default for FixpointConfig {
    fn default() -> Self {
        Self {
            widening_threshold: 2,
            max_cycle_rounds: 100,
            max_steps: 1_000_000,
        }
    }
}

/// Drives one procedure's states to a fixpoint over its weak topological ordering.
///
/// The iterator is generic over the domain only for its construction-time termination
/// check; the interpreter supplied to [`run`](Self::run) fixes the transfer rules.
#[derive(Debug)]
pub struct FixpointIterator<D> {
    config: FixpointConfig,
    steps: usize,
    _domain: PhantomData<D>,
}

impl<D: AbstractDomain> FixpointIterator<D> {
    /// Creates an iterator after checking the domain's termination contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DomainContract`] if the domain has unbounded ascending chains
    /// but supplies no widening operator; such a configuration could iterate forever
    /// and is rejected before any work starts.
    pub fn new(config: FixpointConfig) -> Result<Self> {
        if !D::FINITE_HEIGHT && !D::HAS_WIDENING {
            return Err(Error::DomainContract(
                "domain has unbounded ascending chains but no widening operator",
            ));
        }
        Ok(Self {
            config,
            steps: 0,
            _domain: PhantomData,
        })
    }

    /// The number of node interpretations performed so far.
    #[must_use]
    pub const fn steps(&self) -> usize {
        self.steps
    }

    /// Runs `interpreter` over `graph` in the order given by `wto` until every state
    /// stabilizes.
    ///
    /// `states` must have been created for `graph`; on success it holds the completed
    /// pre-/postconditions for every reachable node.
    ///
    /// # Errors
    ///
    /// - [`Error::CycleBudgetExceeded`] if a cycle fails to stabilize within the round
    ///   budget
    /// - [`Error::StepBudgetExceeded`] if the global step budget runs out
    /// - Any error surfaced by the interpreter's transfer rules
    pub fn run<I>(
        &mut self,
        graph: &ProcedureGraph,
        wto: &WeakTopologicalOrder,
        interpreter: &mut I,
        states: &mut StateMap<D>,
    ) -> Result<()>
    where
        I: NodeInterpreter<Domain = D>,
    {
        for component in wto.components() {
            self.component(graph, component, interpreter, states)?;
        }
        Ok(())
    }

    fn component<I>(
        &mut self,
        graph: &ProcedureGraph,
        component: &WtoComponent,
        interpreter: &mut I,
        states: &mut StateMap<D>,
    ) -> Result<()>
    where
        I: NodeInterpreter<Domain = D>,
    {
        match component {
            WtoComponent::Vertex(block) => self.block(graph, *block, interpreter, states),
            WtoComponent::Cycle(cycle) => self.cycle(graph, cycle, interpreter, states),
        }
    }

    /// Interprets one block: its nodes in program order, then its outgoing edges.
    fn block<I>(
        &mut self,
        graph: &ProcedureGraph,
        block: BlockId,
        interpreter: &mut I,
        states: &mut StateMap<D>,
    ) -> Result<()>
    where
        I: NodeInterpreter<Domain = D>,
    {
        let nodes = graph.block(block)?.nodes().to_vec();
        let mut previous = None;
        for node in nodes {
            // The first node picks up the block's merged entry state; later nodes
            // thread the flow from their predecessor in program order.
            let flow = match previous {
                Some(previous) => interpreter.flow_after(graph, previous, states)?,
                None => states.block_entry(block).clone(),
            };
            states.join_pre(node, &flow);
            self.steps += 1;
            if self.steps > self.config.max_steps {
                return Err(Error::StepBudgetExceeded { steps: self.steps });
            }
            interpreter.transfer_node(graph, node, states)?;
            previous = Some(node);
        }
        for edge in graph.outgoing_edges(block).collect::<Vec<_>>() {
            interpreter.transfer_edge(graph, &edge, states)?;
        }
        Ok(())
    }

    /// Iterates one cycle to stabilization.
    ///
    /// Each round interprets the head and then the nested components in order; back
    /// edges re-join the head's precondition as the member blocks' edges are
    /// interpreted. The round ends by comparing the head block's states against the
    /// snapshot taken at round start: unchanged means the cycle stabilized.
    fn cycle<I>(
        &mut self,
        graph: &ProcedureGraph,
        cycle: &WtoCycle,
        interpreter: &mut I,
        states: &mut StateMap<D>,
    ) -> Result<()>
    where
        I: NodeInterpreter<Domain = D>,
    {
        let head = cycle.head();
        let members = cycle.member_blocks();
        let mut rounds = 0;

        loop {
            let snapshot = states.snapshot(head, graph.block(head)?);

            self.block(graph, head, interpreter, states)?;
            for component in cycle.components() {
                self.component(graph, component, interpreter, states)?;
            }

            rounds += 1;
            if !states.differs_from(head, graph.block(head)?, &snapshot) {
                log::debug!("cycle at {head} stabilized after {rounds} round(s)");
                return Ok(());
            }
            if rounds >= self.config.max_cycle_rounds {
                return Err(Error::CycleBudgetExceeded { head, rounds });
            }
            if rounds > self.config.widening_threshold {
                states.widen_from(head, graph.block(head)?, &snapshot);
            }

            // Re-interpret the whole cycle body next round.
            for &member in &members {
                states.clear_visited(graph.block(member)?);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Interval;
    use crate::interp::IntervalInterpreter;
    use crate::interproc::OpaqueInvokes;
    use crate::ir::{BinaryOp, EdgeKind, NodeKind, PhiOperand};

    #[test]
    fn test_rejects_domain_without_widening() {
        #[derive(Debug, Clone, PartialEq)]
        struct Unbounded(u64);
        impl AbstractDomain for Unbounded {
            const FINITE_HEIGHT: bool = false;
            const HAS_WIDENING: bool = false;
            fn bottom() -> Self {
                Unbounded(0)
            }
            fn top() -> Self {
                Unbounded(u64::MAX)
            }
            fn join(&self, other: &Self) -> Self {
                Unbounded(self.0.max(other.0))
            }
            fn meet(&self, other: &Self) -> Self {
                Unbounded(self.0.min(other.0))
            }
        }

        let result = FixpointIterator::<Unbounded>::new(FixpointConfig::default());
        assert!(matches!(result, Err(Error::DomainContract(_))));
    }

    #[test]
    fn test_straight_line_exact() {
        // b0: 5 + 3; b1: return the sum.
        let mut graph = ProcedureGraph::new();
        let b0 = graph.add_block();
        let b1 = graph.add_block();
        let five = graph.add_node(b0, NodeKind::Constant(5));
        let three = graph.add_node(b0, NodeKind::Constant(3));
        let sum = graph.add_node(
            b0,
            NodeKind::Binary {
                op: BinaryOp::Add,
                lhs: five,
                rhs: three,
            },
        );
        let ret = graph.add_node(b1, NodeKind::Return { value: Some(sum) });
        graph.add_edge(b0, b1, EdgeKind::Unconditional);

        let wto = crate::wto::WeakTopologicalOrder::build(&graph).unwrap();
        let mut states = StateMap::new(&graph);
        let mut interp = IntervalInterpreter::new(Vec::new(), OpaqueInvokes);
        let mut fixpoint = FixpointIterator::new(FixpointConfig::default()).unwrap();
        fixpoint.run(&graph, &wto, &mut interp, &mut states).unwrap();

        assert_eq!(*states.post(ret), Interval::constant(8));
        assert_eq!(fixpoint.steps(), 4);
    }

    #[test]
    fn test_global_step_budget_is_enforced() {
        // Four nodes but only two interpretations allowed; the failure reports the
        // step count, not a cycle.
        let mut graph = ProcedureGraph::new();
        let b0 = graph.add_block();
        let five = graph.add_node(b0, NodeKind::Constant(5));
        let three = graph.add_node(b0, NodeKind::Constant(3));
        graph.add_node(
            b0,
            NodeKind::Binary {
                op: BinaryOp::Add,
                lhs: five,
                rhs: three,
            },
        );
        graph.add_node(b0, NodeKind::Return { value: None });

        let config = FixpointConfig {
            max_steps: 2,
            ..FixpointConfig::default()
        };
        let wto = crate::wto::WeakTopologicalOrder::build(&graph).unwrap();
        let mut states = StateMap::new(&graph);
        let mut interp = IntervalInterpreter::new(Vec::new(), OpaqueInvokes);
        let mut fixpoint = FixpointIterator::new(config).unwrap();
        let result = fixpoint.run(&graph, &wto, &mut interp, &mut states);

        assert!(matches!(result, Err(Error::StepBudgetExceeded { steps: 3 })));
    }

    #[test]
    fn test_loop_counter_widens_to_unbounded() {
        // i = 0; loop { i += 1 }  - the phi at the head must widen to [0, +inf]
        // within the budget instead of climbing one step per round.
        let mut graph = ProcedureGraph::new();
        let b0 = graph.add_block();
        let b1 = graph.add_block();
        let b2 = graph.add_block();
        let zero = graph.add_node(b0, NodeKind::Constant(0));
        // Node ids are assigned sequentially, so the back-edge operand can forward
        // reference the increment added below.
        let increment = crate::ir::NodeId::new(3);
        let phi = graph.add_node(
            b1,
            NodeKind::Phi {
                operands: vec![
                    PhiOperand {
                        block: b0,
                        value: zero,
                    },
                    PhiOperand {
                        block: b2,
                        value: increment,
                    },
                ],
            },
        );
        let one = graph.add_node(b2, NodeKind::Constant(1));
        let next = graph.add_node(
            b2,
            NodeKind::Binary {
                op: BinaryOp::Add,
                lhs: phi,
                rhs: one,
            },
        );
        assert_eq!(next, increment);
        graph.add_edge(b0, b1, EdgeKind::Unconditional);
        graph.add_edge(b1, b2, EdgeKind::Unconditional);
        graph.add_edge(b2, b1, EdgeKind::Unconditional);

        let wto = crate::wto::WeakTopologicalOrder::build(&graph).unwrap();
        assert_eq!(wto.cycle_count(), 1);

        let mut states = StateMap::new(&graph);
        let mut interp = IntervalInterpreter::new(Vec::new(), OpaqueInvokes);
        let mut fixpoint = FixpointIterator::new(FixpointConfig::default()).unwrap();
        fixpoint.run(&graph, &wto, &mut interp, &mut states).unwrap();

        let counter = states.post(phi);
        assert_eq!(counter.lo(), 0);
        assert_eq!(counter.hi(), i64::MAX);
    }
}
