//! Interval value analysis.
//!
//! The reference analysis: every value-producing node is abstracted by an
//! [`Interval`], branch edges narrow the flowing state with the comparison the branch
//! tests, and invokes delegate to the configured handler.
//!
//! # Narrowing Policy
//!
//! A comparison refines only the statically *unbounded* operand using the bounded one:
//! for `x < 10` the constant side `[10, 10]` is bounded, so the true edge carries the
//! constraint `[-inf, 9]` and the false edge `[10, +inf]` (the negated operator). When
//! neither side is bounded no constraint is extracted and the edge flows unrefined.

use crate::domain::{AbstractDomain, Interval};
use crate::interp::NodeInterpreter;
use crate::interproc::{Analysis, InvokeHandler};
use crate::ir::{BinaryOp, BlockEdge, CompareOp, EdgeKind, NodeId, NodeKind, ProcedureGraph};
use crate::state::StateMap;
use crate::Result;

/// Interprets one procedure over the [`Interval`] domain.
///
/// Holds the actual-argument abstractions bound to `Parameter` nodes and the invoke
/// handler for call sites. One instance serves exactly one procedure run.
#[derive(Debug)]
pub struct IntervalInterpreter<H> {
    arguments: Vec<Interval>,
    invokes: H,
}

impl<H: InvokeHandler<Interval>> IntervalInterpreter<H> {
    /// Creates an interpreter binding `arguments` to the procedure's parameters.
    ///
    /// Parameters beyond the supplied arguments abstract to top.
    pub fn new(arguments: Vec<Interval>, invokes: H) -> Self {
        Self { arguments, invokes }
    }

    /// Interprets `node` if it has not been visited this round.
    ///
    /// Operands are interpreted first, on demand; the walk follows the acyclic data
    /// dependencies of the procedure. Phi operands are exempt - a back-edge operand not
    /// yet visited contributes bottom and is picked up on the next cycle round.
    fn interpret(
        &mut self,
        graph: &ProcedureGraph,
        node: NodeId,
        states: &mut StateMap<Interval>,
    ) -> Result<()> {
        if states.is_visited(node) {
            return Ok(());
        }
        states.mark_visited(node);

        let computed = match graph.node_kind(node)?.clone() {
            NodeKind::Constant(value) => Interval::constant(value),
            NodeKind::Parameter(index) => self
                .arguments
                .get(index as usize)
                .copied()
                .unwrap_or(Interval::TOP),
            NodeKind::Binary { op, lhs, rhs } => {
                self.interpret(graph, lhs, states)?;
                self.interpret(graph, rhs, states)?;
                let left = *states.post(lhs);
                let right = *states.post(rhs);
                match op {
                    BinaryOp::Add => left.add(&right),
                    BinaryOp::Sub => left.sub(&right),
                    BinaryOp::Mul => left.mul(&right),
                }
            }
            NodeKind::Compare { op, lhs, rhs } => {
                self.interpret(graph, lhs, states)?;
                self.interpret(graph, rhs, states)?;
                refinement(op, states.post(lhs), states.post(rhs))
            }
            NodeKind::Phi { operands } => operands
                .iter()
                .fold(Interval::BOTTOM, |acc, operand| {
                    acc.join(states.post(operand.value))
                }),
            NodeKind::FrameState | NodeKind::LoopBegin | NodeKind::Branch { .. } => {
                *states.pre(node)
            }
            NodeKind::Invoke { callee, arguments } => {
                let mut actuals = Vec::with_capacity(arguments.len());
                for &argument in &arguments {
                    self.interpret(graph, argument, states)?;
                    actuals.push(*states.post(argument));
                }
                self.invokes.invoke(callee, &actuals)?
            }
            NodeKind::Return { value } => match value {
                Some(value) => {
                    self.interpret(graph, value, states)?;
                    *states.post(value)
                }
                None => *states.pre(node),
            },
            NodeKind::Opaque => {
                log::warn!("no interval transfer rule for opaque node {node}, treating as unknown");
                states.pre(node).join(states.post(node))
            }
        };

        // Monotone update: the stored postcondition only moves up the lattice.
        let updated = states.post(node).join(&computed);
        states.set_post(node, updated);
        Ok(())
    }
}

impl<H: InvokeHandler<Interval>> NodeInterpreter for IntervalInterpreter<H> {
    type Domain = Interval;

    fn transfer_node(
        &mut self,
        graph: &ProcedureGraph,
        node: NodeId,
        states: &mut StateMap<Interval>,
    ) -> Result<()> {
        self.interpret(graph, node, states)
    }

    fn transfer_edge(
        &mut self,
        graph: &ProcedureGraph,
        edge: &BlockEdge,
        states: &mut StateMap<Interval>,
    ) -> Result<()> {
        // A source block without nodes forwards its merged entry state unchanged.
        let source = graph.block(edge.source)?;
        let flow = match source.terminator_node() {
            Some(terminator) => self.flow_after(graph, terminator, states)?,
            None => *states.block_entry(edge.source),
        };

        let narrowed = match (edge.kind, source.terminator_node()) {
            (EdgeKind::ConditionalTrue | EdgeKind::ConditionalFalse, Some(terminator)) => {
                if let NodeKind::Branch { condition } = *graph.node_kind(terminator)? {
                    self.interpret(graph, condition, states)?;
                    let negated = edge.kind == EdgeKind::ConditionalFalse;
                    flow.meet(&condition_refinement(graph, condition, negated, states)?)
                } else {
                    flow
                }
            }
            _ => flow,
        };

        states.join_block_entry(edge.destination, &narrowed);
        Ok(())
    }
}

/// The constraint a comparison implies for its unbounded operand.
///
/// Yields top when neither operand is statically bounded.
fn refinement(op: CompareOp, lhs: &Interval, rhs: &Interval) -> Interval {
    if rhs.is_bounded() {
        Interval::constraint(op, rhs)
    } else if lhs.is_bounded() {
        // The bounded side is on the left; swap so the constraint applies rightward.
        Interval::constraint(op.swap(), lhs)
    } else {
        Interval::TOP
    }
}

/// The refinement carried by one arm of a conditional branch.
fn condition_refinement(
    graph: &ProcedureGraph,
    condition: NodeId,
    negated: bool,
    states: &StateMap<Interval>,
) -> Result<Interval> {
    match graph.node_kind(condition)? {
        NodeKind::Compare { op, lhs, rhs } => {
            let op = if negated { op.negate() } else { *op };
            Ok(refinement(op, states.post(*lhs), states.post(*rhs)))
        }
        // A branch on anything but a comparison carries no interval information.
        _ => Ok(Interval::TOP),
    }
}

/// The interval analysis, pluggable into the interprocedural driver.
///
/// The entry state is the join of the actual-argument intervals (top for a root with no
/// known call site), so comparison narrowing against a single tracked parameter is
/// observable in the destination preconditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalAnalysis;

impl Analysis for IntervalAnalysis {
    type Domain = Interval;
    type Interp<'h>
        = IntervalInterpreter<&'h mut dyn InvokeHandler<Interval>>
    where
        Self: 'h;

    fn interpreter<'h>(
        &'h self,
        arguments: Vec<Interval>,
        invokes: &'h mut dyn InvokeHandler<Interval>,
    ) -> Self::Interp<'h> {
        IntervalInterpreter::new(arguments, invokes)
    }

    fn entry_state(&self, _graph: &ProcedureGraph, arguments: &[Interval]) -> Interval {
        if arguments.is_empty() {
            Interval::TOP
        } else {
            arguments
                .iter()
                .fold(Interval::BOTTOM, |acc, argument| acc.join(argument))
        }
    }
}
