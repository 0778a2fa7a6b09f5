//! Interval analysis integration tests.
//!
//! These tests exercise the complete single-procedure pipeline through the public API:
//! 1. Build a procedure graph with the IR builders
//! 2. Order it with the weak topological ordering
//! 3. Run the fixpoint iterator with the interval interpreter
//! 4. Verify the per-node pre-/postconditions

use std::collections::HashMap;

use absint::prelude::*;

/// Runs the interval fixpoint over `graph` with the given parameter abstractions.
fn run_intervals(graph: &ProcedureGraph, arguments: Vec<Interval>) -> StateMap<Interval> {
    let wto = WeakTopologicalOrder::build(graph).expect("reducible graph");
    let mut states = StateMap::new(graph);
    let entry_state = if arguments.is_empty() {
        Interval::TOP
    } else {
        arguments
            .iter()
            .fold(Interval::BOTTOM, |acc, argument| acc.join(argument))
    };
    states.join_block_entry(graph.entry(), &entry_state);
    let mut interpreter = IntervalInterpreter::new(arguments, OpaqueInvokes);
    let mut fixpoint =
        FixpointIterator::new(FixpointConfig::default()).expect("interval domain widens");
    fixpoint
        .run(graph, &wto, &mut interpreter, &mut states)
        .expect("fixpoint converges");
    states
}

#[test]
fn test_straight_line_arithmetic_is_exact() {
    // return 5 + 3;
    let mut graph = ProcedureGraph::new();
    let b0 = graph.add_block();
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
    let ret = graph.add_node(b0, NodeKind::Return { value: Some(sum) });

    let states = run_intervals(&graph, Vec::new());
    assert_eq!(*states.post(sum), Interval::constant(8));
    assert_eq!(*states.post(ret), Interval::constant(8));
}

#[test]
fn test_branch_narrowing_refines_both_arms() {
    // if (x < 10) { ... } else { ... }
    let mut graph = ProcedureGraph::new();
    let b0 = graph.add_block();
    let b1 = graph.add_block();
    let b2 = graph.add_block();
    let x = graph.add_node(b0, NodeKind::Parameter(0));
    let ten = graph.add_node(b0, NodeKind::Constant(10));
    let cond = graph.add_node(
        b0,
        NodeKind::Compare {
            op: CompareOp::Lt,
            lhs: x,
            rhs: ten,
        },
    );
    graph.add_node(b0, NodeKind::Branch { condition: cond });
    let then_ret = graph.add_node(b1, NodeKind::Return { value: None });
    let else_ret = graph.add_node(b2, NodeKind::Return { value: None });
    graph.add_edge(b0, b1, EdgeKind::ConditionalTrue);
    graph.add_edge(b0, b2, EdgeKind::ConditionalFalse);

    let states = run_intervals(&graph, vec![Interval::TOP]);

    // The true arm knows the upper bound, the false arm the lower bound.
    assert_eq!(*states.pre(then_ret), Interval::at_most(9));
    assert_eq!(*states.pre(else_ret), Interval::at_least(10));
}

#[test]
fn test_branch_narrowing_intersects_known_range() {
    // Same branch, but x is already known to lie in [0, 100].
    let mut graph = ProcedureGraph::new();
    let b0 = graph.add_block();
    let b1 = graph.add_block();
    let b2 = graph.add_block();
    let x = graph.add_node(b0, NodeKind::Parameter(0));
    let ten = graph.add_node(b0, NodeKind::Constant(10));
    let cond = graph.add_node(
        b0,
        NodeKind::Compare {
            op: CompareOp::Lt,
            lhs: x,
            rhs: ten,
        },
    );
    graph.add_node(b0, NodeKind::Branch { condition: cond });
    let then_ret = graph.add_node(b1, NodeKind::Return { value: None });
    let else_ret = graph.add_node(b2, NodeKind::Return { value: None });
    graph.add_edge(b0, b1, EdgeKind::ConditionalTrue);
    graph.add_edge(b0, b2, EdgeKind::ConditionalFalse);

    let states = run_intervals(&graph, vec![Interval::new(0, 100)]);

    assert_eq!(*states.pre(then_ret), Interval::new(0, 9));
    assert_eq!(*states.pre(else_ret), Interval::new(10, 100));
}

/// Builds `i = 0; while (i < limit) { i += 1; } return i;` and returns
/// `(graph, phi, exit_return)`.
fn counting_loop(limit: i64) -> (ProcedureGraph, NodeId, NodeId) {
    let mut graph = ProcedureGraph::new();
    let b0 = graph.add_block();
    let b1 = graph.add_block(); // loop head
    let b2 = graph.add_block(); // loop body
    let b3 = graph.add_block(); // exit

    let zero = graph.add_node(b0, NodeKind::Constant(0));
    // Node ids are sequential; the back-edge operand forward references the increment
    // added as the seventh node below.
    let increment = NodeId::new(6);
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
    let bound = graph.add_node(b1, NodeKind::Constant(limit));
    let cond = graph.add_node(
        b1,
        NodeKind::Compare {
            op: CompareOp::Lt,
            lhs: phi,
            rhs: bound,
        },
    );
    graph.add_node(b1, NodeKind::Branch { condition: cond });
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
    let ret = graph.add_node(b3, NodeKind::Return { value: Some(phi) });

    graph.add_edge(b0, b1, EdgeKind::Unconditional);
    graph.add_edge(b1, b2, EdgeKind::ConditionalTrue);
    graph.add_edge(b1, b3, EdgeKind::ConditionalFalse);
    graph.add_edge(b2, b1, EdgeKind::Unconditional);

    (graph, phi, ret)
}

#[test]
fn test_loop_counter_widens_and_exit_narrows() {
    let (graph, phi, ret) = counting_loop(10);
    let states = run_intervals(&graph, Vec::new());

    // The counter itself widens to an unbounded upper end.
    let counter = states.post(phi);
    assert_eq!(counter.lo(), 0);
    assert_eq!(counter.hi(), i64::MAX);

    // The exit edge still narrows: past the loop, i >= 10 is known.
    assert_eq!(*states.pre(ret), Interval::at_least(10));
}

#[test]
fn test_loop_converges_within_budget() {
    let (graph, _, _) = counting_loop(1_000_000);
    let wto = WeakTopologicalOrder::build(&graph).unwrap();
    assert_eq!(wto.cycle_count(), 1);

    // A tight round budget suffices because widening kicks in after two joins;
    // without widening a million rounds would be needed.
    let config = FixpointConfig {
        widening_threshold: 2,
        max_cycle_rounds: 10,
        max_steps: 1_000,
    };
    let mut states = StateMap::new(&graph);
    let mut interpreter = IntervalInterpreter::new(Vec::new(), OpaqueInvokes);
    let mut fixpoint = FixpointIterator::new(config).unwrap();
    fixpoint
        .run(&graph, &wto, &mut interpreter, &mut states)
        .expect("widening forces convergence");
}

#[test]
fn test_exhausted_round_budget_is_reported() {
    let (graph, _, _) = counting_loop(100);
    let wto = WeakTopologicalOrder::build(&graph).unwrap();

    // With the widening threshold pushed past the round budget, the loop climbs one
    // step per round and must run out.
    let config = FixpointConfig {
        widening_threshold: 1_000,
        max_cycle_rounds: 5,
        max_steps: 1_000_000,
    };
    let mut states = StateMap::new(&graph);
    let mut interpreter = IntervalInterpreter::new(Vec::new(), OpaqueInvokes);
    let mut fixpoint = FixpointIterator::new(config).unwrap();
    let result = fixpoint.run(&graph, &wto, &mut interpreter, &mut states);

    assert!(matches!(
        result,
        Err(Error::CycleBudgetExceeded { rounds: 5, .. })
    ));
}

#[test]
fn test_empty_block_forwards_state() {
    // b0 -> b1 (no nodes) -> b2; the pass-through block must not drop the state.
    let mut graph = ProcedureGraph::new();
    let b0 = graph.add_block();
    let b1 = graph.add_block();
    let b2 = graph.add_block();
    let x = graph.add_node(b0, NodeKind::Parameter(0));
    let ret = graph.add_node(b2, NodeKind::Return { value: Some(x) });
    graph.add_edge(b0, b1, EdgeKind::Unconditional);
    graph.add_edge(b1, b2, EdgeKind::Unconditional);

    let states = run_intervals(&graph, vec![Interval::new(5, 9)]);
    assert_eq!(*states.pre(ret), Interval::new(5, 9));
    assert_eq!(*states.post(ret), Interval::new(5, 9));
}

/// Delegating interpreter asserting that postconditions only move up the lattice.
struct MonotonicityRecorder<I> {
    inner: I,
    seen: HashMap<NodeId, Interval>,
}

impl<I: NodeInterpreter<Domain = Interval>> NodeInterpreter for MonotonicityRecorder<I> {
    type Domain = Interval;

    fn transfer_node(
        &mut self,
        graph: &ProcedureGraph,
        node: NodeId,
        states: &mut StateMap<Interval>,
    ) -> Result<()> {
        self.inner.transfer_node(graph, node, states)?;
        let current = *states.post(node);
        if let Some(previous) = self.seen.insert(node, current) {
            assert!(
                previous.le(&current),
                "post of {node} regressed from {previous:?} to {current:?}"
            );
        }
        Ok(())
    }

    fn transfer_edge(
        &mut self,
        graph: &ProcedureGraph,
        edge: &BlockEdge,
        states: &mut StateMap<Interval>,
    ) -> Result<()> {
        self.inner.transfer_edge(graph, edge, states)
    }

    fn flow_after(
        &self,
        graph: &ProcedureGraph,
        node: NodeId,
        states: &StateMap<Interval>,
    ) -> Result<Interval> {
        self.inner.flow_after(graph, node, states)
    }
}

#[test]
fn test_convergence_is_monotone_across_rounds() {
    let (graph, _, _) = counting_loop(10);
    let wto = WeakTopologicalOrder::build(&graph).unwrap();

    let mut states = StateMap::new(&graph);
    let mut interpreter = MonotonicityRecorder {
        inner: IntervalInterpreter::new(Vec::new(), OpaqueInvokes),
        seen: HashMap::new(),
    };
    let mut fixpoint = FixpointIterator::new(FixpointConfig::default()).unwrap();
    fixpoint
        .run(&graph, &wto, &mut interpreter, &mut states)
        .unwrap();

    // Every node of the loop was revisited at least once.
    assert!(interpreter.seen.len() >= 7);
}

#[test]
fn test_irreducible_graph_is_rejected_before_iteration() {
    let mut graph = ProcedureGraph::new();
    let b0 = graph.add_block();
    let b1 = graph.add_block();
    let b2 = graph.add_block();
    for block in [b0, b1, b2] {
        graph.add_node(block, NodeKind::FrameState);
    }
    // Two entries into the 1 <-> 2 loop.
    graph.add_edge(b0, b1, EdgeKind::ConditionalTrue);
    graph.add_edge(b0, b2, EdgeKind::ConditionalFalse);
    graph.add_edge(b1, b2, EdgeKind::Unconditional);
    graph.add_edge(b2, b1, EdgeKind::Unconditional);

    assert!(matches!(
        WeakTopologicalOrder::build(&graph),
        Err(Error::IrreducibleControlFlow { .. })
    ));
}
