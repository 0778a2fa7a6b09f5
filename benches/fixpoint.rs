//! Benchmarks for weak topological ordering construction and fixpoint iteration.
//!
//! Measures the two hot paths of a single-procedure run:
//! - Ordering a deeply nested loop CFG
//! - Iterating a counting loop to a widened fixpoint

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use absint::prelude::*;

/// Builds a chain of `depth` nested counting loops sharing one exit.
fn nested_loops(depth: usize) -> ProcedureGraph {
    let mut graph = ProcedureGraph::new();
    let entry = graph.add_block();
    graph.add_node(entry, NodeKind::Constant(0));

    let mut previous = entry;
    let mut heads = Vec::with_capacity(depth);
    for _ in 0..depth {
        let head = graph.add_block();
        graph.add_node(head, NodeKind::LoopBegin);
        graph.add_edge(previous, head, EdgeKind::Unconditional);
        heads.push(head);
        previous = head;
    }
    // Close the loops innermost-first so each head is re-entered from below.
    let mut below = previous;
    for &head in heads.iter().rev() {
        let latch = graph.add_block();
        graph.add_node(latch, NodeKind::FrameState);
        graph.add_edge(below, latch, EdgeKind::Unconditional);
        graph.add_edge(latch, head, EdgeKind::Unconditional);
        below = latch;
    }
    let exit = graph.add_block();
    graph.add_node(exit, NodeKind::Return { value: None });
    graph.add_edge(below, exit, EdgeKind::Unconditional);
    graph
}

/// Builds `i = 0; while (i < limit) { i += 1; } return i;`.
fn counting_loop(limit: i64) -> ProcedureGraph {
    let mut graph = ProcedureGraph::new();
    let b0 = graph.add_block();
    let b1 = graph.add_block();
    let b2 = graph.add_block();
    let b3 = graph.add_block();

    let zero = graph.add_node(b0, NodeKind::Constant(0));
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
    graph.add_node(
        b2,
        NodeKind::Binary {
            op: BinaryOp::Add,
            lhs: phi,
            rhs: one,
        },
    );
    graph.add_node(b3, NodeKind::Return { value: Some(phi) });

    graph.add_edge(b0, b1, EdgeKind::Unconditional);
    graph.add_edge(b1, b2, EdgeKind::ConditionalTrue);
    graph.add_edge(b1, b3, EdgeKind::ConditionalFalse);
    graph.add_edge(b2, b1, EdgeKind::Unconditional);
    graph
}

fn bench_wto_construction(c: &mut Criterion) {
    let graph = nested_loops(64);
    let mut group = c.benchmark_group("wto");
    group.throughput(Throughput::Elements(graph.block_count() as u64));
    group.bench_function("nested_loops_64", |b| {
        b.iter(|| WeakTopologicalOrder::build(black_box(&graph)).unwrap());
    });
    group.finish();
}

fn bench_interval_fixpoint(c: &mut Criterion) {
    let graph = counting_loop(1_000_000);
    let wto = WeakTopologicalOrder::build(&graph).unwrap();

    c.bench_function("interval_counting_loop", |b| {
        b.iter(|| {
            let mut states = StateMap::new(black_box(&graph));
            let mut interpreter = IntervalInterpreter::new(Vec::new(), OpaqueInvokes);
            let mut fixpoint = FixpointIterator::new(FixpointConfig::default()).unwrap();
            fixpoint
                .run(&graph, &wto, &mut interpreter, &mut states)
                .unwrap();
            black_box(states)
        });
    });
}

criterion_group!(benches, bench_wto_construction, bench_interval_fixpoint);
criterion_main!(benches);
