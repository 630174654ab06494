//! Benchmarks for region identification.
//!
//! Measures [`RegionIdentifier::analyze`] over synthetic control flow graphs
//! of increasing size and shape:
//! - chains of diamonds (acyclic structuring)
//! - nested loops (cyclic structuring)
//! - a mixed function-like graph (both passes plus supergraph contraction)

extern crate cfg_regions;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use cfg_regions::prelude::*;

/// `count` diamonds chained head to tail: 1 + 3 * count blocks.
fn diamond_chain(count: usize) -> (ControlFlowGraph, BlockArena) {
    let mut blocks = BlockArena::new();
    let mut graph = ControlFlowGraph::new();
    let mut addr = 0x1000u64;
    let mut node = |graph: &mut ControlFlowGraph, blocks: &mut BlockArena, addr: &mut u64| {
        let n = graph.add_node(blocks.add(Block::new(*addr)));
        *addr += 4;
        n
    };

    let mut head = node(&mut graph, &mut blocks, &mut addr);
    for _ in 0..count {
        let left = node(&mut graph, &mut blocks, &mut addr);
        let right = node(&mut graph, &mut blocks, &mut addr);
        let join = node(&mut graph, &mut blocks, &mut addr);
        graph.add_edge(head, left, EdgeKind::Flow).unwrap();
        graph.add_edge(head, right, EdgeKind::Flow).unwrap();
        graph.add_edge(left, join, EdgeKind::Flow).unwrap();
        graph.add_edge(right, join, EdgeKind::Flow).unwrap();
        head = join;
    }
    (graph, blocks)
}

/// `depth` loops nested inside each other, each with a body and a latch.
fn nested_loops(depth: usize) -> (ControlFlowGraph, BlockArena) {
    let mut blocks = BlockArena::new();
    let mut graph = ControlFlowGraph::new();
    let mut addr = 0x1000u64;
    let mut node = |graph: &mut ControlFlowGraph, blocks: &mut BlockArena, addr: &mut u64| {
        let n = graph.add_node(blocks.add(Block::new(*addr)));
        *addr += 4;
        n
    };

    let entry = node(&mut graph, &mut blocks, &mut addr);
    let mut outer = entry;
    let mut heads = Vec::new();
    for _ in 0..depth {
        let head = node(&mut graph, &mut blocks, &mut addr);
        graph.add_edge(outer, head, EdgeKind::Flow).unwrap();
        heads.push(head);
        outer = head;
    }
    // innermost latch, then close each level and fall through to an exit
    let mut inner = outer;
    for &head in heads.iter().rev() {
        let latch = node(&mut graph, &mut blocks, &mut addr);
        graph.add_edge(inner, latch, EdgeKind::Flow).unwrap();
        graph.add_edge(latch, head, EdgeKind::Flow).unwrap();
        inner = latch;
    }
    let exit = node(&mut graph, &mut blocks, &mut addr);
    graph.add_edge(inner, exit, EdgeKind::Flow).unwrap();
    (graph, blocks)
}

/// A function-shaped graph: a loop over a diamond, two call sites, a tail.
fn mixed_function() -> (ControlFlowGraph, BlockArena) {
    let mut blocks = BlockArena::new();
    let mut graph = ControlFlowGraph::new();
    let mut addr = 0x1000u64;
    let mut node = |graph: &mut ControlFlowGraph, blocks: &mut BlockArena, addr: &mut u64| {
        let n = graph.add_node(blocks.add(Block::new(*addr)));
        *addr += 4;
        n
    };

    let entry = node(&mut graph, &mut blocks, &mut addr);
    let head = node(&mut graph, &mut blocks, &mut addr);
    let left = node(&mut graph, &mut blocks, &mut addr);
    let right = node(&mut graph, &mut blocks, &mut addr);
    let join = node(&mut graph, &mut blocks, &mut addr);
    let latch = node(&mut graph, &mut blocks, &mut addr);
    let tail = node(&mut graph, &mut blocks, &mut addr);
    let callee_a = node(&mut graph, &mut blocks, &mut addr);
    let callee_b = node(&mut graph, &mut blocks, &mut addr);
    let ret = node(&mut graph, &mut blocks, &mut addr);

    graph.add_edge(entry, head, EdgeKind::Flow).unwrap();
    graph.add_edge(head, left, EdgeKind::Flow).unwrap();
    graph.add_edge(head, right, EdgeKind::Flow).unwrap();
    graph.add_edge(left, callee_a, EdgeKind::Call).unwrap();
    graph.add_edge(left, join, EdgeKind::FakeReturn).unwrap();
    graph.add_edge(right, callee_b, EdgeKind::Call).unwrap();
    graph.add_edge(right, join, EdgeKind::FakeReturn).unwrap();
    graph.add_edge(join, latch, EdgeKind::Flow).unwrap();
    graph.add_edge(latch, head, EdgeKind::Flow).unwrap();
    graph.add_edge(latch, tail, EdgeKind::Flow).unwrap();
    graph.add_edge(tail, ret, EdgeKind::Flow).unwrap();
    (graph, blocks)
}

fn bench_diamond_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("diamond_chain");
    for count in [4usize, 16, 64] {
        let (graph, blocks) = diamond_chain(count);
        group.throughput(Throughput::Elements(graph.node_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let mut blocks = blocks.clone();
                let ri = RegionIdentifier::analyze(
                    black_box(&graph),
                    &mut blocks,
                    RegionIdentifierOptions::default(),
                )
                .unwrap();
                black_box(ri)
            });
        });
    }
    group.finish();
}

fn bench_nested_loops(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_loops");
    for depth in [2usize, 4, 8] {
        let (graph, blocks) = nested_loops(depth);
        group.throughput(Throughput::Elements(graph.node_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let mut blocks = blocks.clone();
                let ri = RegionIdentifier::analyze(
                    black_box(&graph),
                    &mut blocks,
                    RegionIdentifierOptions::default(),
                )
                .unwrap();
                black_box(ri)
            });
        });
    }
    group.finish();
}

fn bench_mixed_function(c: &mut Criterion) {
    let (graph, blocks) = mixed_function();
    c.bench_function("mixed_function", |b| {
        b.iter(|| {
            let mut blocks = blocks.clone();
            let ri = RegionIdentifier::analyze(
                black_box(&graph),
                &mut blocks,
                RegionIdentifierOptions::default(),
            )
            .unwrap();
            black_box(ri)
        });
    });
}

criterion_group!(
    benches,
    bench_diamond_chains,
    bench_nested_loops,
    bench_mixed_function
);
criterion_main!(benches);
