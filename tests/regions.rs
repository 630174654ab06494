//! Region identification integration tests.
//!
//! These tests drive [`RegionIdentifier::analyze`] over small hand-built
//! control flow graphs and verify the shape of the resulting region tree:
//! which blocks end up grouped together, which head each region reports, and
//! that the analysis is deterministic.

use std::collections::HashSet;

use cfg_regions::prelude::*;

/// Builds a control flow graph from `(src, dst)` address pairs. One block is
/// allocated per distinct address, in the order addresses first appear.
fn graph_from_edges(edges: &[(u64, u64)]) -> (ControlFlowGraph, BlockArena) {
    let mut blocks = BlockArena::new();
    let mut graph = ControlFlowGraph::new();
    let mut nodes: Vec<(u64, NodeId)> = Vec::new();
    let mut node_of = |addr: u64,
                       graph: &mut ControlFlowGraph,
                       blocks: &mut BlockArena,
                       nodes: &mut Vec<(u64, NodeId)>| {
        if let Some(&(_, node)) = nodes.iter().find(|&&(a, _)| a == addr) {
            return node;
        }
        let node = graph.add_node(blocks.add(Block::new(addr)));
        nodes.push((addr, node));
        node
    };
    for &(src, dst) in edges {
        let src = node_of(src, &mut graph, &mut blocks, &mut nodes);
        let dst = node_of(dst, &mut graph, &mut blocks, &mut nodes);
        graph.add_edge(src, dst, EdgeKind::Flow).unwrap();
    }
    for node in graph.node_ids().collect::<Vec<_>>() {
        if let Some(&block) = graph.node(node) {
            let entry = graph.in_degree(node) == 0;
            let exit = graph.out_degree(node) == 0;
            blocks.block_mut(block).set_flag(BlockFlags::ENTRYPOINT, entry);
            blocks.block_mut(block).set_flag(BlockFlags::EXITPOINT, exit);
        }
    }
    (graph, blocks)
}

fn analyze(edges: &[(u64, u64)]) -> (RegionIdentifier, BlockArena) {
    let (graph, mut blocks) = graph_from_edges(edges);
    let ri = RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default())
        .expect("analysis failed");
    (ri, blocks)
}

fn addr_sets(ri: &RegionIdentifier) -> Vec<HashSet<u64>> {
    ri.regions_by_block_addrs()
        .iter()
        .map(|group| group.iter().copied().collect())
        .collect()
}

#[test]
fn double_diamond() {
    let (ri, blocks) = analyze(&[
        (1, 2),
        (1, 3),
        (2, 4),
        (3, 4),
        (4, 5),
        (4, 6),
        (5, 7),
        (6, 7),
    ]);

    // the root's head chases down to the entry block
    assert_eq!(ri.head_block(ri.root(), &blocks).addr(), 1);

    // both diamonds and the tail become regions of their own
    let sets = addr_sets(&ri);
    assert!(sets.contains(&HashSet::from([1, 2, 3])), "{sets:?}");
    assert!(sets.contains(&HashSet::from([4, 5, 6])), "{sets:?}");
    assert!(sets.contains(&HashSet::from([1, 7])), "{sets:?}");

    // every input block is reachable from the root
    let leaves: HashSet<u64> = ri.block_addrs(ri.root(), &blocks).into_iter().collect();
    assert_eq!(leaves, (1..=7).collect::<HashSet<u64>>());
}

#[test]
fn graph_builder_marks_entry_and_exit() {
    let (graph, blocks) = graph_from_edges(&[(1, 2), (2, 3)]);
    let entry = graph.node_ids().next().unwrap();
    assert!(blocks.block(*graph.node(entry).unwrap()).is_entrypoint());
    let exits = graph
        .node_ids()
        .filter(|&n| blocks.block(*graph.node(n).unwrap()).is_exitpoint())
        .count();
    assert_eq!(exits, 1);
}

#[test]
fn single_block() {
    let mut blocks = BlockArena::new();
    let mut graph = ControlFlowGraph::new();
    graph.add_node(blocks.add(Block::new(0x4000)));

    let ri = RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default())
        .expect("analysis failed");
    assert_eq!(ri.head_block(ri.root(), &blocks).addr(), 0x4000);
    assert_eq!(ri.block_addrs(ri.root(), &blocks), vec![0x4000]);
}

#[test]
fn while_loop() {
    // 1 -> 2 <-> 3, 3 -> 4
    let (ri, blocks) = analyze(&[(1, 2), (2, 3), (3, 2), (3, 4)]);

    let cyclic: Vec<RegionId> = ri
        .regions()
        .iter()
        .filter(|(_, region)| region.is_cyclic())
        .map(|(id, _)| id)
        .collect();
    assert_eq!(cyclic.len(), 1);
    assert_eq!(ri.head_block(cyclic[0], &blocks).addr(), 2);

    let mut body = ri.block_addrs(cyclic[0], &blocks);
    body.sort_unstable();
    assert_eq!(body, vec![2, 3]);
}

#[test]
fn nested_loops() {
    // outer loop 2..5 around inner loop 3..4
    let (ri, blocks) = analyze(&[(1, 2), (2, 3), (3, 4), (4, 3), (4, 5), (5, 2), (5, 6)]);

    let mut loop_bodies: Vec<Vec<u64>> = ri
        .regions()
        .iter()
        .filter(|(_, region)| region.is_cyclic())
        .map(|(id, _)| {
            let mut addrs = ri.block_addrs(id, &blocks);
            addrs.sort_unstable();
            addrs
        })
        .collect();
    loop_bodies.sort_by_key(Vec::len);

    assert_eq!(loop_bodies.len(), 2);
    assert_eq!(loop_bodies[0], vec![3, 4]);
    assert_eq!(loop_bodies[1], vec![2, 3, 4, 5]);
}

#[test]
fn self_loop() {
    let (ri, blocks) = analyze(&[(1, 2), (2, 2), (2, 3)]);

    let cyclic: Vec<RegionId> = ri
        .regions()
        .iter()
        .filter(|(_, region)| region.is_cyclic())
        .map(|(id, _)| id)
        .collect();
    assert_eq!(cyclic.len(), 1);
    assert_eq!(ri.block_addrs(cyclic[0], &blocks), vec![2]);
}

#[test]
fn loop_region_records_its_exit() {
    let (ri, _blocks) = analyze(&[(1, 2), (2, 3), (3, 2), (3, 4)]);

    let (_, region) = ri
        .regions()
        .iter()
        .find(|(_, region)| region.is_cyclic())
        .expect("no loop region");
    assert_eq!(region.successors().len(), 1);
}

#[test]
fn two_entry_cycle_is_still_structured() {
    // both 2 and 3 are entered from outside the cycle
    let (ri, blocks) = analyze(&[(1, 2), (1, 3), (2, 3), (3, 2), (2, 4), (3, 4), (4, 5)]);

    let leaves: HashSet<u64> = ri.block_addrs(ri.root(), &blocks).into_iter().collect();
    assert_eq!(leaves, (1..=5).collect::<HashSet<u64>>());
}

#[test]
fn call_targets_are_dropped() {
    // 1 calls 0x100 and resumes at 2
    let mut blocks = BlockArena::new();
    let mut graph = ControlFlowGraph::new();
    let caller = graph.add_node(blocks.add(Block::new(1)));
    let callee = graph.add_node(blocks.add(Block::new(0x100)));
    let resume = graph.add_node(blocks.add(Block::new(2)));
    graph.add_edge(caller, callee, EdgeKind::Call).unwrap();
    graph.add_edge(caller, resume, EdgeKind::FakeReturn).unwrap();

    let ri = RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default())
        .expect("analysis failed");
    let leaves: HashSet<u64> = ri.block_addrs(ri.root(), &blocks).into_iter().collect();
    assert!(!leaves.contains(&0x100), "{leaves:?}");
}

#[test]
fn fake_return_pairs_are_merged() {
    // the 1 -> 2 fake_return contracts, so the head block covers both
    let mut blocks = BlockArena::new();
    let mut graph = ControlFlowGraph::new();
    let first = graph.add_node(blocks.add(Block::new(1)));
    let mut continuation = Block::new(2);
    continuation.push_statement(Statement::new(2, "nop", &[]));
    let second = graph.add_node(blocks.add(continuation));
    let third = graph.add_node(blocks.add(Block::new(3)));
    graph.add_edge(first, second, EdgeKind::FakeReturn).unwrap();
    graph.add_edge(second, third, EdgeKind::Flow).unwrap();

    let ri = RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default())
        .expect("analysis failed");
    let head = ri.head_block(ri.root(), &blocks);
    assert_eq!(head.addr(), 1);
    assert!(head.is_merged());
    assert!(head.contains_addr(2));
}

#[test]
fn empty_graph_is_an_error() {
    let mut blocks = BlockArena::new();
    let graph = ControlFlowGraph::new();
    assert!(matches!(
        RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default()),
        Err(Error::EmptyGraph)
    ));
}

#[test]
fn bare_cycle_needs_a_function_addr() {
    let (graph, mut blocks) = graph_from_edges(&[(1, 2), (2, 1)]);
    assert!(matches!(
        RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default()),
        Err(Error::NoStartNode)
    ));

    let (graph, mut blocks) = graph_from_edges(&[(1, 2), (2, 1)]);
    let options = RegionIdentifierOptions {
        function_addr: Some(1),
        ..RegionIdentifierOptions::default()
    };
    let ri = RegionIdentifier::analyze(&graph, &mut blocks, options).expect("analysis failed");
    assert_eq!(ri.head_block(ri.root(), &blocks).addr(), 1);
}

#[test]
fn analysis_is_deterministic() {
    let edges = [
        (1, 2),
        (1, 3),
        (2, 4),
        (3, 4),
        (4, 5),
        (4, 6),
        (5, 7),
        (6, 7),
        (6, 2),
    ];
    let (first, _) = analyze(&edges);
    let (second, _) = analyze(&edges);
    assert_eq!(
        first.regions_by_block_addrs(),
        second.regions_by_block_addrs()
    );
}

#[test]
fn reducibility() {
    let (diamond, mut blocks) = graph_from_edges(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
    assert!(RegionIdentifier::is_reducible(&diamond, &mut blocks).unwrap());

    let (loopy, mut blocks) = graph_from_edges(&[(1, 2), (2, 3), (3, 2), (3, 4)]);
    assert!(RegionIdentifier::is_reducible(&loopy, &mut blocks).unwrap());

    let (irreducible, mut blocks) = graph_from_edges(&[(1, 2), (1, 3), (2, 3), (3, 2)]);
    assert!(!RegionIdentifier::is_reducible(&irreducible, &mut blocks).unwrap());
}
