//! Call-site collapsing and reducibility checks on control flow graphs.
//!
//! Region identification runs on a "supergraph" in which interprocedural
//! artifacts have been folded away: callee blocks reached over `call` edges
//! are dropped, and `fake_return` edges whose endpoints have no other
//! fan-in/fan-out are contracted into a single merged block.

use crate::block::BlockArena;
use crate::error::Result;
use crate::graph::{EdgeKind, NodeId};
use crate::regions::ControlFlowGraph;

/// Collapses a control flow graph into its supergraph, in place.
///
/// Repeatedly scans the edge set and applies the first rewrite that fires,
/// then rescans from scratch, until no rewrite applies:
///
/// * a `fake_return` edge whose source has exactly one successor and whose
///   destination has exactly one predecessor is contracted, merging the two
///   blocks into a new one allocated in `blocks`;
/// * the destination of a `call` edge is removed outright, along with every
///   edge touching it.
pub(crate) fn make_supergraph(graph: &mut ControlFlowGraph, blocks: &mut BlockArena) -> Result<()> {
    loop {
        let snapshot: Vec<(NodeId, NodeId, EdgeKind)> =
            graph.edges().map(|(src, dst, kind)| (src, dst, *kind)).collect();

        let mut changed = false;
        for (src, dst, kind) in snapshot {
            match kind {
                EdgeKind::FakeReturn
                    if graph.out_degree(src) == 1 && graph.in_degree(dst) == 1 =>
                {
                    merge_nodes(graph, blocks, src, dst, true)?;
                    changed = true;
                    break;
                }
                EdgeKind::Call => {
                    graph.remove_node(dst);
                    changed = true;
                    break;
                }
                _ => {}
            }
        }

        if !changed {
            return Ok(());
        }
    }
}

/// Contracts the edge `a -> b` into a single merged block.
///
/// Without `force_multinode`, a pair with at most one in-edge and one
/// out-edge is simply deleted; it forms a region by itself. Otherwise the
/// two payloads are merged into a fresh block that inherits `a`'s in-edges
/// and `b`'s out-edges. Contracted edges lose their original kind and are
/// re-added as plain flow edges.
pub(crate) fn merge_nodes(
    graph: &mut ControlFlowGraph,
    blocks: &mut BlockArena,
    node_a: NodeId,
    node_b: NodeId,
    force_multinode: bool,
) -> Result<()> {
    let in_edges: Vec<NodeId> = graph.in_edges(node_a).map(|(src, _)| src).collect();
    let out_edges: Vec<NodeId> = graph.out_edges(node_b).map(|(dst, _)| dst).collect();

    if !force_multinode && in_edges.len() <= 1 && out_edges.len() <= 1 {
        graph.remove_node(node_a);
        graph.remove_node(node_b);
        return Ok(());
    }

    let (Some(&block_a), Some(&block_b)) = (graph.node(node_a), graph.node(node_b)) else {
        return Ok(());
    };
    let merged = blocks.merge(block_a, block_b);

    graph.remove_node(node_a);
    graph.remove_node(node_b);

    let new_node = graph.add_node(merged);
    for src in in_edges {
        let src = if src == node_b { new_node } else { src };
        graph.add_edge(src, new_node, EdgeKind::Flow)?;
    }
    for dst in out_edges {
        let dst = if dst == node_a { new_node } else { dst };
        graph.add_edge(new_node, dst, EdgeKind::Flow)?;
    }

    Ok(())
}

/// Folds `kiddie` into its predecessor `mommy`.
///
/// The merged block keeps `mommy`'s in-edges and the union of both nodes'
/// out-edges, except for the `mommy -> kiddie` edge being contracted. As
/// with [`merge_nodes`], a trivial pair is deleted outright unless
/// `force_multinode` is set.
pub(crate) fn absorb_node(
    graph: &mut ControlFlowGraph,
    blocks: &mut BlockArena,
    node_mommy: NodeId,
    node_kiddie: NodeId,
    force_multinode: bool,
) -> Result<()> {
    let in_edges_mommy: Vec<NodeId> = graph.in_edges(node_mommy).map(|(src, _)| src).collect();
    let out_edges_mommy: Vec<NodeId> = graph.out_edges(node_mommy).map(|(dst, _)| dst).collect();
    let out_edges_kiddie: Vec<NodeId> = graph.out_edges(node_kiddie).map(|(dst, _)| dst).collect();

    if !force_multinode && in_edges_mommy.len() <= 1 && out_edges_kiddie.len() <= 1 {
        graph.remove_node(node_mommy);
        graph.remove_node(node_kiddie);
        return Ok(());
    }

    let (Some(&block_mommy), Some(&block_kiddie)) =
        (graph.node(node_mommy), graph.node(node_kiddie))
    else {
        return Ok(());
    };
    let merged = blocks.merge(block_mommy, block_kiddie);

    graph.remove_node(node_mommy);
    graph.remove_node(node_kiddie);

    let new_node = graph.add_node(merged);
    for src in in_edges_mommy {
        let src = if src == node_kiddie { new_node } else { src };
        graph.add_edge(src, new_node, EdgeKind::Flow)?;
    }
    for dst in out_edges_mommy {
        if dst == node_kiddie {
            continue;
        }
        let dst = if dst == node_mommy { new_node } else { dst };
        graph.add_edge(new_node, dst, EdgeKind::Flow)?;
    }
    for dst in out_edges_kiddie {
        let dst = if dst == node_mommy { new_node } else { dst };
        graph.add_edge(new_node, dst, EdgeKind::Flow)?;
    }

    Ok(())
}

/// Tests whether a control flow graph is reducible.
///
/// Works on a scratch copy: the graph is collapsed to its supergraph, then
/// the two Hecht-Ullman transformations are applied to a fixed point -
/// deleting self-loop edges, and contracting nodes with a single
/// predecessor into that predecessor. The graph is reducible exactly when
/// a single node remains.
pub(crate) fn is_reducible(graph: &ControlFlowGraph, blocks: &mut BlockArena) -> Result<bool> {
    let mut graph = graph.clone();
    make_supergraph(&mut graph, blocks)?;

    loop {
        let mut changed = false;
        changed |= remove_self_loops(&mut graph);
        changed |= merge_single_entry_nodes(&mut graph, blocks)?;
        if !changed {
            break;
        }
    }

    Ok(graph.node_count() == 1)
}

/// Deletes every self-loop edge. Returns whether anything was deleted.
fn remove_self_loops(graph: &mut ControlFlowGraph) -> bool {
    let looping: Vec<NodeId> = graph
        .node_ids()
        .filter(|&node| graph.has_edge(node, node))
        .collect();
    for &node in &looping {
        graph.remove_edge(node, node);
    }
    !looping.is_empty()
}

/// Contracts nodes with exactly one (distinct) predecessor into that
/// predecessor, one at a time, until none remain. Returns whether any
/// contraction happened.
fn merge_single_entry_nodes(graph: &mut ControlFlowGraph, blocks: &mut BlockArena) -> Result<bool> {
    let mut merged_any = false;
    loop {
        let candidate = graph.node_ids().find_map(|node| {
            let preds: Vec<NodeId> = graph.predecessors(node).collect();
            match preds.as_slice() {
                [pred] if *pred != node => Some((*pred, node)),
                _ => None,
            }
        });

        let Some((pred, node)) = candidate else {
            return Ok(merged_any);
        };
        absorb_node(graph, blocks, pred, node, true)?;
        merged_any = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    fn block_graph(
        addrs: &[u64],
        edges: &[(u64, u64, EdgeKind)],
    ) -> (ControlFlowGraph, BlockArena, Vec<NodeId>) {
        let mut blocks = BlockArena::default();
        let mut graph = ControlFlowGraph::new();
        let nodes: Vec<NodeId> = addrs
            .iter()
            .map(|&addr| graph.add_node(blocks.add(Block::new(addr))))
            .collect();
        for &(src, dst, kind) in edges {
            let src = nodes[addrs.iter().position(|&a| a == src).unwrap()];
            let dst = nodes[addrs.iter().position(|&a| a == dst).unwrap()];
            graph.add_edge(src, dst, kind).unwrap();
        }
        (graph, blocks, nodes)
    }

    #[test]
    fn supergraph_drops_call_targets() {
        let (mut graph, mut blocks, nodes) = block_graph(
            &[1, 2, 3],
            &[(1, 2, EdgeKind::Call), (1, 3, EdgeKind::FakeReturn)],
        );
        // 3 keeps more fan-in than the contraction rule allows once 2 is
        // gone, so only the call removal fires here.
        graph.add_edge(nodes[1], nodes[2], EdgeKind::Flow).ok();
        make_supergraph(&mut graph, &mut blocks).unwrap();
        assert!(!graph.contains_node(nodes[1]));
        assert!(graph.contains_node(nodes[0]));
    }

    #[test]
    fn supergraph_contracts_fake_returns() {
        let (mut graph, mut blocks, nodes) =
            block_graph(&[1, 2, 3], &[(1, 2, EdgeKind::FakeReturn), (2, 3, EdgeKind::Flow)]);
        make_supergraph(&mut graph, &mut blocks).unwrap();

        assert!(!graph.contains_node(nodes[0]));
        assert!(!graph.contains_node(nodes[1]));
        // the merged block carries the first addr and links on to 3
        let merged = graph
            .node_ids()
            .find(|&n| graph.node(n).is_some_and(|&b| blocks.block(b).addr() == 1))
            .unwrap();
        assert!(graph.has_edge(merged, nodes[2]));
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn fake_return_with_fan_in_is_kept() {
        let (mut graph, mut blocks, nodes) = block_graph(
            &[1, 2, 3],
            &[
                (1, 3, EdgeKind::FakeReturn),
                (2, 3, EdgeKind::Flow),
                (1, 2, EdgeKind::Flow),
            ],
        );
        make_supergraph(&mut graph, &mut blocks).unwrap();
        assert!(graph.contains_node(nodes[0]));
        assert!(graph.contains_node(nodes[2]));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn structured_loop_is_reducible() {
        let (graph, mut blocks, _) = block_graph(
            &[1, 2, 3],
            &[
                (1, 2, EdgeKind::Flow),
                (2, 2, EdgeKind::Flow),
                (2, 3, EdgeKind::Flow),
            ],
        );
        assert!(is_reducible(&graph, &mut blocks).unwrap());
    }

    #[test]
    fn two_entry_loop_is_irreducible() {
        let (graph, mut blocks, _) = block_graph(
            &[1, 2, 3, 4],
            &[
                (1, 2, EdgeKind::Flow),
                (1, 3, EdgeKind::Flow),
                (2, 3, EdgeKind::Flow),
                (3, 2, EdgeKind::Flow),
                (2, 4, EdgeKind::Flow),
            ],
        );
        assert!(!is_reducible(&graph, &mut blocks).unwrap());
    }

    #[test]
    fn diamond_is_reducible() {
        let (graph, mut blocks, _) = block_graph(
            &[1, 2, 3, 4],
            &[
                (1, 2, EdgeKind::Flow),
                (1, 3, EdgeKind::Flow),
                (2, 4, EdgeKind::Flow),
                (3, 4, EdgeKind::Flow),
            ],
        );
        assert!(is_reducible(&graph, &mut blocks).unwrap());
    }
}
