//! Graph slicing between a source node and a frontier of sink nodes.
//!
//! A slice collects every node lying on some path from a source to a frontier
//! member. The cyclic region builder uses slices to recover natural loop
//! bodies: the slice from a loop header to its latching nodes, frontier
//! included, is exactly the set of nodes that stay inside the loop.

use std::collections::{HashSet, VecDeque};

use crate::graph::{NodeId, Predecessors, Successors};

/// Computes the set of nodes on any path from `source` to a member of
/// `frontier`.
///
/// The computation intersects forward reachability from `source` with
/// backward reachability from the frontier, and never walks backwards past
/// `source`, so paths that would re-enter the source through its predecessors
/// are not followed. Frontier members themselves may appear mid-path (one
/// latch can reach another); interior occurrences are always kept, and the
/// frontier itself is kept when `include_frontier` is set.
///
/// `source` is always part of the result. If no frontier member is reachable
/// the result is `{source}`.
///
/// # Arguments
///
/// * `graph` - The graph to slice
/// * `source` - The node paths start from
/// * `frontier` - The nodes paths end at
/// * `include_frontier` - Whether reached frontier members belong to the slice
#[must_use]
pub fn slice_between<G>(
    graph: &G,
    source: NodeId,
    frontier: &HashSet<NodeId>,
    include_frontier: bool,
) -> HashSet<NodeId>
where
    G: Successors + Predecessors,
{
    // Forward pass: everything reachable from the source.
    let mut forward: HashSet<NodeId> = HashSet::new();
    forward.insert(source);
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    queue.push_back(source);
    while let Some(node) = queue.pop_front() {
        for succ in graph.successors(node) {
            if forward.insert(succ) {
                queue.push_back(succ);
            }
        }
    }

    // Backward pass from reached frontier members, restricted to the forward
    // set and stopping at the source.
    let mut reached: Vec<NodeId> = frontier
        .iter()
        .copied()
        .filter(|node| forward.contains(node))
        .collect();
    reached.sort_unstable();

    let mut backward: HashSet<NodeId> = reached.iter().copied().collect();
    let mut queue: VecDeque<NodeId> = reached.iter().copied().collect();
    while let Some(node) = queue.pop_front() {
        if node == source {
            continue;
        }
        for pred in graph.predecessors(node) {
            if forward.contains(&pred) && backward.insert(pred) {
                queue.push_back(pred);
            }
        }
    }

    let mut slice: HashSet<NodeId> = backward
        .into_iter()
        .filter(|node| include_frontier || !frontier.contains(node))
        .collect();
    slice.insert(source);
    slice
}
