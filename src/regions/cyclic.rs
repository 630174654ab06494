//! Natural-loop discovery and cyclic region construction.
//!
//! Loops are found through DFS back edges from the start node. For each
//! header, the initial loop body is the graph slice between the header and
//! its latching nodes; the body is then refined until the loop has at most
//! one exit where possible, and finally collapsed into a single
//! [`CyclicRegion`] node in the working graph.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::block::BlockArena;
use crate::error::Result;
use crate::graph::algorithms::{
    compute_dominators, dfs_back_edges, postorder, quasi_topological_order_subset, slice_between,
};
use crate::graph::NodeId;
use crate::regions::identifier::RegionIdentifierOptions;
use crate::regions::region::{
    node_addr, CyclicRegion, Region, RegionArena, RegionEdge, RegionId, RegionNode,
};
use crate::regions::RegionGraph;

/// Returns the loop headers of `graph`: the targets of DFS back edges,
/// sorted quasi-topologically so inner loops come after the loops that
/// contain them.
pub(crate) fn find_loop_headers(graph: &RegionGraph, start: NodeId) -> Vec<NodeId> {
    let heads: HashSet<NodeId> = dfs_back_edges(graph, start)
        .into_iter()
        .map(|(_, target)| target)
        .collect();
    quasi_topological_order_subset(graph, &heads)
}

/// Computes the initial members of the natural loop at `head`: the slice
/// between the head and its latching nodes, widened so that switch-like
/// nodes (more than two non-self successors) pull all of their targets into
/// the loop.
fn find_initial_loop_nodes(graph: &RegionGraph, start: NodeId, head: NodeId) -> HashSet<NodeId> {
    let latching_nodes: HashSet<NodeId> = dfs_back_edges(graph, start)
        .into_iter()
        .filter(|&(_, target)| target == head)
        .map(|(source, _)| source)
        .collect();
    let mut nodes = slice_between(graph, head, &latching_nodes, true);

    loop {
        let mut snapshot: Vec<NodeId> = nodes.iter().copied().collect();
        snapshot.sort_unstable();

        let mut added: Vec<NodeId> = Vec::new();
        for node in snapshot {
            let nonself: Vec<NodeId> = graph.successors(node).filter(|&s| s != node).collect();
            if nonself.len() > 2 {
                added.extend(nonself.into_iter().filter(|succ| !nodes.contains(succ)));
            }
        }
        if added.is_empty() {
            break;
        }
        nodes.extend(added);
    }

    nodes
}

/// Shrinks a multi-exit loop towards a single exit.
///
/// Two growth passes run in order. First, exits on a straight line (one
/// in-edge, at most one out-edge) are absorbed into the loop until no such
/// exit remains. Second, exits whose predecessors all lie inside the loop
/// and which the head dominates are absorbed level by level; an absorption
/// round that would only trade the current exits for their successors is
/// forced through once to guarantee progress.
///
/// If the second pass swallowed every exit and
/// `largest_successor_tree_outside_loop` is set, the largest successor tree
/// hanging off a single initial exit is carved back out of the loop and its
/// root becomes the sole exit. On a size tie nothing is carved out.
fn refine_loop(
    graph: &RegionGraph,
    head: NodeId,
    initial_loop_nodes: &HashSet<NodeId>,
    initial_exit_nodes: &HashSet<NodeId>,
    largest_successor_tree_outside_loop: bool,
) -> (HashSet<NodeId>, HashSet<NodeId>) {
    if initial_exit_nodes.len() <= 1 {
        return (initial_loop_nodes.clone(), initial_exit_nodes.clone());
    }

    let mut refined_loop_nodes = initial_loop_nodes.clone();
    let mut refined_exit_nodes = initial_exit_nodes.clone();

    loop {
        let mut exits: Vec<NodeId> = refined_exit_nodes.iter().copied().collect();
        exits.sort_unstable();

        let mut added = false;
        for exit_node in exits {
            if graph.in_degree(exit_node) == 1 && graph.out_degree(exit_node) <= 1 {
                added = true;
                refined_loop_nodes.insert(exit_node);
                refined_exit_nodes.remove(&exit_node);
                for succ in graph.successors(exit_node) {
                    if !refined_loop_nodes.contains(&succ) {
                        refined_exit_nodes.insert(succ);
                    }
                }
            }
        }
        if !added {
            break;
        }
    }

    if refined_exit_nodes.len() <= 1 {
        return (refined_loop_nodes, refined_exit_nodes);
    }

    let idom = compute_dominators(graph, head);

    // edges over which the second pass grew past the initial exits
    let mut growth: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();

    let mut new_exit_nodes = refined_exit_nodes.clone();
    let mut sorted_refined_exit_nodes = quasi_topological_order_subset(graph, &refined_exit_nodes);
    while sorted_refined_exit_nodes.len() > 1 && !new_exit_nodes.is_empty() {
        let mut candidate_nodes: Vec<(NodeId, HashSet<NodeId>)> = Vec::new();
        for &n in &sorted_refined_exit_nodes {
            let absorbable = graph
                .predecessors(n)
                .all(|pred| pred == n || refined_loop_nodes.contains(&pred))
                && idom.dominates(head, n);
            if absorbable {
                let to_add: HashSet<NodeId> = graph
                    .successors(n)
                    .filter(|succ| !refined_loop_nodes.contains(succ))
                    .collect();
                candidate_nodes.push((n, to_add));
            }
        }

        let mut all_new_exit_candidates: HashSet<NodeId> = HashSet::new();
        for (_, to_add) in &candidate_nodes {
            all_new_exit_candidates.extend(to_add.iter().copied());
        }
        // every candidate would come straight back as an exit; force the
        // round through so the refinement cannot ping-pong forever
        if candidate_nodes
            .iter()
            .all(|&(n, _)| all_new_exit_candidates.contains(&n))
        {
            all_new_exit_candidates.clear();
        }

        new_exit_nodes.clear();
        for &(n, _) in &candidate_nodes {
            if all_new_exit_candidates.contains(&n) {
                continue;
            }
            refined_loop_nodes.insert(n);
            sorted_refined_exit_nodes.retain(|&x| x != n);
            for succ in graph.successors(n) {
                if !refined_loop_nodes.contains(&succ) {
                    new_exit_nodes.insert(succ);
                    growth.entry(n).or_default().insert(succ);
                }
            }
        }

        let mut merged: HashSet<NodeId> = sorted_refined_exit_nodes.iter().copied().collect();
        merged.extend(new_exit_nodes.iter().copied());
        sorted_refined_exit_nodes = quasi_topological_order_subset(graph, &merged);
    }

    let mut refined_exit_nodes: HashSet<NodeId> =
        sorted_refined_exit_nodes.into_iter().collect();
    refined_loop_nodes.retain(|n| !refined_exit_nodes.contains(n));

    if largest_successor_tree_outside_loop && refined_exit_nodes.is_empty() {
        let mut exit_to_newnodes: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
        let mut newnode_to_exits: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
        for &initial_exit in initial_exit_nodes {
            let descendants = growth_descendants(&growth, initial_exit);
            if descendants.is_empty() {
                continue;
            }
            for &newnode in &descendants {
                newnode_to_exits.entry(newnode).or_default().insert(initial_exit);
            }
            exit_to_newnodes.insert(initial_exit, descendants);
        }

        if !exit_to_newnodes.is_empty() {
            let max_size = exit_to_newnodes.values().map(HashSet::len).max().unwrap_or(0);
            let at_max: Vec<NodeId> = exit_to_newnodes
                .iter()
                .filter(|(_, newnodes)| newnodes.len() == max_size)
                .map(|(&exit, _)| exit)
                .collect();
            if let [max_exit] = at_max.as_slice() {
                let max_exit = *max_exit;
                if let Some(tree) = exit_to_newnodes.get(&max_exit) {
                    let exclusive = tree.iter().all(|newnode| {
                        newnode_to_exits
                            .get(newnode)
                            .is_some_and(|exits| exits.len() == 1)
                    });
                    if exclusive {
                        refined_loop_nodes.retain(|&n| !tree.contains(&n) && n != max_exit);
                        refined_exit_nodes.insert(max_exit);
                    }
                }
            }
        }
    }

    (refined_loop_nodes, refined_exit_nodes)
}

/// BFS descendants of `root` over the growth edges, excluding `root` itself.
fn growth_descendants(
    growth: &HashMap<NodeId, HashSet<NodeId>>,
    root: NodeId,
) -> HashSet<NodeId> {
    let mut descendants = HashSet::new();
    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        if let Some(succs) = growth.get(&node) {
            for &succ in succs {
                if seen.insert(succ) {
                    descendants.insert(succ);
                    queue.push_back(succ);
                }
            }
        }
    }
    descendants
}

/// Attempts to structure the natural loop at `head` into a cyclic region.
///
/// Returns `Ok(None)` when the loop contains another still-live loop header
/// (inner loops must be structured first); the graph is left untouched in
/// that case. On success the loop body is collapsed into a single region
/// node and the handle of the new region is returned.
pub(crate) fn make_cyclic_region(
    graph: &mut RegionGraph,
    head: NodeId,
    start: NodeId,
    live_headers: &[NodeId],
    options: &RegionIdentifierOptions,
    regions: &mut RegionArena,
    blocks: &BlockArena,
) -> Result<Option<RegionId>> {
    let Some(&head_payload) = graph.node(head) else {
        return Err(malformed_error!("loop head {head} is not in the graph"));
    };
    let head_addr = node_addr(head_payload, regions, blocks);
    debug!("Found cyclic region at {head_addr:#010x}");

    let initial_loop_nodes = find_initial_loop_nodes(graph, start, head);
    debug!("Initial loop nodes: {}", initial_loop_nodes.len());

    // inner loops are structured first
    for &n in &initial_loop_nodes {
        let Some(&payload) = graph.node(n) else { continue };
        if node_addr(payload, regions, blocks) != head_addr && live_headers.contains(&n) {
            return Ok(None);
        }
    }

    let normal_entries: HashSet<NodeId> = graph
        .predecessors(head)
        .filter(|pred| !initial_loop_nodes.contains(pred))
        .collect();
    let mut abnormal_entries: HashSet<NodeId> = HashSet::new();
    for &n in &initial_loop_nodes {
        if n == head {
            continue;
        }
        abnormal_entries.extend(
            graph
                .predecessors(n)
                .filter(|pred| !initial_loop_nodes.contains(pred)),
        );
    }

    let mut initial_exit_nodes: HashSet<NodeId> = HashSet::new();
    for &n in &initial_loop_nodes {
        initial_exit_nodes.extend(
            graph
                .successors(n)
                .filter(|succ| !initial_loop_nodes.contains(succ)),
        );
    }

    let (refined_loop_nodes, refined_exit_nodes) = refine_loop(
        graph,
        head,
        &initial_loop_nodes,
        &initial_exit_nodes,
        options.largest_successor_tree_outside_loop,
    );
    debug!(
        "Refined loop nodes: {}, refined exit nodes: {}",
        refined_loop_nodes.len(),
        refined_exit_nodes.len()
    );

    let (normal_exit_node, abnormal_exit_nodes) = if refined_exit_nodes.len() > 1 {
        let order = postorder(graph, head);
        let mut sorted_exit_nodes: Vec<NodeId> = refined_exit_nodes.iter().copied().collect();
        sorted_exit_nodes.sort_unstable();
        sorted_exit_nodes.sort_by_key(|exit| {
            order.iter().position(|n| n == exit).unwrap_or(usize::MAX)
        });
        let normal = sorted_exit_nodes[0];
        let abnormal: HashSet<NodeId> = sorted_exit_nodes[1..].iter().copied().collect();
        (Some(normal), abnormal)
    } else {
        (refined_exit_nodes.iter().next().copied(), HashSet::new())
    };

    abstract_cyclic_region(
        graph,
        &refined_loop_nodes,
        head,
        &normal_entries,
        &abnormal_entries,
        normal_exit_node,
        &abnormal_exit_nodes,
        regions,
    )
    .map(Some)
}

/// An endpoint of an edge scheduled for re-insertion after the loop body
/// has been collapsed.
enum Endpoint {
    Node(NodeId),
    Region,
}

/// Collapses `loop_nodes` into a single [`CyclicRegion`] node.
///
/// Entry edges are re-targeted at the region node; abnormal entry edges
/// additionally record the body node they originally pointed at. Exit edges
/// are re-sourced from the region node. The region keeps three payload
/// snapshots: the body alone, the body with its exit edges, and the full
/// neighborhood including entry and exit neighbors.
#[allow(clippy::too_many_arguments)]
fn abstract_cyclic_region(
    graph: &mut RegionGraph,
    loop_nodes: &HashSet<NodeId>,
    head: NodeId,
    normal_entries: &HashSet<NodeId>,
    abnormal_entries: &HashSet<NodeId>,
    normal_exit_node: Option<NodeId>,
    abnormal_exit_nodes: &HashSet<NodeId>,
    regions: &mut RegionArena,
) -> Result<RegionId> {
    let Some(&head_payload) = graph.node(head) else {
        return Err(malformed_error!("loop head {head} is not in the graph"));
    };

    let mut sorted_loop_nodes: Vec<NodeId> = loop_nodes.iter().copied().collect();
    sorted_loop_nodes.sort_unstable();

    let mut region_outedges: Vec<(NodeId, NodeId)> = Vec::new();
    let mut delayed_edges: Vec<(Endpoint, Endpoint, RegionEdge)> = Vec::new();

    for &node in &sorted_loop_nodes {
        for (src, data) in graph.in_edges(node) {
            if loop_nodes.contains(&src) {
                continue;
            }
            if normal_entries.contains(&src) {
                delayed_edges.push((Endpoint::Node(src), Endpoint::Region, *data));
            } else if abnormal_entries.contains(&src) {
                let mut data = *data;
                data.region_dst = graph.node(node).copied();
                delayed_edges.push((Endpoint::Node(src), Endpoint::Region, data));
            } else {
                return Err(malformed_error!(
                    "unclassifiable edge {src} -> {node} into a loop body"
                ));
            }
        }
        for (dst, data) in graph.out_edges(node) {
            if loop_nodes.contains(&dst) {
                continue;
            }
            if Some(dst) == normal_exit_node || abnormal_exit_nodes.contains(&dst) {
                region_outedges.push((node, dst));
                delayed_edges.push((Endpoint::Region, Endpoint::Node(dst), *data));
            } else {
                return Err(malformed_error!(
                    "unclassifiable edge {node} -> {dst} leaving a loop body"
                ));
            }
        }
    }

    let subgraph = induced_copy(graph, loop_nodes);

    let mut full_graph = graph.map_nodes(|&n| n);
    let edge_snapshot: Vec<_> = full_graph.edge_ids().collect();
    for edge in edge_snapshot {
        if let Some((src, dst)) = full_graph.edge_endpoints(edge) {
            if !loop_nodes.contains(&src) && !loop_nodes.contains(&dst) {
                full_graph.remove_edge(src, dst);
            }
        }
    }
    let node_snapshot: Vec<NodeId> = full_graph.node_ids().collect();
    for node in node_snapshot {
        if !loop_nodes.contains(&node)
            && full_graph.in_degree(node) == 0
            && full_graph.out_degree(node) == 0
        {
            full_graph.remove_node(node);
        }
    }

    let mut keep = loop_nodes.clone();
    keep.extend(region_outedges.iter().map(|&(_, dst)| dst));
    let mut graph_with_successors = induced_copy(graph, &keep);
    let gws_edges: Vec<_> = graph_with_successors.edge_ids().collect();
    for edge in gws_edges {
        if let Some((src, dst)) = graph_with_successors.edge_endpoints(edge) {
            if !loop_nodes.contains(&src) {
                graph_with_successors.remove_edge(src, dst);
            }
        }
    }

    let mut successors: Vec<RegionNode> = Vec::new();
    if let Some(exit) = normal_exit_node {
        if let Some(&payload) = graph.node(exit) {
            successors.push(payload);
        }
    }
    let mut sorted_abnormal: Vec<NodeId> = abnormal_exit_nodes.iter().copied().collect();
    sorted_abnormal.sort_unstable();
    for exit in sorted_abnormal {
        if let Some(&payload) = graph.node(exit) {
            successors.push(payload);
        }
    }

    for &node in &sorted_loop_nodes {
        graph.remove_node(node);
    }

    let region_id = regions.add(Region::Cyclic(CyclicRegion {
        head: head_payload,
        graph: subgraph,
        graph_with_successors,
        full_graph,
        successors,
    }));
    let region_node = graph.add_node(RegionNode::Region(region_id));

    for (src, dst, data) in delayed_edges {
        let src = match src {
            Endpoint::Node(n) => n,
            Endpoint::Region => region_node,
        };
        let dst = match dst {
            Endpoint::Node(n) => n,
            Endpoint::Region => region_node,
        };
        graph.add_edge(src, dst, data)?;
    }

    Ok(region_id)
}

/// Returns the subgraph of `graph` induced by `keep`, preserving node IDs.
pub(crate) fn induced_copy(graph: &RegionGraph, keep: &HashSet<NodeId>) -> RegionGraph {
    let mut copy = graph.map_nodes(|&n| n);
    let snapshot: Vec<NodeId> = copy.node_ids().collect();
    for node in snapshot {
        if !keep.contains(&node) {
            copy.remove_node(node);
        }
    }
    copy
}
