//! Single-entry single-successor (SESE) region detection on acyclic graphs.
//!
//! Each call scans the working graph for one SESE region: candidate entries
//! are visited in DFS postorder and paired against their postdominator
//! chain, a dominance-frontier test validates the pair, and a flood fill
//! carves the region out. The region is then collapsed into a single node
//! and the caller re-runs the scan until nothing more can be carved.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::error::Result;
use crate::graph::algorithms::{
    compute_dominance_frontiers, compute_dominators, compute_postdominators, postorder,
    DominatorTree,
};
use crate::graph::{FlowGraph, NodeId};
use crate::regions::identifier::RegionIdentifierOptions;
use crate::regions::region::{
    AcyclicRegion, Region, RegionArena, RegionEdge, RegionId, RegionNode,
};
use crate::regions::RegionGraph;

/// Scratch graph the detection runs on. Node IDs match the working graph;
/// the synthetic endnode, when present, carries no payload.
type ScratchGraph = FlowGraph<Option<RegionNode>, RegionEdge>;

/// A region carved out by [`compute_region`], not yet stored in the arena.
struct ComputedRegion {
    head: RegionNode,
    graph: RegionGraph,
    successors: Vec<RegionNode>,
    graph_with_successors: RegionGraph,
}

/// Finds and collapses one SESE region of `graph`. Returns whether a region
/// was collapsed; callers iterate until this returns `false`.
///
/// `secondary_graph` is the successor-preserving view of an enclosing
/// cyclic region; every abstraction is mirrored into it, and edges that
/// leave `graph` for that view are patched back into the new region's own
/// successor view. `failed_region_attempts` carries rejected (entry, exit)
/// pairs across calls so rescans skip them. With `cyclic` set the head is
/// never considered as a region entry, keeping the loop head a direct
/// member of the loop body.
pub(crate) fn make_acyclic_region(
    head: NodeId,
    graph: &mut RegionGraph,
    mut secondary_graph: Option<&mut RegionGraph>,
    failed_region_attempts: &mut HashSet<(NodeId, NodeId)>,
    cyclic: bool,
    regions: &mut RegionArena,
    options: &RegionIdentifierOptions,
) -> Result<bool> {
    let head_inedges: Vec<NodeId> = graph.in_edges(head).map(|(src, _)| src).collect();

    let mut scratch: ScratchGraph = graph.map(|&n| Some(n), |&e| e);
    for &src in &head_inedges {
        scratch.remove_edge(src, head);
    }

    let endnodes: Vec<NodeId> = scratch
        .node_ids()
        .filter(|&n| scratch.out_degree(n) == 0)
        .collect();
    if endnodes.is_empty() {
        return Ok(false);
    }

    // with several endnodes, or a lone endnode that cannot close a region
    // back to the head, a synthetic endnode gives the postdominator tree a
    // single root
    let mut dummy_endnode: Option<NodeId> = None;
    let needs_dummy = endnodes.len() > 1
        || (!head_inedges.is_empty() && !graph.predecessors(head).any(|p| p == endnodes[0]));
    if needs_dummy {
        let dummy = scratch.add_node(None);
        for &endnode in &endnodes {
            scratch.add_edge(endnode, dummy, RegionEdge::flow())?;
        }
        dummy_endnode = Some(dummy);
    }
    let exit_root = dummy_endnode.unwrap_or(endnodes[0]);

    let doms = compute_dominators(&scratch, head);
    let postdoms = compute_postdominators(&scratch, exit_root);
    let df = compute_dominance_frontiers(&scratch, &doms);

    for node in postorder(&scratch, head) {
        if Some(node) == dummy_endnode {
            continue;
        }
        if cyclic && node == head {
            continue;
        }

        if scratch.out_degree(node) == 0 {
            // isolated leaf blocks still need a region wrapper so the
            // final tree is regions all the way down
            if scratch.in_degree(node) == 0 {
                if let Some(&Some(payload @ RegionNode::Block(_))) = scratch.node(node) {
                    let mut subgraph = RegionGraph::new();
                    subgraph.add_node(payload);
                    let region_id = regions.add(Region::Acyclic(AcyclicRegion {
                        head: payload,
                        graph: subgraph,
                        successors: Vec::new(),
                        graph_with_successors: None,
                    }));
                    abstract_acyclic_region(
                        graph,
                        region_id,
                        &[],
                        regions,
                        secondary_graph.as_deref_mut(),
                    )?;
                }
            }
            continue;
        }

        let mut postdom_node = postdoms.immediate_dominator(node);
        while let Some(pd) = postdom_node {
            if !failed_region_attempts.contains(&(node, pd))
                && check_region(&scratch, node, pd, &doms, &df)
            {
                if let Some(mut computed) = compute_region(&scratch, node, pd, dummy_endnode)? {
                    if let Some(sec) = secondary_graph.as_deref_mut() {
                        backpatch_successors(
                            &mut computed,
                            sec,
                            &scratch,
                            options.complete_successors,
                        )?;
                    }
                    debug!("Node {node}, frontier {pd}.");

                    // the exit bounds the region in the working graph; the
                    // synthetic endnode never does
                    let frontier: Vec<RegionNode> = match scratch.node(pd) {
                        Some(&Some(payload)) if Some(pd) != dummy_endnode => vec![payload],
                        _ => Vec::new(),
                    };
                    let region_id = regions.add(Region::Acyclic(AcyclicRegion {
                        head: computed.head,
                        graph: computed.graph,
                        successors: computed.successors,
                        graph_with_successors: Some(computed.graph_with_successors),
                    }));
                    abstract_acyclic_region(
                        graph,
                        region_id,
                        &frontier,
                        regions,
                        secondary_graph.as_deref_mut(),
                    )?;
                    return Ok(true);
                }
            }

            failed_region_attempts.insert((node, pd));
            if !doms.dominates(node, pd) {
                break;
            }
            postdom_node = postdoms.immediate_dominator(pd);
        }
    }

    Ok(false)
}

/// Tests whether `(start_node, end_node)` bounds a single-entry,
/// single-successor region: no edge may enter the region other than through
/// the start, and no edge may leave it other than towards the end.
fn check_region(
    scratch: &ScratchGraph,
    start_node: NodeId,
    end_node: NodeId,
    doms: &DominatorTree,
    df: &[HashSet<NodeId>],
) -> bool {
    let empty = HashSet::new();
    let start_frontier = df.get(start_node.index()).unwrap_or(&empty);
    let end_frontier = df.get(end_node.index()).unwrap_or(&empty);

    // when the end does not sit below the start in the dominator tree, the
    // start's frontier must consist of the pair itself
    if !doms.dominates(start_node, end_node) {
        for &n in start_frontier {
            if n != start_node && n != end_node {
                return false;
            }
        }
    }

    // no edges should enter the region
    for &n in end_frontier {
        if doms.dominates(start_node, n) && n != end_node {
            return false;
        }
    }

    // no edges should leave the region
    for &n in start_frontier {
        if n == start_node || n == end_node {
            continue;
        }
        if !end_frontier.contains(&n) {
            return false;
        }
        for pred in scratch.predecessors(n) {
            if doms.dominates(start_node, pred) && !doms.dominates(end_node, pred) {
                return false;
            }
        }
    }

    true
}

/// Flood fills the region entered at `node` and bounded by `exit_node`.
///
/// Returns `None` for single-node fills; a lone node never becomes a
/// region here (leaf wrapping is handled separately).
fn compute_region(
    scratch: &ScratchGraph,
    node: NodeId,
    exit_node: NodeId,
    dummy_endnode: Option<NodeId>,
) -> Result<Option<ComputedRegion>> {
    let mut traversed: HashSet<NodeId> = HashSet::new();
    let mut members: Vec<NodeId> = Vec::new();
    let mut internal_edges: Vec<(NodeId, NodeId, RegionEdge)> = Vec::new();
    let mut frontier_edges: Vec<(NodeId, NodeId, RegionEdge)> = Vec::new();

    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n == exit_node || !traversed.insert(n) {
            continue;
        }
        members.push(n);

        for (succ, data) in scratch.out_edges(n) {
            if Some(succ) == dummy_endnode {
                continue;
            }
            if succ == exit_node {
                frontier_edges.push((n, succ, *data));
                continue;
            }
            internal_edges.push((n, succ, *data));
            if !traversed.contains(&succ) {
                stack.push(succ);
            }
        }
    }

    if members.len() <= 1 {
        return Ok(None);
    }

    let Some(&Some(head_payload)) = scratch.node(node) else {
        return Ok(None);
    };

    let mut region_graph = RegionGraph::new();
    let mut id_map: HashMap<NodeId, NodeId> = HashMap::new();
    for &member in &members {
        if let Some(&Some(payload)) = scratch.node(member) {
            id_map.insert(member, region_graph.add_node(payload));
        }
    }
    for &(src, dst, data) in &internal_edges {
        if let (Some(&s), Some(&d)) = (id_map.get(&src), id_map.get(&dst)) {
            region_graph.add_edge(s, d, data)?;
        }
    }

    let mut graph_with_successors = region_graph.clone();
    let mut successors: Vec<RegionNode> = Vec::new();
    if Some(exit_node) != dummy_endnode {
        if let Some(&Some(exit_payload)) = scratch.node(exit_node) {
            successors.push(exit_payload);
            let gws_exit = graph_with_successors.add_node(exit_payload);
            id_map.insert(exit_node, gws_exit);
        }
    }
    for &(src, dst, data) in &frontier_edges {
        if let (Some(&s), Some(&d)) = (id_map.get(&src), id_map.get(&dst)) {
            graph_with_successors.add_edge(s, d, data)?;
        }
    }

    Ok(Some(ComputedRegion {
        head: head_payload,
        graph: region_graph,
        successors,
        graph_with_successors,
    }))
}

/// Re-attaches successor edges that exist in the enclosing region's
/// successor view but were invisible to the flood fill, so the new region's
/// own view stays complete.
///
/// With `complete_successors` every missing successor edge is copied; the
/// default only copies edges whose target left the working graph entirely.
fn backpatch_successors(
    computed: &mut ComputedRegion,
    secondary: &RegionGraph,
    scratch: &ScratchGraph,
    complete_successors: bool,
) -> Result<()> {
    let gws_nodes: Vec<(NodeId, RegionNode)> = computed
        .graph_with_successors
        .node_ids()
        .filter_map(|n| {
            computed
                .graph_with_successors
                .node(n)
                .map(|&payload| (n, payload))
        })
        .collect();

    for (nn, payload) in gws_nodes {
        let Some(sec_node) = secondary.find_node(|p| *p == payload) else {
            continue;
        };
        let sec_succs: Vec<(NodeId, RegionEdge)> = secondary
            .out_edges(sec_node)
            .map(|(dst, data)| (dst, *data))
            .collect();
        for (sec_succ, data) in sec_succs {
            let Some(&succ_payload) = secondary.node(sec_succ) else {
                continue;
            };
            let missing_from_graph =
                scratch.find_node(|p| *p == Some(succ_payload)).is_none();
            if complete_successors || missing_from_graph {
                add_successor_edge(computed, nn, succ_payload, data)?;
            }
        }
    }
    Ok(())
}

/// Ensures `src -> succ_payload` exists in the successor view and that the
/// successor list mentions the payload.
fn add_successor_edge(
    computed: &mut ComputedRegion,
    src: NodeId,
    succ_payload: RegionNode,
    data: RegionEdge,
) -> Result<()> {
    let dst = match computed
        .graph_with_successors
        .find_node(|p| *p == succ_payload)
    {
        Some(existing) => existing,
        None => computed.graph_with_successors.add_node(succ_payload),
    };
    if !computed.graph_with_successors.has_edge(src, dst) {
        computed.graph_with_successors.add_edge(src, dst, data)?;
        if !computed.successors.contains(&succ_payload) {
            computed.successors.push(succ_payload);
        }
    }
    Ok(())
}

/// Replaces the members of a stored region with a single region node in
/// `graph`, rewiring in-edges of the head and out-edges of the members. The
/// `frontier` payloads get an explicit region-to-frontier edge unless one
/// already exists. The same abstraction is applied to `secondary_graph`.
///
/// Matching is by payload, so the same region can be collapsed in graphs
/// with unrelated node IDs.
fn abstract_acyclic_region(
    graph: &mut RegionGraph,
    region_id: RegionId,
    frontier: &[RegionNode],
    regions: &RegionArena,
    secondary_graph: Option<&mut RegionGraph>,
) -> Result<()> {
    let region = regions.region(region_id);
    let member_set: HashSet<RegionNode> = match region.graph() {
        Some(subgraph) => subgraph
            .node_ids()
            .filter_map(|n| subgraph.node(n).copied())
            .collect(),
        None => HashSet::new(),
    };
    let head_payload = region.head();

    let member_nodes: Vec<NodeId> = graph
        .node_ids()
        .filter(|&n| graph.node(n).is_some_and(|p| member_set.contains(p)))
        .collect();
    let member_node_set: HashSet<NodeId> = member_nodes.iter().copied().collect();

    let in_edges: Vec<(NodeId, RegionEdge)> = match graph.find_node(|p| *p == head_payload) {
        Some(head_node) => graph.in_edges(head_node).map(|(src, e)| (src, *e)).collect(),
        None => Vec::new(),
    };
    let mut out_edges: Vec<(NodeId, RegionEdge)> = Vec::new();
    for &member in &member_nodes {
        for (dst, data) in graph.out_edges(member) {
            if !member_node_set.contains(&dst) {
                out_edges.push((dst, *data));
            }
        }
    }

    for &member in &member_nodes {
        graph.remove_node(member);
    }
    let region_node = graph.add_node(RegionNode::Region(region_id));

    for (src, data) in in_edges {
        if !member_node_set.contains(&src) && graph.contains_node(src) {
            graph.add_edge(src, region_node, data)?;
        }
    }
    for (dst, data) in out_edges {
        if graph.contains_node(dst) {
            graph.add_edge(region_node, dst, data)?;
        }
    }
    for &frontier_payload in frontier {
        if let Some(frontier_node) = graph.find_node(|p| *p == frontier_payload) {
            if !graph.has_edge(region_node, frontier_node) {
                graph.add_edge(region_node, frontier_node, RegionEdge::flow())?;
            }
        }
    }

    if let Some(sec) = secondary_graph {
        abstract_acyclic_region(sec, region_id, &[], regions, None)?;
    }

    Ok(())
}
