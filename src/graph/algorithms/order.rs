//! Quasi-topological ordering for graphs that may contain cycles.
//!
//! A topological sort is only defined for acyclic graphs; control-flow graphs
//! routinely are not. The quasi-topological order collapses every non-trivial
//! strongly connected component to a single vertex, topologically sorts the
//! condensation, and then expands each component in place: the component's
//! entry node first, followed by the recursively-ordered remainder with the
//! entry's incoming edges ignored.
//!
//! Loop-header processing and loop-exit refinement both rely on this order
//! being stable, and it is: Tarjan's algorithm and all expansions here follow
//! adjacency insertion order, so identically-built graphs order identically.

use std::collections::{HashMap, HashSet};

use crate::graph::{NodeId, Successors};

/// Computes the strongly connected components of `graph`.
///
/// Uses an iterative Tarjan's algorithm. Components are returned in reverse
/// topological order of the condensation: if any edge runs from component `A`
/// to component `B`, then `B` appears before `A`.
///
/// # Returns
///
/// One `Vec<NodeId>` per component. Singleton nodes form singleton components.
#[must_use]
pub fn strongly_connected_components<G: Successors>(graph: &G) -> Vec<Vec<NodeId>> {
    let nodes: Vec<NodeId> = graph.node_ids().collect();
    let succs: HashMap<NodeId, Vec<NodeId>> = nodes
        .iter()
        .map(|&n| (n, graph.successors(n).collect()))
        .collect();
    tarjan(&nodes, &succs)
}

/// Computes a quasi-topological order of all nodes in `graph`.
///
/// See the [module documentation](self) for the definition. For an acyclic
/// graph this is an ordinary topological order.
#[must_use]
pub fn quasi_topological_order<G: Successors>(graph: &G) -> Vec<NodeId> {
    let nodes: Vec<NodeId> = graph.node_ids().collect();
    let succs: HashMap<NodeId, Vec<NodeId>> = nodes
        .iter()
        .map(|&n| (n, graph.successors(n).collect()))
        .collect();
    order_adjacency(&nodes, &succs)
}

/// Computes the quasi-topological order of `graph` restricted to `subset`.
///
/// Equivalent to filtering [`quasi_topological_order`] down to the members of
/// `subset`, preserving their relative order.
#[must_use]
pub fn quasi_topological_order_subset<G: Successors>(
    graph: &G,
    subset: &HashSet<NodeId>,
) -> Vec<NodeId> {
    quasi_topological_order(graph)
        .into_iter()
        .filter(|node| subset.contains(node))
        .collect()
}

/// Orders nodes given a materialized adjacency map.
///
/// The expansion step rebuilds restricted adjacencies per component, so the
/// recursion works on plain maps rather than the graph trait.
fn order_adjacency(nodes: &[NodeId], succs: &HashMap<NodeId, Vec<NodeId>>) -> Vec<NodeId> {
    if nodes.len() <= 1 {
        return nodes.to_vec();
    }

    let sccs = tarjan(nodes, succs);

    // Tarjan emits components in reverse topological order of the
    // condensation, so walking them backwards is a topological sort.
    let mut ordered = Vec::with_capacity(nodes.len());
    for component in sccs.iter().rev() {
        if component.len() == 1 {
            ordered.push(component[0]);
        } else {
            expand_component(&mut ordered, component, succs);
        }
    }
    ordered
}

/// Expands one non-trivial strongly connected component into `ordered`.
///
/// Picks the component's entry: the first member that is a successor of an
/// already-ordered node, scanning the ordered prefix backwards, or the
/// smallest member ID if nothing outside reaches the component. The component
/// is then re-ordered recursively with all edges into the entry dropped, which
/// removes at least the cycles through the entry and guarantees progress.
fn expand_component(
    ordered: &mut Vec<NodeId>,
    component: &[NodeId],
    succs: &HashMap<NodeId, Vec<NodeId>>,
) {
    let members: HashSet<NodeId> = component.iter().copied().collect();

    let mut entry = None;
    'search: for &placed in ordered.iter().rev() {
        if let Some(placed_succs) = succs.get(&placed) {
            for &succ in placed_succs {
                if members.contains(&succ) {
                    entry = Some(succ);
                    break 'search;
                }
            }
        }
    }
    let entry = match entry {
        Some(node) => node,
        None => component.iter().copied().min().unwrap_or(component[0]),
    };

    let sub_nodes: Vec<NodeId> = component.to_vec();
    let sub_succs: HashMap<NodeId, Vec<NodeId>> = sub_nodes
        .iter()
        .map(|&n| {
            let filtered: Vec<NodeId> = succs
                .get(&n)
                .into_iter()
                .flatten()
                .copied()
                .filter(|succ| members.contains(succ) && *succ != entry)
                .collect();
            (n, filtered)
        })
        .collect();

    ordered.extend(order_adjacency(&sub_nodes, &sub_succs));
}

/// Iterative Tarjan SCC over a materialized adjacency map.
fn tarjan(nodes: &[NodeId], succs: &HashMap<NodeId, Vec<NodeId>>) -> Vec<Vec<NodeId>> {
    struct Frame {
        node: NodeId,
        next: usize,
    }

    let mut index_of: HashMap<NodeId, usize> = HashMap::new();
    let mut lowlink: HashMap<NodeId, usize> = HashMap::new();
    let mut on_stack: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut components: Vec<Vec<NodeId>> = Vec::new();
    let mut counter = 0usize;

    for &root in nodes {
        if index_of.contains_key(&root) {
            continue;
        }

        let mut call_stack = vec![Frame { node: root, next: 0 }];
        index_of.insert(root, counter);
        lowlink.insert(root, counter);
        counter += 1;
        stack.push(root);
        on_stack.insert(root);

        while let Some(frame) = call_stack.last_mut() {
            let node = frame.node;
            let adjacency = succs.get(&node).map_or(&[] as &[NodeId], Vec::as_slice);

            if frame.next < adjacency.len() {
                let succ = adjacency[frame.next];
                frame.next += 1;

                if let Some(&succ_index) = index_of.get(&succ) {
                    if on_stack.contains(&succ) {
                        let low = lowlink[&node].min(succ_index);
                        lowlink.insert(node, low);
                    }
                } else {
                    index_of.insert(succ, counter);
                    lowlink.insert(succ, counter);
                    counter += 1;
                    stack.push(succ);
                    on_stack.insert(succ);
                    call_stack.push(Frame {
                        node: succ,
                        next: 0,
                    });
                }
            } else {
                call_stack.pop();
                if let Some(parent) = call_stack.last() {
                    let low = lowlink[&parent.node].min(lowlink[&node]);
                    lowlink.insert(parent.node, low);
                }
                if lowlink[&node] == index_of[&node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack.remove(&member);
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
    }

    components
}
