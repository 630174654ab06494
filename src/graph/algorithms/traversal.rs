//! Depth-first traversal utilities: postorder and back-edge discovery.
//!
//! Region identification consumes two DFS products. The postorder sequence
//! drives the bottom-up scan of the acyclic pass and ranks loop exits, and the
//! set of DFS back edges identifies loop headers. Both traversals follow
//! adjacency insertion order, so their output is deterministic for a given
//! graph construction sequence.

use crate::graph::{NodeId, Successors};

/// Traversal state for the explicit-stack postorder walk.
enum State {
    Enter(NodeId),
    Exit(NodeId),
}

/// Computes the depth-first postorder of all nodes reachable from `start`.
///
/// A node appears after all of its DFS-tree descendants. Children are entered
/// in adjacency order, making the sequence reproducible.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `start` - The traversal root
///
/// # Returns
///
/// The reachable nodes in postorder. Empty if `start` is not a valid node.
#[must_use]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let bound = graph.node_bound();
    if start.index() >= bound {
        return Vec::new();
    }

    let mut visited = vec![false; bound];
    let mut order = Vec::new();
    let mut stack = vec![State::Enter(start)];

    while let Some(state) = stack.pop() {
        match state {
            State::Enter(node) => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push(State::Exit(node));
                // push in reverse so the first successor is entered first
                let succs: Vec<NodeId> = graph.successors(node).collect();
                for succ in succs.into_iter().rev() {
                    if !visited[succ.index()] {
                        stack.push(State::Enter(succ));
                    }
                }
            }
            State::Exit(node) => order.push(node),
        }
    }

    order
}

/// Computes the reverse postorder of all nodes reachable from `start`.
///
/// Reverse postorder is a topological order on the acyclic portion of the
/// graph and the customary iteration order for forward dataflow problems.
#[must_use]
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut order = postorder(graph, start);
    order.reverse();
    order
}

/// Finds all DFS back edges reachable from `start`.
///
/// An edge `(u, v)` is a back edge when `v` is an ancestor of `u` on the
/// current DFS stack, i.e. the edge closes a cycle. The targets of back edges
/// are exactly the loop headers of a reducible graph; self-loops report
/// themselves as `(n, n)`.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `start` - The traversal root
///
/// # Returns
///
/// The back edges in DFS discovery order.
#[must_use]
pub fn dfs_back_edges<G: Successors>(graph: &G, start: NodeId) -> Vec<(NodeId, NodeId)> {
    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;

    let bound = graph.node_bound();
    if start.index() >= bound {
        return Vec::new();
    }

    struct Frame {
        node: NodeId,
        succs: Vec<NodeId>,
        next: usize,
    }

    let mut color = vec![WHITE; bound];
    let mut back_edges = Vec::new();

    color[start.index()] = GRAY;
    let mut stack = vec![Frame {
        node: start,
        succs: graph.successors(start).collect(),
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        if frame.next < frame.succs.len() {
            let child = frame.succs[frame.next];
            frame.next += 1;
            let node = frame.node;
            match color[child.index()] {
                WHITE => {
                    color[child.index()] = GRAY;
                    stack.push(Frame {
                        node: child,
                        succs: graph.successors(child).collect(),
                        next: 0,
                    });
                }
                GRAY => back_edges.push((node, child)),
                _ => {}
            }
        } else {
            color[frame.node.index()] = BLACK;
            stack.pop();
        }
    }

    back_edges
}
