//! Directed graph container and traversal traits for control-flow analysis.
//!
//! This module provides [`FlowGraph`], the mutable directed graph every pass in
//! this crate operates on, together with the small trait family
//! ([`GraphBase`], [`Successors`], [`Predecessors`]) that lets the algorithms in
//! [`algorithms`] run against any adjacency representation, including the
//! [`Reversed`] view used to compute postdominators.
//!
//! # Design
//!
//! `FlowGraph` is an arena: nodes and edges live in `Vec`s indexed by
//! [`NodeId`] and [`EdgeId`], and removal tombstones a slot instead of shifting
//! its successors. Region structuring rewrites graphs heavily (every abstraction
//! step deletes a handful of nodes and inserts one), so stable IDs are what keep
//! cached orderings, failed-pair sets, and dominator tables valid across
//! restarts of a pass.
//!
//! Adjacency lists preserve insertion order, which makes every traversal in
//! this crate deterministic: two identically-built graphs produce identical
//! visit orders, identical region trees, and identical flattened output.
//!
//! At most one edge exists per `(source, target)` pair. Adding an edge that
//! already exists replaces its payload.
//!
//! # Examples
//!
//! ```rust
//! use cfg_regions::graph::FlowGraph;
//!
//! let mut graph: FlowGraph<&str, ()> = FlowGraph::new();
//! let entry = graph.add_node("entry");
//! let exit = graph.add_node("exit");
//! graph.add_edge(entry, exit, ()).unwrap();
//!
//! assert_eq!(graph.node_count(), 2);
//! assert!(graph.has_edge(entry, exit));
//!
//! graph.remove_node(exit);
//! assert_eq!(graph.node_count(), 1);
//! assert_eq!(graph.out_degree(entry), 0);
//! // `entry` keeps its ID across the removal
//! assert_eq!(graph.node(entry), Some(&"entry"));
//! ```

pub mod algorithms;
mod edge;
mod node;

pub use edge::{EdgeId, EdgeKind};
pub use node::NodeId;

use crate::{Error, Result};

/// Minimal read-only view of a directed graph.
///
/// Implemented by [`FlowGraph`] and by adapter views such as [`Reversed`].
/// Algorithms size their per-node side tables with [`node_bound`](Self::node_bound),
/// which counts tombstoned slots, and iterate live nodes with
/// [`node_ids`](Self::node_ids).
pub trait GraphBase {
    /// Returns an exclusive upper bound on [`NodeId::index`] values in this graph.
    ///
    /// Suitable for sizing `Vec`-based per-node tables. Always
    /// `>= node_count()`; the two differ once nodes have been removed.
    fn node_bound(&self) -> usize;

    /// Returns the number of live nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all live node IDs in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward adjacency access for a directed graph.
pub trait Successors: GraphBase {
    /// Returns an iterator over the successors of `node`.
    ///
    /// Order is deterministic for a given graph construction sequence.
    /// Unknown or removed nodes yield an empty iterator.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Reverse adjacency access for a directed graph.
pub trait Predecessors: GraphBase {
    /// Returns an iterator over the predecessors of `node`.
    ///
    /// Order is deterministic for a given graph construction sequence.
    /// Unknown or removed nodes yield an empty iterator.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A view of a graph with every edge reversed.
///
/// Wraps a borrowed graph without copying it. Running a forward algorithm over
/// `Reversed(&g)` computes the reverse-graph result; dominator computation over
/// the reversed view yields postdominators.
///
/// # Examples
///
/// ```rust
/// use cfg_regions::graph::{FlowGraph, Reversed, Successors};
///
/// let mut graph: FlowGraph<(), ()> = FlowGraph::new();
/// let a = graph.add_node(());
/// let b = graph.add_node(());
/// graph.add_edge(a, b, ()).unwrap();
///
/// let rev = Reversed(&graph);
/// assert_eq!(rev.successors(b).collect::<Vec<_>>(), vec![a]);
/// ```
pub struct Reversed<'g, G>(pub &'g G);

impl<G: GraphBase> GraphBase for Reversed<'_, G> {
    fn node_bound(&self) -> usize {
        self.0.node_bound()
    }

    fn node_count(&self) -> usize {
        self.0.node_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.0.node_ids()
    }
}

impl<G: Predecessors> Successors for Reversed<'_, G> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.0.predecessors(node)
    }
}

impl<G: Successors> Predecessors for Reversed<'_, G> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.0.successors(node)
    }
}

/// Internal storage for one edge.
#[derive(Debug, Clone)]
struct EdgeRecord<E> {
    src: NodeId,
    dst: NodeId,
    data: E,
}

/// A mutable directed graph with stable node and edge identifiers.
///
/// `N` is the node payload type and `E` the edge payload type. See the
/// [module documentation](self) for the storage model and determinism
/// guarantees.
#[derive(Debug, Clone)]
pub struct FlowGraph<N, E> {
    nodes: Vec<Option<N>>,
    edges: Vec<Option<EdgeRecord<E>>>,
    /// Outgoing edge IDs per node slot, in insertion order.
    succs: Vec<Vec<EdgeId>>,
    /// Incoming edge IDs per node slot, in insertion order.
    preds: Vec<Vec<EdgeId>>,
    live_nodes: usize,
    live_edges: usize,
}

impl<N, E> Default for FlowGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> FlowGraph<N, E> {
    /// Creates a new, empty graph.
    #[must_use]
    pub fn new() -> Self {
        FlowGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            succs: Vec::new(),
            preds: Vec::new(),
            live_nodes: 0,
            live_edges: 0,
        }
    }

    /// Creates a new, empty graph with preallocated capacity.
    ///
    /// # Arguments
    ///
    /// * `nodes` - Expected number of nodes
    /// * `edges` - Expected number of edges
    #[must_use]
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        FlowGraph {
            nodes: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
            succs: Vec::with_capacity(nodes),
            preds: Vec::with_capacity(nodes),
            live_nodes: 0,
            live_edges: 0,
        }
    }

    /// Adds a node with the given payload and returns its ID.
    pub fn add_node(&mut self, payload: N) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(payload));
        self.succs.push(Vec::new());
        self.preds.push(Vec::new());
        self.live_nodes += 1;
        id
    }

    /// Removes a node and all of its incident edges.
    ///
    /// Returns the node's payload, or `None` if the node was not present.
    /// Remaining nodes keep their IDs.
    pub fn remove_node(&mut self, node: NodeId) -> Option<N> {
        if !self.contains_node(node) {
            return None;
        }
        let incident: Vec<EdgeId> = self.succs[node.index()]
            .iter()
            .chain(self.preds[node.index()].iter())
            .copied()
            .collect();
        for edge in incident {
            self.detach_edge(edge);
        }
        self.live_nodes -= 1;
        self.nodes[node.index()].take()
    }

    /// Returns `true` if `node` refers to a live node in this graph.
    #[must_use]
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes
            .get(node.index())
            .is_some_and(|slot| slot.is_some())
    }

    /// Returns a reference to a node's payload.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index()).and_then(|slot| slot.as_ref())
    }

    /// Returns a mutable reference to a node's payload.
    pub fn node_mut(&mut self, node: NodeId) -> Option<&mut N> {
        self.nodes
            .get_mut(node.index())
            .and_then(|slot| slot.as_mut())
    }

    /// Returns the first live node (in ID order) whose payload satisfies `pred`.
    pub fn find_node(&self, mut pred: impl FnMut(&N) -> bool) -> Option<NodeId> {
        self.nodes.iter().enumerate().find_map(|(idx, slot)| {
            slot.as_ref()
                .filter(|&payload| pred(payload))
                .map(|_| NodeId(idx))
        })
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    /// Returns the number of live edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.live_edges
    }

    /// Returns `true` if the graph has no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_nodes == 0
    }

    /// Returns an exclusive upper bound on node indices, counting tombstones.
    #[must_use]
    pub fn node_bound(&self) -> usize {
        self.nodes.len()
    }

    /// Returns an iterator over all live node IDs in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|_| NodeId(idx)))
    }

    /// Adds an edge from `src` to `dst` carrying `data`.
    ///
    /// If the edge already exists its payload is replaced and the existing ID
    /// is returned; parallel edges are never created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] if either endpoint is not a live node.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, data: E) -> Result<EdgeId> {
        if !self.contains_node(src) {
            return Err(Error::NodeNotFound(src));
        }
        if !self.contains_node(dst) {
            return Err(Error::NodeNotFound(dst));
        }
        if let Some(existing) = self.edge_between(src, dst) {
            if let Some(record) = self.edges[existing.index()].as_mut() {
                record.data = data;
            }
            return Ok(existing);
        }
        let id = EdgeId(self.edges.len());
        self.edges.push(Some(EdgeRecord { src, dst, data }));
        self.succs[src.index()].push(id);
        self.preds[dst.index()].push(id);
        self.live_edges += 1;
        Ok(id)
    }

    /// Removes the edge from `src` to `dst`, returning its payload if present.
    pub fn remove_edge(&mut self, src: NodeId, dst: NodeId) -> Option<E> {
        let edge = self.edge_between(src, dst)?;
        self.detach_edge(edge)
    }

    /// Returns `true` if an edge from `src` to `dst` exists.
    #[must_use]
    pub fn has_edge(&self, src: NodeId, dst: NodeId) -> bool {
        self.edge_between(src, dst).is_some()
    }

    /// Returns the ID of the edge from `src` to `dst`, if one exists.
    #[must_use]
    pub fn edge_between(&self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        let out = self.succs.get(src.index())?;
        out.iter()
            .copied()
            .find(|&edge| self.edges[edge.index()].as_ref().is_some_and(|r| r.dst == dst))
    }

    /// Returns a reference to an edge's payload.
    #[must_use]
    pub fn edge(&self, edge: EdgeId) -> Option<&E> {
        self.edges
            .get(edge.index())
            .and_then(|slot| slot.as_ref())
            .map(|record| &record.data)
    }

    /// Returns the payload of the edge from `src` to `dst`, if one exists.
    #[must_use]
    pub fn edge_data(&self, src: NodeId, dst: NodeId) -> Option<&E> {
        self.edge_between(src, dst).and_then(|edge| self.edge(edge))
    }

    /// Returns the `(source, target)` endpoints of an edge.
    #[must_use]
    pub fn edge_endpoints(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.edges
            .get(edge.index())
            .and_then(|slot| slot.as_ref())
            .map(|record| (record.src, record.dst))
    }

    /// Returns an iterator over all live edge IDs in ascending order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|_| EdgeId(idx)))
    }

    /// Returns an iterator over all live edges as `(src, dst, payload)` triples,
    /// in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &E)> + '_ {
        self.edges
            .iter()
            .filter_map(|slot| slot.as_ref())
            .map(|record| (record.src, record.dst, &record.data))
    }

    /// Returns an iterator over the successors of `node`, in edge insertion order.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.succs
            .get(node.index())
            .into_iter()
            .flatten()
            .filter_map(|&edge| self.edges[edge.index()].as_ref().map(|r| r.dst))
    }

    /// Returns an iterator over the predecessors of `node`, in edge insertion order.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.preds
            .get(node.index())
            .into_iter()
            .flatten()
            .filter_map(|&edge| self.edges[edge.index()].as_ref().map(|r| r.src))
    }

    /// Returns an iterator over the outgoing edges of `node` as
    /// `(target, payload)` pairs, in insertion order.
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &E)> + '_ {
        self.succs
            .get(node.index())
            .into_iter()
            .flatten()
            .filter_map(|&edge| self.edges[edge.index()].as_ref().map(|r| (r.dst, &r.data)))
    }

    /// Returns an iterator over the incoming edges of `node` as
    /// `(source, payload)` pairs, in insertion order.
    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &E)> + '_ {
        self.preds
            .get(node.index())
            .into_iter()
            .flatten()
            .filter_map(|&edge| self.edges[edge.index()].as_ref().map(|r| (r.src, &r.data)))
    }

    /// Returns the number of outgoing edges of `node`.
    ///
    /// A self-loop counts once.
    #[must_use]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.succs.get(node.index()).map_or(0, Vec::len)
    }

    /// Returns the number of incoming edges of `node`.
    ///
    /// A self-loop counts once.
    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.preds.get(node.index()).map_or(0, Vec::len)
    }

    /// Removes an edge record and unlinks it from both adjacency lists.
    fn detach_edge(&mut self, edge: EdgeId) -> Option<E> {
        let record = self.edges.get_mut(edge.index())?.take()?;
        self.succs[record.src.index()].retain(|&e| e != edge);
        self.preds[record.dst.index()].retain(|&e| e != edge);
        self.live_edges -= 1;
        Some(record.data)
    }
}

impl<N, E: Clone> FlowGraph<N, E> {
    /// Returns a copy of this graph with every node payload mapped through `f`.
    ///
    /// Node and edge IDs are preserved, including tombstoned slots, so IDs
    /// valid in `self` remain valid in the returned graph.
    #[must_use]
    pub fn map_nodes<N2>(&self, mut f: impl FnMut(&N) -> N2) -> FlowGraph<N2, E> {
        FlowGraph {
            nodes: self
                .nodes
                .iter()
                .map(|slot| slot.as_ref().map(&mut f))
                .collect(),
            edges: self.edges.clone(),
            succs: self.succs.clone(),
            preds: self.preds.clone(),
            live_nodes: self.live_nodes,
            live_edges: self.live_edges,
        }
    }
}

impl<N, E> FlowGraph<N, E> {
    /// Returns a copy of this graph with node payloads mapped through `f`
    /// and edge payloads mapped through `g`.
    ///
    /// Like [`FlowGraph::map_nodes`], IDs are preserved including
    /// tombstoned slots.
    #[must_use]
    pub fn map<N2, E2>(
        &self,
        mut f: impl FnMut(&N) -> N2,
        mut g: impl FnMut(&E) -> E2,
    ) -> FlowGraph<N2, E2> {
        FlowGraph {
            nodes: self
                .nodes
                .iter()
                .map(|slot| slot.as_ref().map(&mut f))
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|slot| {
                    slot.as_ref().map(|record| EdgeRecord {
                        src: record.src,
                        dst: record.dst,
                        data: g(&record.data),
                    })
                })
                .collect(),
            succs: self.succs.clone(),
            preds: self.preds.clone(),
            live_nodes: self.live_nodes,
            live_edges: self.live_edges,
        }
    }
}

impl<N, E> GraphBase for FlowGraph<N, E> {
    fn node_bound(&self) -> usize {
        self.nodes.len()
    }

    fn node_count(&self) -> usize {
        self.live_nodes
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        FlowGraph::node_ids(self)
    }
}

impl<N, E> Successors for FlowGraph<N, E> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        FlowGraph::successors(self, node)
    }
}

impl<N, E> Predecessors for FlowGraph<N, E> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        FlowGraph::predecessors(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> (FlowGraph<&'static str, u32>, [NodeId; 4]) {
        let mut graph = FlowGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        let d = graph.add_node("d");
        graph.add_edge(a, b, 1).unwrap();
        graph.add_edge(a, c, 2).unwrap();
        graph.add_edge(b, d, 3).unwrap();
        graph.add_edge(c, d, 4).unwrap();
        (graph, [a, b, c, d])
    }

    #[test]
    fn test_empty_graph() {
        let graph: FlowGraph<(), ()> = FlowGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_bound(), 0);
    }

    #[test]
    fn test_add_nodes_and_edges() {
        let (graph, [a, b, c, d]) = diamond();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(graph.predecessors(d).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(graph.out_degree(a), 2);
        assert_eq!(graph.in_degree(d), 2);
        assert_eq!(graph.node(c), Some(&"c"));
    }

    #[test]
    fn test_add_edge_missing_endpoint() {
        let mut graph: FlowGraph<(), ()> = FlowGraph::new();
        let a = graph.add_node(());
        let ghost = NodeId::new(7);
        assert!(graph.add_edge(a, ghost, ()).is_err());
        assert!(graph.add_edge(ghost, a, ()).is_err());
    }

    #[test]
    fn test_add_edge_replaces_payload() {
        let mut graph: FlowGraph<(), u32> = FlowGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let first = graph.add_edge(a, b, 1).unwrap();
        let second = graph.add_edge(a, b, 2).unwrap();
        assert_eq!(first, second);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_data(a, b), Some(&2));
    }

    #[test]
    fn test_remove_edge() {
        let (mut graph, [a, b, _, _]) = diamond();
        assert_eq!(graph.remove_edge(a, b), Some(1));
        assert!(!graph.has_edge(a, b));
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.remove_edge(a, b), None);
    }

    #[test]
    fn test_remove_node_detaches_edges() {
        let (mut graph, [a, b, c, d]) = diamond();
        assert_eq!(graph.remove_node(b), Some("b"));
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![c]);
        assert_eq!(graph.predecessors(d).collect::<Vec<_>>(), vec![c]);
        assert!(!graph.contains_node(b));
    }

    #[test]
    fn test_node_ids_stable_across_removal() {
        let (mut graph, [a, b, c, d]) = diamond();
        graph.remove_node(b);
        assert_eq!(graph.node_ids().collect::<Vec<_>>(), vec![a, c, d]);
        assert_eq!(graph.node_bound(), 4);
        // a fresh node reuses no slot
        let e = graph.add_node("e");
        assert_eq!(e.index(), 4);
    }

    #[test]
    fn test_self_loop_degrees() {
        let mut graph: FlowGraph<(), ()> = FlowGraph::new();
        let a = graph.add_node(());
        graph.add_edge(a, a, ()).unwrap();
        assert_eq!(graph.out_degree(a), 1);
        assert_eq!(graph.in_degree(a), 1);
        assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn test_remove_node_with_self_loop() {
        let mut graph: FlowGraph<(), ()> = FlowGraph::new();
        let a = graph.add_node(());
        graph.add_edge(a, a, ()).unwrap();
        graph.remove_node(a);
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_find_node() {
        let (graph, [_, _, c, _]) = diamond();
        assert_eq!(graph.find_node(|n| *n == "c"), Some(c));
        assert_eq!(graph.find_node(|n| *n == "zz"), None);
    }

    #[test]
    fn test_edges_iterator_order() {
        let (graph, [a, b, c, d]) = diamond();
        let triples: Vec<_> = graph.edges().map(|(s, t, w)| (s, t, *w)).collect();
        assert_eq!(triples, vec![(a, b, 1), (a, c, 2), (b, d, 3), (c, d, 4)]);
    }

    #[test]
    fn test_map_nodes_preserves_ids() {
        let (graph, [a, _, _, d]) = diamond();
        let mapped = graph.map_nodes(|name| name.len());
        assert_eq!(mapped.node(a), Some(&1));
        assert!(mapped.has_edge(a, NodeId::new(1)));
        assert_eq!(mapped.node_count(), 4);
        assert_eq!(mapped.in_degree(d), 2);
    }

    #[test]
    fn test_reversed_view() {
        let (graph, [a, b, _, d]) = diamond();
        let rev = Reversed(&graph);
        assert_eq!(
            Successors::successors(&rev, d).collect::<Vec<_>>(),
            vec![b, NodeId::new(2)]
        );
        assert_eq!(Predecessors::predecessors(&rev, b).collect::<Vec<_>>(), vec![d]);
        assert_eq!(rev.node_count(), 4);
        let _ = a;
    }
}
