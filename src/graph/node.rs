//! Node identifier type for control-flow graphs.
//!
//! This module provides [`NodeId`], a strongly-typed handle for nodes stored in a
//! [`FlowGraph`](crate::graph::FlowGraph). The newtype wrapper keeps node indices
//! from being confused with block addresses or other integer values floating
//! around a control-flow analysis.

use std::fmt;

/// A strongly-typed identifier for nodes within a [`FlowGraph`](crate::graph::FlowGraph).
///
/// `NodeId` wraps a `usize` index. IDs are assigned sequentially starting from 0
/// as nodes are added, and remain stable across node removals: deleting a node
/// never renumbers the survivors, so analyses can cache IDs while a graph is
/// being rewritten.
///
/// # Usage
///
/// Node IDs are created by [`FlowGraph::add_node`](crate::graph::FlowGraph::add_node)
/// and should not normally be constructed by hand. They are used to:
///
/// - Reference endpoints when adding edges
/// - Look up node payloads
/// - Index per-node analysis results (dominator trees, orderings)
///
/// # Examples
///
/// ```rust
/// use cfg_regions::graph::{FlowGraph, NodeId};
///
/// let mut graph: FlowGraph<&str, ()> = FlowGraph::new();
/// let a: NodeId = graph.add_node("A");
/// let b: NodeId = graph.add_node("B");
/// assert_ne!(a, b);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw index value.
    ///
    /// Primarily intended for internal use and testing. Normal usage should
    /// obtain IDs from [`FlowGraph::add_node`](crate::graph::FlowGraph::add_node).
    ///
    /// # Arguments
    ///
    /// * `index` - The raw node index (0-based)
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw index value of this node identifier.
    ///
    /// The index is a 0-based position suitable for indexing per-node side
    /// tables sized by [`GraphBase::node_bound`](crate::graph::GraphBase::node_bound).
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    /// Converts a raw `usize` index into a `NodeId`.
    ///
    /// Provided for convenience; the caller is responsible for ensuring the
    /// index corresponds to an actual node in the graph at hand.
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    /// Extracts the raw index from a `NodeId`.
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_node_id_new_and_index() {
        let node = NodeId::new(42);
        assert_eq!(node.index(), 42);
    }

    #[test]
    fn test_node_id_equality() {
        assert_eq!(NodeId::new(5), NodeId::new(5));
        assert_ne!(NodeId::new(5), NodeId::new(10));
    }

    #[test]
    fn test_node_id_ordering() {
        let mut nodes = vec![NodeId::new(3), NodeId::new(1), NodeId::new(2)];
        nodes.sort();
        assert_eq!(nodes, vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]);
    }

    #[test]
    fn test_node_id_hash() {
        let mut set: HashSet<NodeId> = HashSet::new();
        set.insert(NodeId::new(1));
        set.insert(NodeId::new(2));
        set.insert(NodeId::new(1));

        assert_eq!(set.len(), 2);
        assert!(set.contains(&NodeId::new(1)));
    }

    #[test]
    fn test_node_id_conversions() {
        let node: NodeId = 123usize.into();
        assert_eq!(node.index(), 123);
        let value: usize = node.into();
        assert_eq!(value, 123);
    }

    #[test]
    fn test_node_id_formatting() {
        let node = NodeId::new(42);
        assert_eq!(format!("{node:?}"), "NodeId(42)");
        assert_eq!(format!("{node}"), "n42");
    }
}
