//! Edge identifier and edge classification for control-flow graphs.
//!
//! This module provides [`EdgeId`], a strongly-typed identifier for edges within
//! a [`FlowGraph`](crate::graph::FlowGraph), and [`EdgeKind`], the classification
//! of control-flow transfers that the supergraph preprocessing pass keys on.

use std::fmt;

/// A strongly-typed identifier for edges within a [`FlowGraph`](crate::graph::FlowGraph).
///
/// `EdgeId` wraps a `usize` index. IDs are assigned sequentially starting from 0
/// as edges are added and, like [`NodeId`](crate::graph::NodeId), remain stable
/// across removals.
///
/// # Examples
///
/// ```rust
/// use cfg_regions::graph::{EdgeId, FlowGraph};
///
/// let mut graph: FlowGraph<&str, &str> = FlowGraph::new();
/// let a = graph.add_node("A");
/// let b = graph.add_node("B");
/// let edge: EdgeId = graph.add_edge(a, b, "A->B").unwrap();
/// assert_eq!(graph.edge(edge), Some(&"A->B"));
/// assert_eq!(graph.edge_endpoints(edge), Some((a, b)));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    /// Creates a new `EdgeId` from a raw index value.
    ///
    /// Primarily intended for internal use and testing. Normal usage should
    /// obtain IDs from [`FlowGraph::add_edge`](crate::graph::FlowGraph::add_edge).
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        EdgeId(index)
    }

    /// Returns the raw index value of this edge identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl From<usize> for EdgeId {
    #[inline]
    fn from(index: usize) -> Self {
        EdgeId(index)
    }
}

impl From<EdgeId> for usize {
    #[inline]
    fn from(edge: EdgeId) -> Self {
        edge.0
    }
}

/// Classification of a control-flow transfer between two basic blocks.
///
/// Lifted control-flow graphs distinguish ordinary jumps from the edge pair a
/// call site produces: the transfer into the callee and the synthesized edge
/// from the call site to the instruction the callee returns to. Supergraph
/// construction ([`RegionIdentifier`](crate::regions::RegionIdentifier) runs it
/// before structuring) collapses the latter two kinds so that region analysis
/// sees intraprocedural flow only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeKind {
    /// An ordinary intraprocedural transfer: fallthrough, jump, or branch arm.
    #[default]
    Flow,
    /// A transfer into a callee function.
    Call,
    /// A synthesized edge from a call site to its return target.
    FakeReturn,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Flow => write!(f, "flow"),
            EdgeKind::Call => write!(f, "call"),
            EdgeKind::FakeReturn => write!(f, "fake_return"),
        }
    }
}
