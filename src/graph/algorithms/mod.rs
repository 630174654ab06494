//! Graph algorithms used by region identification.
//!
//! Everything here is generic over the traits in [`crate::graph`] rather than
//! tied to [`FlowGraph`](crate::graph::FlowGraph), so the same code computes
//! forward results on a graph and reverse results on a
//! [`Reversed`](crate::graph::Reversed) view of it.
//!
//! # Contents
//!
//! - [`traversal`] - depth-first postorder and DFS back-edge discovery
//! - [`order`] - strongly connected components and quasi-topological sorting
//! - [`dominators`] - Lengauer-Tarjan dominators, postdominators, and
//!   dominance frontiers
//! - [`slice`] - source-to-frontier graph slicing

pub mod dominators;
pub mod order;
pub mod slice;
pub mod traversal;

pub use dominators::{
    compute_dominance_frontiers, compute_dominators, compute_postdominators, DominatorTree,
};
pub use order::{
    quasi_topological_order, quasi_topological_order_subset, strongly_connected_components,
};
pub use slice::slice_between;
pub use traversal::{dfs_back_edges, postorder, reverse_postorder};
