//! Region identification for control flow graphs.
//!
//! This is the structuring front end of a decompiler: it partitions a
//! function's control flow graph into a tree of single-entry regions, the
//! shape a structuring algorithm needs to emit `if`/`else` and loop
//! constructs. The entry point is [`RegionIdentifier::analyze`].
//!
//! The analysis proceeds in three stages:
//!
//! 1. the graph is collapsed into its supergraph, folding away call sites
//!    and `fake_return` plumbing;
//! 2. every natural loop is abstracted into a [`CyclicRegion`], innermost
//!    loops first, with entry and exit edges classified as normal or
//!    abnormal;
//! 3. the acyclic remainder of each loop body and of the top-level graph is
//!    repeatedly carved into [`AcyclicRegion`]s at single-entry,
//!    single-successor subgraphs, using dominator and post-dominator trees.
//!
//! Whatever cannot be structured is wrapped into a final residue region, so
//! every analysis that succeeds yields a single root.
//!
//! # Examples
//!
//! ```rust
//! use cfg_regions::{
//!     graph::EdgeKind,
//!     regions::{RegionIdentifier, RegionIdentifierOptions},
//!     Block, BlockArena, FlowGraph,
//! };
//!
//! let mut blocks = BlockArena::new();
//! let mut graph = FlowGraph::new();
//! let head = graph.add_node(blocks.add(Block::new(0x1000)));
//! let left = graph.add_node(blocks.add(Block::new(0x1004)));
//! let right = graph.add_node(blocks.add(Block::new(0x1008)));
//! let join = graph.add_node(blocks.add(Block::new(0x100c)));
//! graph.add_edge(head, left, EdgeKind::Flow)?;
//! graph.add_edge(head, right, EdgeKind::Flow)?;
//! graph.add_edge(left, join, EdgeKind::Flow)?;
//! graph.add_edge(right, join, EdgeKind::Flow)?;
//!
//! let ri = RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default())?;
//! assert_eq!(ri.head_block(ri.root(), &blocks).addr(), 0x1000);
//! # Ok::<(), cfg_regions::Error>(())
//! ```

mod acyclic;
mod cyclic;
mod identifier;
mod region;
mod supergraph;

use crate::block::BlockId;
use crate::graph::{EdgeKind, FlowGraph};

pub use identifier::{RegionIdentifier, RegionIdentifierOptions};
pub use region::{
    AcyclicRegion, CyclicRegion, Region, RegionArena, RegionEdge, RegionGraph, RegionId,
    RegionNode,
};

/// The input graph type of region identification: nodes are basic blocks,
/// edges carry their control-flow classification.
pub type ControlFlowGraph = FlowGraph<BlockId, EdgeKind>;
