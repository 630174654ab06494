// Copyright 2026 the cfg-regions contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::too_many_arguments)]

//! # cfg-regions
//!
//! [![Crates.io](https://img.shields.io/crates/v/cfg-regions.svg)](https://crates.io/crates/cfg-regions)
//! [![Documentation](https://docs.rs/cfg-regions/badge.svg)](https://docs.rs/cfg-regions)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/binflip/cfg-regions/blob/main/LICENSE)
//!
//! Region identification for binary control-flow graphs. `cfg-regions`
//! recovers the nested single-entry regions — loops, branches, sequences —
//! that a decompiler's structuring stage turns back into `if`/`else` and
//! loop statements.
//!
//! ## Features
//!
//! - **Supergraph construction** - folds call sites and `fake_return` edges
//!   out of interprocedural control flow
//! - **Loop structuring** - natural loops are abstracted innermost-first,
//!   with refined bodies and normal/abnormal entry and exit classification
//! - **Acyclic structuring** - single-entry, single-successor subgraphs are
//!   carved out along the post-dominator tree
//! - **Graph toolbox** - dominator trees, dominance frontiers, DFS orders,
//!   and graph slicing over a compact arena-backed digraph
//! - **Deterministic** - identical inputs produce identical region trees
//!
//! ## Quick Start
//!
//! Add `cfg-regions` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! cfg-regions = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! For convenient access to the most commonly used types, import the prelude:
//!
//! ```rust
//! use cfg_regions::prelude::*;
//!
//! let mut blocks = BlockArena::new();
//! let mut graph = FlowGraph::new();
//! let entry = graph.add_node(blocks.add(Block::new(0x1000)));
//! let exit = graph.add_node(blocks.add(Block::new(0x1010)));
//! graph.add_edge(entry, exit, EdgeKind::Flow)?;
//!
//! let ri = RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default())?;
//! assert_eq!(ri.head_block(ri.root(), &blocks).addr(), 0x1000);
//! # Ok::<(), cfg_regions::Error>(())
//! ```
//!
//! ### Basic Usage
//!
//! ```rust
//! use cfg_regions::{
//!     graph::EdgeKind,
//!     regions::{Region, RegionIdentifier, RegionIdentifierOptions},
//!     Block, BlockArena, FlowGraph,
//! };
//!
//! // while (cond) { body } tail
//! let mut blocks = BlockArena::new();
//! let mut graph = FlowGraph::new();
//! let entry = graph.add_node(blocks.add(Block::new(0x1000)));
//! let cond = graph.add_node(blocks.add(Block::new(0x1004)));
//! let body = graph.add_node(blocks.add(Block::new(0x1008)));
//! let tail = graph.add_node(blocks.add(Block::new(0x100c)));
//! graph.add_edge(entry, cond, EdgeKind::Flow)?;
//! graph.add_edge(cond, body, EdgeKind::Flow)?;
//! graph.add_edge(body, cond, EdgeKind::Flow)?;
//! graph.add_edge(cond, tail, EdgeKind::Flow)?;
//!
//! let ri = RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default())?;
//! let loops = ri
//!     .regions()
//!     .iter()
//!     .filter(|(_, region)| region.is_cyclic())
//!     .count();
//! assert_eq!(loops, 1);
//! # Ok::<(), cfg_regions::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`graph`] - the [`FlowGraph`] container and its algorithms (dominators,
//!   traversal orders, slicing)
//! - [`block`] - basic blocks and the arena that owns them
//! - [`regions`] - supergraph construction, cyclic and acyclic structuring,
//!   and the [`RegionIdentifier`](regions::RegionIdentifier) driver
//!
//! All analyses report failures through the crate-wide [`Error`] type.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust
/// use cfg_regions::prelude::*;
///
/// let mut blocks = BlockArena::new();
/// let graph: FlowGraph<BlockId, EdgeKind> = FlowGraph::new();
/// assert!(matches!(
///     RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default()),
///     Err(Error::EmptyGraph)
/// ));
/// ```
pub mod prelude;

/// Basic blocks and the arena that owns them.
///
/// A [`Block`] models one straight-line run of instructions: a start address,
/// an optional disambiguating index, the decoded [`block::Statement`]s, and
/// [`block::BlockFlags`] marking entry points, exit points, and merged
/// blocks. Blocks live in a [`BlockArena`] and are referenced everywhere else
/// by [`BlockId`] handles.
pub mod block;

/// Directed graph container and control-flow algorithms.
///
/// [`FlowGraph`] is an arena-backed digraph with stable node handles and
/// deterministic insertion-ordered adjacency. The [`graph::algorithms`]
/// submodule provides the analyses region identification is built on:
///
/// - [`graph::algorithms::compute_dominators`] /
///   [`graph::algorithms::compute_postdominators`] - Lengauer-Tarjan
///   dominator trees
/// - [`graph::algorithms::compute_dominance_frontiers`] - per-node dominance
///   frontiers
/// - [`graph::algorithms::postorder`] / [`graph::algorithms::dfs_back_edges`]
///   / [`graph::algorithms::quasi_topological_order_subset`] - traversal
///   orders
/// - [`graph::algorithms::slice_between`] - the subgraph between a source and
///   a frontier
pub mod graph;

/// Region identification: structuring a control flow graph into a tree of
/// single-entry regions.
///
/// The entry point is [`regions::RegionIdentifier::analyze`], which collapses
/// the input into a supergraph, abstracts natural loops into
/// [`regions::CyclicRegion`]s, carves the acyclic remainder into
/// [`regions::AcyclicRegion`]s, and returns the resulting region tree.
pub mod regions;

/// `cfg-regions` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is
/// always [`Error`]. Used consistently throughout the crate for all fallible
/// operations.
pub use error::Result;

/// `cfg-regions` Error type
///
/// The main error type for all operations in this crate. Provides detailed
/// error information for graph construction and region identification.
///
/// # Examples
///
/// ```rust
/// use cfg_regions::{
///     regions::{RegionIdentifier, RegionIdentifierOptions},
///     BlockArena, Error, FlowGraph,
/// };
///
/// let mut blocks = BlockArena::new();
/// let graph = FlowGraph::new();
/// match RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default()) {
///     Err(Error::EmptyGraph) => println!("nothing to structure"),
///     Err(e) => println!("error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
pub use error::Error;

/// Basic block types, re-exported for convenience.
///
/// See [`block`] for the full module documentation.
pub use block::{Block, BlockArena, BlockFlags, BlockId, Statement};

/// The directed graph container and its handle types, re-exported for
/// convenience.
///
/// See [`graph`] for the full module documentation.
pub use graph::{EdgeId, EdgeKind, FlowGraph, NodeId};
