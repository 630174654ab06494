//! # cfg-regions Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits from the cfg-regions library. Import this module to get quick
//! access to the essential types for region identification.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cfg-regions operations
pub use crate::Error;

/// The result type used throughout cfg-regions
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Main entry point for region identification
pub use crate::regions::RegionIdentifier;

/// Tunables for region identification
pub use crate::regions::RegionIdentifierOptions;

// ================================================================================================
// Blocks
// ================================================================================================

/// A basic block of a control flow graph
pub use crate::block::Block;

/// The arena owning every basic block of an analysis
pub use crate::block::BlockArena;

/// Handle to a basic block stored in a [`BlockArena`]
pub use crate::block::BlockId;

/// Entry, exit, and merge markers carried by a [`Block`]
pub use crate::block::BlockFlags;

/// A single decoded instruction inside a [`Block`]
pub use crate::block::Statement;

// ================================================================================================
// Graphs
// ================================================================================================

/// The directed graph container every analysis works on
pub use crate::graph::FlowGraph;

/// Handle to a node of a [`FlowGraph`]
pub use crate::graph::NodeId;

/// Handle to an edge of a [`FlowGraph`]
pub use crate::graph::EdgeId;

/// Classification of a control-flow transfer
pub use crate::graph::EdgeKind;

// ================================================================================================
// Regions
// ================================================================================================

/// The input graph type of region identification
pub use crate::regions::ControlFlowGraph;

/// One node of the region tree
pub use crate::regions::Region;

/// Handle to a region stored in a [`RegionArena`]
pub use crate::regions::RegionId;

/// The arena owning every region of an analysis
pub use crate::regions::RegionArena;

/// A node payload of a structuring work graph
pub use crate::regions::RegionNode;

/// An edge payload of a structuring work graph
pub use crate::regions::RegionEdge;

/// The graph type structuring operates on
pub use crate::regions::RegionGraph;
