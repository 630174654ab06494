//! Region tree data model.
//!
//! Structuring rewrites a working graph whose nodes are [`RegionNode`]s:
//! initially every node refers to a [`Block`](crate::Block), and each
//! abstraction step replaces a group of nodes with a single node referring to
//! a [`Region`]. Regions own payload-level snapshots of the subgraphs they
//! replaced, so the final result is a tree: the root region's graph contains
//! region nodes, whose regions contain further region nodes, down to leaf
//! blocks.

use std::fmt;

use crate::block::{BlockArena, BlockId};
use crate::graph::{EdgeKind, FlowGraph};

/// A node payload of a structuring work graph: either a leaf basic block or
/// an already-collapsed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionNode {
    /// A basic block, referenced by its arena handle.
    Block(BlockId),
    /// A collapsed region, referenced by its arena handle.
    Region(RegionId),
}

impl fmt::Display for RegionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionNode::Block(id) => write!(f, "{id}"),
            RegionNode::Region(id) => write!(f, "{id}"),
        }
    }
}

/// Edge payload of a structuring work graph.
///
/// Carries the original [`EdgeKind`] and, for edges re-targeted at a cyclic
/// region node, the node inside the region the edge originally pointed at.
/// That distinction separates normal entries (into the loop head) from
/// abnormal entries (into the middle of the loop body).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionEdge {
    /// Classification of the underlying control-flow transfer.
    pub kind: EdgeKind,
    /// For an abnormal entry edge into a cyclic region: the in-region node
    /// the edge targeted before abstraction. `None` everywhere else.
    pub region_dst: Option<RegionNode>,
}

impl RegionEdge {
    /// Creates a plain flow edge.
    #[must_use]
    pub fn flow() -> Self {
        RegionEdge {
            kind: EdgeKind::Flow,
            region_dst: None,
        }
    }
}

impl From<EdgeKind> for RegionEdge {
    fn from(kind: EdgeKind) -> Self {
        RegionEdge {
            kind,
            region_dst: None,
        }
    }
}

/// The graph type structuring operates on and region snapshots are stored as.
pub type RegionGraph = FlowGraph<RegionNode, RegionEdge>;

/// A strongly-typed handle to a [`Region`] stored in a [`RegionArena`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub(crate) usize);

impl RegionId {
    /// Returns the raw index of this handle.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionId({})", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A cyclic (loop) region.
#[derive(Debug, Clone)]
pub struct CyclicRegion {
    /// The loop head. All normal entries into the region target this node.
    pub head: RegionNode,
    /// The loop body: all loop nodes and the edges among them, including the
    /// back edges into the head.
    pub graph: RegionGraph,
    /// The body plus the edges leaving the loop towards its exits.
    pub graph_with_successors: RegionGraph,
    /// Snapshot of the loop's full neighborhood: body nodes, entry and exit
    /// neighbors, and every edge touching the loop.
    pub full_graph: RegionGraph,
    /// The exit nodes of the loop. The normal exit, when one exists, comes
    /// first; the rest are abnormal exits.
    pub successors: Vec<RegionNode>,
}

/// An acyclic single-entry region.
#[derive(Debug, Clone)]
pub struct AcyclicRegion {
    /// The sole entry node of the region.
    pub head: RegionNode,
    /// The nodes of the region and the edges among them.
    pub graph: RegionGraph,
    /// The nodes control reaches when it leaves the region. Initially the
    /// dominance frontier the region was carved out against; processing of an
    /// enclosing region may extend it.
    pub successors: Vec<RegionNode>,
    /// The region graph extended with the edges to the successors, when the
    /// region was carved out of a larger graph. `None` for the residue region
    /// wrapping an unstructurable remainder.
    pub graph_with_successors: Option<RegionGraph>,
}

/// One node of the region tree.
///
/// A region's head is either a block or another region, so arbitrarily deep
/// nesting is expressed by [`RegionNode::Region`] payloads inside the graphs.
#[derive(Debug, Clone)]
pub enum Region {
    /// A single basic block wrapped as a region.
    Block(BlockId),
    /// A loop.
    Cyclic(CyclicRegion),
    /// An acyclic single-entry subgraph.
    Acyclic(AcyclicRegion),
}

impl Region {
    /// Returns the head node of the region.
    ///
    /// For a leaf the head is the block itself.
    #[must_use]
    pub fn head(&self) -> RegionNode {
        match self {
            Region::Block(block) => RegionNode::Block(*block),
            Region::Cyclic(region) => region.head,
            Region::Acyclic(region) => region.head,
        }
    }

    /// Returns `true` if this region is a loop.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        matches!(self, Region::Cyclic(_))
    }

    /// Returns the internal graph of the region, if it has one.
    ///
    /// Leaf regions have no graph.
    #[must_use]
    pub fn graph(&self) -> Option<&RegionGraph> {
        match self {
            Region::Block(_) => None,
            Region::Cyclic(region) => Some(&region.graph),
            Region::Acyclic(region) => Some(&region.graph),
        }
    }

    /// Returns the successor nodes of the region.
    ///
    /// For a cyclic region these are the loop exits, normal exit first. For
    /// an acyclic region they are the frontier the region was carved out
    /// against. Leaf regions have none.
    #[must_use]
    pub fn successors(&self) -> &[RegionNode] {
        match self {
            Region::Block(_) => &[],
            Region::Cyclic(region) => &region.successors,
            Region::Acyclic(region) => &region.successors,
        }
    }
}

/// Owning storage for all [`Region`]s produced by one analysis.
#[derive(Debug, Clone, Default)]
pub struct RegionArena {
    regions: Vec<Region>,
}

impl RegionArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        RegionArena {
            regions: Vec::new(),
        }
    }

    /// Adds a region and returns its handle.
    pub fn add(&mut self, region: Region) -> RegionId {
        let id = RegionId(self.regions.len());
        self.regions.push(region);
        id
    }

    /// Returns the region behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this arena.
    #[must_use]
    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    /// Returns a mutable reference to the region behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this arena.
    pub fn region_mut(&mut self, id: RegionId) -> &mut Region {
        &mut self.regions[id.index()]
    }

    /// Returns the number of regions in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if the arena holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Returns an iterator over all `(handle, region)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (RegionId, &Region)> + '_ {
        self.regions
            .iter()
            .enumerate()
            .map(|(idx, region)| (RegionId(idx), region))
    }
}

/// Resolves the address a graph node stands for, chasing region heads until
/// a leaf block is reached.
pub(crate) fn node_addr(node: RegionNode, regions: &RegionArena, blocks: &BlockArena) -> u64 {
    let mut node = node;
    loop {
        match node {
            RegionNode::Block(block) => return blocks.block(block).addr(),
            RegionNode::Region(region) => node = regions.region(region).head(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_node_display() {
        assert_eq!(RegionNode::Block(BlockId(3)).to_string(), "b3");
        assert_eq!(RegionNode::Region(RegionId(1)).to_string(), "r1");
    }

    #[test]
    fn test_leaf_region_head() {
        let region = Region::Block(BlockId(7));
        assert_eq!(region.head(), RegionNode::Block(BlockId(7)));
        assert!(!region.is_cyclic());
        assert!(region.graph().is_none());
        assert!(region.successors().is_empty());
    }

    #[test]
    fn test_arena_roundtrip() {
        let mut arena = RegionArena::new();
        let id = arena.add(Region::Block(BlockId(0)));
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.region(id).head(), RegionNode::Block(BlockId(0)));
        assert_eq!(arena.iter().count(), 1);
    }

    #[test]
    fn test_region_edge_flow() {
        let edge = RegionEdge::flow();
        assert_eq!(edge.kind, EdgeKind::Flow);
        assert!(edge.region_dst.is_none());
        let from_kind: RegionEdge = EdgeKind::Call.into();
        assert_eq!(from_kind.kind, EdgeKind::Call);
    }
}
