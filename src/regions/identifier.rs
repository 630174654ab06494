//! The region identification driver.
//!
//! [`RegionIdentifier::analyze`] takes a control flow graph, collapses it
//! into its supergraph, structures every natural loop into a cyclic region
//! (innermost first), structures the acyclic remainder of each loop body and
//! of the top-level graph, and returns the resulting region tree together
//! with a flat per-region listing of block addresses.

use std::collections::HashSet;
use std::mem;

use log::debug;

use crate::block::{Block, BlockArena};
use crate::error::{Error, Result};
use crate::graph::NodeId;
use crate::regions::acyclic::make_acyclic_region;
use crate::regions::cyclic::{find_loop_headers, make_cyclic_region};
use crate::regions::region::{
    node_addr, AcyclicRegion, Region, RegionArena, RegionEdge, RegionId, RegionNode,
};
use crate::regions::supergraph::make_supergraph;
use crate::regions::{ControlFlowGraph, RegionGraph};

/// Tunables for [`RegionIdentifier::analyze`].
#[derive(Debug, Clone)]
pub struct RegionIdentifierOptions {
    /// During loop refinement, when no exit node survives refinement, carve
    /// the largest tree hanging off the loop back out of the loop body and
    /// keep its root as the sole exit.
    pub largest_successor_tree_outside_loop: bool,
    /// Record every successor edge in each region's successor-preserving
    /// view, not just the edges leaving the enclosing graph.
    pub complete_successors: bool,
    /// Address of the function entry block. Used to pick the start node when
    /// every node of the graph has incoming edges.
    pub function_addr: Option<u64>,
}

impl Default for RegionIdentifierOptions {
    fn default() -> Self {
        RegionIdentifierOptions {
            largest_successor_tree_outside_loop: true,
            complete_successors: false,
            function_addr: None,
        }
    }
}

/// Structures a control flow graph into a tree of single-entry regions.
///
/// # Examples
///
/// ```rust
/// use cfg_regions::{
///     graph::EdgeKind,
///     regions::{RegionIdentifier, RegionIdentifierOptions},
///     Block, BlockArena, FlowGraph,
/// };
///
/// let mut blocks = BlockArena::new();
/// let mut graph = FlowGraph::new();
/// let a = graph.add_node(blocks.add(Block::new(0x1000)));
/// let b = graph.add_node(blocks.add(Block::new(0x1004)));
/// graph.add_edge(a, b, EdgeKind::Flow)?;
///
/// let ri = RegionIdentifier::analyze(&graph, &mut blocks, RegionIdentifierOptions::default())?;
/// assert_eq!(ri.head_block(ri.root(), &blocks).addr(), 0x1000);
/// # Ok::<(), cfg_regions::Error>(())
/// ```
#[derive(Debug)]
pub struct RegionIdentifier {
    regions: RegionArena,
    root: RegionId,
    regions_by_block_addrs: Vec<Vec<u64>>,
}

impl RegionIdentifier {
    /// Runs region identification over `graph`.
    ///
    /// The graph is not modified; supergraph contraction may allocate merged
    /// blocks in `blocks`. Returns [`Error::EmptyGraph`] when `graph` has no
    /// nodes (or no nodes survive supergraph contraction) and
    /// [`Error::NoStartNode`] when no entry node can be determined.
    pub fn analyze(
        graph: &ControlFlowGraph,
        blocks: &mut BlockArena,
        options: RegionIdentifierOptions,
    ) -> Result<Self> {
        if graph.is_empty() {
            return Err(Error::EmptyGraph);
        }

        let mut cfg = graph.clone();
        make_supergraph(&mut cfg, blocks)?;
        if cfg.is_empty() {
            return Err(Error::EmptyGraph);
        }

        let mut regions = RegionArena::new();
        let mut working: RegionGraph = cfg.map(
            |&block| RegionNode::Block(block),
            |&kind| RegionEdge {
                kind,
                region_dst: None,
            },
        );

        let start = Self::start_node(&working, &options, &regions, blocks)?;
        let mut headers = find_loop_headers(&working, start);
        debug!("Found {} loop header(s)", headers.len());

        // Structure loops innermost first. Every successful abstraction
        // invalidates the header order, so rescan from scratch after each.
        let mut queued: Vec<RegionId> = Vec::new();
        let mut structured: HashSet<NodeId> = HashSet::new();
        'restart: loop {
            let start = Self::start_node(&working, &options, &regions, blocks)?;

            let snapshot: Vec<NodeId> = headers.iter().rev().copied().collect();
            for header in snapshot {
                if structured.contains(&header) || !working.contains_node(header) {
                    continue;
                }
                match make_cyclic_region(
                    &mut working,
                    header,
                    start,
                    &headers,
                    &options,
                    &mut regions,
                    blocks,
                )? {
                    None => {
                        debug!("Failed to structure the loop at {header}, dropping its header");
                        headers.retain(|&h| h != header);
                    }
                    Some(region_id) => {
                        debug!("Structured a loop region {region_id}");
                        queued.push(region_id);
                        structured.insert(header);
                        continue 'restart;
                    }
                }
            }
            break;
        }
        debug!("Identified {} loop region(s)", queued.len());

        // Structure the acyclic interior of each loop body.
        for region_id in queued {
            let (head_payload, mut body, mut gws) = match regions.region_mut(region_id) {
                Region::Cyclic(region) => (
                    region.head,
                    mem::take(&mut region.graph),
                    mem::take(&mut region.graph_with_successors),
                ),
                _ => return Err(malformed_error!("{region_id} is not a cyclic region")),
            };
            let head_addr = node_addr(head_payload, &regions, blocks);
            let Some(mut head) = body.find_node(|&p| p == head_payload) else {
                return Err(malformed_error!(
                    "loop head {head_addr:#x} is missing from the body of {region_id}"
                ));
            };

            let mut failed = HashSet::new();
            while make_acyclic_region(
                head,
                &mut body,
                Some(&mut gws),
                &mut failed,
                true,
                &mut regions,
                &options,
            )? {
                if !body.contains_node(head) {
                    head = Self::node_by_addr(&body, head_addr, &regions, blocks)?;
                }
            }
            head = Self::node_by_addr(&body, head_addr, &regions, blocks)?;

            let new_head = *body
                .node(head)
                .ok_or_else(|| malformed_error!("loop head {head_addr:#x} vanished"))?;
            if let Region::Cyclic(region) = regions.region_mut(region_id) {
                region.head = new_head;
                region.graph = body;
                region.graph_with_successors = gws;
            }
        }

        // Structure the top-level graph.
        debug!("No more loops left, structuring the top-level graph");
        let mut head = Self::start_node(&working, &options, &regions, blocks)?;
        let head_addr = node_addr(
            *working
                .node(head)
                .ok_or_else(|| malformed_error!("start node {head} is not in the graph"))?,
            &regions,
            blocks,
        );
        let mut failed = HashSet::new();
        while make_acyclic_region(
            head,
            &mut working,
            None,
            &mut failed,
            false,
            &mut regions,
            &options,
        )? {
            if !working.contains_node(head) {
                head = Self::node_by_addr(&working, head_addr, &regions, blocks)?;
            }
        }

        let root = if working.node_count() == 1 {
            let only = working
                .node_ids()
                .next()
                .ok_or_else(|| malformed_error!("single-node graph with no nodes"))?;
            match working.node(only) {
                Some(&RegionNode::Region(region_id)) => region_id,
                _ => Self::wrap_residue(working, &options, &mut regions, blocks)?,
            }
        } else {
            Self::wrap_residue(working, &options, &mut regions, blocks)?
        };

        let regions_by_block_addrs = Self::flatten(root, &regions, blocks);
        Ok(RegionIdentifier {
            regions,
            root,
            regions_by_block_addrs,
        })
    }

    /// Handle of the root of the region tree.
    #[must_use]
    pub fn root(&self) -> RegionId {
        self.root
    }

    /// Looks up a region of the tree.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this analysis.
    #[must_use]
    pub fn region(&self, id: RegionId) -> &Region {
        self.regions.region(id)
    }

    /// The arena holding every region of the tree.
    #[must_use]
    pub fn regions(&self) -> &RegionArena {
        &self.regions
    }

    /// Per-region block address groups, breadth-first from the root.
    ///
    /// Each group lists the addresses of the blocks directly inside one
    /// region; a nested region contributes the address of its head, once,
    /// to the group of the first region it appears in.
    #[must_use]
    pub fn regions_by_block_addrs(&self) -> &[Vec<u64>] {
        &self.regions_by_block_addrs
    }

    /// Addresses of every leaf block inside `id`, recursively.
    #[must_use]
    pub fn block_addrs(&self, id: RegionId, blocks: &BlockArena) -> Vec<u64> {
        let mut addrs = Vec::new();
        let mut stack = vec![id];
        let mut seen = HashSet::new();
        while let Some(region_id) = stack.pop() {
            if !seen.insert(region_id) {
                continue;
            }
            let region = self.regions.region(region_id);
            let Some(graph) = region.graph() else {
                if let RegionNode::Block(block) = region.head() {
                    addrs.push(blocks.block(block).addr());
                }
                continue;
            };
            for node in graph.node_ids() {
                match graph.node(node) {
                    Some(&RegionNode::Block(block)) => {
                        addrs.push(blocks.block(block).addr());
                    }
                    Some(&RegionNode::Region(child)) => stack.push(child),
                    None => {}
                }
            }
        }
        addrs
    }

    /// The leaf block at the head of `id`, chasing nested region heads.
    #[must_use]
    pub fn head_block<'a>(&self, id: RegionId, blocks: &'a BlockArena) -> &'a Block {
        let mut node = self.regions.region(id).head();
        loop {
            match node {
                RegionNode::Block(block) => return blocks.block(block),
                RegionNode::Region(region) => node = self.regions.region(region).head(),
            }
        }
    }

    /// Tests whether `graph` contracts to a single node under repeated
    /// self-loop removal and single-predecessor merging.
    pub fn is_reducible(graph: &ControlFlowGraph, blocks: &mut BlockArena) -> Result<bool> {
        crate::regions::supergraph::is_reducible(graph, blocks)
    }

    /// Picks the entry node: the first node without incoming edges, falling
    /// back to the node at the configured function address.
    fn start_node(
        graph: &RegionGraph,
        options: &RegionIdentifierOptions,
        regions: &RegionArena,
        blocks: &BlockArena,
    ) -> Result<NodeId> {
        if let Some(node) = graph.node_ids().find(|&n| graph.in_degree(n) == 0) {
            return Ok(node);
        }
        if let Some(addr) = options.function_addr {
            for node in graph.node_ids() {
                if let Some(&payload) = graph.node(node) {
                    if node_addr(payload, regions, blocks) == addr {
                        return Ok(node);
                    }
                }
            }
        }
        Err(Error::NoStartNode)
    }

    fn node_by_addr(
        graph: &RegionGraph,
        addr: u64,
        regions: &RegionArena,
        blocks: &BlockArena,
    ) -> Result<NodeId> {
        for node in graph.node_ids() {
            if let Some(&payload) = graph.node(node) {
                if node_addr(payload, regions, blocks) == addr {
                    return Ok(node);
                }
            }
        }
        Err(malformed_error!("no node at address {addr:#x} in the graph"))
    }

    /// Wraps an unstructurable remainder graph into a region so the tree
    /// always has a single root.
    fn wrap_residue(
        graph: RegionGraph,
        options: &RegionIdentifierOptions,
        regions: &mut RegionArena,
        blocks: &BlockArena,
    ) -> Result<RegionId> {
        let head = Self::start_node(&graph, options, regions, blocks)?;
        let head = *graph
            .node(head)
            .ok_or_else(|| malformed_error!("start node {head} is not in the graph"))?;
        Ok(regions.add(Region::Acyclic(AcyclicRegion {
            head,
            graph,
            successors: Vec::new(),
            graph_with_successors: None,
        })))
    }

    /// Level-order walk of the region tree collecting one block address
    /// group per region.
    fn flatten(root: RegionId, regions: &RegionArena, blocks: &BlockArena) -> Vec<Vec<u64>> {
        let mut groups = Vec::new();
        let mut level = vec![root];
        let mut seen: HashSet<RegionId> = HashSet::new();
        seen.insert(root);
        while !level.is_empty() {
            let mut next_level = Vec::new();
            for &region_id in &level {
                let region = regions.region(region_id);
                let mut group = Vec::new();
                let Some(graph) = region.graph() else {
                    if let RegionNode::Block(block) = region.head() {
                        groups.push(vec![blocks.block(block).addr()]);
                    }
                    continue;
                };
                for node in graph.node_ids() {
                    match graph.node(node) {
                        Some(&RegionNode::Block(block)) => {
                            group.push(blocks.block(block).addr());
                        }
                        Some(&RegionNode::Region(child)) => {
                            if seen.insert(child) {
                                next_level.push(child);
                                group.push(node_addr(RegionNode::Region(child), regions, blocks));
                            }
                        }
                        None => {}
                    }
                }
                if !group.is_empty() {
                    groups.push(group);
                }
            }
            level = next_level;
        }
        groups
    }
}
