//! Dominator tree and dominance frontier computation.
//!
//! Region identification leans on dominance three ways: dominator trees gate
//! loop-body growth, postdominator trees drive the exit-candidate walk for
//! acyclic regions, and dominance frontiers decide whether a candidate
//! head/exit pair encloses a single-entry single-successor subgraph.
//!
//! # Theory
//!
//! A node `d` **dominates** a node `n` if every path from the entry node to `n`
//! passes through `d`. The **immediate dominator** of `n` is the unique node
//! that strictly dominates `n` and is dominated by every other strict dominator
//! of `n`. Postdominance is the same relation on the reversed graph, rooted at
//! an exit node.
//!
//! # Algorithm
//!
//! [`compute_dominators`] implements Lengauer-Tarjan with path compression,
//! running in O(E α(E)) time where α is the inverse Ackermann function.
//! Postdominators reuse the same machinery over a [`Reversed`] view.

use std::collections::HashSet;

use crate::graph::{NodeId, Predecessors, Reversed, Successors};

/// Sentinel marking "no node" in the internal tables.
const UNDEFINED: NodeId = NodeId(usize::MAX);

/// Result of dominator (or postdominator) tree computation.
///
/// Nodes unreachable from the entry have no immediate dominator and are
/// dominated by nothing except themselves.
///
/// # Examples
///
/// ```rust
/// use cfg_regions::graph::{algorithms::compute_dominators, FlowGraph};
///
/// // entry -> a -> b
/// let mut graph: FlowGraph<&str, ()> = FlowGraph::new();
/// let entry = graph.add_node("entry");
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// graph.add_edge(entry, a, ()).unwrap();
/// graph.add_edge(a, b, ()).unwrap();
///
/// let dom_tree = compute_dominators(&graph, entry);
/// assert!(dom_tree.dominates(entry, b));
/// assert_eq!(dom_tree.immediate_dominator(b), Some(a));
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// The entry (root) node of the tree.
    entry: NodeId,
    /// Immediate dominator per node slot; the entry maps to itself and
    /// unreachable slots hold the sentinel.
    idom: Vec<NodeId>,
}

impl DominatorTree {
    /// Returns the entry (root) node of the tree.
    #[must_use]
    #[inline]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the immediate dominator of a node.
    ///
    /// Returns `None` for the entry node, for nodes unreachable from the
    /// entry, and for node IDs outside the graph this tree was computed on.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        if node == self.entry {
            return None;
        }
        match self.idom.get(node.index()) {
            Some(&idom) if idom != UNDEFINED => Some(idom),
            _ => None,
        }
    }

    /// Checks whether node `a` dominates node `b`.
    ///
    /// Every node dominates itself. Nothing else dominates an unreachable
    /// node.
    ///
    /// # Complexity
    ///
    /// O(depth of `b` in the dominator tree).
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        let mut current = b;
        while current != self.entry {
            let Some(idom) = self.immediate_dominator(current) else {
                return false;
            };
            if idom == a {
                return true;
            }
            current = idom;
        }
        a == self.entry
    }

    /// Checks whether node `a` strictly dominates node `b` (dominates and `a != b`).
    #[must_use]
    #[inline]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }
}

/// Computes the dominator tree of `graph` rooted at `entry` using the
/// Lengauer-Tarjan algorithm.
///
/// Nodes not reachable from `entry` end up with no immediate dominator.
///
/// # Arguments
///
/// * `graph` - The graph to analyze
/// * `entry` - The node every dominance path starts from
///
/// # Complexity
///
/// - Time: O(E α(E)) where α is the inverse Ackermann function
/// - Space: O(V)
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    let bound = graph.node_bound();
    if bound == 0 || entry.index() >= bound {
        return DominatorTree {
            entry,
            idom: Vec::new(),
        };
    }

    let mut lt = LengauerTarjan::new(bound, entry);
    lt.compute(graph);

    DominatorTree {
        entry,
        idom: lt.idom,
    }
}

/// Computes the postdominator tree of `graph` rooted at `exit`.
///
/// Equivalent to running [`compute_dominators`] over the reversed graph:
/// `a` postdominates `b` when every path from `b` to `exit` passes through
/// `a`. The returned tree's [`entry`](DominatorTree::entry) is `exit`.
pub fn compute_postdominators<G>(graph: &G, exit: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    compute_dominators(&Reversed(graph), exit)
}

/// Internal state for the Lengauer-Tarjan algorithm.
struct LengauerTarjan {
    entry: NodeId,
    /// DFS number per node slot (0 = not visited).
    dfnum: Vec<usize>,
    /// Node with each DFS number (inverse of `dfnum`).
    vertex: Vec<NodeId>,
    /// Parent in the DFS tree.
    parent: Vec<NodeId>,
    /// Semidominator per node.
    semi: Vec<NodeId>,
    /// Immediate dominator (final result).
    idom: Vec<NodeId>,
    /// Ancestor in the link-eval forest.
    ancestor: Vec<NodeId>,
    /// Best node on the path to the ancestor (path compression).
    best: Vec<NodeId>,
    /// Nodes whose semidominator is this node.
    bucket: Vec<Vec<NodeId>>,
    dfs_counter: usize,
}

impl LengauerTarjan {
    fn new(bound: usize, entry: NodeId) -> Self {
        Self {
            entry,
            dfnum: vec![0; bound],
            vertex: vec![UNDEFINED; bound],
            parent: vec![UNDEFINED; bound],
            semi: (0..bound).map(NodeId::new).collect(),
            idom: vec![UNDEFINED; bound],
            ancestor: vec![UNDEFINED; bound],
            best: (0..bound).map(NodeId::new).collect(),
            bucket: vec![Vec::new(); bound],
            dfs_counter: 0,
        }
    }

    fn compute<G: Successors + Predecessors>(&mut self, graph: &G) {
        // Phase 1: DFS numbering
        self.dfs(graph, self.entry);

        // Process nodes in reverse DFS order (excluding the entry)
        for i in (1..self.dfs_counter).rev() {
            let w = self.vertex[i];
            let parent_w = self.parent[w.index()];

            // Phase 2: semidominators, per the semidominator theorem
            for v in graph.predecessors(w) {
                if self.dfnum[v.index()] == 0 {
                    // unreachable from the entry
                    continue;
                }
                let u = self.eval(v);
                if self.dfnum[self.semi[u.index()].index()]
                    < self.dfnum[self.semi[w.index()].index()]
                {
                    self.semi[w.index()] = self.semi[u.index()];
                }
            }

            let semi_w = self.semi[w.index()];
            self.bucket[semi_w.index()].push(w);
            self.link(parent_w, w);

            // Phase 3: implicit immediate dominators via parent's bucket
            let bucket = std::mem::take(&mut self.bucket[parent_w.index()]);
            for v in bucket {
                let u = self.eval(v);
                if self.semi[u.index()] == self.semi[v.index()] {
                    self.idom[v.index()] = parent_w;
                } else {
                    self.idom[v.index()] = u;
                }
            }
        }

        // Phase 4: make the implicit dominators explicit
        for i in 1..self.dfs_counter {
            let w = self.vertex[i];
            if self.idom[w.index()] != self.semi[w.index()] {
                self.idom[w.index()] = self.idom[self.idom[w.index()].index()];
            }
        }

        self.idom[self.entry.index()] = self.entry;
    }

    /// Iterative DFS assigning DFS numbers and building the DFS tree.
    fn dfs<G: Successors>(&mut self, graph: &G, start: NodeId) {
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            let idx = node.index();
            if self.dfnum[idx] != 0 {
                continue;
            }
            self.dfs_counter += 1;
            self.dfnum[idx] = self.dfs_counter;
            self.vertex[self.dfs_counter - 1] = node;

            for succ in graph.successors(node) {
                if self.dfnum[succ.index()] == 0 {
                    self.parent[succ.index()] = node;
                    stack.push(succ);
                }
            }
        }
    }

    /// Links `v` as a child of `w` in the spanning forest.
    fn link(&mut self, w: NodeId, v: NodeId) {
        self.ancestor[v.index()] = w;
    }

    /// Finds the node with minimal semidominator on the path to the forest root.
    fn eval(&mut self, v: NodeId) -> NodeId {
        if self.ancestor[v.index()] == UNDEFINED {
            return v;
        }
        self.compress(v);
        self.best[v.index()]
    }

    /// Path compression for the link-eval forest.
    fn compress(&mut self, v: NodeId) {
        let ancestor_v = self.ancestor[v.index()];
        if self.ancestor[ancestor_v.index()] == UNDEFINED {
            return;
        }

        self.compress(ancestor_v);

        let best_ancestor = self.best[ancestor_v.index()];
        let best_v = self.best[v.index()];
        if self.dfnum[self.semi[best_ancestor.index()].index()]
            < self.dfnum[self.semi[best_v.index()].index()]
        {
            self.best[v.index()] = best_ancestor;
        }
        self.ancestor[v.index()] = self.ancestor[ancestor_v.index()];
    }
}

/// Computes dominance frontiers for all nodes reachable in `dom_tree`.
///
/// The dominance frontier of `n` is the set of nodes `m` such that `n`
/// dominates a predecessor of `m` but does not strictly dominate `m` - the
/// points where `n`'s control ceases to be exclusive. Region checks use the
/// frontier to rule out stray entries into, and stray exits out of, a
/// candidate region.
///
/// # Arguments
///
/// * `graph` - The graph `dom_tree` was computed on
/// * `dom_tree` - The precomputed dominator tree
///
/// # Returns
///
/// A vector indexed by [`NodeId::index`]; `result[i]` is the frontier of
/// node `i`. Slots for unreachable or removed nodes stay empty.
pub fn compute_dominance_frontiers<G>(graph: &G, dom_tree: &DominatorTree) -> Vec<HashSet<NodeId>>
where
    G: Successors + Predecessors,
{
    let bound = graph.node_bound();
    let mut frontiers: Vec<HashSet<NodeId>> = vec![HashSet::new(); bound];

    for node in graph.node_ids() {
        if node != dom_tree.entry() && dom_tree.immediate_dominator(node).is_none() {
            // unreachable joins contribute nothing
            continue;
        }

        let preds: Vec<NodeId> = graph.predecessors(node).collect();
        if preds.len() < 2 {
            continue;
        }

        // Walk each predecessor up the dominator tree until idom(node).
        let idom_node = dom_tree.immediate_dominator(node);
        for pred in preds {
            let mut runner = pred;
            while Some(runner) != idom_node && runner != dom_tree.entry() {
                frontiers[runner.index()].insert(node);
                if let Some(idom) = dom_tree.immediate_dominator(runner) {
                    runner = idom;
                } else {
                    break;
                }
            }
            if Some(runner) != idom_node && runner == dom_tree.entry() {
                frontiers[runner.index()].insert(node);
            }
        }
    }

    frontiers
}
