use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{self, Display, Formatter, Write};

use crate::node::{Node, TreeNode};
use crate::sequence::CircularSequence;

/// PC-tree over the leaves `0..n`.
///
/// Represents every circular permutation of the leaves that keeps each
/// accepted restriction set consecutive. A fresh tree is a star: one
/// P-node adjacent to all leaves, i.e. the unconstrained permutation
/// set. Applying restrictions refines the star into a tree of P-nodes
/// (order-free hubs) and C-nodes (fixed circular hubs).
///
/// ```
/// use pc_tree::PCTree;
///
/// let mut tree = PCTree::new(6);
/// assert!(tree.restrict(&[1, 2]));
/// assert!(tree.restrict(&[2, 3]));
/// assert!(!tree.restrict(&[1, 3]));
///
/// let order = tree.frontier();
/// assert_eq!(order.len(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct PCTree {
    /// Arena. Slots `0..leaf_count` hold the leaves forever; inner
    /// nodes live above and cycle through the freelist.
    pub(crate) nodes: Vec<TreeNode>,
    pub(crate) freelist: VecDeque<usize>,
    pub(crate) leaf_count: usize,
}

/// Inner node kind in a [`PCTree::represent`] dump.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NodeKind {
    P,
    C,
}

/// One inner node of a [`PCTree::represent`] dump.
///
/// `id` is a temporary identifier: leaves keep their own ids `0..n`,
/// inner nodes are numbered from `n` upwards in discovery order.
/// `parent` is `Some` only when the dump was requested with parents;
/// `Some(None)` marks the root.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NodeRepr {
    pub kind: NodeKind,
    pub id: usize,
    pub neighbors: Vec<usize>,
    pub parent: Option<Option<usize>>,
}

impl PCTree {
    /// Creates the unrestricted tree over the leaves `0..nb_leaves`.
    ///
    /// # Panics
    ///
    /// Panics if `nb_leaves < 3`: a smaller tree cannot satisfy the
    /// degree-3 invariant on inner nodes.
    pub fn new(nb_leaves: usize) -> PCTree {
        assert!(nb_leaves >= 3, "PC-tree needs at least 3 leaves, got {nb_leaves}");
        let mut tree = PCTree {
            nodes: (0..nb_leaves).map(|_| TreeNode::leaf()).collect(),
            freelist: VecDeque::new(),
            leaf_count: nb_leaves,
        };
        tree.new_p_node((0..nb_leaves).collect());
        tree
    }

    /// Number of leaves, fixed at construction.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub(crate) fn add_node(&mut self, node: TreeNode) -> usize {
        if let Some(free) = self.freelist.pop_front() {
            self.nodes[free] = node;
            free
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    pub(crate) fn recycle_node(&mut self, idx: usize) {
        debug_assert!(idx >= self.leaf_count, "leaves are never recycled");
        debug_assert!(!self.freelist.contains(&idx));
        self.freelist.push_back(idx);
    }

    /// Creates a P-node over `neighbors` and wires the back links.
    pub(crate) fn new_p_node(&mut self, neighbors: HashSet<usize>) -> usize {
        let idx = self.add_node(TreeNode::p_node(neighbors));
        self.attach_neighbors(idx);
        idx
    }

    /// Creates a C-node whose ring is `neighbors` in the given order.
    pub(crate) fn new_c_node(&mut self, neighbors: &[usize]) -> usize {
        let ring: CircularSequence = neighbors.iter().copied().collect();
        let idx = self.add_node(TreeNode::c_node(ring));
        self.attach_neighbors(idx);
        idx
    }

    /// Wires the neighbor back references of a freshly created hub and
    /// derives the parent links: a neighbor that is already parented
    /// elsewhere becomes the parent of the new hub.
    fn attach_neighbors(&mut self, idx: usize) {
        for x in self.neighbors_of(idx) {
            self.attach(x, idx);
            if self.nodes[x].parent.is_none() {
                self.nodes[x].parent = Some(idx);
            } else if self.nodes[x].parent != Some(idx) {
                debug_assert!(self.nodes[idx].parent.is_none(), "two parents for one hub");
                self.nodes[idx].parent = Some(x);
            }
        }
    }

    /// Current neighbors of `idx`, in ring order for a C-node.
    pub(crate) fn neighbors_of(&self, idx: usize) -> Vec<usize> {
        match &self.nodes[idx].node {
            Node::L(_) => self.nodes[idx].parent.into_iter().collect(),
            Node::P(p) => p.neighbors.iter().copied().collect(),
            Node::C(c) => c.neighbors.iter().collect(),
        }
    }

    /// Adds `new` to the neighbors of `idx`; for a leaf this sets the
    /// parent.
    pub(crate) fn attach(&mut self, idx: usize, new: usize) {
        let node = &mut self.nodes[idx];
        match &mut node.node {
            Node::L(_) => {
                debug_assert!(node.parent.is_none(), "leaf {idx} already attached");
                node.parent = Some(new);
            }
            Node::P(p) => {
                p.neighbors.insert(new);
            }
            Node::C(c) => c.neighbors.add(new),
        }
    }

    /// Removes `old` from the neighbors of `idx` and drops a matching
    /// parent link. A C-node moves its ring start past the removed
    /// entry.
    pub(crate) fn detach(&mut self, idx: usize, old: usize) {
        let node = &mut self.nodes[idx];
        match &mut node.node {
            Node::L(_) => {
                debug_assert_eq!(node.parent, Some(old), "detaching a stranger from leaf {idx}");
                node.parent = None;
            }
            Node::P(p) => {
                if node.parent == Some(old) {
                    node.parent = None;
                }
                let removed = p.neighbors.remove(&old);
                debug_assert!(removed, "detaching a stranger from P-node {idx}");
            }
            Node::C(c) => {
                if node.parent == Some(old) {
                    node.parent = None;
                }
                c.neighbors.set_first(c.neighbors.successor(old));
                c.neighbors.remove(old);
            }
        }
    }

    /// Severs the links between `idx` and each node of `others`, both
    /// ways.
    pub(crate) fn detach_bilateral(&mut self, idx: usize, others: &[usize]) {
        for &x in others {
            self.detach(x, idx);
            self.detach(idx, x);
        }
    }

    /// Reverses the circular order of a C-node in place.
    pub(crate) fn flip(&mut self, idx: usize) {
        let c = self.nodes[idx].as_mut_c();
        let items: Vec<usize> = c.neighbors.iter().collect();
        c.neighbors = items.into_iter().rev().collect();
    }

    /// One circular order of the leaves consistent with every accepted
    /// restriction. Starts at leaf 0; beyond the consecutivity of the
    /// accepted sets the order is arbitrary.
    pub fn frontier(&self) -> Vec<usize> {
        let mut trace = vec![0];
        let hub = self.nodes[0].parent.expect("leaf without parent");
        self.collect_frontier(&mut trace, hub, 0);
        trace
    }

    fn collect_frontier(&self, trace: &mut Vec<usize>, idx: usize, enter: usize) {
        match &self.nodes[idx].node {
            Node::L(_) => trace.push(idx),
            Node::P(p) => {
                for &x in &p.neighbors {
                    if x != enter {
                        self.collect_frontier(trace, x, idx);
                    }
                }
            }
            Node::C(c) => {
                let mut x = c.neighbors.successor(enter);
                while x != enter {
                    self.collect_frontier(trace, x, idx);
                    x = c.neighbors.successor(x);
                }
            }
        }
    }

    /// Structural dump for debugging and golden tests.
    ///
    /// Inner nodes get temporary ids `n, n+1, ...` in discovery order:
    /// parents of leaves first (by leaf id), then breadth-first over the
    /// remaining hubs. P neighbor lists are sorted; C rings are
    /// canonicalized by rotation and reflection, so structurally equal
    /// trees produce equal dumps.
    pub fn represent(&self, show_parent: bool) -> Vec<NodeRepr> {
        let mut ids: HashMap<usize, usize> = HashMap::new();
        let mut order: Vec<usize> = Vec::new();
        for leaf in 0..self.leaf_count {
            let hub = self.nodes[leaf].parent.expect("leaf without parent");
            if !ids.contains_key(&hub) {
                ids.insert(hub, self.leaf_count + order.len());
                order.push(hub);
            }
        }
        let mut k = 0;
        while k < order.len() {
            for x in self.neighbors_of(order[k]) {
                if x >= self.leaf_count && !ids.contains_key(&x) {
                    ids.insert(x, self.leaf_count + order.len());
                    order.push(x);
                }
            }
            k += 1;
        }
        order.iter().map(|&idx| self.represent_node(idx, &ids, show_parent)).collect()
    }

    fn represent_node(&self, idx: usize, ids: &HashMap<usize, usize>, show_parent: bool) -> NodeRepr {
        let node_id = |x: usize| if x < self.leaf_count { x } else { ids[&x] };
        let parent = if show_parent { Some(self.nodes[idx].parent.map(|x| node_id(x))) } else { None };
        match &self.nodes[idx].node {
            Node::P(p) => {
                let mut neighbors: Vec<usize> = p.neighbors.iter().map(|&x| node_id(x)).collect();
                neighbors.sort_unstable();
                NodeRepr { kind: NodeKind::P, id: ids[&idx], neighbors, parent }
            }
            Node::C(c) => {
                let ring: Vec<usize> = c.neighbors.iter().map(|x| node_id(x)).collect();
                NodeRepr { kind: NodeKind::C, id: ids[&idx], neighbors: canonical_ring(&ring), parent }
            }
            Node::L(_) => panic!("leaf {idx} queued as inner node"),
        }
    }

    /// Renders the tree in graphviz dot format: one arc per tree edge
    /// and an invisible cycle over the frontier to stabilize the
    /// drawing. Render with e.g. `dot t.dot -T pdf -o t.pdf`.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        self.write_dot(&mut out).expect("writing to a String cannot fail");
        out
    }

    pub fn write_dot(&self, out: &mut impl Write) -> fmt::Result {
        let rep = self.represent(true);
        let mut arcs: Vec<(usize, usize)> = Vec::new();
        writeln!(out, "digraph G{{")?;
        writeln!(out, "layout=neato")?;
        for node in &rep {
            let shape = match node.kind {
                NodeKind::P => "circle",
                NodeKind::C => "doublecircle",
            };
            writeln!(out, "{} [shape={}, label={}]", node.id, shape, node.id)?;
            for &v in &node.neighbors {
                if v < self.leaf_count {
                    arcs.push((v, node.id));
                }
            }
            if let Some(Some(parent)) = node.parent {
                arcs.push((node.id, parent));
            }
        }
        for v in 0..self.leaf_count {
            writeln!(out, "{v} [shape=none]")?;
        }
        for (u, v) in arcs {
            writeln!(out, "{u} -> {v}")?;
        }
        let order = self.frontier();
        write!(out, "{}", order[order.len() - 1])?;
        for v in order {
            write!(out, " -> {v}")?;
        }
        writeln!(out, " [color=white]")?;
        writeln!(out, "}}")
    }

    fn fmt_node(&self, f: &mut Formatter<'_>, idx: usize, enter: Option<usize>) -> fmt::Result {
        match &self.nodes[idx].node {
            Node::L(_) => write!(f, " {idx} "),
            Node::P(p) => {
                write!(f, "(")?;
                for &x in &p.neighbors {
                    if Some(x) != enter {
                        self.fmt_node(f, x, Some(idx))?;
                    }
                }
                write!(f, ")")
            }
            Node::C(c) => {
                write!(f, "[")?;
                match enter {
                    Some(e) => {
                        let mut x = c.neighbors.successor(e);
                        while x != e {
                            self.fmt_node(f, x, Some(idx))?;
                            x = c.neighbors.successor(x);
                        }
                    }
                    None => {
                        for x in c.neighbors.iter() {
                            self.fmt_node(f, x, Some(idx))?;
                        }
                    }
                }
                write!(f, "]")
            }
        }
    }
}

impl Display for PCTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut root = 0;
        while let Some(parent) = self.nodes[root].parent {
            root = parent;
        }
        self.fmt_node(f, root, None)
    }
}

/// Rotation-and-reflection canonical form of a C ring: starts at the
/// smallest entry, in the direction with the smaller second entry.
fn canonical_ring(ring: &[usize]) -> Vec<usize> {
    let len = ring.len();
    debug_assert_ne!(len, 0, "empty C ring");
    let mut min_pos = 0;
    for i in 1..len {
        if ring[i] < ring[min_pos] {
            min_pos = i;
        }
    }
    let before = ring[(min_pos + len - 1) % len];
    let after = ring[(min_pos + 1) % len];
    if before < after {
        (0..len).map(|i| ring[(min_pos + len - i) % len]).collect()
    } else {
        (0..len).map(|i| ring[(min_pos + i) % len]).collect()
    }
}
