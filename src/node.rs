use std::collections::HashSet;

use crate::sequence::CircularSequence;

/// One arena slot: a tree vertex plus the transient marks of a single
/// `restrict` call.
#[derive(Debug, Clone)]
pub(crate) struct TreeNode {
    /// Which neighbor plays the parent role in the rooted view. Derived
    /// from the neighbor relation, never an owning edge.
    pub(crate) parent: Option<usize>,
    pub(crate) full_counter: usize,
    pub(crate) is_terminal: bool,
    pub(crate) node: Node,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    L(Leaf),
    P(PNode),
    C(CNode),
}

#[derive(Debug, Clone)]
pub(crate) struct Leaf {
    pub(crate) full: bool,
}

/// Unordered hub: any permutation of the neighbor subtrees is allowed.
#[derive(Debug, Clone)]
pub(crate) struct PNode {
    pub(crate) neighbors: HashSet<usize>,
    pub(crate) full_neighbors: HashSet<usize>,
}

/// Ordered hub: the neighbor subtrees keep this cyclic order, up to
/// rotation and reflection of the whole ring.
#[derive(Debug, Clone)]
pub(crate) struct CNode {
    pub(crate) neighbors: CircularSequence,
    /// Leftmost known full neighbor in the current orientation.
    pub(crate) first_full: Option<usize>,
}

#[allow(dead_code)]
impl TreeNode {
    pub(crate) fn leaf() -> TreeNode {
        TreeNode::wrap(Node::L(Leaf { full: false }))
    }

    pub(crate) fn p_node(neighbors: HashSet<usize>) -> TreeNode {
        TreeNode::wrap(Node::P(PNode { neighbors, full_neighbors: HashSet::new() }))
    }

    pub(crate) fn c_node(neighbors: CircularSequence) -> TreeNode {
        TreeNode::wrap(Node::C(CNode { neighbors, first_full: None }))
    }

    fn wrap(node: Node) -> TreeNode {
        TreeNode { parent: None, full_counter: 0, is_terminal: false, node }
    }

    pub(crate) fn degree(&self) -> usize {
        match &self.node {
            Node::L(_) => 1,
            Node::P(p) => p.neighbors.len(),
            Node::C(c) => c.neighbors.len(),
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        match &self.node {
            Node::L(leaf) => leaf.full,
            Node::P(_) | Node::C(_) => self.full_counter + 1 >= self.degree(),
        }
    }

    pub(crate) fn is_partial(&self) -> bool {
        self.full_counter > 0 && !self.is_full()
    }

    /// Records that the subtree behind `from` holds marked leaves only.
    pub(crate) fn signal_full(&mut self, from: usize) {
        self.full_counter += 1;
        match &mut self.node {
            Node::L(_) => {}
            Node::P(p) => {
                p.full_neighbors.insert(from);
            }
            Node::C(c) => {
                if c.first_full.is_none() {
                    c.first_full = Some(from);
                }
            }
        }
    }

    /// Resets the per-restriction marks to their defaults.
    pub(crate) fn clean(&mut self) {
        self.full_counter = 0;
        self.is_terminal = false;
        match &mut self.node {
            Node::L(leaf) => leaf.full = false,
            Node::P(p) => p.full_neighbors.clear(),
            Node::C(c) => c.first_full = None,
        }
    }

    pub(crate) fn as_mut_leaf(&mut self) -> &mut Leaf {
        match &mut self.node {
            Node::L(leaf) => leaf,
            other => panic!("Not a leaf: {:?}!", other),
        }
    }

    pub(crate) fn as_p(&self) -> &PNode {
        if let Node::P(p) = &self.node {
            p
        } else {
            panic!("Not a P-node: {:?}!", self.node);
        }
    }

    pub(crate) fn as_c(&self) -> &CNode {
        if let Node::C(c) = &self.node {
            c
        } else {
            panic!("Not a C-node: {:?}!", self.node);
        }
    }

    pub(crate) fn as_mut_c(&mut self) -> &mut CNode {
        match &mut self.node {
            Node::C(c) => c,
            other => panic!("Not a C-node: {:?}!", other),
        }
    }
}
