use std::collections::HashMap;

use enum_map::{enum_map, Enum, EnumMap};

use crate::errors::Infeasible;
use crate::node::Node;
use crate::PCTree;

/// Side a terminal-path node contributes to the split forest.
#[derive(Debug, Enum, Copy, Clone)]
enum SplitSide {
    Empty,
    Full,
}

impl PCTree {
    /// Applies one consecutivity restriction.
    ///
    /// Returns `true` and refines the tree if the leaves of
    /// `restriction` can be made consecutive in some represented
    /// circular order, consistent with every previously accepted
    /// restriction; returns `false` and leaves the tree in its prior
    /// observable state otherwise. Transient node marks are reset either
    /// way.
    ///
    /// Leaf ids must be in range and distinct; this is not validated.
    pub fn restrict(&mut self, restriction: &[usize]) -> bool {
        let size = restriction.len();
        // Sets of size 0, 1, n-1 and n are consecutive in any circular
        // order.
        if size <= 1 || size >= self.leaf_count - 1 {
            return true;
        }

        let (partial_nodes, full_nodes) = self.label(restriction);
        let feasible = self.refine(&partial_nodes).is_ok();
        for &x in partial_nodes.iter().chain(&full_nodes) {
            self.nodes[x].clean();
        }
        feasible
    }

    fn refine(&mut self, partial_nodes: &[usize]) -> Result<(), Infeasible> {
        let path = self.terminal_path(partial_nodes)?;
        let forest = self.split(&path)?;
        let forest = self.simplify(forest);
        self.remodel(&forest);
        Ok(())
    }

    /// Marks the restriction leaves full and propagates fullness: every
    /// node that becomes full reports to its single non-full neighbor.
    /// Returns the partial and the full nodes, in discovery order.
    fn label(&mut self, restriction: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let mut partial_nodes: Vec<usize> = Vec::new();
        let mut full_nodes: Vec<usize> = Vec::with_capacity(restriction.len());
        let mut became_full: Vec<usize> = Vec::with_capacity(restriction.len());

        for &leaf in restriction {
            self.nodes[leaf].as_mut_leaf().full = true;
            became_full.push(leaf);
            full_nodes.push(leaf);
        }

        while let Some(current) = became_full.pop() {
            let target = self.to_signal(current);
            if !self.nodes[target].is_partial() {
                partial_nodes.push(target);
            }
            self.nodes[target].signal_full(current);
            if self.nodes[target].is_full() {
                became_full.push(target);
                partial_nodes.retain(|&x| x != target);
                full_nodes.push(target);
            }
        }

        (partial_nodes, full_nodes)
    }

    /// The single neighbor of a full node that has not reported full.
    fn to_signal(&self, idx: usize) -> usize {
        match &self.nodes[idx].node {
            Node::L(_) => self.nodes[idx].parent.expect("leaf without parent"),
            Node::P(p) => {
                let mut rest = p.neighbors.iter().filter(|x| !p.full_neighbors.contains(*x));
                let target = *rest.next().expect("full P-node without an empty neighbor");
                debug_assert!(rest.next().is_none(), "full P-node with several empty neighbors");
                target
            }
            Node::C(c) => {
                debug_assert_eq!(self.nodes[idx].full_counter, c.neighbors.len() - 1);
                let mut current = c.first_full.expect("full C-node without a full neighbor");
                while self.nodes[current].is_full() {
                    current = c.neighbors.successor(current);
                }
                current
            }
        }
    }

    /// Finds the path of partial nodes along which the tree must be
    /// split, or proves that no such path exists.
    ///
    /// Every partial node seeds a walk towards the root; the walks
    /// advance in lockstep, one step per round, and stop on the root or
    /// on a node some other walk has already visited. The unique meeting
    /// point is the apex; a second meeting point means the partial nodes
    /// branch instead of forming a path.
    fn terminal_path(&mut self, partial_nodes: &[usize]) -> Result<Vec<usize>, Infeasible> {
        if partial_nodes.len() == 1 {
            return Ok(partial_nodes.to_vec());
        }

        let mut apex: Option<usize> = None;
        let mut leader: Option<usize> = None;

        for &x in partial_nodes {
            self.nodes[x].is_terminal = true;
        }

        // (seed, current position) per live walk.
        let mut active: Vec<(usize, usize)> = partial_nodes.iter().map(|&x| (x, x)).collect();
        // node -> seed whose walk reached it first
        let mut marked: HashMap<usize, usize> = partial_nodes.iter().map(|&x| (x, x)).collect();

        while active.len() >= 2 || (active.len() == 1 && leader.is_some()) {
            let mut disabled: Vec<usize> = Vec::new();
            for slot in 0..active.len() {
                let (seed, position) = active[slot];
                match self.nodes[position].parent {
                    None => {
                        // walked off the root
                        disabled.push(seed);
                        leader = Some(seed);
                    }
                    Some(q) => {
                        if marked.contains_key(&q) {
                            disabled.push(seed);
                            if self.nodes[q].is_partial() && self.nodes[q].is_terminal {
                                self.nodes[q].is_terminal = false;
                            }
                            if !self.nodes[q].is_terminal {
                                if apex.is_none() {
                                    apex = Some(q);
                                } else {
                                    return Err(Infeasible::BranchingTerminalEdges);
                                }
                            }
                        } else {
                            marked.insert(q, seed);
                        }
                        active[slot].1 = q;
                    }
                }
            }
            active.retain(|(seed, _)| !disabled.contains(seed));
        }

        let leader = leader.unwrap_or_else(|| active.first().expect("every walk ended without a leader").0);

        // Neither branch below is reached by any known input; whether a
        // walk can still produce these shapes is unsettled.
        let apex = match apex {
            Some(apex) => {
                // A-shaped: the apex must lie on the leader's own walk.
                if marked[&apex] != leader {
                    return Err(Infeasible::BranchingTerminalEdges);
                }
                apex
            }
            // I-shaped: the walks merged without crossing, the leader
            // closes the path itself.
            None => leader,
        };

        let tails: Vec<usize> =
            partial_nodes.iter().copied().filter(|&x| self.nodes[x].is_terminal).collect();
        debug_assert!((1..=2).contains(&tails.len()), "terminal path with {} tails", tails.len());

        // Assemble tail -> apex (included), plus the second tail's part
        // reversed when the path has two ends.
        let mut path: Vec<usize> = Vec::new();
        let mut a = tails[0];
        loop {
            path.push(a);
            if a == apex {
                break;
            }
            a = self.nodes[a].parent.expect("terminal path left the tree");
        }
        if tails.len() == 2 {
            let mut upper: Vec<usize> = Vec::new();
            let mut a = tails[1];
            while a != apex {
                upper.push(a);
                a = self.nodes[a].parent.expect("terminal path left the tree");
            }
            path.extend(upper.into_iter().rev());
        }
        Ok(path)
    }

    /// Checks every path node against its path neighbors; the ends have
    /// a single anchor, interior nodes two.
    fn splittable(&mut self, path: &[usize]) -> Result<(), Infeasible> {
        if path.len() == 1 {
            return self.node_splittable(path[0], None, None);
        }
        self.node_splittable(path[0], None, Some(path[1]))?;
        self.node_splittable(path[path.len() - 1], Some(path[path.len() - 2]), None)?;
        for i in 1..path.len() - 1 {
            self.node_splittable(path[i], Some(path[i - 1]), Some(path[i + 1]))?;
        }
        Ok(())
    }

    fn node_splittable(
        &mut self,
        idx: usize,
        left_terminal: Option<usize>,
        right_terminal: Option<usize>,
    ) -> Result<(), Infeasible> {
        match &self.nodes[idx].node {
            // P-nodes partition into full and empty freely.
            Node::P(_) => Ok(()),
            Node::C(_) => self.c_splittable(idx, left_terminal, right_terminal),
            Node::L(_) => panic!("leaf {idx} on the terminal path"),
        }
    }

    /// Checks that the full neighbors of the C-node form one contiguous
    /// run whose ends touch exactly the given path neighbors, flipping
    /// the ring when the run is oriented the other way. On success
    /// `first_full` is the leftmost full neighbor of the run.
    fn c_splittable(
        &mut self,
        idx: usize,
        left_terminal: Option<usize>,
        right_terminal: Option<usize>,
    ) -> Result<(), Infeasible> {
        debug_assert!(self.nodes[idx].as_c().neighbors.len() > self.nodes[idx].full_counter);

        let Some(first_full) = self.nodes[idx].as_c().first_full else {
            // Empty path node: its two path neighbors must be adjacent
            // in the ring.
            if let (Some(left), Some(right)) = (left_terminal, right_terminal) {
                if self.nodes[idx].as_c().neighbors.successor(right) == left {
                    self.flip(idx);
                } else if self.nodes[idx].as_c().neighbors.successor(left) != right {
                    return Err(Infeasible::NonAdjacentPartialNeighbors);
                }
            }
            return Ok(());
        };

        // Grow the full interval around first_full as far as it goes.
        let mut interval_size = 1;
        let mut right = first_full;
        let mut left = first_full;

        let mut x = self.nodes[idx].as_c().neighbors.successor(right);
        while self.nodes[x].is_full() {
            right = x;
            x = self.nodes[idx].as_c().neighbors.successor(right);
            interval_size += 1;
        }
        let mut x = self.nodes[idx].as_c().neighbors.predecessor(left);
        while self.nodes[x].is_full() {
            left = x;
            x = self.nodes[idx].as_c().neighbors.predecessor(left);
            interval_size += 1;
        }

        if self.nodes[idx].full_counter != interval_size {
            return Err(Infeasible::NonAdjacentFullNeighbors);
        }

        let left_neighbor = self.nodes[idx].as_c().neighbors.predecessor(left);
        let right_neighbor = self.nodes[idx].as_c().neighbors.successor(right);
        // equal neighbors would mean the node is full
        debug_assert_ne!(left_neighbor, right_neighbor);

        let reversed_fit = left_terminal.map_or(true, |t| t == right_neighbor)
            && right_terminal.map_or(true, |t| t == left_neighbor)
            && (left_terminal.is_some() || right_terminal.is_some());
        let straight_fit = left_terminal.map_or(true, |t| t == left_neighbor)
            && right_terminal.map_or(true, |t| t == right_neighbor);

        if reversed_fit {
            self.flip(idx);
            self.nodes[idx].as_mut_c().first_full = Some(right);
        } else if straight_fit {
            self.nodes[idx].as_mut_c().first_full = Some(left);
        } else {
            return Err(Infeasible::TerminalsNotAdjacentToFull);
        }
        Ok(())
    }

    /// Detaches consecutive path nodes from each other and splits the
    /// full side off every labelled node. The returned forest is the
    /// circular order for the remodelled centre: empty parts in reverse
    /// path order, then full parts in path order.
    fn split(&mut self, path: &[usize]) -> Result<Vec<usize>, Infeasible> {
        self.splittable(path)?;

        for window in path.windows(2) {
            self.detach_bilateral(window[0], &window[1..2]);
        }

        let mut parts: EnumMap<SplitSide, Vec<usize>> = enum_map! { _ => Vec::new() };
        for &x in path {
            parts[SplitSide::Empty].push(x);
            if self.nodes[x].full_counter > 0 {
                let split_off = self.split_node(x);
                parts[SplitSide::Full].push(split_off);
            }
        }

        let mut forest: Vec<usize> = parts[SplitSide::Empty].iter().rev().copied().collect();
        forest.extend(parts[SplitSide::Full].iter().copied());
        Ok(forest)
    }

    /// Splits the full side off one path node; returns the new node
    /// owning exactly the full neighbors.
    fn split_node(&mut self, idx: usize) -> usize {
        match &self.nodes[idx].node {
            Node::P(p) => {
                let full = p.full_neighbors.clone();
                let detached: Vec<usize> = full.iter().copied().collect();
                self.detach_bilateral(idx, &detached);
                self.new_p_node(full)
            }
            Node::C(_) => {
                debug_assert!(self.nodes[idx].is_partial(), "split of a non-partial C-node");
                let mut run: Vec<usize> = Vec::new();
                let mut x = self.nodes[idx].as_c().first_full.expect("split of an unlabelled C-node");
                while self.nodes[x].is_full() {
                    run.push(x);
                    x = self.nodes[idx].as_c().neighbors.successor(x);
                }
                self.detach_bilateral(idx, &run);
                // the empty remainder restarts at the neighbor after the run
                self.nodes[idx].as_mut_c().neighbors.set_first(x);
                self.new_c_node(&run)
            }
            Node::L(_) => panic!("split of leaf {idx}"),
        }
    }

    /// Contracts degree-1 P-nodes and dissolves path C-nodes into their
    /// ring, releasing the nodes that drop out.
    fn simplify(&mut self, forest: Vec<usize>) -> Vec<usize> {
        let mut result = Vec::with_capacity(forest.len());
        for x in forest {
            result.extend(self.simplify_node(x));
        }
        result
    }

    fn simplify_node(&mut self, idx: usize) -> Vec<usize> {
        match &self.nodes[idx].node {
            Node::P(p) => {
                if p.neighbors.len() == 1 {
                    let only = *p.neighbors.iter().next().expect("empty P-node");
                    self.detach_bilateral(idx, &[only]);
                    self.recycle_node(idx);
                    vec![only]
                } else {
                    vec![idx]
                }
            }
            Node::C(c) => {
                let members: Vec<usize> = c.neighbors.iter().collect();
                self.detach_bilateral(idx, &members);
                self.recycle_node(idx);
                members
            }
            Node::L(_) => panic!("leaf {idx} on the terminal path"),
        }
    }

    /// Reassembles the split parts: two parts attach to each other
    /// directly, more meet in a new central C-node ringed in forest
    /// order.
    fn remodel(&mut self, forest: &[usize]) {
        if forest.len() == 2 {
            let (a, b) = (forest[0], forest[1]);
            self.attach(a, b);
            self.attach(b, a);
            debug_assert!(
                self.nodes[a].parent.is_none() || self.nodes[b].parent.is_none(),
                "both split parts still rooted"
            );
            if self.nodes[a].parent.is_some() {
                self.nodes[b].parent = Some(a);
            } else {
                self.nodes[a].parent = Some(b);
            }
        } else {
            self.new_c_node(forest);
        }
    }
}
