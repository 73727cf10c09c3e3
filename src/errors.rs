/// Restriction failure: the requested set cannot be made consecutive.
///
/// Raised at the structural-violation points of the restriction
/// algorithm and caught exactly once, at the top of `restrict`, where it
/// becomes a `false` return. Never escapes the crate.
#[derive(Debug, Eq, PartialEq, Clone)]
pub(crate) enum Infeasible {
    /// A C-node on the terminal path has no full neighbor, but its two
    /// path neighbors are not adjacent in the circular order.
    NonAdjacentPartialNeighbors,
    /// The full neighbors of a C-node do not form one contiguous run.
    NonAdjacentFullNeighbors,
    /// The contiguous full run of a C-node does not touch the path
    /// neighbors the way the path orientation requires.
    TerminalsNotAdjacentToFull,
    /// The walks from the partial nodes meet in a branching shape
    /// instead of a single path.
    BranchingTerminalEdges,
}
