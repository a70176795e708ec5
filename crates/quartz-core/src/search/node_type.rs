//! Node type definitions for the alpha-beta search algorithm.

/// Non-PV (non-principal variation) node type.
///
/// These are nodes that are not part of the principal variation and can
/// be searched with zero-width windows for more efficient pruning.
pub struct NonPV;

/// PV (principal variation) node type.
///
/// These nodes are part of the principal variation and require
/// full-width alpha-beta windows to find the best move.
pub struct PV;

/// Trait for compile-time node type specialization.
pub trait NodeType {
    /// Whether this is a PV node.
    const PV_NODE: bool;
}

impl NodeType for NonPV {
    const PV_NODE: bool = false;
}

impl NodeType for PV {
    const PV_NODE: bool = true;
}
