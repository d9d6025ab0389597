//! An e-class: a set of e-nodes known to be semantically equal.

use super::{ENode, EClassId};

/// One equivalence class of e-nodes.
///
/// Never shrinks except by merging: an e-class only grows, or has its
/// entire contents absorbed into a survivor when it is merged away
/// (`fresh` -> `populated` -> `merged`).
#[derive(Debug, Clone, Default)]
pub struct EClass {
    pub(super) nodes: Vec<ENode>,
    pub(super) parents: Vec<(ENode, EClassId)>,
}

impl EClass {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// The e-nodes currently in this class.
    #[must_use]
    pub fn nodes(&self) -> &[ENode] {
        &self.nodes
    }

    /// The parent e-nodes that reference this class, paired with the
    /// class each parent node itself lives in.
    #[must_use]
    pub fn parents(&self) -> &[(ENode, EClassId)] {
        &self.parents
    }
}
