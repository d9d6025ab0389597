//! The e-graph itself.
//!
//! `add`/`merge`/`rebuild` maintain three invariants — every stored node
//! canonical, the hashcons table agreeing with it, every parent key
//! reachable from its child — outside of a `merge`/`rebuild` window.
//! Grounded on the classic egg-style rebuild algorithm, reimplemented
//! here over a `slotmap` arena rather than `egg`'s own `Id` allocator:
//! e-classes live in an arena indexed by `EClassId`, and parents
//! reference those ids rather than direct pointers.

use rustc_hash::FxHashMap;
use slotmap::{Key, SlotMap};

use super::eclass::EClass;
use super::node::ENode;
use super::unionfind::UnionFind;

slotmap::new_key_type! {
    /// A dense, never-reused e-class identifier.
    pub struct EClassId;
}

/// The equality-saturation e-graph.
#[derive(Debug, Default)]
pub struct EGraph {
    classes: SlotMap<EClassId, EClass>,
    union: UnionFind,
    hashcons: FxHashMap<ENode, EClassId>,
    pending: Vec<EClassId>,
}

impl EGraph {
    /// An empty e-graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find `id`'s current canonical representative (read-only; see
    /// [`UnionFind::find`] for why this doesn't need `&mut self`).
    #[must_use]
    pub fn find(&self, id: EClassId) -> EClassId {
        self.union.find(id)
    }

    fn find_mut(&mut self, id: EClassId) -> EClassId {
        self.union.find_compress(id)
    }

    fn canonicalize(&self, node: &ENode) -> ENode {
        node.map_children(|child| self.union.find(child))
    }

    fn canonicalize_mut(&mut self, node: &ENode) -> ENode {
        node.map_children(|child| self.find_mut(child))
    }

    /// Canonicalize `node`'s children and probe the hashcons table
    /// without inserting.
    #[must_use]
    pub fn lookup(&self, node: &ENode) -> Option<EClassId> {
        let canon = self.canonicalize(node);
        self.hashcons.get(&canon).map(|&id| self.union.find(id))
    }

    /// Insert `node`, canonicalizing its children first. Returns the
    /// existing class if an equal canonical node is already present,
    /// otherwise allocates a fresh class.
    pub fn add(&mut self, node: ENode) -> EClassId {
        let canon = self.canonicalize_mut(&node);
        if let Some(&existing) = self.hashcons.get(&canon) {
            return self.find_mut(existing);
        }
        let children = canon.children();
        let id = self.classes.insert(EClass::new());
        self.union.make_set(id);
        self.classes[id].nodes.push(canon.clone());
        self.hashcons.insert(canon.clone(), id);
        for child in children {
            let child = self.find_mut(child);
            self.classes[child].parents.push((canon.clone(), id));
        }
        id
    }

    /// Union the classes `a` and `b`, merging their node and parent
    /// sets into the surviving representative and scheduling it for
    /// [`Self::rebuild`].
    pub fn merge(&mut self, a: EClassId, b: EClassId) -> EClassId {
        let root_a = self.find_mut(a);
        let root_b = self.find_mut(b);
        if root_a == root_b {
            return root_a;
        }
        let survivor = self.union.union(root_a, root_b);
        let loser = if survivor == root_a { root_b } else { root_a };
        let absorbed = std::mem::replace(&mut self.classes[loser], EClass::new());
        self.classes[survivor].nodes.extend(absorbed.nodes);
        self.classes[survivor].parents.extend(absorbed.parents);
        self.pending.push(survivor);
        survivor
    }

    /// Restore the congruence invariant after a batch of `merge` calls.
    pub fn rebuild(&mut self) {
        while !self.pending.is_empty() {
            let mut todo: Vec<EClassId> = self
                .pending
                .drain(..)
                .map(|id| self.find_mut(id))
                .collect();
            todo.sort_unstable_by_key(|id| id.data().as_ffi());
            todo.dedup();
            for class in todo {
                self.repair(class);
            }
        }
    }

    fn repair(&mut self, class: EClassId) {
        let canonical = self.find_mut(class);
        let parents = std::mem::take(&mut self.classes[canonical].parents);
        for (node, _) in &parents {
            self.hashcons.remove(node);
        }
        let mut new_parents = Vec::with_capacity(parents.len());
        for (node, node_class) in parents {
            let canon_node = self.canonicalize_mut(&node);
            let canon_class = self.find_mut(node_class);
            let resolved = match self.hashcons.get(&canon_node) {
                Some(&existing) if existing != canon_class => self.merge(existing, canon_class),
                Some(&existing) => existing,
                None => canon_class,
            };
            self.hashcons.insert(canon_node.clone(), resolved);
            new_parents.push((canon_node, resolved));
        }
        let settled = self.find_mut(canonical);
        self.classes[settled].parents.extend(new_parents);
    }

    /// The e-nodes in `id`'s (canonicalized) class.
    #[must_use]
    pub fn get_nodes(&self, id: EClassId) -> &[ENode] {
        let canon = self.union.find(id);
        self.classes
            .get(canon)
            .map_or(&[], |class| class.nodes())
    }

    /// Read-only access to `id`'s (canonicalized) class.
    #[must_use]
    pub fn get_class(&self, id: EClassId) -> Option<&EClass> {
        self.classes.get(self.union.find(id))
    }

    /// All currently canonical, non-empty class ids.
    #[must_use]
    pub fn class_ids(&self) -> Vec<EClassId> {
        self.classes
            .keys()
            .filter(|&id| self.union.find(id) == id && !self.classes[id].nodes().is_empty())
            .collect()
    }

    /// The number of distinct e-classes.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.class_ids().len()
    }

    /// `true` if tracing is enabled via the `GRADC_TRACE` environment
    /// variable, an `eprintln!`-behind-an-env-var diagnostics mechanism
    /// rather than a `log`/`tracing` dependency.
    #[must_use]
    pub fn tracing_enabled() -> bool {
        std::env::var_os("GRADC_TRACE").is_some()
    }
}
