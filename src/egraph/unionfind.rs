//! Union-find over e-class ids.
//!
//! Indexed entirely by [`EClassId`] — an arena key, never a pointer — so
//! the "who points at me" parent-set queries the e-graph needs can stay
//! plain map lookups instead of requiring back-references.

use slotmap::SecondaryMap;

use super::EClassId;

/// Union-find with path compression and union-by-rank.
#[derive(Debug, Default)]
pub struct UnionFind {
    parent: SecondaryMap<EClassId, EClassId>,
    rank: SecondaryMap<EClassId, u32>,
}

impl UnionFind {
    /// Register a freshly allocated class as its own singleton set.
    pub fn make_set(&mut self, id: EClassId) {
        self.parent.insert(id, id);
        self.rank.insert(id, 0);
    }

    /// Find `id`'s representative without mutating the structure.
    ///
    /// Used on read paths (pattern matching, inspection) where the
    /// e-graph is only accessed through `&self` — correct regardless of
    /// whether paths are compressed, just not as fast as [`Self::find_compress`].
    #[must_use]
    pub fn find(&self, id: EClassId) -> EClassId {
        let mut current = id;
        while let Some(&parent) = self.parent.get(current) {
            if parent == current {
                break;
            }
            current = parent;
        }
        current
    }

    /// Find `id`'s representative, compressing the path traversed.
    pub fn find_compress(&mut self, id: EClassId) -> EClassId {
        let root = self.find(id);
        let mut current = id;
        while current != root {
            let Some(&next) = self.parent.get(current) else {
                break;
            };
            self.parent.insert(current, root);
            current = next;
        }
        root
    }

    /// Union the sets containing `a` and `b`, returning the surviving
    /// representative.
    ///
    /// Tie-breaking: on equal rank, `a` (the left argument) survives
    /// and its rank increments.
    pub fn union(&mut self, a: EClassId, b: EClassId) -> EClassId {
        let root_a = self.find_compress(a);
        let root_b = self.find_compress(b);
        if root_a == root_b {
            return root_a;
        }
        let rank_a = self.rank.get(root_a).copied().unwrap_or(0);
        let rank_b = self.rank.get(root_b).copied().unwrap_or(0);
        if rank_a < rank_b {
            self.parent.insert(root_a, root_b);
            root_b
        } else if rank_a > rank_b {
            self.parent.insert(root_b, root_a);
            root_a
        } else {
            self.parent.insert(root_b, root_a);
            self.rank.insert(root_a, rank_a + 1);
            root_a
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::egraph::EGraph;

    #[test]
    fn singleton_finds_itself() {
        let mut uf = UnionFind::default();
        let mut graph = EGraph::new();
        let a = graph.add(super::super::ENode::num(1.0));
        uf.make_set(a);
        assert_eq!(uf.find(a), a);
    }

    #[test]
    fn union_picks_left_on_equal_rank() {
        let mut uf = UnionFind::default();
        let mut graph = EGraph::new();
        let a = graph.add(super::super::ENode::num(1.0));
        let b = graph.add(super::super::ENode::num(2.0));
        uf.make_set(a);
        uf.make_set(b);
        let survivor = uf.union(a, b);
        assert_eq!(survivor, a);
        assert_eq!(uf.find(b), a);
    }
}
