//! Identifier interning.
//!
//! Parameter names, intermediate-binding names, struct field names, and
//! built-in call names all flow through here. Interning turns the
//! equality/hash checks on the matcher's hot path (see
//! [`crate::egraph::pattern`]) from string comparisons into `u32`
//! comparisons. A single compile here touches at most a few hundred
//! distinct names, so one `RwLock`-guarded table is enough — no need
//! for a sharded registry built for a process juggling many
//! concurrently-parsed formulas.

use rustc_hash::FxHashMap;
use std::sync::{Arc, LazyLock, RwLock};

/// An interned identifier: cheap to copy, compares in O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(u32);

impl Ident {
    /// Resolve back to the original string.
    ///
    /// # Panics
    /// Panics if the global registry lock is poisoned.
    #[must_use]
    pub fn as_str(self) -> Arc<str> {
        registry()
            .read()
            .expect("identifier registry poisoned")
            .names[self.0 as usize]
            .clone()
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct Registry {
    names: Vec<Arc<str>>,
    by_name: FxHashMap<Arc<str>, Ident>,
}

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: LazyLock<RwLock<Registry>> = LazyLock::new(|| {
        RwLock::new(Registry {
            names: Vec::new(),
            by_name: FxHashMap::default(),
        })
    });
    &REGISTRY
}

/// Intern `name`, returning the existing id if already present.
///
/// # Panics
/// Panics if the global registry lock is poisoned.
pub fn intern(name: &str) -> Ident {
    if let Some(&id) = registry()
        .read()
        .expect("identifier registry poisoned")
        .by_name
        .get(name)
    {
        return id;
    }

    let mut guard = registry().write().expect("identifier registry poisoned");
    // Another writer may have interned `name` while we waited for the lock.
    if let Some(&id) = guard.by_name.get(name) {
        return id;
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "a single compile never interns anywhere near u32::MAX identifiers"
    )]
    let id = Ident(guard.names.len() as u32);
    let arc: Arc<str> = Arc::from(name);
    guard.names.push(arc.clone());
    guard.by_name.insert(arc, id);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = intern("gradc-test-u");
        let b = intern("gradc-test-v");
        let a2 = intern("gradc-test-u");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(&*a.as_str(), "gradc-test-u");
        assert_eq!(&*b.as_str(), "gradc-test-v");
    }
}
