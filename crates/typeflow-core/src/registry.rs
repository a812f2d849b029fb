//! Interns type descriptors into dense, non-negative integer indices
//! (spec §4.1 "Type Registry").

use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;
use typeflow_common::TypeIndex;

/// An interned type descriptor: a stable index paired with its name.
#[derive(Debug, Clone)]
pub struct Type {
    index: TypeIndex,
    name: Arc<str>,
}

impl Type {
    #[must_use]
    pub fn index(&self) -> TypeIndex {
        self.index
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    names: Vec<Arc<str>>,
    by_name: FxHashMap<Arc<str>, TypeIndex>,
}

/// Interns type names into dense indices, stable for the lifetime of an
/// analysis run. Internally synchronized so graph construction may
/// proceed from multiple threads (spec §4.1, §5).
#[derive(Debug, Default)]
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning its `Type`. Idempotent: interning the
    /// same name twice returns the same index.
    pub fn intern(&self, name: &str) -> Type {
        if let Some(existing) = self.get_type(name) {
            return existing;
        }
        let mut inner = self.inner.write().expect("type registry lock poisoned");
        if let Some(&index) = inner.by_name.get(name) {
            return Type {
                index,
                name: inner.names[index.index()].clone(),
            };
        }
        let name: Arc<str> = Arc::from(name);
        let index = TypeIndex::from(inner.names.len());
        inner.names.push(name.clone());
        inner.by_name.insert(name.clone(), index);
        Type { index, name }
    }

    /// Returns the `Type` for `index`.
    ///
    /// # Panics
    /// Panics if `index` was never produced by this registry; indices
    /// are only ever handed out by [`TypeRegistry::intern`].
    #[must_use]
    pub fn get(&self, index: TypeIndex) -> Type {
        self.try_get(index).expect("TypeIndex not present in registry")
    }

    #[must_use]
    pub fn try_get(&self, index: TypeIndex) -> Option<Type> {
        let inner = self.inner.read().expect("type registry lock poisoned");
        inner.names.get(index.index()).cloned().map(|name| Type { index, name })
    }

    /// Looks up an already-interned type by name, without interning it.
    #[must_use]
    pub fn get_type(&self, name: &str) -> Option<Type> {
        let inner = self.inner.read().expect("type registry lock poisoned");
        inner.by_name.get(name).map(|&index| Type {
            index,
            name: inner.names[index.index()].clone(),
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.read().expect("type registry lock poisoned").names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent_and_dense() {
        let registry = TypeRegistry::new();
        let a = registry.intern("A");
        let b = registry.intern("B");
        let a_again = registry.intern("A");
        assert_eq!(a.index(), a_again.index());
        assert_ne!(a.index(), b.index());
        assert_eq!(a.index().index(), 0);
        assert_eq!(b.index().index(), 1);
        assert_eq!(registry.size(), 2);
    }

    #[test]
    fn get_type_does_not_intern() {
        let registry = TypeRegistry::new();
        assert!(registry.get_type("Missing").is_none());
        assert_eq!(registry.size(), 0);
    }
}
