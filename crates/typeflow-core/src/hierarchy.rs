//! The subtype filter cache and the class-hierarchy oracle it consults
//! (spec §4.2 "Subtype Filter").

use std::sync::Arc;

use dashmap::DashMap;
use typeflow_common::TypeIndex;
use typeflow_common::diagnostics::{DiagnosticLevel, DiagnosticsSink};

use crate::registry::TypeRegistry;

/// Class hierarchy metadata returned by [`ClassHierarchy::resolve_class`].
///
/// Opaque to the engine: its only use is as evidence that `name` is a
/// known class, so an unresolvable bound can be demoted to universal.
#[derive(Debug, Clone)]
pub struct ClassMetadata {
    pub name: Arc<str>,
}

/// The class-hierarchy oracle the engine consumes from its embedder
/// (spec §6). Must be stable — no retractions — during an analysis run.
pub trait ClassHierarchy: Send + Sync {
    /// Is `descendant_name` equal to, a subclass of, or an implementor of
    /// `ancestor_name`?
    fn is_subtype(&self, descendant_name: &str, ancestor_name: &str) -> bool;

    /// Resolves a class name to metadata, or `None` if unknown.
    fn resolve_class(&self, name: &str) -> Option<ClassMetadata>;
}

/// A node or transition's upper-bound filter.
///
/// An array-valued bound contributes no filter to the owning node
/// itself (`Bound::Array` always admits); the item bound is projected
/// onto the node's array-item satellite at its creation (spec §4.2,
/// §4.4).
#[derive(Debug, Clone)]
pub enum Bound {
    /// No filter: everything passes.
    Unbounded,
    /// An object bound with a declared upper-bound class name.
    Class(Arc<str>),
    /// An array-of-`item` bound. Projected onto the array-item satellite;
    /// admits everything at this node.
    Array(Arc<Bound>),
}

impl Bound {
    #[must_use]
    pub fn class(name: impl Into<Arc<str>>) -> Self {
        Bound::Class(name.into())
    }

    #[must_use]
    pub fn array_of(item: Bound) -> Self {
        Bound::Array(Arc::new(item))
    }

    /// The bound projected onto this node's array-item satellite: the
    /// wrapped item bound for `Array`, unbounded otherwise.
    #[must_use]
    pub fn item_bound(&self) -> Bound {
        match self {
            Bound::Array(item) => (**item).clone(),
            _ => Bound::Unbounded,
        }
    }
}

/// Memoises, per declared upper-bound class, whether a given type index
/// satisfies it. Consults the [`ClassHierarchy`] oracle on first use and
/// shares the cached predicate across every node with the same bound
/// (spec §4.2).
pub struct SubtypeFilterCache {
    oracle: Arc<dyn ClassHierarchy>,
    resolved: DashMap<Arc<str>, bool>,
    memo: DashMap<(Arc<str>, TypeIndex), bool>,
}

impl SubtypeFilterCache {
    #[must_use]
    pub fn new(oracle: Arc<dyn ClassHierarchy>) -> Self {
        Self {
            oracle,
            resolved: DashMap::new(),
            memo: DashMap::new(),
        }
    }

    /// Does `bound` admit the type at `idx`?
    pub fn admits(
        &self,
        bound: &Bound,
        registry: &TypeRegistry,
        idx: TypeIndex,
        diagnostics: &dyn DiagnosticsSink,
    ) -> bool {
        match bound {
            Bound::Unbounded | Bound::Array(_) => true,
            Bound::Class(class_name) => self.admits_class(class_name, registry, idx, diagnostics),
        }
    }

    fn is_resolvable(&self, class_name: &Arc<str>, diagnostics: &dyn DiagnosticsSink) -> bool {
        if let Some(hit) = self.resolved.get(class_name) {
            return *hit;
        }
        let ok = self.oracle.resolve_class(class_name).is_some();
        if !ok {
            diagnostics.report(
                DiagnosticLevel::Warning,
                &format!("unresolvable upper-bound class `{class_name}`; demoting to universal filter"),
            );
        }
        self.resolved.insert(class_name.clone(), ok);
        ok
    }

    fn admits_class(
        &self,
        class_name: &Arc<str>,
        registry: &TypeRegistry,
        idx: TypeIndex,
        diagnostics: &dyn DiagnosticsSink,
    ) -> bool {
        if !self.is_resolvable(class_name, diagnostics) {
            return true;
        }
        let key = (class_name.clone(), idx);
        if let Some(hit) = self.memo.get(&key) {
            return *hit;
        }
        let ty = registry.get(idx);
        let result = self.oracle.is_subtype(ty.name(), class_name);
        self.memo.insert(key, result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeflow_common::NullDiagnostics;

    struct FakeHierarchy {
        subtypes: Vec<(&'static str, &'static str)>,
        classes: Vec<&'static str>,
    }

    impl ClassHierarchy for FakeHierarchy {
        fn is_subtype(&self, descendant_name: &str, ancestor_name: &str) -> bool {
            descendant_name == ancestor_name
                || self
                    .subtypes
                    .iter()
                    .any(|&(d, a)| d == descendant_name && a == ancestor_name)
        }

        fn resolve_class(&self, name: &str) -> Option<ClassMetadata> {
            self.classes.contains(&name).then(|| ClassMetadata { name: name.into() })
        }
    }

    #[test]
    fn unresolvable_class_demotes_to_universal() {
        let oracle = Arc::new(FakeHierarchy {
            subtypes: vec![],
            classes: vec![],
        });
        let cache = SubtypeFilterCache::new(oracle);
        let registry = TypeRegistry::new();
        let t0 = registry.intern("T0").index();
        let bound = Bound::class("Missing");
        assert!(cache.admits(&bound, &registry, t0, &NullDiagnostics));
    }

    #[test]
    fn resolved_class_rejects_non_subtypes() {
        let oracle = Arc::new(FakeHierarchy {
            subtypes: vec![("T0", "C")],
            classes: vec!["C"],
        });
        let cache = SubtypeFilterCache::new(oracle);
        let registry = TypeRegistry::new();
        let t0 = registry.intern("T0").index();
        let t1 = registry.intern("T1").index();
        let bound = Bound::class("C");
        assert!(cache.admits(&bound, &registry, t0, &NullDiagnostics));
        assert!(!cache.admits(&bound, &registry, t1, &NullDiagnostics));
    }

    #[test]
    fn array_bound_admits_everything_at_owning_node() {
        let oracle = Arc::new(FakeHierarchy {
            subtypes: vec![],
            classes: vec!["C"],
        });
        let cache = SubtypeFilterCache::new(oracle);
        let registry = TypeRegistry::new();
        let t0 = registry.intern("T0").index();
        let bound = Bound::array_of(Bound::class("C"));
        assert!(cache.admits(&bound, &registry, t0, &NullDiagnostics));
        assert!(matches!(bound.item_bound(), Bound::Class(c) if &*c == "C"));
    }
}
