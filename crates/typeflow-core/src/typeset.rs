//! The compact-then-dense set representation stored inside each node
//! (spec §3 "TypeSet", §4.3).

use fixedbitset::FixedBitSet;
use smallvec::SmallVec;
use typeflow_common::TypeIndex;
use typeflow_common::limits::{DENSE_SET_CAPACITY_MULTIPLIER, SMALL_TYPE_SET_THRESHOLD};

#[derive(Debug, Clone)]
enum Repr {
    Small(SmallVec<[TypeIndex; SMALL_TYPE_SET_THRESHOLD]>),
    Dense(FixedBitSet),
}

/// A monotonically growing set of `TypeIndex` values.
///
/// Starts in the small (unsorted vector) form and converts one-way to a
/// dense bitset once an insertion would exceed
/// [`SMALL_TYPE_SET_THRESHOLD`]. Membership is O(1) amortised in both
/// forms; enumeration is O(|set|), ascending for the dense form,
/// insertion order for the small form (spec §4.3).
#[derive(Debug, Clone)]
pub struct TypeSet {
    repr: Repr,
}

impl Default for TypeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            repr: Repr::Small(SmallVec::new()),
        }
    }

    #[must_use]
    pub fn contains(&self, idx: TypeIndex) -> bool {
        match &self.repr {
            Repr::Small(v) => v.contains(&idx),
            Repr::Dense(bits) => idx.index() < bits.len() && bits.contains(idx.index()),
        }
    }

    /// Inserts `idx`, returning whether it was newly added.
    ///
    /// `registry_size` seeds the dense bitset's initial capacity on
    /// small-to-dense conversion: the reference implementation sizes it
    /// to twice the current registry size (spec §4.3).
    pub fn add(&mut self, idx: TypeIndex, registry_size: usize) -> bool {
        match &mut self.repr {
            Repr::Small(v) => {
                if v.contains(&idx) {
                    return false;
                }
                if v.len() < SMALL_TYPE_SET_THRESHOLD {
                    v.push(idx);
                    return true;
                }
                let capacity = registry_size.max(idx.index() + 1) * DENSE_SET_CAPACITY_MULTIPLIER;
                let mut bits = FixedBitSet::with_capacity(capacity.max(1));
                for existing in v.iter().copied() {
                    grow_and_insert(&mut bits, existing.index());
                }
                let inserted = grow_and_insert(&mut bits, idx.index());
                self.repr = Repr::Dense(bits);
                inserted
            }
            Repr::Dense(bits) => grow_and_insert(bits, idx.index()),
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        match &self.repr {
            Repr::Small(v) => v.len(),
            Repr::Dense(bits) => bits.count_ones(..),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Removes and returns all elements, leaving `self` empty (small form).
    pub fn take(&mut self) -> TypeSet {
        std::mem::replace(self, TypeSet::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = TypeIndex> + '_ {
        match &self.repr {
            Repr::Small(v) => Box::new(v.iter().copied()) as Box<dyn Iterator<Item = TypeIndex> + '_>,
            Repr::Dense(bits) => Box::new(bits.ones().map(TypeIndex::from)),
        }
    }
}

fn grow_and_insert(bits: &mut FixedBitSet, index: usize) -> bool {
    if index >= bits.len() {
        bits.grow(index + 1);
    }
    if bits.contains(index) {
        false
    } else {
        bits.insert(index);
        true
    }
}
