//! Centralized limits and thresholds for the type-flow propagation engine.
//!
//! Centralizing these values documents the rationale for each bound in one
//! place instead of scattering magic numbers across the graph and
//! scheduler implementations.

/// Maximum number of types a `TypeSet` holds in its small (vector) form
/// before it converts to a dense bitset.
///
/// Spec §3 calls this `S` and fixes the reference value at 6, while
/// allowing implementations to tune it within `[4, 16]` without changing
/// observable semantics (spec §9, Open Question). The conversion is
/// one-way: once a set goes dense it never reverts, even if types are
/// (hypothetically) removed — which they never are, since sets only grow.
pub const SMALL_TYPE_SET_THRESHOLD: usize = 6;

/// Maximum degree (depth in the satellite chain) a node may reach before
/// it stops accepting or propagating new types.
///
/// Spec §3 Invariant 8 calls this `D_max` and fixes it at 2, which caps
/// nesting of array-of-array-of-... inference: a field node has degree 0,
/// its array-item satellite degree 1, and an array-item-of-array-item
/// satellite degree 2. Nothing beyond that propagates.
pub const MAX_NODE_DEGREE: u32 = 2;

/// Initial capacity hint, as a multiple of the current registry size,
/// used when a `TypeSet` first converts to its dense bitset form.
///
/// Spec §4.3 asks implementations to "size the dense bitset to
/// comfortably accommodate future growth" and suggests twice the current
/// registry size as the reference hint.
pub const DENSE_SET_CAPACITY_MULTIPLIER: usize = 2;
