//! The engine's closed error taxonomy (spec §7).
//!
//! Self-connection and resolution-gap cases are deliberately *not*
//! represented here: per spec §4.7 and §7 they are silently ignored or
//! demoted to a universal filter, never surfaced as a `FlowError`.

/// Errors the type-flow engine can raise.
///
/// All variants are fatal: the embedder is expected to abandon the
/// analysis run on receiving one (spec §7 "Propagation policy").
#[derive(Debug, Clone, thiserror::Error)]
pub enum FlowError {
    /// A type was added to a node after the scheduler declared
    /// quiescence and the engine locked the graph (Invariant 9).
    #[error(
        "lock violation: cannot add type `{type_name}` to node `{tag}` \
         (method: {method:?}) after quiescence"
    )]
    LockViolation {
        type_name: String,
        tag: String,
        method: Option<String>,
    },

    /// `connect` was called with a null/absent destination.
    #[error("cannot connect a node to a null target")]
    NullTarget,

    /// The type registry could not grow further.
    #[error("type registry exhausted after interning {0} entries")]
    RegistryOverflow(usize),
}
