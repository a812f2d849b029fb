//! Whole-program type-flow graph and propagation engine.
//!
//! An [`Engine`] holds a graph of [`hierarchy::Bound`]-filtered nodes
//! connected by transitions, and propagates concrete types from their
//! points of origin outward to a fixed point, subject to per-node
//! degree bounds and subtype filters. See the individual modules for
//! the data model; [`Engine`] is the crate's public surface.

mod engine;
mod hierarchy;
mod node;
mod registry;
mod scheduler;
mod transition;
mod typeset;

pub use engine::{Engine, EngineConfig, EngineStats, TracingDiagnostics};
pub use hierarchy::{Bound, ClassHierarchy, ClassMetadata, SubtypeFilterCache};
pub use node::ConsumerId;
pub use registry::{Type, TypeRegistry};
pub use typeset::TypeSet;

pub use typeflow_common::{FlowError, NodeId, TypeIndex};
