//! A directed edge between two nodes, optionally carrying a per-edge
//! filter (spec §3 "Transition", §4.5).

use typeflow_common::NodeId;

use crate::hierarchy::Bound;

/// Identifies a transition within the engine's transition arena.
///
/// Package-private: transitions are never named by the embedder directly,
/// only created via `Engine::connect` and fired by the scheduler (spec §6
/// lists `connect`, not transition handles, as the public surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TransitionId(u32);

impl From<usize> for TransitionId {
    fn from(value: usize) -> Self {
        Self(value as u32)
    }
}

impl TransitionId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

pub(crate) struct TransitionData {
    pub source: NodeId,
    pub destination: NodeId,
    pub edge_filter: Option<Bound>,
}
