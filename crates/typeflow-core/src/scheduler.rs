//! The work-queue-driven propagation scheduler (spec §4.6).
//!
//! The scheduler owns the worklist of pending deliveries. It does not
//! touch node interiors directly — [`crate::Engine`] drains it and
//! executes each task, keeping all arena borrows local to one call.

use std::collections::VecDeque;

use typeflow_common::TypeIndex;

use crate::node::ConsumerId;
use crate::transition::TransitionId;
use typeflow_common::NodeId;

/// A scheduled delivery: either a batch of deltas for one consumer, or a
/// batch to forward through one transition.
pub(crate) enum Task {
    Consumer {
        node: NodeId,
        consumer: ConsumerId,
        delta: Vec<TypeIndex>,
    },
    Transition {
        id: TransitionId,
        delta: Vec<TypeIndex>,
    },
}

/// FIFO worklist of scheduled deliveries.
#[derive(Default)]
pub(crate) struct Scheduler {
    worklist: VecDeque<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.worklist.push_back(task);
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.worklist.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.worklist.is_empty()
    }
}
