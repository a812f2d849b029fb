//! Node interior state (spec §3 "Node", §4.4).
//!
//! `NodeData` is the arena entry; the engine owns the arena and hands out
//! stable [`typeflow_common::NodeId`] handles. Transitions, consumers, and
//! satellite references are stored as handle fields, never owning
//! references, per the Design Notes in spec §9.

use std::cell::RefCell;
use std::rc::Rc;

use typeflow_common::{NodeId, TypeIndex};

use crate::hierarchy::Bound;
use crate::transition::TransitionId;
use crate::typeset::TypeSet;

/// A dedup key for [`crate::Engine::add_consumer_keyed`].
///
/// Rust closures have no stable identity to compare, so idempotent
/// registration (spec §4.4 "addConsumer is idempotent") is expressed
/// against an explicit key rather than the closure value itself. The
/// ergonomic [`crate::Engine::add_consumer`] mints a fresh key per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(u64);

impl ConsumerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

pub(crate) type ConsumerCallback = Rc<RefCell<dyn FnMut(&[TypeIndex])>>;

pub(crate) struct NodeData {
    pub bound: Bound,
    pub types: TypeSet,
    pub pending: TypeSet,
    pub out: Vec<TransitionId>,
    pub inbound: Vec<TransitionId>,
    pub consumers: Vec<(ConsumerId, ConsumerCallback)>,
    pub array_item: Option<NodeId>,
    pub class_value: Option<NodeId>,
    pub degree: u32,
    pub locked: bool,
    pub tag: Option<String>,
    pub method: Option<String>,
}

impl NodeData {
    pub fn new(bound: Bound, locked: bool) -> Self {
        Self {
            bound,
            types: TypeSet::new(),
            pending: TypeSet::new(),
            out: Vec::new(),
            inbound: Vec::new(),
            consumers: Vec::new(),
            array_item: None,
            class_value: None,
            degree: 0,
            locked,
            tag: None,
            method: None,
        }
    }
}
