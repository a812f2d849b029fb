//! The engine: owns the node arena, the transition arena, the type
//! registry, the subtype filter cache, and the propagation scheduler,
//! and exposes the public surface described in spec §6.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use typeflow_common::diagnostics::{DiagnosticLevel, DiagnosticsSink};
use typeflow_common::limits::MAX_NODE_DEGREE;
use typeflow_common::{FlowError, NodeId, TypeIndex};

use crate::hierarchy::{Bound, ClassHierarchy, SubtypeFilterCache};
use crate::node::{ConsumerId, NodeData};
use crate::registry::TypeRegistry;
use crate::scheduler::{Scheduler, Task};
use crate::transition::{TransitionData, TransitionId};

/// Forwards engine diagnostics to `tracing`, so the crate is usable
/// stand-alone without an embedder supplying a sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&self, level: DiagnosticLevel, message: &str) {
        match level {
            DiagnosticLevel::Trace => tracing::trace!(target: "typeflow_core", "{message}"),
            DiagnosticLevel::Warning => tracing::warn!(target: "typeflow_core", "{message}"),
        }
    }
}

/// Process-wide engine configuration, captured at construction (spec §6,
/// §9 Design Notes: "global toggles ... are not mutated after start").
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Emit per-edge and per-delta `tracing` traces.
    pub should_log: bool,
    /// Populate human-readable tags on satellite nodes (`X[`, `X@`).
    pub should_tag: bool,
    /// `D_max`: nodes with a greater degree stop accepting or propagating
    /// types (Invariant 8).
    pub max_degree: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            should_log: false,
            should_tag: false,
            max_degree: MAX_NODE_DEGREE,
        }
    }
}

/// A read-only snapshot of engine-internal counters, useful for the
/// embedder to log after a run completes.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub node_count: usize,
    pub transition_count: usize,
    pub interned_type_count: usize,
    pub locked: bool,
}

/// The type-flow graph and its propagation engine.
///
/// Single-threaded cooperative: all mutation happens behind `&self`
/// interior mutability, but the design assumes one logical thread of
/// control drives `propagate`/`connect`/`run` (spec §5). The
/// [`TypeRegistry`] and [`SubtypeFilterCache`] are internally
/// synchronized read-mostly resources shared across any concurrent
/// graph-construction threads.
pub struct Engine {
    config: EngineConfig,
    registry: TypeRegistry,
    filter_cache: SubtypeFilterCache,
    diagnostics: Box<dyn DiagnosticsSink>,
    nodes: RefCell<Vec<NodeData>>,
    transitions: RefCell<Vec<TransitionData>>,
    scheduler: RefCell<Scheduler>,
    locked: Cell<bool>,
    next_consumer_id: Cell<u64>,
}

impl Engine {
    /// Creates an engine with default configuration and a `tracing`-backed
    /// diagnostics sink.
    #[must_use]
    pub fn new(oracle: Arc<dyn ClassHierarchy>) -> Self {
        Self::with_config(oracle, EngineConfig::default(), Box::new(TracingDiagnostics))
    }

    #[must_use]
    pub fn with_config(
        oracle: Arc<dyn ClassHierarchy>,
        config: EngineConfig,
        diagnostics: Box<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            config,
            registry: TypeRegistry::new(),
            filter_cache: SubtypeFilterCache::new(oracle),
            diagnostics,
            nodes: RefCell::new(Vec::new()),
            transitions: RefCell::new(Vec::new()),
            scheduler: RefCell::new(Scheduler::new()),
            locked: Cell::new(false),
            next_consumer_id: Cell::new(0),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            node_count: self.nodes.borrow().len(),
            transition_count: self.transitions.borrow().len(),
            interned_type_count: self.registry.size(),
            locked: self.locked.get(),
        }
    }

    // ---------------------------------------------------------------
    // Node creation and bookkeeping
    // ---------------------------------------------------------------

    /// Creates a node with the given upper-bound filter (`Bound::Unbounded`
    /// for "no filter, everything passes").
    pub fn create_node(&self, bound: Bound) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId::from(nodes.len());
        nodes.push(NodeData::new(bound, self.locked.get()));
        id
    }

    pub fn set_tag(&self, node: NodeId, tag: impl Into<String>) {
        self.nodes.borrow_mut()[node.index()].tag = Some(tag.into());
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow()[node.index()].tag.clone()
    }

    pub fn set_method(&self, node: NodeId, method: impl Into<String>) {
        self.nodes.borrow_mut()[node.index()].method = Some(method.into());
    }

    #[must_use]
    pub fn method(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow()[node.index()].method.clone()
    }

    #[must_use]
    pub fn degree(&self, node: NodeId) -> u32 {
        self.nodes.borrow()[node.index()].degree
    }

    // ---------------------------------------------------------------
    // Satellites (spec §4.4)
    // ---------------------------------------------------------------

    /// Returns the unique array-item satellite, creating it on first call.
    pub fn array_item(&self, node: NodeId) -> NodeId {
        if let Some(existing) = self.nodes.borrow()[node.index()].array_item {
            return existing;
        }
        let (item_bound, degree, parent_tag) = {
            let nodes = self.nodes.borrow();
            let n = &nodes[node.index()];
            (n.bound.item_bound(), n.degree + 1, n.tag.clone())
        };
        let satellite = self.create_node(item_bound);
        let mut nodes = self.nodes.borrow_mut();
        nodes[satellite.index()].degree = degree;
        if self.config.should_tag {
            if let Some(parent_tag) = parent_tag {
                nodes[satellite.index()].tag = Some(format!("{parent_tag}["));
            }
        }
        nodes[node.index()].array_item = Some(satellite);
        satellite
    }

    /// Returns the unique class-value satellite, creating it on first
    /// call. Its own class-value is itself (Invariant 5: fixed point).
    pub fn class_value(&self, node: NodeId) -> NodeId {
        if let Some(existing) = self.nodes.borrow()[node.index()].class_value {
            return existing;
        }
        let (degree, parent_tag) = {
            let nodes = self.nodes.borrow();
            let n = &nodes[node.index()];
            (n.degree, n.tag.clone())
        };
        let satellite = self.create_node(Bound::Unbounded);
        let mut nodes = self.nodes.borrow_mut();
        nodes[satellite.index()].degree = degree;
        nodes[satellite.index()].class_value = Some(satellite);
        if self.config.should_tag {
            if let Some(parent_tag) = parent_tag {
                nodes[satellite.index()].tag = Some(format!("{parent_tag}@"));
            }
        }
        nodes[node.index()].class_value = Some(satellite);
        satellite
    }

    // ---------------------------------------------------------------
    // Type ingress (spec §4.4 "Type ingress")
    // ---------------------------------------------------------------

    /// Buffers `ty` into `node`'s pending set, subject to the degree
    /// bound, existing membership, and the node's filter. Never mutates
    /// the authoritative set directly; that happens in
    /// [`Engine::apply_pending`].
    pub fn propagate(&self, node: NodeId, ty: TypeIndex) {
        let bound = {
            let nodes = self.nodes.borrow();
            let n = &nodes[node.index()];
            if n.degree > self.config.max_degree || n.types.contains(ty) {
                return;
            }
            n.bound.clone()
        };
        if !self.filter_cache.admits(&bound, &self.registry, ty, self.diagnostics.as_ref()) {
            return;
        }
        if self.config.should_log {
            self.diagnostics.report(
                DiagnosticLevel::Trace,
                &format!("propagate: node={node:?} type={}", self.registry.get(ty).name()),
            );
        }
        let registry_size = self.registry.size();
        self.nodes.borrow_mut()[node.index()].pending.add(ty, registry_size);
    }

    /// Batch form of [`Engine::propagate`] with identical per-element
    /// semantics — including the degree check, applied per element
    /// rather than only once at the top (spec §9 Open Question: the
    /// reference implementation's inconsistency is resolved here by
    /// applying the check uniformly).
    pub fn propagate_batch(&self, node: NodeId, types: &[TypeIndex]) {
        for &ty in types {
            self.propagate(node, ty);
        }
    }

    /// Drains `node`'s pending set into its authoritative set and
    /// schedules delivery of the delta to consumers and outbound
    /// transitions. Returns a [`FlowError::LockViolation`] if the node
    /// was locked and its pending set was non-empty.
    pub fn apply_pending(&self, node: NodeId) -> Result<(), FlowError> {
        let registry_size = self.registry.size();
        let delta = {
            let mut nodes = self.nodes.borrow_mut();
            let degree = nodes[node.index()].degree;
            if degree > self.config.max_degree {
                nodes[node.index()].pending.take();
                return Ok(());
            }
            if nodes[node.index()].pending.is_empty() {
                return Ok(());
            }
            if nodes[node.index()].locked {
                let offending = nodes[node.index()].pending.iter().next().expect("checked non-empty above");
                let type_name = self.registry.get(offending).name().to_string();
                let tag = nodes[node.index()].tag.clone().unwrap_or_default();
                let method = nodes[node.index()].method.clone();
                nodes[node.index()].pending.take();
                return Err(FlowError::LockViolation { type_name, tag, method });
            }
            let pending = nodes[node.index()].pending.take();
            let mut delta = Vec::new();
            for t in pending.iter() {
                if nodes[node.index()].types.add(t, registry_size) {
                    delta.push(t);
                }
            }
            delta
        };
        if delta.is_empty() {
            return Ok(());
        }
        self.schedule_deliveries(node, delta);
        Ok(())
    }

    fn schedule_deliveries(&self, node: NodeId, delta: Vec<TypeIndex>) {
        let (consumer_ids, out_transitions) = {
            let nodes = self.nodes.borrow();
            let n = &nodes[node.index()];
            (
                n.consumers.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
                n.out.clone(),
            )
        };
        let mut scheduler = self.scheduler.borrow_mut();
        for consumer in consumer_ids {
            scheduler.push(Task::Consumer {
                node,
                consumer,
                delta: delta.clone(),
            });
        }
        for id in out_transitions {
            scheduler.push(Task::Transition { id, delta: delta.clone() });
        }
    }

    // ---------------------------------------------------------------
    // Connections (spec §4.4 "Connection", §4.5 "Transition")
    // ---------------------------------------------------------------

    /// Connects `source` to `destination` with no edge filter.
    pub fn connect(&self, source: NodeId, destination: NodeId) -> Result<(), FlowError> {
        self.connect_filtered(source, destination, None)
    }

    /// Connects `source` to `destination` with an edge filter that
    /// composes with the destination's own filter (spec §3 "Transition").
    pub fn connect_filtered(
        &self,
        source: NodeId,
        destination: NodeId,
        edge_filter: Option<Bound>,
    ) -> Result<(), FlowError> {
        if source == destination {
            return Ok(()); // self-loops are silently ignored, not an error (spec §4.4, §7)
        }
        let already_connected = {
            let nodes = self.nodes.borrow();
            let transitions = self.transitions.borrow();
            nodes[source.index()]
                .out
                .iter()
                .any(|&id| transitions[id.index()].destination == destination)
        };
        if already_connected {
            return Ok(());
        }
        let transition_id = {
            let mut transitions = self.transitions.borrow_mut();
            let id = TransitionId::from(transitions.len());
            transitions.push(TransitionData {
                source,
                destination,
                edge_filter,
            });
            id
        };
        {
            let mut nodes = self.nodes.borrow_mut();
            nodes[source.index()].out.push(transition_id);
            nodes[destination.index()].inbound.push(transition_id);
        }
        let current: Vec<TypeIndex> = self.nodes.borrow()[source.index()].types.iter().collect();
        if !current.is_empty() {
            self.scheduler.borrow_mut().push(Task::Transition {
                id: transition_id,
                delta: current,
            });
        }
        Ok(())
    }

    /// Connects to a possibly-absent destination, raising
    /// [`FlowError::NullTarget`] when `destination` is `None` — the
    /// fatal case spec §4.4/§7 describe for a null connect target.
    pub fn connect_optional(
        &self,
        source: NodeId,
        destination: Option<NodeId>,
        edge_filter: Option<Bound>,
    ) -> Result<(), FlowError> {
        match destination {
            Some(destination) => self.connect_filtered(source, destination, edge_filter),
            None => Err(FlowError::NullTarget),
        }
    }

    // ---------------------------------------------------------------
    // Consumers
    // ---------------------------------------------------------------

    /// Registers a consumer, always as a newly distinct registration. If
    /// `node` already has types, schedules a catch-up delivery of the
    /// current set (spec Invariant 4, scenario 5).
    pub fn add_consumer<F>(&self, node: NodeId, consumer: F) -> ConsumerId
    where
        F: FnMut(&[TypeIndex]) + 'static,
    {
        let id = self.fresh_consumer_id();
        self.add_consumer_keyed(node, id, consumer);
        id
    }

    /// Registers `consumer` under `id`. A second registration under the
    /// same `id` is a no-op (spec Invariant 5: idempotent `addConsumer`).
    pub fn add_consumer_keyed<F>(&self, node: NodeId, id: ConsumerId, consumer: F)
    where
        F: FnMut(&[TypeIndex]) + 'static,
    {
        let already = self.nodes.borrow()[node.index()]
            .consumers
            .iter()
            .any(|&(existing, _)| existing == id);
        if already {
            return;
        }
        let callback: Rc<RefCell<dyn FnMut(&[TypeIndex])>> = Rc::new(RefCell::new(consumer));
        let current = {
            let mut nodes = self.nodes.borrow_mut();
            let n = &mut nodes[node.index()];
            n.consumers.push((id, callback));
            n.types.iter().collect::<Vec<_>>()
        };
        if !current.is_empty() {
            self.scheduler.borrow_mut().push(Task::Consumer {
                node,
                consumer: id,
                delta: current,
            });
        }
    }

    fn fresh_consumer_id(&self) -> ConsumerId {
        let raw = self.next_consumer_id.get();
        self.next_consumer_id.set(raw + 1);
        ConsumerId::new(raw)
    }

    // ---------------------------------------------------------------
    // Scheduler dispatch (spec §4.6)
    // ---------------------------------------------------------------

    /// Drains the worklist and every node's pending set to quiescence:
    /// state in which the worklist and every node's pending set are
    /// empty (spec §4.6, GLOSSARY "Quiescence").
    pub fn run(&self) -> Result<(), FlowError> {
        loop {
            while let Some(task) = self.scheduler.borrow_mut().pop() {
                self.execute_task(task)?;
            }
            let pending_nodes: Vec<NodeId> = {
                let nodes = self.nodes.borrow();
                (0..nodes.len())
                    .map(NodeId::from)
                    .filter(|&id| !nodes[id.index()].pending.is_empty())
                    .collect()
            };
            if pending_nodes.is_empty() && self.scheduler.borrow().is_empty() {
                return Ok(());
            }
            for node in pending_nodes {
                self.apply_pending(node)?;
            }
        }
    }

    fn execute_task(&self, task: Task) -> Result<(), FlowError> {
        match task {
            Task::Consumer { node, consumer, delta } => {
                let callback = self.nodes.borrow()[node.index()]
                    .consumers
                    .iter()
                    .find(|(id, _)| *id == consumer)
                    .map(|(_, cb)| cb.clone());
                if let Some(callback) = callback {
                    (*callback.borrow_mut())(&delta);
                }
                Ok(())
            }
            Task::Transition { id, delta } => {
                let (destination, edge_filter, dest_bound) = {
                    let transitions = self.transitions.borrow();
                    let t = &transitions[id.index()];
                    let nodes = self.nodes.borrow();
                    (t.destination, t.edge_filter.clone(), nodes[t.destination.index()].bound.clone())
                };
                for ty in delta {
                    if let Some(edge_filter) = &edge_filter {
                        if !self.filter_cache.admits(edge_filter, &self.registry, ty, self.diagnostics.as_ref()) {
                            continue;
                        }
                    }
                    if !self.filter_cache.admits(&dest_bound, &self.registry, ty, self.diagnostics.as_ref()) {
                        continue;
                    }
                    self.propagate(destination, ty);
                }
                Ok(())
            }
        }
    }

    // ---------------------------------------------------------------
    // Locking (spec §4.4 "Locking", Invariant 9)
    // ---------------------------------------------------------------

    /// Transitions the engine to locked state. After this call, any
    /// attempt to grow a node's type set raises
    /// [`FlowError::LockViolation`] (surfaced by [`Engine::apply_pending`]
    /// / [`Engine::run`]); read operations remain available.
    pub fn lock(&self) {
        self.locked.set(true);
        for n in self.nodes.borrow_mut().iter_mut() {
            n.locked = true;
        }
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    // ---------------------------------------------------------------
    // Query surface (spec §4.4 "Query surface")
    // ---------------------------------------------------------------

    #[must_use]
    pub fn has_type(&self, node: NodeId, ty: TypeIndex) -> bool {
        self.nodes.borrow()[node.index()].types.contains(ty)
    }

    /// Unknown type names are "not present" (spec §4.7), not an error.
    #[must_use]
    pub fn has_type_named(&self, node: NodeId, name: &str) -> bool {
        match self.registry.get_type(name) {
            Some(ty) => self.has_type(node, ty.index()),
            None => false,
        }
    }

    /// Every name currently accepted by `node` (already filter-admitted,
    /// since only admitted types are ever inserted into its set).
    #[must_use]
    pub fn types(&self, node: NodeId) -> Vec<String> {
        self.nodes.borrow()[node.index()]
            .types
            .iter()
            .map(|idx| self.registry.get(idx).name().to_string())
            .collect()
    }

    /// True iff the array-item satellite has been materialised and holds
    /// at least one type.
    #[must_use]
    pub fn has_array_type(&self, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        match nodes[node.index()].array_item {
            Some(satellite) => !nodes[satellite.index()].types.is_empty(),
            None => false,
        }
    }

    #[must_use]
    pub fn type_count(&self, node: NodeId) -> usize {
        self.nodes.borrow()[node.index()].types.size()
    }
}
