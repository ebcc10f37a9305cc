//! Dataflow graph and propagation driver.
//!
//! The graph owns every node, port and edge. Mutations record which nodes
//! need to run; [`Dataflow::propagate`] turns them into a pass:
//! 1. Collect the root nodes (plus the unfinished part of a superseded pass).
//! 2. Bump the generation and plan the pass in topological order.
//! 3. Visit each planned node. Nodes whose inputs and settings did not change
//!    are marked clean without running.
//! 4. Push new outputs into the input ports of downstream nodes.
//!
//! A node that needs a dataset suspends the pass. The caller fetches it and
//! hands the text back through [`Dataflow::resume`] together with the ticket
//! from the request. Tickets from a superseded pass are discarded.

use crate::data::Package;
use crate::flow::edge::Edge;
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::events::{FlowEvent, FlowEvents};
use crate::flow::id::{EdgeId, NodeId, PortId};
use crate::flow::node::{
    AnyNode, AsyncCompletion, AsyncRequest, AsyncTicket, BuiltinNode, ConfigValue, NodeContext,
    NodeState, Position, ProcessOutcome,
};
use crate::flow::nodes::IdentityNode;
use crate::flow::port::{Port, PortDirection};
use crate::flow::scheduler::{PropagationPlan, PropagationScheduler};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A slot holding a node and its ports.
pub struct NodeSlot {
    pub node: AnyNode,
    pub ports: Vec<Port>,
    pub position: Position,
    pub label: String,
    pub state: NodeState,
    /// Settings changed or the node was (re)created; run it even if no input changed.
    pub needs_process: bool,
    /// Whether this node has been removed. The node object is kept so undo can revive it.
    pub deleted: bool,
    /// A removed node that no history record can revive. Its payload has been dropped.
    pub released: bool,
}

fn build_ports(id: NodeId, node: &AnyNode) -> Vec<Port> {
    node.ports()
        .iter()
        .enumerate()
        .map(|(i, descriptor)| Port::new(PortId::new(id, i as u16), *descriptor))
        .collect()
}

impl NodeSlot {
    pub fn new(id: NodeId, node: AnyNode) -> Self {
        let ports = build_ports(id, &node);
        let label = node.name().to_string();
        Self {
            node,
            ports,
            position: Position::default(),
            label,
            state: NodeState::Dirty,
            needs_process: true,
            deleted: false,
            released: false,
        }
    }

    fn inputs_changed(&self) -> bool {
        self.ports.iter().any(|p| p.is_input() && p.is_changed())
    }

    fn clear_input_flags(&mut self) {
        for port in self.ports.iter_mut().filter(|p| p.is_input()) {
            port.clear_changed();
        }
    }
}

/// An edge removed from the graph, with enough detail to put it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedEdge {
    pub source: PortId,
    pub target: PortId,
    /// Position the edge held among the target port's connections.
    pub slot: usize,
}

/// Where propagation stands after a call to `propagate` or `resume`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassStatus {
    /// Nothing to do.
    Idle,
    Completed { generation: u64, processed: usize },
    /// Waiting for a dataset. Feed the text back through `resume`.
    Suspended(AsyncRequest),
    /// The completion belonged to a superseded pass and was ignored.
    Stale,
}

struct ActivePass {
    plan: PropagationPlan,
    cursor: usize,
    processed: usize,
    awaiting: Option<AsyncRequest>,
}

/// The node/port/edge graph.
pub struct Dataflow {
    nodes: Vec<NodeSlot>,
    edges: Vec<Option<Edge>>,
    generation: u64,
    pending_roots: BTreeSet<NodeId>,
    pass: Option<ActivePass>,
    events: FlowEvents,
}

impl Default for Dataflow {
    fn default() -> Self {
        Self::new(FlowEvents::disabled())
    }
}

impl Dataflow {
    pub fn new(events: FlowEvents) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            generation: 0,
            pending_roots: BTreeSet::new(),
            pass: None,
            events,
        }
    }

    pub fn set_events(&mut self, events: FlowEvents) {
        self.events = events;
    }

    pub fn events(&self) -> &FlowEvents {
        &self.events
    }

    // ── Lookup ──

    fn slot(&self, id: NodeId) -> FlowResult<&NodeSlot> {
        self.nodes
            .get(id.index())
            .filter(|slot| !slot.deleted)
            .ok_or(FlowError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> FlowResult<&mut NodeSlot> {
        self.nodes
            .get_mut(id.index())
            .filter(|slot| !slot.deleted)
            .ok_or(FlowError::UnknownNode(id))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.slot(id).is_ok()
    }

    pub fn node(&self, id: NodeId) -> Option<&AnyNode> {
        self.slot(id).ok().map(|slot| &slot.node)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut AnyNode> {
        self.slot_mut(id).ok().map(|slot| &mut slot.node)
    }

    /// Live node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.deleted)
            .map(|(i, _)| NodeId(i as u32))
    }

    pub fn is_released(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|slot| slot.released)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| !slot.deleted).count()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().flatten()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index()).and_then(Option::as_ref)
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    pub fn node_state(&self, id: NodeId) -> Option<NodeState> {
        self.slot(id).ok().map(|slot| slot.state)
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.slot(id).ok().map(|slot| slot.position)
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.slot(id).ok().map(|slot| slot.label.as_str())
    }

    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) -> FlowResult<()> {
        self.slot_mut(id)?.label = label.into();
        Ok(())
    }

    pub fn ports(&self, id: NodeId) -> FlowResult<&[Port]> {
        Ok(&self.slot(id)?.ports)
    }

    pub fn port(&self, id: PortId) -> FlowResult<&Port> {
        let slot = self.slot(id.node())?;
        slot.ports
            .get(id.port_index() as usize)
            .ok_or_else(|| FlowError::UnknownPort {
                node: id.node(),
                port: format!("#{}", id.port_index()),
            })
    }

    fn port_mut(&mut self, id: PortId) -> FlowResult<&mut Port> {
        let slot = self.slot_mut(id.node())?;
        slot.ports
            .get_mut(id.port_index() as usize)
            .ok_or_else(|| FlowError::UnknownPort {
                node: id.node(),
                port: format!("#{}", id.port_index()),
            })
    }

    /// Resolve a port by name.
    pub fn port_id(&self, node: NodeId, name: &str) -> FlowResult<PortId> {
        self.slot(node)?
            .ports
            .iter()
            .find(|p| p.name() == name)
            .map(Port::id)
            .ok_or_else(|| FlowError::UnknownPort {
                node,
                port: name.to_string(),
            })
    }

    /// Current package of a port, by name.
    pub fn package(&self, node: NodeId, port: &str) -> FlowResult<Arc<Package>> {
        let id = self.port_id(node, port)?;
        Ok(self.port(id)?.package().clone())
    }

    /// Current output package of a node's `out` port.
    pub fn output_package(&self, node: NodeId) -> FlowResult<Arc<Package>> {
        self.package(node, "out")
    }

    /// True when the node produced new output in the latest pass.
    pub fn is_updated(&self, node: NodeId) -> bool {
        self.slot(node)
            .map(|slot| slot.ports.iter().any(|p| !p.is_input() && p.is_changed()))
            .unwrap_or(false)
    }

    /// The edge linking `source` to `target`, if any.
    pub fn find_edge(&self, source: PortId, target: PortId) -> Option<EdgeId> {
        self.edges()
            .find(|e| e.source() == source && e.target() == target)
            .map(Edge::id)
    }

    /// Edges touching `node`, in id order.
    pub fn incident_edges(&self, node: NodeId) -> Vec<EdgeId> {
        self.edges()
            .filter(|e| e.touches(node))
            .map(Edge::id)
            .collect()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Graph mutation ──

    fn mark_root(&mut self, id: NodeId) {
        self.pending_roots.insert(id);
    }

    fn set_state(&mut self, id: NodeId, state: NodeState) {
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            if slot.state != state {
                slot.state = state;
                self.events
                    .emit(FlowEvent::NodeStateChanged { node: id, state });
            }
        }
    }

    /// Add a node. It is processed in the next pass.
    pub fn add_node(&mut self, node: impl Into<AnyNode>, position: Position) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut slot = NodeSlot::new(id, node.into());
        slot.position = position;
        tracing::info!("Added node {:?} ({})", id, slot.label);
        self.nodes.push(slot);
        self.mark_root(id);
        self.events.emit(FlowEvent::NodeAdded(id));
        id
    }

    /// Bring a removed node back into its old slot with fresh ports.
    pub fn revive_node(&mut self, id: NodeId) -> FlowResult<()> {
        let slot = self
            .nodes
            .get_mut(id.index())
            .ok_or(FlowError::UnknownNode(id))?;
        if !slot.deleted {
            return Err(FlowError::HistoryReplay(format!("{:?} is already present", id)));
        }
        if slot.released {
            return Err(FlowError::HistoryReplay(format!("{:?} was released", id)));
        }
        slot.ports = build_ports(id, &slot.node);
        slot.deleted = false;
        slot.needs_process = true;
        slot.state = NodeState::Dirty;
        tracing::info!("Restored node {:?} ({})", id, slot.label);
        self.mark_root(id);
        self.events.emit(FlowEvent::NodeAdded(id));
        Ok(())
    }

    /// Remove a node after disconnecting all of its edges.
    ///
    /// Returns the removed edges in removal order.
    pub fn remove_node(&mut self, id: NodeId) -> FlowResult<Vec<RemovedEdge>> {
        self.slot(id)?;
        let mut removed = Vec::new();
        for edge in self.incident_edges(id) {
            removed.push(self.disconnect(edge)?);
        }
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            slot.deleted = true;
            // Revival rebuilds the ports, so the last packages can go now.
            slot.ports = Vec::new();
        }
        self.pending_roots.remove(&id);
        tracing::info!("Removed node {:?}", id);
        self.events.emit(FlowEvent::NodeRemoved(id));
        Ok(removed)
    }

    /// Drop the payload of a removed node that can no longer be revived.
    ///
    /// The slot stays so later ids keep their index. Releasing twice is a no-op.
    pub fn release_node(&mut self, id: NodeId) -> FlowResult<()> {
        let slot = self
            .nodes
            .get_mut(id.index())
            .ok_or(FlowError::UnknownNode(id))?;
        if !slot.deleted {
            return Err(FlowError::HistoryReplay(format!("{:?} is still present", id)));
        }
        if !slot.released {
            slot.node = AnyNode::Builtin(BuiltinNode::Identity(IdentityNode::new()));
            slot.label = String::new();
            slot.released = true;
            tracing::debug!("Released node {:?}", id);
        }
        Ok(())
    }

    /// Move a node. Returns its previous position.
    pub fn move_node(&mut self, id: NodeId, position: Position) -> FlowResult<Position> {
        let slot = self.slot_mut(id)?;
        let previous = std::mem::replace(&mut slot.position, position);
        self.events.emit(FlowEvent::NodeMoved(id));
        Ok(previous)
    }

    /// Check that an edge from `source` to `target` may be created.
    pub fn can_connect(&self, source: PortId, target: PortId) -> FlowResult<()> {
        let source_port = self.port(source)?;
        let target_port = self.port(target)?;
        if source_port.descriptor().direction != PortDirection::Output {
            return Err(FlowError::PortMismatch(format!(
                "'{}' is not an output port",
                source_port.name()
            )));
        }
        if target_port.descriptor().direction != PortDirection::Input {
            return Err(FlowError::PortMismatch(format!(
                "'{}' is not an input port",
                target_port.name()
            )));
        }
        if source.node() == target.node() {
            return Err(FlowError::SameNode);
        }
        if source_port.kind() != target_port.kind() {
            return Err(FlowError::PortMismatch(format!(
                "cannot connect {} output '{}' to {} input '{}'",
                source_port.kind(),
                source_port.name(),
                target_port.kind(),
                target_port.name()
            )));
        }
        if self.find_edge(source, target).is_some() {
            return Err(FlowError::DuplicateConnection);
        }
        if !target_port.has_more_connections() {
            return Err(FlowError::PortFull(target));
        }
        if PropagationScheduler::would_create_cycle(
            &self.nodes,
            &self.edges,
            source.node(),
            target.node(),
        ) {
            return Err(FlowError::CycleDetected);
        }
        Ok(())
    }

    /// Connect an output port to an input port.
    pub fn connect(&mut self, source: PortId, target: PortId) -> FlowResult<EdgeId> {
        self.connect_at(source, target, usize::MAX)
    }

    /// Connect at a given position among the target's connections.
    pub fn connect_at(&mut self, source: PortId, target: PortId, slot: usize) -> FlowResult<EdgeId> {
        if let Err(e) = self.can_connect(source, target) {
            tracing::warn!("Rejected edge {:?} -> {:?}: {}", source, target, e);
            return Err(e);
        }
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Some(Edge::new(id, source, target)));

        let source_port = self.port_mut(source)?;
        source_port.connect(id, Arc::new(Package::empty(source_port.kind())));
        let pack = source_port.package().clone();
        self.port_mut(target)?.connect_at(id, pack, slot);

        self.mark_root(target.node());
        tracing::info!("Added edge {:?}: {:?} -> {:?}", id, source, target);
        self.events.emit(FlowEvent::EdgeAdded(id));
        Ok(id)
    }

    /// Remove an edge. The target's input falls back to its remaining connections.
    pub fn disconnect(&mut self, id: EdgeId) -> FlowResult<RemovedEdge> {
        let edge = self
            .edges
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(FlowError::UnknownEdge(id))?;

        if let Ok(port) = self.port_mut(edge.source()) {
            port.disconnect(id);
        }
        let slot = match self.port_mut(edge.target()) {
            Ok(port) => port.disconnect(id).unwrap_or(0),
            Err(_) => 0,
        };

        self.mark_root(edge.target_node());
        tracing::info!("Removed edge {:?}", id);
        self.events.emit(FlowEvent::EdgeRemoved(id));
        Ok(RemovedEdge {
            source: edge.source(),
            target: edge.target(),
            slot,
        })
    }

    /// Change a node setting. The node re-processes in the next pass.
    pub fn configure_node(&mut self, id: NodeId, key: &str, value: &ConfigValue) -> FlowResult<()> {
        let slot = self.slot_mut(id)?;
        slot.node.on_config_change(key, value)?;
        slot.needs_process = true;
        self.mark_root(id);
        tracing::debug!("Configured {:?}: {} = {:?}", id, key, value);
        Ok(())
    }

    /// Force a node to re-process in the next pass.
    pub fn mark_dirty(&mut self, id: NodeId) -> FlowResult<()> {
        self.slot_mut(id)?.needs_process = true;
        self.mark_root(id);
        Ok(())
    }

    // ── Propagation ──

    /// The fetch the current pass is waiting on.
    pub fn awaiting_request(&self) -> Option<&AsyncRequest> {
        self.pass.as_ref().and_then(|p| p.awaiting.as_ref())
    }

    /// True when no pass is running and no change is waiting for one.
    pub fn is_settled(&self) -> bool {
        self.pass.is_none() && self.pending_roots.is_empty()
    }

    /// Start a pass for everything changed since the last one.
    ///
    /// A suspended pass is superseded only when there are new changes; its
    /// unvisited nodes join the new pass and its ticket becomes stale.
    pub fn propagate(&mut self) -> PassStatus {
        if self.pending_roots.is_empty() {
            if let Some(request) = self.awaiting_request() {
                return PassStatus::Suspended(request.clone());
            }
        }

        let mut roots: Vec<NodeId> = std::mem::take(&mut self.pending_roots).into_iter().collect();
        if let Some(old) = self.pass.take() {
            if let Some(request) = &old.awaiting {
                tracing::debug!(
                    "Superseding pass {} waiting on {:?}",
                    old.plan.generation,
                    request.ticket.node
                );
            }
            roots.extend_from_slice(&old.plan.order[old.cursor.min(old.plan.order.len())..]);
        }
        if roots.is_empty() {
            return PassStatus::Idle;
        }

        self.generation += 1;
        let plan = PropagationScheduler::plan(&self.nodes, &self.edges, &roots, self.generation);
        for port in self
            .nodes
            .iter_mut()
            .flat_map(|slot| slot.ports.iter_mut())
            .filter(|p| !p.is_input())
        {
            port.clear_changed();
        }
        for &id in &plan.order {
            self.set_state(id, NodeState::Dirty);
        }
        self.pass = Some(ActivePass {
            plan,
            cursor: 0,
            processed: 0,
            awaiting: None,
        });
        self.drive()
    }

    /// Deliver the result of a fetch requested by a suspended pass.
    pub fn resume(&mut self, ticket: AsyncTicket, completion: AsyncCompletion) -> PassStatus {
        let current = self.awaiting_request().map(|r| r.ticket);
        if current != Some(ticket) {
            tracing::debug!(
                "Discarding stale completion for {:?} (generation {})",
                ticket.node,
                ticket.generation
            );
            return PassStatus::Stale;
        }
        if let Some(pass) = self.pass.as_mut() {
            pass.awaiting = None;
        }

        let id = ticket.node;
        let Some(slot) = self.nodes.get_mut(id.index()).filter(|s| !s.deleted) else {
            self.advance();
            return self.drive();
        };
        let mut ctx = NodeContext::new(id, ticket.generation, &slot.ports);
        let result = slot.node.complete_async(completion, &mut ctx);
        let staged = ctx.into_staged();
        if let Some(status) = self.finish_node(id, ticket.generation, result, staged) {
            return status;
        }
        self.drive()
    }

    /// Run planned nodes until the pass completes or suspends.
    fn drive(&mut self) -> PassStatus {
        loop {
            let Some(pass) = self.pass.as_ref() else {
                return PassStatus::Idle;
            };
            let generation = pass.plan.generation;
            let Some(&id) = pass.plan.order.get(pass.cursor) else {
                return self.complete_pass();
            };

            let slot = &mut self.nodes[id.index()];
            if slot.deleted {
                self.advance();
                continue;
            }
            if !slot.needs_process && !slot.inputs_changed() {
                self.set_state(id, NodeState::Clean);
                self.advance();
                continue;
            }

            let mut ctx = NodeContext::new(id, generation, &slot.ports);
            let result = slot.node.process(&mut ctx);
            let staged = ctx.into_staged();
            if let Some(status) = self.finish_node(id, generation, result, staged) {
                return status;
            }
        }
    }

    fn advance(&mut self) {
        if let Some(pass) = self.pass.as_mut() {
            pass.cursor += 1;
        }
    }

    /// Apply the outcome of processing one node. Returns a status when the pass suspends.
    fn finish_node(
        &mut self,
        id: NodeId,
        generation: u64,
        result: FlowResult<ProcessOutcome>,
        staged: Vec<Option<Package>>,
    ) -> Option<PassStatus> {
        match result {
            Ok(ProcessOutcome::Done) => {
                self.apply_outputs(id, staged);
                if let Some(slot) = self.nodes.get_mut(id.index()) {
                    slot.needs_process = false;
                    slot.clear_input_flags();
                }
                self.set_state(id, NodeState::Clean);
                if let Some(pass) = self.pass.as_mut() {
                    pass.processed += 1;
                }
                self.advance();
                None
            }
            Ok(ProcessOutcome::Pending(fetch)) => {
                let request = AsyncRequest {
                    ticket: AsyncTicket {
                        node: id,
                        generation,
                    },
                    fetch,
                };
                tracing::debug!(
                    "{:?} waiting on '{}/{}'",
                    id,
                    request.fetch.username,
                    request.fetch.filename
                );
                self.set_state(id, NodeState::Processing);
                if let Some(pass) = self.pass.as_mut() {
                    pass.awaiting = Some(request.clone());
                }
                self.events
                    .emit(FlowEvent::PassSuspended { generation, node: id });
                Some(PassStatus::Suspended(request))
            }
            Err(e) => {
                tracing::warn!("Node {:?} failed: {}", id, e);
                if let Some(slot) = self.nodes.get_mut(id.index()) {
                    slot.needs_process = true;
                    slot.clear_input_flags();
                }
                self.set_state(id, NodeState::Dirty);
                self.events.emit(FlowEvent::NodeError {
                    node: id,
                    message: e.to_string(),
                });
                self.advance();
                None
            }
        }
    }

    /// Write staged outputs and push them to every connected input.
    fn apply_outputs(&mut self, id: NodeId, staged: Vec<Option<Package>>) {
        for (index, pack) in staged.into_iter().enumerate() {
            let Some(pack) = pack else { continue };
            let pack = Arc::new(pack);
            let Some(port) = self
                .nodes
                .get_mut(id.index())
                .and_then(|slot| slot.ports.get_mut(index))
            else {
                continue;
            };
            port.set_output(pack.clone());
            let port_id = port.id();
            let connections = port.connections().to_vec();

            for edge in connections {
                let Some(target) = self.edge(edge).map(Edge::target) else {
                    continue;
                };
                if let Ok(target_port) = self.port_mut(target) {
                    target_port.refresh(edge, pack.clone());
                }
            }
            self.events.emit(FlowEvent::PackageUpdated(port_id));
        }
    }

    fn complete_pass(&mut self) -> PassStatus {
        let Some(pass) = self.pass.take() else {
            return PassStatus::Idle;
        };
        let generation = pass.plan.generation;
        tracing::debug!(
            "Pass {} completed: {} of {} nodes processed",
            generation,
            pass.processed,
            pass.plan.order.len()
        );
        self.events.emit(FlowEvent::PassCompleted {
            generation,
            processed: pass.processed,
        });
        PassStatus::Completed {
            generation,
            processed: pass.processed,
        }
    }

    /// Queue every live node for processing.
    pub fn mark_all_dirty(&mut self) {
        let ids: Vec<NodeId> = self.node_ids().collect();
        for id in ids {
            if let Some(slot) = self.nodes.get_mut(id.index()) {
                slot.needs_process = true;
            }
            self.mark_root(id);
        }
    }
}
