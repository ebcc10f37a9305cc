//! Editing session: the graph, its history and the dataset fetcher.
//!
//! All graph edits from the UI go through [`Session`]. Each successful edit
//! is pushed onto the history log in the same call, then propagation runs
//! until it finishes or needs a dataset. [`Session::settle`] drives the
//! fetches of suspended passes.
//!
//! Node settings and selections are not history records. They re-run the
//! affected nodes but cannot be undone.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::fetch::DatasetFetcher;
use crate::flow::{
    AnyNode, AsyncCompletion, BuiltinNode, ConfigValue, Dataflow, Diagram, EdgeId, FetchRequest,
    FlowError, FlowEvent, FlowEvents, FlowResult, NodeFactory, NodeId, NodePlugin, NodeType,
    PassStatus, PortId, Position,
};
use crate::history::{HistoryLog, HistoryRecord, HistoryStep};
use crossbeam_channel::Receiver;
use std::path::Path;
use std::sync::Arc;

/// An edit requested by the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphAction {
    AddNode { node_type: NodeType, position: Position },
    RemoveNode(NodeId),
    MoveNode { node: NodeId, position: Position },
    Connect { source: PortId, target: PortId },
    Disconnect(EdgeId),
}

pub struct Session {
    flow: Dataflow,
    history: HistoryLog<HistoryRecord>,
    fetcher: Arc<dyn DatasetFetcher>,
    config: EngineConfig,
    events: FlowEvents,
}

impl Session {
    pub fn new(config: EngineConfig, fetcher: Arc<dyn DatasetFetcher>, events: FlowEvents) -> Self {
        Self {
            flow: Dataflow::new(events.clone()),
            history: HistoryLog::new(),
            fetcher,
            config,
            events,
        }
    }

    /// Create a session with an event channel for the UI.
    pub fn with_channel(
        config: EngineConfig,
        fetcher: Arc<dyn DatasetFetcher>,
    ) -> (Self, Receiver<FlowEvent>) {
        let (events, rx) = FlowEvents::channel();
        (Self::new(config, fetcher, events), rx)
    }

    pub fn flow(&self) -> &Dataflow {
        &self.flow
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryLog<HistoryRecord> {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ── Recorded edits ──

    /// Apply one edit as one history step.
    pub fn apply(&mut self, action: GraphAction) -> FlowResult<()> {
        let record = self.perform(action)?;
        self.commit(record);
        Ok(())
    }

    /// Apply several edits as one history step. Nothing is kept if any fails.
    pub fn apply_batch(&mut self, actions: Vec<GraphAction>) -> FlowResult<()> {
        let mut records = Vec::with_capacity(actions.len());
        for action in actions {
            match self.perform(action) {
                Ok(record) => records.push(record),
                Err(e) => {
                    for record in records.iter().rev() {
                        if let Err(rollback) = record.reverse_execute(&mut self.flow) {
                            tracing::warn!(
                                "Rollback of '{}' failed: {}",
                                record.description(),
                                rollback
                            );
                        }
                    }
                    self.release_nodes(&records);
                    return Err(e);
                }
            }
        }
        if !records.is_empty() {
            self.commit(HistoryRecord::Batch(records));
        }
        Ok(())
    }

    pub fn create_node(&mut self, node_type: NodeType, position: Position) -> NodeId {
        let node = self.insert_node(node_type, position);
        self.commit(HistoryRecord::NodeAdd { node });
        node
    }

    /// Add a plugin node. Plugins take part in undo but are not saved in diagrams.
    pub fn add_plugin(&mut self, plugin: Box<dyn NodePlugin>, position: Position) -> NodeId {
        let node = self.flow.add_node(AnyNode::Plugin(plugin), position);
        self.commit(HistoryRecord::NodeAdd { node });
        node
    }

    pub fn remove_node(&mut self, node: NodeId) -> FlowResult<()> {
        self.apply(GraphAction::RemoveNode(node))
    }

    pub fn move_node(&mut self, node: NodeId, position: Position) -> FlowResult<()> {
        self.apply(GraphAction::MoveNode { node, position })
    }

    pub fn connect(&mut self, source: PortId, target: PortId) -> FlowResult<EdgeId> {
        let edge = self.flow.connect(source, target)?;
        self.commit(HistoryRecord::EdgeAdd { source, target });
        Ok(edge)
    }

    /// Connect two ports by node and port name.
    pub fn connect_ports(
        &mut self,
        source: NodeId,
        source_port: &str,
        target: NodeId,
        target_port: &str,
    ) -> FlowResult<EdgeId> {
        let source = self.flow.port_id(source, source_port)?;
        let target = self.flow.port_id(target, target_port)?;
        self.connect(source, target)
    }

    pub fn disconnect(&mut self, edge: EdgeId) -> FlowResult<()> {
        self.apply(GraphAction::Disconnect(edge))
    }

    fn insert_node(&mut self, node_type: NodeType, position: Position) -> NodeId {
        let mut node = NodeFactory::create(node_type);
        if let BuiltinNode::DataSource(source) = &mut node {
            source.set_default_username(&self.config.username);
        }
        self.flow.add_node(node, position)
    }

    fn perform(&mut self, action: GraphAction) -> FlowResult<HistoryRecord> {
        match action {
            GraphAction::AddNode {
                node_type,
                position,
            } => Ok(HistoryRecord::NodeAdd {
                node: self.insert_node(node_type, position),
            }),
            GraphAction::RemoveNode(node) => Ok(HistoryRecord::NodeRemove {
                node,
                edges: self.flow.remove_node(node)?,
            }),
            GraphAction::MoveNode { node, position } => {
                let from = self.flow.move_node(node, position)?;
                Ok(HistoryRecord::NodeMove {
                    node,
                    from,
                    to: position,
                })
            }
            GraphAction::Connect { source, target } => {
                self.flow.connect(source, target)?;
                Ok(HistoryRecord::EdgeAdd { source, target })
            }
            GraphAction::Disconnect(edge) => {
                let removed = self.flow.disconnect(edge)?;
                Ok(HistoryRecord::EdgeRemove {
                    source: removed.source,
                    target: removed.target,
                    slot: removed.slot,
                })
            }
        }
    }

    fn commit(&mut self, record: HistoryRecord) {
        tracing::debug!("History: {}", record.description());
        let discarded = self.history.push(record);
        self.release_nodes(&discarded);
        self.emit_history();
        self.flow.propagate();
    }

    /// Free the nodes created by records that can never be redone.
    fn release_nodes(&mut self, records: &[HistoryRecord]) {
        for node in records.iter().flat_map(HistoryRecord::added_nodes) {
            if let Err(e) = self.flow.release_node(node) {
                tracing::warn!("Could not release {:?}: {}", node, e);
            }
        }
    }

    fn emit_history(&self) {
        self.events.emit(FlowEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    // ── Undo / redo ──

    pub fn undo(&mut self) -> FlowResult<HistoryStep> {
        let flow = &mut self.flow;
        let step = self
            .history
            .undo(|record| record.reverse_execute(flow))
            .inspect_err(|e| self.report_replay_error("Undo", e))?;
        self.after_replay(step, FlowEvent::NoMoreUndo);
        Ok(step)
    }

    pub fn redo(&mut self) -> FlowResult<HistoryStep> {
        let flow = &mut self.flow;
        let step = self
            .history
            .redo(|record| record.execute(flow))
            .inspect_err(|e| self.report_replay_error("Redo", e))?;
        self.after_replay(step, FlowEvent::NoMoreRedo);
        Ok(step)
    }

    fn report_replay_error(&self, what: &str, e: &FlowError) {
        tracing::warn!("{} failed: {}", what, e);
        self.events
            .emit(FlowEvent::SystemMessage(format!("{} failed: {}", what, e)));
    }

    fn after_replay(&mut self, step: HistoryStep, exhausted: FlowEvent) {
        match step {
            HistoryStep::Applied => {
                self.emit_history();
                self.flow.propagate();
            }
            HistoryStep::Exhausted => self.events.emit(exhausted),
        }
    }

    // ── Settings (not recorded) ──

    pub fn configure_node(&mut self, node: NodeId, key: &str, value: ConfigValue) -> FlowResult<()> {
        self.flow.configure_node(node, key, &value)?;
        self.flow.propagate();
        Ok(())
    }

    /// Replace a visualization's selected items.
    pub fn select_items(&mut self, node: NodeId, indices: Vec<usize>) -> FlowResult<()> {
        self.configure_node(node, "selection", ConfigValue::Indices(indices))
    }

    // ── Propagation ──

    /// Run pending changes without fetching.
    pub fn propagate(&mut self) -> PassStatus {
        self.flow.propagate()
    }

    /// Propagate until every pass has completed, fetching datasets as needed.
    ///
    /// A fetch that fails or exceeds the configured timeout completes its
    /// node with an error; the node stays dirty and the pass moves on.
    pub async fn settle(&mut self) -> PassStatus {
        let mut status = self.flow.propagate();
        loop {
            match status {
                PassStatus::Suspended(request) => {
                    let completion = self.fetch(&request.fetch).await;
                    status = self.flow.resume(request.ticket, completion);
                }
                PassStatus::Stale => status = self.flow.propagate(),
                PassStatus::Idle | PassStatus::Completed { .. } => return status,
            }
        }
    }

    async fn fetch(&self, request: &FetchRequest) -> AsyncCompletion {
        let timeout_ms = self.config.propagation.fetch_timeout_ms;
        let result = tokio::time::timeout(
            self.config.fetch_timeout(),
            self.fetcher.fetch(&request.username, &request.filename),
        )
        .await;

        let message = match result {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(e)) => e.to_string(),
            Err(_) => FlowError::Timeout(timeout_ms).to_string(),
        };
        tracing::warn!(
            "Failed to fetch '{}/{}': {}",
            request.username,
            request.filename,
            message
        );
        self.events.emit(FlowEvent::SystemMessage(format!(
            "Failed to load {}: {}",
            request.filename, message
        )));
        Err(message)
    }

    // ── Diagrams ──

    /// Replace the graph with a diagram. History is cleared.
    pub fn load(&mut self, diagram: &Diagram) -> FlowResult<()> {
        let mut flow = diagram.instantiate(self.events.clone())?;
        let ids: Vec<NodeId> = flow.node_ids().collect();
        for id in ids {
            if let Some(AnyNode::Builtin(BuiltinNode::DataSource(source))) = flow.node_mut(id) {
                source.set_default_username(&self.config.username);
            }
        }
        self.flow = flow;
        self.history.clear();
        self.events.emit(FlowEvent::DiagramLoaded {
            nodes: self.flow.node_count(),
            edges: self.flow.edge_count(),
        });
        self.emit_history();
        self.flow.propagate();
        Ok(())
    }

    pub fn load_diagram(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let diagram = Diagram::load(path)?;
        self.load(&diagram)?;
        Ok(())
    }

    pub fn save_diagram(&self, path: impl AsRef<Path>) -> Result<()> {
        Diagram::from_dataflow(&self.flow).save(path)?;
        Ok(())
    }

    pub fn snapshot(&self) -> Diagram {
        Diagram::from_dataflow(&self.flow)
    }

    /// Start over with an empty graph.
    pub fn new_diagram(&mut self) {
        self.flow = Dataflow::new(self.events.clone());
        self.history.clear();
        self.emit_history();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;

    fn session() -> Session {
        let fetcher = MemoryFetcher::new().with_file("default", "d.csv", "x\n1\n2\n3\n");
        Session::new(
            EngineConfig::default(),
            Arc::new(fetcher),
            FlowEvents::disabled(),
        )
    }

    #[test]
    fn test_rejected_edit_leaves_no_record() {
        let mut s = session();
        let a = s.create_node(NodeType::Identity, Position::default());
        let b = s.create_node(NodeType::Identity, Position::default());
        s.connect_ports(a, "out", b, "in").unwrap();
        assert!(s.connect_ports(b, "out", a, "in").is_err());
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn test_batch_failure_rolls_back() {
        let mut s = session();
        let a = s.create_node(NodeType::Identity, Position::default());
        let result = s.apply_batch(vec![
            GraphAction::AddNode {
                node_type: NodeType::Union,
                position: Position::default(),
            },
            GraphAction::RemoveNode(NodeId(99)),
        ]);
        assert!(result.is_err());
        assert_eq!(s.flow().node_count(), 1);
        assert!(s.flow().contains_node(a));
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn test_abandoned_nodes_are_released() {
        let mut s = session();
        let first = s.create_node(NodeType::DataSource, Position::default());
        s.undo().unwrap();
        assert!(s.can_redo());

        let second = s.create_node(NodeType::Identity, Position::default());
        assert!(!s.can_redo());
        assert!(s.flow().is_released(first));
        assert!(s.flow.revive_node(first).is_err());
        assert!(s.flow().contains_node(second));
    }

    #[test]
    fn test_new_data_source_gets_default_username() {
        let mut s = session();
        let id = s.create_node(NodeType::DataSource, Position::default());
        match s.flow().node(id) {
            Some(AnyNode::Builtin(BuiltinNode::DataSource(source))) => {
                assert_eq!(source.options().username, "default");
            }
            _ => panic!("expected a data source"),
        }
    }

    #[tokio::test]
    async fn test_settle_fetches_dataset() {
        let mut s = session();
        let source = s.create_node(NodeType::DataSource, Position::default());
        s.configure_node(source, "filename", ConfigValue::String("d.csv".into()))
            .unwrap();
        let status = s.settle().await;
        assert!(matches!(status, PassStatus::Completed { .. }));
        assert_eq!(s.flow().output_package(source).unwrap().count(), 3);
    }
}
