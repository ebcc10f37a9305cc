//! Reversible graph edits.
//!
//! Records store ids and port references only. Removed nodes stay in their
//! slot as tombstones, so undoing a removal revives the same node object
//! under the same id and every later record still points at it.

use crate::flow::dataflow::{Dataflow, RemovedEdge};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::id::{NodeId, PortId};
use crate::flow::node::Position;

/// One undoable graph edit.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryRecord {
    NodeAdd {
        node: NodeId,
    },
    NodeRemove {
        node: NodeId,
        /// Incident edges in the order they were removed.
        edges: Vec<RemovedEdge>,
    },
    NodeMove {
        node: NodeId,
        from: Position,
        to: Position,
    },
    EdgeAdd {
        source: PortId,
        target: PortId,
    },
    EdgeRemove {
        source: PortId,
        target: PortId,
        slot: usize,
    },
    /// Several edits applied and undone as one step.
    Batch(Vec<HistoryRecord>),
}

fn replay_error(e: FlowError) -> FlowError {
    match e {
        FlowError::HistoryReplay(_) => e,
        other => FlowError::HistoryReplay(other.to_string()),
    }
}

impl HistoryRecord {
    pub fn description(&self) -> String {
        match self {
            HistoryRecord::NodeAdd { node } => format!("add {:?}", node),
            HistoryRecord::NodeRemove { node, edges } => {
                format!("remove {:?} with {} edges", node, edges.len())
            }
            HistoryRecord::NodeMove { node, .. } => format!("move {:?}", node),
            HistoryRecord::EdgeAdd { source, target } => {
                format!("connect {:?} -> {:?}", source, target)
            }
            HistoryRecord::EdgeRemove { source, target, .. } => {
                format!("disconnect {:?} -> {:?}", source, target)
            }
            HistoryRecord::Batch(records) => format!("batch of {}", records.len()),
        }
    }

    /// Nodes this record creates, including those inside batches.
    pub fn added_nodes(&self) -> Vec<NodeId> {
        match self {
            HistoryRecord::NodeAdd { node } => vec![*node],
            HistoryRecord::Batch(records) => {
                records.iter().flat_map(HistoryRecord::added_nodes).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Apply the edit again (redo).
    pub fn execute(&self, flow: &mut Dataflow) -> FlowResult<()> {
        self.apply(flow, true).map_err(replay_error)
    }

    /// Undo the edit.
    pub fn reverse_execute(&self, flow: &mut Dataflow) -> FlowResult<()> {
        self.apply(flow, false).map_err(replay_error)
    }

    fn apply(&self, flow: &mut Dataflow, forward: bool) -> FlowResult<()> {
        match (self, forward) {
            (HistoryRecord::NodeAdd { node }, true) => flow.revive_node(*node),
            (HistoryRecord::NodeAdd { node }, false) => flow.remove_node(*node).map(|_| ()),

            (HistoryRecord::NodeRemove { node, .. }, true) => flow.remove_node(*node).map(|_| ()),
            (HistoryRecord::NodeRemove { node, edges }, false) => restore_node(flow, *node, edges),

            (HistoryRecord::NodeMove { node, to, .. }, true) => {
                flow.move_node(*node, *to).map(|_| ())
            }
            (HistoryRecord::NodeMove { node, from, .. }, false) => {
                flow.move_node(*node, *from).map(|_| ())
            }

            (HistoryRecord::EdgeAdd { source, target }, true) => {
                flow.connect(*source, *target).map(|_| ())
            }
            (HistoryRecord::EdgeAdd { source, target }, false) => {
                remove_edge(flow, *source, *target)
            }

            (HistoryRecord::EdgeRemove { source, target, .. }, true) => {
                remove_edge(flow, *source, *target)
            }
            (HistoryRecord::EdgeRemove { source, target, slot }, false) => {
                flow.connect_at(*source, *target, *slot).map(|_| ())
            }

            (HistoryRecord::Batch(records), true) => {
                apply_all(flow, records.iter(), true)
            }
            (HistoryRecord::Batch(records), false) => {
                apply_all(flow, records.iter().rev(), false)
            }
        }
    }
}

fn remove_edge(flow: &mut Dataflow, source: PortId, target: PortId) -> FlowResult<()> {
    let edge = flow.find_edge(source, target).ok_or_else(|| {
        FlowError::HistoryReplay(format!("no edge {:?} -> {:?}", source, target))
    })?;
    flow.disconnect(edge).map(|_| ())
}

/// Revive a removed node and reconnect its edges in reverse removal order,
/// which puts each edge back at its old position in multiple-input ports.
fn restore_node(flow: &mut Dataflow, node: NodeId, edges: &[RemovedEdge]) -> FlowResult<()> {
    flow.revive_node(node)?;
    let mut restored = Vec::with_capacity(edges.len());
    for edge in edges.iter().rev() {
        match flow.connect_at(edge.source, edge.target, edge.slot) {
            Ok(id) => restored.push(id),
            Err(e) => {
                for id in restored.into_iter().rev() {
                    let _ = flow.disconnect(id);
                }
                let _ = flow.remove_node(node);
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Apply records in order. On failure the applied prefix is rolled back.
fn apply_all<'a>(
    flow: &mut Dataflow,
    records: impl Iterator<Item = &'a HistoryRecord>,
    forward: bool,
) -> FlowResult<()> {
    let mut done: Vec<&HistoryRecord> = Vec::new();
    for record in records {
        if let Err(e) = record.apply(flow, forward) {
            for applied in done.into_iter().rev() {
                if let Err(rollback) = applied.apply(flow, !forward) {
                    tracing::warn!(
                        "Rollback of '{}' failed: {}",
                        applied.description(),
                        rollback
                    );
                }
            }
            return Err(e);
        }
        done.push(record);
    }
    Ok(())
}
