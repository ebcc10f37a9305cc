//! Engine → UI notifications.
//!
//! The dataflow and session push [`FlowEvent`]s into a crossbeam channel. The
//! UI drains the receiver at its own pace; a dropped receiver or a disabled
//! sink silently discards events.

use crate::flow::id::{EdgeId, NodeId, PortId};
use crate::flow::node::NodeState;
use crossbeam_channel::{Receiver, Sender};

/// Messages from the engine to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    NodeMoved(NodeId),
    EdgeAdded(EdgeId),
    EdgeRemoved(EdgeId),
    NodeStateChanged { node: NodeId, state: NodeState },
    /// An output port now holds a new package.
    PackageUpdated(PortId),
    /// A node failed to process. It keeps its previous output.
    NodeError { node: NodeId, message: String },
    /// Message for the status bar.
    SystemMessage(String),
    PassCompleted { generation: u64, processed: usize },
    /// The pass is waiting on a dataset fetch.
    PassSuspended { generation: u64, node: NodeId },
    HistoryChanged { can_undo: bool, can_redo: bool },
    NoMoreUndo,
    NoMoreRedo,
    DiagramLoaded { nodes: usize, edges: usize },
}

/// Sending half of the event channel.
#[derive(Debug, Clone, Default)]
pub struct FlowEvents {
    tx: Option<Sender<FlowEvent>>,
}

impl FlowEvents {
    /// Create an unbounded channel and a sink feeding it.
    pub fn channel() -> (Self, Receiver<FlowEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: FlowEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_delivers_in_order() {
        let (events, rx) = FlowEvents::channel();
        events.emit(FlowEvent::NodeAdded(NodeId(0)));
        events.emit(FlowEvent::NoMoreUndo);
        let received: Vec<FlowEvent> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![FlowEvent::NodeAdded(NodeId(0)), FlowEvent::NoMoreUndo]
        );
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (events, rx) = FlowEvents::channel();
        drop(rx);
        events.emit(FlowEvent::SystemMessage("hello".into()));
        FlowEvents::disabled().emit(FlowEvent::NoMoreRedo);
    }
}
