//! Edges between an output port and an input port.

use crate::flow::id::{EdgeId, NodeId, PortId};

/// A connection from an output port of one node to an input port of another.
///
/// Edges are immutable; rewiring means removing one edge and adding another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    id: EdgeId,
    source: PortId,
    target: PortId,
}

impl Edge {
    pub fn new(id: EdgeId, source: PortId, target: PortId) -> Self {
        Self { id, source, target }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn source(&self) -> PortId {
        self.source
    }

    pub fn target(&self) -> PortId {
        self.target
    }

    pub fn source_node(&self) -> NodeId {
        self.source.node()
    }

    pub fn target_node(&self) -> NodeId {
        self.target.node()
    }

    /// True when the edge touches `node` on either end.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source_node() == node || self.target_node() == node
    }
}
