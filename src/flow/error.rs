//! Dataflow-specific error types.

use crate::data::DataError;
use crate::flow::id::{EdgeId, NodeId, PortId};
use thiserror::Error;

/// Broad class of a [`FlowError`], used to decide how the UI reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A node could not process its inputs. The node keeps its previous output.
    Validation,
    /// A graph edit was rejected. The graph is unchanged.
    Structural,
    /// A dataset fetch failed or completed out of turn.
    Async,
    /// Undo/redo hit a record that no longer matches the graph.
    HistoryReplay,
}

/// Errors that can occur within the dataflow engine.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Node {node_id:?} error: {message}")]
    Node { node_id: NodeId, message: String },

    #[error("Dataset mismatch: {0}")]
    DatasetMismatch(String),

    #[error("Incompatible constants: {0}")]
    IncompatibleConstants(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid setting '{key}': {message}")]
    InvalidSetting { key: String, message: String },

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Cycle detected in dataflow graph")]
    CycleDetected,

    #[error("Cannot connect a node to itself")]
    SameNode,

    #[error("Ports are already connected")]
    DuplicateConnection,

    #[error("Port {0:?} accepts a single connection and is already connected")]
    PortFull(PortId),

    #[error("Port mismatch: {0}")]
    PortMismatch(String),

    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Unknown edge {0:?}")]
    UnknownEdge(EdgeId),

    #[error("Node {node:?} has no port '{port}'")]
    UnknownPort { node: NodeId, port: String },

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Fetch timed out after {0} ms")]
    Timeout(u64),

    #[error("Node {0:?} received a completion it did not request")]
    UnexpectedCompletion(NodeId),

    #[error("History replay failed: {0}")]
    HistoryReplay(String),

    #[error("Diagram error: {0}")]
    Diagram(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

impl FlowError {
    pub fn unknown_setting(key: &str) -> Self {
        FlowError::InvalidSetting {
            key: key.to_string(),
            message: "no such setting".to_string(),
        }
    }

    /// A string setting outside its fixed set of choices.
    pub fn invalid_choice(key: &str, value: &str, allowed: &str) -> Self {
        FlowError::InvalidSetting {
            key: key.to_string(),
            message: format!("'{}' is not one of {}", value, allowed),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            FlowError::Node { .. }
            | FlowError::DatasetMismatch(_)
            | FlowError::IncompatibleConstants(_)
            | FlowError::InvalidRange(_)
            | FlowError::InvalidSetting { .. }
            | FlowError::Data(_) => ErrorCategory::Validation,
            FlowError::Fetch(_) | FlowError::Timeout(_) | FlowError::UnexpectedCompletion(_) => {
                ErrorCategory::Async
            }
            FlowError::HistoryReplay(_) => ErrorCategory::HistoryReplay,
            FlowError::InvalidEdge(_)
            | FlowError::CycleDetected
            | FlowError::SameNode
            | FlowError::DuplicateConnection
            | FlowError::PortFull(_)
            | FlowError::PortMismatch(_)
            | FlowError::UnknownNode(_)
            | FlowError::UnknownEdge(_)
            | FlowError::UnknownPort { .. }
            | FlowError::Diagram(_) => ErrorCategory::Structural,
        }
    }
}

pub type FlowResult<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(FlowError::CycleDetected.category(), ErrorCategory::Structural);
        assert_eq!(
            FlowError::DatasetMismatch("x".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(FlowError::Fetch("x".into()).category(), ErrorCategory::Async);
        assert_eq!(
            FlowError::HistoryReplay("x".into()).category(),
            ErrorCategory::HistoryReplay
        );
    }

    #[test]
    fn test_unknown_setting() {
        let err = FlowError::unknown_setting("colour");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.to_string(), "Invalid setting 'colour': no such setting");
    }

    #[test]
    fn test_display() {
        let err = FlowError::UnknownPort {
            node: NodeId(3),
            port: "inx".into(),
        };
        assert_eq!(err.to_string(), "Node NodeId(3) has no port 'inx'");
    }
}
