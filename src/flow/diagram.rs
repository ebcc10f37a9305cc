//! Persisted diagram format.
//!
//! ```json
//! {
//!   "version": 1,
//!   "timestamp": "2024-05-01T12:00:00Z",
//!   "nodes": [{"id": 0, "type": "dataSource", "position": {"x": 0, "y": 0},
//!              "label": "Data Source", "options": {"filename": "cars.csv"}}],
//!   "edges": [{"sourceNode": 0, "sourcePort": "out", "targetNode": 1, "targetPort": "in"}]
//! }
//! ```
//!
//! Node ids in a file only need to be unique; they are remapped to dense ids
//! on load. Edges are listed in the connection order of their target ports,
//! so multiple-input nodes see their inputs in the same order after a reload.

use crate::data::DataError;
use crate::flow::dataflow::Dataflow;
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::events::FlowEvents;
use crate::flow::id::NodeId;
use crate::flow::node::{AnyNode, Position};
use crate::flow::node_type::NodeType;
use crate::flow::nodes::NodeFactory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Current diagram format version.
pub const DIAGRAM_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedNode {
    pub id: u32,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedEdge {
    pub source_node: u32,
    pub source_port: String,
    pub target_node: u32,
    pub target_port: String,
}

/// A serialized dataflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub nodes: Vec<SavedNode>,
    #[serde(default)]
    pub edges: Vec<SavedEdge>,
}

fn default_version() -> u32 {
    DIAGRAM_VERSION
}

impl Default for Diagram {
    fn default() -> Self {
        Self {
            version: DIAGRAM_VERSION,
            timestamp: Utc::now(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl Diagram {
    /// Snapshot a dataflow. Plugin nodes and their edges are skipped.
    pub fn from_dataflow(flow: &Dataflow) -> Self {
        let mut diagram = Diagram::default();

        for id in flow.node_ids() {
            let Some(AnyNode::Builtin(node)) = flow.node(id) else {
                tracing::debug!("Skipping plugin node {:?} on save", id);
                continue;
            };
            diagram.nodes.push(SavedNode {
                id: id.0,
                node_type: node.node_type(),
                position: flow.position(id).unwrap_or_default(),
                label: flow.label(id).unwrap_or_default().to_string(),
                options: node.serialize_options(),
            });
        }

        let saved: std::collections::HashSet<u32> = diagram.nodes.iter().map(|n| n.id).collect();
        for id in flow.node_ids().filter(|id| saved.contains(&id.0)) {
            let Ok(ports) = flow.ports(id) else { continue };
            for port in ports.iter().filter(|p| p.is_input()) {
                for edge in port.connections().iter().filter_map(|e| flow.edge(*e)) {
                    let source = edge.source();
                    if !saved.contains(&source.node().0) {
                        continue;
                    }
                    let Ok(source_port) = flow.port(source) else {
                        continue;
                    };
                    diagram.edges.push(SavedEdge {
                        source_node: source.node().0,
                        source_port: source_port.name().to_string(),
                        target_node: id.0,
                        target_port: port.name().to_string(),
                    });
                }
            }
        }

        diagram
    }

    /// Build a fresh dataflow from this diagram.
    ///
    /// Fails without side effects if any node id repeats or any edge refers
    /// to a missing node or port or breaks a connection rule. Every node is
    /// queued for processing.
    pub fn instantiate(&self, events: FlowEvents) -> FlowResult<Dataflow> {
        if self.version > DIAGRAM_VERSION {
            return Err(FlowError::Diagram(format!(
                "unsupported diagram version {}",
                self.version
            )));
        }

        let mut flow = Dataflow::default();
        let mut ids: HashMap<u32, NodeId> = HashMap::new();
        for saved in &self.nodes {
            let mut node = NodeFactory::create(saved.node_type);
            node.deserialize_options(&saved.options)?;
            let id = flow.add_node(node, saved.position);
            if !saved.label.is_empty() {
                flow.set_label(id, saved.label.clone())?;
            }
            if ids.insert(saved.id, id).is_some() {
                return Err(FlowError::Diagram(format!("duplicate node id {}", saved.id)));
            }
        }

        for saved in &self.edges {
            let lookup = |raw: u32| {
                ids.get(&raw)
                    .copied()
                    .ok_or_else(|| FlowError::Diagram(format!("edge refers to missing node {}", raw)))
            };
            let source = flow.port_id(lookup(saved.source_node)?, &saved.source_port)?;
            let target = flow.port_id(lookup(saved.target_node)?, &saved.target_port)?;
            flow.connect(source, target)
                .map_err(|e| FlowError::Diagram(format!("invalid edge: {}", e)))?;
        }

        flow.mark_all_dirty();
        flow.set_events(events);
        tracing::info!(
            "Instantiated diagram: {} nodes, {} edges",
            flow.node_count(),
            flow.edge_count()
        );
        Ok(flow)
    }

    pub fn from_json(text: &str) -> FlowResult<Self> {
        Ok(serde_json::from_str(text).map_err(DataError::from)?)
    }

    pub fn to_json(&self) -> FlowResult<String> {
        Ok(serde_json::to_string_pretty(self).map_err(DataError::from)?)
    }

    pub fn load(path: impl AsRef<Path>) -> FlowResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Diagram(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> FlowResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                FlowError::Diagram(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, self.to_json()?).map_err(|e| {
            FlowError::Diagram(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::node::ConfigValue;

    fn sample() -> Diagram {
        Diagram::from_json(
            r#"{
                "version": 1,
                "nodes": [
                    {"id": 4, "type": "valueMaker", "options": {"value": "2, 3"}},
                    {"id": 9, "type": "datasrc", "position": {"x": 10, "y": 20}},
                    {"id": 11, "type": "range", "options": {"dim": 1, "typeInMax": "9"}},
                    {"id": 12, "type": "union"}
                ],
                "edges": [
                    {"sourceNode": 9, "sourcePort": "out", "targetNode": 11, "targetPort": "in"},
                    {"sourceNode": 4, "sourcePort": "out", "targetNode": 11, "targetPort": "inMin"},
                    {"sourceNode": 11, "sourcePort": "out", "targetNode": 12, "targetPort": "in"},
                    {"sourceNode": 9, "sourcePort": "out", "targetNode": 12, "targetPort": "in"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_instantiate_remaps_ids() {
        let flow = sample().instantiate(FlowEvents::disabled()).unwrap();
        assert_eq!(flow.node_count(), 4);
        assert_eq!(flow.edge_count(), 4);
        assert_eq!(flow.position(NodeId(1)), Some(Position::new(10.0, 20.0)));
    }

    #[test]
    fn test_round_trip_keeps_structure_and_order() {
        let flow = sample().instantiate(FlowEvents::disabled()).unwrap();
        let saved = Diagram::from_dataflow(&flow);
        let reloaded = saved.instantiate(FlowEvents::disabled()).unwrap();
        let again = Diagram::from_dataflow(&reloaded);
        assert_eq!(saved.nodes, again.nodes);
        assert_eq!(saved.edges, again.edges);

        // Union inputs keep their connection order
        let union_inputs: Vec<u32> = saved
            .edges
            .iter()
            .filter(|e| e.target_node == 3)
            .map(|e| e.source_node)
            .collect();
        assert_eq!(union_inputs, vec![2, 1]);
        assert_eq!(saved.nodes[2].options["typeInMax"], "9");
    }

    #[test]
    fn test_invalid_edge_rejected() {
        let mut diagram = sample();
        diagram.edges.push(SavedEdge {
            source_node: 4,
            source_port: "out".into(),
            target_node: 11,
            target_port: "inMin".into(),
        });
        assert!(matches!(
            diagram.instantiate(FlowEvents::disabled()),
            Err(FlowError::Diagram(_))
        ));

        let mut diagram = sample();
        diagram.edges[0].target_port = "nope".into();
        assert!(matches!(
            diagram.instantiate(FlowEvents::disabled()),
            Err(FlowError::UnknownPort { .. })
        ));
    }

    #[test]
    fn test_plugin_free_snapshot_includes_settings() {
        let mut flow = Dataflow::default();
        let id = flow.add_node(
            NodeFactory::create(NodeType::ValueFilter),
            Position::default(),
        );
        flow.configure_node(id, "dim", &ConfigValue::Int(2)).unwrap();
        let diagram = Diagram::from_dataflow(&flow);
        assert_eq!(diagram.nodes[0].node_type, NodeType::ValueFilter);
        assert_eq!(diagram.nodes[0].options["dim"], 2);
        assert_eq!(diagram.nodes[0].options["ignoreCase"], true);
    }
}
