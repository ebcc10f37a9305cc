//! Saving and loading diagrams through a session

mod common;

use common::{drain, output_indices, CARS_CSV};
use std::sync::Arc;
use visflow::config::EngineConfig;
use visflow::data::PackageKind;
use visflow::flow::{
    ConfigValue, Diagram, FlowError, FlowEvent, FlowResult, NodeContext, NodePlugin, NodeType,
    PortDescriptor, Position, ProcessOutcome,
};
use visflow::{MemoryFetcher, Session, VisFlowError};

struct Passthrough;

static PASSTHROUGH_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PackageKind::Subset),
    PortDescriptor::output("out", PackageKind::Subset),
];

impl NodePlugin for Passthrough {
    fn name(&self) -> &str {
        "Passthrough"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PASSTHROUGH_PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        let input = ctx.subset("in")?.clone();
        ctx.set_output("out", input)?;
        Ok(ProcessOutcome::Done)
    }
}

fn session() -> (Session, crossbeam_channel::Receiver<FlowEvent>) {
    let fetcher = MemoryFetcher::new().with_file("alice", "cars.csv", CARS_CSV);
    let config = EngineConfig {
        username: "alice".to_string(),
        ..EngineConfig::default()
    };
    Session::with_channel(config, Arc::new(fetcher))
}

#[tokio::test]
async fn test_save_and_reload_reproduces_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diagrams/cars.json");

    let (mut s, _events) = session();
    let source = s.create_node(NodeType::DataSource, Position::new(0.0, 0.0));
    s.configure_node(source, "filename", ConfigValue::String("cars.csv".into()))
        .unwrap();
    let sampler = s.create_node(NodeType::Sampler, Position::new(100.0, 0.0));
    s.configure_node(sampler, "dim", ConfigValue::Int(1)).unwrap();
    s.configure_node(sampler, "number", ConfigValue::Int(2)).unwrap();
    s.connect_ports(source, "out", sampler, "in").unwrap();
    s.settle().await;
    let expected = output_indices(s.flow(), sampler);
    assert_eq!(expected.len(), 2);

    s.save_diagram(&path).unwrap();

    let (mut reloaded, events) = session();
    reloaded.load_diagram(&path).unwrap();
    reloaded.settle().await;
    assert_eq!(output_indices(reloaded.flow(), sampler), expected);
    assert!(!reloaded.can_undo());
    assert!(drain(&events).contains(&FlowEvent::DiagramLoaded { nodes: 2, edges: 1 }));
}

#[test]
fn test_plugins_are_not_saved() {
    let (mut s, _events) = session();
    let table = s.create_node(NodeType::Table, Position::default());
    let plugin = s.add_plugin(Box::new(Passthrough), Position::default());
    s.connect_ports(plugin, "out", table, "in").unwrap();

    let diagram = s.snapshot();
    assert_eq!(diagram.nodes.len(), 1);
    assert_eq!(diagram.nodes[0].node_type, NodeType::Table);
    assert!(diagram.edges.is_empty());
}

#[test]
fn test_broken_diagram_leaves_session_untouched() {
    let (mut s, _events) = session();
    let kept = s.create_node(NodeType::Identity, Position::default());

    let diagram = Diagram::from_json(
        r#"{
            "nodes": [{"id": 1, "type": "identity"}, {"id": 2, "type": "identity"}],
            "edges": [
                {"sourceNode": 1, "sourcePort": "out", "targetNode": 2, "targetPort": "in"},
                {"sourceNode": 2, "sourcePort": "out", "targetNode": 1, "targetPort": "in"}
            ]
        }"#,
    )
    .unwrap();
    assert!(matches!(s.load(&diagram), Err(FlowError::Diagram(_))));
    assert!(s.flow().contains_node(kept));
    assert_eq!(s.flow().node_count(), 1);
    assert!(s.can_undo());
}

#[test]
fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (mut s, _events) = session();
    let err = s.load_diagram(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, VisFlowError::Flow(FlowError::Diagram(_))));
}

#[test]
fn test_legacy_type_ids_load() {
    let diagram = Diagram::from_json(
        r#"{"nodes": [
            {"id": 0, "type": "datasrc"},
            {"id": 1, "type": "contain"},
            {"id": 2, "type": "bandLimiter"}
        ]}"#,
    )
    .unwrap();
    let types: Vec<NodeType> = diagram.nodes.iter().map(|n| n.node_type).collect();
    assert_eq!(
        types,
        vec![NodeType::DataSource, NodeType::ValueFilter, NodeType::Sampler]
    );
}
