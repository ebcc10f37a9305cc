//! Node abstraction for the dataflow.
//!
//! Two-layer design:
//! - **`NodePlugin` trait**: implemented by every node, and usable for
//!   user-defined nodes added programmatically.
//! - **`BuiltinNode` enum**: the built-in node catalogue, dispatched by match.
//!
//! `AnyNode` wraps either variant so the dataflow can handle both uniformly.

use crate::data::{Constants, Package, PackageKind, SubsetPackage};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::id::NodeId;
use crate::flow::node_type::NodeType;
use crate::flow::nodes::{
    DataSourceNode, IdentityNode, IntersectStrategy, MinusStrategy, PropertyEditorNode,
    PropertyMappingNode, RangeFilterNode, SamplerNode, SetNode, UnionStrategy, ValueExtractorNode, ValueFilterNode,
    ValueMakerNode, VisualizationNode,
};
use crate::flow::port::{Port, PortDescriptor, PortDirection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Propagation state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Output reflects the current inputs and settings.
    Clean,
    /// Waiting to be processed, or the last attempt failed.
    Dirty,
    /// Suspended on an outstanding dataset fetch.
    Processing,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Clean => write!(f, "clean"),
            NodeState::Dirty => write!(f, "dirty"),
            NodeState::Processing => write!(f, "processing"),
        }
    }
}

/// Canvas position of a node. Carried for persistence and undo only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A setting value sent to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Indices(Vec<usize>),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers are accepted as floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(v) => Some(*v),
            ConfigValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_indices(&self) -> Option<&[usize]> {
        match self {
            ConfigValue::Indices(v) => Some(v),
            _ => None,
        }
    }

    /// Non-negative integer, e.g. a dimension index.
    pub fn as_usize(&self) -> Option<usize> {
        self.as_int().and_then(|v| usize::try_from(v).ok())
    }

    // Typed access for setting handlers. A value of the wrong type is an
    // `InvalidSetting` error naming the setting.

    pub fn require_str(&self, key: &str) -> FlowResult<&str> {
        self.as_str().ok_or_else(|| Self::invalid(key, "a string"))
    }

    pub fn require_usize(&self, key: &str) -> FlowResult<usize> {
        self.as_usize()
            .ok_or_else(|| Self::invalid(key, "a non-negative integer"))
    }

    pub fn require_float(&self, key: &str) -> FlowResult<f64> {
        self.as_float().ok_or_else(|| Self::invalid(key, "a number"))
    }

    pub fn require_bool(&self, key: &str) -> FlowResult<bool> {
        self.as_bool().ok_or_else(|| Self::invalid(key, "true or false"))
    }

    pub fn require_indices(&self, key: &str) -> FlowResult<&[usize]> {
        self.as_indices()
            .ok_or_else(|| Self::invalid(key, "a list of item indices"))
    }

    fn invalid(key: &str, expected: &str) -> FlowError {
        FlowError::InvalidSetting {
            key: key.to_string(),
            message: format!("expected {}", expected),
        }
    }
}

/// A dataset a node needs before it can finish processing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub username: String,
    pub filename: String,
}

/// Identifies one outstanding fetch. A completion whose ticket no longer
/// matches the active pass is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AsyncTicket {
    pub node: NodeId,
    pub generation: u64,
}

/// A fetch the dataflow is suspended on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncRequest {
    pub ticket: AsyncTicket,
    pub fetch: FetchRequest,
}

/// Raw dataset text, or the fetch failure message.
pub type AsyncCompletion = std::result::Result<String, String>;

/// Result of processing a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Outputs are staged; the node is clean.
    Done,
    /// The node needs a dataset first; the pass suspends until it arrives.
    Pending(FetchRequest),
}

/// Context passed to a node while it processes.
///
/// Inputs are read straight from the node's ports. Outputs are staged and only
/// written back when processing succeeds, so a failing node keeps its previous
/// output.
pub struct NodeContext<'a> {
    pub node_id: NodeId,
    /// Generation of the pass this node runs in.
    pub generation: u64,
    ports: &'a [Port],
    staged: Vec<Option<Package>>,
}

impl<'a> NodeContext<'a> {
    pub fn new(node_id: NodeId, generation: u64, ports: &'a [Port]) -> Self {
        Self {
            node_id,
            generation,
            ports,
            staged: vec![None; ports.len()],
        }
    }

    fn position(&self, name: &str) -> FlowResult<usize> {
        self.ports
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| FlowError::UnknownPort {
                node: self.node_id,
                port: name.to_string(),
            })
    }

    pub fn port(&self, name: &str) -> FlowResult<&'a Port> {
        let ports: &'a [Port] = self.ports;
        let index = self.position(name)?;
        Ok(&ports[index])
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.port(name).map(Port::is_connected).unwrap_or(false)
    }

    /// The subset held by a single input port.
    pub fn subset(&self, name: &str) -> FlowResult<&'a SubsetPackage> {
        let port = self.port(name)?;
        port.package()
            .as_subset()
            .ok_or_else(|| self.kind_mismatch(name, PackageKind::Subset))
    }

    /// All subsets held by a multiple input port, in connection order.
    pub fn subsets(&self, name: &str) -> FlowResult<Vec<&'a SubsetPackage>> {
        let port = self.port(name)?;
        port.packages()
            .into_iter()
            .map(|pack| {
                pack.as_subset()
                    .ok_or_else(|| self.kind_mismatch(name, PackageKind::Subset))
            })
            .collect()
    }

    /// The constants held by a single input port.
    pub fn constants(&self, name: &str) -> FlowResult<&'a Constants> {
        let port = self.port(name)?;
        port.package()
            .as_constants()
            .ok_or_else(|| self.kind_mismatch(name, PackageKind::Constants))
    }

    /// Stage a new output package for an output port.
    pub fn set_output(&mut self, name: &str, pack: impl Into<Package>) -> FlowResult<()> {
        let index = self.position(name)?;
        let descriptor = self.ports[index].descriptor();
        let pack = pack.into();
        if descriptor.direction != PortDirection::Output {
            return Err(FlowError::PortMismatch(format!("'{}' is not an output", name)));
        }
        if descriptor.kind != pack.kind() {
            return Err(self.kind_mismatch(name, descriptor.kind));
        }
        self.staged[index] = Some(pack);
        Ok(())
    }

    /// Staged outputs, indexed like the node's ports.
    pub fn into_staged(self) -> Vec<Option<Package>> {
        self.staged
    }

    fn kind_mismatch(&self, name: &str, expected: PackageKind) -> FlowError {
        FlowError::PortMismatch(format!(
            "port '{}' of {:?} does not carry {} packages",
            name, self.node_id, expected
        ))
    }
}

/// Behaviour shared by every node.
pub trait NodePlugin: Send {
    /// Human-readable name of this node.
    fn name(&self) -> &str;

    /// Port descriptors for this node.
    fn ports(&self) -> &[PortDescriptor];

    /// Recompute outputs from the current inputs and settings.
    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome>;

    /// Finish processing after a requested fetch resolves.
    fn complete_async(
        &mut self,
        _completion: AsyncCompletion,
        ctx: &mut NodeContext,
    ) -> FlowResult<ProcessOutcome> {
        Err(FlowError::UnexpectedCompletion(ctx.node_id))
    }

    /// Called when a setting changes. The node is re-processed afterwards.
    ///
    /// Keys the node does not know and values of the wrong type are errors,
    /// and leave the settings as they were.
    fn on_config_change(&mut self, key: &str, _value: &ConfigValue) -> FlowResult<()> {
        Err(FlowError::unknown_setting(key))
    }

    /// Node settings for persistence.
    fn serialize_options(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Restore settings written by `serialize_options`.
    fn deserialize_options(&mut self, _options: &serde_json::Value) -> FlowResult<()> {
        Ok(())
    }
}

/// Enum dispatch for built-in nodes.
pub enum BuiltinNode {
    DataSource(DataSourceNode),
    ValueMaker(ValueMakerNode),
    Union(SetNode<UnionStrategy>),
    Intersect(SetNode<IntersectStrategy>),
    Minus(SetNode<MinusStrategy>),
    RangeFilter(RangeFilterNode),
    ValueFilter(ValueFilterNode),
    Sampler(SamplerNode),
    PropertyEditor(PropertyEditorNode),
    PropertyMapping(PropertyMappingNode),
    ValueExtractor(ValueExtractorNode),
    Identity(IdentityNode),
    Visualization(VisualizationNode),
}

macro_rules! dispatch {
    ($node:expr, $n:ident => $body:expr) => {
        match $node {
            BuiltinNode::DataSource($n) => $body,
            BuiltinNode::ValueMaker($n) => $body,
            BuiltinNode::Union($n) => $body,
            BuiltinNode::Intersect($n) => $body,
            BuiltinNode::Minus($n) => $body,
            BuiltinNode::RangeFilter($n) => $body,
            BuiltinNode::ValueFilter($n) => $body,
            BuiltinNode::Sampler($n) => $body,
            BuiltinNode::PropertyEditor($n) => $body,
            BuiltinNode::PropertyMapping($n) => $body,
            BuiltinNode::ValueExtractor($n) => $body,
            BuiltinNode::Identity($n) => $body,
            BuiltinNode::Visualization($n) => $body,
        }
    };
}

impl BuiltinNode {
    pub fn node_type(&self) -> NodeType {
        match self {
            BuiltinNode::DataSource(_) => NodeType::DataSource,
            BuiltinNode::ValueMaker(_) => NodeType::ValueMaker,
            BuiltinNode::Union(_) => NodeType::Union,
            BuiltinNode::Intersect(_) => NodeType::Intersect,
            BuiltinNode::Minus(_) => NodeType::Minus,
            BuiltinNode::RangeFilter(_) => NodeType::RangeFilter,
            BuiltinNode::ValueFilter(_) => NodeType::ValueFilter,
            BuiltinNode::Sampler(_) => NodeType::Sampler,
            BuiltinNode::PropertyEditor(_) => NodeType::PropertyEditor,
            BuiltinNode::PropertyMapping(_) => NodeType::PropertyMapping,
            BuiltinNode::ValueExtractor(_) => NodeType::ValueExtractor,
            BuiltinNode::Identity(_) => NodeType::Identity,
            BuiltinNode::Visualization(n) => n.node_type(),
        }
    }

    pub fn name(&self) -> &str {
        dispatch!(self, n => n.name())
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        dispatch!(self, n => n.ports())
    }

    pub fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        dispatch!(self, n => n.process(ctx))
    }

    pub fn complete_async(
        &mut self,
        completion: AsyncCompletion,
        ctx: &mut NodeContext,
    ) -> FlowResult<ProcessOutcome> {
        dispatch!(self, n => n.complete_async(completion, ctx))
    }

    pub fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        dispatch!(self, n => n.on_config_change(key, value))
    }

    pub fn serialize_options(&self) -> serde_json::Value {
        dispatch!(self, n => n.serialize_options())
    }

    pub fn deserialize_options(&mut self, options: &serde_json::Value) -> FlowResult<()> {
        dispatch!(self, n => n.deserialize_options(options))
    }
}

/// Wrapper that holds either a built-in node (enum dispatch) or a plugin (trait object).
pub enum AnyNode {
    Builtin(BuiltinNode),
    Plugin(Box<dyn NodePlugin>),
}

impl AnyNode {
    /// Built-in nodes know their type; plugins have none.
    pub fn node_type(&self) -> Option<NodeType> {
        match self {
            AnyNode::Builtin(n) => Some(n.node_type()),
            AnyNode::Plugin(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AnyNode::Builtin(n) => n.name(),
            AnyNode::Plugin(n) => n.name(),
        }
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        match self {
            AnyNode::Builtin(n) => n.ports(),
            AnyNode::Plugin(n) => n.ports(),
        }
    }

    pub fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        match self {
            AnyNode::Builtin(n) => n.process(ctx),
            AnyNode::Plugin(n) => n.process(ctx),
        }
    }

    pub fn complete_async(
        &mut self,
        completion: AsyncCompletion,
        ctx: &mut NodeContext,
    ) -> FlowResult<ProcessOutcome> {
        match self {
            AnyNode::Builtin(n) => n.complete_async(completion, ctx),
            AnyNode::Plugin(n) => n.complete_async(completion, ctx),
        }
    }

    pub fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        match self {
            AnyNode::Builtin(n) => n.on_config_change(key, value),
            AnyNode::Plugin(n) => n.on_config_change(key, value),
        }
    }

    pub fn serialize_options(&self) -> serde_json::Value {
        match self {
            AnyNode::Builtin(n) => n.serialize_options(),
            AnyNode::Plugin(n) => n.serialize_options(),
        }
    }

    pub fn deserialize_options(&mut self, options: &serde_json::Value) -> FlowResult<()> {
        match self {
            AnyNode::Builtin(n) => n.deserialize_options(options),
            AnyNode::Plugin(n) => n.deserialize_options(options),
        }
    }
}

impl From<BuiltinNode> for AnyNode {
    fn from(node: BuiltinNode) -> Self {
        AnyNode::Builtin(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::id::PortId;

    static PORTS: &[PortDescriptor] = &[
        PortDescriptor::input("in", PackageKind::Constants),
        PortDescriptor::output("out", PackageKind::Subset),
    ];

    fn ports() -> Vec<Port> {
        PORTS
            .iter()
            .enumerate()
            .map(|(i, d)| Port::new(PortId::new(NodeId(0), i as u16), *d))
            .collect()
    }

    #[test]
    fn test_context_reads_inputs() {
        let ports = ports();
        let ctx = NodeContext::new(NodeId(0), 1, &ports);
        assert!(ctx.constants("in").unwrap().is_empty());
        assert!(!ctx.is_connected("in"));
        assert!(matches!(ctx.subset("in"), Err(FlowError::PortMismatch(_))));
        assert!(matches!(ctx.port("nope"), Err(FlowError::UnknownPort { .. })));
    }

    #[test]
    fn test_set_output_validates_port() {
        let ports = ports();
        let mut ctx = NodeContext::new(NodeId(0), 1, &ports);
        assert!(ctx.set_output("in", SubsetPackage::new()).is_err());
        assert!(ctx.set_output("out", Constants::new()).is_err());
        ctx.set_output("out", SubsetPackage::new()).unwrap();
        let staged = ctx.into_staged();
        assert!(staged[0].is_none());
        assert!(staged[1].is_some());
    }

    #[test]
    fn test_config_value_accessors() {
        assert_eq!(ConfigValue::Int(3).as_usize(), Some(3));
        assert_eq!(ConfigValue::Int(-1).as_usize(), None);
        assert_eq!(ConfigValue::Int(2).as_float(), Some(2.0));
        assert_eq!(ConfigValue::String("x".into()).as_str(), Some("x"));
    }

    #[test]
    fn test_required_setting_types() {
        assert_eq!(ConfigValue::Int(4).require_float("size").unwrap(), 4.0);
        assert!(matches!(
            ConfigValue::Int(-2).require_usize("dim"),
            Err(FlowError::InvalidSetting { key, .. }) if key == "dim"
        ));
        assert!(ConfigValue::Bool(true).require_str("filename").is_err());
        assert!(ConfigValue::Int(1).require_indices("selection").is_err());
    }

    #[test]
    fn test_nodes_without_settings_reject_keys() {
        let mut node = BuiltinNode::Identity(IdentityNode::new());
        assert!(matches!(
            node.on_config_change("dim", &ConfigValue::Int(0)),
            Err(FlowError::InvalidSetting { .. })
        ));
    }
}
