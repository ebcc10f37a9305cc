//! Built-in node implementations.

pub mod data_source;
pub mod identity;
pub mod property_editor;
pub mod property_mapping;
pub mod range_filter;
pub mod sampler;
pub mod set_ops;
pub mod value_extractor;
pub mod value_filter;
pub mod value_maker;
pub mod visualization;

pub use data_source::DataSourceNode;
pub use identity::IdentityNode;
pub use property_editor::PropertyEditorNode;
pub use property_mapping::{MappedProperty, PropertyMappingNode};
pub use range_filter::RangeFilterNode;
pub use sampler::{SampleCondition, SampleMode, SamplerNode};
pub use set_ops::{
    intersect, minus, union, IntersectStrategy, MinusStrategy, SetInputs, SetNode, SetStrategy,
    UnionStrategy,
};
pub use value_extractor::ValueExtractorNode;
pub use value_filter::{MatchTarget, ValueFilterNode};
pub use value_maker::ValueMakerNode;
pub use visualization::VisualizationNode;

use crate::data::DataError;
use crate::flow::error::FlowResult;
use crate::flow::node::BuiltinNode;
use crate::flow::node_type::NodeType;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Creates built-in nodes by type.
pub struct NodeFactory;

impl NodeFactory {
    pub fn create(node_type: NodeType) -> BuiltinNode {
        match node_type {
            NodeType::DataSource => BuiltinNode::DataSource(DataSourceNode::new()),
            NodeType::ValueMaker => BuiltinNode::ValueMaker(ValueMakerNode::new()),
            NodeType::Union => BuiltinNode::Union(SetNode::new()),
            NodeType::Intersect => BuiltinNode::Intersect(SetNode::new()),
            NodeType::Minus => BuiltinNode::Minus(SetNode::new()),
            NodeType::RangeFilter => BuiltinNode::RangeFilter(RangeFilterNode::new()),
            NodeType::ValueFilter => BuiltinNode::ValueFilter(ValueFilterNode::new()),
            NodeType::Sampler => BuiltinNode::Sampler(SamplerNode::new()),
            NodeType::PropertyEditor => BuiltinNode::PropertyEditor(PropertyEditorNode::new()),
            NodeType::PropertyMapping => BuiltinNode::PropertyMapping(PropertyMappingNode::new()),
            NodeType::ValueExtractor => BuiltinNode::ValueExtractor(ValueExtractorNode::new()),
            NodeType::Identity => BuiltinNode::Identity(IdentityNode::new()),
            visualization => BuiltinNode::Visualization(VisualizationNode::new(visualization)),
        }
    }
}

/// Serialize a node's options struct, or `null` if it cannot be represented.
pub(crate) fn options_to_json<T: Serialize>(options: &T) -> serde_json::Value {
    serde_json::to_value(options).unwrap_or_default()
}

/// Read a node's options struct. `null` keeps the defaults.
pub(crate) fn options_from_json<T: DeserializeOwned + Default>(
    value: &serde_json::Value,
) -> FlowResult<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value.clone()).map_err(DataError::from)?)
}
