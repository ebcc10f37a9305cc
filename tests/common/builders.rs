//! Test data builders for creating test objects

use std::sync::Arc;
use visflow::data::{SubsetItem, SubsetPackage, TabularDataset, VisualProperties};
use visflow::flow::nodes::DataSourceNode;
use visflow::flow::{
    BuiltinNode, ConfigValue, Dataflow, EdgeId, NodeFactory, NodeId, NodeType, Position,
};

/// Dataset with a single integer column `x` holding `0..rows`.
pub fn numbers_dataset(rows: usize) -> Arc<TabularDataset> {
    let mut text = String::from("x\n");
    for i in 0..rows {
        text.push_str(&format!("{}\n", i));
    }
    Arc::new(TabularDataset::parse_csv("numbers.csv", &text).unwrap())
}

/// Builder for subset packages over a shared dataset
pub struct SubsetBuilder {
    pack: SubsetPackage,
}

impl SubsetBuilder {
    pub fn new(dataset: &Arc<TabularDataset>) -> Self {
        Self {
            pack: SubsetPackage::with_dataset(dataset.clone()),
        }
    }

    pub fn items(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        for index in indices {
            self.pack.add_item(SubsetItem::new(index));
        }
        self
    }

    pub fn color(mut self, index: usize, color: &str) -> Self {
        let visuals = VisualProperties {
            color: Some(color.to_string()),
            ..Default::default()
        };
        self.pack.add_item(SubsetItem::with_visuals(index, visuals));
        self
    }

    pub fn build(self) -> SubsetPackage {
        self.pack
    }
}

/// Builder for dataflow graphs wired by port name
pub struct FlowBuilder {
    flow: Dataflow,
}

impl FlowBuilder {
    pub fn new() -> Self {
        Self {
            flow: Dataflow::default(),
        }
    }

    pub fn flow(&mut self) -> &mut Dataflow {
        &mut self.flow
    }

    pub fn source(&mut self, dataset: Arc<TabularDataset>) -> NodeId {
        self.flow.add_node(
            BuiltinNode::DataSource(DataSourceNode::with_dataset(dataset)),
            Position::default(),
        )
    }

    pub fn node(&mut self, node_type: NodeType) -> NodeId {
        self.flow
            .add_node(NodeFactory::create(node_type), Position::default())
    }

    pub fn link(&mut self, from: NodeId, out: &str, to: NodeId, input: &str) -> EdgeId {
        let source = self.flow.port_id(from, out).unwrap();
        let target = self.flow.port_id(to, input).unwrap();
        self.flow.connect(source, target).unwrap()
    }

    pub fn configure(&mut self, node: NodeId, key: &str, value: ConfigValue) -> &mut Self {
        self.flow.configure_node(node, key, &value).unwrap();
        self
    }

    pub fn build(self) -> Dataflow {
        self.flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_builder() {
        let data = numbers_dataset(4);
        let pack = SubsetBuilder::new(&data).items([0, 2]).color(2, "red").build();
        assert_eq!(pack.num_items(), 2);
        assert_eq!(
            pack.get_item(2).and_then(|i| i.visuals.color.as_deref()),
            Some("red")
        );
    }
}
