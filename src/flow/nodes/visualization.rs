//! VisualizationNode: shared model behind every chart kind.
//!
//! Rendering is left to the UI. The node forwards its input on `out` and
//! emits the user's selected items on `selection`. The selection is cleared
//! when the upstream dataset changes and pruned when items disappear.

use crate::data::{PackageKind, SubsetSelection};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::node::{ConfigValue, NodeContext, NodePlugin, ProcessOutcome};
use crate::flow::node_type::NodeType;
use crate::flow::nodes::{options_from_json, options_to_json};
use crate::flow::port::PortDescriptor;
use serde::{Deserialize, Serialize};

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PackageKind::Subset),
    PortDescriptor::output("out", PackageKind::Subset),
    PortDescriptor::output("selection", PackageKind::Subset),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VisualizationOptions {
    selected: SubsetSelection,
    last_data_id: Option<String>,
}

pub struct VisualizationNode {
    node_type: NodeType,
    options: VisualizationOptions,
}

impl VisualizationNode {
    pub fn new(node_type: NodeType) -> Self {
        debug_assert!(node_type.is_visualization());
        Self {
            node_type,
            options: VisualizationOptions::default(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn selection(&self) -> &SubsetSelection {
        &self.options.selected
    }
}

impl NodePlugin for VisualizationNode {
    fn name(&self) -> &str {
        self.node_type.display_name()
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        let input = ctx.subset("in")?;
        let data_id = input.data_id().map(String::from);
        if data_id != self.options.last_data_id {
            if !self.options.selected.is_empty() {
                tracing::debug!("Clearing selection of {:?} after data change", ctx.node_id);
            }
            self.options.selected.clear();
            self.options.last_data_id = data_id;
        } else {
            self.options.selected.retain_present(input);
        }

        let selection = self.options.selected.to_subset_package(input);
        ctx.set_output("out", input.clone())?;
        ctx.set_output("selection", selection)?;
        Ok(ProcessOutcome::Done)
    }

    fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        match key {
            "selection" => {
                self.options.selected = value.require_indices(key)?.iter().copied().collect();
            }
            "clearSelection" => self.options.selected.clear(),
            _ => return Err(FlowError::unknown_setting(key)),
        }
        Ok(())
    }

    fn serialize_options(&self) -> serde_json::Value {
        options_to_json(&self.options)
    }

    fn deserialize_options(&mut self, options: &serde_json::Value) -> FlowResult<()> {
        self.options = options_from_json(options)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Package, SubsetPackage, TabularDataset};
    use crate::flow::id::{EdgeId, NodeId, PortId};
    use crate::flow::port::Port;
    use std::sync::Arc;

    fn ports(text: &str, rows: &[usize]) -> Vec<Port> {
        let data = Arc::new(TabularDataset::parse_csv("d", text).unwrap());
        let mut pack = SubsetPackage::full(data);
        pack.filter(rows.iter().copied());
        let mut ports: Vec<Port> = PORTS
            .iter()
            .enumerate()
            .map(|(i, d)| Port::new(PortId::new(NodeId(0), i as u16), *d))
            .collect();
        ports[0].connect(EdgeId(0), Arc::new(Package::Subset(pack)));
        ports
    }

    fn selected(node: &mut VisualizationNode, ports: &[Port]) -> Vec<usize> {
        let mut ctx = NodeContext::new(NodeId(0), 1, ports);
        node.process(&mut ctx).unwrap();
        let staged = ctx.into_staged();
        staged[2]
            .as_ref()
            .and_then(|p| p.as_subset())
            .map(|p| p.indices().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_selection_output() {
        let mut node = VisualizationNode::new(NodeType::Scatterplot);
        let data = "x\n1\n2\n3\n";
        selected(&mut node, &ports(data, &[0, 1, 2]));
        node.on_config_change("selection", &ConfigValue::Indices(vec![0, 2]))
            .unwrap();
        assert_eq!(selected(&mut node, &ports(data, &[0, 1, 2])), vec![0, 2]);

        // Items filtered away upstream drop out of the selection
        assert_eq!(selected(&mut node, &ports(data, &[0, 1])), vec![0]);
        assert_eq!(node.selection().len(), 1);
    }

    #[test]
    fn test_selection_cleared_on_new_data() {
        let mut node = VisualizationNode::new(NodeType::Table);
        selected(&mut node, &ports("x\n1\n2\n", &[0, 1]));
        node.on_config_change("selection", &ConfigValue::Indices(vec![1]))
            .unwrap();
        assert!(selected(&mut node, &ports("y\n7\n8\n", &[0, 1])).is_empty());
    }

    #[test]
    fn test_selection_rejects_wrong_value() {
        let mut node = VisualizationNode::new(NodeType::Histogram);
        assert!(node
            .on_config_change("selection", &ConfigValue::Int(3))
            .is_err());
    }
}
