//! PropertyEditorNode: assigns visual properties to every item passing through.

use crate::data::{PackageKind, VisualProperties};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::node::{ConfigValue, NodeContext, NodePlugin, ProcessOutcome};
use crate::flow::nodes::{options_from_json, options_to_json};
use crate::flow::port::PortDescriptor;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PackageKind::Subset),
    PortDescriptor::output("out", PackageKind::Subset),
];

pub struct PropertyEditorNode {
    visuals: VisualProperties,
}

impl PropertyEditorNode {
    pub fn new() -> Self {
        Self {
            visuals: VisualProperties::default(),
        }
    }

    pub fn with_visuals(visuals: VisualProperties) -> Self {
        Self { visuals }
    }

    pub fn visuals(&self) -> &VisualProperties {
        &self.visuals
    }
}

impl Default for PropertyEditorNode {
    fn default() -> Self {
        Self::new()
    }
}

// An empty string clears a property.

fn optional_number(key: &str, value: &ConfigValue) -> FlowResult<Option<f64>> {
    match value {
        ConfigValue::String(text) if text.is_empty() => Ok(None),
        _ => value.require_float(key).map(Some),
    }
}

fn optional_text(key: &str, value: &ConfigValue) -> FlowResult<Option<String>> {
    let text = value.require_str(key)?;
    Ok((!text.is_empty()).then(|| text.to_string()))
}

impl NodePlugin for PropertyEditorNode {
    fn name(&self) -> &str {
        "Property Editor"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        let mut out = ctx.subset("in")?.clone();
        if !self.visuals.is_empty() {
            for item in out.items_mut() {
                item.visuals.merge(&self.visuals);
            }
        }
        ctx.set_output("out", out)?;
        Ok(ProcessOutcome::Done)
    }

    fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        match key {
            "opacity" => self.visuals.opacity = optional_number(key, value)?,
            "color" => self.visuals.color = optional_text(key, value)?,
            "size" => self.visuals.size = optional_number(key, value)?,
            "borderColor" => self.visuals.border_color = optional_text(key, value)?,
            "borderWidth" => self.visuals.border_width = optional_number(key, value)?,
            _ => return Err(FlowError::unknown_setting(key)),
        }
        Ok(())
    }

    fn serialize_options(&self) -> serde_json::Value {
        options_to_json(&self.visuals)
    }

    fn deserialize_options(&mut self, options: &serde_json::Value) -> FlowResult<()> {
        self.visuals = options_from_json(options)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Package, SubsetItem, SubsetPackage, TabularDataset};
    use crate::flow::id::{EdgeId, NodeId, PortId};
    use crate::flow::port::Port;
    use std::sync::Arc;

    #[test]
    fn test_overlays_properties_without_touching_input() {
        let data = Arc::new(TabularDataset::parse_csv("d", "x\n1\n2\n").unwrap());
        let mut input = SubsetPackage::with_dataset(data);
        input.add_item(SubsetItem::with_visuals(
            0,
            VisualProperties {
                size: Some(2.0),
                ..Default::default()
            },
        ));
        input.add_item(SubsetItem::new(1));

        let mut ports: Vec<Port> = PORTS
            .iter()
            .enumerate()
            .map(|(i, d)| Port::new(PortId::new(NodeId(0), i as u16), *d))
            .collect();
        ports[0].connect(EdgeId(0), Arc::new(Package::Subset(input)));

        let mut node = PropertyEditorNode::new();
        node.on_config_change("color", &ConfigValue::String("#ff0000".into()))
            .unwrap();
        let mut ctx = NodeContext::new(NodeId(0), 1, &ports);
        node.process(&mut ctx).unwrap();
        let staged = ctx.into_staged();
        let out = staged[1].as_ref().unwrap().as_subset().unwrap();

        let item = out.get_item(0).unwrap();
        assert_eq!(item.visuals.color.as_deref(), Some("#ff0000"));
        assert_eq!(item.visuals.size, Some(2.0));

        let original = ports[0].package().as_subset().unwrap();
        assert_eq!(original.get_item(0).unwrap().visuals.color, None);
    }

    #[test]
    fn test_settings_are_typed_and_clearable() {
        let mut node = PropertyEditorNode::new();
        node.on_config_change("size", &ConfigValue::Int(3)).unwrap();
        assert_eq!(node.visuals().size, Some(3.0));

        assert!(node
            .on_config_change("size", &ConfigValue::Bool(true))
            .is_err());
        assert_eq!(node.visuals().size, Some(3.0));

        node.on_config_change("size", &ConfigValue::String(String::new()))
            .unwrap();
        assert_eq!(node.visuals().size, None);
        assert!(matches!(
            node.on_config_change("colour", &ConfigValue::String("red".into())),
            Err(FlowError::InvalidSetting { .. })
        ));
    }
}
