//! ValueMakerNode: emits constants typed in by the user.

use crate::data::{Constants, PackageKind};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::node::{ConfigValue, NodeContext, NodePlugin, ProcessOutcome};
use crate::flow::nodes::{options_from_json, options_to_json};
use crate::flow::port::PortDescriptor;
use serde::{Deserialize, Serialize};

static PORTS: &[PortDescriptor] = &[PortDescriptor::output("out", PackageKind::Constants)];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueMakerOptions {
    /// Elements separated by `,` or `;`.
    pub value: String,
}

pub struct ValueMakerNode {
    options: ValueMakerOptions,
}

impl ValueMakerNode {
    pub fn new() -> Self {
        Self {
            options: ValueMakerOptions::default(),
        }
    }

    pub fn with_value(value: &str) -> Self {
        Self {
            options: ValueMakerOptions {
                value: value.to_string(),
            },
        }
    }

    pub fn value(&self) -> &str {
        &self.options.value
    }
}

impl Default for ValueMakerNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePlugin for ValueMakerNode {
    fn name(&self) -> &str {
        "Value Maker"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        ctx.set_output("out", Constants::parse(&self.options.value))?;
        Ok(ProcessOutcome::Done)
    }

    fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        match key {
            "value" => self.options.value = value.require_str(key)?.to_string(),
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
    use crate::data::ConstantType;
    use crate::flow::id::{NodeId, PortId};
    use crate::flow::port::Port;

    #[test]
    fn test_emits_parsed_constants() {
        let mut node = ValueMakerNode::with_value("3; 1.5, 3");
        let ports = vec![Port::new(PortId::new(NodeId(0), 0), PORTS[0])];
        let mut ctx = NodeContext::new(NodeId(0), 1, &ports);
        node.process(&mut ctx).unwrap();
        let staged = ctx.into_staged();
        let constants = staged[0].as_ref().unwrap().as_constants().unwrap().clone();
        assert_eq!(constants.constant_type(), ConstantType::Float);
        assert_eq!(constants.count(), 2);
    }
}
