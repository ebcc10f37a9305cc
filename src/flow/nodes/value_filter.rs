//! ValueFilterNode: keeps items whose value on one dimension matches any of
//! a list of values.

use crate::data::{Constants, PackageKind};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::node::{ConfigValue, NodeContext, NodePlugin, ProcessOutcome};
use crate::flow::nodes::{options_from_json, options_to_json};
use crate::flow::port::PortDescriptor;
use serde::{Deserialize, Serialize};

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PackageKind::Subset),
    PortDescriptor::input("inVal", PackageKind::Constants),
    PortDescriptor::output("out", PackageKind::Subset),
];

/// How a cell is compared against the filter values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchTarget {
    /// The whole cell equals a value.
    #[default]
    Full,
    /// The cell contains a value.
    Substring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValueFilterOptions {
    pub dim: Option<usize>,
    pub type_in_value: String,
    pub target: MatchTarget,
    pub ignore_case: bool,
}

impl Default for ValueFilterOptions {
    fn default() -> Self {
        Self {
            dim: None,
            type_in_value: String::new(),
            target: MatchTarget::Full,
            ignore_case: true,
        }
    }
}

pub struct ValueFilterNode {
    options: ValueFilterOptions,
}

impl ValueFilterNode {
    pub fn new() -> Self {
        Self {
            options: ValueFilterOptions::default(),
        }
    }

    pub fn options(&self) -> &ValueFilterOptions {
        &self.options
    }

    fn normalize(&self, text: String) -> String {
        if self.options.ignore_case {
            text.to_lowercase()
        } else {
            text
        }
    }

    fn matches(&self, cell: &str, patterns: &[String]) -> bool {
        patterns.iter().any(|p| match self.options.target {
            MatchTarget::Full => cell == p,
            MatchTarget::Substring => cell.contains(p.as_str()),
        })
    }
}

impl Default for ValueFilterNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePlugin for ValueFilterNode {
    fn name(&self) -> &str {
        "Value Filter"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        let input = ctx.subset("in")?;
        let Some(dim) = self.options.dim else {
            ctx.set_output("out", input.emptied())?;
            return Ok(ProcessOutcome::Done);
        };
        let Some(dataset) = input.dataset().filter(|_| !input.is_empty()) else {
            ctx.set_output("out", input.clone())?;
            return Ok(ProcessOutcome::Done);
        };
        dataset.check_dimension(dim)?;

        let values = if ctx.is_connected("inVal") {
            ctx.constants("inVal")?.clone()
        } else {
            Constants::parse(&self.options.type_in_value)
        };
        let patterns: Vec<String> = values
            .get_all()
            .iter()
            .map(|v| self.normalize(v.to_string()))
            .collect();

        let keep: Vec<usize> = input
            .indices()
            .filter(|&index| {
                input
                    .value(index, dim)
                    .map(|v| self.matches(&self.normalize(v.to_string()), &patterns))
                    .unwrap_or(false)
            })
            .collect();

        let mut out = input.clone();
        out.filter(keep);
        ctx.set_output("out", out)?;
        Ok(ProcessOutcome::Done)
    }

    fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        match key {
            "dim" => self.options.dim = Some(value.require_usize(key)?),
            "typeInValue" => self.options.type_in_value = value.require_str(key)?.to_string(),
            "target" => {
                self.options.target = match value.require_str(key)? {
                    "full" => MatchTarget::Full,
                    "substring" => MatchTarget::Substring,
                    other => return Err(FlowError::invalid_choice(key, other, "full or substring")),
                }
            }
            "ignoreCase" => self.options.ignore_case = value.require_bool(key)?,
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

    fn ports(values: Option<&str>) -> Vec<Port> {
        let text = "city,pop\nBoston,6\nNew York,8\nYork,1\n";
        let data = Arc::new(TabularDataset::parse_csv("cities", text).unwrap());
        let mut ports: Vec<Port> = PORTS
            .iter()
            .enumerate()
            .map(|(i, d)| Port::new(PortId::new(NodeId(0), i as u16), *d))
            .collect();
        ports[0].connect(EdgeId(0), Arc::new(Package::Subset(SubsetPackage::full(data))));
        if let Some(values) = values {
            ports[1].connect(EdgeId(1), Arc::new(Package::Constants(Constants::parse(values))));
        }
        ports
    }

    fn run(node: &mut ValueFilterNode, ports: &[Port]) -> Vec<usize> {
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
    fn test_no_dimension_gives_empty_result() {
        let mut node = ValueFilterNode::new();
        assert!(run(&mut node, &ports(None)).is_empty());
    }

    #[test]
    fn test_full_match_ignores_case() {
        let mut node = ValueFilterNode::new();
        node.on_config_change("dim", &ConfigValue::Int(0)).unwrap();
        node.on_config_change("typeInValue", &ConfigValue::String("york".into()))
            .unwrap();
        assert_eq!(run(&mut node, &ports(None)), vec![2]);

        node.on_config_change("ignoreCase", &ConfigValue::Bool(false))
            .unwrap();
        assert!(run(&mut node, &ports(None)).is_empty());
    }

    #[test]
    fn test_substring_match_from_port() {
        let mut node = ValueFilterNode::new();
        node.on_config_change("dim", &ConfigValue::Int(0)).unwrap();
        node.on_config_change("target", &ConfigValue::String("substring".into()))
            .unwrap();
        assert_eq!(run(&mut node, &ports(Some("york; bos"))), vec![0, 1, 2]);
    }

    #[test]
    fn test_target_must_be_known() {
        let mut node = ValueFilterNode::new();
        assert!(node
            .on_config_change("target", &ConfigValue::String("prefix".into()))
            .is_err());
        assert!(node
            .on_config_change("ignoreCase", &ConfigValue::String("yes".into()))
            .is_err());
        assert_eq!(node.options.target, MatchTarget::Full);
    }
}
