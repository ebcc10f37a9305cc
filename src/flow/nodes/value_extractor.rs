//! ValueExtractorNode: emits the distinct values of one dimension as
//! constants.
//!
//! The chosen dimension resets to 0 whenever the upstream dataset changes.

use crate::data::{Constants, PackageKind};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::node::{ConfigValue, NodeContext, NodePlugin, ProcessOutcome};
use crate::flow::nodes::{options_from_json, options_to_json};
use crate::flow::port::PortDescriptor;
use serde::{Deserialize, Serialize};

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PackageKind::Subset),
    PortDescriptor::output("out", PackageKind::Constants),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValueExtractorOptions {
    pub dim: usize,
    pub last_data_id: Option<String>,
}

pub struct ValueExtractorNode {
    options: ValueExtractorOptions,
}

impl ValueExtractorNode {
    pub fn new() -> Self {
        Self {
            options: ValueExtractorOptions::default(),
        }
    }

    pub fn dim(&self) -> usize {
        self.options.dim
    }
}

impl Default for ValueExtractorNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePlugin for ValueExtractorNode {
    fn name(&self) -> &str {
        "Value Extractor"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        let input = ctx.subset("in")?;
        let Some(dataset) = input.dataset() else {
            ctx.set_output("out", Constants::new())?;
            return Ok(ProcessOutcome::Done);
        };

        if self.options.last_data_id.as_deref() != Some(dataset.data_id()) {
            if self.options.last_data_id.is_some() {
                tracing::debug!("Upstream data of {:?} changed, resetting dimension", ctx.node_id);
                self.options.dim = 0;
            }
            self.options.last_data_id = Some(dataset.data_id().to_string());
        }
        dataset.check_dimension(self.options.dim)?;

        let dim = self.options.dim;
        let values = input.indices().filter_map(|index| input.value(index, dim));
        ctx.set_output("out", Constants::from_values(values))?;
        Ok(ProcessOutcome::Done)
    }

    fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        match key {
            "dim" => self.options.dim = value.require_usize(key)?,
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
