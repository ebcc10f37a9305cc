//! SamplerNode: keeps items whose value on one dimension is among the first
//! or last N distinct values, optionally within each group.

use crate::data::{PackageKind, SubsetPackage, Value};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::node::{ConfigValue, NodeContext, NodePlugin, ProcessOutcome};
use crate::flow::nodes::{options_from_json, options_to_json};
use crate::flow::port::PortDescriptor;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PackageKind::Subset),
    PortDescriptor::output("out", PackageKind::Subset),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SampleCondition {
    /// Smallest values.
    #[default]
    First,
    /// Largest values.
    Last,
    /// Uniformly random values.
    Sampling,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SampleMode {
    #[default]
    Count,
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SamplerOptions {
    pub dim: usize,
    pub group_by: Option<usize>,
    pub condition: SampleCondition,
    pub mode: SampleMode,
    pub number: f64,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            dim: 0,
            group_by: None,
            condition: SampleCondition::First,
            mode: SampleMode::Count,
            number: 5.0,
        }
    }
}

pub struct SamplerNode {
    options: SamplerOptions,
}

impl SamplerNode {
    pub fn new() -> Self {
        Self {
            options: SamplerOptions::default(),
        }
    }

    pub fn options(&self) -> &SamplerOptions {
        &self.options
    }

    fn sample_count(&self, available: usize) -> usize {
        let number = self.options.number.max(0.0);
        let count = match self.options.mode {
            SampleMode::Count => number.floor() as usize,
            SampleMode::Percentage => (number / 100.0 * available as f64).ceil() as usize,
        };
        count.min(available)
    }

    /// Value keys accepted within one group.
    fn accepted(&self, input: &SubsetPackage, group: &[usize]) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut values: Vec<&Value> = group
            .iter()
            .filter_map(|&index| input.value(index, self.options.dim))
            .filter(|v| seen.insert(v.to_string()))
            .collect();
        let count = self.sample_count(values.len());

        match self.options.condition {
            SampleCondition::First => values.sort_by(|a, b| a.compare(b)),
            SampleCondition::Last => values.sort_by(|a, b| b.compare(a)),
            SampleCondition::Sampling => {
                return values
                    .choose_multiple(&mut rand::thread_rng(), count)
                    .map(|v| v.to_string())
                    .collect();
            }
        }
        values.iter().take(count).map(|v| v.to_string()).collect()
    }
}

impl Default for SamplerNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePlugin for SamplerNode {
    fn name(&self) -> &str {
        "Sampler"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        let input = ctx.subset("in")?;
        let Some(dataset) = input.dataset().filter(|_| !input.is_empty()) else {
            ctx.set_output("out", input.clone())?;
            return Ok(ProcessOutcome::Done);
        };
        dataset.check_dimension(self.options.dim)?;
        if let Some(group_by) = self.options.group_by {
            dataset.check_dimension(group_by)?;
        }

        let mut keep = Vec::new();
        for group in input.group_items(self.options.group_by) {
            let accepted = self.accepted(input, &group);
            keep.extend(group.into_iter().filter(|&index| {
                input
                    .value(index, self.options.dim)
                    .is_some_and(|v| accepted.contains(&v.to_string()))
            }));
        }

        let mut out = input.clone();
        out.filter(keep);
        ctx.set_output("out", out)?;
        Ok(ProcessOutcome::Done)
    }

    fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        match key {
            "dim" => self.options.dim = value.require_usize(key)?,
            // An empty string removes the grouping.
            "groupBy" => {
                self.options.group_by = match value {
                    ConfigValue::String(text) if text.is_empty() => None,
                    _ => Some(value.require_usize(key)?),
                }
            }
            "condition" => {
                self.options.condition = match value.require_str(key)? {
                    "first" => SampleCondition::First,
                    "last" => SampleCondition::Last,
                    "sampling" => SampleCondition::Sampling,
                    other => return Err(FlowError::invalid_choice(key, other, "first, last or sampling")),
                }
            }
            "mode" => {
                self.options.mode = match value.require_str(key)? {
                    "count" => SampleMode::Count,
                    "percentage" => SampleMode::Percentage,
                    other => return Err(FlowError::invalid_choice(key, other, "count or percentage")),
                }
            }
            "number" => self.options.number = value.require_float(key)?,
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
