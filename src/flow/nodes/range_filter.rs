//! RangeFilterNode: keeps items whose value on one dimension lies in
//! `[min, max]`.
//!
//! Each bound comes from its constants port when connected, otherwise from the
//! typed-in text. A missing bound is open.

use crate::data::value::parse_time;
use crate::data::{Constants, DimensionType, PackageKind, Value};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::node::{ConfigValue, NodeContext, NodePlugin, ProcessOutcome};
use crate::flow::nodes::{options_from_json, options_to_json};
use crate::flow::port::PortDescriptor;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PackageKind::Subset),
    PortDescriptor::input("inMin", PackageKind::Constants),
    PortDescriptor::input("inMax", PackageKind::Constants),
    PortDescriptor::output("out", PackageKind::Subset),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RangeFilterOptions {
    pub dim: usize,
    pub type_in_min: String,
    pub type_in_max: String,
}

pub struct RangeFilterNode {
    options: RangeFilterOptions,
}

/// Read time bounds written as dates on time dimensions.
fn coerce_bound(value: &Value, dim_type: DimensionType) -> Value {
    match (dim_type, value) {
        (DimensionType::Time, Value::String(text)) => {
            parse_time(text).map(Value::Time).unwrap_or_else(|| value.clone())
        }
        _ => value.clone(),
    }
}

impl RangeFilterNode {
    pub fn new() -> Self {
        Self {
            options: RangeFilterOptions::default(),
        }
    }

    pub fn options(&self) -> &RangeFilterOptions {
        &self.options
    }

    fn bound(&self, ctx: &NodeContext, port: &str, typed: &str) -> FlowResult<Constants> {
        if ctx.is_connected(port) {
            Ok(ctx.constants(port)?.clone())
        } else {
            Ok(Constants::parse(typed))
        }
    }
}

impl Default for RangeFilterNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePlugin for RangeFilterNode {
    fn name(&self) -> &str {
        "Range Filter"
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
        let dim = self.options.dim;
        dataset.check_dimension(dim)?;

        let min = self.bound(ctx, "inMin", &self.options.type_in_min)?;
        let max = self.bound(ctx, "inMax", &self.options.type_in_max)?;
        if !min.compatible(&max) {
            return Err(FlowError::IncompatibleConstants(format!(
                "min is {:?}, max is {:?}",
                min.constant_type(),
                max.constant_type()
            )));
        }

        let dim_type = dataset.dimension_types()[dim];
        let min = min.get_one().map(|v| coerce_bound(v, dim_type));
        let max = max.get_one().map(|v| coerce_bound(v, dim_type));
        if let (Some(lo), Some(hi)) = (&min, &max) {
            if lo.compare(hi) == Ordering::Greater {
                return Err(FlowError::InvalidRange(format!("{} > {}", lo, hi)));
            }
        }

        let keep: Vec<usize> = input
            .indices()
            .filter(|&index| {
                let Some(value) = input.value(index, dim) else {
                    return false;
                };
                let above = min
                    .as_ref()
                    .map_or(true, |lo| value.compare(lo) != Ordering::Less);
                let below = max
                    .as_ref()
                    .map_or(true, |hi| value.compare(hi) != Ordering::Greater);
                above && below
            })
            .collect();

        let mut out = input.clone();
        out.filter(keep);
        ctx.set_output("out", out)?;
        Ok(ProcessOutcome::Done)
    }

    fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        match key {
            "dim" => self.options.dim = value.require_usize(key)?,
            "typeInMin" => self.options.type_in_min = value.require_str(key)?.to_string(),
            "typeInMax" => self.options.type_in_max = value.require_str(key)?.to_string(),
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
