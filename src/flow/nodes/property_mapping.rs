//! PropertyMappingNode: derives one visual property of every item from the
//! item's value on a chosen dimension.
//!
//! Numeric dimensions are normalized over the incoming items to [0, 1] and
//! read off the scale. String dimensions are categorical: the k-th distinct
//! value in row order takes the k-th stop of the scale, cycling when there
//! are more values than stops. The `categorical` color scale treats every
//! dimension as categorical.
//!
//! The input passes through unchanged until a dimension, a property and a
//! complete scale are chosen.

use crate::data::{PackageKind, SubsetPackage, VisualProperties};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::node::{ConfigValue, NodeContext, NodePlugin, ProcessOutcome};
use crate::flow::nodes::{options_from_json, options_to_json};
use crate::flow::port::PortDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PackageKind::Subset),
    PortDescriptor::output("out", PackageKind::Subset),
];

/// The visual property a mapping writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MappedProperty {
    Color,
    Border,
    Size,
    Width,
    Opacity,
}

impl MappedProperty {
    const CHOICES: &'static str = "color, border, size, width or opacity";

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "color" => Some(MappedProperty::Color),
            "border" => Some(MappedProperty::Border),
            "size" => Some(MappedProperty::Size),
            "width" => Some(MappedProperty::Width),
            "opacity" => Some(MappedProperty::Opacity),
            _ => None,
        }
    }

    pub fn is_color(self) -> bool {
        matches!(self, MappedProperty::Color | MappedProperty::Border)
    }

    /// Values a numeric property may take.
    pub fn range(self) -> (f64, f64) {
        match self {
            MappedProperty::Opacity => (0.0, 1.0),
            _ => (0.0, 1e9),
        }
    }

    fn assign(self, visuals: &mut VisualProperties, value: Mapped) {
        let mapped = match (self, value) {
            (MappedProperty::Color, Mapped::Color(c)) => VisualProperties {
                color: Some(c),
                ..Default::default()
            },
            (MappedProperty::Border, Mapped::Color(c)) => VisualProperties {
                border_color: Some(c),
                ..Default::default()
            },
            (MappedProperty::Size, Mapped::Number(v)) => VisualProperties {
                size: Some(v),
                ..Default::default()
            },
            (MappedProperty::Width, Mapped::Number(v)) => VisualProperties {
                border_width: Some(v),
                ..Default::default()
            },
            (MappedProperty::Opacity, Mapped::Number(v)) => VisualProperties {
                opacity: Some(v),
                ..Default::default()
            },
            _ => return,
        };
        visuals.merge(&mapped);
    }
}

type Rgb = [u8; 3];

/// A named color scale with evenly spaced stops.
#[derive(Debug)]
pub struct ColorScale {
    pub id: &'static str,
    stops: &'static [Rgb],
    /// Stops are picked by rank only, never interpolated.
    pub categorical: bool,
}

const RED: Rgb = [255, 0, 0];
const GREEN: Rgb = [0, 128, 0];
const BLUE: Rgb = [0, 0, 255];
const YELLOW: Rgb = [255, 255, 0];
const CYAN: Rgb = [0, 255, 255];
const WHITE: Rgb = [255, 255, 255];
const BLACK: Rgb = [0, 0, 0];
const DARK_GRAY: Rgb = [0x33, 0x33, 0x33];

pub static COLOR_SCALES: &[ColorScale] = &[
    ColorScale {
        id: "redGreen",
        stops: &[RED, DARK_GRAY, GREEN],
        categorical: false,
    },
    ColorScale {
        id: "CWYR",
        stops: &[CYAN, [0xd5, 0xe9, 0xf0], WHITE, YELLOW, RED],
        categorical: false,
    },
    ColorScale {
        id: "monochrome",
        stops: &[BLACK, WHITE],
        categorical: false,
    },
    ColorScale {
        id: "redYellow",
        stops: &[RED, DARK_GRAY, YELLOW],
        categorical: false,
    },
    ColorScale {
        id: "yellowBlue",
        stops: &[YELLOW, DARK_GRAY, BLUE],
        categorical: false,
    },
    ColorScale {
        id: "categorical",
        stops: &[
            [0x1f, 0x77, 0xb4],
            [0xff, 0x7f, 0x0e],
            [0x2c, 0xa0, 0x2c],
            [0xd6, 0x27, 0x28],
            [0x94, 0x67, 0xbd],
            [0x8c, 0x56, 0x4b],
            [0xe3, 0x77, 0xc2],
            [0x7f, 0x7f, 0x7f],
            [0xbc, 0xbd, 0x22],
            [0x17, 0xbe, 0xcf],
        ],
        categorical: true,
    },
];

pub fn color_scale(id: &str) -> Option<&'static ColorScale> {
    COLOR_SCALES.iter().find(|scale| scale.id == id)
}

fn hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

impl ColorScale {
    /// Color at `t` in [0, 1], interpolated in RGB between neighbouring stops.
    pub fn at(&self, t: f64) -> String {
        let last = self.stops.len() - 1;
        let pos = t.clamp(0.0, 1.0) * last as f64;
        let lower = (pos.floor() as usize).min(last);
        let upper = (lower + 1).min(last);
        let frac = pos - lower as f64;
        let (a, b) = (self.stops[lower], self.stops[upper]);
        let mix = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * frac).round() as u8;
        hex([mix(0), mix(1), mix(2)])
    }

    /// The stop for the `rank`-th category, cycling through the stops.
    pub fn stop(&self, rank: usize) -> String {
        hex(self.stops[rank % self.stops.len()])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyMappingOptions {
    pub dim: Option<usize>,
    pub mapping: Option<MappedProperty>,
    pub color_scale: Option<String>,
    /// Output range `[min, max]` of numeric properties.
    pub number_scale: [Option<f64>; 2],
}

enum Scale {
    Color(&'static ColorScale),
    Number(f64, f64),
}

/// Where an item's value falls on the scale.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Position {
    Ratio(f64),
    Rank(usize),
}

enum Mapped {
    Color(String),
    Number(f64),
}

impl Scale {
    fn pick(&self, position: Position) -> Mapped {
        match (self, position) {
            (Scale::Color(scale), Position::Ratio(t)) => Mapped::Color(scale.at(t)),
            (Scale::Color(scale), Position::Rank(k)) => Mapped::Color(scale.stop(k)),
            (&Scale::Number(lo, hi), Position::Ratio(t)) => {
                Mapped::Number(lo * (1.0 - t) + hi * t)
            }
            (&Scale::Number(lo, hi), Position::Rank(k)) => {
                Mapped::Number(if k % 2 == 0 { lo } else { hi })
            }
        }
    }
}

/// Positions of every item on a numeric dimension. Items without a number
/// get none. A single distinct value maps to 0.
fn ratios(pack: &SubsetPackage, dim: usize) -> Vec<(usize, Option<Position>)> {
    let numbers: Vec<(usize, Option<f64>)> = pack
        .indices()
        .map(|index| (index, pack.value(index, dim).and_then(|v| v.as_f64())))
        .collect();
    let (min, max) = numbers
        .iter()
        .filter_map(|(_, v)| *v)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    numbers
        .into_iter()
        .map(|(index, v)| {
            let t = v.map(|v| if span > 0.0 { (v - min) / span } else { 0.0 });
            (index, t.map(Position::Ratio))
        })
        .collect()
}

/// Rank of each item's value among the distinct values, in row order.
fn ranks(pack: &SubsetPackage, dim: usize) -> Vec<(usize, Option<Position>)> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    pack.indices()
        .map(|index| {
            let key = pack
                .value(index, dim)
                .map(|v| v.to_string())
                .unwrap_or_default();
            let next = seen.len();
            let rank = *seen.entry(key).or_insert(next);
            (index, Some(Position::Rank(rank)))
        })
        .collect()
}

pub struct PropertyMappingNode {
    options: PropertyMappingOptions,
}

impl PropertyMappingNode {
    pub fn new() -> Self {
        Self {
            options: PropertyMappingOptions::default(),
        }
    }

    pub fn with_options(options: PropertyMappingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PropertyMappingOptions {
        &self.options
    }

    fn scale(&self, mapping: MappedProperty) -> Option<Scale> {
        if mapping.is_color() {
            let id = self.options.color_scale.as_deref()?;
            return color_scale(id).map(Scale::Color);
        }
        let [Some(lo), Some(hi)] = self.options.number_scale else {
            return None;
        };
        let (min, max) = mapping.range();
        Some(Scale::Number(lo.clamp(min, max), hi.clamp(min, max)))
    }

    fn apply(&self, pack: &mut SubsetPackage) -> FlowResult<()> {
        let (Some(dim), Some(mapping)) = (self.options.dim, self.options.mapping) else {
            return Ok(());
        };
        let Some(scale) = self.scale(mapping) else {
            return Ok(());
        };
        let Some(dataset) = pack.dataset() else {
            return Ok(());
        };
        dataset.check_dimension(dim)?;
        let numeric = dataset
            .dimension_types()
            .get(dim)
            .is_some_and(|ty| ty.is_numeric());
        let categorical = matches!(&scale, Scale::Color(s) if s.categorical);

        let positions = if numeric && !categorical {
            ratios(pack, dim)
        } else {
            ranks(pack, dim)
        };
        for (index, position) in positions {
            let (Some(position), Some(item)) = (position, pack.get_item_mut(index)) else {
                continue;
            };
            mapping.assign(&mut item.visuals, scale.pick(position));
        }
        Ok(())
    }
}

impl Default for PropertyMappingNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePlugin for PropertyMappingNode {
    fn name(&self) -> &str {
        "Property Mapping"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        let mut out = ctx.subset("in")?.clone();
        self.apply(&mut out)?;
        ctx.set_output("out", out)?;
        Ok(ProcessOutcome::Done)
    }

    // Empty strings unset a setting.
    fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        let cleared = matches!(value, ConfigValue::String(text) if text.is_empty());
        match key {
            "dim" => {
                self.options.dim = if cleared {
                    None
                } else {
                    Some(value.require_usize(key)?)
                }
            }
            "mapping" => {
                self.options.mapping = if cleared {
                    None
                } else {
                    let text = value.require_str(key)?;
                    Some(MappedProperty::parse(text).ok_or_else(|| {
                        FlowError::invalid_choice(key, text, MappedProperty::CHOICES)
                    })?)
                }
            }
            "colorScale" => {
                self.options.color_scale = if cleared {
                    None
                } else {
                    let id = value.require_str(key)?;
                    if color_scale(id).is_none() {
                        let ids: Vec<&str> = COLOR_SCALES.iter().map(|s| s.id).collect();
                        return Err(FlowError::invalid_choice(key, id, &ids.join(", ")));
                    }
                    Some(id.to_string())
                }
            }
            "numberMin" | "numberMax" => {
                let bound = if cleared {
                    None
                } else {
                    Some(value.require_float(key)?)
                };
                let side = usize::from(key == "numberMax");
                self.options.number_scale[side] = bound;
            }
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
