//! Node type enumeration for dynamic node creation.
//!
//! The serialized names are the type ids stored in diagram files. Legacy ids
//! from older diagrams are accepted as aliases.

use serde::{Deserialize, Serialize};

/// Types of nodes that can be instantiated from the editor or a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    // Sources
    #[serde(alias = "datasrc")]
    DataSource,
    ValueMaker,

    // Set operators
    Union,
    Intersect,
    Minus,

    // Filters
    #[serde(rename = "range")]
    RangeFilter,
    #[serde(rename = "value", alias = "contain")]
    ValueFilter,
    #[serde(alias = "bandLimiter")]
    Sampler,

    // Transforms
    PropertyEditor,
    PropertyMapping,
    ValueExtractor,
    Identity,

    // Visualizations
    Table,
    Scatterplot,
    ParallelCoordinates,
    Histogram,
    LineChart,
    Heatmap,
    Network,
    Map,
}

impl NodeType {
    /// Get the display name for this node type.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::DataSource => "Data Source",
            NodeType::ValueMaker => "Value Maker",
            NodeType::Union => "Union",
            NodeType::Intersect => "Intersect",
            NodeType::Minus => "Minus",
            NodeType::RangeFilter => "Range Filter",
            NodeType::ValueFilter => "Value Filter",
            NodeType::Sampler => "Sampler",
            NodeType::PropertyEditor => "Property Editor",
            NodeType::PropertyMapping => "Property Mapping",
            NodeType::ValueExtractor => "Value Extractor",
            NodeType::Identity => "Identity",
            NodeType::Table => "Table",
            NodeType::Scatterplot => "Scatterplot",
            NodeType::ParallelCoordinates => "Parallel Coordinates",
            NodeType::Histogram => "Histogram",
            NodeType::LineChart => "Line Chart",
            NodeType::Heatmap => "Heatmap",
            NodeType::Network => "Network",
            NodeType::Map => "Map",
        }
    }

    /// Get all available node types.
    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::DataSource,
            NodeType::ValueMaker,
            NodeType::Union,
            NodeType::Intersect,
            NodeType::Minus,
            NodeType::RangeFilter,
            NodeType::ValueFilter,
            NodeType::Sampler,
            NodeType::PropertyEditor,
            NodeType::PropertyMapping,
            NodeType::ValueExtractor,
            NodeType::Identity,
            NodeType::Table,
            NodeType::Scatterplot,
            NodeType::ParallelCoordinates,
            NodeType::Histogram,
            NodeType::LineChart,
            NodeType::Heatmap,
            NodeType::Network,
            NodeType::Map,
        ]
    }

    /// Nodes that produce data without inputs.
    pub fn is_source(&self) -> bool {
        matches!(self, NodeType::DataSource | NodeType::ValueMaker)
    }

    pub fn is_set_operator(&self) -> bool {
        matches!(self, NodeType::Union | NodeType::Intersect | NodeType::Minus)
    }

    pub fn is_filter(&self) -> bool {
        matches!(
            self,
            NodeType::RangeFilter | NodeType::ValueFilter | NodeType::Sampler
        )
    }

    pub fn is_visualization(&self) -> bool {
        matches!(
            self,
            NodeType::Table
                | NodeType::Scatterplot
                | NodeType::ParallelCoordinates
                | NodeType::Histogram
                | NodeType::LineChart
                | NodeType::Heatmap
                | NodeType::Network
                | NodeType::Map
        )
    }

    /// Get a detailed description of what this node does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeType::DataSource => "Loads a dataset and emits all of its rows.",
            NodeType::ValueMaker => "Emits constants typed in by the user.",
            NodeType::Union => {
                "Rows present in any input.\n\
                 Visual properties merge in connection order."
            }
            NodeType::Intersect => "Rows present in every input that has a dataset.",
            NodeType::Minus => "Rows of the first input absent from all others.",
            NodeType::RangeFilter => {
                "Keeps rows whose value on one dimension lies in [min, max].\n\
                 Bounds come from constant ports or typed-in values."
            }
            NodeType::ValueFilter => {
                "Keeps rows whose value on one dimension matches any given value.\n\
                 Supports substring and case-insensitive matching."
            }
            NodeType::Sampler => {
                "Keeps the first or last N values of one dimension,\n\
                 optionally per group."
            }
            NodeType::PropertyEditor => "Assigns visual properties to every row.",
            NodeType::PropertyMapping => {
                "Derives a color, size, width or opacity of each row\n\
                 from its value on one dimension."
            }
            NodeType::ValueExtractor => "Emits the distinct values of one dimension as constants.",
            NodeType::Identity => "Passes its input through unchanged.",
            _ => {
                "Renders its input and forwards it.\n\
                 Selected rows are emitted on the selection port."
            }
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_ids() {
        assert_eq!(
            serde_json::to_string(&NodeType::RangeFilter).unwrap(),
            "\"range\""
        );
        assert_eq!(
            serde_json::to_string(&NodeType::DataSource).unwrap(),
            "\"dataSource\""
        );
        assert_eq!(
            serde_json::to_string(&NodeType::ParallelCoordinates).unwrap(),
            "\"parallelCoordinates\""
        );
        assert_eq!(
            serde_json::to_string(&NodeType::PropertyMapping).unwrap(),
            "\"propertyMapping\""
        );
    }

    #[test]
    fn test_legacy_aliases() {
        let parsed: NodeType = serde_json::from_str("\"bandLimiter\"").unwrap();
        assert_eq!(parsed, NodeType::Sampler);
        let parsed: NodeType = serde_json::from_str("\"contain\"").unwrap();
        assert_eq!(parsed, NodeType::ValueFilter);
        let parsed: NodeType = serde_json::from_str("\"datasrc\"").unwrap();
        assert_eq!(parsed, NodeType::DataSource);
    }

    #[test]
    fn test_categories_are_disjoint() {
        for ty in NodeType::all() {
            let categories = [
                ty.is_source(),
                ty.is_set_operator(),
                ty.is_filter(),
                ty.is_visualization(),
            ];
            assert!(categories.iter().filter(|c| **c).count() <= 1, "{:?}", ty);
        }
    }
}
