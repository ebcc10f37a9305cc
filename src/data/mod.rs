//! Data model for the dataflow engine.
//!
//! - [`TabularDataset`]: immutable rows/columns parsed from CSV or JSON text.
//! - [`SubsetPackage`]: a subset of a dataset's rows with per-row visual properties.
//! - [`Constants`]: a typed, deduplicated list of scalar values.
//! - [`Package`]: what a port holds: either of the two above.
//! - [`SubsetSelection`]: a visualization's selected row indices.

pub mod constants;
pub mod dataset;
pub mod error;
pub mod package;
pub mod selection;
pub mod subset;
pub mod value;

pub use constants::{ConstantType, Constants};
pub use dataset::TabularDataset;
pub use error::{DataError, DataResult};
pub use package::{Package, PackageKind};
pub use selection::SubsetSelection;
pub use subset::{SubsetItem, SubsetPackage, VisualProperties};
pub use value::{DimensionType, Value};
