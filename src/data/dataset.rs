//! Tabular datasets.
//!
//! A [`TabularDataset`] is immutable once parsed and is shared between packages
//! through `Arc`. Two identities are derived from it:
//! - `data_id`: SHA-256 of the raw text; packages over the same rows share it.
//! - `format_id`: SHA-256 of the comma-joined dimension names; datasets with the
//!   same columns share it.

use crate::data::error::{DataError, DataResult};
use crate::data::value::{DimensionType, Value};
use sha2::{Digest, Sha256};

/// Rows and typed columns parsed from CSV or JSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    name: String,
    data_id: String,
    format_id: String,
    dimensions: Vec<String>,
    dimension_types: Vec<DimensionType>,
    rows: Vec<Vec<Value>>,
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn json_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl TabularDataset {
    /// Build a dataset from raw string cells, inferring each column's type.
    ///
    /// A column takes the highest token grade among its cells; a column with any
    /// empty cell is read as string.
    pub fn from_raw(
        name: impl Into<String>,
        data_id: impl Into<String>,
        dimensions: Vec<String>,
        raw_rows: Vec<Vec<String>>,
    ) -> DataResult<Self> {
        let name = name.into();
        if dimensions.is_empty() {
            return Err(DataError::EmptyInput(name));
        }
        for (row, cells) in raw_rows.iter().enumerate() {
            if cells.len() != dimensions.len() {
                return Err(DataError::Parse {
                    row: row + 1,
                    message: format!(
                        "expected {} cells, found {}",
                        dimensions.len(),
                        cells.len()
                    ),
                });
            }
        }

        let dimension_types: Vec<DimensionType> = (0..dimensions.len())
            .map(|dim| {
                let mut grade = DimensionType::Empty;
                let mut has_empty = false;
                for cells in &raw_rows {
                    let (ty, _) = Value::check_token(&cells[dim]);
                    has_empty |= ty == DimensionType::Empty;
                    grade = grade.max(ty);
                }
                if has_empty || grade == DimensionType::Empty {
                    DimensionType::String
                } else {
                    grade
                }
            })
            .collect();

        let rows = raw_rows
            .iter()
            .map(|cells| {
                cells
                    .iter()
                    .zip(&dimension_types)
                    .map(|(cell, ty)| Value::tokenize(cell, *ty))
                    .collect()
            })
            .collect();

        let format_id = sha256_hex(&dimensions.join(","));
        Ok(Self {
            name,
            data_id: data_id.into(),
            format_id,
            dimensions,
            dimension_types,
            rows,
        })
    }

    /// Parse CSV text whose first record holds the dimension names.
    pub fn parse_csv(name: &str, text: &str) -> DataResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let dimensions: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let mut raw_rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            raw_rows.push(record.iter().map(String::from).collect());
        }

        Self::from_raw(name, sha256_hex(text), dimensions, raw_rows)
    }

    /// Parse JSON text.
    ///
    /// Accepts either `{"dimensions": [...], "values": [[...], ...]}` or an array
    /// of flat objects (dimensions are the union of keys).
    pub fn parse_json(name: &str, text: &str) -> DataResult<Self> {
        let parsed: serde_json::Value = serde_json::from_str(text)?;
        let data_id = sha256_hex(text);

        match parsed {
            serde_json::Value::Object(map) => {
                let dimensions: Vec<String> = match map.get("dimensions") {
                    Some(serde_json::Value::Array(dims)) => dims.iter().map(json_cell).collect(),
                    _ => {
                        return Err(DataError::UnsupportedFormat(
                            "JSON object without a dimensions array".to_string(),
                        ))
                    }
                };
                let raw_rows = match map.get("values") {
                    Some(serde_json::Value::Array(rows)) => rows
                        .iter()
                        .map(|row| match row {
                            serde_json::Value::Array(cells) => cells.iter().map(json_cell).collect(),
                            other => vec![json_cell(other)],
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                Self::from_raw(name, data_id, dimensions, raw_rows)
            }
            serde_json::Value::Array(records) => {
                let mut dimensions: Vec<String> = Vec::new();
                for record in &records {
                    let serde_json::Value::Object(fields) = record else {
                        return Err(DataError::UnsupportedFormat(
                            "JSON array entries must be objects".to_string(),
                        ));
                    };
                    for key in fields.keys() {
                        if !dimensions.contains(key) {
                            dimensions.push(key.clone());
                        }
                    }
                }
                let raw_rows = records
                    .iter()
                    .map(|record| {
                        dimensions
                            .iter()
                            .map(|dim| record.get(dim).map(json_cell).unwrap_or_default())
                            .collect()
                    })
                    .collect();
                Self::from_raw(name, data_id, dimensions, raw_rows)
            }
            _ => Err(DataError::UnsupportedFormat(
                "expected a JSON object or array".to_string(),
            )),
        }
    }

    /// Parse by file name extension, falling back to sniffing the first character.
    pub fn parse(name: &str, text: &str) -> DataResult<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".json") {
            return Self::parse_json(name, text);
        }
        if lower.ends_with(".csv") {
            return Self::parse_csv(name, text);
        }
        match text.trim_start().chars().next() {
            Some('[') | Some('{') => Self::parse_json(name, text),
            Some(_) => Self::parse_csv(name, text),
            None => Err(DataError::EmptyInput(name.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_id(&self) -> &str {
        &self.data_id
    }

    pub fn format_id(&self) -> &str {
        &self.format_id
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn dimension_types(&self) -> &[DimensionType] {
        &self.dimension_types
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d == name)
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn value(&self, index: usize, dim: usize) -> Option<&Value> {
        self.rows.get(index).and_then(|row| row.get(dim))
    }

    /// Error unless `dim` names a column of this dataset.
    pub fn check_dimension(&self, dim: usize) -> DataResult<()> {
        if dim < self.dimensions.len() {
            Ok(())
        } else {
            Err(DataError::DimensionOutOfRange {
                dim,
                dims: self.dimensions.len(),
            })
        }
    }

    /// True when both datasets have the same columns.
    pub fn matches_format(&self, other: &TabularDataset) -> bool {
        self.format_id == other.format_id
    }

    /// True when both datasets hold the same rows.
    pub fn same_data(&self, other: &TabularDataset) -> bool {
        self.data_id == other.data_id
    }
}
