//! Constants packages: typed lists of scalar values used as filter parameters.

use crate::data::value::Value;
use std::collections::HashSet;
use std::fmt;

/// Element type of a constants package, ordered by grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ConstantType {
    #[default]
    Empty,
    Int,
    Float,
    String,
}

/// Deduplicated list of constant values sharing one type.
///
/// Adding a value of a higher grade converts the existing elements, so an
/// `int` list becomes `float` on the first decimal and `string` on the first
/// non-number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constants {
    constant_type: ConstantType,
    elements: Vec<Value>,
    keys: HashSet<String>,
}

fn parse_element(text: &str) -> (ConstantType, Value) {
    if text.is_empty() {
        return (ConstantType::Empty, Value::Empty);
    }
    match Value::check_token(text).1 {
        Value::Int(v) => (ConstantType::Int, Value::Int(v)),
        Value::Float(v) => (ConstantType::Float, Value::Float(v)),
        _ => (ConstantType::String, Value::String(text.to_string())),
    }
}

fn convert(value: &Value, to: ConstantType) -> Value {
    match (to, value) {
        (ConstantType::Float, Value::Int(v)) => Value::Float(*v as f64),
        (ConstantType::String, Value::String(_)) => value.clone(),
        (ConstantType::String, other) => Value::String(other.to_string()),
        _ => value.clone(),
    }
}

impl Constants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list separated by `,` or `;`. Whitespace around elements is
    /// dropped, as are empty elements and duplicates.
    pub fn parse(text: &str) -> Self {
        let mut constants = Self::new();
        for element in text.split([',', ';']) {
            constants.add(element.trim());
        }
        constants
    }

    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut constants = Self::new();
        for value in values {
            constants.add_value(value);
        }
        constants
    }

    /// Add one textual element.
    pub fn add(&mut self, text: &str) {
        let (ty, value) = parse_element(text);
        if ty == ConstantType::Empty {
            return;
        }
        self.insert(ty, value);
    }

    /// Add an already-typed value. Time values are stored as their text form.
    pub fn add_value(&mut self, value: &Value) {
        match value {
            Value::Empty => {}
            Value::Int(v) => self.insert(ConstantType::Int, Value::Int(*v)),
            Value::Float(v) => self.insert(ConstantType::Float, Value::Float(*v)),
            Value::Time(_) | Value::String(_) => {
                self.insert(ConstantType::String, Value::String(value.to_string()))
            }
        }
    }

    fn insert(&mut self, ty: ConstantType, value: Value) {
        let grade = self.constant_type.max(ty);
        if grade > self.constant_type {
            self.elements = self.elements.iter().map(|e| convert(e, grade)).collect();
            self.keys = self.elements.iter().map(|e| e.to_string()).collect();
            self.constant_type = grade;
        }
        let value = convert(&value, grade);
        if self.keys.insert(value.to_string()) {
            self.elements.push(value);
        }
    }

    pub fn constant_type(&self) -> ConstantType {
        self.constant_type
    }

    /// Whether the two packages can be used together as a filter range.
    ///
    /// Empty constants are compatible with anything; a string list is only
    /// compatible with another string list.
    pub fn compatible(&self, other: &Constants) -> bool {
        if self.constant_type == ConstantType::Empty || other.constant_type == ConstantType::Empty {
            return true;
        }
        (self.constant_type == ConstantType::String) == (other.constant_type == ConstantType::String)
    }

    pub fn get_one(&self) -> Option<&Value> {
        self.elements.first()
    }

    pub fn get_all(&self) -> &[Value] {
        &self.elements
    }

    pub fn count(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.keys.contains(&value.to_string())
    }

    pub fn stringify(&self) -> String {
        self.elements
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for Constants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_and_dedups() {
        let c = Constants::parse("1, 2;; 2 ,3");
        assert_eq!(c.constant_type(), ConstantType::Int);
        assert_eq!(c.get_all(), &[Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(c.stringify(), "1, 2, 3");
    }

    #[test]
    fn test_promotion_converts_existing_elements() {
        let mut c = Constants::parse("1,2");
        c.add("2.5");
        assert_eq!(c.constant_type(), ConstantType::Float);
        assert_eq!(c.get_one(), Some(&Value::Float(1.0)));

        c.add("abc");
        assert_eq!(c.constant_type(), ConstantType::String);
        assert_eq!(c.get_one(), Some(&Value::String("1".into())));
        assert_eq!(c.count(), 4);
    }

    #[test]
    fn test_empty_elements_ignored() {
        let c = Constants::parse(" , ;");
        assert!(c.is_empty());
        assert_eq!(c.constant_type(), ConstantType::Empty);
    }

    #[test]
    fn test_compatibility() {
        let empty = Constants::new();
        let ints = Constants::parse("1");
        let floats = Constants::parse("1.5");
        let strings = Constants::parse("a");
        assert!(empty.compatible(&strings));
        assert!(ints.compatible(&floats));
        assert!(!ints.compatible(&strings));
        assert!(strings.compatible(&Constants::parse("b")));
    }
}
