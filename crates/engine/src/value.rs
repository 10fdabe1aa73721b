//! Row values
//!
//! A row is an id plus a map of field values keyed by column key. Values come
//! from a small closed set of variants; columns declare which variant they
//! expect and rows are checked once when they enter the grid, not on every
//! lookup.

use std::collections::BTreeMap;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

// =============================================================================
// CellValue
// =============================================================================

/// A single field value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CellValue {
    #[default]
    Null,
    Text(String),
    Number(OrderedFloat<f64>),
    Bool(bool),
    /// String list (tags)
    List(Vec<String>),
}

/// Shared null returned for absent fields.
static NULL: CellValue = CellValue::Null;

/// The variant of a [`CellValue`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Text,
    Number,
    Bool,
    List,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Bool => "boolean",
            ValueKind::List => "list",
        }
    }
}

impl CellValue {
    pub fn number(n: f64) -> Self {
        CellValue::Number(OrderedFloat(n))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            CellValue::Null => ValueKind::Null,
            CellValue::Text(_) => ValueKind::Text,
            CellValue::Number(_) => ValueKind::Number,
            CellValue::Bool(_) => ValueKind::Bool,
            CellValue::List(_) => ValueKind::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Null, empty string, or empty list
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::List(items) => items.is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(n.0),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            CellValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric coercion: numbers, numeric text, booleans as 0/1.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(n.0),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
                }
            }
            CellValue::Null | CellValue::List(_) => None,
        }
    }

    /// Convert a JSON value, flattening anything outside the closed variant set
    /// to text.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => CellValue::Null,
            Json::Bool(b) => CellValue::Bool(b),
            Json::Number(n) => match n.as_f64() {
                Some(f) => CellValue::number(f),
                None => CellValue::Text(n.to_string()),
            },
            Json::String(s) => CellValue::Text(s),
            Json::Array(items) => CellValue::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        Json::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Json::Object(_) => CellValue::Text(value.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            CellValue::Null => Json::Null,
            CellValue::Text(s) => Json::String(s.clone()),
            CellValue::Number(n) => serde_json::Number::from_f64(n.0)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            CellValue::Bool(b) => Json::Bool(*b),
            CellValue::List(items) => {
                Json::Array(items.iter().cloned().map(Json::String).collect())
            }
        }
    }
}

/// Format a number the way a user typed it: integers without a trailing ".0".
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// String coercion. Lists join with ",", null is empty.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => f.write_str(&format_number(n.0)),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<Vec<String>> for CellValue {
    fn from(items: Vec<String>) -> Self {
        CellValue::List(items)
    }
}

impl From<Vec<&str>> for CellValue {
    fn from(items: Vec<&str>) -> Self {
        CellValue::List(items.into_iter().map(str::to_string).collect())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(CellValue::from_json(value))
    }
}

// =============================================================================
// Row
// =============================================================================

/// An opaque record with a unique id. Fields are looked up by column key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    id: String,
    fields: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Raw lookup. `None` means the field is absent.
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.get(key)
    }

    /// Lookup where an absent field reads as null.
    pub fn value(&self, key: &str) -> &CellValue {
        self.fields.get(key).unwrap_or(&NULL)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (key, value) in &self.fields {
            if key != "id" {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let id = match map.remove("id") {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(de::Error::custom(format!("row id must be a string or number, got {}", other)))
            }
            None => return Err(de::Error::missing_field("id")),
        };
        let fields = map
            .into_iter()
            .map(|(k, v)| (k, CellValue::from_json(v)))
            .collect();
        Ok(Row { id, fields })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_field_reads_as_null() {
        let row = Row::new("1").with("name", "Ann");
        assert!(row.get("missing").is_none());
        assert_eq!(row.value("missing"), &CellValue::Null);
        assert_eq!(row.value("name"), &CellValue::from("Ann"));
    }

    #[test]
    fn test_blank_values() {
        assert!(CellValue::Null.is_blank());
        assert!(CellValue::from("").is_blank());
        assert!(CellValue::List(vec![]).is_blank());
        assert!(!CellValue::from(0.0).is_blank());
        assert!(!CellValue::Bool(false).is_blank());
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(CellValue::from(" 42 ").coerce_number(), Some(42.0));
        assert_eq!(CellValue::from("abc").coerce_number(), None);
        assert_eq!(CellValue::from("").coerce_number(), None);
        assert_eq!(CellValue::Bool(true).coerce_number(), Some(1.0));
        assert_eq!(CellValue::Null.coerce_number(), None);
    }

    #[test]
    fn test_display_coercion() {
        assert_eq!(CellValue::from(3.0).to_string(), "3");
        assert_eq!(CellValue::from(2.5).to_string(), "2.5");
        assert_eq!(CellValue::from(vec!["a", "b"]).to_string(), "a,b");
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_row_json_roundtrip() {
        let json = r#"{"id":7,"name":"Bob","active":true,"score":1.5,"tags":["x","y"],"note":null}"#;
        let row: Row = serde_json::from_str(json).unwrap();
        assert_eq!(row.id(), "7");
        assert_eq!(row.value("active"), &CellValue::Bool(true));
        assert_eq!(row.value("tags"), &CellValue::from(vec!["x", "y"]));
        assert_eq!(row.get("note"), Some(&CellValue::Null));

        let back = serde_json::to_string(&row).unwrap();
        let again: Row = serde_json::from_str(&back).unwrap();
        assert_eq!(row, again);
    }

    #[test]
    fn test_row_without_id_is_rejected() {
        let result: Result<Row, _> = serde_json::from_str(r#"{"name":"x"}"#);
        assert!(result.is_err());
    }
}
