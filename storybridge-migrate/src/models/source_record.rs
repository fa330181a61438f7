//! Source records
//!
//! A source record is an opaque id plus a bag of loosely-typed fields.
//! Field values are a closed variant; anything the record store returns
//! that fits none of the variants reads as `Absent`.

use serde_json::Value;
use std::collections::HashMap;

/// One field value from the record store
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// Field missing, null, or of an unsupported shape
    #[default]
    Absent,
    /// Single line or long text, single select
    Text(String),
    /// Multiple select or linked record ids
    List(Vec<String>),
    /// Number, currency, rating
    Number(f64),
    /// Checkbox
    Bool(bool),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Text(s),
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or_default(),
            Value::Array(items) => {
                let mut strings = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => strings.push(s),
                        // Attachments, collaborators, and other object lists
                        _ => return FieldValue::Absent,
                    }
                }
                FieldValue::List(strings)
            }
            Value::Null | Value::Object(_) => FieldValue::Absent,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(value: Vec<&str>) -> Self {
        FieldValue::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

static ABSENT: FieldValue = FieldValue::Absent;

/// One entity instance read from the record store
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: String,
    pub fields: HashMap<String, FieldValue>,
}

impl SourceRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Field by name; missing fields read as `Absent`
    pub fn field(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&ABSENT)
    }

    /// Build a record from a JSON field object
    pub fn from_json_fields(id: impl Into<String>, fields: serde_json::Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name, FieldValue::from(value)))
                .filter(|(_, value)| !value.is_absent())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_values_map_to_variants() {
        assert_eq!(FieldValue::from(json!("Orange Sky")), FieldValue::Text("Orange Sky".into()));
        assert_eq!(FieldValue::from(json!(true)), FieldValue::Bool(true));
        assert_eq!(FieldValue::from(json!(42)), FieldValue::Number(42.0));
        assert_eq!(
            FieldValue::from(json!(["recA", "recB"])),
            FieldValue::List(vec!["recA".into(), "recB".into()])
        );
        assert_eq!(FieldValue::from(json!(null)), FieldValue::Absent);
    }

    #[test]
    fn test_unsupported_shapes_are_absent() {
        assert_eq!(FieldValue::from(json!({"url": "x"})), FieldValue::Absent);
        assert_eq!(
            FieldValue::from(json!([{"id": "att1", "url": "https://example.com/a.png"}])),
            FieldValue::Absent
        );
    }

    #[test]
    fn test_missing_field_reads_absent() {
        let record = SourceRecord::new("rec1").with("Name", "Orange Sky");
        assert_eq!(record.field("Name"), &FieldValue::Text("Orange Sky".into()));
        assert!(record.field("Website").is_absent());
    }

    #[test]
    fn test_from_json_fields_drops_absent_values() {
        let fields = json!({"Name": "Orange Sky", "Logo": [{"id": "att1"}], "Active": false});
        let record = SourceRecord::from_json_fields("rec1", fields.as_object().unwrap().clone());

        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.field("Active"), &FieldValue::Bool(false));
    }
}
