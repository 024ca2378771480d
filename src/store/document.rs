// src/store/document.rs
// =============================================================================
// The document model the audit core works on.
//
// A document is an opaque id plus a mapping of field name -> value. Documents
// come from stores whose shape is not known in advance, so a value is kept
// as a small tagged enum instead of a dynamic JSON value:
//
//   Absent            the field is missing or holds something that isn't text
//   Text(s)           a single string
//   TextSequence(v)   an ordered list of strings
//
// The sniffer and the harvester switch on this tag explicitly.
// =============================================================================

use serde_json::Value;
use std::collections::BTreeMap;

/// The value held by one field of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Absent,
    Text(String),
    TextSequence(Vec<String>),
}

// Returned by `Document::get` for missing fields
static ABSENT: FieldValue = FieldValue::Absent;

impl FieldValue {
    /// Maps a JSON value onto the three shapes the audit understands.
    ///
    /// Strings become `Text`, arrays keep their string elements in order,
    /// everything else (numbers, objects, null, ...) is `Absent`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Array(items) => FieldValue::TextSequence(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => FieldValue::Absent,
        }
    }
}

/// One read-only document: an id and its fields.
///
/// Fields live in a `BTreeMap` so iteration is always in name order; the
/// sniffer relies on that to produce the same field set for the same sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Returns the value of `name`, or `Absent` if the field is missing.
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&ABSENT)
    }

    /// Iterates over (field name, value) pairs in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Builds a document from a JSON object.
    ///
    /// The id comes from `_id` (plain or `{"$oid": ...}`), then `id`, then
    /// the `fallback_id` supplied by the caller. Returns None if `value`
    /// is not an object.
    pub fn from_json(value: &Value, fallback_id: String) -> Option<Self> {
        let object = value.as_object()?;

        let id = object
            .get("_id")
            .or_else(|| object.get("id"))
            .and_then(render_id)
            .unwrap_or(fallback_id);

        let mut document = Self::new(id);
        for (name, value) in object {
            document
                .fields
                .insert(name.clone(), FieldValue::from_json(value));
        }
        Some(document)
    }
}

// Turns an id value into display text
fn render_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map
            .get("$oid")
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
