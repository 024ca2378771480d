// src/checker/sniff.rs
// =============================================================================
// Field sniffing: guess which fields hold links by looking at a sample.
//
// A field is a candidate as soon as any sampled document has, in that field,
// a string (or an array element that is a string) containing "http://" or
// "https://". Once in, a field stays in. This is deliberately coarser than
// URL extraction: it may pick a field that ends up yielding no URLs, but it
// never misses one that holds a bare link.
// =============================================================================

use super::extract::contains_link;
use crate::store::{Document, FieldValue};
use serde::{Deserialize, Serialize};

/// The set of field names that may hold links.
///
/// Kept in first-seen order so that both audit passes walk the fields in
/// the same order. Membership is what matters; duplicates are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateFieldSet {
    names: Vec<String>,
}

impl CandidateFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` if it isn't already a member.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for CandidateFieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

/// Proposes the fields of `sample` that are likely to contain URLs.
pub fn sniff_fields(sample: &[Document]) -> CandidateFieldSet {
    let mut fields = CandidateFieldSet::new();

    for document in sample {
        for (name, value) in document.fields() {
            if !fields.contains(name) && holds_link(value) {
                fields.insert(name);
            }
        }
    }

    fields
}

// Plain text with a link substring, or a sequence with at least one such element
fn holds_link(value: &FieldValue) -> bool {
    match value {
        FieldValue::Absent => false,
        FieldValue::Text(text) => contains_link(text),
        FieldValue::TextSequence(items) => items.iter().any(|item| contains_link(item)),
    }
}
