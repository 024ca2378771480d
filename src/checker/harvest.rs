// src/checker/harvest.rs
// =============================================================================
// The link harvester turns (documents, candidate fields) into the ordered
// list of occurrences to check.
//
// Enumeration order is fixed:
//   1. documents in the order the store returned them
//   2. fields in candidate-set order
//   3. URLs in the order they appear inside the value (array elements in
//      element order)
//
// The harvester is a plain iterator over borrowed inputs. Calling `harvest`
// again over the same inputs starts a fresh, identical walk, which is what
// lets the audit count in one pass and report "k of total" in the next.
// =============================================================================

use super::extract::urls_in_value;
use super::sniff::CandidateFieldSet;
use crate::store::{Document, FieldValue};

/// One (document, field, URL) unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOccurrence {
    pub document_id: String,
    pub field: String,
    pub url: String,
}

/// Lazily enumerates every link occurrence in `documents`.
pub fn harvest<'a>(
    documents: &'a [Document],
    fields: &'a CandidateFieldSet,
) -> impl Iterator<Item = LinkOccurrence> + 'a {
    documents.iter().flat_map(move |document| {
        fields.iter().flat_map(move |field| {
            urls_in_field(document.get(field))
                .into_iter()
                .map(move |url| LinkOccurrence {
                    document_id: document.id.clone(),
                    field: field.to_string(),
                    url,
                })
        })
    })
}

/// Counts occurrences without materializing them; the first audit pass.
pub fn count_links(documents: &[Document], fields: &CandidateFieldSet) -> usize {
    documents
        .iter()
        .map(|document| {
            fields
                .iter()
                .map(|field| urls_in_field(document.get(field)).len())
                .sum::<usize>()
        })
        .sum()
}

// All URLs of one field value, with the bare-link fallback applied per text
fn urls_in_field(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::Absent => Vec::new(),
        FieldValue::Text(text) => urls_in_value(text),
        FieldValue::TextSequence(items) => items
            .iter()
            .flat_map(|item| urls_in_value(item))
            .collect(),
    }
}
