// src/checker/mod.rs
// =============================================================================
// This module contains the link discovery and validation engine.
//
// Submodules:
// - extract: Pulls URLs out of arbitrary text values
// - sniff: Guesses which document fields hold links, from a sample
// - harvest: Enumerates (document, field, url) occurrences in a fixed order
// - validity: Decides whether a single URL is broken
// - http: The reqwest transport the validity checker fetches through
//
// This file (mod.rs) is the module root - it re-exports the public API so the
// rest of the application can write `checker::harvest()` and friends.
// =============================================================================

mod extract;
mod harvest;
mod http;
mod sniff;
mod validity;

pub use harvest::{count_links, harvest};
pub use http::{HttpFetcher, HttpSettings};
pub use sniff::{sniff_fields, CandidateFieldSet};
pub use validity::ValidityChecker;

#[cfg(test)]
pub use validity::{scripted::ScriptedFetcher, FetchError, FetchMethod};
