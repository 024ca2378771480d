// src/audit/mod.rs
// =============================================================================
// This module runs an audit over one document set.
//
// Submodules:
// - session: The state machine that sniffs, counts, checks and summarizes
// - report: The event sinks (terminal, JSON, NDJSON) and the summary types
// =============================================================================

mod report;
mod session;

pub use report::{ConsoleReporter, JsonReporter, NdjsonReporter, Reporter};
pub use session::{detect_fields, AuditSession, SessionSettings};
