// src/audit/report.rs
// =============================================================================
// Where audit events go.
//
// A session emits events in this order:
//   fields_detected -> total_counted -> (progress | broken_link)* -> finished
// or, when sniffing finds nothing:
//   no_links_found -> finished
//
// Progress and broken links are two different channels:
// - progress is ephemeral; each update replaces the previous one
// - a broken link is a permanent record, written the moment it is found
//
// ConsoleReporter draws progress as an in-place indicatif bar and writes
// broken links as lines of their own. When the bar is hidden (output is not a
// terminal) the lines are still written; only the bar disappears.
// JsonReporter stays quiet and prints the summary as JSON at the end.
// NdjsonReporter streams one JSON object per permanent event, for scripts
// that want broken links as they are found.
// =============================================================================

use crate::checker::CandidateFieldSet;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use tracing::error;

/// Where a reporter writes its permanent output.
pub type Output = Box<dyn Write + Send>;

/// One broken link, as reported during the checking pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLink {
    pub document_id: String,
    pub field: String,
    pub url: String,
    /// 1-based position in the canonical enumeration
    pub index: usize,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Final result of an audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub fields: CandidateFieldSet,
    pub documents_processed: usize,
    pub total_links: usize,
    pub broken_count: usize,
    pub broken_links: Vec<BrokenLink>,
}

/// Receives the events of an audit session.
pub trait Reporter {
    fn fields_detected(&mut self, fields: &CandidateFieldSet);
    fn total_counted(&mut self, total: usize);
    fn progress(&mut self, index: usize, total: usize);
    fn broken_link(&mut self, record: &BrokenLink);
    fn no_links_found(&mut self);
    fn finished(&mut self, summary: &AuditSummary);
}

// Reporters never abort an audit over a failed write
fn log_write_error(result: io::Result<()>) {
    if let Err(e) = result {
        error!(error = %e, "failed to write audit output");
    }
}

/// Human-readable terminal output.
pub struct ConsoleReporter {
    out: Output,
    draw_target: fn() -> ProgressDrawTarget,
    bar: Option<ProgressBar>,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    /// Lines to stdout, progress bar on stderr.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()), ProgressDrawTarget::stderr)
    }

    pub fn with_output(out: Output, draw_target: fn() -> ProgressDrawTarget) -> Self {
        Self {
            out,
            draw_target,
            bar: None,
        }
    }

    // Writes one permanent line; a visible bar is cleared around the write
    fn line(&mut self, message: &str) {
        let out = &mut self.out;
        let result = match &self.bar {
            Some(bar) if !bar.is_hidden() => bar.suspend(|| writeln!(out, "{}", message)),
            _ => writeln!(out, "{}", message),
        };
        log_write_error(result);
    }
}

impl Reporter for ConsoleReporter {
    fn fields_detected(&mut self, fields: &CandidateFieldSet) {
        let names: Vec<&str> = fields.iter().collect();
        self.line(&format!(
            "🔎 {} link field(s) detected: {}",
            fields.len(),
            names.join(", ")
        ));
    }

    fn total_counted(&mut self, total: usize) {
        self.line(&format!("🌐 Checking {} link(s)...\n", total));
        if total == 0 {
            return;
        }

        let bar = ProgressBar::with_draw_target(Some(total as u64), (self.draw_target)());
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} links checked")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        self.bar = Some(bar);
    }

    fn progress(&mut self, index: usize, _total: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(index as u64);
        }
    }

    fn broken_link(&mut self, record: &BrokenLink) {
        if let Some(bar) = &self.bar {
            bar.set_position(record.index as u64);
        }
        self.line(&format_broken(record));
    }

    fn no_links_found(&mut self) {
        self.line("⚠️  No link fields found in the sampled documents");
    }

    fn finished(&mut self, summary: &AuditSummary) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        log_write_error(write_table(&mut self.out, summary));
    }
}

/// Machine-readable output: the summary as pretty JSON at the end.
pub struct JsonReporter {
    out: Output,
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(out: Output) -> Self {
        Self { out }
    }
}

impl Reporter for JsonReporter {
    fn fields_detected(&mut self, _fields: &CandidateFieldSet) {}

    fn total_counted(&mut self, _total: usize) {}

    fn progress(&mut self, _index: usize, _total: usize) {}

    fn broken_link(&mut self, _record: &BrokenLink) {}

    fn no_links_found(&mut self) {}

    fn finished(&mut self, summary: &AuditSummary) {
        match serde_json::to_string_pretty(summary) {
            Ok(json) => log_write_error(writeln!(self.out, "{}", json)),
            Err(e) => error!(error = %e, "failed to serialize audit summary"),
        }
    }
}

/// One line of NDJSON output.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum StreamEvent<'a> {
    FieldsDetected { fields: &'a CandidateFieldSet },
    TotalCounted { total: usize },
    BrokenLink(&'a BrokenLink),
    NoLinksFound,
    Summary(&'a AuditSummary),
}

/// Streams permanent events as newline-delimited JSON.
///
/// Progress is ephemeral and never written.
pub struct NdjsonReporter {
    out: Output,
}

impl Default for NdjsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl NdjsonReporter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(out: Output) -> Self {
        Self { out }
    }

    fn emit(&mut self, event: StreamEvent<'_>) {
        match serde_json::to_string(&event) {
            // Flushed per line so consumers see each event as it happens
            Ok(json) => log_write_error(
                writeln!(self.out, "{}", json).and_then(|_| self.out.flush()),
            ),
            Err(e) => error!(error = %e, "failed to serialize audit event"),
        }
    }
}

impl Reporter for NdjsonReporter {
    fn fields_detected(&mut self, fields: &CandidateFieldSet) {
        self.emit(StreamEvent::FieldsDetected { fields });
    }

    fn total_counted(&mut self, total: usize) {
        self.emit(StreamEvent::TotalCounted { total });
    }

    fn progress(&mut self, _index: usize, _total: usize) {}

    fn broken_link(&mut self, record: &BrokenLink) {
        self.emit(StreamEvent::BrokenLink(record));
    }

    fn no_links_found(&mut self) {
        self.emit(StreamEvent::NoLinksFound);
    }

    fn finished(&mut self, summary: &AuditSummary) {
        self.emit(StreamEvent::Summary(summary));
    }
}

fn format_broken(record: &BrokenLink) -> String {
    format!(
        "❌ [{}/{}] {} · {} · {}{}",
        record.index,
        record.total,
        record.document_id,
        record.field,
        record.url,
        record
            .reason
            .as_deref()
            .map(|r| format!(" ({})", r))
            .unwrap_or_default()
    )
}

// Writes the summary as a table
fn write_table(out: &mut dyn Write, summary: &AuditSummary) -> io::Result<()> {
    if !summary.broken_links.is_empty() {
        writeln!(out)?;
        writeln!(out, "{:<24} {:<16} {:<60}", "DOCUMENT", "FIELD", "URL")?;
        writeln!(out, "{}", "=".repeat(100))?;

        for record in &summary.broken_links {
            writeln!(
                out,
                "{:<24} {:<16} {:<60}",
                truncate(&record.document_id, 24),
                truncate(&record.field, 16),
                truncate(&record.url, 60)
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "📊 Summary:")?;
    writeln!(out, "   📄 Documents: {}", summary.documents_processed)?;
    writeln!(out, "   🔗 Links checked: {}", summary.total_links)?;
    writeln!(out, "   ❌ Broken: {}", summary.broken_count)?;
    out.flush()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max - 3).collect();
        format!("{}...", kept)
    }
}
