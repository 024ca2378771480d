// src/audit/session.rs
// =============================================================================
// The audit session drives one run over one document set.
//
//   Idle -> Sniffing -> CountingPass -> CheckingPass -> Summarized
//                  \
//                   -> NoLinksFound          (no candidate fields)
//
// Sniffing      sample the store, pick the fields that may hold links
// CountingPass  walk every occurrence once, only to learn the total
// CheckingPass  walk again, check each URL, report "k of total" as we go
//
// Both passes use the same harvester over the same field set, so the index
// reported in the checking pass lines up with the total from the counting
// pass.
//
// With concurrency > 1, checks run through an ordered bounded pipeline:
// indices are assigned at dispatch and results come back in dispatch order,
// so reports still follow the canonical enumeration.
// =============================================================================

use super::report::{AuditSummary, BrokenLink, Reporter};
use crate::checker::{count_links, harvest, sniff_fields, CandidateFieldSet, ValidityChecker};
use crate::store::{DocumentSource, StoreError};
use futures::stream::{self, StreamExt};
use std::pin::pin;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("document source failed during {state:?}: {source}")]
    Source {
        state: SessionState,
        #[source]
        source: StoreError,
    },
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sniffing,
    CountingPass,
    CheckingPass,
    Summarized,
    NoLinksFound,
}

impl SessionState {
    /// The only transitions a session may take; none can be skipped.
    fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Sniffing)
                | (Sniffing, CountingPass)
                | (Sniffing, NoLinksFound)
                | (CountingPass, CheckingPass)
                | (CheckingPass, Summarized)
        )
    }
}

/// How a finished session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Sniffing found no candidate fields; nothing was checked
    NoLinksFound(AuditSummary),
    Summarized(AuditSummary),
}

impl AuditOutcome {
    pub fn summary(&self) -> &AuditSummary {
        match self {
            AuditOutcome::NoLinksFound(summary) | AuditOutcome::Summarized(summary) => summary,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub sample_size: usize,
    pub concurrency: usize,
}

/// Samples `source` and returns the fields likely to hold links.
pub async fn detect_fields(
    source: &dyn DocumentSource,
    sample_size: usize,
) -> Result<CandidateFieldSet, StoreError> {
    let sample = source.sample_documents(sample_size).await?;
    Ok(sniff_fields(&sample))
}

pub struct AuditSession<'a> {
    source: &'a dyn DocumentSource,
    checker: ValidityChecker,
    settings: SessionSettings,
    state: SessionState,
}

impl<'a> AuditSession<'a> {
    pub fn new(
        source: &'a dyn DocumentSource,
        checker: ValidityChecker,
        settings: SessionSettings,
    ) -> Self {
        Self {
            source,
            checker,
            settings,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        info!(from = ?self.state, to = ?next, "audit state change");
        self.state = next;
    }

    fn source_error(&self, source: StoreError) -> AuditError {
        AuditError::Source {
            state: self.state,
            source,
        }
    }

    /// Runs the whole session, sending events to `reporter`.
    ///
    /// Link failures never end the run; only a failing document source does.
    pub async fn run(&mut self, reporter: &mut dyn Reporter) -> Result<AuditOutcome, AuditError> {
        self.advance(SessionState::Sniffing);
        let fields = detect_fields(self.source, self.settings.sample_size)
            .await
            .map_err(|e| self.source_error(e))?;

        if fields.is_empty() {
            self.advance(SessionState::NoLinksFound);
            let summary = AuditSummary::default();
            reporter.no_links_found();
            reporter.finished(&summary);
            return Ok(AuditOutcome::NoLinksFound(summary));
        }
        reporter.fields_detected(&fields);

        self.advance(SessionState::CountingPass);
        let documents = self
            .source
            .all_documents()
            .await
            .map_err(|e| self.source_error(e))?;
        let total = count_links(&documents, &fields);
        drop(documents);
        reporter.total_counted(total);

        self.advance(SessionState::CheckingPass);
        let documents = self
            .source
            .all_documents()
            .await
            .map_err(|e| self.source_error(e))?;

        let mut summary = AuditSummary {
            fields: fields.clone(),
            documents_processed: documents.len(),
            ..AuditSummary::default()
        };

        {
            let checker = &self.checker;
            let checks = stream::iter(harvest(&documents, &fields).enumerate())
                .map(|(position, occurrence)| async move {
                    let result = checker.check(&occurrence.url).await;
                    (position + 1, occurrence, result)
                })
                .buffered(self.settings.concurrency);
            let mut checks = pin!(checks);

            while let Some((index, occurrence, result)) = checks.next().await {
                if index == total + 1 {
                    warn!(
                        total,
                        "document set grew between passes; indices exceed the counted total"
                    );
                }
                summary.total_links += 1;

                if result.broken {
                    let record = BrokenLink {
                        document_id: occurrence.document_id,
                        field: occurrence.field,
                        url: occurrence.url,
                        index,
                        total,
                        reason: result.reason,
                    };
                    reporter.broken_link(&record);
                    summary.broken_links.push(record);
                } else {
                    reporter.progress(index, total);
                }
            }
        }

        if summary.total_links < total {
            warn!(
                counted = total,
                checked = summary.total_links,
                "document set shrank between passes"
            );
        }

        summary.broken_count = summary.broken_links.len();
        self.advance(SessionState::Summarized);
        reporter.finished(&summary);
        Ok(AuditOutcome::Summarized(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::report::recording::{Event, RecordingReporter};
    use crate::checker::{FetchError, FetchMethod, ScriptedFetcher};
    use crate::store::memory::MemorySource;
    use crate::store::{Document, FieldValue};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn settings(concurrency: usize) -> SessionSettings {
        SessionSettings {
            sample_size: 10,
            concurrency,
        }
    }

    fn scenario_source() -> MemorySource {
        MemorySource {
            documents: vec![
                Document::new("A")
                    .with_field("link", text("https://ok.example.com"))
                    .with_field("video", text("https://youtube.com/watch?v=bad")),
                Document::new("B").with_field(
                    "link",
                    FieldValue::TextSequence(vec!["https://dead.example.com".into()]),
                ),
            ],
        }
    }

    fn scenario_fetcher() -> ScriptedFetcher {
        ScriptedFetcher::default()
            .status("https://ok.example.com", FetchMethod::ExistenceProbe, 200)
            .body(
                "https://youtube.com/watch?v=bad",
                "<div>This video has been removed by the uploader</div>",
            )
            .status("https://dead.example.com", FetchMethod::ExistenceProbe, 404)
            .status("https://dead.example.com", FetchMethod::Full, 404)
    }

    async fn run_scenario(concurrency: usize) -> (AuditOutcome, Vec<Event>) {
        let source = scenario_source();
        let checker = ValidityChecker::new(Arc::new(scenario_fetcher()));
        let mut session = AuditSession::new(&source, checker, settings(concurrency));
        let mut reporter = RecordingReporter::default();

        let outcome = session.run(&mut reporter).await.unwrap();
        assert_eq!(session.state(), SessionState::Summarized);
        (outcome, reporter.events)
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let (outcome, events) = run_scenario(1).await;

        let summary = match &outcome {
            AuditOutcome::Summarized(summary) => summary,
            other => panic!("unexpected outcome {:?}", other),
        };
        let fields: Vec<&str> = summary.fields.iter().collect();
        assert_eq!(fields, vec!["link", "video"]);
        assert_eq!(summary.documents_processed, 2);
        assert_eq!(summary.total_links, 3);
        assert_eq!(summary.broken_count, 2);

        let broken: Vec<(&str, &str, usize)> = summary
            .broken_links
            .iter()
            .map(|b| (b.document_id.as_str(), b.field.as_str(), b.index))
            .collect();
        assert_eq!(broken, vec![("A", "video", 2), ("B", "link", 3)]);

        // Fields before the total, total before any progress, summary last
        assert_eq!(events[0], Event::Fields(vec!["link".into(), "video".into()]));
        assert_eq!(events[1], Event::Total(3));
        assert_eq!(events[2], Event::Progress(1, 3));
        assert!(matches!(&events[3], Event::Broken(b) if b.index == 2 && b.total == 3));
        assert!(matches!(&events[4], Event::Broken(b) if b.url == "https://dead.example.com"));
        assert!(matches!(&events[5], Event::Finished(s) if s == summary));
        assert_eq!(events.len(), 6);
    }

    #[tokio::test]
    async fn test_concurrent_run_reports_in_canonical_order() {
        let (sequential, sequential_events) = run_scenario(1).await;
        let (concurrent, concurrent_events) = run_scenario(8).await;
        assert_eq!(sequential, concurrent);
        assert_eq!(sequential_events, concurrent_events);
    }

    #[tokio::test]
    async fn test_no_link_fields_ends_early() {
        let source = MemorySource {
            documents: vec![Document::new("A").with_field("title", text("hello"))],
        };
        let fetcher = Arc::new(ScriptedFetcher::default());
        let checker = ValidityChecker::new(fetcher.clone());
        let mut session = AuditSession::new(&source, checker, settings(1));
        let mut reporter = RecordingReporter::default();

        let outcome = session.run(&mut reporter).await.unwrap();

        assert_eq!(session.state(), SessionState::NoLinksFound);
        assert_eq!(outcome, AuditOutcome::NoLinksFound(AuditSummary::default()));
        assert_eq!(outcome.summary().total_links, 0);
        assert_eq!(
            reporter.events,
            vec![Event::NoLinks, Event::Finished(AuditSummary::default())]
        );
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_store_ends_early() {
        let source = MemorySource { documents: vec![] };
        let checker = ValidityChecker::new(Arc::new(ScriptedFetcher::default()));
        let mut session = AuditSession::new(&source, checker, settings(1));
        let outcome = session.run(&mut RecordingReporter::default()).await.unwrap();
        assert!(matches!(outcome, AuditOutcome::NoLinksFound(_)));
    }

    #[tokio::test]
    async fn test_transport_failures_do_not_stop_the_pass() {
        let source = MemorySource {
            documents: vec![
                Document::new("A").with_field("link", text("https://down.example.com")),
                Document::new("B").with_field("link", text("https://up.example.com")),
            ],
        };
        let fetcher = ScriptedFetcher::default()
            .fail(
                "https://down.example.com",
                FetchMethod::ExistenceProbe,
                FetchError::Connect("refused".into()),
            )
            .status("https://up.example.com", FetchMethod::ExistenceProbe, 200);
        let checker = ValidityChecker::new(Arc::new(fetcher));
        let mut session = AuditSession::new(&source, checker, settings(1));
        let mut reporter = RecordingReporter::default();

        let outcome = session.run(&mut reporter).await.unwrap();
        let summary = outcome.summary();

        assert_eq!(summary.total_links, 2);
        assert_eq!(summary.broken_count, 1);
        assert_eq!(
            summary.broken_links[0].reason.as_deref(),
            Some("connection failed: refused")
        );
        assert!(reporter.events.contains(&Event::Progress(2, 2)));
    }

    #[tokio::test]
    async fn test_repeated_urls_are_checked_each_time() {
        let url = "https://same.example.com";
        let source = MemorySource {
            documents: vec![
                Document::new("A").with_field("link", text(url)),
                Document::new("B").with_field("link", text(url)),
            ],
        };
        let fetcher = Arc::new(ScriptedFetcher::default().status(
            url,
            FetchMethod::ExistenceProbe,
            200,
        ));
        let checker = ValidityChecker::new(fetcher.clone());
        let mut session = AuditSession::new(&source, checker, settings(1));

        session.run(&mut RecordingReporter::default()).await.unwrap();
        assert_eq!(fetcher.call_count(), 2);
    }

    struct FailingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentSource for FailingSource {
        async fn sample_documents(&self, _limit: usize) -> Result<Vec<Document>, StoreError> {
            Ok(vec![Document::new("A").with_field("link", text("https://x.example"))])
        }

        async fn all_documents(&self) -> Result<Vec<Document>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::NotFound {
                kind: "collection",
                name: "gone".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_source_failure_is_an_error() {
        let source = FailingSource {
            calls: AtomicUsize::new(0),
        };
        let checker = ValidityChecker::new(Arc::new(ScriptedFetcher::default()));
        let mut session = AuditSession::new(&source, checker, settings(1));

        let result = session.run(&mut RecordingReporter::default()).await;
        assert!(matches!(
            result,
            Err(AuditError::Source {
                state: SessionState::CountingPass,
                ..
            })
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transitions_cannot_be_skipped() {
        use SessionState::*;
        assert!(Idle.can_advance_to(Sniffing));
        assert!(Sniffing.can_advance_to(NoLinksFound));
        assert!(!Sniffing.can_advance_to(CheckingPass));
        assert!(!Idle.can_advance_to(CountingPass));
        assert!(!CountingPass.can_advance_to(Summarized));
        assert!(!Summarized.can_advance_to(Sniffing));
    }
}
