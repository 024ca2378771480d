// src/checker/validity.rs
// =============================================================================
// Decides whether one URL is broken.
//
// Policy, in order:
//   1. Empty / whitespace-only URL        -> not broken, nothing is fetched
//   2. YouTube link (youtube.com, youtu.be in the host)
//        full fetch, broken if the page body carries an "unavailable" marker.
//        Video hosts answer 200 for removed or private videos, so only the
//        body tells a dead video from a live one.
//   3. Anything else
//        existence probe (HEAD). 404 -> full fetch (GET); broken only if
//        that also answers 404. Every other probe status is not broken.
//   4. A transport failure at any step     -> broken, with the reason kept
//
// A full fetch whose body could not be read still has its status. That is
// enough for the 404 escalation; a video page without a body is broken.
//
// There is exactly one escalation and no retries. Repeated URLs are checked
// again every time they occur.
// =============================================================================

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Phrases on a video page that mean the video is gone.
pub const UNAVAILABLE_MARKERS: [&str; 4] = [
    "This video is no longer available",
    "Video unavailable",
    "This video is private",
    "has been removed",
];

const VIDEO_HOSTS: [&str; 2] = ["youtube.com", "youtu.be"];

const NOT_FOUND: u16 = 404;

/// How much of the response a fetch needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMethod {
    /// Headers only (HEAD); the body is not read
    ExistenceProbe,
    /// Full request (GET) with the body read as text
    Full,
}

/// What came back from a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Option<String>,
}

/// Ways a fetch can fail before producing a status code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("could not resolve hostname")]
    Dns,
    #[error("SSL certificate error")]
    Tls,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

/// The transport the checker fetches URLs through.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, method: FetchMethod) -> Result<FetchResponse, FetchError>;
}

/// Result of checking one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub broken: bool,
    /// Why the link was judged broken (status, marker or transport error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CheckResult {
    fn ok() -> Self {
        Self {
            broken: false,
            reason: None,
        }
    }

    fn broken(reason: impl Into<String>) -> Self {
        Self {
            broken: true,
            reason: Some(reason.into()),
        }
    }
}

/// Applies the validity policy through a `Fetcher`.
#[derive(Clone)]
pub struct ValidityChecker {
    fetcher: Arc<dyn Fetcher>,
}

impl ValidityChecker {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn check(&self, url: &str) -> CheckResult {
        if url.trim().is_empty() {
            return CheckResult::ok();
        }

        let result = if is_video_link(url) {
            self.check_video(url).await
        } else {
            self.check_status(url).await
        };

        debug!(url, broken = result.broken, reason = ?result.reason, "checked link");
        result
    }

    async fn check_video(&self, url: &str) -> CheckResult {
        match self.fetcher.fetch(url, FetchMethod::Full).await {
            Ok(FetchResponse { body: None, .. }) => {
                CheckResult::broken("response body unavailable")
            }
            Ok(FetchResponse {
                body: Some(body), ..
            }) => match UNAVAILABLE_MARKERS.iter().find(|marker| body.contains(*marker)) {
                Some(marker) => CheckResult::broken(format!("video page says \"{}\"", marker)),
                None => CheckResult::ok(),
            },
            Err(e) => CheckResult::broken(e.to_string()),
        }
    }

    async fn check_status(&self, url: &str) -> CheckResult {
        let probe = match self.fetcher.fetch(url, FetchMethod::ExistenceProbe).await {
            Ok(response) => response,
            Err(e) => return CheckResult::broken(e.to_string()),
        };

        if probe.status != NOT_FOUND {
            return CheckResult::ok();
        }

        // Some servers reject HEAD but serve GET correctly. Only the status
        // counts here, so a missing body is fine.
        match self.fetcher.fetch(url, FetchMethod::Full).await {
            Ok(full) if full.status == NOT_FOUND => CheckResult::broken("HTTP 404"),
            Ok(_) => CheckResult::ok(),
            Err(e) => CheckResult::broken(e.to_string()),
        }
    }
}

/// Returns true if the URL's host belongs to a video host.
///
/// URLs that don't parse are matched on their raw text instead.
pub fn is_video_link(url: &str) -> bool {
    let host = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase));

    match host {
        Some(host) => VIDEO_HOSTS.iter().any(|video| host.contains(video)),
        None => {
            let lowered = url.to_ascii_lowercase();
            VIDEO_HOSTS.iter().any(|video| lowered.contains(video))
        }
    }
}
