// src/checker/http.rs
// =============================================================================
// The real transport behind the validity checker, built on reqwest.
//
// Key functionality:
// - Existence probe = HTTP HEAD (lightweight, the body is never read)
// - Full fetch = HTTP GET with the body read as text (None if reading fails)
// - One client per audit, reused for every request (connection pooling)
// - A per-request timeout, so one dead host can't stall the whole audit
// - Sorts reqwest's failures into the FetchError categories
// =============================================================================

use super::validity::{FetchError, FetchMethod, FetchResponse, Fetcher};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Settings for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

/// Fetches URLs over HTTP(S).
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, method: FetchMethod) -> Result<FetchResponse, FetchError> {
        let request = match method {
            FetchMethod::ExistenceProbe => self.client.head(url),
            FetchMethod::Full => self.client.get(url),
        };

        let response = request.send().await.map_err(categorize_error)?;
        let status = response.status().as_u16();

        // A body that fails to arrive is reported as missing; the status
        // already came back and is kept
        let body = match method {
            FetchMethod::ExistenceProbe => None,
            FetchMethod::Full => match response.text().await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(url, status, error = %error_chain(&e), "failed to read response body");
                    None
                }
            },
        };

        Ok(FetchResponse { status, body })
    }
}

// Categorizes the different ways a reqwest request can fail
//
// - timeout             -> FetchError::Timeout
// - redirect loop       -> FetchError::TooManyRedirects
// - DNS lookup failed   -> FetchError::Dns
// - TLS / certificates  -> FetchError::Tls
// - refused / reset     -> FetchError::Connect
fn categorize_error(error: reqwest::Error) -> FetchError {
    let kind = if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_redirect() {
        ErrorKind::Redirect
    } else if error.is_connect() {
        ErrorKind::Connect
    } else if error.is_builder() {
        ErrorKind::Builder
    } else {
        ErrorKind::Other
    };

    classify(kind, &source_chain(&error), &error_chain(&error))
}

// What reqwest says about a failure, before looking at its causes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorKind {
    Timeout,
    Redirect,
    Connect,
    Builder,
    Other,
}

// `causes` is the source chain only. The top-level message carries the URL,
// which must not decide the category.
fn classify(kind: ErrorKind, causes: &str, message: &str) -> FetchError {
    let causes = causes.to_lowercase();

    match kind {
        ErrorKind::Timeout => FetchError::Timeout,
        ErrorKind::Redirect => FetchError::TooManyRedirects,
        _ if causes.contains("certificate") || causes.contains("ssl") || causes.contains("tls") => {
            FetchError::Tls
        }
        ErrorKind::Connect if causes.contains("dns") || causes.contains("resolve") => {
            FetchError::Dns
        }
        ErrorKind::Connect => FetchError::Connect(message.to_string()),
        ErrorKind::Builder => FetchError::Other(format!("invalid URL: {}", message)),
        ErrorKind::Other => FetchError::Other(message.to_string()),
    }
}

// Joins the causes of `error`, leaving out its own message
fn source_chain(error: &(dyn std::error::Error + 'static)) -> String {
    match error.source() {
        Some(cause) => error_chain(cause),
        None => String::new(),
    }
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(timeout: Duration) -> HttpFetcher {
        HttpFetcher::new(&HttpSettings {
            timeout,
            max_redirects: 5,
            user_agent: "field-link-audit-test".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_probe_uses_head_and_skips_body() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let response = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/page", server.uri()), FetchMethod::ExistenceProbe)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, None);
    }

    #[tokio::test]
    async fn test_full_uses_get_and_reads_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Video unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let response = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/watch", server.uri()), FetchMethod::Full)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_deref(), Some("Video unavailable"));
    }

    #[tokio::test]
    async fn test_status_codes_are_returned_not_errors() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let response = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/missing", server.uri()), FetchMethod::ExistenceProbe)
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_slow_server_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let result = fetcher(Duration::from_millis(200))
            .fetch(&server.uri(), FetchMethod::ExistenceProbe)
            .await;
        assert_eq!(result, Err(FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_refused_connection_is_an_error() {
        // Nothing listens on port 9 of localhost in the test environment
        let result = fetcher(Duration::from_secs(2))
            .fetch("http://127.0.0.1:9/", FetchMethod::ExistenceProbe)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_url_text_does_not_decide_the_category() {
        let result = fetcher(Duration::from_secs(2))
            .fetch("http://127.0.0.1:9/ssl/tls/certificate", FetchMethod::ExistenceProbe)
            .await;
        assert!(matches!(result, Err(FetchError::Connect(_))), "{:?}", result);
    }

    #[test]
    fn test_classify_uses_causes_only() {
        let message = "error sending request for url (https://tls.example.com/ssl): \
                       tcp connect error: Connection refused";
        assert!(matches!(
            classify(ErrorKind::Connect, "tcp connect error: Connection refused", message),
            FetchError::Connect(_)
        ));
        assert_eq!(
            classify(ErrorKind::Connect, "invalid peer certificate: UnknownIssuer", message),
            FetchError::Tls
        );
        assert_eq!(
            classify(ErrorKind::Connect, "dns error: failed to lookup address", message),
            FetchError::Dns
        );
        assert_eq!(classify(ErrorKind::Timeout, "", message), FetchError::Timeout);
        assert_eq!(
            classify(ErrorKind::Other, "", "boom"),
            FetchError::Other("boom".to_string())
        );
    }

    #[tokio::test]
    async fn test_unparseable_url_is_an_error() {
        let result = fetcher(Duration::from_secs(2))
            .fetch("http://", FetchMethod::ExistenceProbe)
            .await;
        assert!(result.is_err());
    }
}
