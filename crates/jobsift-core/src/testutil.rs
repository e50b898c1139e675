//! Test utilities: mock implementations of the fetcher traits.
//!
//! Handwritten mocks for dependency injection in unit tests. Responses are
//! keyed by URL and every call is recorded for assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{FetchMethod, FetchOutcome};
use crate::render::RenderStrategy;
use crate::traits::{Fetcher, RenderedFetcher};

type Responses = Arc<Mutex<HashMap<String, Vec<Result<String, AppError>>>>>;

/// Pop the next canned response for `url`. The last response repeats.
fn next_response(responses: &Responses, url: &str) -> Option<Result<String, AppError>> {
    let mut responses = responses.lock().unwrap();
    let queue = responses.get_mut(url)?;
    if queue.len() > 1 {
        Some(queue.remove(0))
    } else {
        queue.first().cloned()
    }
}

fn outcome(method: FetchMethod, url: &str, response: Option<Result<String, AppError>>) -> FetchOutcome {
    match response {
        Some(Ok(html)) => FetchOutcome::success(method, url, Some(200), html),
        Some(Err(e)) => FetchOutcome::failure(method, url, e),
        None => FetchOutcome::failure(
            method,
            url,
            AppError::Network(format!("no mock response for {url}")),
        ),
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock static fetcher with per-URL responses.
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: Responses,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.push(url, Ok(html.to_string()))
    }

    pub fn with_error(self, url: &str, error: AppError) -> Self {
        self.push(url, Err(error))
    }

    fn push(self, url: &str, response: Result<String, AppError>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push(response);
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> FetchOutcome {
        self.calls.lock().unwrap().push(url.to_string());
        outcome(FetchMethod::Static, url, next_response(&self.responses, url))
    }
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// Mock rendered fetcher. Unavailable renderers fail the availability check.
#[derive(Clone)]
pub struct MockRenderer {
    available: bool,
    responses: Responses,
    calls: Arc<Mutex<Vec<(String, &'static str)>>>,
}

impl MockRenderer {
    pub fn available() -> Self {
        Self {
            available: true,
            responses: Arc::default(),
            calls: Arc::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.push(url, Ok(html.to_string()))
    }

    pub fn with_error(self, url: &str, error: AppError) -> Self {
        self.push(url, Err(error))
    }

    fn push(self, url: &str, response: Result<String, AppError>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push(response);
        self
    }

    /// `(url, strategy name)` for every render so far.
    pub fn calls(&self) -> Vec<(String, &'static str)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RenderedFetcher for MockRenderer {
    fn check_available(&self) -> Result<(), AppError> {
        if self.available {
            Ok(())
        } else {
            Err(AppError::RenderUnavailable("mock renderer disabled".into()))
        }
    }

    async fn fetch_rendered(&self, url: &str, strategy: &RenderStrategy) -> FetchOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), strategy.name()));
        outcome(FetchMethod::Rendered, url, next_response(&self.responses, url))
    }
}

// ---------------------------------------------------------------------------
// Markup builders
// ---------------------------------------------------------------------------

/// A job description long enough to pass the default gate.
pub fn job_description(min_chars: usize) -> String {
    let sentence = "You will design, build and operate data services with the platform team; \
                    requirements include experience with Rust and SQL. ";
    let mut text = String::new();
    while text.chars().count() < min_chars {
        text.push_str(sentence);
    }
    text.trim_end().to_string()
}

/// A plain HTML page whose body is `body_html`.
pub fn html_page(body_html: &str) -> String {
    format!("<html><head><title>Job</title></head><body>{body_html}</body></html>")
}

/// A page shell carrying one JSON-LD `JobPosting` with the given description.
pub fn json_ld_page(title: &str, description: &str) -> String {
    let ld = serde_json::json!({
        "@context": "https://schema.org",
        "@type": "JobPosting",
        "title": title,
        "hiringOrganization": {"@type": "Organization", "name": "Acme"},
        "description": description,
    });
    format!(
        "<html><head><script type=\"application/ld+json\">{ld}</script></head>\
         <body><div id=\"app\"></div></body></html>"
    )
}
