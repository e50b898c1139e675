use std::error::Error as _;
use std::time::Duration;

use jobsift_core::error::AppError;
use jobsift_core::models::{FetchMethod, FetchOutcome};
use jobsift_core::traits::Fetcher;
use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::encoding::decode_body;

/// Desktop Chrome identity. ATS platforms serve degraded pages (or block
/// outright) when the client does not look like a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 10;

/// HTTP fetcher using reqwest.
///
/// Sends browser-like headers, follows up to ten redirects and decodes the
/// body with charset sniffing. Failures are classified into timeout, TLS,
/// connection, redirect, HTTP status and unexpected errors.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(browser_headers())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| AppError::Unexpected(format!("HTTP client error: {e}")))?;

        Ok(Self { client })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let pairs = [
        (
            header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
        (header::ACCEPT_LANGUAGE, "en-US,en;q=0.9"),
        (header::DNT, "1"),
        (header::UPGRADE_INSECURE_REQUESTS, "1"),
        (header::CACHE_CONTROL, "max-age=0"),
    ];
    for (name, value) in pairs {
        headers.insert(name, HeaderValue::from_static(value));
    }
    for (name, value) in [
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
    ] {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> FetchOutcome {
        tracing::info!(url, "Fetching URL");

        let response = match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = classify(&e, timeout);
                tracing::warn!(url, error = %error, "Request failed");
                let final_url = e.url().map(|u| u.to_string()).unwrap_or_else(|| url.to_string());
                return FetchOutcome::failure(FetchMethod::Static, final_url, error);
            }
        };

        let final_url = response.url().to_string();
        let status = response.status();
        tracing::info!(status = status.as_u16(), final_url = %final_url, "Response received");

        if !status.is_success() {
            let error = AppError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            };
            tracing::warn!(url, error = %error, "Non-success status");
            return FetchOutcome::failure(FetchMethod::Static, final_url, error);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                let error = classify(&e, timeout);
                tracing::warn!(url, error = %error, "Failed to read response body");
                return FetchOutcome::failure(FetchMethod::Static, final_url, error);
            }
        };

        let markup = decode_body(&bytes, content_type.as_deref());
        if markup.trim().is_empty() {
            return FetchOutcome::failure(
                FetchMethod::Static,
                final_url,
                AppError::Unexpected("empty response body".into()),
            );
        }

        tracing::info!(chars = markup.chars().count(), "Successfully fetched");
        FetchOutcome::success(FetchMethod::Static, final_url, Some(status.as_u16()), markup)
    }
}

/// Map a reqwest error onto the fetch failure kinds.
fn classify(e: &reqwest::Error, timeout: Duration) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout.as_secs())
    } else if e.is_redirect() {
        AppError::TooManyRedirects(format!("stopped after {MAX_REDIRECTS} redirects"))
    } else if let Some(detail) = tls_detail(e) {
        AppError::Tls(detail)
    } else if e.is_connect() {
        AppError::Network(format!("Could not connect to the server: {}", root_cause(e)))
    } else {
        AppError::Unexpected(root_cause(e))
    }
}

/// The first error in the source chain that talks about certificates or TLS.
fn tls_detail(e: &reqwest::Error) -> Option<String> {
    let mut source = e.source();
    while let Some(err) = source {
        let message = err.to_string();
        let lowered = message.to_lowercase();
        if ["certificate", "ssl", "tls", "handshake"]
            .iter()
            .any(|needle| lowered.contains(needle))
        {
            return Some(message);
        }
        source = err.source();
    }
    None
}

fn root_cause(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(err) = source {
        message = err.to_string();
        source = err.source();
    }
    message
}
