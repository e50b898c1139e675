//! Per-platform readiness strategies for the rendered tier.
//!
//! The strategy is data: the browser client executes whichever variant it is
//! handed, and the pure pieces of post-processing live here so they can be
//! tested without a browser.

use std::time::Duration;

use crate::config::RenderConfig;
use crate::platform::Platform;

/// Markup gathered from one sub-frame of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMarkup {
    pub src: Option<String>,
    pub html: String,
}

/// How to decide that a rendered page is ready to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStrategy {
    /// Network idle, settle, then an optional selector wait.
    Generic {
        navigation_timeout: Duration,
        idle_timeout: Duration,
        settle: Duration,
        wait_for: Option<String>,
        selector_timeout: Duration,
    },
    /// Client-rendered single-page apps that paint the posting late.
    SpaShell {
        navigation_timeout: Duration,
        idle_timeout: Duration,
        candidate_selectors: Vec<String>,
        candidate_timeout: Duration,
        settle: Duration,
        scroll_settle: Duration,
        content_selectors: Vec<String>,
        min_content_len: usize,
    },
    /// Pages that load the posting into sub-frames or late AJAX calls.
    FramedAjax {
        navigation_timeout: Duration,
        idle_timeout: Duration,
        settle: Duration,
        frame_keywords: Vec<String>,
        min_frame_len: usize,
    },
}

const WORKDAY_SELECTOR: &str = r#"[data-automation-id="jobPostingDescription"], .job-description"#;

const APPLE_CANDIDATES: &[&str] = &[
    r#"[data-testid="job-details"]"#,
    ".job-details",
    r#"[class*="JobDescription"]"#,
    r#"[class*="job-description"]"#,
    "#job-details",
    r#"section[class*="posting"]"#,
    r#"div[class*="details"]"#,
    "main",
];

const APPLE_CONTENT: &[&str] = &[
    "#jobdetails-wrapper",
    r#"[id*="jobdetails"]"#,
    "main",
    r#"[class*="job-details"]"#,
    "article",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl RenderStrategy {
    pub fn for_platform(platform: Platform, config: &RenderConfig) -> Self {
        match platform {
            Platform::Apple => RenderStrategy::SpaShell {
                navigation_timeout: config.navigation_timeout.max(Duration::from_secs(60)),
                idle_timeout: config.idle_timeout,
                candidate_selectors: strings(APPLE_CANDIDATES),
                candidate_timeout: config.selector_timeout,
                settle: config.extended_settle,
                scroll_settle: config.settle,
                content_selectors: strings(APPLE_CONTENT),
                min_content_len: 500,
            },
            Platform::Icims => RenderStrategy::FramedAjax {
                navigation_timeout: config.navigation_timeout.max(Duration::from_secs(60)),
                idle_timeout: config.idle_timeout,
                settle: config.extended_settle,
                frame_keywords: strings(&["job", "description"]),
                min_frame_len: 1000,
            },
            Platform::Workday => RenderStrategy::Generic {
                navigation_timeout: config.navigation_timeout.max(Duration::from_secs(45)),
                idle_timeout: config.idle_timeout,
                settle: config.settle,
                wait_for: Some(WORKDAY_SELECTOR.to_string()),
                selector_timeout: config.selector_timeout,
            },
            Platform::Greenhouse
            | Platform::Lever
            | Platform::Ashby
            | Platform::SuccessFactors
            | Platform::Generic => RenderStrategy::Generic {
                navigation_timeout: config.navigation_timeout,
                idle_timeout: config.idle_timeout,
                settle: config.settle,
                wait_for: None,
                selector_timeout: config.selector_timeout,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RenderStrategy::Generic { .. } => "generic",
            RenderStrategy::SpaShell { .. } => "spa-shell",
            RenderStrategy::FramedAjax { .. } => "framed-ajax",
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        match self {
            RenderStrategy::Generic {
                navigation_timeout, ..
            }
            | RenderStrategy::SpaShell {
                navigation_timeout, ..
            }
            | RenderStrategy::FramedAjax {
                navigation_timeout, ..
            } => *navigation_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        match self {
            RenderStrategy::Generic { idle_timeout, .. }
            | RenderStrategy::SpaShell { idle_timeout, .. }
            | RenderStrategy::FramedAjax { idle_timeout, .. } => *idle_timeout,
        }
    }
}

/// Wrap the first container whose markup is long enough, in selector order.
///
/// `containers` pairs each content selector with the inner HTML it matched.
pub fn pick_content(containers: &[(String, Option<String>)], min_len: usize) -> Option<String> {
    containers.iter().find_map(|(selector, html)| {
        let html = html.as_deref()?;
        if html.chars().count() > min_len {
            tracing::info!(selector = selector.as_str(), len = html.len(), "Found rendered job content");
            Some(format!("<div id='job-content'>{html}</div>"))
        } else {
            None
        }
    })
}

/// Append every job-looking frame to the main document markup.
pub fn merge_frames(main: &str, frames: &[FrameMarkup], keywords: &[String], min_len: usize) -> String {
    let mut merged = main.to_string();
    for frame in frames {
        let lowered = frame.html.to_lowercase();
        let relevant = frame.html.chars().count() > min_len
            && keywords.iter().any(|k| lowered.contains(&k.to_lowercase()));
        if relevant {
            tracing::info!(
                src = frame.src.as_deref().unwrap_or("about:blank"),
                len = frame.html.len(),
                "Merging frame content"
            );
            merged.push('\n');
            merged.push_str(&frame.html);
        }
    }
    merged
}
