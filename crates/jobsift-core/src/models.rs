use serde::Serialize;

use crate::error::{AppError, ErrorKind};
use crate::platform::{self, Platform};
use crate::resolver;

/// How a document was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Static,
    Rendered,
}

/// Result of a single fetch attempt. A retry produces a new outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub method: FetchMethod,
    /// URL after redirects; the requested URL when the request never got that far.
    pub final_url: String,
    pub status: Option<u16>,
    pub body: Result<String, AppError>,
}

impl FetchOutcome {
    pub fn success(
        method: FetchMethod,
        final_url: impl Into<String>,
        status: Option<u16>,
        markup: String,
    ) -> Self {
        Self {
            method,
            final_url: final_url.into(),
            status,
            body: Ok(markup),
        }
    }

    pub fn failure(method: FetchMethod, final_url: impl Into<String>, error: AppError) -> Self {
        Self {
            method,
            final_url: final_url.into(),
            status: error.status(),
            body: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.body.is_ok()
    }

    pub fn markup(&self) -> Option<&str> {
        self.body.as_deref().ok()
    }

    pub fn error(&self) -> Option<&AppError> {
        self.body.as_ref().err()
    }
}

/// A validated, classified and resolved acquisition target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRequest {
    pub original_url: String,
    pub resolved_url: String,
    pub was_resolved: bool,
    pub platform: Platform,
}

impl AcquisitionRequest {
    /// Validate raw user input, then classify and resolve it.
    ///
    /// Scheme-less input such as `jobs.lever.co/acme/123` is treated as https.
    pub fn new(raw: &str) -> Result<Self, AppError> {
        let original_url = normalize_input(raw)?;
        let platform = platform::classify(&original_url);
        let (resolved_url, was_resolved) = resolver::resolve(&original_url, platform);

        Ok(Self {
            original_url,
            resolved_url,
            was_resolved,
            platform,
        })
    }
}

fn normalize_input(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidUrl("URL is empty".into()));
    }
    if !trimmed.contains('.') {
        return Err(AppError::InvalidUrl(format!("{trimmed} has no domain")));
    }

    let lowered = trimmed.to_ascii_lowercase();
    let url = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        return Err(AppError::InvalidUrl(format!(
            "{trimmed} is not an http(s) URL"
        )));
    } else {
        format!("https://{trimmed}")
    };

    let parsed = url::Url::parse(&url).map_err(|e| AppError::InvalidUrl(format!("{url}: {e}")))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::InvalidUrl(format!("{url} has no host")));
    }
    Ok(url)
}

/// Which tier produced the payload text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExtractionMethod {
    #[serde(rename = "structured")]
    Structured,
    #[serde(rename = "normalized-html")]
    NormalizedHtml,
    #[serde(rename = "fallback")]
    Fallback,
    #[serde(rename = "rendered+structured")]
    RenderedStructured,
    #[serde(rename = "rendered+normalized-html")]
    RenderedNormalizedHtml,
    #[serde(rename = "rendered+fallback")]
    RenderedFallback,
}

impl ExtractionMethod {
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionMethod::Structured => "structured",
            ExtractionMethod::NormalizedHtml => "normalized-html",
            ExtractionMethod::Fallback => "fallback",
            ExtractionMethod::RenderedStructured => "rendered+structured",
            ExtractionMethod::RenderedNormalizedHtml => "rendered+normalized-html",
            ExtractionMethod::RenderedFallback => "rendered+fallback",
        }
    }

    /// The same tier applied to rendered markup.
    pub fn rendered(self) -> Self {
        match self {
            ExtractionMethod::Structured => ExtractionMethod::RenderedStructured,
            ExtractionMethod::NormalizedHtml => ExtractionMethod::RenderedNormalizedHtml,
            ExtractionMethod::Fallback => ExtractionMethod::RenderedFallback,
            other => other,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(
            self,
            ExtractionMethod::RenderedStructured
                | ExtractionMethod::RenderedNormalizedHtml
                | ExtractionMethod::RenderedFallback
        )
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The terminal artifact of a successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionPayload {
    pub text: String,
    pub extraction_method: ExtractionMethod,
    pub platform_label: String,
    pub platform: Platform,
    /// The URL whose markup produced `text`.
    pub resolved_url: String,
    pub was_resolved: bool,
}

/// Fields lifted from an embedded JSON-LD `JobPosting`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuredJobRecord {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub skills: Vec<String>,
}

impl StructuredJobRecord {
    /// Render the record as labelled plain text. Absent fields are omitted.
    pub fn to_text(&self) -> String {
        let mut sections = Vec::new();

        let mut header = Vec::new();
        if let Some(title) = &self.title {
            header.push(format!("Job Title: {title}"));
        }
        if let Some(company) = &self.company {
            header.push(format!("Company: {company}"));
        }
        if !header.is_empty() {
            sections.push(header.join("\n"));
        }

        if let Some(description) = &self.description {
            sections.push(format!("Description:\n{description}"));
        }
        if !self.skills.is_empty() {
            sections.push(format!("Skills: {}", self.skills.join(", ")));
        }

        sections.join("\n\n")
    }
}

/// Where in the pipeline a failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    StaticFetch,
    OriginalFetch,
    RenderedFetch,
    Extract(ExtractionMethod),
    /// The acquisition as a whole, e.g. when a caller's deadline expires.
    Overall,
}

impl Stage {
    pub fn label(&self) -> String {
        match self {
            Stage::Input => "input".into(),
            Stage::StaticFetch => "static-fetch".into(),
            Stage::OriginalFetch => "original-fetch".into(),
            Stage::RenderedFetch => "rendered-fetch".into(),
            Stage::Extract(method) => format!("extract:{method}"),
            Stage::Overall => "overall".into(),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Terminal failure of one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionFailure {
    pub error: AppError,
    pub stage: Stage,
    pub platform: Platform,
}

impl AcquisitionFailure {
    pub fn new(error: AppError, stage: Stage, platform: Platform) -> Self {
        Self {
            error,
            stage,
            platform,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn report(&self) -> FailureReport {
        FailureReport {
            kind: self.kind(),
            message: self.error.to_string(),
            stage: self.stage.label(),
            platform_label: self.platform.display_name().to_string(),
        }
    }
}

impl std::fmt::Display for AcquisitionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} during {} ({})", self.error, self.stage, self.platform)
    }
}

impl std::error::Error for AcquisitionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Serializable view of an [`AcquisitionFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub kind: ErrorKind,
    pub message: String,
    pub stage: String,
    pub platform_label: String,
}
