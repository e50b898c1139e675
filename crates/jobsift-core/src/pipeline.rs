use std::time::Duration;

use crate::config::PipelineConfig;
use crate::error::AppError;
use crate::fallback;
use crate::gate::{self, ContentGate, JobContentGate};
use crate::models::{
    AcquisitionFailure, AcquisitionRequest, ExtractionMethod, ExtractionPayload, Stage,
};
use crate::normalizer::HtmlNormalizer;
use crate::platform;
use crate::render::RenderStrategy;
use crate::structured;
use crate::traits::{Fetcher, RenderedFetcher};

/// Per-call knobs for [`AcquisitionService::acquire`].
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    /// Render in a browser before trying plain HTTP.
    pub force_render: bool,
    /// Overrides the configured static timeout for this call.
    pub static_timeout: Option<Duration>,
}

/// Markup that came back from a successful fetch, with the URL that was requested.
struct Document {
    markup: String,
    url: String,
}

/// Characters each attempted tier produced, in attempt order.
#[derive(Debug, Default)]
struct TierReport(Vec<(ExtractionMethod, usize)>);

impl TierReport {
    fn record(&mut self, method: ExtractionMethod, chars: usize) {
        self.0.push((method, chars));
    }

    fn last_method(&self) -> ExtractionMethod {
        self.0
            .last()
            .map(|(method, _)| *method)
            .unwrap_or(ExtractionMethod::Fallback)
    }

    fn summary(&self) -> String {
        self.0
            .iter()
            .map(|(method, chars)| format!("{method}: {chars}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Orchestrates acquisition: classify → resolve → fetch → structured →
/// normalized HTML → fallback, escalating to a rendered fetch when needed.
///
/// Generic over both fetchers so tests can run the whole policy without a
/// network or a browser.
pub struct AcquisitionService<F, R>
where
    F: Fetcher,
    R: RenderedFetcher,
{
    fetcher: F,
    renderer: R,
    normalizer: HtmlNormalizer,
    gate: Box<dyn ContentGate>,
    config: PipelineConfig,
}

impl<F, R> AcquisitionService<F, R>
where
    F: Fetcher,
    R: RenderedFetcher,
{
    pub fn new(fetcher: F, renderer: R, config: PipelineConfig) -> Self {
        let gate = Box::new(JobContentGate::new(config.min_content_chars));
        Self {
            fetcher,
            renderer,
            normalizer: HtmlNormalizer::new(),
            gate,
            config,
        }
    }

    /// Replace the default job-content gate.
    pub fn with_gate(mut self, gate: Box<dyn ContentGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Acquire the text of one job posting.
    ///
    /// Returns exactly one payload or one failure. Tier-local failures fall
    /// through to the next tier; only exhaustion is surfaced.
    pub async fn acquire(
        &self,
        url: &str,
        options: &AcquireOptions,
    ) -> Result<ExtractionPayload, AcquisitionFailure> {
        let request = AcquisitionRequest::new(url)
            .map_err(|e| AcquisitionFailure::new(e, Stage::Input, platform::classify(url)))?;
        let requires_render = request.platform.capabilities().requires_rendered_fetch;

        tracing::info!(
            platform = %request.platform,
            url = %request.resolved_url,
            was_resolved = request.was_resolved,
            "Starting acquisition"
        );

        let mut report = TierReport::default();
        let mut render_failure = None;
        let mut rendered = false;

        if options.force_render {
            rendered = true;
            match self.render(&request, &request.resolved_url, &mut report).await {
                Ok(Some(payload)) => return Ok(payload),
                Ok(None) => {}
                Err(failure) => render_failure = Some(failure),
            }
            tracing::warn!("Forced render came up short, trying the static path");
        }

        let timeout = options.static_timeout.unwrap_or(self.config.static_timeout);
        let document = self.fetch_static(&request, timeout).await;

        let needs_render = match &document {
            Ok(doc) => {
                if let Some(payload) = self.extract(&request, doc, false, &mut report) {
                    return Ok(payload);
                }
                let js_gated = gate::looks_js_gated(&doc.markup);
                if js_gated {
                    tracing::info!("Static markup looks JavaScript-gated");
                }
                requires_render || js_gated
            }
            Err(failure) => {
                if requires_render {
                    tracing::warn!(error = %failure.error, "Static fetch failed, escalating to browser");
                }
                requires_render
            }
        };

        if needs_render && !rendered {
            let target = document
                .as_ref()
                .map(|doc| doc.url.as_str())
                .unwrap_or(&request.resolved_url);
            match self.render(&request, target, &mut report).await {
                Ok(Some(payload)) => return Ok(payload),
                Ok(None) => {}
                Err(failure) => render_failure = Some(failure),
            }
        }

        if let Some(failure) = render_failure {
            return Err(failure);
        }
        match document {
            Err(failure) if report.0.is_empty() => Err(failure),
            _ => Err(self.insufficient(&request, &report)),
        }
    }

    /// Static fetch of the resolved URL, retrying the original URL when resolution changed it.
    async fn fetch_static(
        &self,
        request: &AcquisitionRequest,
        timeout: Duration,
    ) -> Result<Document, AcquisitionFailure> {
        tracing::info!(url = %request.resolved_url, "Fetching");
        let outcome = self.fetcher.fetch(&request.resolved_url, timeout).await;

        let error = match outcome.body {
            Ok(markup) => {
                tracing::info!(bytes = markup.len(), final_url = %outcome.final_url, "Fetched markup");
                return Ok(Document {
                    markup,
                    url: request.resolved_url.clone(),
                });
            }
            Err(e) => e,
        };

        if !request.was_resolved {
            tracing::warn!(error = %error, "Static fetch failed");
            return Err(AcquisitionFailure::new(error, Stage::StaticFetch, request.platform));
        }

        tracing::warn!(
            error = %error,
            original = %request.original_url,
            "Resolved URL failed, retrying the original"
        );
        let retry = self.fetcher.fetch(&request.original_url, timeout).await;
        match retry.body {
            Ok(markup) => {
                tracing::info!(bytes = markup.len(), "Fetched markup from original URL");
                Ok(Document {
                    markup,
                    url: request.original_url.clone(),
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Original URL failed too");
                Err(AcquisitionFailure::new(e, Stage::OriginalFetch, request.platform))
            }
        }
    }

    /// Rendered fetch followed by the markup tiers. `Ok(None)` means the
    /// render worked but no tier produced enough text.
    async fn render(
        &self,
        request: &AcquisitionRequest,
        url: &str,
        report: &mut TierReport,
    ) -> Result<Option<ExtractionPayload>, AcquisitionFailure> {
        let failure = |e: AppError| AcquisitionFailure::new(e, Stage::RenderedFetch, request.platform);

        self.renderer.check_available().map_err(|e| {
            tracing::warn!(error = %e, "Rendering is not available");
            failure(e)
        })?;

        let strategy = RenderStrategy::for_platform(request.platform, &self.config.render);
        tracing::info!(url, strategy = strategy.name(), "Rendering in headless browser");

        let outcome = self.renderer.fetch_rendered(url, &strategy).await;
        let markup = outcome.body.map_err(|e| {
            tracing::warn!(error = %e, "Rendered fetch failed");
            failure(e)
        })?;
        tracing::info!(bytes = markup.len(), "Rendered markup");

        let document = Document {
            markup,
            url: url.to_string(),
        };
        Ok(self.extract(request, &document, true, report))
    }

    /// Run structured → normalized HTML → fallback over one document.
    fn extract(
        &self,
        request: &AcquisitionRequest,
        document: &Document,
        rendered: bool,
        report: &mut TierReport,
    ) -> Option<ExtractionPayload> {
        let method = |m: ExtractionMethod| if rendered { m.rendered() } else { m };

        let structured_text = structured::extract_structured(&document.markup)
            .map(|record| record.to_text())
            .unwrap_or_default();
        if let Some(payload) = self.accept(
            request,
            document,
            method(ExtractionMethod::Structured),
            structured_text,
            report,
        ) {
            return Some(payload);
        }

        match self.normalizer.normalize(&document.markup) {
            Ok(text) if self.gate.is_meaningful(&text) => {
                if let Some(payload) = self.accept(
                    request,
                    document,
                    method(ExtractionMethod::NormalizedHtml),
                    text,
                    report,
                ) {
                    return Some(payload);
                }
            }
            Ok(text) => {
                let chars = text.chars().count();
                tracing::info!(chars, "Normalized text is not a job description");
                report.record(method(ExtractionMethod::NormalizedHtml), chars);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Normalizer failed");
                report.record(method(ExtractionMethod::NormalizedHtml), 0);
            }
        }

        let fallback_text = fallback::extract_fallback(&document.markup, &document.url);
        self.accept(
            request,
            document,
            method(ExtractionMethod::Fallback),
            fallback_text,
            report,
        )
    }

    fn accept(
        &self,
        request: &AcquisitionRequest,
        document: &Document,
        method: ExtractionMethod,
        text: String,
        report: &mut TierReport,
    ) -> Option<ExtractionPayload> {
        let chars = text.chars().count();
        report.record(method, chars);

        if chars < self.config.min_content_chars || text.trim().is_empty() {
            tracing::info!(%method, chars, min = self.config.min_content_chars, "Tier below threshold");
            return None;
        }

        tracing::info!(%method, chars, "Extraction succeeded");
        Some(ExtractionPayload {
            text,
            extraction_method: method,
            platform_label: request.platform.display_name().to_string(),
            platform: request.platform,
            resolved_url: document.url.clone(),
            was_resolved: request.was_resolved,
        })
    }

    fn insufficient(&self, request: &AcquisitionRequest, report: &TierReport) -> AcquisitionFailure {
        let message = format!(
            "no tier produced at least {} characters ({})",
            self.config.min_content_chars,
            report.summary()
        );
        tracing::warn!(%message, "Acquisition failed");
        AcquisitionFailure::new(
            AppError::InsufficientContent(message),
            Stage::Extract(report.last_method()),
            request.platform,
        )
    }
}
