use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{FetchMethod, FetchOutcome};
use crate::render::RenderStrategy;

/// Fetches raw markup over plain HTTP.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str, timeout: Duration) -> impl Future<Output = FetchOutcome> + Send;
}

/// Fetches markup after a headless browser has executed the page.
pub trait RenderedFetcher: Send + Sync + Clone {
    /// Check that rendering can work at all in this process, without launching anything.
    fn check_available(&self) -> Result<(), AppError>;

    /// Render `url` and return the resulting markup, following `strategy`.
    fn fetch_rendered(
        &self,
        url: &str,
        strategy: &RenderStrategy,
    ) -> impl Future<Output = FetchOutcome> + Send;
}

/// A RenderedFetcher for builds or hosts without a browser.
#[derive(Debug, Clone)]
pub struct NoRenderer;

const NO_RENDERER: &str = "this build has no headless browser support";

impl RenderedFetcher for NoRenderer {
    fn check_available(&self) -> Result<(), AppError> {
        Err(AppError::RenderUnavailable(NO_RENDERER.into()))
    }

    async fn fetch_rendered(&self, url: &str, _strategy: &RenderStrategy) -> FetchOutcome {
        FetchOutcome::failure(
            FetchMethod::Rendered,
            url,
            AppError::RenderUnavailable(NO_RENDERER.into()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::error::ErrorKind;
    use crate::platform::Platform;

    #[tokio::test]
    async fn test_no_renderer_is_unavailable() {
        let renderer = NoRenderer;
        assert_eq!(
            renderer.check_available().unwrap_err().kind(),
            ErrorKind::RenderCapabilityUnavailable
        );

        let strategy = RenderStrategy::for_platform(Platform::Apple, &RenderConfig::default());
        let outcome = renderer.fetch_rendered("https://jobs.apple.com/x", &strategy).await;
        assert_eq!(outcome.method, FetchMethod::Rendered);
        assert_eq!(
            outcome.error().map(AppError::kind),
            Some(ErrorKind::RenderCapabilityUnavailable)
        );
    }
}
