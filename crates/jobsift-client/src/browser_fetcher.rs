use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use jobsift_core::config::RenderConfig;
use jobsift_core::error::AppError;
use jobsift_core::models::{FetchMethod, FetchOutcome};
use jobsift_core::render::{self, FrameMarkup, RenderStrategy};
use jobsift_core::traits::RenderedFetcher;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use crate::fetcher::BROWSER_USER_AGENT;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const IDLE_POLL: Duration = Duration::from_millis(500);
const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Cross-origin frames opened in a second tab, at most.
const MAX_FRAME_TABS: usize = 3;

const LOAD_STATE_JS: &str = "({ ready: document.readyState, \
    resources: performance.getEntriesByType('resource').length })";

const NAVIGATION_STATUS_JS: &str = "(() => { \
    const nav = performance.getEntriesByType('navigation')[0]; \
    return nav && nav.responseStatus ? nav.responseStatus : 0; })()";

const OUTER_HTML_JS: &str = "document.documentElement.outerHTML";

const SCROLL_JS: &str = "window.scrollTo(0, document.body.scrollHeight)";

const FRAMES_JS: &str = "Array.from(document.querySelectorAll('iframe')).map(f => { \
    let html = null; \
    try { html = f.contentDocument ? f.contentDocument.documentElement.outerHTML : null; } catch (e) {} \
    return { src: f.src || null, html }; })";

/// Headless-browser fetcher using Chromium via the Chrome DevTools Protocol.
///
/// Every [`RenderedFetcher::fetch_rendered`] call launches its own browser,
/// runs the platform's [`RenderStrategy`] and shuts the browser down again,
/// so no Chromium process outlives a fetch.
///
/// # Example
///
/// ```rust,no_run
/// use jobsift_client::ChromiumFetcher;
/// use jobsift_core::config::RenderConfig;
/// use jobsift_core::platform::Platform;
/// use jobsift_core::render::RenderStrategy;
/// use jobsift_core::traits::RenderedFetcher;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RenderConfig::default();
/// let fetcher = ChromiumFetcher::new(&config);
/// fetcher.check_available()?;
/// let strategy = RenderStrategy::for_platform(Platform::Apple, &config);
/// let outcome = fetcher.fetch_rendered("https://jobs.apple.com/en-us/details/200630587", &strategy).await;
/// println!("{:?}", outcome.markup().map(str::len));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChromiumFetcher {
    chrome_bin: Option<PathBuf>,
}

impl ChromiumFetcher {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            chrome_bin: config.chrome_bin.clone(),
        }
    }

    fn binary(&self) -> Result<PathBuf, AppError> {
        match &self.chrome_bin {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => Err(AppError::RenderUnavailable(format!(
                "configured browser {} does not exist",
                path.display()
            ))),
            None => find_chrome_binary().ok_or_else(|| {
                AppError::RenderUnavailable(
                    "no Chrome or Chromium binary found; set CHROME_BIN".into(),
                )
            }),
        }
    }
}

/// Tries to locate a Chrome/Chromium binary.
///
/// On systems where Chromium is installed via **snap**, the wrapper at
/// `/snap/bin/chromium` strips unknown CLI flags, breaking headless mode, so
/// the real binary inside the snap is preferred. `CHROME_BIN` wins over
/// everything, then well-known paths, then `$PATH`.
pub fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    let candidates: &[&str] = &[
        // Snap (Ubuntu default)
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        // Flatpak
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        // Common apt / manual installs
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    ];

    candidates
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| {
            ["google-chrome-stable", "google-chrome", "chromium", "chromium-browser"]
                .into_iter()
                .find_map(|name| which::which(name).ok())
        })
}

fn engine(e: impl std::fmt::Display) -> AppError {
    AppError::RenderEngine(e.to_string())
}

/// One launched browser. Closed explicitly on the happy path; dropping it
/// aborts the CDP handler task and lets chromiumoxide kill the process.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(binary: &Path) -> Result<Self, AppError> {
        tracing::info!("Using Chrome binary: {}", binary.display());

        let config = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .chrome_executable(binary)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--window-size=1920,1080")
            .arg(format!("--user-agent={BROWSER_USER_AGENT}"))
            .build()
            .map_err(|e| AppError::RenderEngine(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::RenderEngine(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser CDP handler error: {e}");
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Close gracefully, killing the process if it does not exit in time.
    async fn close(mut self) {
        let browser = &mut self.browser;
        let graceful = async {
            if let Err(e) = browser.close().await {
                tracing::debug!("Browser close failed: {e}");
            }
            let _ = browser.wait().await;
        };
        if !finished_within(CLOSE_TIMEOUT, graceful).await {
            tracing::warn!("Browser did not exit within {}s, killing it", CLOSE_TIMEOUT.as_secs());
            if let Some(Err(e)) = self.browser.kill().await {
                tracing::debug!("Browser kill failed: {e}");
            }
        }
        self.handler.abort();
    }
}

async fn finished_within(limit: Duration, fut: impl Future) -> bool {
    tokio::time::timeout(limit, fut).await.is_ok()
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// What a successful render produced.
struct Rendered {
    final_url: String,
    status: Option<u16>,
    markup: String,
}

impl RenderedFetcher for ChromiumFetcher {
    fn check_available(&self) -> Result<(), AppError> {
        self.binary().map(|_| ())
    }

    async fn fetch_rendered(&self, url: &str, strategy: &RenderStrategy) -> FetchOutcome {
        let failure = |e: AppError| {
            tracing::warn!(url, error = %e, "Rendered fetch failed");
            FetchOutcome::failure(FetchMethod::Rendered, url, e)
        };

        let binary = match self.binary() {
            Ok(binary) => binary,
            Err(e) => return failure(e),
        };
        let session = match BrowserSession::launch(&binary).await {
            Ok(session) => session,
            Err(e) => return failure(e),
        };

        let result = render_page(&session, url, strategy).await;
        session.close().await;

        match result {
            Ok(rendered) => {
                tracing::info!(
                    chars = rendered.markup.chars().count(),
                    strategy = strategy.name(),
                    "Rendered page"
                );
                FetchOutcome::success(
                    FetchMethod::Rendered,
                    rendered.final_url,
                    rendered.status,
                    rendered.markup,
                )
            }
            Err(e) => failure(e),
        }
    }
}

async fn render_page(
    session: &BrowserSession,
    url: &str,
    strategy: &RenderStrategy,
) -> Result<Rendered, AppError> {
    let page = session.browser.new_page("about:blank").await.map_err(engine)?;

    let navigation_timeout = strategy.navigation_timeout();
    tracing::info!(url, strategy = strategy.name(), "Navigating");
    match tokio::time::timeout(navigation_timeout, page.goto(url)).await {
        Err(_) => return Err(AppError::RenderNavigationTimeout(navigation_timeout.as_secs())),
        Ok(Err(e)) => return Err(engine(format!("Failed to navigate to {url}: {e}"))),
        Ok(Ok(_)) => {}
    }

    let status = eval::<u16>(&page, NAVIGATION_STATUS_JS)
        .await
        .ok()
        .filter(|s| *s != 0);
    if let Some(status) = status
        && !(200..300).contains(&status)
    {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        return Err(AppError::HttpStatus {
            status,
            reason: reason.to_string(),
        });
    }

    wait_for_network_idle(&page, strategy.idle_timeout()).await;

    let markup = match strategy {
        RenderStrategy::Generic {
            settle,
            wait_for,
            selector_timeout,
            ..
        } => {
            tokio::time::sleep(*settle).await;
            if let Some(selector) = wait_for
                && !wait_for_selector(&page, selector, *selector_timeout).await
            {
                tracing::warn!(selector = selector.as_str(), "Timeout waiting for selector, continuing anyway");
            }
            eval::<String>(&page, OUTER_HTML_JS).await?
        }
        RenderStrategy::SpaShell {
            candidate_selectors,
            candidate_timeout,
            settle,
            scroll_settle,
            content_selectors,
            min_content_len,
            ..
        } => {
            let mut found = false;
            for selector in candidate_selectors {
                if wait_for_selector(&page, selector, *candidate_timeout).await {
                    tracing::debug!(selector = selector.as_str(), "Found content selector");
                    found = true;
                    break;
                }
            }
            if !found {
                tracing::warn!("No content selector appeared, continuing with page as-is");
            }

            tokio::time::sleep(*settle).await;
            if let Err(e) = page.evaluate(SCROLL_JS).await {
                tracing::debug!("Scroll failed: {e}");
            }
            tokio::time::sleep(*scroll_settle).await;

            let mut containers = Vec::with_capacity(content_selectors.len());
            for selector in content_selectors {
                containers.push((selector.clone(), inner_html(&page, selector).await));
            }
            match render::pick_content(&containers, *min_content_len) {
                Some(content) => content,
                None => eval::<String>(&page, OUTER_HTML_JS).await?,
            }
        }
        RenderStrategy::FramedAjax {
            settle,
            frame_keywords,
            min_frame_len,
            ..
        } => {
            tokio::time::sleep(*settle).await;
            let main = eval::<String>(&page, OUTER_HTML_JS).await?;
            let frames = collect_frames(session, &page, navigation_timeout).await;
            render::merge_frames(&main, &frames, frame_keywords, *min_frame_len)
        }
    };

    let final_url = page
        .url()
        .await
        .ok()
        .flatten()
        .map(|u| u.to_string())
        .unwrap_or_else(|| url.to_string());
    if let Err(e) = page.close().await {
        tracing::debug!("Tab close failed: {e}");
    }

    Ok(Rendered {
        final_url,
        status,
        markup,
    })
}

async fn eval<T: DeserializeOwned>(page: &Page, script: &str) -> Result<T, AppError> {
    page.evaluate(script)
        .await
        .map_err(engine)?
        .into_value::<T>()
        .map_err(|e| AppError::RenderEngine(format!("Unexpected script result: {e}")))
}

#[derive(Deserialize)]
struct LoadState {
    ready: String,
    resources: u64,
}

/// Poll until the document is complete and no new resources appeared between
/// two samples. Timing out is a warning, not a failure.
async fn wait_for_network_idle(page: &Page, timeout: Duration) {
    let poll = async {
        let mut last = None;
        loop {
            if let Ok(state) = eval::<LoadState>(page, LOAD_STATE_JS).await {
                if state.ready == "complete" && last == Some(state.resources) {
                    return;
                }
                last = Some(state.resources);
            }
            tokio::time::sleep(IDLE_POLL).await;
        }
    };

    if tokio::time::timeout(timeout, poll).await.is_err() {
        tracing::warn!(timeout_secs = timeout.as_secs(), "Timeout waiting for network idle, continuing anyway");
    }
}

async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> bool {
    let poll = async {
        loop {
            if page.find_element(selector).await.is_ok() {
                return;
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.is_ok()
}

async fn inner_html(page: &Page, selector: &str) -> Option<String> {
    let selector = serde_json::to_string(selector).ok()?;
    let script = format!(
        "(() => {{ const el = document.querySelector({selector}); return el ? el.innerHTML : null; }})()"
    );
    eval::<Option<String>>(page, &script).await.ok().flatten()
}

#[derive(Deserialize)]
struct RawFrame {
    src: Option<String>,
    html: Option<String>,
}

/// Markup of every sub-frame. Same-origin frames are read in place;
/// cross-origin frames are loaded in a second tab.
async fn collect_frames(session: &BrowserSession, page: &Page, timeout: Duration) -> Vec<FrameMarkup> {
    let raw = match eval::<Vec<RawFrame>>(page, FRAMES_JS).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "Could not enumerate frames");
            return Vec::new();
        }
    };
    tracing::debug!(count = raw.len(), "Found frames");

    let mut frames = Vec::with_capacity(raw.len());
    let mut tabs = 0;
    for frame in raw {
        match (frame.html, frame.src) {
            (Some(html), src) => frames.push(FrameMarkup { src, html }),
            (None, Some(src)) if src.starts_with("http") && tabs < MAX_FRAME_TABS => {
                tabs += 1;
                match load_in_tab(&session.browser, &src, timeout).await {
                    Ok(html) => frames.push(FrameMarkup {
                        src: Some(src),
                        html,
                    }),
                    Err(e) => tracing::warn!(src = %src, error = %e, "Could not load frame"),
                }
            }
            _ => {}
        }
    }
    frames
}

async fn load_in_tab(browser: &Browser, url: &str, timeout: Duration) -> Result<String, AppError> {
    let tab = match tokio::time::timeout(timeout, browser.new_page(url)).await {
        Err(_) => return Err(AppError::RenderNavigationTimeout(timeout.as_secs())),
        Ok(result) => result.map_err(engine)?,
    };
    let html = eval::<String>(&tab, OUTER_HTML_JS).await;
    if let Err(e) = tab.close().await {
        tracing::debug!("Frame tab close failed: {e}");
    }
    html
}
