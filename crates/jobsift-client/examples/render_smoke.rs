/// Smoke-test for `ChromiumFetcher`.
///
/// Launches a headless Chromium, renders <https://example.com> with the
/// generic strategy, and checks the markup contains the expected `<h1>`.
///
/// Run with:
///   cargo run -p jobsift-client --example render_smoke --features browser
use jobsift_client::ChromiumFetcher;
use jobsift_core::config::RenderConfig;
use jobsift_core::platform::Platform;
use jobsift_core::render::RenderStrategy;
use jobsift_core::traits::RenderedFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = RenderConfig::default();
    let fetcher = ChromiumFetcher::new(&config);
    fetcher.check_available()?;

    let url = "https://example.com";
    let strategy = RenderStrategy::for_platform(Platform::Generic, &config);
    println!("Rendering {url} ({}) …", strategy.name());
    let outcome = fetcher.fetch_rendered(url, &strategy).await;

    let html = match outcome.body {
        Ok(html) => html,
        Err(e) => anyhow::bail!("render failed: {e}"),
    };

    assert!(
        html.contains("<h1>Example Domain</h1>"),
        "Expected <h1> not found in rendered HTML"
    );

    println!("OK, got {} bytes of rendered HTML from {}", html.len(), outcome.final_url);
    println!("First 300 chars:\n{}", html.chars().take(300).collect::<String>());
    Ok(())
}
