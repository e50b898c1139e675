#![cfg(feature = "browser")]

use std::time::Duration;

use jobsift_client::ChromiumFetcher;
use jobsift_core::config::RenderConfig;
use jobsift_core::error::ErrorKind;
use jobsift_core::models::FetchMethod;
use jobsift_core::platform::Platform;
use jobsift_core::render::RenderStrategy;
use jobsift_core::traits::RenderedFetcher;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const SCRIPTED_PAGE: &str = r#"<html><head><title>Careers</title></head>
<body><div id="app"></div>
<script>
  setTimeout(() => {
    document.getElementById('app').innerHTML =
      '<div class="job-description"><h1>Platform Engineer</h1><p>Rendered by script.</p></div>';
  }, 200);
</script></body></html>"#;

async fn serve(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: text/html\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}/job")
}

fn quick_config() -> RenderConfig {
    RenderConfig {
        navigation_timeout: Duration::from_secs(20),
        idle_timeout: Duration::from_secs(5),
        settle: Duration::from_millis(500),
        ..RenderConfig::default()
    }
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_generic_strategy_sees_scripted_content() {
    let url = serve("200 OK", SCRIPTED_PAGE).await;
    let config = quick_config();
    let fetcher = ChromiumFetcher::new(&config);
    fetcher.check_available().unwrap();

    let strategy = RenderStrategy::Generic {
        navigation_timeout: config.navigation_timeout,
        idle_timeout: config.idle_timeout,
        settle: config.settle,
        wait_for: Some(".job-description".into()),
        selector_timeout: Duration::from_secs(5),
    };
    let outcome = fetcher.fetch_rendered(&url, &strategy).await;

    assert_eq!(outcome.method, FetchMethod::Rendered);
    let markup = outcome.markup().unwrap();
    assert!(markup.contains("Platform Engineer"));
    assert!(markup.contains("Rendered by script."));
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_spa_strategy_returns_content_container() {
    let url = serve("200 OK", SCRIPTED_PAGE).await;
    let config = quick_config();
    let fetcher = ChromiumFetcher::new(&config);

    let strategy = match RenderStrategy::for_platform(Platform::Apple, &config) {
        RenderStrategy::SpaShell {
            navigation_timeout,
            idle_timeout,
            candidate_selectors,
            content_selectors,
            ..
        } => RenderStrategy::SpaShell {
            navigation_timeout,
            idle_timeout,
            candidate_selectors,
            candidate_timeout: Duration::from_secs(2),
            settle: Duration::from_millis(300),
            scroll_settle: Duration::from_millis(300),
            content_selectors: [vec![".job-description".to_string()], content_selectors].concat(),
            min_content_len: 20,
        },
        other => panic!("unexpected strategy {}", other.name()),
    };
    let outcome = fetcher.fetch_rendered(&url, &strategy).await;

    let markup = outcome.markup().unwrap();
    assert!(markup.starts_with("<div id='job-content'>"));
    assert!(markup.contains("Platform Engineer"));
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_error_status_is_reported() {
    let url = serve("404 Not Found", "<html><body>missing</body></html>").await;
    let config = quick_config();
    let fetcher = ChromiumFetcher::new(&config);

    let strategy = RenderStrategy::for_platform(Platform::Generic, &config);
    let outcome = fetcher.fetch_rendered(&url, &strategy).await;

    assert_eq!(outcome.status, Some(404));
    assert_eq!(outcome.error().map(|e| e.kind()), Some(ErrorKind::HttpStatus));
}
