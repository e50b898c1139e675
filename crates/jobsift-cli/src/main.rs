use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use jobsift_client::ReqwestFetcher;
use jobsift_core::models::{AcquisitionFailure, AcquisitionRequest, ExtractionPayload, Stage};
use jobsift_core::platform::{self, Capabilities, Platform};
use jobsift_core::traits::{Fetcher, RenderedFetcher};
use jobsift_core::{AcquireOptions, AcquisitionService, AppError, PipelineConfig};

#[derive(Parser)]
#[command(name = "jobsift", version, about = "Fetch the text of a job posting from any ATS")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire the text of one job posting
    Extract {
        /// Job posting URL (scheme optional)
        #[arg(short, long)]
        url: String,

        /// Render in a headless browser before trying plain HTTP
        #[arg(long, default_value_t = false)]
        force_render: bool,

        /// Static fetch timeout in seconds
        #[arg(long, env = "JOBSIFT_STATIC_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,

        /// Give up on the whole acquisition after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Print only the extracted text instead of JSON
        #[arg(long, default_value_t = false)]
        text_only: bool,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Show the detected platform and canonical URL without fetching
    Detect {
        /// Job posting URL (scheme optional)
        #[arg(short, long)]
        url: String,
    },

    /// Acquire every URL listed in a file, one per line
    Batch {
        /// File of URLs; blank lines and lines starting with '#' are skipped
        #[arg(short, long)]
        file: PathBuf,

        /// Render in a headless browser before trying plain HTTP
        #[arg(long, default_value_t = false)]
        force_render: bool,

        #[command(flatten)]
        tuning: Tuning,
    },
}

#[derive(Args)]
struct Tuning {
    /// Minimum characters a tier must produce to be accepted
    #[arg(
        long,
        env = "JOBSIFT_MIN_CONTENT_CHARS",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    min_content_chars: Option<usize>,

    /// Chrome/Chromium binary for the rendered tier
    #[arg(long, env = "CHROME_BIN")]
    chrome_bin: Option<PathBuf>,
}

impl Tuning {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(n) = self.min_content_chars {
            config.min_content_chars = n;
        }
        if let Some(path) = self.chrome_bin {
            config.render.chrome_bin = Some(path);
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobsift=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            url,
            force_render,
            timeout_secs,
            deadline_secs,
            text_only,
            tuning,
        } => {
            let service = build_service(tuning)?;
            let options = AcquireOptions {
                force_render,
                static_timeout: timeout_secs.map(Duration::from_secs),
            };
            let deadline = deadline_secs.map(Duration::from_secs);
            cmd_extract(&service, &url, &options, deadline, text_only).await
        }
        Commands::Detect { url } => cmd_detect(&url),
        Commands::Batch {
            file,
            force_render,
            tuning,
        } => {
            let urls = read_batch_file(&file)?;
            let service = build_service(tuning)?;
            let options = AcquireOptions {
                force_render,
                static_timeout: None,
            };
            cmd_batch(&service, &urls, &options).await
        }
    }
}

fn build_service(tuning: Tuning) -> Result<AcquisitionService<ReqwestFetcher, impl RenderedFetcher>> {
    let mut config = PipelineConfig::from_env().context("Invalid configuration")?;
    tuning.apply(&mut config);

    let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let renderer = renderer(&config);
    if let Err(e) = renderer.check_available() {
        tracing::warn!("Rendered tier unavailable: {e}");
    }

    Ok(AcquisitionService::new(fetcher, renderer, config))
}

#[cfg(feature = "browser")]
fn renderer(config: &PipelineConfig) -> impl RenderedFetcher + use<> {
    jobsift_client::ChromiumFetcher::new(&config.render)
}

#[cfg(not(feature = "browser"))]
fn renderer(_config: &PipelineConfig) -> impl RenderedFetcher + use<> {
    jobsift_core::NoRenderer
}

/// Run one acquisition, bounded by `deadline` when given.
async fn acquire_within<F, R>(
    service: &AcquisitionService<F, R>,
    url: &str,
    options: &AcquireOptions,
    deadline: Option<Duration>,
) -> Result<ExtractionPayload, AcquisitionFailure>
where
    F: Fetcher,
    R: RenderedFetcher,
{
    let Some(deadline) = deadline else {
        return service.acquire(url, options).await;
    };
    match tokio::time::timeout(deadline, service.acquire(url, options)).await {
        Ok(result) => result,
        Err(_) => Err(AcquisitionFailure::new(
            AppError::DeadlineExceeded(deadline.as_secs()),
            Stage::Overall,
            platform::classify(url),
        )),
    }
}

async fn cmd_extract<F, R>(
    service: &AcquisitionService<F, R>,
    url: &str,
    options: &AcquireOptions,
    deadline: Option<Duration>,
    text_only: bool,
) -> Result<ExitCode>
where
    F: Fetcher,
    R: RenderedFetcher,
{
    match acquire_within(service, url, options, deadline).await {
        Ok(payload) => {
            tracing::info!(
                method = %payload.extraction_method,
                chars = payload.text.chars().count(),
                "Extraction complete"
            );
            if text_only {
                println!("{}", payload.text);
            } else {
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            tracing::error!("{failure}");
            println!("{}", serde_json::to_string_pretty(&failure.report())?);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Detection {
    platform: Platform,
    platform_label: &'static str,
    capabilities: Capabilities,
    original_url: String,
    resolved_url: String,
    was_resolved: bool,
}

fn cmd_detect(url: &str) -> Result<ExitCode> {
    match AcquisitionRequest::new(url) {
        Ok(request) => {
            let detection = Detection {
                platform: request.platform,
                platform_label: request.platform.display_name(),
                capabilities: request.platform.capabilities(),
                original_url: request.original_url,
                resolved_url: request.resolved_url,
                was_resolved: request.was_resolved,
            };
            println!("{}", serde_json::to_string_pretty(&detection)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let failure = AcquisitionFailure::new(e, Stage::Input, platform::classify(url));
            println!("{}", serde_json::to_string_pretty(&failure.report())?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// URLs from a batch file: trimmed, skipping blank lines and `#` comments.
fn read_batch_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
    Ok(parse_batch(&content))
}

fn parse_batch(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

async fn cmd_batch<F, R>(
    service: &AcquisitionService<F, R>,
    urls: &[String],
    options: &AcquireOptions,
) -> Result<ExitCode>
where
    F: Fetcher,
    R: RenderedFetcher,
{
    if urls.is_empty() {
        println!("No URLs to process");
        return Ok(ExitCode::SUCCESS);
    }

    tracing::info!(
        urls = urls.len(),
        min_chars = service.config().min_content_chars,
        "Starting batch"
    );
    let mut succeeded = 0;
    for (i, url) in urls.iter().enumerate() {
        tracing::info!("[{}/{}] {}", i + 1, urls.len(), url);
        let line = match service.acquire(url, options).await {
            Ok(payload) => {
                succeeded += 1;
                summary_ok(url, &payload)
            }
            Err(failure) => summary_failed(url, &failure),
        };
        println!("{line}");
    }

    println!("\nTotal: {}/{} succeeded", succeeded, urls.len());
    Ok(if succeeded == urls.len() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn summary_ok(url: &str, payload: &ExtractionPayload) -> String {
    format!(
        "  [OK]     {:<16} {:<24} {:>6} chars  {}",
        payload.platform_label,
        payload.extraction_method.label(),
        payload.text.chars().count(),
        url
    )
}

fn summary_failed(url: &str, failure: &AcquisitionFailure) -> String {
    format!(
        "  [FAILED] {:<16} {:<24} {}  {}",
        failure.platform.display_name(),
        failure.kind().as_str(),
        failure.stage,
        url
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::CommandFactory;
    use jobsift_core::models::ExtractionMethod;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_arguments() {
        let cli = Cli::try_parse_from([
            "jobsift",
            "extract",
            "--url",
            "jobs.lever.co/acme/123",
            "--force-render",
            "--deadline-secs",
            "90",
            "--text-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract {
                url,
                force_render,
                deadline_secs,
                text_only,
                ..
            } => {
                assert_eq!(url, "jobs.lever.co/acme/123");
                assert!(force_render);
                assert_eq!(deadline_secs, Some(90));
                assert!(text_only);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_min_content_chars_must_be_positive() {
        let parse = |value: &str| {
            Cli::try_parse_from(["jobsift", "extract", "--url", "example.com/job", "--min-content-chars", value])
        };
        assert!(parse("0").is_err());
        assert!(parse("-5").is_err());
        match parse("350").unwrap().command {
            Commands::Extract { tuning, .. } => assert_eq!(tuning.min_content_chars, Some(350)),
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_tuning_overrides_config() {
        let tuning = Tuning {
            min_content_chars: Some(350),
            chrome_bin: Some(PathBuf::from("/opt/chrome/chrome")),
        };
        let service = build_service(tuning).unwrap();
        assert_eq!(service.config().min_content_chars, 350);
        assert_eq!(
            service.config().render.chrome_bin.as_deref(),
            Some(Path::new("/opt/chrome/chrome"))
        );
    }

    #[test]
    fn test_renderer_does_not_borrow_config() {
        let config = PipelineConfig::default();
        let renderer = renderer(&config);
        drop(config);
        if !cfg!(feature = "browser") {
            assert!(renderer.check_available().is_err());
        }
    }

    #[test]
    fn test_parse_batch_skips_blanks_and_comments() {
        let content = "# regression set\nhttps://boards.greenhouse.io/acme/jobs/1\n\n   \n  jobs.lever.co/acme/2  \n#https://skipped.example.com\n";
        assert_eq!(
            parse_batch(content),
            vec!["https://boards.greenhouse.io/acme/jobs/1", "jobs.lever.co/acme/2"]
        );
    }

    #[test]
    fn test_read_batch_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# Apple").unwrap();
        writeln!(file, "https://jobs.apple.com/en-us/details/200630587").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "https://acme.wd5.myworkdayjobs.com/en-US/careers/job/Remote/Engineer_R1").unwrap();

        let urls = read_batch_file(file.path()).unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("apple.com"));
    }

    #[test]
    fn test_read_missing_batch_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_batch_file(&dir.path().join("missing.txt")).unwrap_err();
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn test_summary_lines() {
        let payload = ExtractionPayload {
            text: "x".repeat(250),
            extraction_method: ExtractionMethod::Structured,
            platform_label: "Greenhouse".into(),
            platform: Platform::Greenhouse,
            resolved_url: "https://boards.greenhouse.io/acme/jobs/1".into(),
            was_resolved: false,
        };
        let line = summary_ok("https://boards.greenhouse.io/acme/jobs/1", &payload);
        assert!(line.contains("[OK]"));
        assert!(line.contains("250 chars"));

        let failure = AcquisitionFailure::new(
            AppError::DeadlineExceeded(5),
            Stage::Overall,
            Platform::Generic,
        );
        let line = summary_failed("https://example.com/job", &failure);
        assert!(line.contains("deadline-exceeded"));
        assert!(line.contains("overall"));
    }
}
