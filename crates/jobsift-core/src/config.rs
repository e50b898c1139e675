use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Timeouts and delays for the rendered tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub navigation_timeout: Duration,
    pub idle_timeout: Duration,
    pub settle: Duration,
    pub extended_settle: Duration,
    pub selector_timeout: Duration,
    /// Explicit browser binary; auto-detected when `None`.
    pub chrome_bin: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
            settle: Duration::from_millis(2000),
            extended_settle: Duration::from_millis(5000),
            selector_timeout: Duration::from_millis(5000),
            chrome_bin: None,
        }
    }
}

/// Every tunable of the acquisition pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Minimum characters a tier must produce to be accepted.
    pub min_content_chars: usize,
    pub static_timeout: Duration,
    pub render: RenderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_content_chars: 200,
            static_timeout: Duration::from_secs(30),
            render: RenderConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Read configuration from environment variables, falling back to defaults.
    ///
    /// - `JOBSIFT_MIN_CONTENT_CHARS` (defaults to 200)
    /// - `JOBSIFT_STATIC_TIMEOUT_SECS` (defaults to 30)
    /// - `JOBSIFT_NAVIGATION_TIMEOUT_SECS` (defaults to 30)
    /// - `JOBSIFT_IDLE_TIMEOUT_SECS` (defaults to 30)
    /// - `JOBSIFT_SETTLE_MS` (defaults to 2000)
    /// - `JOBSIFT_EXTENDED_SETTLE_MS` (defaults to 5000)
    /// - `JOBSIFT_SELECTOR_TIMEOUT_MS` (defaults to 5000)
    /// - `CHROME_BIN` (optional)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let render = &defaults.render;

        let secs = |key: &str, default: Duration| -> Result<Duration, AppError> {
            Ok(parse_positive(&lookup, key)?.map_or(default, Duration::from_secs))
        };
        let millis = |key: &str, default: Duration| -> Result<Duration, AppError> {
            Ok(parse_positive(&lookup, key)?.map_or(default, Duration::from_millis))
        };

        let min_content_chars = match parse_positive(&lookup, "JOBSIFT_MIN_CONTENT_CHARS")? {
            Some(n) => usize::try_from(n).map_err(|_| {
                AppError::Config(format!("JOBSIFT_MIN_CONTENT_CHARS {n} is too large"))
            })?,
            None => defaults.min_content_chars,
        };

        Ok(Self {
            min_content_chars,
            static_timeout: secs("JOBSIFT_STATIC_TIMEOUT_SECS", defaults.static_timeout)?,
            render: RenderConfig {
                navigation_timeout: secs("JOBSIFT_NAVIGATION_TIMEOUT_SECS", render.navigation_timeout)?,
                idle_timeout: secs("JOBSIFT_IDLE_TIMEOUT_SECS", render.idle_timeout)?,
                settle: millis("JOBSIFT_SETTLE_MS", render.settle)?,
                extended_settle: millis("JOBSIFT_EXTENDED_SETTLE_MS", render.extended_settle)?,
                selector_timeout: millis("JOBSIFT_SELECTOR_TIMEOUT_MS", render.selector_timeout)?,
                chrome_bin: lookup("CHROME_BIN")
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
            },
        })
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, AppError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let parsed: u64 = raw.trim().parse().map_err(|_| {
        AppError::Config(format!("Invalid {key} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::Config(format!("{key} must be at least 1")));
    }
    Ok(Some(parsed))
}
