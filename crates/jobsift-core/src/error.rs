use serde::Serialize;
use thiserror::Error;

/// Application-wide error types for jobsift.
///
/// Every variant maps onto one stable [`ErrorKind`] so callers can branch on
/// the kind while users still get a readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Input could not be turned into a fetchable URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Static request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// TCP/DNS level failure.
    #[error("Connection error: {0}")]
    Network(String),

    /// TLS handshake or certificate validation failed.
    #[error("SSL certificate error: {0}")]
    Tls(String),

    /// Redirect chain exceeded the client's limit.
    #[error("Too many redirects: {0}")]
    TooManyRedirects(String),

    /// Server answered with a non-2xx status.
    #[error("HTTP {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    /// Anything the HTTP client reported that fits no other bucket.
    #[error("Request failed: {0}")]
    Unexpected(String),

    /// No rendering engine is usable in this process.
    #[error("Rendering unavailable: {0}")]
    RenderUnavailable(String),

    /// Browser navigation did not finish in time.
    #[error("Browser navigation timed out after {0} seconds")]
    RenderNavigationTimeout(u64),

    /// The browser or its DevTools connection failed.
    #[error("Browser error: {0}")]
    RenderEngine(String),

    /// An embedded JSON-LD block could not be parsed.
    #[error("Malformed structured data: {0}")]
    MalformedStructuredData(String),

    /// HTML-to-text conversion failed.
    #[error("Normalizer error: {0}")]
    Normalize(String),

    /// Every extraction tier came up short.
    #[error("Insufficient content: {0}")]
    InsufficientContent(String),

    /// A configuration value could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller's overall deadline expired.
    #[error("Deadline of {0} seconds exceeded")]
    DeadlineExceeded(u64),
}

/// Stable, machine-readable error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidUrl,
    NetworkTimeout,
    NetworkConnection,
    TlsCertificate,
    TooManyRedirects,
    HttpStatus,
    Unexpected,
    RenderCapabilityUnavailable,
    RenderNavigationTimeout,
    RenderEngineError,
    MalformedStructuredData,
    NormalizeError,
    InsufficientContent,
    ConfigError,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "invalid-url",
            ErrorKind::NetworkTimeout => "network-timeout",
            ErrorKind::NetworkConnection => "network-connection",
            ErrorKind::TlsCertificate => "tls-certificate",
            ErrorKind::TooManyRedirects => "too-many-redirects",
            ErrorKind::HttpStatus => "http-status",
            ErrorKind::Unexpected => "unexpected",
            ErrorKind::RenderCapabilityUnavailable => "render-capability-unavailable",
            ErrorKind::RenderNavigationTimeout => "render-navigation-timeout",
            ErrorKind::RenderEngineError => "render-engine-error",
            ErrorKind::MalformedStructuredData => "malformed-structured-data",
            ErrorKind::NormalizeError => "normalize-error",
            ErrorKind::InsufficientContent => "insufficient-content",
            ErrorKind::ConfigError => "config-error",
            ErrorKind::DeadlineExceeded => "deadline-exceeded",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            AppError::Timeout(_) => ErrorKind::NetworkTimeout,
            AppError::Network(_) => ErrorKind::NetworkConnection,
            AppError::Tls(_) => ErrorKind::TlsCertificate,
            AppError::TooManyRedirects(_) => ErrorKind::TooManyRedirects,
            AppError::HttpStatus { .. } => ErrorKind::HttpStatus,
            AppError::Unexpected(_) => ErrorKind::Unexpected,
            AppError::RenderUnavailable(_) => ErrorKind::RenderCapabilityUnavailable,
            AppError::RenderNavigationTimeout(_) => ErrorKind::RenderNavigationTimeout,
            AppError::RenderEngine(_) => ErrorKind::RenderEngineError,
            AppError::MalformedStructuredData(_) => ErrorKind::MalformedStructuredData,
            AppError::Normalize(_) => ErrorKind::NormalizeError,
            AppError::InsufficientContent(_) => ErrorKind::InsufficientContent,
            AppError::Config(_) => ErrorKind::ConfigError,
            AppError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
