pub mod encoding;
pub mod fetcher;

#[cfg(feature = "browser")]
pub mod browser_fetcher;

#[cfg(feature = "browser")]
pub use browser_fetcher::ChromiumFetcher;
pub use fetcher::{BROWSER_USER_AGENT, ReqwestFetcher};
