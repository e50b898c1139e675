pub mod config;
pub mod dom;
pub mod error;
pub mod fallback;
pub mod gate;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod platform;
pub mod render;
pub mod resolver;
pub mod structured;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use config::{PipelineConfig, RenderConfig};
pub use error::{AppError, ErrorKind};
pub use models::{
    AcquisitionFailure, AcquisitionRequest, ExtractionMethod, ExtractionPayload, FailureReport,
    FetchMethod, FetchOutcome, Stage, StructuredJobRecord,
};
pub use pipeline::{AcquireOptions, AcquisitionService};
pub use platform::{Capabilities, Platform, Tier, classify};
pub use render::{FrameMarkup, RenderStrategy};
pub use resolver::resolve;
pub use traits::{Fetcher, NoRenderer, RenderedFetcher};
