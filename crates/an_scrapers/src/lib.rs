pub mod logging;
pub mod pipeline;
pub mod scrapers;

pub use logging::{init_logging, Logger};
pub use pipeline::{Pipeline, PipelineConfig, RunReport, ScanRange, SkipReason};
pub use scrapers::{AibaseScraper, Discovery, DiscoveryFailure, Scraper, SourceMetadata};

pub mod prelude {
    pub use super::pipeline::{Pipeline, PipelineConfig, RunReport};
    pub use super::scrapers::{Discovery, Scraper};
    pub use an_core::{Article, Error, Result};
}
