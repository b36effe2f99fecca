use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use an_core::{Article, ArticleStorage, Error, NewArticle, Result, Summarizer};
use tracing::{error, info};
use crate::logging::Logger;
use crate::scrapers::{Discovery, Scraper};

pub const DEFAULT_MAX_PER_RUN: i64 = 10;
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(2);
/// Site article IDs start at 1.
pub const FIRST_ARTICLE_ID: i64 = 1;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on IDs considered in one run
    pub max_per_run: i64,
    /// Pause between two article fetches
    pub request_delay: Duration,
    /// Used as the discovered ID when the listing page yields none
    pub fallback_latest_id: Option<i64>,
    /// Also treat any stored title containing the ID as a duplicate
    pub legacy_title_match: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_per_run: DEFAULT_MAX_PER_RUN,
            request_delay: DEFAULT_REQUEST_DELAY,
            fallback_latest_id: None,
            legacy_title_match: false,
        }
    }
}

/// Inclusive, descending window of article IDs examined in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub high: i64,
    pub low: i64,
}

impl ScanRange {
    /// IDs from `discovered` down to `max(latest_stored, discovered - max + 1)`,
    /// never below the first site ID.
    /// The stored maximum itself is included; the duplicate check filters it out.
    pub fn new(latest_stored: Option<i64>, discovered: i64, max: i64) -> Self {
        let max = max.max(0);
        let window_floor = (discovered - max + 1).max(FIRST_ARTICLE_ID);
        let low = match latest_stored {
            Some(stored) => stored.max(window_floor),
            None => window_floor,
        };
        Self {
            high: discovered,
            low,
        }
    }

    pub fn len(&self) -> usize {
        if self.high < self.low {
            0
        } else {
            (self.high - self.low + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> {
        let low = self.low;
        (low..=self.high).rev()
    }
}

impl fmt::Display for ScanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "(empty)")
        } else {
            write!(f, "#{}..=#{}", self.low, self.high)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyStored,
    ExtractionEmpty,
    SummaryFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyStored => write!(f, "already stored"),
            SkipReason::ExtractionEmpty => write!(f, "no content extracted"),
            SkipReason::SummaryFailed(message) => write!(f, "summary failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub discovered: i64,
    pub latest_stored: Option<i64>,
    pub range: ScanRange,
    pub inserted: Vec<Article>,
    pub skipped: Vec<(i64, SkipReason)>,
}

/// Discover, extract, summarize and store new articles from one source.
pub struct Pipeline {
    scraper: Arc<dyn Scraper>,
    summarizer: Arc<dyn Summarizer>,
    storage: Arc<dyn ArticleStorage>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        scraper: Arc<dyn Scraper>,
        summarizer: Arc<dyn Summarizer>,
        storage: Arc<dyn ArticleStorage>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            scraper,
            summarizer,
            storage,
            config,
        }
    }

    async fn discover(&self) -> Result<i64> {
        match self.scraper.discover_latest_id().await {
            Discovery::Found(id) => Ok(id),
            Discovery::NotFound(reason) => match self.config.fallback_latest_id {
                Some(fallback) => {
                    info!("⚠️ Discovery failed ({}), falling back to #{}", reason, fallback);
                    Ok(fallback)
                }
                None => Err(Error::Discovery(reason.to_string())),
            },
        }
    }

    async fn is_stored(&self, id: i64, url: &str) -> Result<bool> {
        if self.storage.exists_by_source_url(url).await? {
            return Ok(true);
        }
        if self.config.legacy_title_match {
            return self.storage.exists_by_title_fragment(&id.to_string()).await;
        }
        Ok(false)
    }

    /// One full pass. Nothing is stored unless every staged article commits.
    pub async fn run(&self) -> Result<RunReport> {
        let source = self.scraper.source_metadata();
        let logger = Logger::new().with_prefix(source.emoji.to_string());

        let discovered = self.discover().await?;
        let latest_stored = self.storage.latest_external_id().await?;
        let range = ScanRange::new(latest_stored, discovered, self.config.max_per_run);
        logger.info(&format!(
            "Latest on {} is #{}, stored up to {}, scanning {}",
            source.name,
            discovered,
            latest_stored.map(|id| format!("#{}", id)).unwrap_or_else(|| "nothing".to_string()),
            range
        ));

        let mut staged = Vec::new();
        let mut skipped = Vec::new();
        let mut fetched_any = false;

        for id in range.ids() {
            let log = logger.clone().with_prefix(format!("[{}]", id));
            let url = self.scraper.article_url(id);

            if self.is_stored(id, &url).await? {
                log.debug("Already stored, skipping");
                skipped.push((id, SkipReason::AlreadyStored));
                continue;
            }

            if fetched_any && !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }
            fetched_any = true;

            let Some(extracted) = self.scraper.scrape_article(&url).await else {
                log.warn("Nothing extracted, skipping");
                skipped.push((id, SkipReason::ExtractionEmpty));
                continue;
            };
            if extracted.publication_date.is_fallback() {
                log.warn("Publish date unknown, stamped with fetch time");
            }

            log.info(&format!("📰 {}", extracted.title));
            match self.summarizer.summarize(&extracted.content).await {
                Ok(summary) => {
                    log.info("✨ Summary generated");
                    staged.push(NewArticle::from_extracted(extracted, summary));
                }
                Err(e) => {
                    log.error(&format!("Summary failed: {}", e));
                    skipped.push((id, SkipReason::SummaryFailed(e.to_string())));
                }
            }
        }

        let inserted = if staged.is_empty() {
            Vec::new()
        } else {
            match self.storage.insert_batch(&staged).await {
                Ok(inserted) => inserted,
                Err(e) => {
                    error!("💥 Storing {} articles failed, run rolled back: {}", staged.len(), e);
                    return Err(e);
                }
            }
        };

        logger.info(&format!(
            "Run complete: {} stored, {} skipped",
            inserted.len(),
            skipped.len()
        ));

        Ok(RunReport {
            discovered,
            latest_stored,
            range,
            inserted,
            skipped,
        })
    }
}
