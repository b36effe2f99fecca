use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use an_core::{Article, ArticleQuery, ArticleStorage, Summarizer, DEFAULT_PAGE_SIZE};
use an_inference::{InferenceConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use an_scrapers::{init_logging, AibaseScraper, Pipeline, PipelineConfig, RunReport};
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !current_number.is_empty() {
                let num = current_number
                    .parse::<u64>()
                    .map_err(|_| "Invalid number in duration".to_string())?;
                let unit_seconds = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit_seconds)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| "Duration is too long".to_string())?;
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A trailing bare number counts as seconds
        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(num)
                .ok_or_else(|| "Duration is too long".to_string())?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be longer than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

/// RFC 3339 timestamp, or a plain `YYYY-MM-DD` taken at `time_of_day` UTC.
fn parse_date_bound(s: &str, time_of_day: NaiveTime) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| date.and_time(time_of_day).and_utc())
        .map_err(|_| format!("Expected YYYY-MM-DD or an RFC 3339 timestamp, got '{}'", s))
}

fn parse_since(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_date_bound(s, NaiveTime::default())
}

fn parse_until(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
    parse_date_bound(s, end_of_day)
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Scrape, summarize and store AI news", long_about = None)]
pub struct Cli {
    /// Storage backend: sqlite or memory
    #[arg(long, env = "AINEWS_STORAGE", default_value = "sqlite")]
    storage: String,
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:articles.db")]
    database_url: String,
    /// Summarizer: chat (OpenAI-compatible API) or dummy (offline)
    #[arg(long, env = "AINEWS_PROVIDER", default_value = "chat")]
    provider: String,
    #[arg(long, env = "ZHIPU_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "ZHIPU_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long, env = "ZHIPU_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, env = "AINEWS_SITE_URL", default_value = AibaseScraper::DEFAULT_SITE_URL)]
    site_url: String,
    /// Most article IDs examined per run
    #[arg(long, env = "AINEWS_MAX_PER_RUN", default_value_t = 10)]
    max_per_run: i64,
    /// Pause between article fetches, in seconds
    #[arg(long, env = "AINEWS_REQUEST_DELAY_SECS", default_value_t = 2)]
    request_delay_secs: u64,
    /// Article ID to start from when the listing page shows none
    #[arg(long, env = "AINEWS_FALLBACK_ID")]
    fallback_id: Option<i64>,
    /// Also treat stored titles containing the article ID as duplicates
    #[arg(long, env = "AINEWS_LEGACY_TITLE_MATCH")]
    legacy_title_match: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch new articles once, or periodically with --interval
    Fetch {
        /// Run in periodic mode with the specified interval (e.g. 1h, 30m, 1d, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// List stored articles, newest first
    List {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, value_parser = parse_since)]
        since: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_until)]
        until: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 0)]
        skip: i64,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: i64,
    },
    /// Print one article and count the view
    Show { id: i64 },
    Delete { id: i64 },
    /// Regenerate the summary of a stored article
    Resummarize { id: i64 },
    /// Summarize a text file and print the result
    Summarize { file: PathBuf },
}

impl Cli {
    fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            provider: self.provider.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            ..Default::default()
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_per_run: self.max_per_run,
            request_delay: Duration::from_secs(self.request_delay_secs),
            fallback_latest_id: self.fallback_id,
            legacy_title_match: self.legacy_title_match,
        }
    }

    fn summarizer(&self) -> anyhow::Result<Arc<dyn Summarizer>> {
        let summarizer = an_inference::create_pooled_model(&self.inference_config())?;
        info!("🧠 Summarizer ready (using {})", summarizer.name());
        Ok(summarizer)
    }

    async fn storage(&self) -> anyhow::Result<Arc<dyn ArticleStorage>> {
        Ok(an_storage::create_storage(&self.storage, &self.database_url).await?)
    }
}

fn print_article_line(article: &Article) {
    println!(
        "#{:<6} {}  {}",
        article.id,
        article.publication_date.format("%Y-%m-%d %H:%M"),
        article.title
    );
    if let Some(summary) = &article.summary {
        println!("        {}", summary);
    }
}

fn log_report(report: &RunReport) {
    info!(
        "📊 Discovered #{}, scanned {}, stored {}, skipped {}",
        report.discovered,
        report.range,
        report.inserted.len(),
        report.skipped.len()
    );
    for (id, reason) in &report.skipped {
        info!("   #{} skipped: {}", id, reason);
    }
}

async fn fetch(cli: &Cli, interval: Option<HumanDuration>) -> anyhow::Result<()> {
    let storage = cli.storage().await?;
    let summarizer = cli.summarizer()?;
    let scraper = Arc::new(AibaseScraper::with_site_url(&cli.site_url)?);
    let pipeline = Pipeline::new(scraper, summarizer, storage, cli.pipeline_config());

    let Some(interval) = interval else {
        let report = pipeline.run().await?;
        log_report(&report);
        return Ok(());
    };

    info!("Running in periodic mode with {}s interval", interval.0.as_secs());
    loop {
        info!("Starting fetch cycle");
        match pipeline.run().await {
            Ok(report) => log_report(&report),
            Err(e) => error!("Fetch cycle failed: {}", e),
        }
        info!("Waiting {}s before next fetch", interval.0.as_secs());
        tokio::time::sleep(interval.0).await;
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Fetch { interval } => fetch(&cli, interval.clone()).await?,
        Commands::List {
            keyword,
            category,
            tags,
            since,
            until,
            skip,
            limit,
        } => {
            let query = ArticleQuery {
                keyword: keyword.clone(),
                category: category.clone(),
                tags: tags.clone(),
                start_date: *since,
                end_date: *until,
                skip: *skip,
                limit: *limit,
            };
            let page = cli.storage().await?.list_articles(&query).await?;
            println!("{} matching articles", page.total);
            for article in &page.items {
                print_article_line(article);
            }
        }
        Commands::Show { id } => {
            let storage = cli.storage().await?;
            if !storage.increment_view_count(*id).await? {
                bail!("Article {} not found", id);
            }
            let article = storage
                .get_article(*id)
                .await?
                .with_context(|| format!("Article {} disappeared", id))?;
            println!("{}", serde_json::to_string_pretty(&article)?);
        }
        Commands::Delete { id } => {
            if !cli.storage().await?.delete_article(*id).await? {
                bail!("Article {} not found", id);
            }
            info!("🗑️ Deleted article {}", id);
        }
        Commands::Resummarize { id } => {
            let storage = cli.storage().await?;
            let article = storage
                .get_article(*id)
                .await?
                .with_context(|| format!("Article {} not found", id))?;
            let summary = cli.summarizer()?.summarize(&article.content).await?;
            storage
                .update_summary(*id, &summary)
                .await?
                .with_context(|| format!("Article {} not found", id))?;
            info!("✨ Summary updated for article {}", id);
            println!("{}", summary);
        }
        Commands::Summarize { file } => {
            let content = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let summary = cli.summarizer()?.summarize(&content).await?;
            println!("{}", summary);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging("info");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("💥 {:#}", e);
            ExitCode::FAILURE
        }
    }
}
