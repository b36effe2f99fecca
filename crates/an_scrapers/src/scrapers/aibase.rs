use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use scraper::{Html, Selector};
use an_core::{Error, ExtractedArticle, PublishDate, Result};
use tracing::{debug, info, warn};
use url::Url;
use super::dates::parse_publish_date;
use super::utils::{non_empty, select_text};
use super::{Discovery, DiscoveryFailure, Scraper, SourceMetadata};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

lazy_static! {
    static ref ARTICLE_PATH: Regex = Regex::new(r"/zh/news/(\d+)").expect("valid article pattern");
    static ref ANCHOR: Selector = Selector::parse("a[href]").expect("valid selector");
    static ref CONTAINER: Selector = Selector::parse("div.pb-32").expect("valid selector");
    static ref TITLE: Selector = Selector::parse("h1").expect("valid selector");
    static ref DATE: Selector =
        Selector::parse("div.flex.flex-col > div.flex.flex-wrap > span:nth-child(6)").expect("valid selector");
    static ref CONTENT: Selector = Selector::parse("div.post-content").expect("valid selector");
}

/// Site article ID embedded in a link or page URL.
pub fn article_id_from_url(url: &str) -> Option<i64> {
    ARTICLE_PATH
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse().ok())
}

/// Largest article ID among the page's links.
pub fn discover_max_id(html: &str) -> Option<i64> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(article_id_from_url)
        .max()
}

/// Pull title, date and body out of an article page.
///
/// The page must have the main container with a non-empty heading and a
/// content block; anything less is `None`. A missing or unreadable date is
/// not disqualifying and falls back to `now`.
pub fn extract_article(html: &str, url: &str, now: DateTime<Utc>) -> Option<ExtractedArticle> {
    let external_id = article_id_from_url(url)?;
    let document = Html::parse_document(html);
    let container = document.select(&CONTAINER).next()?;

    let title = non_empty(select_text(container, &TITLE))?;
    let content = non_empty(select_text(container, &CONTENT))?;
    let publication_date = match select_text(container, &DATE) {
        Some(text) => parse_publish_date(&text, now),
        None => {
            warn!("No date element on {}, using current time", url);
            PublishDate::Fallback(now)
        }
    };

    Some(ExtractedArticle {
        external_id,
        title,
        content,
        publication_date,
        source_url: url.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct AibaseScraper {
    client: Client,
    site_url: String,
}

impl AibaseScraper {
    pub const DEFAULT_SITE_URL: &'static str = "https://www.aibase.com";
    pub const NEWS_PATH: &'static str = "/zh/news/";

    pub fn new() -> Result<Self> {
        Self::with_site_url(Self::DEFAULT_SITE_URL)
    }

    pub fn with_site_url(site_url: &str) -> Result<Self> {
        let parsed = Url::parse(site_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", site_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(Error::InvalidUrl(site_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"));
        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            site_url: site_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn listing_url(&self) -> String {
        format!("{}{}", self.site_url, Self::NEWS_PATH)
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Scraper for AibaseScraper {
    fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "AIbase",
            emoji: "🤖",
        }
    }

    fn article_url(&self, id: i64) -> String {
        format!("{}{}", self.listing_url(), id)
    }

    async fn discover_latest_id(&self) -> Discovery {
        let url = self.listing_url();
        let html = match self.fetch_html(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to load listing page {}: {}", url, e);
                return Discovery::NotFound(DiscoveryFailure::Request(e.to_string()));
            }
        };
        match discover_max_id(&html) {
            Some(id) => {
                info!("🔍 Latest article on {} is #{}", url, id);
                Discovery::Found(id)
            }
            None => Discovery::NotFound(DiscoveryFailure::NoMatches),
        }
    }

    async fn scrape_article(&self, url: &str) -> Option<ExtractedArticle> {
        debug!("Fetching article {}", url);
        let html = match self.fetch_html(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                return None;
            }
        };
        let article = extract_article(&html, url, Utc::now());
        if article.is_none() {
            warn!("No article content found at {}", url);
        }
        article
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::response::{Html as HtmlResponse, IntoResponse, Response};
    use axum::routing::get;
    use axum::Router;
    use chrono::TimeZone;

    const LISTING: &str = r#"
        <html><body>
          <a href="/zh/news/13497">older</a>
          <a href="https://www.aibase.com/zh/news/13502">newest</a>
          <a href="/zh/news/13499?from=home">middle</a>
          <a href="/zh/tools/99999">a tool, not news</a>
          <a>no href</a>
        </body></html>
    "#;

    fn article_page(with_date: bool, with_content: bool) -> String {
        let date = if with_date {
            r#"<span>AIbase</span><span>·</span><span>3</span><span>·</span><span>阅读</span><span>2024年11月27号 13:56</span>"#
        } else {
            ""
        };
        let content = if with_content {
            r#"<div class="post-content"><p>OpenAI发布了GPT-4 Turbo模型。</p><p>新模型支持128k上下文窗口。</p></div>"#
        } else {
            ""
        };
        format!(
            r#"<html><body><div class="pb-32">
                 <div class="flex flex-col">
                   <h1> GPT-4 Turbo 发布 </h1>
                   <div class="flex flex-wrap">{}</div>
                 </div>
                 {}
               </div></body></html>"#,
            date, content
        )
    }

    #[test]
    fn test_article_id_from_url() {
        assert_eq!(article_id_from_url("https://www.aibase.com/zh/news/13498"), Some(13498));
        assert_eq!(article_id_from_url("/zh/news/12?x=1"), Some(12));
        assert_eq!(article_id_from_url("/en/news/12"), None);
        assert_eq!(article_id_from_url("/zh/news/99999999999999999999999"), None);
    }

    #[test]
    fn test_discover_takes_maximum_not_first() {
        assert_eq!(discover_max_id(LISTING), Some(13502));
        assert_eq!(discover_max_id("<a href='/zh/tools/1'>x</a>"), None);
    }

    #[test]
    fn test_extract_article() {
        let now = Utc::now();
        let url = "https://www.aibase.com/zh/news/13498";
        let article = extract_article(&article_page(true, true), url, now).unwrap();

        assert_eq!(article.external_id, 13498);
        assert_eq!(article.title, "GPT-4 Turbo 发布");
        assert!(article.content.starts_with("OpenAI发布了GPT-4 Turbo模型。"));
        assert!(article.content.contains("128k"));
        assert_eq!(
            article.publication_date,
            PublishDate::Parsed(Utc.with_ymd_and_hms(2024, 11, 27, 5, 56, 0).unwrap())
        );
        assert_eq!(article.source_url, url);
    }

    #[test]
    fn test_missing_date_falls_back() {
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        let article = extract_article(&article_page(false, true), "/zh/news/1", now).unwrap();
        assert_eq!(article.publication_date, PublishDate::Fallback(now));
    }

    #[test]
    fn test_missing_required_fields_yield_none() {
        let now = Utc::now();
        assert!(extract_article(&article_page(true, false), "/zh/news/1", now).is_none());
        assert!(extract_article("<html><body><h1>t</h1></body></html>", "/zh/news/1", now).is_none());
        assert!(extract_article(
            r#"<div class="pb-32"><h1>  </h1><div class="post-content">x</div></div>"#,
            "/zh/news/1",
            now
        )
        .is_none());
        assert!(extract_article("", "/zh/news/1", now).is_none());
        assert!(extract_article(&article_page(true, true), "/somewhere/else", now).is_none());
    }

    #[test]
    fn test_invalid_site_url() {
        assert!(matches!(AibaseScraper::with_site_url("not a url"), Err(Error::InvalidUrl(_))));
        let scraper = AibaseScraper::with_site_url("https://www.aibase.com/").unwrap();
        assert_eq!(scraper.article_url(115), "https://www.aibase.com/zh/news/115");
    }

    async fn article(Path(id): Path<i64>) -> Response {
        match id {
            13498 => HtmlResponse(article_page(true, true)).into_response(),
            13499 => HtmlResponse(article_page(true, false)).into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn serve(listing: &'static str) -> String {
        let app = Router::new()
            .route("/zh/news/", get(move || async move { HtmlResponse(listing) }))
            .route("/zh/news/:id", get(article));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_discover_latest_id_over_http() {
        let site = serve(LISTING).await;
        let scraper = AibaseScraper::with_site_url(&site).unwrap();
        assert_eq!(scraper.discover_latest_id().await, Discovery::Found(13502));

        let empty = serve("<html><body>nothing here</body></html>").await;
        let scraper = AibaseScraper::with_site_url(&empty).unwrap();
        assert_eq!(
            scraper.discover_latest_id().await,
            Discovery::NotFound(DiscoveryFailure::NoMatches)
        );
    }

    #[tokio::test]
    async fn test_discover_request_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let scraper = AibaseScraper::with_site_url(&format!("http://{}", addr)).unwrap();
        assert!(matches!(
            scraper.discover_latest_id().await,
            Discovery::NotFound(DiscoveryFailure::Request(_))
        ));
    }

    #[tokio::test]
    async fn test_scrape_article_over_http() {
        let site = serve(LISTING).await;
        let scraper = AibaseScraper::with_site_url(&site).unwrap();

        let found = scraper.scrape_article(&scraper.article_url(13498)).await.unwrap();
        assert_eq!(found.external_id, 13498);
        assert_eq!(found.source_url, format!("{}/zh/news/13498", site));

        assert!(scraper.scrape_article(&scraper.article_url(13499)).await.is_none());
        assert!(scraper.scrape_article(&scraper.article_url(404)).await.is_none());
    }
}
