use std::fmt;
use async_trait::async_trait;
use an_core::ExtractedArticle;

pub mod aibase;
pub mod dates;

pub use aibase::AibaseScraper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    pub name: &'static str,
    pub emoji: &'static str,
}

/// Why the listing page produced no article ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryFailure {
    /// The page loaded but no link matched the article pattern.
    NoMatches,
    /// The page could not be fetched or read.
    Request(String),
}

impl fmt::Display for DiscoveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryFailure::NoMatches => write!(f, "no article links found on listing page"),
            DiscoveryFailure::Request(message) => write!(f, "listing page request failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Found(i64),
    NotFound(DiscoveryFailure),
}

#[async_trait]
pub trait Scraper: Send + Sync {
    fn source_metadata(&self) -> SourceMetadata;

    /// Page URL of the article with the given site ID
    fn article_url(&self, id: i64) -> String;

    /// Highest article ID linked from the listing page
    async fn discover_latest_id(&self) -> Discovery;

    /// Fields of one article page. `None` means "skip this article", never a fatal error.
    async fn scrape_article(&self, url: &str) -> Option<ExtractedArticle>;
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use scraper::{ElementRef, Selector};

    /// Trimmed text of the first match under `root`, if it has any.
    pub fn select_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
        root.select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    }

    pub fn non_empty(text: Option<String>) -> Option<String> {
        text.filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_select_text() {
        let html = r#"
            <div class="title">  Test Title  </div>
            <div class="content"></div>
        "#;
        let document = Html::parse_document(html);
        let root = document.root_element();

        let title = Selector::parse(".title").unwrap();
        let content = Selector::parse(".content").unwrap();
        let missing = Selector::parse(".invalid").unwrap();

        assert_eq!(utils::select_text(root, &title).as_deref(), Some("Test Title"));
        assert_eq!(utils::select_text(root, &content).as_deref(), Some(""));
        assert_eq!(utils::non_empty(utils::select_text(root, &content)), None);
        assert_eq!(utils::select_text(root, &missing), None);
    }

    #[test]
    fn test_discovery_failure_messages() {
        assert_eq!(
            DiscoveryFailure::NoMatches.to_string(),
            "no article links found on listing page"
        );
        assert!(DiscoveryFailure::Request("timeout".to_string())
            .to_string()
            .contains("timeout"));
    }
}
