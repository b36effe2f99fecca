use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored news item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub external_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub source_url: Option<String>,
    pub publication_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub view_count: i64,
    pub category: Option<String>,
    pub tags: Option<String>,
}

impl Article {
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// An article ready to be inserted; storage assigns the id and bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub external_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub source_url: Option<String>,
    pub publication_date: DateTime<Utc>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

impl NewArticle {
    pub fn from_extracted(extracted: ExtractedArticle, summary: String) -> Self {
        Self {
            external_id: Some(extracted.external_id),
            title: extracted.title,
            content: extracted.content,
            summary: Some(summary),
            source_url: Some(extracted.source_url),
            publication_date: extracted.publication_date.timestamp(),
            category: None,
            tags: None,
        }
    }
}

/// Outcome of parsing a page's publish date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishDate {
    Parsed(DateTime<Utc>),
    /// No known format matched (or the page had no date); holds the time of extraction.
    Fallback(DateTime<Utc>),
}

impl PublishDate {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PublishDate::Parsed(ts) | PublishDate::Fallback(ts) => *ts,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PublishDate::Fallback(_))
    }
}

/// Fields pulled out of one article page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub external_id: i64,
    pub title: String,
    pub content: String,
    pub publication_date: PublishDate,
    pub source_url: String,
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Listing filter. Every set field narrows the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleQuery {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub skip: i64,
    pub limit: i64,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            keyword: None,
            category: None,
            tags: Vec::new(),
            start_date: None,
            end_date: None,
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ArticleQuery {
    /// In-process version of the filter, shared by backends that cannot push it down.
    pub fn matches(&self, article: &Article) -> bool {
        if let Some(keyword) = &self.keyword {
            let keyword = keyword.to_lowercase();
            if !article.title.to_lowercase().contains(&keyword)
                && !article.content.to_lowercase().contains(&keyword)
            {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if article.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        for tag in &self.tags {
            let tag = tag.to_lowercase();
            let has_tag = article
                .tags
                .as_deref()
                .map(|tags| tags.to_lowercase().contains(&tag))
                .unwrap_or(false);
            if !has_tag {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if article.publication_date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if article.publication_date > end {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticlePage {
    pub total: i64,
    pub items: Vec<Article>,
}
