use async_trait::async_trait;
use crate::types::{Article, ArticlePage, ArticleQuery, NewArticle};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Highest site article ID stored so far, if any
    async fn latest_external_id(&self) -> Result<Option<i64>>;

    async fn exists_by_source_url(&self, url: &str) -> Result<bool>;

    /// Legacy duplicate check: any title containing `fragment`.
    async fn exists_by_title_fragment(&self, fragment: &str) -> Result<bool>;

    /// Insert all articles as one unit. Either every row is stored or none is.
    async fn insert_batch(&self, articles: &[NewArticle]) -> Result<Vec<Article>>;

    async fn get_article(&self, id: i64) -> Result<Option<Article>>;

    async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage>;

    async fn update_summary(&self, id: i64, summary: &str) -> Result<Option<Article>>;

    async fn increment_view_count(&self, id: i64) -> Result<bool>;

    async fn delete_article(&self, id: i64) -> Result<bool>;
}
