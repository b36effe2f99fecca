use async_trait::async_trait;
use an_core::{Article, ArticlePage, ArticleQuery, ArticleStorage, Error, NewArticle, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::StorageBackend;

#[derive(Debug, Default)]
struct MemoryStore {
    articles: Vec<Article>,
    next_id: i64,
}

impl MemoryStore {
    fn insert_batch(&mut self, batch: &[NewArticle]) -> Result<Vec<Article>> {
        // Validate the whole batch first so a conflict leaves the store untouched.
        let mut seen: HashSet<&str> = self
            .articles
            .iter()
            .filter_map(|a| a.source_url.as_deref())
            .collect();
        for article in batch {
            if let Some(url) = article.source_url.as_deref() {
                if !seen.insert(url) {
                    return Err(Error::Database(format!(
                        "UNIQUE constraint failed: articles.source_url ({})",
                        url
                    )));
                }
            }
        }

        let now = Utc::now();
        let mut inserted = Vec::with_capacity(batch.len());
        for article in batch {
            self.next_id += 1;
            let stored = Article {
                id: self.next_id,
                external_id: article.external_id,
                title: article.title.clone(),
                content: article.content.clone(),
                summary: article.summary.clone(),
                source_url: article.source_url.clone(),
                publication_date: article.publication_date,
                created_at: now,
                updated_at: None,
                is_published: true,
                view_count: 0,
                category: article.category.clone(),
                tags: article.tags.clone(),
            };
            self.articles.push(stored.clone());
            inserted.push(stored);
        }
        Ok(inserted)
    }

    fn list(&self, query: &ArticleQuery) -> ArticlePage {
        let mut matching: Vec<&Article> = self.articles.iter().filter(|a| query.matches(a)).collect();
        matching.sort_by(|a, b| {
            b.publication_date
                .cmp(&a.publication_date)
                .then(b.id.cmp(&a.id))
        });
        ArticlePage {
            total: matching.len() as i64,
            items: matching
                .into_iter()
                .skip(query.skip.max(0) as usize)
                .take(query.limit.max(0) as usize)
                .cloned()
                .collect(),
        }
    }

    fn find_mut(&mut self, id: i64) -> Option<&mut Article> {
        self.articles.iter_mut().find(|a| a.id == id)
    }
}

/// Process-local storage, used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should always be available"
    }

    async fn open(_url: &str) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn latest_external_id(&self) -> Result<Option<i64>> {
        let store = self.store.read().await;
        Ok(store.articles.iter().filter_map(|a| a.external_id).max())
    }

    async fn exists_by_source_url(&self, url: &str) -> Result<bool> {
        let store = self.store.read().await;
        Ok(store.articles.iter().any(|a| a.source_url.as_deref() == Some(url)))
    }

    async fn exists_by_title_fragment(&self, fragment: &str) -> Result<bool> {
        let store = self.store.read().await;
        Ok(store.articles.iter().any(|a| a.title.contains(fragment)))
    }

    async fn insert_batch(&self, articles: &[NewArticle]) -> Result<Vec<Article>> {
        let mut store = self.store.write().await;
        store.insert_batch(articles)
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage> {
        let store = self.store.read().await;
        Ok(store.list(query))
    }

    async fn update_summary(&self, id: i64, summary: &str) -> Result<Option<Article>> {
        let mut store = self.store.write().await;
        Ok(store.find_mut(id).map(|article| {
            article.summary = Some(summary.to_string());
            article.updated_at = Some(Utc::now());
            article.clone()
        }))
    }

    async fn increment_view_count(&self, id: i64) -> Result<bool> {
        let mut store = self.store.write().await;
        Ok(store.find_mut(id).map(|article| article.view_count += 1).is_some())
    }

    async fn delete_article(&self, id: i64) -> Result<bool> {
        let mut store = self.store.write().await;
        let before = store.articles.len();
        store.articles.retain(|a| a.id != id);
        Ok(store.articles.len() != before)
    }
}
