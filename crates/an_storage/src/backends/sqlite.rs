use async_trait::async_trait;
use an_core::{Article, ArticlePage, ArticleQuery, ArticleStorage, Error, NewArticle, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use tracing::{debug, error};
use crate::StorageBackend;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id INTEGER,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        summary TEXT,
        source_url TEXT UNIQUE,
        publication_date TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT,
        is_published INTEGER NOT NULL DEFAULT 1,
        view_count INTEGER NOT NULL DEFAULT 0,
        category TEXT,
        tags TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_publication_date ON articles (publication_date)",
    "CREATE INDEX IF NOT EXISTS idx_articles_external_id ON articles (external_id)",
];

const COLUMNS: &str = "id, external_id, title, content, summary, source_url, publication_date, \
     created_at, updated_at, is_published, view_count, category, tags";

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::Database(format!("{}: {}", context, e))
}

/// `%text%` with LIKE wildcards in `text` matched literally; pair with `ESCAPE '\'`.
fn contains_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// Fixed-width so that text comparison in SQL orders like time.
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date '{}': {}", value, e)))
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let updated_at: Option<String> = row.get("updated_at");
    Ok(Article {
        id: row.get("id"),
        external_id: row.get("external_id"),
        title: row.get("title"),
        content: row.get("content"),
        summary: row.get("summary"),
        source_url: row.get("source_url"),
        publication_date: parse_ts(row.get::<&str, _>("publication_date"))?,
        created_at: parse_ts(row.get::<&str, _>("created_at"))?,
        updated_at: updated_at.as_deref().map(parse_ts).transpose()?,
        is_published: row.get("is_published"),
        view_count: row.get("view_count"),
        category: row.get("category"),
        tags: row.get("tags"),
    })
}

/// Start a query over `articles` with every filter of `query` applied.
fn filtered<'a>(select: &str, query: &ArticleQuery) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM articles WHERE 1 = 1", select));
    if let Some(keyword) = &query.keyword {
        let pattern = contains_pattern(&keyword.to_lowercase());
        builder
            .push(" AND (LOWER(title) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(content) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(category) = &query.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    for tag in &query.tags {
        builder
            .push(" AND LOWER(COALESCE(tags, '')) LIKE ")
            .push_bind(contains_pattern(&tag.to_lowercase()))
            .push(" ESCAPE '\\'");
    }
    if let Some(start) = &query.start_date {
        builder.push(" AND publication_date >= ").push_bind(format_ts(start));
    }
    if let Some(end) = &query.end_date {
        builder.push(" AND publication_date <= ").push_bind(format_ts(end));
    }
    builder
}

#[derive(Debug, Clone)]
pub struct SQLiteStorage {
    pool: SqlitePool,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be reachable at DATABASE_URL (e.g. sqlite:articles.db)"
    }

    async fn open(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error("Invalid database URL"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;
        Self::with_pool(pool).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(&format!("sqlite:{}", db_path.display())).await
    }

    /// Wrap an existing pool, creating the schema if needed.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(db_error("Failed to create schema"))?;
        }
        Ok(Self { pool })
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn latest_external_id(&self) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(external_id) FROM articles")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to read latest article id"))
    }

    async fn exists_by_source_url(&self, url: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM articles WHERE source_url = ?)")
            .bind(url)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to check source url"))
    }

    async fn exists_by_title_fragment(&self, fragment: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM articles WHERE title LIKE ? ESCAPE '\\')")
            .bind(contains_pattern(fragment))
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to check title"))
    }

    async fn insert_batch(&self, articles: &[NewArticle]) -> Result<Vec<Article>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;
        let now = Utc::now();
        let mut inserted = Vec::with_capacity(articles.len());

        for article in articles {
            let result = sqlx::query(
                r#"
                INSERT INTO articles
                (external_id, title, content, summary, source_url, publication_date, created_at, category, tags)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(article.external_id)
            .bind(&article.title)
            .bind(&article.content)
            .bind(article.summary.as_deref())
            .bind(article.source_url.as_deref())
            .bind(format_ts(&article.publication_date))
            .bind(format_ts(&now))
            .bind(article.category.as_deref())
            .bind(article.tags.as_deref())
            .execute(&mut *tx)
            .await;

            match result {
                Ok(done) => inserted.push(Article {
                    id: done.last_insert_rowid(),
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
                }),
                Err(e) => {
                    error!("Insert of '{}' failed, rolling back {} staged rows", article.title, inserted.len());
                    tx.rollback().await.map_err(db_error("Failed to roll back"))?;
                    return Err(db_error("Failed to store article")(e));
                }
            }
        }

        tx.commit().await.map_err(db_error("Failed to commit"))?;
        debug!("Committed {} articles", inserted.len());
        Ok(inserted)
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query(&format!("SELECT {} FROM articles WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get article"))?;
        row.as_ref().map(row_to_article).transpose()
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage> {
        let total: i64 = filtered("COUNT(*)", query)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count articles"))?;

        let mut builder = filtered(COLUMNS, query);
        builder
            .push(" ORDER BY publication_date DESC, id DESC LIMIT ")
            .push_bind(query.limit.max(0))
            .push(" OFFSET ")
            .push_bind(query.skip.max(0));
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list articles"))?;

        let items = rows.iter().map(row_to_article).collect::<Result<Vec<_>>>()?;
        Ok(ArticlePage { total, items })
    }

    async fn update_summary(&self, id: i64, summary: &str) -> Result<Option<Article>> {
        let done = sqlx::query("UPDATE articles SET summary = ?, updated_at = ? WHERE id = ?")
            .bind(summary)
            .bind(format_ts(&Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update summary"))?;
        if done.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_article(id).await
    }

    async fn increment_view_count(&self, id: i64) -> Result<bool> {
        let done = sqlx::query("UPDATE articles SET view_count = view_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to increment view count"))?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete_article(&self, id: i64) -> Result<bool> {
        let done = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete article"))?;
        Ok(done.rows_affected() > 0)
    }
}
