pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::Summarizer;
pub use storage::ArticleStorage;
pub use types::{
    Article, ArticlePage, ArticleQuery, ExtractedArticle, NewArticle, PublishDate,
    DEFAULT_PAGE_SIZE,
};
