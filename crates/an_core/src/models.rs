use async_trait::async_trait;
use crate::Result;

#[async_trait]
pub trait Summarizer: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Produce a short synopsis of an article body
    async fn summarize(&self, content: &str) -> Result<String>;
}
