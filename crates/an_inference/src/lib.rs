pub mod models;
pub mod pool;
pub mod prompt;
pub mod retry;

pub use models::{create_model, ChatCompletionModel, DummyModel};
pub use pool::{SummaryPool, DEFAULT_WORKERS};
pub use retry::{with_retry, RetryPolicy};

pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
pub const DEFAULT_MODEL: &str = "glm-4-flash";

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// `chat` for the completion API, `dummy` for offline runs
    pub provider: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub retry: RetryPolicy,
    pub workers: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: "chat".to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Summarizer for `config`, wrapped in its bounded worker pool.
pub fn create_pooled_model(config: &InferenceConfig) -> an_core::Result<std::sync::Arc<dyn an_core::Summarizer>> {
    let model = create_model(config)?;
    Ok(std::sync::Arc::new(SummaryPool::new(model, config.workers)))
}

pub mod prelude {
    pub use super::{create_model, create_pooled_model, InferenceConfig, RetryPolicy, SummaryPool};
    pub use an_core::{Error, Result, Summarizer};
}
