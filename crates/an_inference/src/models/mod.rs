use std::sync::Arc;
use an_core::{Error, Result, Summarizer};
use crate::InferenceConfig;

pub mod chat;
pub mod dummy;

pub use chat::ChatCompletionModel;
pub use dummy::DummyModel;

pub const AVAILABLE_MODELS: &[&str] = &["chat", "dummy"];

/// Build the summarizer named by `config.provider`.
pub fn create_model(config: &InferenceConfig) -> Result<Arc<dyn Summarizer>> {
    match config.provider.as_str() {
        "chat" | "zhipu" | "openai" => Ok(Arc::new(ChatCompletionModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyModel)),
        other => Err(Error::Config(format!(
            "Unknown model provider '{}'. Available: {}",
            other,
            AVAILABLE_MODELS.join(", ")
        ))),
    }
}
