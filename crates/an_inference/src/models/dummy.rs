use std::fmt;
use an_core::{Error, Result, Summarizer};

const SUMMARY_CHARS: usize = 80;

/// Offline summarizer: the first sentence of the body, cut to 80 characters.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

#[async_trait::async_trait]
impl Summarizer for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn summarize(&self, content: &str) -> Result<String> {
        let first_sentence = content
            .split(|c: char| matches!(c, '。' | '！' | '？' | '.' | '!' | '?' | '\n'))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .ok_or_else(|| Error::Inference("Nothing to summarize".to_string()))?;
        Ok(format!("📰 {}", first_sentence.chars().take(SUMMARY_CHARS).collect::<String>()))
    }
}
