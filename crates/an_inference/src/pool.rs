use std::sync::Arc;
use async_trait::async_trait;
use an_core::{Error, Result, Summarizer};
use tokio::sync::Semaphore;

pub const DEFAULT_WORKERS: usize = 3;

/// Runs summaries on spawned tasks, at most `workers` at a time.
///
/// Each call gets its own task, so a slow completion never holds up the
/// caller's executor thread; the semaphore bounds outbound API load.
#[derive(Debug, Clone)]
pub struct SummaryPool {
    model: Arc<dyn Summarizer>,
    permits: Arc<Semaphore>,
}

impl SummaryPool {
    pub fn new(model: Arc<dyn Summarizer>, workers: usize) -> Self {
        Self {
            model,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }
}

#[async_trait]
impl Summarizer for SummaryPool {
    fn name(&self) -> &str {
        self.model.name()
    }

    async fn summarize(&self, content: &str) -> Result<String> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::External(e.into()))?;
        let model = self.model.clone();
        let content = content.to_string();
        tokio::spawn(async move {
            let _permit = permit;
            model.summarize(&content).await
        })
        .await
        .map_err(|e| Error::External(e.into()))?
    }
}
