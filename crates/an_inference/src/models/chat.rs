use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use an_core::{Error, Result, Summarizer};
use std::fmt;
use tracing::{debug, info};
use crate::prompt::{self, SYSTEM_PROMPT};
use crate::retry::{with_retry, RetryPolicy};
use crate::InferenceConfig;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    top_p: f32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Summarizer backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl ChatCompletionModel {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("ZHIPU_API_KEY is required for summarization".to_string()))?;
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            retry: config.retry,
        })
    }

    async fn request_summary(&self, content: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT.to_string() },
                ChatMessage { role: "user", content: prompt::user_message(content) },
            ],
            top_p: prompt::TOP_P,
            temperature: prompt::TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(Error::Unavailable(format!("{}: {}", status, excerpt(&body))));
        }
        if !status.is_success() {
            return Err(Error::Inference(format!("{}: {}", status, excerpt(&body))));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Inference(format!("Malformed completion response: {}", e)))?;
        let summary = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .unwrap_or_default();
        if summary.is_empty() {
            return Err(Error::Inference("Completion contained no summary".to_string()));
        }
        Ok(summary)
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(200).collect()
}

impl fmt::Debug for ChatCompletionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl Summarizer for ChatCompletionModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, content: &str) -> Result<String> {
        debug!("🤖 Requesting summary for {} chars", content.chars().count());
        let summary = with_retry(&self.retry, "Summary request", || self.request_summary(content)).await?;
        info!("✨ Summary generated: {}", excerpt(&summary));
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone)]
    struct Fixture {
        hits: Arc<AtomicUsize>,
        status: AxumStatus,
    }

    async fn completions(
        State(fixture): State<Fixture>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        fixture.hits.fetch_add(1, Ordering::SeqCst);
        if fixture.status != AxumStatus::OK {
            return (fixture.status, Json(json!({ "error": "nope" })));
        }
        assert_eq!(headers["authorization"], "Bearer test-key");
        assert_eq!(body["model"], "glm-4-flash");
        assert_eq!(body["top_p"], json!(0.7));
        assert_eq!(body["temperature"], json!(0.1));
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.starts_with("文章内容："));
        (
            AxumStatus::OK,
            Json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "  🚀 OpenAI 发布 GPT-4 Turbo，降低成本。 " } }]
            })),
        )
    }

    async fn serve(status: AxumStatus) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/chat/completions", post(completions))
            .with_state(Fixture { hits: hits.clone(), status });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }

    fn config(base_url: String) -> InferenceConfig {
        InferenceConfig {
            api_key: Some("test-key".to_string()),
            base_url,
            retry: RetryPolicy {
                max_attempts: 3,
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(10),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_model_requires_api_key() {
        let result = ChatCompletionModel::new(&InferenceConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));

        let blank = InferenceConfig { api_key: Some("  ".to_string()), ..Default::default() };
        assert!(ChatCompletionModel::new(&blank).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let model = ChatCompletionModel::new(&config("http://localhost".to_string())).unwrap();
        let debug = format!("{:?}", model);
        assert!(!debug.contains("test-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_summarize_sends_fixed_prompt() {
        let (url, hits) = serve(AxumStatus::OK).await;
        let model = ChatCompletionModel::new(&config(url)).unwrap();

        let summary = model.summarize("OpenAI发布了GPT-4 Turbo模型").await.unwrap();
        assert_eq!(summary, "🚀 OpenAI 发布 GPT-4 Turbo，降低成本。");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_three_times() {
        let (url, hits) = serve(AxumStatus::SERVICE_UNAVAILABLE).await;
        let model = ChatCompletionModel::new(&config(url)).unwrap();

        let err = model.summarize("正文").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let (url, hits) = serve(AxumStatus::UNAUTHORIZED).await;
        let model = ChatCompletionModel::new(&config(url)).unwrap();

        let err = model.summarize("正文").await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let model = ChatCompletionModel::new(&config(format!("http://{}", addr))).unwrap();
        let err = model.summarize("正文").await.unwrap_err();
        assert!(err.is_transient());
    }
}
