//! HTTP client for a local Ollama server. Wire shapes follow the Ollama
//! REST API: /api/generate, /api/embeddings, /api/chat, /api/tags.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use shopsense_core::config::OllamaConfig;

use crate::llm::{
    ChatMessage, GenerateOptions, LlmClient, RetryPolicy, Sleep, TokioSleep, CHAT_SENTINEL,
    GENERATION_SENTINEL,
};

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    embedding_dimension: usize,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightStatus {
    Ready { models: Vec<String> },
    ModelMissing { model: String, available: Vec<String> },
    Unreachable { error: String },
}

#[derive(Serialize)]
struct ModelOptions {
    num_predict: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: ModelOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f64>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ModelOptions,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TaggedModel>,
}

#[derive(Deserialize)]
struct TaggedModel {
    name: String,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embedding_dimension: config.embedding_dimension,
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_secs(config.retry_delay_secs),
            ),
            sleeper: Arc::new(TokioSleep),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleep>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Connectivity check against /api/tags. Callers treat a failure as a
    /// warning, not an error: every request path degrades on its own.
    pub async fn preflight(&self) -> PreflightStatus {
        let url = format!("{}/api/tags", self.base_url);
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(error) => return PreflightStatus::Unreachable { error: error.to_string() },
        };
        let tags: TagsResponse = match response.error_for_status() {
            Ok(response) => match response.json().await {
                Ok(tags) => tags,
                Err(error) => return PreflightStatus::Unreachable { error: error.to_string() },
            },
            Err(error) => return PreflightStatus::Unreachable { error: error.to_string() },
        };

        let available: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        let model_present = available
            .iter()
            .any(|name| name == &self.model || name.split(':').next() == Some(&self.model));
        if model_present {
            PreflightStatus::Ready { models: available }
        } else {
            warn!(
                model = %self.model,
                "model not present on the Ollama server; run `ollama pull {}`",
                self.model
            );
            PreflightStatus::ModelMissing { model: self.model.clone(), available }
        }
    }

    async fn post_with_retry<Req, Resp>(&self, endpoint: &str, request: &Req) -> Option<Resp>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        for attempt in 1..=self.retry.max_attempts {
            let outcome = async {
                self.http
                    .post(&url)
                    .json(request)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<Resp>()
                    .await
            }
            .await;

            match outcome {
                Ok(response) => return Some(response),
                Err(error) => {
                    warn!(
                        endpoint,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        %error,
                        "Ollama request failed"
                    );
                    if attempt < self.retry.max_attempts {
                        self.sleeper.sleep(self.retry.delay).await;
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> String {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system: options.system.as_deref(),
            stream: false,
            options: ModelOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
            },
        };
        match self.post_with_retry::<_, GenerateResponse>("/api/generate", &request).await {
            Some(response) => response.response,
            None => GENERATION_SENTINEL.to_string(),
        }
    }

    async fn embed(&self, text: &str) -> Vec<f64> {
        let request = EmbeddingsRequest { model: &self.model, prompt: text };
        match self.post_with_retry::<_, EmbeddingsResponse>("/api/embeddings", &request).await {
            Some(response) if !response.embedding.is_empty() => response.embedding,
            _ => vec![0.0; self.embedding_dimension],
        }
    }

    async fn chat(&self, messages: &[ChatMessage], options: &GenerateOptions) -> String {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ModelOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
            },
        };
        match self.post_with_retry::<_, ChatResponse>("/api/chat", &request).await {
            Some(response) => response.message.content,
            None => CHAT_SENTINEL.to_string(),
        }
    }
}
