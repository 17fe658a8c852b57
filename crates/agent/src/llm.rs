//! Model-client seam shared by every agent. Calls never surface transport
//! errors: after retries are exhausted the client degrades to a sentinel
//! reply (or a zero embedding) so a dead model process cannot take the
//! recommendation pipeline down with it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const GENERATION_SENTINEL: &str =
    "[Error: Could not generate response. Make sure Ollama is running with the correct model.]";
pub const CHAT_SENTINEL: &str =
    "[Error: Could not generate chat response. Make sure Ollama is running with the correct model.]";

/// True when a reply is one of the degraded-mode sentinels rather than
/// model output.
pub fn is_sentinel(reply: &str) -> bool {
    reply == GENERATION_SENTINEL || reply == CHAT_SENTINEL
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { system: None, max_tokens: 1024, temperature: 0.7 }
    }
}

impl GenerateOptions {
    pub fn with_system(system: impl Into<String>) -> Self {
        Self { system: Some(system.into()), ..Self::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay: Duration::from_secs(2) }
    }
}

/// Injectable clock so retry behavior is testable without waiting out
/// real delays.
#[async_trait]
pub trait Sleep: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleep;

#[async_trait]
impl Sleep for TokioSleep {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-turn completion. Returns [`GENERATION_SENTINEL`] when the
    /// model cannot be reached.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> String;

    /// Embedding for `text`. Returns a zero vector of the configured
    /// dimension when the model cannot be reached.
    async fn embed(&self, text: &str) -> Vec<f64>;

    /// Multi-turn chat completion. Returns [`CHAT_SENTINEL`] when the
    /// model cannot be reached.
    async fn chat(&self, messages: &[ChatMessage], options: &GenerateOptions) -> String;
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{ChatMessage, GenerateOptions, LlmClient};

    /// Scripted client for agent tests: replies are popped from a queue,
    /// prompts are recorded for assertions.
    pub struct MockLlm {
        replies: Mutex<VecDeque<String>>,
        pub prompts: Mutex<Vec<String>>,
        embedding: Vec<f64>,
    }

    impl MockLlm {
        pub fn with_replies(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
                embedding: vec![0.1, 0.2, 0.3],
            }
        }

        pub async fn recorded_prompts(&self) -> Vec<String> {
            self.prompts.lock().await.clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlm {
        async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> String {
            self.prompts.lock().await.push(prompt.to_string());
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| super::GENERATION_SENTINEL.to_string())
        }

        async fn embed(&self, _text: &str) -> Vec<f64> {
            self.embedding.clone()
        }

        async fn chat(&self, messages: &[ChatMessage], _options: &GenerateOptions) -> String {
            if let Some(last) = messages.last() {
                self.prompts.lock().await.push(last.content.clone());
            }
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| super::CHAT_SENTINEL.to_string())
        }
    }
}
