//! External LLM collaborators: classification and summarization
//!
//! Both are narrow contracts behind traits so the pipeline can be wired
//! with mocks in tests and different providers in production.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::router::ClassificationWire;
use crate::{Error, Result};

/// Classification collaborator
///
/// Must return a fully structured result or an error, never a partially
/// typed one.
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    /// Classify a contextualized user prompt
    ///
    /// # Errors
    ///
    /// Returns [`Error::Classification`] on call failure or unparseable
    /// output
    async fn classify(&self, system_prompt: &str, user_prompt: &str)
    -> Result<ClassificationWire>;
}

/// Summarization collaborator
#[async_trait]
pub trait SummarizerClient: Send + Sync {
    /// Summarize `text` in about `max_words` words
    ///
    /// # Errors
    ///
    /// Returns [`Error::Summarization`] on call failure
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String>;
}

/// Response from an OpenAI-style chat completions API
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Structured summary payload requested from the model
#[derive(Deserialize)]
struct SummaryWire {
    summary: String,
}

/// OpenAI-style chat completions client implementing both collaborators
#[derive(Debug)]
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ChatClient {
    /// Create a new chat client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "API key required for classification and summarization".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// One chat completion round-trip, JSON-object output, returning the
    /// first choice's content
    async fn complete_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Classification(format!("chat API error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            e
        })?;

        result
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Classification("chat response had no choices".to_string()))
    }
}

#[async_trait]
impl ClassifierClient for ChatClient {
    async fn classify(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ClassificationWire> {
        let content = self
            .complete_json(system_prompt, user_prompt)
            .await
            .map_err(|e| match e {
                Error::Classification(_) => e,
                other => Error::Classification(other.to_string()),
            })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::Classification(format!("unparseable classification output: {e}"))
        })
    }
}

#[async_trait]
impl SummarizerClient for ChatClient {
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String> {
        let prompt = format!(
            "Summarize the following text in about {max_words} words. \
             Respond ONLY with a JSON object {{\"summary\": \"...\"}}.\n\n{text}"
        );

        let content = self
            .complete_json("You are a helpful assistant that summarizes text.", &prompt)
            .await
            .map_err(|e| Error::Summarization(e.to_string()))?;

        let wire: SummaryWire = serde_json::from_str(&content)
            .map_err(|e| Error::Summarization(format!("unparseable summary output: {e}")))?;

        tracing::info!(words = max_words, "summarization complete");
        Ok(wire.summary)
    }
}
