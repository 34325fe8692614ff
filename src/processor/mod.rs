//! Request processing pipeline
//!
//! One synchronous pass per utterance: Routing -> Resolving ->
//! (Summarizing) -> Responding. Any stage failure short-circuits to an
//! `unsupported` response; nothing in here panics the turn.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::MessagePair;
use crate::files::{ContentReader, FileLocator, ResolvedFile};
use crate::llm::SummarizerClient;
use crate::router::{Intent, IntentRouter, RequestClassification};
use crate::Result;

/// Outcome of an agent turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Done,
    Unsupported,
    NeedInput,
}

/// The single outward contract of the request processor
///
/// Invariants: `raw_text` is set iff intent is `read raw text`; `summary`
/// is set iff intent is `read file and summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub status: ResponseStatus,
    pub message: String,
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl AgentResponse {
    fn unsupported(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Unsupported,
            message: message.into(),
            intent: Intent::Unsupported,
            raw_text: None,
            summary: None,
        }
    }

    fn need_input(message: impl Into<String>, intent: Intent) -> Self {
        Self {
            status: ResponseStatus::NeedInput,
            message: message.into(),
            intent,
            raw_text: None,
            summary: None,
        }
    }

    /// Check the outward invariants hold (used by tests)
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let raw_ok = self.raw_text.is_some()
            == (self.intent == Intent::ReadRawText && self.status == ResponseStatus::Done);
        let summary_ok = self.summary.is_some()
            == (self.intent == Intent::ReadFileAndSummary && self.status == ResponseStatus::Done);
        raw_ok && summary_ok
    }
}

/// Tunables for file resolution and content extraction
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Character budget for extracted file content
    pub max_chars: usize,
    /// Word budget for summaries
    pub summary_max_words: usize,
    /// Recency lookup window in days
    pub recency_window_days: i64,
    /// Extension filter for recency lookup
    pub recency_extension: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_chars: 8000,
            summary_max_words: 50,
            recency_window_days: 7,
            recency_extension: ".pdf".to_string(),
        }
    }
}

/// Orchestrates router, locator, reader and summarizer into one response
pub struct RequestProcessor {
    router: IntentRouter,
    locator: FileLocator,
    reader: ContentReader,
    summarizer: Arc<dyn SummarizerClient>,
    config: ProcessorConfig,
}

impl RequestProcessor {
    /// Create a processor with injected collaborators
    #[must_use]
    pub fn new(
        router: IntentRouter,
        locator: FileLocator,
        summarizer: Arc<dyn SummarizerClient>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            router,
            locator,
            reader: ContentReader::new(),
            summarizer,
            config,
        }
    }

    /// Process one utterance against the recent context window
    ///
    /// Never returns an error: every failure inside the pipeline becomes
    /// an `unsupported` response with a human-readable message.
    pub async fn process(&self, utterance: &str, context: &[MessagePair]) -> AgentResponse {
        // Routing
        let classification = match self.router.classify(utterance, context).await {
            Ok(classification) => classification,
            Err(e) => {
                tracing::warn!(error = %e, "classification failed");
                return AgentResponse::unsupported("Sorry, I could not understand that request.");
            }
        };

        if !classification.is_confident() {
            tracing::info!(
                intent = %classification.intent,
                confidence = classification.confidence,
                "confidence below threshold"
            );
            return AgentResponse::unsupported(
                "Request type unsupported or confidence too low.",
            );
        }

        match classification.intent {
            Intent::ReadRawText => self.read_file(&classification, false).await,
            Intent::ReadFileAndSummary => self.read_file(&classification, true).await,
            Intent::Summarize | Intent::Unsupported => {
                AgentResponse::unsupported("Request type unsupported or confidence too low.")
            }
        }
    }

    /// Resolving, optional Summarizing, and Responding stages
    async fn read_file(
        &self,
        classification: &RequestClassification,
        want_summary: bool,
    ) -> AgentResponse {
        let resolved = match self.resolve(classification) {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                return AgentResponse::need_input(
                    "Which file would you like me to read?",
                    classification.intent,
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "file resolution failed");
                return AgentResponse::unsupported(format!("I could not find that file: {e}"));
            }
        };

        tracing::info!(path = %resolved.full_path.display(), "file resolved");

        let content = match self.reader.read(&resolved.full_path, self.config.max_chars) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, path = %resolved.full_path.display(), "read failed");
                return AgentResponse::unsupported(format!(
                    "I could not read {}: {e}",
                    resolved.file_name
                ));
            }
        };

        if want_summary {
            match self
                .summarizer
                .summarize(&content, self.config.summary_max_words)
                .await
            {
                Ok(summary) => AgentResponse {
                    status: ResponseStatus::Done,
                    message: "File read and summarized successfully.".to_string(),
                    intent: Intent::ReadFileAndSummary,
                    raw_text: None,
                    summary: Some(summary),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "summarization failed");
                    AgentResponse::unsupported(format!(
                        "I could not summarize {}: {e}",
                        resolved.file_name
                    ))
                }
            }
        } else {
            AgentResponse {
                status: ResponseStatus::Done,
                message: "Read file successfully.".to_string(),
                intent: Intent::ReadRawText,
                raw_text: Some(content),
                summary: None,
            }
        }
    }

    /// Resolve by file name first, else by recency rank
    ///
    /// `Ok(None)` means the classification named no file at all.
    fn resolve(&self, classification: &RequestClassification) -> Result<Option<ResolvedFile>> {
        if let Some(name) = &classification.file_name {
            return self.locator.find_by_name(name).map(Some);
        }

        match classification.nth_file {
            // Rank zero is the full-list form, not a single file
            Some(0) | None => Ok(None),
            Some(rank) => self
                .locator
                .nth_recent(
                    rank,
                    self.config.recency_window_days,
                    &self.config.recency_extension,
                )
                .map(Some),
        }
    }
}
