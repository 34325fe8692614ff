//! Intent routing: utterance + recent context -> classified request
//!
//! Pure orchestration around the external classification collaborator; no
//! local heuristic fallback. The raw wire result is validated at the
//! boundary so partially-typed classifications never propagate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::MessagePair;
use crate::llm::ClassifierClient;
use crate::{Error, Result};

/// Minimum confidence for an intent to be acted upon
///
/// Below this the request is treated as unsupported regardless of label.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// System prompt for the classification collaborator
const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are an expert at classifying user requests into categories:

1. "read raw text"
    - When the user wants to view a file's raw content.
    - NOT requesting any summary.

2. "read file and summary"
    - When the user asks to extract, understand, summarize, or explain
      the content of a file.

3. "unsupported"
    - Use this for ANY request that is NOT "read raw text" or "read file and summary".

Respond ONLY with a JSON object matching the schema:
{
    "request_type": "...",
    "confidence_score": float,
    "description": "...",
    "file_name": "..." (if the user requests reading a specific file),
    "nth_file": int (if the user requests reading the nth most recent file)
}"#;

/// User intent understood from an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "summarize")]
    Summarize,
    #[serde(rename = "read raw text")]
    ReadRawText,
    #[serde(rename = "read file and summary")]
    ReadFileAndSummary,
    #[serde(rename = "unsupported")]
    Unsupported,
}

impl Intent {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "summarize" => Some(Self::Summarize),
            "read raw text" => Some(Self::ReadRawText),
            "read file and summary" => Some(Self::ReadFileAndSummary),
            "unsupported" => Some(Self::Unsupported),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Summarize => "summarize",
            Self::ReadRawText => "read raw text",
            Self::ReadFileAndSummary => "read file and summary",
            Self::Unsupported => "unsupported",
        };
        f.write_str(label)
    }
}

/// Raw classification result as returned by the collaborator
///
/// Untrusted until validated into a [`RequestClassification`].
#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationWire {
    pub request_type: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub nth_file: Option<usize>,
}

/// Validated classification of one utterance
#[derive(Debug, Clone)]
pub struct RequestClassification {
    pub intent: Intent,
    /// In [0, 1]
    pub confidence: f64,
    pub description: String,
    pub file_name: Option<String>,
    pub nth_file: Option<usize>,
}

impl RequestClassification {
    /// Whether the classified intent clears the confidence gate
    #[must_use]
    pub fn is_confident(&self) -> bool {
        self.confidence >= CONFIDENCE_THRESHOLD
    }
}

impl TryFrom<ClassificationWire> for RequestClassification {
    type Error = Error;

    fn try_from(wire: ClassificationWire) -> Result<Self> {
        let intent = Intent::from_label(&wire.request_type).ok_or_else(|| {
            Error::Classification(format!("unknown request type '{}'", wire.request_type))
        })?;

        if !(0.0..=1.0).contains(&wire.confidence_score) {
            return Err(Error::Classification(format!(
                "confidence score {} outside [0, 1]",
                wire.confidence_score
            )));
        }

        Ok(Self {
            intent,
            confidence: wire.confidence_score,
            description: wire.description.unwrap_or_default(),
            file_name: wire.file_name.filter(|name| !name.is_empty()),
            nth_file: wire.nth_file,
        })
    }
}

/// Classifies utterances with recent conversation context
pub struct IntentRouter {
    classifier: Arc<dyn ClassifierClient>,
}

impl IntentRouter {
    /// Create a router around a classification collaborator
    #[must_use]
    pub fn new(classifier: Arc<dyn ClassifierClient>) -> Self {
        Self { classifier }
    }

    /// Classify an utterance given the recent context window
    ///
    /// # Errors
    ///
    /// Returns [`Error::Classification`] if the collaborator call fails or
    /// its result does not validate
    pub async fn classify(
        &self,
        utterance: &str,
        context_pairs: &[MessagePair],
    ) -> Result<RequestClassification> {
        let prompt = contextualize(utterance, context_pairs);
        tracing::debug!(context_pairs = context_pairs.len(), "routing request");

        let wire = self
            .classifier
            .classify(CLASSIFY_SYSTEM_PROMPT, &prompt)
            .await?;
        let classification = RequestClassification::try_from(wire)?;

        tracing::info!(
            intent = %classification.intent,
            confidence = classification.confidence,
            "request classified"
        );
        Ok(classification)
    }
}

/// Render the context window as alternating turns, then the new utterance
fn contextualize(utterance: &str, context_pairs: &[MessagePair]) -> String {
    let mut context_block = String::new();
    for pair in context_pairs {
        context_block.push_str(&format!(
            "User: {}\nAssistant: {}\n",
            pair.user, pair.agent
        ));
    }

    format!(
        "Here is the conversation history:\n{context_block}\nNow classify this new user request: {utterance}"
    )
}
