//! Shared test utilities

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use scribe_gateway::{
    ClassificationWire, ClassifierClient, Error, Result, SummarizerClient,
};

/// Classifier that replays scripted wire results in order
pub struct ScriptedClassifier {
    script: Mutex<Vec<Result<ClassificationWire>>>,
}

impl ScriptedClassifier {
    #[must_use]
    pub fn new(script: Vec<Result<ClassificationWire>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
        })
    }
}

#[async_trait]
impl ClassifierClient for ScriptedClassifier {
    async fn classify(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<ClassificationWire> {
        let mut script = self.script.lock().unwrap();
        assert!(!script.is_empty(), "classifier script exhausted");
        script.remove(0)
    }
}

/// Summarizer that echoes a fixed summary, or fails
pub struct FixedSummarizer {
    pub summary: String,
    pub fail: bool,
}

impl FixedSummarizer {
    #[must_use]
    pub fn ok(summary: &str) -> Arc<Self> {
        Arc::new(Self {
            summary: summary.to_string(),
            fail: false,
        })
    }

    #[must_use]
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            summary: String::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl SummarizerClient for FixedSummarizer {
    async fn summarize(&self, _text: &str, _max_words: usize) -> Result<String> {
        if self.fail {
            return Err(Error::Summarization("summarizer offline".to_string()));
        }
        Ok(self.summary.clone())
    }
}

/// Build a wire classification with the given label, confidence, and slots
#[must_use]
pub fn wire(
    request_type: &str,
    confidence: f64,
    file_name: Option<&str>,
    nth_file: Option<usize>,
) -> ClassificationWire {
    ClassificationWire {
        request_type: request_type.to_string(),
        confidence_score: confidence,
        description: Some("scripted".to_string()),
        file_name: file_name.map(str::to_string),
        nth_file,
    }
}
