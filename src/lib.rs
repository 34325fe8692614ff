//! Scribe Gateway - Voice-assistant backend core
//!
//! This library provides the deterministic orchestration around a voice
//! assistant's external services:
//! - Per-identity conversation cache with bounded-window retrieval and
//!   threshold-based flush to durable storage
//! - Intent routing (utterance + recent context -> classified request)
//! - File resolution by name or recency and bounded content extraction
//! - Response assembly under a single outward contract
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Transport / session layer               │
//! │        (voice room, STT/TTS — external)              │
//! └────────────────────┬────────────────────────────────┘
//!                      │ on_user_utterance / on_session_end
//! ┌────────────────────▼────────────────────────────────┐
//! │                Scribe Gateway                        │
//! │  Router │ Locator │ Reader │ Processor │ Cache      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │      Classification / Summarization LLM APIs         │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod files;
pub mod llm;
pub mod processor;
pub mod router;
pub mod session;

pub use cache::{ConversationCache, ConversationStore, MessagePair};
pub use config::Config;
pub use db::{DbConn, DbPool, HistoryRepo};
pub use error::{Error, Result};
pub use files::{ContentReader, FileLocator, ResolvedFile};
pub use llm::{ChatClient, ClassifierClient, SummarizerClient};
pub use processor::{AgentResponse, ProcessorConfig, RequestProcessor, ResponseStatus};
pub use router::{
    CONFIDENCE_THRESHOLD, ClassificationWire, Intent, IntentRouter, RequestClassification,
};
pub use session::SessionManager;
