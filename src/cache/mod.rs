//! Per-identity conversation cache
//!
//! Buffers (user, agent) message pairs for one identity, serves a sliding
//! context window, and flushes to durable storage once the buffered pair
//! count reaches a threshold. A pair is only complete once both sides are
//! present; at most one user message is pending at a time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Flushed pairs kept in memory for context retrieval, per identity
const HISTORY_CAP: usize = 64;

/// One completed conversational turn
///
/// Immutable once created; ordering is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePair {
    pub user: String,
    pub agent: String,
    pub timestamp: DateTime<Utc>,
}

impl MessagePair {
    /// Create a pair stamped with the current time
    #[must_use]
    pub fn now(user: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            agent: agent.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Durable storage for conversation history, keyed by identity
///
/// Retries, if any, belong to the implementation, not the cache.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist completed pairs for an identity, append-ordered
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the write fails
    async fn flush(&self, identity: &str, pairs: &[MessagePair]) -> Result<()>;

    /// Load the most recent `n` pairs for an identity, chronological order
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the read fails
    async fn load_last_n(&self, identity: &str, n: usize) -> Result<Vec<MessagePair>>;
}

/// In-memory buffer of message pairs for a single identity
///
/// Not shared across identities; concurrent access for one identity must
/// be serialized by the caller (see [`crate::SessionManager`]).
pub struct ConversationCache {
    identity: String,
    /// Completed pairs not yet flushed
    pairs: Vec<MessagePair>,
    /// Already-persisted pairs retained for window retrieval
    history: Vec<MessagePair>,
    flush_threshold: usize,
    pending_user: Option<String>,
    store: Arc<dyn ConversationStore>,
}

impl ConversationCache {
    /// Create an empty cache for an identity
    ///
    /// A `flush_threshold` of zero is treated as one.
    #[must_use]
    pub fn new(
        identity: impl Into<String>,
        flush_threshold: usize,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            identity: identity.into(),
            pairs: Vec::new(),
            history: Vec::new(),
            flush_threshold: flush_threshold.max(1),
            pending_user: None,
            store,
        }
    }

    /// Preload previously persisted history (at session start)
    ///
    /// Seeded pairs are visible to [`Self::last_n_pairs`] but are never
    /// re-flushed.
    pub fn seed(&mut self, pairs: Vec<MessagePair>) {
        self.history = pairs;
        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_CAP;
            self.history.drain(..excess);
        }
    }

    /// Record an incoming user message
    ///
    /// If a user message is already pending (the previous turn never got
    /// an agent reply), the orphan is completed as a degraded pair with an
    /// empty agent side rather than silently dropped.
    pub fn add_user_message(&mut self, text: impl Into<String>) {
        if let Some(orphan) = self.pending_user.take() {
            tracing::warn!(
                identity = %self.identity,
                "user message arrived before previous turn completed; recording degraded pair"
            );
            self.pairs.push(MessagePair::now(orphan, ""));
        }
        self.pending_user = Some(text.into());
    }

    /// Record the agent reply, completing the pending pair
    ///
    /// An agent message with no pending user message is recorded with an
    /// empty user side (agent-initiated greetings). Triggers an automatic
    /// flush when the buffered pair count reaches the threshold.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the triggered flush fails; the
    /// buffered pairs are retained so the flush can be retried.
    pub async fn add_agent_message(&mut self, text: impl Into<String>) -> Result<()> {
        let user = self.pending_user.take().unwrap_or_else(|| {
            tracing::warn!(
                identity = %self.identity,
                "agent message with no pending user message; recording empty user side"
            );
            String::new()
        });
        self.pairs.push(MessagePair::now(user, text.into()));

        if self.pairs.len() >= self.flush_threshold {
            self.flush().await?;
        }
        Ok(())
    }

    /// The most recent `n` pairs in chronological order (oldest first)
    ///
    /// Non-destructive; draws from both flushed history and the current
    /// buffer.
    #[must_use]
    pub fn last_n_pairs(&self, n: usize) -> Vec<MessagePair> {
        let total = self.history.len() + self.pairs.len();
        let take = n.min(total);
        self.history
            .iter()
            .chain(self.pairs.iter())
            .skip(total - take)
            .cloned()
            .collect()
    }

    /// Persist all buffered pairs, then clear the buffer
    ///
    /// A no-op when the buffer is empty. The pending user message is never
    /// touched. On failure the buffer is retained so a retry re-attempts
    /// with the same data (at-least-once delivery to storage).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the store write fails
    pub async fn flush(&mut self) -> Result<()> {
        if self.pairs.is_empty() {
            return Ok(());
        }

        self.store.flush(&self.identity, &self.pairs).await?;
        tracing::debug!(
            identity = %self.identity,
            flushed = self.pairs.len(),
            "conversation cache flushed"
        );

        self.history.append(&mut self.pairs);
        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_CAP;
            self.history.drain(..excess);
        }
        Ok(())
    }

    /// Number of completed pairs not yet flushed
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Whether a user message is waiting for its agent reply
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_user.is_some()
    }

    /// The identity this cache belongs to
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }
}
