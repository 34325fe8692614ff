//! Session management: the two entry points exposed to the transport layer
//!
//! One cache per identity, serialized behind a per-identity lock so a
//! flush never observes a partially-appended pair. Sessions for different
//! identities are independent and may run concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cache::{ConversationCache, ConversationStore};
use crate::processor::{AgentResponse, RequestProcessor};
use crate::Result;

/// Per-identity session registry around the request pipeline
pub struct SessionManager {
    processor: RequestProcessor,
    store: Arc<dyn ConversationStore>,
    caches: Mutex<HashMap<String, Arc<Mutex<ConversationCache>>>>,
    flush_threshold: usize,
    /// Number of recent pairs offered to the router as context
    context_window: usize,
}

impl SessionManager {
    /// Create a session manager
    #[must_use]
    pub fn new(
        processor: RequestProcessor,
        store: Arc<dyn ConversationStore>,
        flush_threshold: usize,
        context_window: usize,
    ) -> Self {
        Self {
            processor,
            store,
            caches: Mutex::new(HashMap::new()),
            flush_threshold,
            context_window,
        }
    }

    /// Process one recognized utterance for an identity
    ///
    /// The whole turn holds the identity's cache lock: context retrieval,
    /// pipeline, and the append of both sides of the exchange. Failed
    /// pipelines still record the exchange, so the cache reflects what the
    /// user heard.
    ///
    /// # Errors
    ///
    /// The only error returned is [`crate::Error::Storage`] from a
    /// triggered flush; conversational failures are encoded inside the
    /// returned [`AgentResponse`].
    pub async fn on_user_utterance(&self, identity: &str, text: &str) -> Result<AgentResponse> {
        let cache = self.cache_for(identity).await?;
        let mut cache = cache.lock().await;

        let context = cache.last_n_pairs(self.context_window);
        let response = self.processor.process(text, &context).await;

        cache.add_user_message(text);
        cache.add_agent_message(response.message.clone()).await?;

        Ok(response)
    }

    /// End an identity's session: terminal flush, then drop the cache
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the final flush fails; the
    /// session entry is retained in that case so the flush can be retried.
    pub async fn on_session_end(&self, identity: &str) -> Result<()> {
        let entry = {
            let caches = self.caches.lock().await;
            caches.get(identity).cloned()
        };

        let Some(entry) = entry else {
            tracing::debug!(identity = %identity, "session end for unknown identity");
            return Ok(());
        };

        entry.lock().await.flush().await?;

        let mut caches = self.caches.lock().await;
        caches.remove(identity);
        tracing::info!(identity = %identity, "session ended");
        Ok(())
    }

    /// Get or create the cache for an identity, seeding from storage on
    /// first use
    async fn cache_for(&self, identity: &str) -> Result<Arc<Mutex<ConversationCache>>> {
        {
            let caches = self.caches.lock().await;
            if let Some(cache) = caches.get(identity) {
                return Ok(Arc::clone(cache));
            }
        }

        // Seed outside the registry lock; a racing creator for the same
        // identity is resolved below by first-insert-wins.
        let seeded = self
            .store
            .load_last_n(identity, self.context_window)
            .await?;

        let mut caches = self.caches.lock().await;
        if let Some(cache) = caches.get(identity) {
            return Ok(Arc::clone(cache));
        }

        let mut cache =
            ConversationCache::new(identity, self.flush_threshold, Arc::clone(&self.store));
        cache.seed(seeded);
        tracing::info!(identity = %identity, "session started");

        let cache = Arc::new(Mutex::new(cache));
        caches.insert(identity.to_string(), Arc::clone(&cache));
        Ok(cache)
    }
}
