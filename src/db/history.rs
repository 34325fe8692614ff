//! Conversation history repository
//!
//! SQLite-backed [`ConversationStore`]: append-ordered exchange records
//! keyed by identity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::cache::{ConversationStore, MessagePair};
use crate::{Error, Result};

/// History repository
#[derive(Clone)]
pub struct HistoryRepo {
    pool: DbPool,
}

impl HistoryRepo {
    /// Create a new history repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append completed pairs for an identity in a single transaction
    ///
    /// # Errors
    ///
    /// Returns error if the database write fails
    pub fn append_pairs(&self, identity: &str, pairs: &[MessagePair]) -> Result<()> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Storage(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| Error::Storage(e.to_string()))?;

        for pair in pairs {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO exchanges (id, identity, user_msg, agent_msg, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    &id,
                    identity,
                    &pair.user,
                    &pair.agent,
                    pair.timestamp.to_rfc3339()
                ],
            )
            .map_err(|e| Error::Storage(e.to_string()))?;
        }

        tx.commit().map_err(|e| Error::Storage(e.to_string()))?;

        tracing::debug!(identity = %identity, count = pairs.len(), "exchanges persisted");
        Ok(())
    }

    /// The most recent `n` pairs for an identity, chronological order
    ///
    /// # Errors
    ///
    /// Returns error if the database read fails
    pub fn last_n(&self, identity: &str, n: usize) -> Result<Vec<MessagePair>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT user_msg, agent_msg, created_at
                 FROM exchanges WHERE identity = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )
            .map_err(|e| Error::Storage(e.to_string()))?;

        #[allow(clippy::cast_possible_wrap)]
        let pairs: Vec<MessagePair> = stmt
            .query_map(rusqlite::params![identity, n as i64], |row| {
                Ok(MessagePair {
                    user: row.get(0)?,
                    agent: row.get(1)?,
                    timestamp: parse_datetime(&row.get::<_, String>(2)?),
                })
            })
            .map_err(|e| Error::Storage(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        Ok(pairs)
    }

    /// Count persisted exchanges for an identity
    ///
    /// # Errors
    ///
    /// Returns error if the database read fails
    pub fn exchange_count(&self, identity: &str) -> Result<usize> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Storage(e.to_string()))?;

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM exchanges WHERE identity = ?1",
                [identity],
                |row| row.get(0),
            )
            .map_err(|e| Error::Storage(e.to_string()))?;

        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl ConversationStore for HistoryRepo {
    async fn flush(&self, identity: &str, pairs: &[MessagePair]) -> Result<()> {
        self.append_pairs(identity, pairs)
    }

    async fn load_last_n(&self, identity: &str, n: usize) -> Result<Vec<MessagePair>> {
        self.last_n(identity, n)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
