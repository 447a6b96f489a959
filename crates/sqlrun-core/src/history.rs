//! Bounded query history.
//!
//! The whole list lives under one storage key as a JSON array, newest first.
//! Every mutation reads the list, edits it in memory and writes it back in a
//! single `set_item`, so a reader sees either the old or the new list. Two
//! processes writing the same storage are not merged: the last write wins.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::{Storage, StorageError};

pub const HISTORY_KEY: &str = "sqlQueryHistory";
pub const MAX_HISTORY_QUERIES: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub query: String,
    #[serde(serialize_with = "ser_millis", deserialize_with = "de_rfc3339")]
    pub timestamp: DateTime<Utc>,
}

fn ser_millis<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn de_rfc3339<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("query history codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub struct QueryHistory {
    storage: Arc<dyn Storage>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for QueryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryHistory").finish_non_exhaustive()
    }
}

impl QueryHistory {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        QueryHistory {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Read and decode the stored list. An absent key is an empty history.
    pub fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        match self.storage.get_item(HISTORY_KEY)? {
            Some(raw) => {
                let stored: Vec<HistoryEntry> = serde_json::from_str(&raw)?;
                // Another writer may have left duplicates; the newest copy wins.
                let mut seen = HashSet::new();
                let mut entries: Vec<HistoryEntry> = stored
                    .into_iter()
                    .filter(|entry| seen.insert(entry.query.trim().to_string()))
                    .collect();
                entries.truncate(MAX_HISTORY_QUERIES);
                Ok(entries)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Stored queries, newest first. Unreadable history reads as empty.
    pub fn get_history(&self) -> Vec<HistoryEntry> {
        match self.load() {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "failed to read query history");
                Vec::new()
            }
        }
    }

    /// Record `query` as the most recent entry.
    ///
    /// Blank input is ignored. An entry with the same trimmed text moves to the
    /// front instead of being duplicated, and the oldest entries beyond
    /// [`MAX_HISTORY_QUERIES`] are dropped. Failures are logged, never raised.
    pub fn add_query(&self, query: &str) {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return;
        }
        if let Err(err) = self.try_add(trimmed) {
            warn!(error = %err, "failed to add query to history");
        }
    }

    fn try_add(&self, trimmed: &str) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock();
        let history = self.get_history();

        let now = Utc::now();
        let mut id = now.timestamp_millis();
        if let Some(newest) = history.first() {
            // Several inserts within one millisecond still get distinct,
            // increasing ids.
            id = id.max(newest.id + 1);
        }
        let entry = HistoryEntry {
            id,
            query: trimmed.to_string(),
            timestamp: now,
        };

        let mut updated = Vec::with_capacity(MAX_HISTORY_QUERIES);
        updated.push(entry);
        updated.extend(
            history
                .into_iter()
                .filter(|existing| existing.query.trim() != trimmed),
        );
        updated.truncate(MAX_HISTORY_QUERIES);

        let raw = serde_json::to_string(&updated)?;
        self.storage.set_item(HISTORY_KEY, &raw)?;
        debug!(id, len = updated.len(), "query history updated");
        Ok(())
    }

    /// Drop the stored history. Clearing an empty history does nothing.
    pub fn clear_history(&self) {
        let _guard = self.write_lock.lock();
        if let Err(err) = self.storage.remove_item(HISTORY_KEY) {
            warn!(error = %err, "failed to clear query history");
        }
    }
}
