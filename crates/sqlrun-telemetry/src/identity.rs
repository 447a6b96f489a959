//! Session and correlation identity.
//!
//! Both tokens are `<epoch-millis>-<9 base36 chars>`; session ids carry a
//! `session-` prefix. Uniqueness is probabilistic: two tokens minted in the
//! same millisecond collide only if their random suffixes match.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlrun_core::storage::{Storage, StorageError};
use tracing::debug;

pub const SESSION_KEY: &str = "sessionId";

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn token() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{suffix}", chrono::Utc::now().timestamp_millis())
}

/// Links the start and end log entries of one outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        CorrelationId(token())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn generate_correlation_id() -> CorrelationId {
    CorrelationId::generate()
}

/// Groups every entry logged during one console session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(format!("session-{}", token()))
    }

    /// Return the id stored under [`SESSION_KEY`], minting and storing one on
    /// first use. The stored value is never replaced afterwards.
    pub fn get_or_create(storage: &dyn Storage) -> Result<Self, StorageError> {
        if let Some(existing) = storage.get_item(SESSION_KEY)? {
            if !existing.trim().is_empty() {
                return Ok(SessionId(existing));
            }
        }
        let id = SessionId::generate();
        storage.set_item(SESSION_KEY, id.as_str())?;
        debug!(session_id = %id, "created session id");
        Ok(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlrun_core::storage::MemoryStorage;
    use std::collections::HashSet;

    fn assert_token_shape(token: &str) {
        let (millis, suffix) = token.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn correlation_ids_have_expected_shape_and_differ() {
        let ids: HashSet<_> = (0..200).map(|_| CorrelationId::generate()).collect();
        assert_eq!(ids.len(), 200);
        for id in &ids {
            assert_token_shape(id.as_str());
        }
    }

    #[test]
    fn session_id_is_created_once_per_storage() {
        let storage = MemoryStorage::new();
        let first = SessionId::get_or_create(&storage).unwrap();
        let second = SessionId::get_or_create(&storage).unwrap();
        assert_eq!(first, second);
        let token = first.as_str().strip_prefix("session-").unwrap();
        assert_token_shape(token);

        let other_tab = MemoryStorage::new();
        assert_ne!(SessionId::get_or_create(&other_tab).unwrap(), first);
    }
}
