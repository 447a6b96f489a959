use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::identity::{CorrelationId, SessionId};
use crate::level::LogLevel;

/// Keys owned by the entry itself; caller context may not overwrite them.
pub(crate) const RESERVED_KEYS: [&str; 8] = [
    "timestamp",
    "level",
    "message",
    "sessionId",
    "correlationId",
    "environment",
    "userAgent",
    "url",
];

/// One structured log record. Serializes to the flat sink format with the
/// caller context merged in at the top level.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(serialize_with = "ser_millis")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub session_id: SessionId,
    pub correlation_id: CorrelationId,
    pub environment: String,
    pub user_agent: String,
    pub url: String,
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

fn ser_millis<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl LogEntry {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Value of the `type` context field set by the logger helpers.
    pub fn kind(&self) -> Option<&str> {
        self.context.get("type").and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Turn caller context into a map. Objects are used as-is, anything else is
/// kept under `context`; keys that clash with entry fields get a `ctx_` prefix.
pub(crate) fn normalize_context(context: Value) -> Map<String, Value> {
    let map = match context {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("context".to_string(), other);
            return map;
        }
    };
    map.into_iter()
        .map(|(key, value)| {
            if RESERVED_KEYS.contains(&key.as_str()) {
                (format!("ctx_{key}"), value)
            } else {
                (key, value)
            }
        })
        .collect()
}
