use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlrun_core::util::preview;

use crate::entry::{normalize_context, LogEntry};
use crate::identity::{CorrelationId, SessionId};
use crate::level::LogLevel;
use crate::sink::{LogSink, TracingSink};

/// Operations slower than this are logged at WARN.
pub const SLOW_OPERATION_MS: u64 = 1000;

const PREVIEW_CHARS: usize = 100;

/// Failure classes of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// A response arrived with a non-success status.
    ServerError,
    /// The request was sent but no complete response arrived.
    NetworkError,
    /// The request could not be built or sent at all.
    RequestSetupError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ServerError => "ServerError",
            FailureKind::NetworkError => "NetworkError",
            FailureKind::RequestSetupError => "RequestSetupError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What `log_api_error` records about a failed request.
#[derive(Debug, Clone, Copy)]
pub struct ApiFailure<'a> {
    pub kind: FailureKind,
    pub message: &'a str,
    pub status: Option<u16>,
    pub status_text: Option<&'a str>,
    pub body: Option<&'a str>,
}

#[derive(Debug, Clone)]
struct LoggerSettings {
    environment: String,
    user_agent: String,
    url: String,
    min_level: LogLevel,
}

/// Structured logger.
///
/// A `Logger` is an explicit value: it is built once at startup and handed to
/// whatever needs it. Cloning is cheap. Its correlation id only changes through
/// [`Logger::update_correlation_id`] (which needs `&mut self`) or by deriving a
/// per-request logger with [`Logger::for_request`], so concurrent requests
/// never share a mutable correlation slot.
#[derive(Clone)]
pub struct Logger {
    session_id: SessionId,
    correlation_id: CorrelationId,
    settings: Arc<LoggerSettings>,
    sinks: Arc<[Arc<dyn LogSink>]>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("session_id", &self.session_id)
            .field("correlation_id", &self.correlation_id)
            .field("environment", &self.settings.environment)
            .field("min_level", &self.settings.min_level)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

pub struct LoggerBuilder {
    session_id: SessionId,
    settings: LoggerSettings,
    sinks: Vec<Arc<dyn LogSink>>,
}

impl LoggerBuilder {
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.settings.environment = environment.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.settings.user_agent = user_agent.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.settings.url = url.into();
        self
    }

    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.settings.min_level = level;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Without explicit sinks, entries go to [`TracingSink`].
    pub fn build(self) -> Logger {
        let sinks: Vec<Arc<dyn LogSink>> = if self.sinks.is_empty() {
            vec![Arc::new(TracingSink)]
        } else {
            self.sinks
        };
        Logger {
            session_id: self.session_id,
            correlation_id: CorrelationId::generate(),
            settings: Arc::new(self.settings),
            sinks: sinks.into(),
        }
    }
}

impl Logger {
    pub fn builder(session_id: SessionId) -> LoggerBuilder {
        LoggerBuilder {
            session_id,
            settings: LoggerSettings {
                environment: "development".to_string(),
                user_agent: format!("sqlrun/{}", env!("CARGO_PKG_VERSION")),
                url: String::new(),
                min_level: LogLevel::Debug,
            },
            sinks: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn environment(&self) -> &str {
        &self.settings.environment
    }

    /// Start a new request lineage on this logger value and return its id.
    pub fn update_correlation_id(&mut self) -> CorrelationId {
        self.correlation_id = CorrelationId::generate();
        self.correlation_id.clone()
    }

    /// Copy of this logger that stamps `correlation_id` on every entry.
    pub fn for_request(&self, correlation_id: CorrelationId) -> Logger {
        Logger {
            correlation_id,
            ..self.clone()
        }
    }

    /// Build an entry, hand it to the sinks, and return it.
    ///
    /// `context` is merged into the entry; pass `Value::Null` for none.
    /// Entries below the minimum level are returned without being emitted.
    pub fn log(&self, level: LogLevel, message: &str, context: Value) -> LogEntry {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            session_id: self.session_id.clone(),
            correlation_id: self.correlation_id.clone(),
            environment: self.settings.environment.clone(),
            user_agent: self.settings.user_agent.clone(),
            url: self.settings.url.clone(),
            context: normalize_context(context),
        };
        if level >= self.settings.min_level {
            for sink in self.sinks.iter() {
                sink.emit(&entry);
            }
        }
        entry
    }

    pub fn debug(&self, message: &str, context: Value) -> LogEntry {
        self.log(LogLevel::Debug, message, context)
    }

    pub fn info(&self, message: &str, context: Value) -> LogEntry {
        self.log(LogLevel::Info, message, context)
    }

    pub fn warn(&self, message: &str, context: Value) -> LogEntry {
        self.log(LogLevel::Warn, message, context)
    }

    pub fn error(&self, message: &str, context: Value) -> LogEntry {
        self.log(LogLevel::Error, message, context)
    }

    pub fn log_api_request(
        &self,
        endpoint: &str,
        method: &str,
        payload: Option<&Value>,
    ) -> LogEntry {
        let raw = payload.map(Value::to_string);
        let data_size = raw.as_ref().map_or(0, String::len);
        let data_preview = raw
            .as_deref()
            .map(|raw| raw.chars().take(PREVIEW_CHARS).collect::<String>());
        self.info(
            "API Request",
            json!({
                "type": "API_REQUEST",
                "endpoint": endpoint,
                "method": method,
                "hasData": payload.is_some(),
                "dataSize": data_size,
                "dataPreview": data_preview,
            }),
        )
    }

    pub fn log_api_success(
        &self,
        endpoint: &str,
        method: &str,
        duration_ms: u64,
        response_size: usize,
    ) -> LogEntry {
        self.info(
            "API Success",
            json!({
                "type": "API_SUCCESS",
                "endpoint": endpoint,
                "method": method,
                "duration_ms": duration_ms,
                "hasResponse": response_size > 0,
                "responseSize": response_size,
            }),
        )
    }

    /// Log a failed request with its classification.
    pub fn log_api_error(
        &self,
        endpoint: &str,
        method: &str,
        failure: &ApiFailure<'_>,
        duration_ms: u64,
    ) -> LogEntry {
        let mut context = Map::new();
        context.insert("type".into(), json!("API_ERROR"));
        context.insert("endpoint".into(), json!(endpoint));
        context.insert("method".into(), json!(method));
        context.insert("duration_ms".into(), json!(duration_ms));
        context.insert("classification".into(), json!(failure.kind.as_str()));
        context.insert("error".into(), json!(failure.message));
        if let Some(status) = failure.status {
            context.insert("errorCode".into(), json!(status));
        }
        if let Some(text) = failure.status_text {
            context.insert("statusText".into(), json!(text));
        }
        if let Some(body) = failure.body {
            let data = serde_json::from_str::<Value>(body).unwrap_or_else(|_| json!(body));
            context.insert("errorData".into(), data);
        }
        self.error("API Error", Value::Object(context))
    }

    pub fn log_query_execution(&self, query: &str, query_type: &str) -> LogEntry {
        self.info(
            "Query Execution Started",
            json!({
                "type": "QUERY_EXECUTION",
                "queryType": query_type,
                "queryLength": query.chars().count(),
                "queryPreview": preview(query, PREVIEW_CHARS),
            }),
        )
    }

    pub fn log_query_success(
        &self,
        query_type: &str,
        row_count: Option<i64>,
        duration_ms: u64,
    ) -> LogEntry {
        self.info(
            "Query Executed Successfully",
            json!({
                "type": "QUERY_SUCCESS",
                "queryType": query_type,
                "rowCount": row_count,
                "duration_ms": duration_ms,
            }),
        )
    }

    pub fn log_query_error(&self, query_type: &str, error: &str, duration_ms: u64) -> LogEntry {
        self.error(
            "Query Execution Failed",
            json!({
                "type": "QUERY_ERROR",
                "queryType": query_type,
                "error": error,
                "duration_ms": duration_ms,
            }),
        )
    }

    /// `details` must be a JSON object; its fields sit next to `action`.
    pub fn log_user_action(&self, action: &str, details: Value) -> LogEntry {
        let mut context = match details {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("details".into(), other);
                map
            }
        };
        context.insert("type".into(), json!("USER_INTERACTION"));
        context.insert("action".into(), json!(action));
        self.info("User Action", Value::Object(context))
    }

    /// WARN above [`SLOW_OPERATION_MS`], INFO otherwise.
    pub fn log_performance(&self, operation: &str, duration_ms: u64) -> LogEntry {
        let level = if duration_ms > SLOW_OPERATION_MS {
            LogLevel::Warn
        } else {
            LogLevel::Info
        };
        self.log(
            level,
            "Performance Metric",
            json!({
                "type": "PERFORMANCE",
                "operation": operation,
                "duration_ms": duration_ms,
            }),
        )
    }
}
