//! Structured client-side logging.
//!
//! A [`Logger`] stamps every entry with the session id, the current
//! correlation id and the environment, then hands it to its sinks.

mod entry;
mod identity;
mod level;
mod logger;
mod sink;

pub use entry::LogEntry;
pub use identity::{generate_correlation_id, CorrelationId, SessionId, SESSION_KEY};
pub use level::{LogLevel, ParseLevelError};
pub use logger::{ApiFailure, FailureKind, Logger, LoggerBuilder, SLOW_OPERATION_MS};
pub use sink::{LogSink, MemorySink, TracingSink};
