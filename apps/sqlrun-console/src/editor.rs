use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::json;
use sqlrun_client::RequestClient;
use sqlrun_core::QueryHistory;
use sqlrun_protocol::{QueryKind, QueryResponse};
use sqlrun_telemetry::Logger;

/// Where the editor is in its submit cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
    Idle,
    Running { query: String },
    Succeeded { kind: QueryKind, rowcount: Option<i64> },
    Failed { message: String },
}

/// Why a submission was turned away without running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    /// Another query is still running.
    Busy,
}

impl std::fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitRejected::Busy => f.write_str("a query is already running"),
        }
    }
}

/// Result of one submission.
#[derive(Debug, Clone)]
pub struct QueryRun {
    pub query: String,
    pub kind: QueryKind,
    pub response: QueryResponse,
    pub duration_ms: u64,
}

/// Runs queries one at a time and records the successful ones in history.
#[derive(Debug)]
pub struct Editor {
    client: RequestClient,
    history: Arc<QueryHistory>,
    logger: Logger,
    state: Mutex<EditorState>,
}

impl Editor {
    pub fn new(client: RequestClient, history: Arc<QueryHistory>, logger: Logger) -> Self {
        Self {
            client,
            history,
            logger,
            state: Mutex::new(EditorState::Idle),
        }
    }

    pub fn state(&self) -> EditorState {
        self.state.lock().clone()
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, EditorState::Running { .. }) {
            *state = EditorState::Idle;
        }
    }

    /// Submit `sql`.
    ///
    /// Blank input yields the client's validation failure and leaves the state
    /// untouched. While a query is running every other submission is rejected.
    pub async fn submit(&self, sql: &str) -> Result<QueryRun, SubmitRejected> {
        if sql.trim().is_empty() {
            let response = self.client.execute_query(sql).await;
            return Ok(QueryRun {
                query: String::new(),
                kind: QueryKind::Select,
                response,
                duration_ms: 0,
            });
        }
        let guard = self.begin(sql)?;

        let started = Instant::now();
        let kind = QueryKind::detect(sql);
        self.logger.log_user_action(
            "RUN_QUERY",
            json!({ "queryType": kind.as_str(), "queryLength": sql.chars().count() }),
        );
        self.logger.log_query_execution(sql, kind.as_str());

        let response = self.client.execute_query(sql).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let next = if response.success {
            self.history.add_query(sql);
            self.logger
                .log_query_success(kind.as_str(), response.rowcount, duration_ms);
            EditorState::Succeeded {
                kind,
                rowcount: response.rowcount,
            }
        } else {
            let message = response.error_message().unwrap_or_default().to_string();
            self.logger
                .log_query_error(kind.as_str(), &message, duration_ms);
            EditorState::Failed { message }
        };
        guard.finish(next);
        self.logger.log_performance("QUERY_EXECUTION", duration_ms);

        Ok(QueryRun {
            query: sql.trim().to_string(),
            kind,
            response,
            duration_ms,
        })
    }

    fn begin(&self, sql: &str) -> Result<RunGuard<'_>, SubmitRejected> {
        let mut state = self.state.lock();
        if matches!(*state, EditorState::Running { .. }) {
            self.logger.log_user_action(
                "RUN_QUERY_REJECTED",
                json!({ "reason": "busy", "queryLength": sql.chars().count() }),
            );
            return Err(SubmitRejected::Busy);
        }
        *state = EditorState::Running {
            query: sql.trim().to_string(),
        };
        Ok(RunGuard {
            state: &self.state,
            finished: false,
        })
    }
}

/// Leaves `Running` when a submission ends. A run dropped before it
/// finished returns the editor to `Idle`.
struct RunGuard<'a> {
    state: &'a Mutex<EditorState>,
    finished: bool,
}

impl RunGuard<'_> {
    fn finish(mut self, next: EditorState) {
        *self.state.lock() = next;
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state.lock() = EditorState::Idle;
        }
    }
}
