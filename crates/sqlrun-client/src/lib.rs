//! HTTP client for the SQL runner backend.
//!
//! Every call gets a fresh correlation id that travels in the
//! `X-Correlation-ID` header and on the request's start and end log entries.

mod error;

use std::time::{Duration, Instant};

use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sqlrun_protocol::{
    HealthResponse, QueryRequest, QueryResponse, TableDetailResponse, TablesResponse,
};
use sqlrun_telemetry::{CorrelationId, Logger};

pub use error::{TransportError, INVALID_BODY};

pub const CORRELATION_HEADER: &str = "X-Correlation-ID";

/// Returned by `execute_query` for blank input.
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a SQL query";

#[derive(Debug, Clone)]
pub struct RequestClient {
    http: Client,
    base_url: String,
    logger: Logger,
}

impl RequestClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        logger: Logger,
    ) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sqlrun/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::RequestSetup(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            logger,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run `sql` on the backend. Failures come back as `success: false`
    /// with a message; this never returns an error value.
    pub async fn execute_query(&self, sql: &str) -> QueryResponse {
        if sql.trim().is_empty() {
            self.logger.warn(
                "Empty Query Submission",
                json!({ "type": "VALIDATION_ERROR", "queryLength": sql.len() }),
            );
            return QueryResponse::failure(EMPTY_QUERY_MESSAGE);
        }
        let body = json!(QueryRequest {
            query: sql.to_string(),
        });
        match self
            .send::<QueryResponse>(Method::POST, "/api/query", &["api", "query"], Some(&body))
            .await
        {
            Ok(response) => response,
            Err(err) => QueryResponse::failure(err.user_message()),
        }
    }

    pub async fn list_tables(&self) -> Result<TablesResponse, TransportError> {
        self.send(Method::GET, "/api/tables", &["api", "tables"], None)
            .await
    }

    /// Schema and sample rows of `name`. The name is sent as a single
    /// percent-encoded path segment.
    pub async fn table_detail(&self, name: &str) -> Result<TableDetailResponse, TransportError> {
        let endpoint = format!("/api/tables/{name}");
        self.send(Method::GET, &endpoint, &["api", "tables", name], None)
            .await
    }

    pub async fn health(&self) -> Result<HealthResponse, TransportError> {
        self.send(Method::GET, "/", &[], None).await
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TransportError::RequestSetup(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::RequestSetup(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<T, TransportError> {
        let correlation_id = CorrelationId::generate();
        let logger = self.logger.for_request(correlation_id.clone());
        let started = Instant::now();
        logger.log_api_request(endpoint, method.as_str(), body);

        let outcome = self
            .dispatch::<T>(method.clone(), segments, body, &correlation_id)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok((payload, size)) => {
                logger.log_api_success(endpoint, method.as_str(), duration_ms, size);
                Ok(payload)
            }
            Err(err) => {
                let message = err.to_string();
                logger.log_api_error(
                    endpoint,
                    method.as_str(),
                    &err.as_failure(&message),
                    duration_ms,
                );
                Err(err)
            }
        }
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
        correlation_id: &CorrelationId,
    ) -> Result<(T, usize), TransportError> {
        let url = self.url_for(segments)?;
        let mut builder = self
            .http
            .request(method, url)
            .header(CORRELATION_HEADER, correlation_id.as_str());
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let request = builder
            .build()
            .map_err(|e| TransportError::RequestSetup(e.to_string()))?;

        let response = self.http.execute(request).await.map_err(|e| {
            if e.is_builder() {
                TransportError::RequestSetup(e.to_string())
            } else {
                TransportError::Network(e.to_string())
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Server {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let payload = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(error = %e, "response body did not decode");
            TransportError::Server {
                status: status.as_u16(),
                status_text: INVALID_BODY.to_string(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }
        })?;
        Ok((payload, bytes.len()))
    }
}
