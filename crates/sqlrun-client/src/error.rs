use serde_json::Value;
use sqlrun_telemetry::{ApiFailure, FailureKind};
use thiserror::Error;

/// Status text recorded when a success response carries an undecodable body.
pub const INVALID_BODY: &str = "invalid response body";

/// Why an outbound request produced no usable payload.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A response arrived but was not usable.
    #[error("request failed with status code {status}")]
    Server {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("request setup failed: {0}")]
    RequestSetup(String),
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Server { .. } => FailureKind::ServerError,
            TransportError::Network(_) => FailureKind::NetworkError,
            TransportError::RequestSetup(_) => FailureKind::RequestSetupError,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The `error` string of a JSON server body, if there is one.
    pub fn server_message(&self) -> Option<String> {
        let TransportError::Server { body, .. } = self else {
            return None;
        };
        let parsed: Value = serde_json::from_str(body).ok()?;
        parsed
            .get("error")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|msg| !msg.is_empty())
            .map(str::to_string)
    }

    /// Message shown to the user when a query fails in transport.
    pub fn user_message(&self) -> String {
        if let Some(message) = self.server_message() {
            return message;
        }
        match self {
            TransportError::Server {
                status,
                status_text,
                ..
            } if status_text == INVALID_BODY => {
                format!("Invalid response from server (status code {status})")
            }
            TransportError::Server { status, .. } => {
                format!("Request failed with status code {status}")
            }
            TransportError::Network(msg) => format!("Network Error: {msg}"),
            TransportError::RequestSetup(msg) => format!("Request could not be sent: {msg}"),
        }
    }

    pub(crate) fn as_failure<'a>(&'a self, message: &'a str) -> ApiFailure<'a> {
        match self {
            TransportError::Server {
                status,
                status_text,
                body,
            } => ApiFailure {
                kind: self.kind(),
                message,
                status: Some(*status),
                status_text: Some(status_text.as_str()),
                body: Some(body.as_str()),
            },
            _ => ApiFailure {
                kind: self.kind(),
                message,
                status: None,
                status_text: None,
                body: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(status: u16, text: &str, body: &str) -> TransportError {
        TransportError::Server {
            status,
            status_text: text.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn server_message_comes_from_json_body() {
        let err = server(
            400,
            "Bad Request",
            r#"{"success":false,"error":"near \"SELEC\": syntax error"}"#,
        );
        assert_eq!(err.user_message(), "near \"SELEC\": syntax error");
        assert_eq!(err.kind(), FailureKind::ServerError);
    }

    #[test]
    fn falls_back_to_status_code() {
        assert_eq!(
            server(502, "Bad Gateway", "<html>upstream</html>").user_message(),
            "Request failed with status code 502"
        );
        assert_eq!(
            server(500, "Internal Server Error", r#"{"error":"  "}"#).user_message(),
            "Request failed with status code 500"
        );
        assert!(server(200, INVALID_BODY, "oops")
            .user_message()
            .contains("Invalid response"));
    }

    #[test]
    fn non_server_failures_carry_no_status() {
        let err = TransportError::Network("connection refused".into());
        assert_eq!(err.kind(), FailureKind::NetworkError);
        assert_eq!(err.status(), None);
        let failure = err.as_failure("x");
        assert!(failure.body.is_none());
        assert_eq!(
            TransportError::RequestSetup("bad url".into()).kind(),
            FailureKind::RequestSetupError
        );
    }
}
