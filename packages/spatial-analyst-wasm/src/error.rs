//! Error types for spatial analyst requests.

use serde_json::Value;
use thiserror::Error;

/// Errors delivered on the failure path of an analysis request.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The server answered, but reported the analysis as failed.
    #[error("server error {code}: {message}")]
    Server {
        code: i64,
        message: String,
        response: Value,
    },

    #[error("javascript error: {0}")]
    Js(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("failed to spawn request task")]
    Spawn,
}

impl ServiceError {
    /// Whether `response` is an iServer failure body.
    pub fn is_server_failure(response: &Value) -> bool {
        response.get("succeed") == Some(&Value::Bool(false))
            || response.get("error").map(Value::is_object).unwrap_or(false)
    }

    /// Build a server failure from an iServer error body.
    ///
    /// iServer reports failures as `{"succeed": false, "error": {"code": 400, "errorMsg": "..."}}`.
    pub fn from_server_response(response: Value) -> Self {
        let error = response.get("error");
        let code = error
            .and_then(|e| e.get("code"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let message = error
            .and_then(|e| e.get("errorMsg"))
            .and_then(Value::as_str)
            .unwrap_or("analysis failed")
            .to_string();
        ServiceError::Server {
            code,
            message,
            response,
        }
    }

    /// The `processFailed` payload handed to JS callbacks.
    pub fn to_event_error(&self) -> Value {
        match self {
            ServiceError::Server { code, message, .. } => serde_json::json!({
                "code": code,
                "errorMsg": message,
            }),
            ServiceError::Status { status, .. } => serde_json::json!({
                "code": status,
                "errorMsg": self.to_string(),
            }),
            other => serde_json::json!({
                "code": 0,
                "errorMsg": other.to_string(),
            }),
        }
    }
}

/// Result alias for spatial analyst operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
