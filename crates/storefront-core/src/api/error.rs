use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Normalized failure for every call that goes through the gateway.
///
/// Server-reported failures keep their HTTP status and validation payload,
/// transport failures report status 0 and anything else reports 500.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        errors: Vec<Value>,
    },

    #[error("Connection error: {0}")]
    Network(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Wire shape handed to front-ends: `{ success: false, message, errors?, status }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
    pub status: u16,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    fn default_message(status: u16) -> &'static str {
        match status {
            401 => "Unauthorized - token may be expired",
            403 => "Access denied",
            404 => "Resource not found",
            429 => "Rate limited - please wait before retrying",
            _ => "Server error",
        }
    }

    /// Build a server failure from a non-success status and the raw body.
    ///
    /// The backend answers `{ success: false, message, errors }`; bodies that
    /// are not JSON are quoted (truncated) when non-empty.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        let (message, errors) = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => (parsed.message, parsed.errors.unwrap_or_default()),
            Err(_) if !body.trim().is_empty() => (Some(Self::truncate_body(body.trim())), Vec::new()),
            Err(_) => (None, Vec::new()),
        };

        ApiError::Server {
            status: code,
            message: message.unwrap_or_else(|| Self::default_message(code).to_string()),
            errors,
        }
    }

    /// A 2xx answer whose envelope says `success: false`.
    pub fn rejected(status: reqwest::StatusCode, message: Option<String>, errors: Option<Vec<Value>>) -> Self {
        ApiError::Server {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| "Request was rejected by the server".to_string()),
            errors: errors.unwrap_or_default(),
        }
    }

    /// Classify a transport-level failure from reqwest.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return ApiError::from_status(status, "");
        }
        if err.is_connect() || err.is_timeout() || err.is_request() {
            ApiError::Network(err.to_string())
        } else {
            ApiError::Unexpected(err.to_string())
        }
    }

    /// Credential storage failures surface as unexpected faults.
    pub fn storage(err: anyhow::Error) -> Self {
        ApiError::Unexpected(format!("Credential storage failure: {:#}", err))
    }

    pub fn status(&self) -> u16 {
        match self {
            ApiError::Server { status, .. } => *status,
            ApiError::Network(_) => 0,
            ApiError::Unexpected(_) => 500,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Network(_) => "Connection error. Check your network connection.".to_string(),
            ApiError::Unexpected(_) => "Unexpected error".to_string(),
        }
    }

    pub fn errors(&self) -> &[Value] {
        match self {
            ApiError::Server { errors, .. } => errors,
            _ => &[],
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == 401
    }

    pub fn to_failure(&self) -> Failure {
        let errors = match self {
            ApiError::Server { errors, .. } => Some(errors.clone()),
            _ => None,
        };
        Failure {
            success: false,
            message: self.message(),
            errors,
            status: self.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn test_from_status_reads_backend_body() {
        let body = r#"{"success":false,"message":"Email already registered","errors":[{"field":"email"}]}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.status(), 400);
        assert_eq!(err.message(), "Email already registered");
        assert_eq!(err.errors(), &[json!({"field": "email"})]);
    }

    #[test]
    fn test_from_status_default_messages() {
        assert_eq!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "").message(),
            "Unauthorized - token may be expired"
        );
        assert_eq!(ApiError::from_status(StatusCode::FORBIDDEN, "{}").message(), "Access denied");
        assert_eq!(ApiError::from_status(StatusCode::BAD_GATEWAY, "").message(), "Server error");
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
    }

    #[test]
    fn test_from_status_truncates_plain_bodies() {
        let body = "x".repeat(800);
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body);
        let message = err.message();
        assert!(message.starts_with(&"x".repeat(500)));
        assert!(message.ends_with("(truncated, 800 total bytes)"));
    }

    #[test]
    fn test_failure_shape_per_category() {
        let server = ApiError::Server {
            status: 401,
            message: "Token expired".to_string(),
            errors: vec![],
        };
        assert_eq!(
            serde_json::to_value(server.to_failure()).unwrap(),
            json!({"success": false, "message": "Token expired", "errors": [], "status": 401})
        );

        let network = ApiError::Network("connection refused".to_string()).to_failure();
        assert_eq!(network.status, 0);
        assert!(network.errors.is_none());

        let unexpected = ApiError::storage(anyhow::anyhow!("disk full")).to_failure();
        assert_eq!(unexpected.status, 500);
        assert_eq!(unexpected.message, "Unexpected error");
    }

    #[test]
    fn test_rejected_keeps_success_status() {
        let err = ApiError::rejected(StatusCode::OK, Some("Invalid credentials".to_string()), None);
        assert_eq!(err.status(), 200);
        assert_eq!(err.message(), "Invalid credentials");
    }
}
