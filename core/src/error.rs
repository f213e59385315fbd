use serde_json::Value;

/// Malformed caller input. Never retried; surfaced to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("resource_name cannot be empty")]
    EmptyResourceName,
    #[error("Invalid ISO8601 timestamp for '{param}': '{value}'")]
    InvalidTimestamp { param: String, value: String },
    #[error("{field} cannot be empty")]
    EmptyField { field: String },
    #[error("Invalid {field} '{value}': an ID must be a single URL path segment")]
    InvalidId { field: String, value: String },
    #[error("Invalid {field} values: {invalid:?}. Valid values are: {valid:?}")]
    InvalidChoice {
        field: String,
        invalid: Vec<String>,
        valid: Vec<String>,
    },
    #[error("{message}")]
    Conflict { field: String, message: String },
}

impl ValidationError {
    pub fn empty_field(field: impl Into<String>) -> Self {
        Self::EmptyField {
            field: field.into(),
        }
    }

    /// Argument the error points at, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::EmptyResourceName => Some("resource_name"),
            Self::InvalidTimestamp { param, .. } => Some(param),
            Self::EmptyField { field }
            | Self::InvalidId { field, .. }
            | Self::InvalidChoice { field, .. }
            | Self::Conflict { field, .. } => Some(field),
        }
    }
}

/// Failure reported by the upstream API or the HTTP transport in front of it.
///
/// `response_text` carries the raw upstream body when one was received; it is
/// the richer diagnostic and is what gets logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub message: String,
    pub status: Option<u16>,
    pub response_text: Option<String>,
}

impl UpstreamError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            response_text: None,
        }
    }

    pub fn http(status: u16, response_text: impl Into<String>) -> Self {
        Self {
            message: format!("PagerDuty API responded with HTTP {status}"),
            status: Some(status),
            response_text: Some(response_text.into()),
        }
    }

    pub fn missing_field(key: &str) -> Self {
        Self::transport(format!("Response missing '{key}' field"))
    }

    pub fn details(&self) -> Value {
        let mut details = serde_json::Map::new();
        if let Some(status) = self.status {
            details.insert("status".to_string(), Value::from(status));
        }
        if let Some(text) = &self.response_text {
            let response = serde_json::from_str::<Value>(text)
                .unwrap_or_else(|_| Value::String(text.clone()));
            details.insert("response".to_string(), response);
        }
        Value::Object(details)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("failed to serialize parsed record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Machine-readable error codes shared with the tool layer.
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const LIMIT_EXCEEDED: &str = "LIMIT_EXCEEDED";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Logs an upstream failure and hands the very same error back.
///
/// Meant for `.or_else(handle_api_error)`: the caller keeps the original error
/// value while the response body (when present) lands in the logs.
pub fn handle_api_error<T>(err: UpstreamError) -> Result<T, UpstreamError> {
    match &err.response_text {
        Some(body) => tracing::error!(
            status = ?err.status,
            response = %body,
            "PagerDuty API error: {}",
            err.message
        ),
        None => tracing::error!("PagerDuty API error: {}", err.message),
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn handle_api_error_returns_the_original_error() {
        let original = UpstreamError::http(
            400,
            r#"{"error":{"message":"Invalid Input Provided","code":2001}}"#,
        );
        let result: Result<(), UpstreamError> = handle_api_error(original.clone());
        assert_eq!(result.unwrap_err(), original);
    }

    #[test]
    fn handle_api_error_keeps_transport_errors_intact() {
        let original = UpstreamError::transport("connection refused");
        let err = Err::<u32, _>(original.clone())
            .or_else(handle_api_error)
            .unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.response_text, None);
    }

    #[test]
    fn upstream_details_parse_json_bodies() {
        let err = UpstreamError::http(404, r#"{"error":{"message":"Not Found"}}"#);
        assert_eq!(
            err.details(),
            json!({"status": 404, "response": {"error": {"message": "Not Found"}}})
        );

        let plain = UpstreamError::http(502, "Bad Gateway");
        assert_eq!(plain.details()["response"], json!("Bad Gateway"));
    }

    #[test]
    fn validation_messages_name_the_offending_input() {
        let err = ValidationError::InvalidTimestamp {
            param: "since".to_string(),
            value: "not-a-date".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid ISO8601 timestamp for 'since': 'not-a-date'"
        );
        assert_eq!(err.field(), Some("since"));
        assert_eq!(
            ValidationError::EmptyResourceName.to_string(),
            "resource_name cannot be empty"
        );
    }
}
