use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GtmetrixError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The service answered with something this client did not expect.
    #[error("API failure: {0}")]
    Failure(ApiFailure),

    /// The service answered with a well-formed error envelope.
    #[error("API error: {0}")]
    Api(ApiErrorResponse),
}

pub type GtmetrixResult<T> = Result<T, GtmetrixError>;

impl GtmetrixError {
    /// True for both kinds of protocol failure, including failures while
    /// decoding an error envelope.
    pub fn is_failure(&self) -> bool {
        matches!(self, GtmetrixError::Failure(_))
    }

    pub fn is_api_error(&self) -> bool {
        matches!(self, GtmetrixError::Api(_))
    }

    pub fn as_failure(&self) -> Option<&ApiFailure> {
        match self {
            GtmetrixError::Failure(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn as_api_error(&self) -> Option<&ApiErrorResponse> {
        match self {
            GtmetrixError::Api(response) => Some(response),
            _ => None,
        }
    }

    pub(crate) fn failure(
        message: impl Into<String>,
        status: Option<StatusCode>,
        payload: FailurePayload,
    ) -> Self {
        GtmetrixError::Failure(ApiFailure {
            kind: FailureKind::Response,
            message: message.into(),
            status,
            payload,
        })
    }

    pub(crate) fn error_failure(
        message: impl Into<String>,
        status: StatusCode,
        payload: FailurePayload,
    ) -> Self {
        GtmetrixError::Failure(ApiFailure {
            kind: FailureKind::ErrorResponse,
            message: message.into(),
            status: Some(status),
            payload,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A success response (status below 400) did not match the envelope or
    /// entity shape.
    Response,
    /// An error response (status 400 or over) carried a malformed error
    /// envelope.
    ErrorResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailurePayload {
    None,
    Bytes(Vec<u8>),
    Json(Value),
}

#[derive(Debug, Clone)]
pub struct ApiFailure {
    pub kind: FailureKind,
    pub message: String,
    pub status: Option<StatusCode>,
    pub payload: FailurePayload,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status.as_u16()),
            None => write!(f, "{}", self.message),
        }
    }
}

/// One member of the `errors` list of an error envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiErrorObject {
    pub status: String,
    pub code: String,
    pub title: String,
    pub detail: Option<String>,
    pub raw: Map<String, Value>,
}

impl ApiErrorObject {
    /// Builds an error object from a value that already passed
    /// [`crate::shape::is_error`].
    pub(crate) fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            status: object.get("status").map(json_to_string).unwrap_or_default(),
            code: object.get("code").map(json_to_string).unwrap_or_default(),
            title: object.get("title").map(json_to_string).unwrap_or_default(),
            detail: object.get("detail").map(json_to_string),
            raw: object.clone(),
        }
    }
}

impl fmt::Display for ApiErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.title)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub errors: Vec<ApiErrorObject>,
    pub document: Value,
}

impl ApiErrorResponse {
    pub fn first(&self) -> Option<&ApiErrorObject> {
        self.errors.first()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

impl fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status.as_u16())?;
        for error in &self.errors {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

pub(crate) fn json_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_object_from_numeric_fields() {
        let value = json!({"status": 404, "code": "E40400", "title": "Not found"});
        let object = value.as_object().unwrap();
        let error = ApiErrorObject::from_object(object);
        assert_eq!(error.status, "404");
        assert_eq!(error.code, "E40400");
        assert_eq!(error.detail, None);
        assert_eq!(error.to_string(), "404 E40400: Not found");
    }

    #[test]
    fn test_failure_kinds() {
        let failure = GtmetrixError::failure("API returned no data", None, FailurePayload::None);
        assert!(failure.is_failure());
        assert_eq!(failure.as_failure().unwrap().kind, FailureKind::Response);

        let failure = GtmetrixError::error_failure(
            "API returned empty response",
            StatusCode::BAD_REQUEST,
            FailurePayload::Bytes(Vec::new()),
        );
        assert!(failure.is_failure());
        assert!(!failure.is_api_error());
        assert_eq!(
            failure.to_string(),
            "API failure: API returned empty response (HTTP 400)"
        );
    }
}
