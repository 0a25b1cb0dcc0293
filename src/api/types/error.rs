//! JSON error responses for the HTTP adapter

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::parser::{AttemptRecord, ParseError, ParseErrorKind};
use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    UnsupportedMediaError,
    PayloadTooLargeError,
    ProcessingError,
    TimeoutError,
    ServiceUnavailableError,
    ServerError,
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestError => write!(f, "invalid_request_error"),
            Self::UnsupportedMediaError => write!(f, "unsupported_media_error"),
            Self::PayloadTooLargeError => write!(f, "payload_too_large_error"),
            Self::ProcessingError => write!(f, "processing_error"),
            Self::TimeoutError => write!(f, "timeout_error"),
            Self::ServiceUnavailableError => write!(f, "service_unavailable_error"),
            Self::ServerError => write!(f, "server_error"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    /// Per-parser diagnostics when every candidate failed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptRecord>,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type,
                    code: None,
                    retryable: None,
                    attempts: Vec::new(),
                },
            },
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.response.error.code = Some(code.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorType::InvalidRequestError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorType::ServerError,
            message,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<ParseError> for ApiError {
    fn from(err: ParseError) -> Self {
        let (status, error_type) = match err.kind {
            ParseErrorKind::Unsupported => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ApiErrorType::UnsupportedMediaError,
            ),
            ParseErrorKind::TooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ApiErrorType::PayloadTooLargeError,
            ),
            ParseErrorKind::Corrupt | ParseErrorKind::AllParsersFailed => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiErrorType::ProcessingError,
            ),
            ParseErrorKind::Timeout => (StatusCode::GATEWAY_TIMEOUT, ApiErrorType::TimeoutError),
            ParseErrorKind::BackendUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorType::ServiceUnavailableError,
            ),
            ParseErrorKind::Internal | ParseErrorKind::Cancelled => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorType::ServerError,
            ),
        };

        let mut api_error = Self::new(status, error_type, err.message).with_code(err.kind.as_str());
        api_error.response.error.retryable = Some(err.retryable);
        api_error.response.error.attempts = err.attempts;
        api_error
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Parse(e) => e.into(),
            DomainError::Validation { message } => {
                Self::bad_request(message).with_code("invalid_options")
            }
            DomainError::Configuration { message } | DomainError::Internal { message } => {
                Self::internal(message)
            }
            DomainError::Io(e) => Self::internal(e.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        let error_type = if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiErrorType::PayloadTooLargeError
        } else {
            ApiErrorType::InvalidRequestError
        };

        Self::new(status, error_type, err.body_text()).with_code("invalid_multipart")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.response.error.error_type, self.response.error.message
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parser::ParserVariant;

    #[test]
    fn test_parse_error_status_mapping() {
        let cases = [
            (ParseError::unsupported("image/x-unknown"), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (ParseError::too_large(11, 10), StatusCode::PAYLOAD_TOO_LARGE),
            (ParseError::corrupt("bad xref"), StatusCode::UNPROCESSABLE_ENTITY),
            (ParseError::timeout(5), StatusCode::GATEWAY_TIMEOUT),
            (ParseError::backend_unavailable("disabled"), StatusCode::SERVICE_UNAVAILABLE),
            (ParseError::all_parsers_failed("a.pdf", vec![]), StatusCode::UNPROCESSABLE_ENTITY),
            (ParseError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            let kind = error.kind;
            let api_error: ApiError = error.into();
            assert_eq!(api_error.status, status, "{:?}", kind);
            assert_eq!(api_error.response.error.code.as_deref(), Some(kind.as_str()));
        }
    }

    #[test]
    fn test_attempts_are_carried() {
        let attempts = vec![AttemptRecord::failed(
            ParserVariant::Advanced,
            &ParseError::corrupt("broken"),
        )];
        let api_error: ApiError = ParseError::all_parsers_failed("a.pdf", attempts).into();

        let json = serde_json::to_value(&api_error.response).unwrap();

        assert_eq!(json["error"]["code"], "all_parsers_failed");
        assert_eq!(json["error"]["attempts"][0]["parser"], "advanced");
    }

    #[test]
    fn test_validation_is_bad_request() {
        let api_error: ApiError = DomainError::validation("timeout_seconds: range").into();

        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.response.error.error_type, ApiErrorType::InvalidRequestError);
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::bad_request("missing 'file' field");
        let json = serde_json::to_string(&err.response).unwrap();

        assert!(json.contains("invalid_request_error"));
        assert!(!json.contains("attempts"));
    }
}
