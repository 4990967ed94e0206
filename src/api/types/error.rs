//! Envelope error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::membership::Envelope;
use crate::domain::DomainError;

/// Non-zero envelope codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    Validation,
    NotFound,
    Conflict,
    Connectivity,
    Business,
    Internal,
}

impl ApiErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            Self::Validation => 600001,
            Self::NotFound => 600002,
            Self::Conflict => 600003,
            Self::Connectivity => 600004,
            Self::Business => 600005,
            Self::Internal => 600099,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Connectivity => StatusCode::BAD_GATEWAY,
            Self::Business => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation_error"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Connectivity => write!(f, "connectivity_error"),
            Self::Business => write!(f, "business_error"),
            Self::Internal => write!(f, "internal_error"),
        }
    }
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: Envelope<()>,
}

impl ApiError {
    pub fn new(error_code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: error_code.status(),
            response: Envelope::failure(error_code.code(), message),
        }
    }

    /// A leader's rejection. Its own code is kept in the message.
    pub fn relayed(code: i64, message: impl std::fmt::Display) -> Self {
        Self::new(
            ApiErrorCode::Business,
            format!("Leader rejected request ({}): {}", code, message),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Connectivity, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message)
    }

    pub fn code(&self) -> i64 {
        self.response.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { message } => Self::not_found(message),
            DomainError::Validation { message } => Self::bad_request(message),
            DomainError::Conflict { message } => Self::conflict(message),
            DomainError::Connectivity { message } => Self::bad_gateway(message),
            DomainError::Business { code, message } => Self::relayed(code, message),
            DomainError::Internal { message } => Self::internal(message),
            DomainError::Storage { message } => Self::internal(message),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.response.code, self.response.message)
    }
}

impl std::error::Error for ApiError {}

/// Wrap a payload in a success envelope
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope::success(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_conversion() {
        let cases = [
            (DomainError::validation("bad"), 600001, StatusCode::BAD_REQUEST),
            (DomainError::not_found("gone"), 600002, StatusCode::NOT_FOUND),
            (DomainError::conflict("dup"), 600003, StatusCode::CONFLICT),
            (DomainError::connectivity("refused"), 600004, StatusCode::BAD_GATEWAY),
            (DomainError::internal("boom"), 600099, StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::storage("disk"), 600099, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (domain_err, code, status) in cases {
            let api_err: ApiError = domain_err.into();
            assert_eq!(api_err.code(), code);
            assert_eq!(api_err.status, status);
        }
    }

    #[test]
    fn test_business_error_keeps_leader_code() {
        let api_err: ApiError = DomainError::business(600002, "Team 'ABC123' not found").into();

        assert_eq!(api_err.code(), 600005);
        assert_eq!(api_err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(api_err.response.message.contains("(600002)"));
        assert!(api_err.response.message.contains("ABC123"));
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::bad_request("Team name must not be empty");
        let json = serde_json::to_value(&err.response).unwrap();

        assert_eq!(json["code"], 600001);
        assert_eq!(json["message"], "Team name must not be empty");
        assert!(json["data"].is_null());
        assert_eq!(ApiErrorCode::Validation.to_string(), "validation_error");
    }
}
