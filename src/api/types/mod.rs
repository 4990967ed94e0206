//! Shared API types
//!
//! Every response body, success or failure, is a `{code, message, data}`
//! envelope.

pub mod error;
pub mod json;

pub use error::{ok, ApiError, ApiErrorCode};
pub use json::Json;

use serde::Serialize;

/// Serializes as `{}`
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Empty {}

/// Handler result: a success envelope or an error envelope
pub type ApiResult<T> = Result<axum::Json<crate::domain::membership::Envelope<T>>, ApiError>;
