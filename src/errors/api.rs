use poem_openapi::{payload::Json, ApiResponse, Object};
use std::fmt;

use crate::errors::auth::AuthError;

/// Standardized error response for resource endpoints
#[derive(Object, Debug)]
pub struct ApiErrorResponse {
    /// Error code identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    pub status_code: u16,
}

/// Error types for relationship, limit and notification endpoints
#[derive(ApiResponse, Debug)]
pub enum ApiError {
    /// Missing, invalid or expired session
    #[oai(status = 401)]
    Unauthenticated(Json<ApiErrorResponse>),

    /// Authenticated but not a party to the resource
    #[oai(status = 403)]
    Forbidden(Json<ApiErrorResponse>),

    /// Invitation or acceptance attempted between a blocked pair
    #[oai(status = 403)]
    Blocked(Json<ApiErrorResponse>),

    /// Token, relationship or limit unknown
    #[oai(status = 404)]
    NotFound(Json<ApiErrorResponse>),

    /// State transition conflicts with the current state
    #[oai(status = 409)]
    Conflict(Json<ApiErrorResponse>),

    /// Request payload failed validation
    #[oai(status = 400)]
    ValidationError(Json<ApiErrorResponse>),

    /// Internal server error
    #[oai(status = 500)]
    InternalError(Json<ApiErrorResponse>),
}

impl ApiError {
    /// Create an Unauthenticated error
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(Json(ApiErrorResponse {
            error: "unauthenticated".to_string(),
            message: message.into(),
            status_code: 401,
        }))
    }

    /// Create a Forbidden error
    pub fn forbidden() -> Self {
        ApiError::Forbidden(Json(ApiErrorResponse {
            error: "forbidden".to_string(),
            message: "You are not a party to this resource".to_string(),
            status_code: 403,
        }))
    }

    /// Create a Blocked error
    pub fn blocked() -> Self {
        ApiError::Blocked(Json(ApiErrorResponse {
            error: "blocked".to_string(),
            message: "This action is not available between these users".to_string(),
            status_code: 403,
        }))
    }

    /// Create a NotFound error
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(Json(ApiErrorResponse {
            error: "not_found".to_string(),
            message: format!("{} not found", what),
            status_code: 404,
        }))
    }

    /// Create a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(Json(ApiErrorResponse {
            error: "conflict".to_string(),
            message: message.into(),
            status_code: 409,
        }))
    }

    /// Create a ValidationError
    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(Json(ApiErrorResponse {
            error: "validation_error".to_string(),
            message: message.into(),
            status_code: 400,
        }))
    }

    /// Create an InternalError
    pub fn internal_error(message: String) -> Self {
        ApiError::InternalError(Json(ApiErrorResponse {
            error: "internal_error".to_string(),
            message,
            status_code: 500,
        }))
    }

    /// Get the error message from the error variant
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated(json) => json.0.message.clone(),
            ApiError::Forbidden(json) => json.0.message.clone(),
            ApiError::Blocked(json) => json.0.message.clone(),
            ApiError::NotFound(json) => json.0.message.clone(),
            ApiError::Conflict(json) => json.0.message.clone(),
            ApiError::ValidationError(json) => json.0.message.clone(),
            ApiError::InternalError(json) => json.0.message.clone(),
        }
    }

}

impl From<AuthError> for ApiError {
    /// Any session verification failure surfaces to resource endpoints as
    /// a plain Unauthenticated
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InternalError(json) => ApiError::internal_error(json.0.message),
            other => ApiError::unauthenticated(other.message()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}
