use poem_openapi::{payload::Json, ApiResponse, Object};
use std::fmt;

/// Standardized error response for authentication endpoints
#[derive(Object, Debug)]
pub struct AuthErrorResponse {
    /// Error code identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    pub status_code: u16,
}

/// Authentication error types
#[derive(ApiResponse, Debug)]
pub enum AuthError {
    /// Invalid or malformed JWT
    #[oai(status = 401)]
    InvalidToken(Json<AuthErrorResponse>),

    /// JWT has expired
    #[oai(status = 401)]
    ExpiredToken(Json<AuthErrorResponse>),

    /// Authorization header is missing or malformed
    #[oai(status = 401)]
    MissingAuthHeader(Json<AuthErrorResponse>),

    /// Magic link token does not exist
    #[oai(status = 401)]
    TokenNotFound(Json<AuthErrorResponse>),

    /// Magic link token was already consumed
    #[oai(status = 401)]
    TokenAlreadyUsed(Json<AuthErrorResponse>),

    /// Magic link token has expired
    #[oai(status = 401)]
    TokenExpired(Json<AuthErrorResponse>),

    /// Device token does not match any live device
    #[oai(status = 401)]
    InvalidDeviceToken(Json<AuthErrorResponse>),

    /// Device token has expired
    #[oai(status = 401)]
    ExpiredDeviceToken(Json<AuthErrorResponse>),

    /// Request payload failed validation
    #[oai(status = 400)]
    ValidationError(Json<AuthErrorResponse>),

    /// Internal server error
    #[oai(status = 500)]
    InternalError(Json<AuthErrorResponse>),
}

impl AuthError {
    /// Create an InvalidToken error
    pub fn invalid_token() -> Self {
        AuthError::InvalidToken(Json(AuthErrorResponse {
            error: "invalid_token".to_string(),
            message: "Invalid or malformed JWT".to_string(),
            status_code: 401,
        }))
    }

    /// Create an ExpiredToken error
    pub fn expired_token() -> Self {
        AuthError::ExpiredToken(Json(AuthErrorResponse {
            error: "expired_token".to_string(),
            message: "JWT has expired".to_string(),
            status_code: 401,
        }))
    }

    /// Create a MissingAuthHeader error
    pub fn missing_auth_header() -> Self {
        AuthError::MissingAuthHeader(Json(AuthErrorResponse {
            error: "missing_auth_header".to_string(),
            message: "Authorization header is required".to_string(),
            status_code: 401,
        }))
    }

    /// Create a TokenNotFound error (magic link)
    pub fn token_not_found() -> Self {
        AuthError::TokenNotFound(Json(AuthErrorResponse {
            error: "token_not_found".to_string(),
            message: "Sign-in link is not valid".to_string(),
            status_code: 401,
        }))
    }

    /// Create a TokenAlreadyUsed error (magic link)
    pub fn token_already_used() -> Self {
        AuthError::TokenAlreadyUsed(Json(AuthErrorResponse {
            error: "token_already_used".to_string(),
            message: "Sign-in link has already been used".to_string(),
            status_code: 401,
        }))
    }

    /// Create a TokenExpired error (magic link)
    pub fn token_expired() -> Self {
        AuthError::TokenExpired(Json(AuthErrorResponse {
            error: "token_expired".to_string(),
            message: "Sign-in link has expired".to_string(),
            status_code: 401,
        }))
    }

    /// Create an InvalidDeviceToken error
    pub fn invalid_device_token() -> Self {
        AuthError::InvalidDeviceToken(Json(AuthErrorResponse {
            error: "invalid_device_token".to_string(),
            message: "Device token is invalid or revoked".to_string(),
            status_code: 401,
        }))
    }

    /// Create an ExpiredDeviceToken error
    pub fn expired_device_token() -> Self {
        AuthError::ExpiredDeviceToken(Json(AuthErrorResponse {
            error: "expired_device_token".to_string(),
            message: "Device token has expired".to_string(),
            status_code: 401,
        }))
    }

    /// Create a ValidationError
    pub fn validation_error(message: impl Into<String>) -> Self {
        AuthError::ValidationError(Json(AuthErrorResponse {
            error: "validation_error".to_string(),
            message: message.into(),
            status_code: 400,
        }))
    }

    /// Create an InternalError
    pub fn internal_error(message: String) -> Self {
        AuthError::InternalError(Json(AuthErrorResponse {
            error: "internal_error".to_string(),
            message,
            status_code: 500,
        }))
    }

    /// Get the error message from the error variant
    pub fn message(&self) -> String {
        match self {
            AuthError::InvalidToken(json) => json.0.message.clone(),
            AuthError::ExpiredToken(json) => json.0.message.clone(),
            AuthError::MissingAuthHeader(json) => json.0.message.clone(),
            AuthError::TokenNotFound(json) => json.0.message.clone(),
            AuthError::TokenAlreadyUsed(json) => json.0.message.clone(),
            AuthError::TokenExpired(json) => json.0.message.clone(),
            AuthError::InvalidDeviceToken(json) => json.0.message.clone(),
            AuthError::ExpiredDeviceToken(json) => json.0.message.clone(),
            AuthError::ValidationError(json) => json.0.message.clone(),
            AuthError::InternalError(json) => json.0.message.clone(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}
