use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// Request model for requesting a magic sign-in link
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct MagicLinkRequest {
    /// Email address the link is sent to
    pub email: String,
}

/// Response model after requesting a magic link
///
/// Identical whether or not the address is known, so the endpoint
/// cannot be used to probe which emails have accounts.
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct MagicLinkResponse {
    /// Success message
    pub message: String,

    /// The sign-in link, surfaced only in the dev configuration
    pub debug_link: Option<String>,
}

/// Response model containing a session and the device credential
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// JWT access token for API authentication
    pub access_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Number of seconds until the access token expires
    pub expires_in: i64,

    /// Device id to present alongside the device token on refresh
    pub device_id: String,

    /// Long-lived device token; shown exactly once, only its hash is kept
    pub device_token: String,
}

/// Request model for rotating a device token
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeviceRefreshRequest {
    /// Device id issued at login
    pub device_id: String,

    /// Current device token; it is rotated on success
    pub device_token: String,
}

/// Response model for device refresh
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeviceRefreshResponse {
    /// New JWT access token for API authentication
    pub access_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Number of seconds until the access token expires
    pub expires_in: i64,

    /// Replacement device token; the presented one is now dead
    pub device_token: String,
}

/// Device metadata as exposed to its owner; never the token or hash
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device id
    pub id: String,

    /// Human-readable label
    pub label: String,

    /// Creation time (Unix timestamp)
    pub created_at: i64,

    /// Last successful refresh (Unix timestamp)
    pub last_seen_at: i64,

    /// Expiry of the current token (Unix timestamp)
    pub expires_at: i64,
}

/// Response model for the device list
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct DeviceListResponse {
    /// The caller's live devices, most recently seen first
    pub devices: Vec<DeviceInfo>,
}

/// Request model for logout
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// Device to revoke along with the session, if any
    pub device_id: Option<String>,
}
