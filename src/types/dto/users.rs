use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// The caller's own profile
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// User id
    pub id: String,

    /// Email address
    pub email: String,

    /// Display name shown to partners
    pub display_name: String,

    /// Avatar URL, if set
    pub avatar_url: Option<String>,

    /// Account creation time (Unix timestamp)
    pub created_at: i64,
}

/// Request model for profile updates; absent fields are unchanged
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    /// New display name (non-empty, at most 100 characters)
    pub display_name: Option<String>,

    /// New avatar URL
    pub avatar_url: Option<String>,
}
