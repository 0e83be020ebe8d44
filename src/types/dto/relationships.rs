use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// A relationship as seen by one of its parties
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct RelationshipResponse {
    /// Relationship id
    pub id: String,

    /// Lifecycle status: pending, accepted, declined or blocked
    pub status: String,

    /// Invitation token; only the inviter shares it onward
    pub invite_token: String,

    /// The other party's display name, once known
    pub partner_display_name: Option<String>,

    /// The other party's avatar, once known
    pub partner_avatar_url: Option<String>,

    /// Creation time (Unix timestamp)
    pub created_at: i64,
}

/// Response model for the caller's relationship list
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct RelationshipListResponse {
    pub relationships: Vec<RelationshipResponse>,
}

/// Public landing info for an invitation link; no auth required, so it
/// carries nothing beyond the inviter's display identity and status
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct InvitationInfoResponse {
    /// Inviter's display name
    pub inviter_display_name: String,

    /// Inviter's avatar, if set
    pub inviter_avatar_url: Option<String>,

    /// Current status of the invitation
    pub status: String,
}
