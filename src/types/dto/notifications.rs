use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// One entry of the caller's notification feed
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct NotificationItem {
    /// Notification id
    pub id: String,

    /// Kind: relation_request, relation_accepted, new_common_limit,
    /// limit_removed or relation_deleted
    pub kind: String,

    /// Short title
    pub title: String,

    /// Human-readable message
    pub message: String,

    /// The other user involved, if any
    pub related_user_id: Option<String>,

    /// The relationship involved, if it still exists
    pub related_relationship_id: Option<String>,

    /// Whether the recipient marked it read
    pub is_read: bool,

    /// Creation time (Unix timestamp)
    pub created_at: i64,
}

/// Response model for the notification feed
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct NotificationListResponse {
    /// Newest first
    pub notifications: Vec<NotificationItem>,
}

/// Response model for read-all
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    /// Number of notifications marked read
    pub marked: u64,
}
