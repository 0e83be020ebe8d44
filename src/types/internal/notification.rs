use std::fmt;

/// Fixed notification taxonomy. `RelationRequest` is reserved for
/// direct-addressed invitations; the link-based flow has no recipient
/// before acceptance, so nothing emits it today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    RelationRequest,
    RelationAccepted,
    NewCommonLimit,
    LimitRemoved,
    RelationDeleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::RelationRequest => "relation_request",
            NotificationKind::RelationAccepted => "relation_accepted",
            NotificationKind::NewCommonLimit => "new_common_limit",
            NotificationKind::LimitRemoved => "limit_removed",
            NotificationKind::RelationDeleted => "relation_deleted",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
