use std::fmt;

/// Relationship lifecycle states. Stored as plain strings; `declined` and
/// `blocked` are terminal, `pending` can only move to `accepted` or
/// `declined`, and `accepted` can only move to `blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipStatus {
    Pending,
    Accepted,
    Declined,
    Blocked,
}

impl RelationshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipStatus::Pending => "pending",
            RelationshipStatus::Accepted => "accepted",
            RelationshipStatus::Declined => "declined",
            RelationshipStatus::Blocked => "blocked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RelationshipStatus::Pending),
            "accepted" => Some(RelationshipStatus::Accepted),
            "declined" => Some(RelationshipStatus::Declined),
            "blocked" => Some(RelationshipStatus::Blocked),
            _ => None,
        }
    }
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
