use serde::{Deserialize, Serialize};

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user_id)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Session id; matched against the sessions table under the
    /// "tracked" session policy
    pub jti: String,
}

/// How bearer sessions are verified.
///
/// `Stateless` trusts signature + expiry alone (no storage I/O per
/// request, no immediate logout). `Tracked` additionally requires a live
/// row in the sessions table keyed by the JWT jti, so logout revokes
/// immediately. The trade-off is an explicit deployment choice, not two
/// behaviors mixed in one code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPolicy {
    Stateless,
    Tracked,
}

impl SessionPolicy {
    /// Parse from configuration; unknown values fall back to `Stateless`.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "tracked" => SessionPolicy::Tracked,
            _ => SessionPolicy::Stateless,
        }
    }
}
