use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::errors::auth::AuthError;
use crate::types::db::session;
use crate::types::internal::auth::SessionPolicy;

/// SessionStore persists session records under the "tracked" policy
///
/// Under `Stateless` every method is a no-op success: the JWT signature
/// and expiry are the whole truth and logout cannot revoke early. Under
/// `Tracked` a session row (keyed by the JWT jti) must exist for a token
/// to be honored, so deleting the row revokes immediately.
pub struct SessionStore {
    db: DatabaseConnection,
    policy: SessionPolicy,
}

impl SessionStore {
    /// Create a new SessionStore with the given connection and policy
    pub fn new(db: DatabaseConnection, policy: SessionPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Record a freshly issued session
    pub async fn create(&self, jti: &str, user_id: &str, expires_at: i64) -> Result<(), AuthError> {
        if self.policy == SessionPolicy::Stateless {
            return Ok(());
        }

        session::ActiveModel {
            id: Set(jti.to_string()),
            user_id: Set(user_id.to_string()),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now().timestamp()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| AuthError::internal_error(format!("Failed to store session: {}", e)))?;

        Ok(())
    }

    /// Check that a session is still live
    ///
    /// Called after JWT validation; the signature and expiry have
    /// already been checked, this only answers "was it logged out?".
    pub async fn verify(&self, jti: &str) -> Result<(), AuthError> {
        if self.policy == SessionPolicy::Stateless {
            return Ok(());
        }

        let found = session::Entity::find_by_id(jti)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(AuthError::invalid_token)?;

        if found.expires_at < Utc::now().timestamp() {
            return Err(AuthError::expired_token());
        }

        Ok(())
    }

    /// Invalidate a session (logout)
    pub async fn delete(&self, jti: &str) -> Result<(), AuthError> {
        if self.policy == SessionPolicy::Stateless {
            return Ok(());
        }

        session::Entity::delete_by_id(jti)
            .exec(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Failed to delete session: {}", e)))?;

        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("db", &"<connection>")
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_test_db(policy: SessionPolicy) -> SessionStore {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        crate::types::db::user::ActiveModel {
            id: Set("user-1".to_string()),
            email: Set("alice@example.org".to_string()),
            display_name: Set("alice".to_string()),
            avatar_url: Set(None),
            auth_provider: Set("magic_link".to_string()),
            created_at: Set(0),
            updated_at: Set(0),
        }
        .insert(&db)
        .await
        .expect("Failed to seed user");

        SessionStore::new(db, policy)
    }

    fn future() -> i64 {
        Utc::now().timestamp() + 900
    }

    #[tokio::test]
    async fn test_tracked_session_roundtrip_and_logout() {
        let store = setup_test_db(SessionPolicy::Tracked).await;

        store.create("jti-1", "user-1", future()).await.unwrap();
        assert!(store.verify("jti-1").await.is_ok());

        store.delete("jti-1").await.unwrap();
        let after_logout = store.verify("jti-1").await;

        assert!(matches!(after_logout, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_tracked_unknown_session_is_invalid() {
        let store = setup_test_db(SessionPolicy::Tracked).await;

        let result = store.verify("never-issued").await;

        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_stateless_policy_skips_storage() {
        let store = setup_test_db(SessionPolicy::Stateless).await;

        store.create("jti-1", "user-1", future()).await.unwrap();
        // Nothing was written and nothing is checked.
        assert!(store.verify("anything-at-all").await.is_ok());
        assert!(session::Entity::find().one(&store.db).await.unwrap().is_none());
    }
}
