use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::errors::auth::AuthError;
use crate::types::db::device;

/// A user may hold at most this many live devices; issuing one more
/// revokes the least-recently-seen first.
const MAX_DEVICES_PER_USER: u64 = 10;

/// DeviceStore manages long-lived per-device refresh credentials
///
/// Device tokens are bearer secrets with a year-long blast radius, so
/// only their keyed hash is stored and every successful refresh rotates
/// the token. Replay protection is the rotation itself: after a refresh
/// the previous hash no longer matches anything.
pub struct DeviceStore {
    db: DatabaseConnection,
}

impl DeviceStore {
    /// Create a new DeviceStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Register a new device for a user
    ///
    /// # Arguments
    /// * `user_id` - The owning user
    /// * `label` - Human-readable device label
    /// * `token_hash` - Keyed hash of the freshly generated token
    /// * `expires_at` - Unix timestamp when the token expires
    ///
    /// # Returns
    /// * `Ok(device::Model)` - The created device row
    pub async fn create_device(
        &self,
        user_id: &str,
        label: String,
        token_hash: String,
        expires_at: i64,
    ) -> Result<device::Model, AuthError> {
        self.enforce_device_cap(user_id).await?;

        let now = Utc::now().timestamp();
        let new_device = device::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            label: Set(label),
            token_hash: Set(token_hash),
            created_at: Set(now),
            last_seen_at: Set(now),
            expires_at: Set(expires_at),
            revoked: Set(false),
        };

        new_device
            .insert(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Failed to store device: {}", e)))
    }

    /// Revoke least-recently-seen devices until the cap has room
    async fn enforce_device_cap(&self, user_id: &str) -> Result<(), AuthError> {
        let live = device::Entity::find()
            .filter(device::Column::UserId.eq(user_id))
            .filter(device::Column::Revoked.eq(false))
            .order_by_asc(device::Column::LastSeenAt)
            .all(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Database error: {}", e)))?;

        if (live.len() as u64) < MAX_DEVICES_PER_USER {
            return Ok(());
        }

        let excess = live.len() as u64 - (MAX_DEVICES_PER_USER - 1);
        for stale in live.into_iter().take(excess as usize) {
            let mut active: device::ActiveModel = stale.into();
            active.revoked = Set(true);
            active
                .update(&self.db)
                .await
                .map_err(|e| AuthError::internal_error(format!("Database error: {}", e)))?;
        }

        Ok(())
    }

    /// Rotate a device token and return the owning user
    ///
    /// The match is on `(id, presented hash, revoked = false)` and the
    /// rotation is a conditional UPDATE on the same predicate, so two
    /// concurrent refreshes with the same token cannot both succeed.
    /// An expired device is revoked as a side effect of the rejection.
    ///
    /// # Arguments
    /// * `device_id` - The device being refreshed
    /// * `presented_hash` - Keyed hash of the token the client presented
    /// * `new_hash` - Keyed hash of the replacement token
    /// * `new_expires_at` - Fresh expiry for the rotated token
    ///
    /// # Returns
    /// * `Ok(String)` - The user_id owning the device
    /// * `Err(AuthError)` - InvalidDeviceToken or ExpiredDeviceToken
    pub async fn rotate(
        &self,
        device_id: &str,
        presented_hash: &str,
        new_hash: String,
        new_expires_at: i64,
    ) -> Result<String, AuthError> {
        let found = device::Entity::find()
            .filter(device::Column::Id.eq(device_id))
            .filter(device::Column::TokenHash.eq(presented_hash))
            .filter(device::Column::Revoked.eq(false))
            .one(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(AuthError::invalid_device_token)?;

        let now = Utc::now().timestamp();
        if found.expires_at < now {
            let mut active: device::ActiveModel = found.into();
            active.revoked = Set(true);
            active
                .update(&self.db)
                .await
                .map_err(|e| AuthError::internal_error(format!("Database error: {}", e)))?;
            return Err(AuthError::expired_device_token());
        }

        let update = device::Entity::update_many()
            .col_expr(device::Column::TokenHash, Expr::value(new_hash))
            .col_expr(device::Column::ExpiresAt, Expr::value(new_expires_at))
            .col_expr(device::Column::LastSeenAt, Expr::value(now))
            .filter(device::Column::Id.eq(device_id))
            .filter(device::Column::TokenHash.eq(presented_hash))
            .filter(device::Column::Revoked.eq(false))
            .exec(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Failed to rotate device: {}", e)))?;

        if update.rows_affected == 0 {
            // A concurrent refresh rotated first; the presented token is stale.
            return Err(AuthError::invalid_device_token());
        }

        Ok(found.user_id)
    }

    /// Revoke one of the caller's own devices
    ///
    /// Ownership is folded into the lookup so revoking someone else's
    /// device is indistinguishable from revoking an unknown one.
    pub async fn revoke(&self, device_id: &str, user_id: &str) -> Result<(), AuthError> {
        let found = device::Entity::find()
            .filter(device::Column::Id.eq(device_id))
            .filter(device::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(AuthError::invalid_device_token)?;

        let mut active: device::ActiveModel = found.into();
        active.revoked = Set(true);
        active
            .update(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Failed to revoke device: {}", e)))?;

        Ok(())
    }

    /// List a user's non-revoked devices, most recently seen first
    ///
    /// Returned models still carry the token hash; callers expose only
    /// metadata (id, label, timestamps) on the wire.
    pub async fn list(&self, user_id: &str) -> Result<Vec<device::Model>, AuthError> {
        device::Entity::find()
            .filter(device::Column::UserId.eq(user_id))
            .filter(device::Column::Revoked.eq(false))
            .order_by_desc(device::Column::LastSeenAt)
            .all(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Database error: {}", e)))
    }
}

impl std::fmt::Debug for DeviceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStore")
            .field("db", &"<connection>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_test_db() -> (DatabaseConnection, DeviceStore) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        // Devices reference users; create one to own them.
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

        let store = DeviceStore::new(db.clone());
        (db, store)
    }

    fn future() -> i64 {
        Utc::now().timestamp() + 3600
    }

    #[tokio::test]
    async fn test_create_and_list_device() {
        let (_db, store) = setup_test_db().await;

        let created = store
            .create_device("user-1", "Laptop".to_string(), "hash-1".to_string(), future())
            .await
            .expect("create failed");

        let listed = store.list("user-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].label, "Laptop");
    }

    #[tokio::test]
    async fn test_rotate_accepts_current_hash_and_rejects_old() {
        let (_db, store) = setup_test_db().await;
        let created = store
            .create_device("user-1", "Laptop".to_string(), "hash-old".to_string(), future())
            .await
            .unwrap();

        let user_id = store
            .rotate(&created.id, "hash-old", "hash-new".to_string(), future())
            .await
            .expect("rotate failed");
        assert_eq!(user_id, "user-1");

        // Replaying the pre-rotation token must fail.
        let replay = store
            .rotate(&created.id, "hash-old", "hash-newer".to_string(), future())
            .await;
        assert!(matches!(replay, Err(AuthError::InvalidDeviceToken(_))));

        // The rotated token is the one that works.
        let ok = store
            .rotate(&created.id, "hash-new", "hash-newer".to_string(), future())
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_rotate_expired_device_revokes_it() {
        let (_db, store) = setup_test_db().await;
        let past = Utc::now().timestamp() - 60;
        let created = store
            .create_device("user-1", "Laptop".to_string(), "hash-1".to_string(), past)
            .await
            .unwrap();

        let result = store
            .rotate(&created.id, "hash-1", "hash-2".to_string(), future())
            .await;
        assert!(matches!(result, Err(AuthError::ExpiredDeviceToken(_))));

        // Follow-up attempts hit the revoked flag, not the expiry check.
        let again = store
            .rotate(&created.id, "hash-1", "hash-3".to_string(), future())
            .await;
        assert!(matches!(again, Err(AuthError::InvalidDeviceToken(_))));
    }

    #[tokio::test]
    async fn test_revoked_device_rejects_refresh() {
        let (_db, store) = setup_test_db().await;
        let created = store
            .create_device("user-1", "Laptop".to_string(), "hash-1".to_string(), future())
            .await
            .unwrap();

        store.revoke(&created.id, "user-1").await.expect("revoke failed");

        let result = store
            .rotate(&created.id, "hash-1", "hash-2".to_string(), future())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidDeviceToken(_))));
    }

    #[tokio::test]
    async fn test_revoke_requires_ownership() {
        let (_db, store) = setup_test_db().await;
        let created = store
            .create_device("user-1", "Laptop".to_string(), "hash-1".to_string(), future())
            .await
            .unwrap();

        let result = store.revoke(&created.id, "someone-else").await;

        assert!(matches!(result, Err(AuthError::InvalidDeviceToken(_))));
        // Still usable by its actual owner.
        assert_eq!(store.list("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_device_cap_revokes_least_recently_seen() {
        let (_db, store) = setup_test_db().await;

        let mut first_id = None;
        for i in 0..MAX_DEVICES_PER_USER {
            let created = store
                .create_device(
                    "user-1",
                    format!("Device {}", i),
                    format!("hash-{}", i),
                    future(),
                )
                .await
                .unwrap();
            if i == 0 {
                first_id = Some(created.id.clone());
            }
            // Distinct last_seen ordering for the LRU pick.
            let mut active: device::ActiveModel = created.into();
            active.last_seen_at = Set(i as i64);
            active.update(&store.db).await.unwrap();
        }

        store
            .create_device("user-1", "One too many".to_string(), "hash-extra".to_string(), future())
            .await
            .unwrap();

        let listed = store.list("user-1").await.unwrap();
        assert_eq!(listed.len() as u64, MAX_DEVICES_PER_USER);
        assert!(listed.iter().all(|d| Some(&d.id) != first_id.as_ref()));
    }
}
