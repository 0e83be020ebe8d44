use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::errors::api::ApiError;
use crate::types::db::notification;
use crate::types::internal::notification::NotificationKind;

/// NotificationStore manages the per-user event feed
///
/// Rows are only ever created by server-side business logic reacting to
/// relationship and limit-choice transitions; the recipient can do
/// nothing but read them and mark them read.
pub struct NotificationStore {
    db: DatabaseConnection,
}

impl NotificationStore {
    /// Create a new NotificationStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a notification on an arbitrary connection
    ///
    /// Associated function rather than a method so emitting stores can
    /// call it inside their own transactions and the notification
    /// commits or rolls back together with the transition that caused
    /// it.
    pub async fn insert_on<C: ConnectionTrait>(
        conn: &C,
        recipient_id: &str,
        kind: NotificationKind,
        title: &str,
        message: String,
        related_user_id: Option<String>,
        related_relationship_id: Option<String>,
    ) -> Result<(), ApiError> {
        notification::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(recipient_id.to_string()),
            kind: Set(kind.as_str().to_string()),
            title: Set(title.to_string()),
            message: Set(message),
            related_user_id: Set(related_user_id),
            related_relationship_id: Set(related_relationship_id),
            is_read: Set(false),
            created_at: Set(Utc::now().timestamp()),
        }
        .insert(conn)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to store notification: {}", e)))?;

        Ok(())
    }

    /// The recipient's feed, newest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<notification::Model>, ApiError> {
        notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))
    }

    /// Mark one notification read; recipient only
    pub async fn mark_read(&self, notification_id: &str, user_id: &str) -> Result<(), ApiError> {
        let found = notification::Entity::find_by_id(notification_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(|| ApiError::not_found("Notification"))?;

        if found.user_id != user_id {
            return Err(ApiError::forbidden());
        }

        let mut active: notification::ActiveModel = found.into();
        active.is_read = Set(true);
        active
            .update(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        Ok(())
    }

    /// Mark the whole feed read
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of notifications flipped to read
    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64, ApiError> {
        let update = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        Ok(update.rows_affected)
    }
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationStore")
            .field("db", &"<connection>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_test_db() -> (DatabaseConnection, NotificationStore) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        for (id, email) in [("user-1", "alice@example.org"), ("user-2", "bob@example.org")] {
            crate::types::db::user::ActiveModel {
                id: Set(id.to_string()),
                email: Set(email.to_string()),
                display_name: Set(id.to_string()),
                avatar_url: Set(None),
                auth_provider: Set("magic_link".to_string()),
                created_at: Set(0),
                updated_at: Set(0),
            }
            .insert(&db)
            .await
            .expect("Failed to seed user");
        }

        let store = NotificationStore::new(db.clone());
        (db, store)
    }

    #[tokio::test]
    async fn test_list_returns_only_own_feed() {
        let (db, store) = setup_test_db().await;

        NotificationStore::insert_on(
            &db,
            "user-1",
            NotificationKind::RelationAccepted,
            "Invitation acceptée",
            "bob a accepté votre invitation".to_string(),
            Some("user-2".to_string()),
            None,
        )
        .await
        .unwrap();
        NotificationStore::insert_on(
            &db,
            "user-2",
            NotificationKind::NewCommonLimit,
            "Nouvelle limite en commun",
            "Une limite est désormais partagée".to_string(),
            Some("user-1".to_string()),
            None,
        )
        .await
        .unwrap();

        let feed = store.list("user-1").await.unwrap();

        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, "relation_accepted");
        assert!(!feed[0].is_read);
    }

    #[tokio::test]
    async fn test_mark_read_is_recipient_only() {
        let (db, store) = setup_test_db().await;
        NotificationStore::insert_on(
            &db,
            "user-1",
            NotificationKind::LimitRemoved,
            "Limite retirée",
            "Une limite en commun a été retirée".to_string(),
            None,
            None,
        )
        .await
        .unwrap();
        let id = store.list("user-1").await.unwrap()[0].id.clone();

        let stranger = store.mark_read(&id, "user-2").await;
        assert!(matches!(stranger, Err(ApiError::Forbidden(_))));

        store.mark_read(&id, "user-1").await.expect("mark_read failed");
        assert!(store.list("user-1").await.unwrap()[0].is_read);
    }

    #[tokio::test]
    async fn test_mark_all_read_counts_unread_only() {
        let (db, store) = setup_test_db().await;
        for i in 0..3 {
            NotificationStore::insert_on(
                &db,
                "user-1",
                NotificationKind::RelationDeleted,
                "Relation supprimée",
                format!("relation {} supprimée", i),
                None,
                None,
            )
            .await
            .unwrap();
        }
        let id = store.list("user-1").await.unwrap()[0].id.clone();
        store.mark_read(&id, "user-1").await.unwrap();

        let flipped = store.mark_all_read("user-1").await.unwrap();

        assert_eq!(flipped, 2);
        assert!(store.list("user-1").await.unwrap().iter().all(|n| n.is_read));
    }
}
