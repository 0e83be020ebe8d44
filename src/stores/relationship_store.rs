use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::errors::api::ApiError;
use crate::services::crypto;
use crate::stores::NotificationStore;
use crate::types::db::{blocked_user, notification, relationship, user, user_limit};
use crate::types::internal::notification::NotificationKind;
use crate::types::internal::relationship::RelationshipStatus;

/// RelationshipStore drives the pending/accepted/declined/blocked
/// lifecycle between two users
pub struct RelationshipStore {
    db: DatabaseConnection,
}

impl RelationshipStore {
    /// Create a new RelationshipStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a pending relationship with a shareable invitation token
    pub async fn create_invitation(&self, inviter_id: &str) -> Result<relationship::Model, ApiError> {
        let now = Utc::now().timestamp();
        let new_relationship = relationship::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            inviter_id: Set(inviter_id.to_string()),
            invitee_id: Set(None),
            invite_token: Set(crypto::generate_opaque_token()),
            status: Set(RelationshipStatus::Pending.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        new_relationship
            .insert(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to create invitation: {}", e)))
    }

    /// Public invitation lookup for the landing page
    ///
    /// # Returns
    /// * `Ok((relationship, inviter))` - Status plus the inviter's display info
    /// * `Err(ApiError::NotFound)` - Unknown token or deleted relationship
    pub async fn lookup_by_token(
        &self,
        token: &str,
    ) -> Result<(relationship::Model, user::Model), ApiError> {
        let rel = relationship::Entity::find()
            .filter(relationship::Column::InviteToken.eq(token))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(|| ApiError::not_found("Invitation"))?;

        let inviter = user::Entity::find_by_id(&rel.inviter_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(|| ApiError::not_found("Invitation"))?;

        Ok((rel, inviter))
    }

    /// Accept an invitation
    ///
    /// Idempotent for the accepting user: re-accepting an invitation
    /// that already bound this accepter returns the existing
    /// relationship instead of erroring, so a double-click is harmless.
    /// The pending-to-accepted transition is a conditional UPDATE keyed on
    /// the current status, so two concurrent accepts resolve to exactly
    /// one relationship.
    pub async fn accept(
        &self,
        token: &str,
        accepter_id: &str,
    ) -> Result<relationship::Model, ApiError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to start transaction: {}", e)))?;

        let rel = relationship::Entity::find()
            .filter(relationship::Column::InviteToken.eq(token))
            .one(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(|| ApiError::not_found("Invitation"))?;

        if rel.inviter_id == accepter_id {
            return Err(ApiError::validation_error(
                "You cannot accept your own invitation",
            ));
        }

        if Self::blocked_between_on(&txn, &rel.inviter_id, accepter_id).await? {
            return Err(ApiError::blocked());
        }

        match RelationshipStatus::parse(&rel.status) {
            Some(RelationshipStatus::Accepted) => {
                if rel.invitee_id.as_deref() == Some(accepter_id) {
                    return Ok(rel);
                }
                return Err(ApiError::conflict("Invitation has already been accepted"));
            }
            Some(RelationshipStatus::Declined) => {
                return Err(ApiError::conflict("Invitation was declined"));
            }
            Some(RelationshipStatus::Blocked) => {
                return Err(ApiError::blocked());
            }
            Some(RelationshipStatus::Pending) => {}
            None => {
                return Err(ApiError::internal_error(format!(
                    "Relationship {} has unknown status {}",
                    rel.id, rel.status
                )));
            }
        }

        let now = Utc::now().timestamp();
        let update = relationship::Entity::update_many()
            .col_expr(
                relationship::Column::InviteeId,
                Expr::value(accepter_id.to_string()),
            )
            .col_expr(
                relationship::Column::Status,
                Expr::value(RelationshipStatus::Accepted.as_str()),
            )
            .col_expr(relationship::Column::UpdatedAt, Expr::value(now))
            .filter(relationship::Column::Id.eq(rel.id.clone()))
            .filter(relationship::Column::Status.eq(RelationshipStatus::Pending.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to accept invitation: {}", e)))?;

        if update.rows_affected == 0 {
            // A concurrent accept got there first; report its outcome.
            let current = relationship::Entity::find_by_id(rel.id.clone())
                .one(&txn)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
                .ok_or_else(|| ApiError::not_found("Invitation"))?;
            if current.status == RelationshipStatus::Accepted.as_str()
                && current.invitee_id.as_deref() == Some(accepter_id)
            {
                return Ok(current);
            }
            return Err(ApiError::conflict("Invitation has already been accepted"));
        }

        let accepter_name = user::Entity::find_by_id(accepter_id)
            .one(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .map(|u| u.display_name)
            .unwrap_or_else(|| "Votre partenaire".to_string());

        NotificationStore::insert_on(
            &txn,
            &rel.inviter_id,
            NotificationKind::RelationAccepted,
            "Invitation acceptée",
            format!("{} a accepté votre invitation", accepter_name),
            Some(accepter_id.to_string()),
            Some(rel.id.clone()),
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to commit transaction: {}", e)))?;

        Ok(relationship::Model {
            invitee_id: Some(accepter_id.to_string()),
            status: RelationshipStatus::Accepted.as_str().to_string(),
            updated_at: now,
            ..rel
        })
    }

    /// Decline an invitation; terminal, but harmless to repeat
    pub async fn decline(&self, token: &str, decliner_id: &str) -> Result<(), ApiError> {
        let rel = relationship::Entity::find()
            .filter(relationship::Column::InviteToken.eq(token))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(|| ApiError::not_found("Invitation"))?;

        if rel.inviter_id == decliner_id {
            return Err(ApiError::validation_error(
                "You cannot decline your own invitation",
            ));
        }

        match RelationshipStatus::parse(&rel.status) {
            Some(RelationshipStatus::Declined) => return Ok(()),
            Some(RelationshipStatus::Pending) => {}
            _ => return Err(ApiError::conflict("Invitation can no longer be declined")),
        }

        relationship::Entity::update_many()
            .col_expr(
                relationship::Column::Status,
                Expr::value(RelationshipStatus::Declined.as_str()),
            )
            .col_expr(
                relationship::Column::UpdatedAt,
                Expr::value(Utc::now().timestamp()),
            )
            .filter(relationship::Column::Id.eq(rel.id))
            .filter(relationship::Column::Status.eq(RelationshipStatus::Pending.as_str()))
            .exec(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to decline invitation: {}", e)))?;

        Ok(())
    }

    /// The caller's relationships with partner display info, newest first
    pub async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<(relationship::Model, Option<user::Model>)>, ApiError> {
        let relationships = relationship::Entity::find()
            .filter(
                Condition::any()
                    .add(relationship::Column::InviterId.eq(user_id))
                    .add(relationship::Column::InviteeId.eq(user_id)),
            )
            .order_by_desc(relationship::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        let partner_ids: Vec<String> = relationships
            .iter()
            .filter_map(|rel| {
                if rel.inviter_id == user_id {
                    rel.invitee_id.clone()
                } else {
                    Some(rel.inviter_id.clone())
                }
            })
            .collect();

        let partners = user::Entity::find()
            .filter(user::Column::Id.is_in(partner_ids))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        Ok(relationships
            .into_iter()
            .map(|rel| {
                let partner_id = if rel.inviter_id == user_id {
                    rel.invitee_id.clone()
                } else {
                    Some(rel.inviter_id.clone())
                };
                let partner = partner_id
                    .and_then(|pid| partners.iter().find(|u| u.id == pid).cloned());
                (rel, partner)
            })
            .collect())
    }

    /// Fetch a relationship the given user is a party to
    pub async fn get_for_party(
        &self,
        relationship_id: &str,
        user_id: &str,
    ) -> Result<relationship::Model, ApiError> {
        let rel = relationship::Entity::find_by_id(relationship_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(|| ApiError::not_found("Relationship"))?;

        if rel.inviter_id != user_id && rel.invitee_id.as_deref() != Some(user_id) {
            return Err(ApiError::forbidden());
        }

        Ok(rel)
    }

    /// Delete a relationship and everything scoped to it
    ///
    /// Both parties' limit choices die with the relationship; the other
    /// party is told, with the relationship reference already cleared
    /// since the row will be gone by the time they read it.
    pub async fn delete(&self, relationship_id: &str, requester_id: &str) -> Result<(), ApiError> {
        let rel = self.get_for_party(relationship_id, requester_id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to start transaction: {}", e)))?;

        let other_party = if rel.inviter_id == requester_id {
            rel.invitee_id.clone()
        } else {
            Some(rel.inviter_id.clone())
        };

        if let Some(partner_id) = other_party {
            let requester_name = user::Entity::find_by_id(requester_id)
                .one(&txn)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
                .map(|u| u.display_name)
                .unwrap_or_else(|| "Votre partenaire".to_string());

            NotificationStore::insert_on(
                &txn,
                &partner_id,
                NotificationKind::RelationDeleted,
                "Relation supprimée",
                format!("{} a mis fin à votre relation", requester_name),
                Some(requester_id.to_string()),
                None,
            )
            .await?;
        }

        user_limit::Entity::delete_many()
            .filter(user_limit::Column::RelationshipId.eq(rel.id.clone()))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        notification::Entity::delete_many()
            .filter(notification::Column::RelatedRelationshipId.eq(rel.id.clone()))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        relationship::Entity::delete_by_id(rel.id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    /// Block the partner in a relationship
    ///
    /// Inserts the block edge, marks the relationship blocked, and
    /// erases both parties' limit choices for this pairing. Future
    /// invitations or acceptances between the pair fail with Blocked.
    pub async fn block(&self, relationship_id: &str, blocker_id: &str) -> Result<(), ApiError> {
        let rel = self.get_for_party(relationship_id, blocker_id).await?;

        let blocked_id = if rel.inviter_id == blocker_id {
            rel.invitee_id
                .clone()
                .ok_or_else(|| ApiError::conflict("There is no partner to block yet"))?
        } else {
            rel.inviter_id.clone()
        };

        if rel.status == RelationshipStatus::Blocked.as_str() {
            return Ok(());
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to start transaction: {}", e)))?;

        blocked_user::Entity::insert(blocked_user::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            blocker_id: Set(blocker_id.to_string()),
            blocked_id: Set(blocked_id),
            created_at: Set(Utc::now().timestamp()),
        })
        .on_conflict(
            OnConflict::columns([
                blocked_user::Column::BlockerId,
                blocked_user::Column::BlockedId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to store block: {}", e)))?;

        relationship::Entity::update_many()
            .col_expr(
                relationship::Column::Status,
                Expr::value(RelationshipStatus::Blocked.as_str()),
            )
            .col_expr(
                relationship::Column::UpdatedAt,
                Expr::value(Utc::now().timestamp()),
            )
            .filter(relationship::Column::Id.eq(rel.id.clone()))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        // Both users' data is erased for this pairing.
        user_limit::Entity::delete_many()
            .filter(user_limit::Column::RelationshipId.eq(rel.id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    /// Whether a block edge exists between two users, in either direction
    pub async fn is_blocked_between(&self, a: &str, b: &str) -> Result<bool, ApiError> {
        Self::blocked_between_on(&self.db, a, b).await
    }

    async fn blocked_between_on<C: ConnectionTrait>(
        conn: &C,
        a: &str,
        b: &str,
    ) -> Result<bool, ApiError> {
        let edge = blocked_user::Entity::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(blocked_user::Column::BlockerId.eq(a))
                            .add(blocked_user::Column::BlockedId.eq(b)),
                    )
                    .add(
                        Condition::all()
                            .add(blocked_user::Column::BlockerId.eq(b))
                            .add(blocked_user::Column::BlockedId.eq(a)),
                    ),
            )
            .one(conn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        Ok(edge.is_some())
    }
}

impl std::fmt::Debug for RelationshipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipStore")
            .field("db", &"<connection>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, Database, PaginatorTrait};

    async fn setup_test_db() -> (DatabaseConnection, RelationshipStore) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        for (id, email, name) in [
            ("user-a", "alice@example.org", "Alice"),
            ("user-b", "bob@example.org", "Bob"),
            ("user-c", "carol@example.org", "Carol"),
        ] {
            crate::types::db::user::ActiveModel {
                id: Set(id.to_string()),
                email: Set(email.to_string()),
                display_name: Set(name.to_string()),
                avatar_url: Set(None),
                auth_provider: Set("magic_link".to_string()),
                created_at: Set(0),
                updated_at: Set(0),
            }
            .insert(&db)
            .await
            .expect("Failed to seed user");
        }

        let store = RelationshipStore::new(db.clone());
        (db, store)
    }

    #[tokio::test]
    async fn test_invitation_starts_pending_without_invitee() {
        let (_db, store) = setup_test_db().await;

        let rel = store.create_invitation("user-a").await.expect("create failed");

        assert_eq!(rel.status, "pending");
        assert_eq!(rel.inviter_id, "user-a");
        assert!(rel.invitee_id.is_none());
        assert!(!rel.invite_token.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_returns_inviter_display_info() {
        let (_db, store) = setup_test_db().await;
        let rel = store.create_invitation("user-a").await.unwrap();

        let (found, inviter) = store.lookup_by_token(&rel.invite_token).await.unwrap();

        assert_eq!(found.id, rel.id);
        assert_eq!(inviter.display_name, "Alice");
    }

    #[tokio::test]
    async fn test_accept_binds_invitee_and_notifies_inviter() {
        let (db, store) = setup_test_db().await;
        let rel = store.create_invitation("user-a").await.unwrap();

        let accepted = store.accept(&rel.invite_token, "user-b").await.expect("accept failed");

        assert_eq!(accepted.status, "accepted");
        assert_eq!(accepted.invitee_id.as_deref(), Some("user-b"));

        let feed = NotificationStore::new(db).list("user-a").await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, "relation_accepted");
        assert!(feed[0].message.contains("Bob"));
    }

    #[tokio::test]
    async fn test_accept_twice_is_idempotent() {
        let (db, store) = setup_test_db().await;
        let rel = store.create_invitation("user-a").await.unwrap();

        let first = store.accept(&rel.invite_token, "user-b").await.unwrap();
        let second = store.accept(&rel.invite_token, "user-b").await.expect("re-accept failed");

        assert_eq!(first.id, second.id);
        assert_eq!(
            relationship::Entity::find().count(&db).await.unwrap(),
            1,
            "double accept must not create a second relationship"
        );
        // No duplicate notification either: the second call never reaches
        // the pending transition.
        let feed = NotificationStore::new(db).list("user-a").await.unwrap();
        assert_eq!(feed.len(), 1);
    }

    #[tokio::test]
    async fn test_accept_by_third_party_conflicts() {
        let (_db, store) = setup_test_db().await;
        let rel = store.create_invitation("user-a").await.unwrap();
        store.accept(&rel.invite_token, "user-b").await.unwrap();

        let result = store.accept(&rel.invite_token, "user-c").await;

        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_accept_own_invitation_is_rejected() {
        let (_db, store) = setup_test_db().await;
        let rel = store.create_invitation("user-a").await.unwrap();

        let result = store.accept(&rel.invite_token, "user-a").await;

        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_decline_is_terminal() {
        let (_db, store) = setup_test_db().await;
        let rel = store.create_invitation("user-a").await.unwrap();

        store.decline(&rel.invite_token, "user-b").await.expect("decline failed");
        // Declining again stays quiet.
        store.decline(&rel.invite_token, "user-b").await.expect("re-decline failed");

        let accept_after = store.accept(&rel.invite_token, "user-b").await;
        assert!(matches!(accept_after, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_requires_party() {
        let (_db, store) = setup_test_db().await;
        let rel = store.create_invitation("user-a").await.unwrap();
        store.accept(&rel.invite_token, "user-b").await.unwrap();

        let stranger = store.delete(&rel.id, "user-c").await;
        assert!(matches!(stranger, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_cascades_choices_and_notifies_partner() {
        let (db, store) = setup_test_db().await;
        let rel = store.create_invitation("user-a").await.unwrap();
        store.accept(&rel.invite_token, "user-b").await.unwrap();

        user_limit::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            user_id: Set("user-b".to_string()),
            relationship_id: Set(rel.id.clone()),
            limit_id: Set(seed_one_limit(&db).await),
            is_accepted: Set(true),
            note: Set(None),
            created_at: Set(0),
            updated_at: Set(0),
        }
        .insert(&db)
        .await
        .unwrap();

        store.delete(&rel.id, "user-a").await.expect("delete failed");

        assert_eq!(user_limit::Entity::find().count(&db).await.unwrap(), 0);
        assert!(relationship::Entity::find_by_id(rel.id)
            .one(&db)
            .await
            .unwrap()
            .is_none());

        let feed = NotificationStore::new(db).list("user-b").await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, "relation_deleted");
        assert!(feed[0].related_relationship_id.is_none());
    }

    #[tokio::test]
    async fn test_block_erases_choices_and_bars_reinvitation() {
        let (db, store) = setup_test_db().await;
        let rel = store.create_invitation("user-a").await.unwrap();
        store.accept(&rel.invite_token, "user-b").await.unwrap();

        user_limit::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            user_id: Set("user-a".to_string()),
            relationship_id: Set(rel.id.clone()),
            limit_id: Set(seed_one_limit(&db).await),
            is_accepted: Set(true),
            note: Set(Some("note privée".to_string())),
            created_at: Set(0),
            updated_at: Set(0),
        }
        .insert(&db)
        .await
        .unwrap();

        store.block(&rel.id, "user-b").await.expect("block failed");

        let blocked = relationship::Entity::find_by_id(rel.id.clone())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(blocked.status, "blocked");
        assert_eq!(user_limit::Entity::find().count(&db).await.unwrap(), 0);
        assert!(store.is_blocked_between("user-a", "user-b").await.unwrap());

        // A fresh invitation between the blocked pair cannot be accepted,
        // from either direction.
        let rel2 = store.create_invitation("user-a").await.unwrap();
        let accept = store.accept(&rel2.invite_token, "user-b").await;
        assert!(matches!(accept, Err(ApiError::Blocked(_))));

        let rel3 = store.create_invitation("user-b").await.unwrap();
        let accept = store.accept(&rel3.invite_token, "user-a").await;
        assert!(matches!(accept, Err(ApiError::Blocked(_))));
    }

    #[tokio::test]
    async fn test_list_for_user_includes_partner() {
        let (_db, store) = setup_test_db().await;
        let rel = store.create_invitation("user-a").await.unwrap();
        store.accept(&rel.invite_token, "user-b").await.unwrap();
        store.create_invitation("user-a").await.unwrap();

        let listed = store.list_for_user("user-a").await.unwrap();
        assert_eq!(listed.len(), 2);

        let accepted = listed
            .iter()
            .find(|(r, _)| r.status == "accepted")
            .expect("accepted relationship missing");
        assert_eq!(accepted.1.as_ref().map(|u| u.display_name.as_str()), Some("Bob"));

        let pending = listed.iter().find(|(r, _)| r.status == "pending").unwrap();
        assert!(pending.1.is_none());
    }

    async fn seed_one_limit(db: &DatabaseConnection) -> String {
        crate::services::catalog::seed(db).await.expect("seed failed");
        crate::types::db::limit::Entity::find()
            .one(db)
            .await
            .unwrap()
            .expect("catalog empty")
            .id
    }
}
