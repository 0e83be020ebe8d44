use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::errors::api::ApiError;
use crate::types::db::{
    blocked_user, device, notification, relationship, session, user, user_limit,
};

const MAX_DISPLAY_NAME_CHARS: usize = 100;

/// UserStore manages identity rows and profile mutations
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create a new UserStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find a user by email, creating the account on first login
    ///
    /// Called from magic-link verification; the account does not exist
    /// before the first successful verify. The initial display name is
    /// the local part of the email address.
    ///
    /// # Returns
    /// * `Ok(user::Model)` - The existing or freshly created user
    /// * `Err(ApiError)` - Database error
    pub async fn find_or_create_by_email(&self, email: &str) -> Result<user::Model, ApiError> {
        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        if let Some(found) = existing {
            return Ok(found);
        }

        let now = Utc::now().timestamp();
        let display_name = email.split('@').next().unwrap_or(email).to_string();
        let new_user = user::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            email: Set(email.to_string()),
            display_name: Set(display_name),
            avatar_url: Set(None),
            auth_provider: Set("magic_link".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match new_user.insert(&self.db).await {
            Ok(created) => Ok(created),
            Err(e) if e.to_string().contains("UNIQUE") => {
                // Two concurrent first logins raced; the other insert won.
                user::Entity::find()
                    .filter(user::Column::Email.eq(email))
                    .one(&self.db)
                    .await
                    .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
                    .ok_or_else(|| {
                        ApiError::internal_error("User vanished after unique conflict".to_string())
                    })
            }
            Err(e) => Err(ApiError::internal_error(format!("Database error: {}", e))),
        }
    }

    /// Fetch a user by id
    pub async fn get(&self, user_id: &str) -> Result<user::Model, ApiError> {
        user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(|| ApiError::not_found("User"))
    }

    /// Update the caller's display name and/or avatar
    ///
    /// Absent fields are left unchanged. The display name must be
    /// non-empty after trimming and at most 100 characters.
    pub async fn update_profile(
        &self,
        user_id: &str,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<user::Model, ApiError> {
        let current = self.get(user_id).await?;

        let mut active: user::ActiveModel = current.into();

        if let Some(name) = display_name {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ApiError::validation_error("Display name must not be empty"));
            }
            if trimmed.chars().count() > MAX_DISPLAY_NAME_CHARS {
                return Err(ApiError::validation_error(format!(
                    "Display name must be at most {} characters",
                    MAX_DISPLAY_NAME_CHARS
                )));
            }
            active.display_name = Set(trimmed.to_string());
        }

        if let Some(url) = avatar_url {
            active.avatar_url = Set(Some(url));
        }

        active.updated_at = Set(Utc::now().timestamp());

        active
            .update(&self.db)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))
    }

    /// Delete an account and everything it owns
    ///
    /// Deletes are issued explicitly (choices, notifications, blocks,
    /// devices, sessions, relationships the user is a party to) so the
    /// cascade does not depend on the backend honoring FK pragmas.
    pub async fn delete(&self, user_id: &str) -> Result<(), ApiError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to start transaction: {}", e)))?;

        let party = Condition::any()
            .add(relationship::Column::InviterId.eq(user_id))
            .add(relationship::Column::InviteeId.eq(user_id));
        let relationships = relationship::Entity::find()
            .filter(party.clone())
            .all(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        for rel in &relationships {
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
        }

        relationship::Entity::delete_many()
            .filter(party)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        notification::Entity::delete_many()
            .filter(notification::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        blocked_user::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(blocked_user::Column::BlockerId.eq(user_id))
                    .add(blocked_user::Column::BlockedId.eq(user_id)),
            )
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        device::Entity::delete_many()
            .filter(device::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        session::Entity::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        user::Entity::delete_by_id(user_id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore").field("db", &"<connection>").finish()
    }
}
