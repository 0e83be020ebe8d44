use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::errors::auth::AuthError;
use crate::types::db::magic_link;

/// MagicLinkStore manages one-time email sign-in tokens
pub struct MagicLinkStore {
    db: DatabaseConnection,
}

impl MagicLinkStore {
    /// Create a new MagicLinkStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Store a freshly issued magic link token
    ///
    /// # Arguments
    /// * `email` - Normalized (lowercased, trimmed) recipient address
    /// * `token` - The opaque single-use token embedded in the link
    /// * `expires_at` - Unix timestamp after which the token is dead
    pub async fn store_link(
        &self,
        email: String,
        token: String,
        expires_at: i64,
    ) -> Result<(), AuthError> {
        let new_link = magic_link::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            email: Set(email),
            token: Set(token),
            expires_at: Set(expires_at),
            used: Set(false),
            created_at: Set(Utc::now().timestamp()),
        };

        new_link
            .insert(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Failed to store magic link: {}", e)))?;

        Ok(())
    }

    /// Consume a magic link token, enforcing single use
    ///
    /// The consumption itself is a conditional UPDATE on `used = false`,
    /// so of N concurrent verifications of the same token exactly one
    /// observes `rows_affected == 1`; the rest fail with
    /// `TokenAlreadyUsed`. No partial state survives a lost race.
    ///
    /// # Returns
    /// * `Ok(String)` - The email the link was issued for
    /// * `Err(AuthError)` - TokenNotFound, TokenExpired or TokenAlreadyUsed
    pub async fn consume(&self, token: &str) -> Result<String, AuthError> {
        let link = magic_link::Entity::find()
            .filter(magic_link::Column::Token.eq(token))
            .one(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Database error: {}", e)))?
            .ok_or_else(AuthError::token_not_found)?;

        if link.used {
            return Err(AuthError::token_already_used());
        }

        if link.expires_at < Utc::now().timestamp() {
            return Err(AuthError::token_expired());
        }

        let update = magic_link::Entity::update_many()
            .col_expr(magic_link::Column::Used, Expr::value(true))
            .filter(magic_link::Column::Token.eq(token))
            .filter(magic_link::Column::Used.eq(false))
            .exec(&self.db)
            .await
            .map_err(|e| AuthError::internal_error(format!("Failed to consume magic link: {}", e)))?;

        if update.rows_affected == 0 {
            // A concurrent verification won the race.
            return Err(AuthError::token_already_used());
        }

        Ok(link.email)
    }
}

impl std::fmt::Debug for MagicLinkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagicLinkStore")
            .field("db", &"<connection>")
            .finish()
    }
}
