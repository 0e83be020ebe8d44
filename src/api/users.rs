use poem_openapi::{payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::helpers::{authenticate, BearerAuth};
use crate::errors::api::ApiError;
use crate::services::TokenService;
use crate::stores::{SessionStore, UserStore};
use crate::types::dto::common::MessageResponse;
use crate::types::dto::users::{ProfileResponse, UpdateProfileRequest};

/// Profile API endpoints
pub struct UsersApi {
    users: Arc<UserStore>,
    sessions: Arc<SessionStore>,
    token_manager: Arc<TokenService>,
}

/// API tags for profile endpoints
#[derive(Tags)]
enum ApiTags {
    /// Profile endpoints
    Users,
}

impl UsersApi {
    /// Create a new UsersApi
    pub fn new(
        users: Arc<UserStore>,
        sessions: Arc<SessionStore>,
        token_manager: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            sessions,
            token_manager,
        }
    }
}

#[OpenApi(prefix_path = "/users")]
impl UsersApi {
    /// The caller's own profile
    #[oai(path = "/me", method = "get", tag = "ApiTags::Users")]
    async fn me(&self, auth: BearerAuth) -> Result<Json<ProfileResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let user = self.users.get(&user_id).await?;

        Ok(Json(ProfileResponse {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }))
    }

    /// Update display name and/or avatar
    #[oai(path = "/me", method = "put", tag = "ApiTags::Users")]
    async fn update_me(
        &self,
        auth: BearerAuth,
        body: Json<UpdateProfileRequest>,
    ) -> Result<Json<ProfileResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let body = body.0;
        let user = self
            .users
            .update_profile(&user_id, body.display_name, body.avatar_url)
            .await?;

        Ok(Json(ProfileResponse {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }))
    }

    /// Delete the account and everything it owns
    #[oai(path = "/me", method = "delete", tag = "ApiTags::Users")]
    async fn delete_me(&self, auth: BearerAuth) -> Result<Json<MessageResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        self.users.delete(&user_id).await?;

        Ok(Json(MessageResponse {
            message: "Compte supprimé".to_string(),
        }))
    }
}
