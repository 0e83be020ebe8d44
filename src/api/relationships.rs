use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::helpers::{authenticate, BearerAuth};
use crate::errors::api::ApiError;
use crate::services::TokenService;
use crate::stores::{RelationshipStore, SessionStore, UserStore};
use crate::types::db::{relationship, user};
use crate::types::dto::common::MessageResponse;
use crate::types::dto::relationships::{
    InvitationInfoResponse, RelationshipListResponse, RelationshipResponse,
};

/// Relationship lifecycle API endpoints
pub struct RelationshipsApi {
    relationships: Arc<RelationshipStore>,
    users: Arc<UserStore>,
    sessions: Arc<SessionStore>,
    token_manager: Arc<TokenService>,
}

/// API tags for relationship endpoints
#[derive(Tags)]
enum ApiTags {
    /// Relationship endpoints
    Relationships,
}

impl RelationshipsApi {
    /// Create a new RelationshipsApi
    pub fn new(
        relationships: Arc<RelationshipStore>,
        users: Arc<UserStore>,
        sessions: Arc<SessionStore>,
        token_manager: Arc<TokenService>,
    ) -> Self {
        Self {
            relationships,
            users,
            sessions,
            token_manager,
        }
    }

    fn to_response(rel: relationship::Model, partner: Option<&user::Model>) -> RelationshipResponse {
        RelationshipResponse {
            id: rel.id,
            status: rel.status,
            invite_token: rel.invite_token,
            partner_display_name: partner.map(|u| u.display_name.clone()),
            partner_avatar_url: partner.and_then(|u| u.avatar_url.clone()),
            created_at: rel.created_at,
        }
    }
}

#[OpenApi]
impl RelationshipsApi {
    /// Create a pending relationship and its shareable invitation token
    #[oai(path = "/relationships/invite", method = "post", tag = "ApiTags::Relationships")]
    async fn invite(&self, auth: BearerAuth) -> Result<Json<RelationshipResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let rel = self.relationships.create_invitation(&user_id).await?;

        Ok(Json(Self::to_response(rel, None)))
    }

    /// Public landing info for an invitation link
    ///
    /// No authentication: this backs the page the invitee sees before
    /// signing in. It reveals only the inviter's display identity and
    /// the invitation status.
    #[oai(path = "/relationships/invite/:token", method = "get", tag = "ApiTags::Relationships")]
    async fn lookup_invitation(
        &self,
        token: Path<String>,
    ) -> Result<Json<InvitationInfoResponse>, ApiError> {
        let (rel, inviter) = self.relationships.lookup_by_token(&token.0).await?;

        Ok(Json(InvitationInfoResponse {
            inviter_display_name: inviter.display_name,
            inviter_avatar_url: inviter.avatar_url,
            status: rel.status,
        }))
    }

    /// Accept an invitation; double submission is harmless
    #[oai(path = "/relationships/accept/:token", method = "post", tag = "ApiTags::Relationships")]
    async fn accept_invitation(
        &self,
        auth: BearerAuth,
        token: Path<String>,
    ) -> Result<Json<RelationshipResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let rel = self.relationships.accept(&token.0, &user_id).await?;
        let inviter = self.users.get(&rel.inviter_id).await.ok();

        Ok(Json(Self::to_response(rel, inviter.as_ref())))
    }

    /// Decline an invitation; terminal
    #[oai(path = "/relationships/decline/:token", method = "post", tag = "ApiTags::Relationships")]
    async fn decline_invitation(
        &self,
        auth: BearerAuth,
        token: Path<String>,
    ) -> Result<Json<MessageResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        self.relationships.decline(&token.0, &user_id).await?;

        Ok(Json(MessageResponse {
            message: "Invitation refusée".to_string(),
        }))
    }

    /// The caller's relationships with partner display info
    #[oai(path = "/relationships", method = "get", tag = "ApiTags::Relationships")]
    async fn list(&self, auth: BearerAuth) -> Result<Json<RelationshipListResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let listed = self.relationships.list_for_user(&user_id).await?;

        Ok(Json(RelationshipListResponse {
            relationships: listed
                .into_iter()
                .map(|(rel, partner)| Self::to_response(rel, partner.as_ref()))
                .collect(),
        }))
    }

    /// Delete a relationship; both parties' choices die with it
    #[oai(path = "/relationships/:id", method = "delete", tag = "ApiTags::Relationships")]
    async fn delete(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MessageResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        self.relationships.delete(&id.0, &user_id).await?;

        Ok(Json(MessageResponse {
            message: "Relation supprimée".to_string(),
        }))
    }

    /// Block the partner; erases this pairing's choices and bars any
    /// future invitation between the two
    #[oai(path = "/relationships/:id/block", method = "post", tag = "ApiTags::Relationships")]
    async fn block(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MessageResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        self.relationships.block(&id.0, &user_id).await?;

        Ok(Json(MessageResponse {
            message: "Partenaire bloqué".to_string(),
        }))
    }
}
