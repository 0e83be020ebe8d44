use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::helpers::{authenticate, BearerAuth};
use crate::errors::api::ApiError;
use crate::services::TokenService;
use crate::stores::{NotificationStore, SessionStore};
use crate::types::dto::common::MessageResponse;
use crate::types::dto::notifications::{
    MarkAllReadResponse, NotificationItem, NotificationListResponse,
};

/// Notification feed API endpoints
///
/// Delivery to live clients is plain polling of the feed; there is no
/// push channel to maintain or reconnect.
pub struct NotificationsApi {
    notifications: Arc<NotificationStore>,
    sessions: Arc<SessionStore>,
    token_manager: Arc<TokenService>,
}

/// API tags for notification endpoints
#[derive(Tags)]
enum ApiTags {
    /// Notification feed
    Notifications,
}

impl NotificationsApi {
    /// Create a new NotificationsApi
    pub fn new(
        notifications: Arc<NotificationStore>,
        sessions: Arc<SessionStore>,
        token_manager: Arc<TokenService>,
    ) -> Self {
        Self {
            notifications,
            sessions,
            token_manager,
        }
    }
}

#[OpenApi]
impl NotificationsApi {
    /// The caller's feed, newest first
    #[oai(path = "/notifications", method = "get", tag = "ApiTags::Notifications")]
    async fn list(&self, auth: BearerAuth) -> Result<Json<NotificationListResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let feed = self.notifications.list(&user_id).await?;

        Ok(Json(NotificationListResponse {
            notifications: feed
                .into_iter()
                .map(|n| NotificationItem {
                    id: n.id,
                    kind: n.kind,
                    title: n.title,
                    message: n.message,
                    related_user_id: n.related_user_id,
                    related_relationship_id: n.related_relationship_id,
                    is_read: n.is_read,
                    created_at: n.created_at,
                })
                .collect(),
        }))
    }

    /// Mark one notification read
    #[oai(path = "/notifications/:id/read", method = "put", tag = "ApiTags::Notifications")]
    async fn mark_read(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MessageResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        self.notifications.mark_read(&id.0, &user_id).await?;

        Ok(Json(MessageResponse {
            message: "Notification lue".to_string(),
        }))
    }

    /// Mark the whole feed read
    #[oai(path = "/notifications/read-all", method = "put", tag = "ApiTags::Notifications")]
    async fn mark_all_read(
        &self,
        auth: BearerAuth,
    ) -> Result<Json<MarkAllReadResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let marked = self.notifications.mark_all_read(&user_id).await?;

        Ok(Json(MarkAllReadResponse { marked }))
    }
}
