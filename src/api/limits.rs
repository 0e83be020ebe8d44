use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::helpers::{authenticate, BearerAuth};
use crate::errors::api::ApiError;
use crate::services::TokenService;
use crate::stores::limit_store::ChoiceUpdate;
use crate::stores::{LimitStore, SessionStore};
use crate::types::dto::common::MessageResponse;
use crate::types::dto::limits::{
    CatalogResponse, CategoryItem, CommonLimit, CommonLimitsResponse, LimitItem, MyChoice,
    MyChoicesResponse, SubcategoryItem, UpsertChoicesRequest, UpsertNoteRequest,
};

/// Limit catalog and choice ledger API endpoints
pub struct LimitsApi {
    limits: Arc<LimitStore>,
    sessions: Arc<SessionStore>,
    token_manager: Arc<TokenService>,
}

/// API tags for limit endpoints
#[derive(Tags)]
enum ApiTags {
    /// Limit catalog and choices
    Limits,
}

impl LimitsApi {
    /// Create a new LimitsApi
    pub fn new(
        limits: Arc<LimitStore>,
        sessions: Arc<SessionStore>,
        token_manager: Arc<TokenService>,
    ) -> Self {
        Self {
            limits,
            sessions,
            token_manager,
        }
    }
}

#[OpenApi]
impl LimitsApi {
    /// The static limit catalog; public, read-only reference data
    #[oai(path = "/limits/categories", method = "get", tag = "ApiTags::Limits")]
    async fn categories(&self) -> Result<Json<CatalogResponse>, ApiError> {
        let tree = self.limits.catalog().await?;

        Ok(Json(CatalogResponse {
            categories: tree
                .into_iter()
                .map(|(cat, subs)| CategoryItem {
                    id: cat.id,
                    name: cat.name,
                    subcategories: subs
                        .into_iter()
                        .map(|(sub, lims)| SubcategoryItem {
                            id: sub.id,
                            name: sub.name,
                            limits: lims
                                .into_iter()
                                .map(|lim| LimitItem {
                                    id: lim.id,
                                    name: lim.name,
                                    description: lim.description,
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }))
    }

    /// The caller's own choices for one relationship; never the partner's
    #[oai(
        path = "/relationships/:id/limits",
        method = "get",
        tag = "ApiTags::Limits"
    )]
    async fn my_choices(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MyChoicesResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let rows = self.limits.my_choices(&user_id, &id.0).await?;

        Ok(Json(MyChoicesResponse {
            choices: rows
                .into_iter()
                .map(|row| MyChoice {
                    limit_id: row.limit_id,
                    is_accepted: row.is_accepted,
                    note: row.note,
                })
                .collect(),
        }))
    }

    /// Bulk upsert of the caller's choices
    ///
    /// Applied atomically; transitions that change the set of common
    /// limits notify the partner as a side effect.
    #[oai(
        path = "/relationships/:id/limits",
        method = "put",
        tag = "ApiTags::Limits"
    )]
    async fn upsert_choices(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        body: Json<UpsertChoicesRequest>,
    ) -> Result<Json<MessageResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let choices = body
            .0
            .choices
            .into_iter()
            .map(|item| ChoiceUpdate {
                limit_id: item.limit_id,
                is_accepted: item.is_accepted,
            })
            .collect();
        self.limits.upsert_choices(&user_id, &id.0, choices).await?;

        Ok(Json(MessageResponse {
            message: "Choix enregistrés".to_string(),
        }))
    }

    /// Set or replace the caller's private note on a limit
    #[oai(
        path = "/relationships/:id/limits/:limit_id/note",
        method = "put",
        tag = "ApiTags::Limits"
    )]
    async fn upsert_note(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        limit_id: Path<String>,
        body: Json<UpsertNoteRequest>,
    ) -> Result<Json<MessageResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        self.limits
            .upsert_note(&user_id, &id.0, &limit_id.0, &body.0.note)
            .await?;

        Ok(Json(MessageResponse {
            message: "Note enregistrée".to_string(),
        }))
    }

    /// Clear the caller's note on a limit
    #[oai(
        path = "/relationships/:id/limits/:limit_id/note",
        method = "delete",
        tag = "ApiTags::Limits"
    )]
    async fn delete_note(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        limit_id: Path<String>,
    ) -> Result<Json<MessageResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        self.limits.delete_note(&user_id, &id.0, &limit_id.0).await?;

        Ok(Json(MessageResponse {
            message: "Note supprimée".to_string(),
        }))
    }

    /// The privacy-filtered intersection: limits both parties accepted
    #[oai(
        path = "/relationships/:id/common-limits",
        method = "get",
        tag = "ApiTags::Limits"
    )]
    async fn common_limits(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<CommonLimitsResponse>, ApiError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let rows = self.limits.common_limits(&id.0, &user_id).await?;

        Ok(Json(CommonLimitsResponse {
            common_limits: rows
                .into_iter()
                .map(|row| CommonLimit {
                    limit_id: row.limit.id,
                    name: row.limit.name,
                    description: row.limit.description,
                    category_name: row.category_name,
                    subcategory_name: row.subcategory_name,
                    my_note: row.my_note,
                    partner_note: row.partner_note,
                })
                .collect(),
        }))
    }
}
