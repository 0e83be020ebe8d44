use poem_openapi::{auth::Bearer, SecurityScheme};

use crate::errors::auth::AuthError;
use crate::services::TokenService;
use crate::stores::SessionStore;

/// JWT Bearer token authentication
#[derive(SecurityScheme)]
#[oai(
    ty = "bearer",
    key_name = "Authorization",
    key_in = "header",
    bearer_format = "JWT"
)]
pub struct BearerAuth(pub Bearer);

/// Resolve a bearer token to the authenticated user id
///
/// Validates signature and expiry, then (under the tracked session
/// policy) checks that the session has not been logged out.
pub async fn authenticate(
    auth: &BearerAuth,
    token_manager: &TokenService,
    sessions: &SessionStore,
) -> Result<String, AuthError> {
    let claims = token_manager.validate_jwt(&auth.0.token)?;
    sessions.verify(&claims.jti).await?;
    Ok(claims.sub)
}
