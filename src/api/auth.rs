use poem_openapi::{
    param::{Path, Query},
    payload::Json,
    OpenApi, Tags,
};
use std::sync::Arc;

use crate::api::helpers::{authenticate, BearerAuth};
use crate::errors::auth::AuthError;
use crate::services::{Mailer, TokenService};
use crate::stores::{DeviceStore, MagicLinkStore, SessionStore, UserStore};
use crate::types::dto::auth::{
    DeviceInfo, DeviceListResponse, DeviceRefreshRequest, DeviceRefreshResponse, LogoutRequest,
    MagicLinkRequest, MagicLinkResponse, TokenResponse,
};
use crate::types::dto::common::MessageResponse;

const MAX_EMAIL_CHARS: usize = 254;
const DEFAULT_DEVICE_LABEL: &str = "Nouvel appareil";

/// Authentication API endpoints
pub struct AuthApi {
    magic_links: Arc<MagicLinkStore>,
    devices: Arc<DeviceStore>,
    sessions: Arc<SessionStore>,
    users: Arc<UserStore>,
    token_manager: Arc<TokenService>,
    mailer: Arc<dyn Mailer>,
    /// Base URL the magic link points at
    link_base_url: String,
    /// Dev configuration: surface the link in the response instead of
    /// relying on delivery
    dev_mode: bool,
}

/// API tags for authentication endpoints
#[derive(Tags)]
enum AuthTags {
    /// Authentication endpoints
    Authentication,
}

impl AuthApi {
    /// Create a new AuthApi over the auth stores and services
    pub fn new(
        magic_links: Arc<MagicLinkStore>,
        devices: Arc<DeviceStore>,
        sessions: Arc<SessionStore>,
        users: Arc<UserStore>,
        token_manager: Arc<TokenService>,
        mailer: Arc<dyn Mailer>,
        link_base_url: String,
        dev_mode: bool,
    ) -> Self {
        Self {
            magic_links,
            devices,
            sessions,
            users,
            token_manager,
            mailer,
            link_base_url,
            dev_mode,
        }
    }

    /// Issue a session plus a fresh device for a just-verified user
    async fn issue_session_and_device(
        &self,
        user_id: &str,
    ) -> Result<TokenResponse, AuthError> {
        let device_token = self.token_manager.generate_opaque_token();
        let device = self
            .devices
            .create_device(
                user_id,
                DEFAULT_DEVICE_LABEL.to_string(),
                self.token_manager.hash_device_token(&device_token),
                self.token_manager.device_expiration(),
            )
            .await?;

        let (access_token, jti) = self.token_manager.generate_jwt(user_id)?;
        self.sessions
            .create(
                &jti,
                user_id,
                chrono::Utc::now().timestamp() + self.token_manager.session_lifetime_seconds(),
            )
            .await?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_manager.session_lifetime_seconds(),
            device_id: device.id,
            device_token,
        })
    }
}

#[OpenApi(prefix_path = "/auth")]
impl AuthApi {
    /// Request a magic sign-in link by email
    ///
    /// Responds identically whether or not the address has an account;
    /// nothing about registration status can be inferred from it.
    #[oai(path = "/magic-link", method = "post", tag = "AuthTags::Authentication")]
    async fn request_magic_link(
        &self,
        body: Json<MagicLinkRequest>,
    ) -> Result<Json<MagicLinkResponse>, AuthError> {
        let email = normalize_email(&body.email)?;

        let token = self.token_manager.generate_opaque_token();
        let expires_at = self.token_manager.magic_link_expiration();
        self.magic_links
            .store_link(email.clone(), token.clone(), expires_at)
            .await?;

        let link = format!("{}/auth/verify?token={}", self.link_base_url, token);
        self.mailer
            .send_magic_link(&email, &link)
            .await
            .map_err(|e| AuthError::internal_error(format!("Mailer failure: {}", e)))?;

        Ok(Json(MagicLinkResponse {
            message: "Si cette adresse existe, un lien de connexion a été envoyé".to_string(),
            debug_link: self.dev_mode.then_some(link),
        }))
    }

    /// Redeem a magic link, establishing the session and a device
    ///
    /// The account is created here on first login. The returned device
    /// token is shown exactly once; only its keyed hash is retained.
    #[oai(path = "/verify", method = "get", tag = "AuthTags::Authentication")]
    async fn verify(&self, token: Query<String>) -> Result<Json<TokenResponse>, AuthError> {
        let email = self.magic_links.consume(&token.0).await?;

        let user = self
            .users
            .find_or_create_by_email(&email)
            .await
            .map_err(|e| AuthError::internal_error(e.message()))?;

        let response = self.issue_session_and_device(&user.id).await?;
        Ok(Json(response))
    }

    /// Rotate a device token and mint a fresh session
    ///
    /// The presented token dies here: a replay of it after this call
    /// fails, whoever presents it.
    #[oai(path = "/device/refresh", method = "post", tag = "AuthTags::Authentication")]
    async fn refresh_device(
        &self,
        body: Json<DeviceRefreshRequest>,
    ) -> Result<Json<DeviceRefreshResponse>, AuthError> {
        let presented_hash = self.token_manager.hash_device_token(&body.device_token);
        let replacement = self.token_manager.generate_opaque_token();

        let user_id = self
            .devices
            .rotate(
                &body.device_id,
                &presented_hash,
                self.token_manager.hash_device_token(&replacement),
                self.token_manager.device_expiration(),
            )
            .await?;

        let (access_token, jti) = self.token_manager.generate_jwt(&user_id)?;
        self.sessions
            .create(
                &jti,
                &user_id,
                chrono::Utc::now().timestamp() + self.token_manager.session_lifetime_seconds(),
            )
            .await?;

        Ok(Json(DeviceRefreshResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_manager.session_lifetime_seconds(),
            device_token: replacement,
        }))
    }

    /// List the caller's devices; metadata only, never token material
    #[oai(path = "/devices", method = "get", tag = "AuthTags::Authentication")]
    async fn list_devices(&self, auth: BearerAuth) -> Result<Json<DeviceListResponse>, AuthError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        let devices = self.devices.list(&user_id).await?;

        Ok(Json(DeviceListResponse {
            devices: devices
                .into_iter()
                .map(|d| DeviceInfo {
                    id: d.id,
                    label: d.label,
                    created_at: d.created_at,
                    last_seen_at: d.last_seen_at,
                    expires_at: d.expires_at,
                })
                .collect(),
        }))
    }

    /// Revoke one of the caller's own devices
    #[oai(path = "/devices/:device_id", method = "delete", tag = "AuthTags::Authentication")]
    async fn revoke_device(
        &self,
        auth: BearerAuth,
        device_id: Path<String>,
    ) -> Result<Json<MessageResponse>, AuthError> {
        let user_id = authenticate(&auth, &self.token_manager, &self.sessions).await?;

        self.devices.revoke(&device_id.0, &user_id).await?;

        Ok(Json(MessageResponse {
            message: "Appareil révoqué".to_string(),
        }))
    }

    /// Log out: drop the session (tracked policy) and optionally revoke
    /// the presenting device
    #[oai(path = "/logout", method = "post", tag = "AuthTags::Authentication")]
    async fn logout(
        &self,
        auth: BearerAuth,
        body: Json<LogoutRequest>,
    ) -> Result<Json<MessageResponse>, AuthError> {
        let claims = self.token_manager.validate_jwt(&auth.0.token)?;
        self.sessions.verify(&claims.jti).await?;

        self.sessions.delete(&claims.jti).await?;
        if let Some(device_id) = &body.device_id {
            self.devices.revoke(device_id, &claims.sub).await?;
        }

        Ok(Json(MessageResponse {
            message: "Déconnecté".to_string(),
        }))
    }
}

/// Validate and normalize an email address
///
/// Deliberately shallow: lowercased, trimmed, one `@` with a non-empty
/// local part and a dotted domain, bounded length. The magic link is
/// the actual proof of ownership.
fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_lowercase();

    if email.is_empty() || email.chars().count() > MAX_EMAIL_CHARS {
        return Err(AuthError::validation_error("Invalid email address"));
    }

    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None)
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') =>
        {
            Ok(email)
        }
        _ => Err(AuthError::validation_error("Invalid email address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email_accepts_and_lowercases() {
        let email = normalize_email("  Alice@Example.ORG ").unwrap();
        assert_eq!(email, "alice@example.org");
    }

    #[test]
    fn test_normalize_email_rejects_malformed() {
        for bad in ["", "   ", "no-at-sign", "@example.org", "user@", "user@nodot", "a@b@c.org"] {
            assert!(
                normalize_email(bad).is_err(),
                "expected rejection for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_normalize_email_rejects_overlong() {
        let long = format!("{}@example.org", "x".repeat(250));
        assert!(normalize_email(&long).is_err());
    }
}
