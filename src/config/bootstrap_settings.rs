use std::env;

use crate::config::errors::ConfigError;
use crate::types::internal::auth::SessionPolicy;

/// Settings gathered once from the environment at startup
///
/// Everything the process needs before it can serve a request. Secrets
/// are required; the rest has development defaults.
#[derive(Clone)]
pub struct BootstrapSettings {
    pub database_url: String,
    pub jwt_secret: String,
    pub device_token_secret: String,
    /// Base URL embedded in magic links
    pub magic_link_base_url: String,
    /// Dev configuration: surface magic links in API responses
    pub magic_link_dev_mode: bool,
    pub session_policy: SessionPolicy,
    pub bind_addr: String,
}

impl BootstrapSettings {
    /// Load settings from environment variables
    ///
    /// # Returns
    /// * `Ok(BootstrapSettings)` - All required variables present
    /// * `Err(ConfigError::MissingVar)` - A required secret is absent
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://limites.db?mode=rwc".to_string());

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;
        let device_token_secret = env::var("DEVICE_TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingVar("DEVICE_TOKEN_SECRET".to_string()))?;

        let magic_link_base_url = env::var("MAGIC_LINK_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let magic_link_dev_mode = env::var("MAGIC_LINK_DEV_MODE")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let session_policy = SessionPolicy::parse(
            &env::var("SESSION_POLICY").unwrap_or_else(|_| "stateless".to_string()),
        );

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            device_token_secret,
            magic_link_base_url,
            magic_link_dev_mode,
            session_policy,
            bind_addr,
        })
    }
}

impl std::fmt::Debug for BootstrapSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapSettings")
            .field("database_url", &self.database_url)
            .field("jwt_secret", &"<redacted>")
            .field("device_token_secret", &"<redacted>")
            .field("magic_link_base_url", &self.magic_link_base_url)
            .field("magic_link_dev_mode", &self.magic_link_dev_mode)
            .field("session_policy", &self.session_policy)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}
