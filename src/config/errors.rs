use sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}
