use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

use crate::config::errors::ConfigError;

/// Connect to the application database
///
/// Does NOT run migrations - call migrate_database() separately.
pub async fn connect_database(database_url: &str) -> Result<DatabaseConnection, ConfigError> {
    let db = Database::connect(database_url).await?;

    tracing::debug!("Connected to database: {}", database_url);

    Ok(db)
}

/// Run all pending migrations on the application database
pub async fn migrate_database(db: &DatabaseConnection) -> Result<(), ConfigError> {
    Migrator::up(db, None).await?;

    tracing::debug!("Database migrations completed");

    Ok(())
}
