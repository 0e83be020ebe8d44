// Common test utilities for integration tests

use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, QueryOrder, Set};

use limites_backend::services::catalog;
use limites_backend::types::db::{limit, user};

/// Creates a test database with migrations applied and the catalog seeded
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    catalog::seed(&db).await.expect("Failed to seed catalog");

    db
}

/// Insert a user directly, bypassing the magic-link flow
pub async fn create_user(db: &DatabaseConnection, id: &str, email: &str, name: &str) -> String {
    user::ActiveModel {
        id: Set(id.to_string()),
        email: Set(email.to_string()),
        display_name: Set(name.to_string()),
        avatar_url: Set(None),
        auth_provider: Set("magic_link".to_string()),
        created_at: Set(0),
        updated_at: Set(0),
    }
    .insert(db)
    .await
    .expect("Failed to create test user");

    id.to_string()
}

/// Catalog limit ids in a stable order
pub async fn limit_ids(db: &DatabaseConnection) -> Vec<String> {
    limit::Entity::find()
        .order_by_asc(limit::Column::Id)
        .all(db)
        .await
        .expect("Failed to load limits")
        .into_iter()
        .map(|l| l.id)
        .collect()
}
