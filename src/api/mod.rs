// API layer - HTTP endpoints
pub mod auth;
pub mod health;
pub mod helpers;
pub mod limits;
pub mod notifications;
pub mod relationships;
pub mod users;

pub use auth::AuthApi;
pub use health::HealthApi;
pub use limits::LimitsApi;
pub use notifications::NotificationsApi;
pub use relationships::RelationshipsApi;
pub use users::UsersApi;
