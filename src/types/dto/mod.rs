// DTO layer - wire-facing request and response models
pub mod auth;
pub mod common;
pub mod limits;
pub mod notifications;
pub mod relationships;
pub mod users;
