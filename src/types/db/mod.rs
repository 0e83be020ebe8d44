// Database entities - SeaORM models
pub mod blocked_user;
pub mod device;
pub mod limit;
pub mod limit_category;
pub mod limit_subcategory;
pub mod magic_link;
pub mod notification;
pub mod relationship;
pub mod session;
pub mod user;
pub mod user_limit;
