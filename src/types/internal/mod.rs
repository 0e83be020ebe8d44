// Internal types - never serialized onto the wire directly
pub mod auth;
pub mod notification;
pub mod relationship;
