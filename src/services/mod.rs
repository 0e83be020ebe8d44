// Services layer - Business logic and orchestration
pub mod catalog;
pub mod crypto;
pub mod mailer;
pub mod token_service;

pub use mailer::{LogMailer, Mailer};
pub use token_service::TokenService;
