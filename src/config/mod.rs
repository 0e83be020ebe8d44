// Configuration layer - environment settings, logging, database
pub mod bootstrap_settings;
pub mod database;
pub mod errors;
pub mod logging;

pub use bootstrap_settings::BootstrapSettings;
pub use database::{connect_database, migrate_database};
pub use errors::ConfigError;
pub use logging::init_logging;
