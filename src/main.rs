use clap::Parser;
use poem::{listener::TcpListener, Route, Server};
use poem_openapi::OpenApiService;
use std::sync::Arc;

use limites_backend::api::{
    AuthApi, HealthApi, LimitsApi, NotificationsApi, RelationshipsApi, UsersApi,
};
use limites_backend::cli::{Cli, Commands};
use limites_backend::config::{connect_database, init_logging, migrate_database, BootstrapSettings};
use limites_backend::services::{catalog, LogMailer, TokenService};
use limites_backend::stores::{
    DeviceStore, LimitStore, MagicLinkStore, NotificationStore, RelationshipStore, SessionStore,
    UserStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_logging()?;

    let cli = Cli::parse();
    let settings = BootstrapSettings::from_env()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => {
            let db = connect_database(&settings.database_url).await?;
            migrate_database(&db).await?;
            tracing::info!("Migrations completed");
            Ok(())
        }
        Commands::Seed => {
            let db = connect_database(&settings.database_url).await?;
            migrate_database(&db).await?;
            catalog::seed(&db).await?;
            let report = catalog::repair_duplicates(&db).await?;
            tracing::info!(
                merged = report.merged,
                dropped_choices = report.dropped_choices,
                "Catalog seeded"
            );
            Ok(())
        }
        Commands::Serve => serve(settings).await,
    }
}

async fn serve(settings: BootstrapSettings) -> Result<(), Box<dyn std::error::Error>> {
    let db = connect_database(&settings.database_url).await?;
    migrate_database(&db).await?;

    // Idempotent, race-safe: concurrent cold starts end up with one catalog.
    catalog::ensure_seeded(&db).await?;

    let token_manager = Arc::new(TokenService::new(
        settings.jwt_secret.clone(),
        settings.device_token_secret.clone(),
    ));

    let magic_links = Arc::new(MagicLinkStore::new(db.clone()));
    let devices = Arc::new(DeviceStore::new(db.clone()));
    let sessions = Arc::new(SessionStore::new(db.clone(), settings.session_policy));
    let users = Arc::new(UserStore::new(db.clone()));
    let relationships = Arc::new(RelationshipStore::new(db.clone()));
    let limits = Arc::new(LimitStore::new(db.clone()));
    let notifications = Arc::new(NotificationStore::new(db.clone()));

    let auth_api = AuthApi::new(
        magic_links,
        devices.clone(),
        sessions.clone(),
        users.clone(),
        token_manager.clone(),
        Arc::new(LogMailer),
        settings.magic_link_base_url.clone(),
        settings.magic_link_dev_mode,
    );
    let users_api = UsersApi::new(users.clone(), sessions.clone(), token_manager.clone());
    let relationships_api = RelationshipsApi::new(
        relationships,
        users,
        sessions.clone(),
        token_manager.clone(),
    );
    let limits_api = LimitsApi::new(limits, sessions.clone(), token_manager.clone());
    let notifications_api = NotificationsApi::new(notifications, sessions, token_manager);

    let api_service = OpenApiService::new(
        (
            HealthApi,
            auth_api,
            users_api,
            relationships_api,
            limits_api,
            notifications_api,
        ),
        "Nos limites API",
        "1.0.0",
    )
    .server(format!("http://{}/api", settings.bind_addr));

    let ui = api_service.swagger_ui();

    let app = Route::new().nest("/api", api_service).nest("/swagger", ui);

    tracing::info!(addr = %settings.bind_addr, "Starting server");

    Server::new(TcpListener::bind(settings.bind_addr.clone()))
        .run(app)
        .await?;

    Ok(())
}
