use dotenvy::dotenv;
use quote_followups::{
    api::{self, AppState, AuthConfig},
    config::{database, settings},
    errors::Result,
    notify::Dispatcher,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Settings from config.toml, secrets from the environment
    let app_config = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let secrets = settings::Secrets::from_env();
    info!(?secrets, "Loaded configuration");

    // 4. Database
    let db = database::create_connection(&database::get_database_url())
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Outbound gateways
    let dispatcher = Dispatcher::from_config(&app_config, &secrets)?;

    // 6. Serve
    if secrets.cron_secret.is_none() {
        warn!("CRON_SECRET not set, the sweep endpoint will reject every request");
    }
    let state = AppState {
        db,
        dispatcher,
        auth: AuthConfig {
            bearer_token: secrets.cron_secret,
        },
    };

    api::serve(&app_config.server, state).await
}
