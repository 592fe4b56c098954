//! packflow entry point.
//!
//! Bootstrap order:
//!
//! ```text
//! ┌────────┐   ┌─────────┐   ┌────────┐   ┌───────────┐   ┌─────────┐
//! │ Config │──▶│ Logging │──▶│ Schema │──▶│ Seed rows │──▶│ Serve + │
//! │ (env)  │   │ (file)  │   │ (DDL)  │   │ (1st boot)│   │ sync job│
//! └────────┘   └─────────┘   └────────┘   └───────────┘   └─────────┘
//! ```

use std::sync::Arc;

use packflow::auth::AuthService;
use packflow::catalog::CatalogClient;
use packflow::config::AppConfig;
use packflow::db::{Database, schema};
use packflow::gateway::{self, state::AppState};
use packflow::importer::{SyncEngine, scheduler};
use packflow::logging::init_logging;
use packflow::notifier::LoggingNotifier;
use packflow::orders::OrderService;
use packflow::picking::PickingService;
use packflow::settings::SettingsService;
use packflow::shortage::ShortageService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let _log_guard = init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_HASH"),
        "packflow starting"
    );

    let db = Arc::new(Database::connect(&config.database_url).await?);
    schema::init_schema(db.pool()).await?;

    let settings = Arc::new(SettingsService::new(db.pool().clone()));
    settings
        .seed_defaults(config.default_sync_interval_minutes)
        .await?;

    let auth = Arc::new(AuthService::new(
        db.pool().clone(),
        config.jwt_secret.clone(),
        config.access_token_minutes,
        config.refresh_token_days,
    ));
    auth.seed_superadmin(&config.seed_admin_username, &config.seed_admin_password)
        .await?;

    let client = Arc::new(CatalogClient::new(config.upstream_timeout_secs)?);
    let sync = Arc::new(SyncEngine::new(
        db.pool().clone(),
        client,
        settings.clone(),
    ));

    let notifier = Arc::new(LoggingNotifier);
    let state = Arc::new(AppState {
        db: db.clone(),
        auth,
        picking: PickingService::new(db.pool().clone()),
        orders: OrderService::new(db.pool().clone()),
        shortage: ShortageService::new(db.pool().clone(), notifier),
        settings: settings.clone(),
        sync: sync.clone(),
    });

    // The sync job lives in its own worker, distinct from request
    // handlers; operator triggers share the same single-flight gate.
    tokio::spawn(scheduler::run_scheduler(sync, settings));

    gateway::run_server(&config, state).await
}
