use std::sync::Arc;

use talentsite::{app, config::AppConfig, state::AppState, store::PgStore, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("talentsite=debug,axum=info,tower_http=info");

    let config = Arc::new(AppConfig::from_env()?);
    let store = PgStore::connect(&config.database_url, config.max_connections).await?;

    // Run migrations if present
    if let Err(e) = store.migrate().await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let router = app::build_app(AppState::with_pg(config.clone(), store));
    app::serve(router, &config).await
}
