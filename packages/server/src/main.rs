use anyhow::Context;
use tracing::info;

use server::config::AppConfig;
use server::database::init_db;
use server::seed::{ensure_constraints, ensure_indexes, seed_admin_group};
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database ready");

    seed_admin_group(&db)
        .await
        .context("Failed to seed administrators group")?;
    ensure_constraints(&db)
        .await
        .context("Failed to ensure constraints")?;
    ensure_indexes(&db)
        .await
        .context("Failed to ensure indexes")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = server::build_router(AppState { db, config });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    info!("API docs at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
