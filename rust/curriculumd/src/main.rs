use anyhow::Context;
use curriculumd::api::{self, AppState};
use curriculumd::{db, Config, SystemClock};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,curriculumd=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let conn = db::open_db(&config.workspace).context("failed to open workspace database")?;
    tracing::info!(
        workspace = %config.workspace.to_string_lossy(),
        media_root = %config.media_root.to_string_lossy(),
        "workspace ready"
    );

    let state = AppState::new(conn, config, Arc::new(SystemClock));
    api::serve(state).await
}
