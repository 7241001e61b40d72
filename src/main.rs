use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cinefeed_api::api::{create_router, AppState};
use cinefeed_api::auth::TokenSigner;
use cinefeed_api::catalog::CatalogStore;
use cinefeed_api::config::Config;
use cinefeed_api::similarity::SimilarityIndex;
use cinefeed_api::store::{create_pool, run_migrations, PgEngagementStore, PgUserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    // Both artifacts are produced offline; a missing or incompatible artifact
    // aborts startup instead of serving a degraded catalog.
    let catalog = Arc::new(CatalogStore::load(&config.catalog_path)?);
    let similarity = Arc::new(SimilarityIndex::load(&config.similarity_path, &catalog)?);

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let state = AppState::new(
        catalog,
        similarity,
        TokenSigner::new(&config.jwt_secret, config.token_ttl_secs),
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgEngagementStore::new(pool)),
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
