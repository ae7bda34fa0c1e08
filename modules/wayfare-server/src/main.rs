use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use wayfare_common::AppConfig;
use wayfare_discovery::{DiscoveryPipeline, HttpRankingClient, PipelineSettings, PoiStore};
use wayfare_graph::{GraphClient, TrustReader};

mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting wayfare-server");

    let config = AppConfig::from_env()?;

    // Process-wide shared resources: one relational pool, one graph
    // connection, one HTTP client. Initialized here, injected everywhere.
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Migrations complete");

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let graph = GraphClient::connect(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
    )
    .await?;
    tracing::info!("Connected to trust graph");

    let store = PoiStore::new(pool);
    let trust = TrustReader::new(graph);
    let ranking = HttpRankingClient::new(
        http_client,
        config.ranking_url.clone(),
        config.ranking_service_key.clone(),
    );

    let settings = PipelineSettings {
        ranking_deadline: Duration::from_millis(config.ranking_deadline_ms),
        trust_timeout: Duration::from_millis(config.trust_timeout_ms),
        trust_concurrency: config.trust_concurrency,
        default_radius_m: config.default_radius_m,
        max_radius_m: config.max_radius_m,
    };

    let store = Arc::new(store);
    let pipeline = DiscoveryPipeline::new(
        store.clone(),
        store.clone(),
        Arc::new(trust),
        Arc::new(ranking),
        settings,
    );

    let state = Arc::new(AppState {
        pipeline,
        store,
        admin_token: config.admin_token.clone(),
    });

    let app = routes::build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
