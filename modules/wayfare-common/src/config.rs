use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Secrets and env-specific values only; scoring thresholds and the trust
/// boost formula are code-level constants in `types`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database
    pub database_url: String,

    // Trust graph (Bolt)
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Ranking service
    pub ranking_url: String,
    pub ranking_service_key: Option<String>,
    /// Hard deadline for the batched ranking call, per deployment.
    /// Responsiveness and score freshness trade off against each other.
    pub ranking_deadline_ms: u64,

    // Trust fan-out
    /// Per-call budget for a single trust lookup. Kept shorter than the
    /// ranking deadline so best-effort boosts never become the critical path.
    pub trust_timeout_ms: u64,
    pub trust_concurrency: usize,

    // Discovery
    pub default_radius_m: f64,
    pub max_radius_m: f64,

    // Admin
    pub admin_token: Option<String>,

    // Web server
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: require("DATABASE_URL")?,
            neo4j_uri: require("NEO4J_URI")?,
            neo4j_user: require("NEO4J_USER")?,
            neo4j_password: require("NEO4J_PASSWORD")?,
            ranking_url: require("RANKING_URL")?,
            ranking_service_key: std::env::var("RANKING_SERVICE_KEY").ok(),
            ranking_deadline_ms: env_or("RANKING_DEADLINE_MS", 3000)?,
            trust_timeout_ms: env_or("TRUST_TIMEOUT_MS", 500)?,
            trust_concurrency: env_or("TRUST_CONCURRENCY", 8)?,
            default_radius_m: env_or("DEFAULT_RADIUS_M", 50_000.0)?,
            max_radius_m: env_or("MAX_RADIUS_M", 100_000.0)?,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 3000)?,
        };

        tracing::info!(
            ranking_deadline_ms = config.ranking_deadline_ms,
            trust_timeout_ms = config.trust_timeout_ms,
            trust_concurrency = config.trust_concurrency,
            default_radius_m = config.default_radius_m,
            "Config loaded"
        );

        Ok(config)
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is not valid: {e}"))?),
        Err(_) => Ok(default),
    }
}
