use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use wayfare_common::{DiscoveryError, GeoPoint, SafetyTier, UserContext};
use wayfare_discovery::{DiscoveryPipeline, PoiStore};

pub struct AppState {
    pub pipeline: DiscoveryPipeline,
    pub store: Arc<PoiStore>,
    pub admin_token: Option<String>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/discover", get(discover))
        .route("/save", post(save))
        .route("/unsave", post(unsave))
        .route("/saved", get(saved))
        .route("/checkin", post(checkin))
        .route("/admin/override-safety", post(override_safety))
        .route("/admin/stats", get(admin_stats))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// --- Request bodies / queries ---

#[derive(Deserialize)]
struct DiscoverQuery {
    lat: Option<f64>,
    lon: Option<f64>,
    radius: Option<f64>,
}

#[derive(Deserialize)]
struct PoiBody {
    poi_id: Uuid,
}

#[derive(Deserialize)]
struct OverrideBody {
    poi_id: Uuid,
    /// `null` clears the override.
    status: Option<SafetyTier>,
}

// --- Helpers ---

/// The upstream gateway resolves authentication and forwards the user id.
fn require_user(headers: &HeaderMap) -> Result<Uuid, Response> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "missing or invalid x-user-id header"})),
            )
                .into_response()
        })
}

/// Admin endpoints sit behind a shared internal token. When no token is
/// configured the deployment is expected to fence these routes off at the
/// network layer.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = &state.admin_token else {
        return Ok(());
    };
    let provided = headers.get("x-admin-token").and_then(|v| v.to_str().ok());
    if provided == Some(expected.as_str()) {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "access denied"})),
        )
            .into_response())
    }
}

fn error_response(e: DiscoveryError) -> Response {
    let status = match &e {
        DiscoveryError::Validation(_) => StatusCode::BAD_REQUEST,
        DiscoveryError::PoiNotFound(_) => StatusCode::NOT_FOUND,
        DiscoveryError::CandidateStore(_) | DiscoveryError::CheckIn(_) => {
            warn!(error = %e, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(serde_json::json!({"error": e.to_string()}))).into_response()
}

// --- Handlers ---

async fn discover(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<DiscoverQuery>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "lat and lon are required"})),
        )
            .into_response();
    };

    let user = UserContext::new(user_id);
    match state
        .pipeline
        .discover(&user, GeoPoint { lat, lon }, params.radius)
        .await
    {
        Ok(results) => Json(results).into_response(),
        Err(e) => error_response(e),
    }
}

async fn save(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PoiBody>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.store.save(user_id, body.poi_id).await {
        Ok(()) => Json(serde_json::json!({"status": "saved"})).into_response(),
        Err(e) => error_response(e),
    }
}

async fn unsave(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PoiBody>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.store.unsave(user_id, body.poi_id).await {
        Ok(()) => Json(serde_json::json!({"status": "unsaved"})).into_response(),
        Err(e) => error_response(e),
    }
}

async fn saved(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user_id = match require_user(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.store.saved_pois(user_id).await {
        Ok(pois) => Json(pois).into_response(),
        Err(e) => error_response(e),
    }
}

async fn checkin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PoiBody>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.store.check_in(user_id, body.poi_id).await {
        Ok(new_score) => Json(serde_json::json!({
            "status": "checked_in",
            "base_popularity_score": new_score,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn override_safety(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<OverrideBody>,
) -> Response {
    if let Err(resp) = require_admin(&state, &headers) {
        return resp;
    }
    match state
        .store
        .set_safety_override(body.poi_id, body.status)
        .await
    {
        Ok(()) => Json(serde_json::json!({
            "status": "updated",
            "poi_id": body.poi_id,
            "safety_status": body.status,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn admin_stats(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&state, &headers) {
        return resp;
    }
    match state.store.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => error_response(e),
    }
}

async fn health() -> &'static str {
    "ok"
}
