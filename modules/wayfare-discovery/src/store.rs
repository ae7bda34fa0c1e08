//! Postgres-backed POI store: candidate retrieval, itinerary membership,
//! check-ins, and administrative safety overrides.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use wayfare_common::{
    haversine_m, Candidate, DiscoveryError, GeoPoint, Poi, SafetyTier, CHECK_IN_POPULARITY_DELTA,
};

use crate::traits::{CandidateSource, SavedSetSource};

/// Shared Postgres access for everything the pipeline owns. One pool,
/// created at startup, injected everywhere.
#[derive(Clone)]
pub struct PoiStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct PoiRow {
    id: Uuid,
    name: String,
    description: String,
    region: String,
    category: String,
    image_url: Option<String>,
    lat: f64,
    lon: f64,
    base_popularity_score: f64,
    admin_safety_status: Option<String>,
}

impl PoiRow {
    fn into_poi(self) -> Poi {
        let admin_safety_status = self.admin_safety_status.as_deref().and_then(|s| {
            let tier = SafetyTier::parse(s);
            if tier.is_none() {
                warn!(poi_id = %self.id, status = s, "Unknown safety status in store, ignoring");
            }
            tier
        });
        Poi {
            id: self.id,
            name: self.name,
            description: self.description,
            region: self.region,
            category: self.category,
            image_url: self.image_url,
            lat: self.lat,
            lon: self.lon,
            base_popularity_score: self.base_popularity_score,
            admin_safety_status,
        }
    }
}

/// Counts for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub pois: i64,
    pub checkins: i64,
    pub overridden: i64,
}

impl PoiStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Idempotent itinerary save. Saving an already-saved POI is a no-op.
    pub async fn save(&self, user_id: Uuid, poi_id: Uuid) -> Result<(), DiscoveryError> {
        sqlx::query(
            "INSERT INTO itineraries (user_id, poi_id) VALUES ($1, $2)
             ON CONFLICT (user_id, poi_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(poi_id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    /// Unsaving a non-saved POI succeeds silently.
    pub async fn unsave(&self, user_id: Uuid, poi_id: Uuid) -> Result<(), DiscoveryError> {
        sqlx::query("DELETE FROM itineraries WHERE user_id = $1 AND poi_id = $2")
            .bind(user_id)
            .bind(poi_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    /// The user's saved POIs, for the wishlist screen.
    pub async fn saved_pois(&self, user_id: Uuid) -> Result<Vec<Poi>, DiscoveryError> {
        let rows = sqlx::query_as::<_, PoiRow>(
            "SELECT p.id, p.name, p.description, p.region, p.category, p.image_url,
                    p.lat, p.lon, p.base_popularity_score, p.admin_safety_status
             FROM itineraries i
             JOIN pois p ON p.id = i.poi_id
             WHERE i.user_id = $1
             ORDER BY i.saved_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows.into_iter().map(PoiRow::into_poi).collect())
    }

    /// Append a visit record and bump base popularity in one transaction.
    /// Concurrent check-ins serialize on the row update, so no increment is
    /// ever lost. Returns the new popularity score.
    pub async fn check_in(&self, user_id: Uuid, poi_id: Uuid) -> Result<f64, DiscoveryError> {
        let mut tx = self.pool.begin().await.map_err(check_in_err)?;

        let new_score: Option<f64> = sqlx::query_scalar(
            "UPDATE pois SET base_popularity_score = base_popularity_score + $1
             WHERE id = $2
             RETURNING base_popularity_score",
        )
        .bind(CHECK_IN_POPULARITY_DELTA)
        .bind(poi_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(check_in_err)?;

        let Some(new_score) = new_score else {
            // Dropping the open transaction rolls it back.
            return Err(DiscoveryError::PoiNotFound(poi_id));
        };

        sqlx::query("INSERT INTO checkins (user_id, poi_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(poi_id)
            .execute(&mut *tx)
            .await
            .map_err(check_in_err)?;

        tx.commit().await.map_err(check_in_err)?;
        Ok(new_score)
    }

    /// Set or clear the administrative safety override for a POI.
    pub async fn set_safety_override(
        &self,
        poi_id: Uuid,
        status: Option<SafetyTier>,
    ) -> Result<(), DiscoveryError> {
        let result = sqlx::query("UPDATE pois SET admin_safety_status = $1 WHERE id = $2")
            .bind(status.map(|t| t.as_str()))
            .bind(poi_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(DiscoveryError::PoiNotFound(poi_id));
        }
        Ok(())
    }

    pub async fn stats(&self) -> Result<AdminStats, DiscoveryError> {
        let pois: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pois")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        let checkins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checkins")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        let overridden: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pois
             WHERE admin_safety_status IS NOT NULL AND admin_safety_status <> 'safe'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(AdminStats {
            pois,
            checkins,
            overridden,
        })
    }
}

/// Longitude half of the bounding box. Near the antimeridian the window
/// wraps past ±180 and the BETWEEN becomes a disjunction.
struct LonWindow {
    min: f64,
    max: f64,
    wraps: bool,
}

fn lon_window(center_lon: f64, lon_delta: f64) -> LonWindow {
    if lon_delta >= 180.0 {
        return LonWindow {
            min: -180.0,
            max: 180.0,
            wraps: false,
        };
    }
    let mut min = center_lon - lon_delta;
    let mut max = center_lon + lon_delta;
    let mut wraps = false;
    if min < -180.0 {
        min += 360.0;
        wraps = true;
    }
    if max > 180.0 {
        max -= 360.0;
        wraps = true;
    }
    LonWindow { min, max, wraps }
}

#[async_trait]
impl CandidateSource for PoiStore {
    /// Bounding-box prefilter on plain lat/lon columns, then exact haversine
    /// distance. ~1 degree lat ≈ 111km, 1 degree lon ≈ 111km * cos(lat).
    async fn find_candidates(
        &self,
        center: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        let lat_delta = radius_m / 111_000.0;
        let lon_delta = radius_m / (111_000.0 * center.lat.to_radians().cos().max(0.01));
        let lon = lon_window(center.lon, lon_delta);

        let sql = if lon.wraps {
            "SELECT id, name, description, region, category, image_url,
                    lat, lon, base_popularity_score, admin_safety_status
             FROM pois
             WHERE lat BETWEEN $1 AND $2
               AND (lon >= $3 OR lon <= $4)"
        } else {
            "SELECT id, name, description, region, category, image_url,
                    lat, lon, base_popularity_score, admin_safety_status
             FROM pois
             WHERE lat BETWEEN $1 AND $2
               AND lon BETWEEN $3 AND $4"
        };

        let rows = sqlx::query_as::<_, PoiRow>(sql)
            .bind(center.lat - lat_delta)
            .bind(center.lat + lat_delta)
            .bind(lon.min)
            .bind(lon.max)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let candidates = rows
            .into_iter()
            .map(PoiRow::into_poi)
            .filter_map(|poi| {
                let distance_meters = haversine_m(
                    center,
                    GeoPoint {
                        lat: poi.lat,
                        lon: poi.lon,
                    },
                );
                (distance_meters <= radius_m).then_some(Candidate {
                    poi,
                    distance_meters,
                })
            })
            .collect();

        Ok(candidates)
    }
}

#[async_trait]
impl SavedSetSource for PoiStore {
    async fn saved_set(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT poi_id FROM itineraries WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().collect())
    }
}

fn store_err(e: sqlx::Error) -> DiscoveryError {
    DiscoveryError::CandidateStore(e.to_string())
}

fn check_in_err(e: sqlx::Error) -> DiscoveryError {
    DiscoveryError::CheckIn(e.to_string())
}
