//! Seams for the pipeline's external collaborators.
//!
//! Each data source is injected as `Arc<dyn Trait>` so the orchestrator can
//! be driven by test doubles. Error types encode the failure policy: the
//! candidate source fails with a typed `DiscoveryError` (fatal), everything
//! else returns `anyhow::Result` and is absorbed into a degraded value.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use wayfare_common::{Candidate, DiscoveryError, GeoPoint, RankingOutcome, UserContext};
use wayfare_graph::TrustReader;

/// Answers "which POIs lie within radius R of point P".
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn find_candidates(
        &self,
        center: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<Candidate>, DiscoveryError>;
}

/// Itinerary membership for the requesting user, read fresh per request.
#[async_trait]
pub trait SavedSetSource: Send + Sync {
    async fn saved_set(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;
}

/// Trust boost for one (user, POI) pair. Best-effort.
#[async_trait]
pub trait TrustSource: Send + Sync {
    async fn boost(&self, user_id: Uuid, poi_id: Uuid) -> Result<f64>;
}

/// One batched, deadline-bound call to the external scoring provider.
///
/// Implementations must return exactly one outcome per candidate or an
/// error; the orchestrator owns the deadline and substitutes the uniform
/// fallback batch on any failure.
#[async_trait]
pub trait RankingService: Send + Sync {
    async fn rank(
        &self,
        candidates: &[Candidate],
        user: &UserContext,
    ) -> Result<Vec<RankingOutcome>>;
}

#[async_trait]
impl TrustSource for TrustReader {
    async fn boost(&self, user_id: Uuid, poi_id: Uuid) -> Result<f64> {
        Ok(TrustReader::boost(self, user_id, poi_id).await?)
    }
}
