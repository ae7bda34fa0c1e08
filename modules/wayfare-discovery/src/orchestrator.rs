//! The discovery orchestrator: a fixed sequence with a per-step failure
//! policy. Only candidate retrieval can fail the request; every later step
//! degrades to a defined value so the result set always matches the
//! candidate count.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::{stream, StreamExt};
use tracing::warn;
use uuid::Uuid;

use wayfare_common::{
    DiscoveryError, DiscoveryResult, GeoPoint, UserContext, TRUST_BOOST_NEUTRAL,
};

use crate::compose::{compose, sort_results};
use crate::ranking::fallback_batch;
use crate::traits::{CandidateSource, RankingService, SavedSetSource, TrustSource};

/// Per-deployment tunables for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Hard deadline for the single batched ranking call.
    pub ranking_deadline: Duration,
    /// Per-call budget for one trust lookup; shorter than the ranking
    /// deadline so best-effort boosts never become the critical path.
    pub trust_timeout: Duration,
    /// Bounded fan-out width for trust lookups.
    pub trust_concurrency: usize,
    pub default_radius_m: f64,
    pub max_radius_m: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            ranking_deadline: Duration::from_millis(3000),
            trust_timeout: Duration::from_millis(500),
            trust_concurrency: 8,
            default_radius_m: 50_000.0,
            max_radius_m: 100_000.0,
        }
    }
}

/// Coordinates candidate retrieval, saved-set lookup, ranking, trust
/// fan-out, composition, and sorting for one discovery request.
pub struct DiscoveryPipeline {
    candidates: Arc<dyn CandidateSource>,
    saved: Arc<dyn SavedSetSource>,
    trust: Arc<dyn TrustSource>,
    ranking: Arc<dyn RankingService>,
    settings: PipelineSettings,
}

impl DiscoveryPipeline {
    pub fn new(
        candidates: Arc<dyn CandidateSource>,
        saved: Arc<dyn SavedSetSource>,
        trust: Arc<dyn TrustSource>,
        ranking: Arc<dyn RankingService>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            candidates,
            saved,
            trust,
            ranking,
            settings,
        }
    }

    /// Run the full pipeline. Returns one result per candidate, sorted
    /// safest-first. Fails only on invalid input or an unreachable
    /// candidate store.
    pub async fn discover(
        &self,
        user: &UserContext,
        center: GeoPoint,
        radius_m: Option<f64>,
    ) -> Result<Vec<DiscoveryResult>, DiscoveryError> {
        if !center.is_valid() {
            return Err(DiscoveryError::Validation(format!(
                "invalid coordinates: lat={}, lon={}",
                center.lat, center.lon
            )));
        }
        let radius = match radius_m {
            Some(r) if !r.is_finite() || r <= 0.0 => {
                return Err(DiscoveryError::Validation(format!("invalid radius: {r}")));
            }
            Some(r) => r.min(self.settings.max_radius_m),
            None => self.settings.default_radius_m,
        };

        // 1. Retrieve — fatal on failure.
        let candidates = self.candidates.find_candidates(center, radius).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // 2. Saved set — on failure, no candidate is marked saved.
        let saved = match self.saved.saved_set(user.user_id).await {
            Ok(set) => set,
            Err(e) => {
                warn!(user_id = %user.user_id, error = %e, "Saved-set lookup failed, treating as empty");
                HashSet::new()
            }
        };

        // 3. Rank — one batched call against the configured deadline.
        // All-or-nothing: any failure swaps in the uniform fallback batch.
        // No retry here; the next request is the retry.
        let outcomes = match tokio::time::timeout(
            self.settings.ranking_deadline,
            self.ranking.rank(&candidates, user),
        )
        .await
        {
            Ok(Ok(outcomes)) if outcomes.len() == candidates.len() => outcomes,
            Ok(Ok(outcomes)) => {
                warn!(
                    expected = candidates.len(),
                    got = outcomes.len(),
                    "Ranking batch size mismatch, using fallback"
                );
                fallback_batch(candidates.len())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Ranking service unavailable, using fallback");
                fallback_batch(candidates.len())
            }
            Err(_) => {
                warn!(
                    deadline_ms = self.settings.ranking_deadline.as_millis() as u64,
                    "Ranking deadline exceeded, using fallback"
                );
                fallback_batch(candidates.len())
            }
        };

        // 4. Boost — bounded fan-out, each lookup independently best-effort.
        // Completion order is unconstrained; results re-associate by poi id.
        let poi_ids: Vec<Uuid> = candidates.iter().map(|c| c.poi.id).collect();
        let boosts = self.trust_boosts(user.user_id, poi_ids.into_iter()).await;

        // 5-6. Compose, sort, return.
        let mut results: Vec<DiscoveryResult> = candidates
            .iter()
            .zip(outcomes.iter())
            .map(|(candidate, outcome)| {
                let boost = boosts
                    .get(&candidate.poi.id)
                    .copied()
                    .unwrap_or(TRUST_BOOST_NEUTRAL);
                compose(candidate, outcome, boost, &saved)
            })
            .collect();

        sort_results(&mut results);
        Ok(results)
    }

    async fn trust_boosts(
        &self,
        user_id: Uuid,
        poi_ids: impl Iterator<Item = Uuid>,
    ) -> HashMap<Uuid, f64> {
        let per_call = self.settings.trust_timeout;
        stream::iter(poi_ids.map(|poi_id| {
            let trust = self.trust.clone();
            async move {
                let boost = match tokio::time::timeout(per_call, trust.boost(user_id, poi_id)).await
                {
                    Ok(Ok(boost)) => boost,
                    Ok(Err(e)) => {
                        warn!(%poi_id, error = %e, "Trust lookup failed, using neutral boost");
                        TRUST_BOOST_NEUTRAL
                    }
                    Err(_) => {
                        warn!(%poi_id, "Trust lookup timed out, using neutral boost");
                        TRUST_BOOST_NEUTRAL
                    }
                };
                (poi_id, boost)
            }
        }))
        .buffer_unordered(self.settings.trust_concurrency.max(1))
        .collect()
        .await
    }
}
