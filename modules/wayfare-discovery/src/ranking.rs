//! HTTP client for the external safety-ranking service.
//!
//! One batched request per discovery call. The orchestrator owns the
//! deadline and the fallback decision; this client's job is the wire
//! contract and defensive validation of untrusted output.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wayfare_common::{Candidate, RankingOutcome, SafetyFactor, ScoreSource, UserContext};

use crate::traits::RankingService;

pub struct HttpRankingClient {
    http: reqwest::Client,
    url: String,
    service_key: Option<String>,
}

#[derive(Serialize)]
struct CandidatePayload {
    id: Uuid,
    name: String,
    description: String,
    region: String,
    lat: f64,
    lon: f64,
    base_popularity: f64,
}

#[derive(Serialize)]
struct RankRequest {
    user_context: UserContext,
    candidates: Vec<CandidatePayload>,
}

#[derive(Deserialize)]
struct OutcomePayload {
    friction_index: f64,
    explanation: String,
    #[serde(default)]
    safety_factors: Vec<SafetyFactor>,
}

impl HttpRankingClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>, service_key: Option<String>) -> Self {
        Self {
            http,
            url: url.into(),
            service_key,
        }
    }
}

#[async_trait]
impl RankingService for HttpRankingClient {
    async fn rank(
        &self,
        candidates: &[Candidate],
        user: &UserContext,
    ) -> Result<Vec<RankingOutcome>> {
        let body = RankRequest {
            user_context: user.clone(),
            candidates: candidates
                .iter()
                .map(|c| CandidatePayload {
                    id: c.poi.id,
                    name: c.poi.name.clone(),
                    description: c.poi.description.clone(),
                    region: c.poi.region.clone(),
                    lat: c.poi.lat,
                    lon: c.poi.lon,
                    base_popularity: c.poi.base_popularity_score,
                })
                .collect(),
        };

        let mut request = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.service_key {
            request = request.header("x-internal-key", key);
        }

        let response = request
            .send()
            .await
            .context("ranking request failed")?
            .error_for_status()
            .context("ranking service returned error status")?;

        let outcomes: Vec<OutcomePayload> = response
            .json()
            .await
            .context("malformed ranking response")?;

        // All-or-nothing: a partial batch is as unusable as no batch.
        if outcomes.len() != candidates.len() {
            bail!(
                "ranking returned {} outcomes for {} candidates",
                outcomes.len(),
                candidates.len()
            );
        }

        Ok(outcomes
            .into_iter()
            .map(|o| RankingOutcome {
                // Untrusted external input: clamp before it enters scoring.
                friction_index: o.friction_index.clamp(0.0, 1.0),
                explanation: o.explanation,
                safety_factors: o.safety_factors,
                source: ScoreSource::Live,
            })
            .collect())
    }
}

/// One synthetic fallback outcome per candidate in a failed batch.
pub fn fallback_batch(len: usize) -> Vec<RankingOutcome> {
    std::iter::repeat_with(RankingOutcome::fallback)
        .take(len)
        .collect()
}
