//! Scenario tests for the discovery orchestrator, driven through in-memory
//! fakes of the collaborator seams.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use wayfare_common::{
    Candidate, DiscoveryError, GeoPoint, Poi, RankingOutcome, SafetyFactor, SafetyTier,
    ScoreSource, UserContext,
};
use wayfare_discovery::{
    CandidateSource, DiscoveryPipeline, PipelineSettings, RankingService, SavedSetSource,
    TrustSource,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const CENTER: GeoPoint = GeoPoint {
    lat: 33.891,
    lon: 35.472,
};

fn poi(name: &str, lat: f64, lon: f64) -> Poi {
    Poi {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: format!("{name} description"),
        region: "Beirut".to_string(),
        category: "Historical".to_string(),
        image_url: None,
        lat,
        lon,
        base_popularity_score: 0.5,
        admin_safety_status: None,
    }
}

fn candidate(name: &str, distance_meters: f64) -> Candidate {
    Candidate {
        poi: poi(name, 33.891, 35.472),
        distance_meters,
    }
}

fn three_candidates() -> Vec<Candidate> {
    vec![
        candidate("Raouche Rocks", 300.0),
        candidate("National Museum", 4_100.0),
        candidate("Jeita Grotto", 18_000.0),
    ]
}

fn live_outcome(friction: f64) -> RankingOutcome {
    RankingOutcome {
        friction_index: friction,
        explanation: "Area is currently stable and accessible.".to_string(),
        safety_factors: vec![SafetyFactor::new("✅", "No Alerts")],
        source: ScoreSource::Live,
    }
}

fn user() -> UserContext {
    UserContext::new(Uuid::new_v4())
}

// ---------------------------------------------------------------------------
// Fake candidate source
// ---------------------------------------------------------------------------

struct FakeCandidates {
    candidates: Vec<Candidate>,
    fail: bool,
}

impl FakeCandidates {
    fn with(candidates: Vec<Candidate>) -> Arc<Self> {
        Arc::new(Self {
            candidates,
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            candidates: vec![],
            fail: true,
        })
    }
}

#[async_trait]
impl CandidateSource for FakeCandidates {
    async fn find_candidates(
        &self,
        _center: GeoPoint,
        _radius_m: f64,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        if self.fail {
            return Err(DiscoveryError::CandidateStore(
                "connection refused".to_string(),
            ));
        }
        Ok(self.candidates.clone())
    }
}

// ---------------------------------------------------------------------------
// Fake saved-set source
// ---------------------------------------------------------------------------

struct FakeSaved {
    set: HashSet<Uuid>,
    fail: bool,
}

impl FakeSaved {
    fn empty() -> Arc<Self> {
        Arc::new(Self {
            set: HashSet::new(),
            fail: false,
        })
    }

    fn with(set: HashSet<Uuid>) -> Arc<Self> {
        Arc::new(Self { set, fail: false })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            set: HashSet::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl SavedSetSource for FakeSaved {
    async fn saved_set(&self, _user_id: Uuid) -> Result<HashSet<Uuid>> {
        if self.fail {
            return Err(anyhow!("itinerary relation unavailable"));
        }
        Ok(self.set.clone())
    }
}

// ---------------------------------------------------------------------------
// Fake trust source
// ---------------------------------------------------------------------------

enum TrustMode {
    Boosts(HashMap<Uuid, f64>),
    Fail,
    Hang,
}

struct FakeTrust {
    mode: TrustMode,
}

impl FakeTrust {
    fn neutral() -> Arc<Self> {
        Arc::new(Self {
            mode: TrustMode::Boosts(HashMap::new()),
        })
    }

    fn with(boosts: HashMap<Uuid, f64>) -> Arc<Self> {
        Arc::new(Self {
            mode: TrustMode::Boosts(boosts),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            mode: TrustMode::Fail,
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            mode: TrustMode::Hang,
        })
    }
}

#[async_trait]
impl TrustSource for FakeTrust {
    async fn boost(&self, _user_id: Uuid, poi_id: Uuid) -> Result<f64> {
        match &self.mode {
            TrustMode::Boosts(map) => Ok(map.get(&poi_id).copied().unwrap_or(1.0)),
            TrustMode::Fail => Err(anyhow!("graph backend down")),
            TrustMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(1.0)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fake ranking service
// ---------------------------------------------------------------------------

enum RankingMode {
    Live(Vec<RankingOutcome>),
    Slow(Duration, Vec<RankingOutcome>),
    Fail,
}

struct FakeRanking {
    mode: RankingMode,
}

impl FakeRanking {
    fn live(outcomes: Vec<RankingOutcome>) -> Arc<Self> {
        Arc::new(Self {
            mode: RankingMode::Live(outcomes),
        })
    }

    fn slow(delay: Duration, outcomes: Vec<RankingOutcome>) -> Arc<Self> {
        Arc::new(Self {
            mode: RankingMode::Slow(delay, outcomes),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            mode: RankingMode::Fail,
        })
    }
}

#[async_trait]
impl RankingService for FakeRanking {
    async fn rank(
        &self,
        _candidates: &[Candidate],
        _user: &UserContext,
    ) -> Result<Vec<RankingOutcome>> {
        match &self.mode {
            RankingMode::Live(outcomes) => Ok(outcomes.clone()),
            RankingMode::Slow(delay, outcomes) => {
                tokio::time::sleep(*delay).await;
                Ok(outcomes.clone())
            }
            RankingMode::Fail => Err(anyhow!("connection reset by peer")),
        }
    }
}

fn pipeline(
    candidates: Arc<FakeCandidates>,
    saved: Arc<FakeSaved>,
    trust: Arc<FakeTrust>,
    ranking: Arc<FakeRanking>,
) -> DiscoveryPipeline {
    DiscoveryPipeline::new(candidates, saved, trust, ranking, PipelineSettings::default())
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn live_ranking_produces_genuine_results() {
    let candidates = three_candidates();
    let outcomes = vec![live_outcome(0.9), live_outcome(0.7), live_outcome(0.4)];
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::empty(),
        FakeTrust::neutral(),
        FakeRanking::live(outcomes),
    );

    let results = p.discover(&user(), CENTER, None).await.unwrap();

    assert_eq!(results.len(), 3);
    for r in &results {
        assert!((0.0..=1.0).contains(&r.friction_index));
        assert_eq!(r.explanation, "Area is currently stable and accessible.");
        assert!(!r
            .safety_factors
            .iter()
            .any(|f| f.label == "Live Safety Offline"));
    }
}

#[tokio::test(start_paused = true)]
async fn ranking_timeout_falls_back_uniformly() {
    let candidates = three_candidates();
    let outcomes = vec![live_outcome(0.9), live_outcome(0.7), live_outcome(0.4)];
    // Responds well past the 3s deadline.
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::empty(),
        FakeTrust::neutral(),
        FakeRanking::slow(Duration::from_secs(30), outcomes),
    );

    let started = tokio::time::Instant::now();
    let results = p.discover(&user(), CENTER, None).await.unwrap();

    // Bounded wait: deadline, not the provider's 30s.
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(results.len(), 3);
    for r in &results {
        assert_eq!(r.friction_index, 1.0);
        assert!(r
            .safety_factors
            .iter()
            .any(|f| f.label == "Live Safety Offline"));
        assert_eq!(r.explanation, "live scoring unavailable");
    }
}

#[tokio::test]
async fn ranking_failure_falls_back_without_error() {
    let candidates = three_candidates();
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::empty(),
        FakeTrust::neutral(),
        FakeRanking::failing(),
    );

    let results = p.discover(&user(), CENTER, None).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.friction_index == 1.0));
}

#[tokio::test]
async fn wrong_length_ranking_batch_is_rejected_wholesale() {
    let candidates = three_candidates();
    // Two outcomes for three candidates: treated as malformed.
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::empty(),
        FakeTrust::neutral(),
        FakeRanking::live(vec![live_outcome(0.9), live_outcome(0.7)]),
    );

    let results = p.discover(&user(), CENTER, None).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.friction_index == 1.0));
    assert!(results.iter().all(|r| r
        .safety_factors
        .iter()
        .any(|f| f.label == "Live Safety Offline")));
}

#[tokio::test]
async fn admin_override_beats_live_score() {
    let mut candidates = three_candidates();
    candidates[0].poi.admin_safety_status = Some(SafetyTier::Danger);
    let flagged = candidates[0].poi.id;

    let outcomes = vec![live_outcome(0.95), live_outcome(0.7), live_outcome(0.4)];
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::empty(),
        FakeTrust::neutral(),
        FakeRanking::live(outcomes),
    );

    let results = p.discover(&user(), CENTER, None).await.unwrap();
    let overridden = results.iter().find(|r| r.id == flagged).unwrap();
    assert_eq!(overridden.friction_index, 0.0);
    // Danger sorts last despite being the closest candidate.
    assert_eq!(results.last().unwrap().id, flagged);
}

#[tokio::test]
async fn results_sorted_by_friction_desc_then_distance_asc() {
    let candidates = vec![
        candidate("near-risky", 100.0),
        candidate("far-safe", 9_000.0),
        candidate("near-safe", 500.0),
    ];
    let outcomes = vec![live_outcome(0.2), live_outcome(0.9), live_outcome(0.9)];
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::empty(),
        FakeTrust::neutral(),
        FakeRanking::live(outcomes),
    );

    let results = p.discover(&user(), CENTER, None).await.unwrap();
    let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["near-safe", "far-safe", "near-risky"]);
}

#[tokio::test]
async fn saved_set_failure_marks_nothing_saved() {
    let candidates = three_candidates();
    let outcomes = vec![live_outcome(0.9), live_outcome(0.7), live_outcome(0.4)];
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::failing(),
        FakeTrust::neutral(),
        FakeRanking::live(outcomes),
    );

    let results = p.discover(&user(), CENTER, None).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| !r.is_saved));
}

#[tokio::test]
async fn saved_membership_is_reflected() {
    let candidates = three_candidates();
    let saved_id = candidates[1].poi.id;
    let outcomes = vec![live_outcome(0.9), live_outcome(0.7), live_outcome(0.4)];
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::with(HashSet::from([saved_id])),
        FakeTrust::neutral(),
        FakeRanking::live(outcomes),
    );

    let results = p.discover(&user(), CENTER, None).await.unwrap();
    for r in &results {
        assert_eq!(r.is_saved, r.id == saved_id);
    }
}

#[tokio::test]
async fn trust_failure_defaults_to_neutral_boost() {
    let candidates = three_candidates();
    let outcomes = vec![live_outcome(0.9), live_outcome(0.7), live_outcome(0.4)];
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::empty(),
        FakeTrust::failing(),
        FakeRanking::live(outcomes),
    );

    let results = p.discover(&user(), CENTER, None).await.unwrap();
    assert_eq!(results.len(), 3);
    // Neutral boost: relevance equals raw base popularity.
    assert!(results.iter().all(|r| (r.relevance - 0.5).abs() < 1e-12));
}

#[tokio::test(start_paused = true)]
async fn hanging_trust_lookups_are_cut_off_per_call() {
    let candidates = three_candidates();
    let outcomes = vec![live_outcome(0.9), live_outcome(0.7), live_outcome(0.4)];
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::empty(),
        FakeTrust::hanging(),
        FakeRanking::live(outcomes),
    );

    let started = tokio::time::Instant::now();
    let results = p.discover(&user(), CENTER, None).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| (r.relevance - 0.5).abs() < 1e-12));
}

#[tokio::test]
async fn trust_boost_raises_relevance_only() {
    let candidates = three_candidates();
    let boosted_id = candidates[0].poi.id;
    let outcomes = vec![live_outcome(0.9), live_outcome(0.7), live_outcome(0.4)];
    let p = pipeline(
        FakeCandidates::with(candidates),
        FakeSaved::empty(),
        FakeTrust::with(HashMap::from([(boosted_id, 1.2)])),
        FakeRanking::live(outcomes),
    );

    let results = p.discover(&user(), CENTER, None).await.unwrap();
    let boosted = results.iter().find(|r| r.id == boosted_id).unwrap();
    assert!((boosted.relevance - 0.6).abs() < 1e-12);
    assert_eq!(boosted.friction_index, 0.9);
}

#[tokio::test]
async fn invalid_coordinates_are_rejected() {
    let p = pipeline(
        FakeCandidates::with(three_candidates()),
        FakeSaved::empty(),
        FakeTrust::neutral(),
        FakeRanking::failing(),
    );

    let err = p
        .discover(&user(), GeoPoint { lat: f64::NAN, lon: 35.5 }, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Validation(_)));

    let err = p
        .discover(&user(), GeoPoint { lat: 33.9, lon: 35.5 }, Some(-10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Validation(_)));
}

#[tokio::test]
async fn candidate_store_failure_is_fatal() {
    let p = pipeline(
        FakeCandidates::failing(),
        FakeSaved::empty(),
        FakeTrust::neutral(),
        FakeRanking::failing(),
    );

    let err = p.discover(&user(), CENTER, None).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::CandidateStore(_)));
}

#[tokio::test]
async fn empty_candidate_set_short_circuits() {
    // Ranking would fail, but with no candidates it is never consulted.
    let p = pipeline(
        FakeCandidates::with(vec![]),
        FakeSaved::empty(),
        FakeTrust::neutral(),
        FakeRanking::failing(),
    );

    let results = p.discover(&user(), CENTER, None).await.unwrap();
    assert!(results.is_empty());
}
