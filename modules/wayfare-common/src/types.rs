use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Tunable constants ---

/// Popularity delta applied atomically with every check-in.
pub const CHECK_IN_POPULARITY_DELTA: f64 = 0.05;

/// Trust boost gained per distinct followee who visited a POI.
pub const TRUST_BOOST_PER_VISIT: f64 = 0.04;

/// Followee visits beyond this count add no further boost.
pub const TRUST_BOOST_VISIT_CAP: u32 = 5;

/// Trust boost applied when the graph is unreachable or slow.
pub const TRUST_BOOST_NEUTRAL: f64 = 1.0;

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// A point is usable only if both coordinates are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Haversine great-circle distance between two points in meters.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * h.sqrt().asin()
}

// --- Safety ---

/// Administrative safety tier. When set on a POI it is authoritative and
/// overrides whatever the live ranking service reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyTier {
    Safe,
    Caution,
    Danger,
}

impl SafetyTier {
    /// Friction index mapped from the tier. Higher is safer.
    pub fn friction_value(&self) -> f64 {
        match self {
            SafetyTier::Safe => 1.0,
            SafetyTier::Caution => 0.5,
            SafetyTier::Danger => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyTier::Safe => "safe",
            SafetyTier::Caution => "caution",
            SafetyTier::Danger => "danger",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "safe" => Some(SafetyTier::Safe),
            "caution" => Some(SafetyTier::Caution),
            "danger" => Some(SafetyTier::Danger),
            _ => None,
        }
    }
}

impl std::fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One human-readable safety signal shown alongside a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyFactor {
    pub icon: String,
    pub label: String,
}

impl SafetyFactor {
    pub fn new(icon: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            icon: icon.into(),
            label: label.into(),
        }
    }

    /// The factor attached to every result when live scoring was skipped.
    pub fn offline() -> Self {
        Self::new("⚠️", "Live Safety Offline")
    }

    /// The factor attached when an administrator override is in force.
    pub fn admin_override() -> Self {
        Self::new("🛡️", "Administrator Override")
    }
}

// --- POIs and request-scoped records ---

/// A recommendable point of interest, as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poi {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub region: String,
    pub category: String,
    pub image_url: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub base_popularity_score: f64,
    pub admin_safety_status: Option<SafetyTier>,
}

/// A POI under consideration for one discovery request, annotated with the
/// distance from the query point. Never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub poi: Poi,
    pub distance_meters: f64,
}

/// Where a ranking outcome came from. Degradation is a typed state chosen
/// at the call site, not inferred from error shape downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Live,
    Fallback,
}

/// Per-candidate output of the ranking step, genuine or synthetic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingOutcome {
    pub friction_index: f64,
    pub explanation: String,
    pub safety_factors: Vec<SafetyFactor>,
    pub source: ScoreSource,
}

impl RankingOutcome {
    /// Synthetic outcome substituted when the scoring provider is
    /// unavailable within budget. Friction defaults to 1.0 so degraded
    /// responses never look artificially dangerous.
    pub fn fallback() -> Self {
        Self {
            friction_index: 1.0,
            explanation: "live scoring unavailable".to_string(),
            safety_factors: vec![SafetyFactor::offline()],
            source: ScoreSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ScoreSource::Fallback
    }
}

/// Identity and profile context forwarded to the ranking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Uuid,
    pub interest_profile: String,
}

impl UserContext {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            interest_profile: "General".to_string(),
        }
    }
}

/// The externally visible merged record for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub id: Uuid,
    pub name: String,
    pub region: String,
    pub category: String,
    pub image_url: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub distance_meters: f64,
    pub friction_index: f64,
    pub explanation: String,
    pub safety_factors: Vec<SafetyFactor>,
    pub is_saved: bool,
    /// Display-only secondary score: base popularity × trust boost.
    /// Kept independent of friction so a trusted network cannot mask an
    /// unsafe condition.
    pub relevance: f64,
}
