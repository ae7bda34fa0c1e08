use thiserror::Error;
use uuid::Uuid;

/// Failures that make a discovery or write request meaningless.
///
/// Ranking-service and trust-graph failures are deliberately absent: those
/// degrade quality (fallback outcome, neutral boost) and are never surfaced
/// as errors.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("candidate store error: {0}")]
    CandidateStore(String),

    #[error("check-in failed: {0}")]
    CheckIn(String),

    #[error("POI not found: {0}")]
    PoiNotFound(Uuid),
}
