//! The discovery & ranking pipeline.
//!
//! One orchestrator, one configured deadline, one fallback policy. Candidate
//! retrieval is the only fatal step; every enrichment after it degrades
//! quality, never availability.

pub mod compose;
pub mod orchestrator;
pub mod ranking;
pub mod store;
#[cfg(feature = "test-utils")]
pub mod testutil;
pub mod traits;

pub use orchestrator::{DiscoveryPipeline, PipelineSettings};
pub use ranking::HttpRankingClient;
pub use store::{AdminStats, PoiStore};
pub use traits::{CandidateSource, RankingService, SavedSetSource, TrustSource};
