//! Score composition: merge base signals, trust boost, ranking outcome (or
//! its fallback), wishlist membership, and administrative overrides into one
//! result record per candidate.

use std::collections::HashSet;

use uuid::Uuid;

use wayfare_common::{Candidate, DiscoveryResult, RankingOutcome, SafetyFactor};

/// Merge one candidate into its final result record.
///
/// Precedence, highest first:
/// 1. Admin override — tier-mapped friction, authoritative.
/// 2. Ranking outcome — genuine or fallback, as produced upstream.
///
/// The trust boost multiplies only the secondary relevance score, never
/// friction: a trusted network must not be able to mask an unsafe condition.
pub fn compose(
    candidate: &Candidate,
    outcome: &RankingOutcome,
    trust_boost: f64,
    saved: &HashSet<Uuid>,
) -> DiscoveryResult {
    let poi = &candidate.poi;

    let (friction_index, explanation, safety_factors) = match poi.admin_safety_status {
        Some(tier) => (
            tier.friction_value(),
            format!("Administrator override in effect: area marked {tier}."),
            vec![SafetyFactor::admin_override()],
        ),
        None => (
            outcome.friction_index.clamp(0.0, 1.0),
            outcome.explanation.clone(),
            outcome.safety_factors.clone(),
        ),
    };

    DiscoveryResult {
        id: poi.id,
        name: poi.name.clone(),
        region: poi.region.clone(),
        category: poi.category.clone(),
        image_url: poi.image_url.clone(),
        lat: poi.lat,
        lon: poi.lon,
        distance_meters: candidate.distance_meters,
        friction_index,
        explanation,
        safety_factors,
        is_saved: saved.contains(&poi.id),
        relevance: poi.base_popularity_score * trust_boost.clamp(1.0, 1.2),
    }
}

/// Safest first: friction_index descending, ties broken by distance
/// ascending. Safety signal deliberately outranks raw proximity.
pub fn sort_results(results: &mut [DiscoveryResult]) {
    results.sort_by(|a, b| {
        b.friction_index
            .total_cmp(&a.friction_index)
            .then(a.distance_meters.total_cmp(&b.distance_meters))
    });
}
