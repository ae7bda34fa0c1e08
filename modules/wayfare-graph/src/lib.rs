//! Bolt-protocol access to the social trust graph.
//!
//! The graph is written elsewhere (follow/visit CRUD is not this service's
//! job); this crate only runs the single traversal the discovery pipeline
//! needs and turns the count into a bounded boost multiplier.

mod client;
mod trust;

pub use client::GraphClient;
pub use trust::{boost_for_visits, TrustReader};
