//! Shared domain types, configuration, and errors for the Wayfare
//! discovery pipeline.

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::DiscoveryError;
pub use types::*;
