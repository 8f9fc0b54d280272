//! Shared types, config, and error definitions for the nexus dashboard.

pub mod config;
pub mod error;
pub mod sources;
pub mod types;

pub use config::DashboardConfig;
pub use error::Error;
pub use sources::{NewsSource, PriceSource, WeatherSource};
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
