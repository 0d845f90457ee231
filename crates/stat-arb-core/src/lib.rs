pub mod config;
pub mod error;
pub mod types;

pub mod data;
pub mod pairs;
pub mod pipeline;
pub mod portfolio;
pub mod stats;

#[cfg(feature = "synthetic")]
pub mod synthetic;

pub use error::StatArbError;
pub use types::*;

/// Standard result type for all stat-arb operations
pub type StatArbResult<T> = Result<T, StatArbError>;
