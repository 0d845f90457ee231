pub mod aggregation;
pub mod metrics;
