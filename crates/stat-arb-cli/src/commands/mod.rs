pub mod pairs;
pub mod performance;
