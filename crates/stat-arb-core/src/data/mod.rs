pub mod prices;
pub mod series;

pub use prices::{AlignedPair, PriceColumn, PriceTable};
pub use series::TimeSeries;
