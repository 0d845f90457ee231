pub mod analysis;
pub mod backtest;
pub mod hedge_ratio;
pub mod selection;
pub mod signals;
