pub mod cointegration;
pub mod regression;
pub mod stationarity;
