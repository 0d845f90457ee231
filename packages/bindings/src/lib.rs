use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use stat_arb_core::config::StrategyConfig;
use stat_arb_core::data::PriceTable;
use stat_arb_core::pipeline;
use stat_arb_core::portfolio::metrics::summarize;
use stat_arb_core::synthetic::{simulate_prices, SyntheticMarketInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// `{"prices": {"dates": [..], "columns": [..]}, "config": {..}}`
#[derive(Deserialize)]
struct UniverseInput {
    prices: PriceTable,
    #[serde(default)]
    config: StrategyConfig,
}

/// `{"returns": [f64 | null, ..]}`
#[derive(Deserialize)]
struct ReturnsInput {
    returns: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// Pairs
// ---------------------------------------------------------------------------

#[napi]
pub fn select_pairs(input_json: String) -> NapiResult<String> {
    let input: UniverseInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = pipeline::run_selection(&input.prices, &input.config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn run_pipeline(input_json: String) -> NapiResult<String> {
    let input: UniverseInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = pipeline::run_pipeline(&input.prices, &input.config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn simulate_market(input_json: String) -> NapiResult<String> {
    let input: SyntheticMarketInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = simulate_prices(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Performance
// ---------------------------------------------------------------------------

#[napi]
pub fn performance_summary(input_json: String) -> NapiResult<String> {
    let input: ReturnsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = summarize(&input.returns);
    serde_json::to_string(&output).map_err(to_napi_error)
}
