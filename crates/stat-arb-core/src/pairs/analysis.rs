use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::StrategyConfig;
use crate::data::{PriceTable, TimeSeries};
use crate::pairs::backtest::{backtest_pair, BacktestParams, PairBacktest};
use crate::pairs::hedge_ratio::rolling_hedge_ratio;
use crate::pairs::selection::CandidatePair;
use crate::pairs::signals::{
    compute_spread, positions_from_zscore, rolling_zscore, SignalThresholds, SpreadPosition,
};
use crate::stats::cointegration::spread_adf_p_value;
use crate::types::PairLabel;
use crate::StatArbResult;

/// Per-pair summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDiagnostics {
    pub pair: PairLabel,
    pub coint_pvalue: f64,
    /// Whole-sample ADF p-value of the rolling-beta spread
    pub adf_pvalue_spread: Option<f64>,
    /// Days with a defined net return
    pub n_days: usize,
}

/// Everything computed for one traded pair, on the pair's joint dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairResult {
    pub label: PairLabel,
    pub hedge_ratio: TimeSeries,
    pub spread: TimeSeries,
    pub zscore: TimeSeries,
    pub positions: Vec<Option<SpreadPosition>>,
    pub backtest: PairBacktest,
    pub diagnostics: PairDiagnostics,
}

impl PairResult {
    pub fn net_return(&self) -> &TimeSeries {
        &self.backtest.net_return
    }
}

/// Run hedge ratio, spread, z-score, positions and backtest for one pair.
///
/// Operates on the inner join of the two columns; owns all of its output.
pub fn analyze_pair(
    prices: &PriceTable,
    candidate: &CandidatePair,
    config: &StrategyConfig,
) -> StatArbResult<PairResult> {
    let label = candidate.label();
    let thresholds = SignalThresholds::from_config(config)?;
    let params = BacktestParams::from_config(config)?;

    let aligned = prices.pair(&candidate.a, &candidate.b)?;
    let dates = &aligned.dates;

    let beta = rolling_hedge_ratio(&aligned.y, &aligned.x, config.beta_lookback)?;
    let spread = compute_spread(&aligned.y, &aligned.x, &beta)?;
    let zscore = rolling_zscore(&spread, config.z_lookback)?;
    let positions = positions_from_zscore(&zscore, &thresholds, config.missing_signal_policy);
    let backtest = backtest_pair(dates, &aligned.y, &aligned.x, &beta, &positions, &params)?;

    let adf_pvalue_spread = spread_adf_p_value(&spread);
    if adf_pvalue_spread.is_none() {
        warn!(pair = %label, "spread ADF p-value undefined");
    }
    let n_days = backtest.net_return.defined_count();
    debug!(
        pair = %label,
        joint_days = aligned.len(),
        realised_days = n_days,
        "pair analysed"
    );

    Ok(PairResult {
        diagnostics: PairDiagnostics {
            pair: label.clone(),
            coint_pvalue: candidate.coint_pvalue,
            adf_pvalue_spread,
            n_days,
        },
        label,
        hedge_ratio: TimeSeries::aligned(dates, beta),
        spread: TimeSeries::aligned(dates, spread),
        zscore: TimeSeries::aligned(dates, zscore),
        positions,
        backtest,
    })
}
