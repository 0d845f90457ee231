use std::collections::BTreeMap;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::StrategyConfig;
use crate::data::{PriceTable, TimeSeries};
use crate::pairs::analysis::{analyze_pair, PairDiagnostics, PairResult};
use crate::pairs::selection::{select_pairs, CandidatePair, SelectionCriteria};
use crate::portfolio::aggregation::{equal_weight_portfolio, merge_pair_results, net_returns};
use crate::portfolio::metrics::{drawdown_series, equity_curve, summarize, PerformanceSummary};
use crate::types::{with_metadata, ComputationOutput, PairLabel};
use crate::{StatArbError, StatArbResult};

const METHODOLOGY: &str = "Engle-Granger pair selection with rolling OLS hedge ratios, \
    z-score entry/exit bands and a one-day-lagged, leverage-normalised, cost-aware \
    backtest aggregated into an equal-weight portfolio";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Every artefact of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Traded pairs, best p-value first
    pub selected_pairs: Vec<CandidatePair>,
    /// One row per traded pair, by p-value then label
    pub diagnostics: Vec<PairDiagnostics>,
    /// Net return of each traded pair
    pub pair_returns: BTreeMap<PairLabel, TimeSeries>,
    pub portfolio_returns: TimeSeries,
    pub summary: PerformanceSummary,
    /// Compounded from 1.0
    pub equity_curve: TimeSeries,
    pub drawdown: TimeSeries,
}

/// Price table after slicing and cleaning, with the tickers that were lost.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPrices {
    pub prices: PriceTable,
    pub dropped: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Slice to the configured window and clean. Fewer than two surviving
/// tickers is a [`StatArbError::NoSignal`].
pub fn prepare_prices(prices: &PriceTable, config: &StrategyConfig) -> StatArbResult<PreparedPrices> {
    config.validate()?;
    let cleaned = prices
        .slice(config.start, config.end)
        .clean(config.min_overlap_days);
    let dropped: Vec<String> = prices
        .tickers()
        .iter()
        .filter(|t| cleaned.column(t).is_none())
        .cloned()
        .collect();

    info!(
        kept = cleaned.num_tickers(),
        dropped = dropped.len(),
        days = cleaned.len(),
        "price table prepared"
    );

    if cleaned.num_tickers() < 2 {
        return Err(StatArbError::NoSignal(format!(
            "{} ticker(s) have at least {} observations in the window; need two",
            cleaned.num_tickers(),
            config.min_overlap_days
        )));
    }
    Ok(PreparedPrices {
        prices: cleaned,
        dropped,
    })
}

/// Screening stage only: prepared prices in, ranked tradable pairs out.
pub fn run_selection(
    prices: &PriceTable,
    config: &StrategyConfig,
) -> StatArbResult<ComputationOutput<Vec<CandidatePair>>> {
    let start = Instant::now();
    let prepared = prepare_prices(prices, config)?;
    let selected = select_pairs(&prepared.prices, &SelectionCriteria::from_config(config))?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Engle-Granger cointegration screen over all column pairs",
        config,
        dropped_warnings(&prepared.dropped, config),
        elapsed,
        selected,
    ))
}

/// Full run: prepare, select, analyse every pair, aggregate, summarise.
pub fn run_pipeline(
    prices: &PriceTable,
    config: &StrategyConfig,
) -> StatArbResult<ComputationOutput<PipelineOutput>> {
    let start = Instant::now();
    let prepared = prepare_prices(prices, config)?;
    let mut warnings = dropped_warnings(&prepared.dropped, config);

    let selected = select_pairs(&prepared.prices, &SelectionCriteria::from_config(config))?;
    let results = analyze_all(&prepared.prices, &selected, config)?;
    let merged = merge_pair_results(results)?;

    let mut diagnostics: Vec<PairDiagnostics> =
        merged.values().map(|r| r.diagnostics.clone()).collect();
    diagnostics.sort_by(|l, r| {
        l.coint_pvalue
            .total_cmp(&r.coint_pvalue)
            .then_with(|| l.pair.cmp(&r.pair))
    });
    for d in diagnostics.iter().filter(|d| d.adf_pvalue_spread.is_none()) {
        warnings.push(format!(
            "{}: spread has too few defined values for an ADF p-value",
            d.pair
        ));
    }

    let pair_returns = net_returns(&merged);
    let portfolio_returns = equal_weight_portfolio(&pair_returns);
    let summary = summarize(&portfolio_returns.values);
    let equity = equity_curve(&portfolio_returns, 1.0);
    let drawdown = drawdown_series(&equity);

    info!(
        pairs = merged.len(),
        days = portfolio_returns.len(),
        sharpe = ?summary.sharpe,
        "pipeline complete"
    );

    let output = PipelineOutput {
        selected_pairs: selected,
        diagnostics,
        pair_returns,
        portfolio_returns,
        summary,
        equity_curve: equity,
        drawdown,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(METHODOLOGY, config, warnings, elapsed, output))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn analyze_all(
    prices: &PriceTable,
    selected: &[CandidatePair],
    config: &StrategyConfig,
) -> StatArbResult<Vec<PairResult>> {
    #[cfg(feature = "parallel")]
    let results = selected
        .par_iter()
        .map(|c| analyze_pair(prices, c, config))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let results = selected
        .iter()
        .map(|c| analyze_pair(prices, c, config))
        .collect();
    results
}

fn dropped_warnings(dropped: &[String], config: &StrategyConfig) -> Vec<String> {
    if dropped.is_empty() {
        return Vec::new();
    }
    vec![format!(
        "Dropped {} ticker(s) with fewer than {} observations: {}",
        dropped.len(),
        config.min_overlap_days,
        dropped.join(", ")
    )]
}
