#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::StrategyConfig;
use crate::data::PriceTable;
use crate::stats::cointegration::engle_granger;
use crate::types::{pair_label, PairLabel, Ticker};
use crate::{StatArbError, StatArbResult};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A scored pair. `a` is the dependent (Y) leg, `b` the regressor (X).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePair {
    pub a: Ticker,
    pub b: Ticker,
    /// Engle-Granger p-value of `a` on `b`
    pub coint_pvalue: f64,
}

impl CandidatePair {
    pub fn label(&self) -> PairLabel {
        pair_label(&self.a, &self.b)
    }
}

/// Thresholds applied when screening a price table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    pub coint_pvalue_max: f64,
    pub min_overlap_days: usize,
    pub max_pairs: usize,
}

impl SelectionCriteria {
    pub fn from_config(config: &StrategyConfig) -> Self {
        SelectionCriteria {
            coint_pvalue_max: config.coint_pvalue_max,
            min_overlap_days: config.min_overlap_days,
            max_pairs: config.max_pairs,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Screen every unordered column pair and return the tradable ones.
///
/// Output is sorted by p-value, ties broken on `(a, b)`, filtered to
/// `p <= coint_pvalue_max` and truncated to `max_pairs`. An empty result
/// is a [`StatArbError::NoSignal`].
pub fn select_pairs(
    prices: &PriceTable,
    criteria: &SelectionCriteria,
) -> StatArbResult<Vec<CandidatePair>> {
    if prices.num_tickers() < 2 {
        return Err(StatArbError::NoSignal(format!(
            "Need at least two tickers to form pairs, have {}",
            prices.num_tickers()
        )));
    }

    let scored = score_candidates(prices, criteria.min_overlap_days)?;
    let screened = scored.len();
    let selected: Vec<CandidatePair> = scored
        .into_iter()
        .filter(|c| c.coint_pvalue <= criteria.coint_pvalue_max)
        .take(criteria.max_pairs)
        .collect();

    info!(
        screened,
        selected = selected.len(),
        threshold = criteria.coint_pvalue_max,
        "pair screening complete"
    );

    if selected.is_empty() {
        return Err(StatArbError::NoSignal(format!(
            "No pair passed the cointegration threshold p <= {} ({screened} pairs scored)",
            criteria.coint_pvalue_max
        )));
    }
    Ok(selected)
}

/// Engle-Granger p-values for every column pair `i < j` with at least
/// `min_overlap` joint observations, ranked.
///
/// Pairs without enough data for the test are skipped and do not appear.
pub fn score_candidates(
    prices: &PriceTable,
    min_overlap: usize,
) -> StatArbResult<Vec<CandidatePair>> {
    let tickers = prices.tickers();
    let mut candidates = Vec::new();
    for i in 0..tickers.len() {
        for j in (i + 1)..tickers.len() {
            let (a, b) = (&tickers[i], &tickers[j]);
            let overlap = prices.joint_observations(a, b)?;
            if overlap >= min_overlap {
                candidates.push((a.as_str(), b.as_str()));
            } else {
                debug!(pair = %pair_label(a, b), overlap, "skipped: overlap below minimum");
            }
        }
    }

    #[cfg(feature = "parallel")]
    let scored: Vec<Option<CandidatePair>> = candidates
        .par_iter()
        .map(|(a, b)| score_pair(prices, a, b))
        .collect::<StatArbResult<_>>()?;
    #[cfg(not(feature = "parallel"))]
    let scored: Vec<Option<CandidatePair>> = candidates
        .iter()
        .map(|(a, b)| score_pair(prices, a, b))
        .collect::<StatArbResult<_>>()?;

    Ok(rank_candidates(scored.into_iter().flatten().collect()))
}

/// Sort by p-value ascending, then by `(a, b)`.
pub fn rank_candidates(mut candidates: Vec<CandidatePair>) -> Vec<CandidatePair> {
    candidates.sort_by(|l, r| {
        l.coint_pvalue
            .total_cmp(&r.coint_pvalue)
            .then_with(|| (&l.a, &l.b).cmp(&(&r.a, &r.b)))
    });
    candidates
}

fn score_pair(prices: &PriceTable, a: &str, b: &str) -> StatArbResult<Option<CandidatePair>> {
    let aligned = prices.pair(a, b)?;
    match engle_granger(&aligned.y, &aligned.x) {
        Ok(test) => {
            debug!(
                pair = %pair_label(a, b),
                p_value = test.p_value,
                statistic = test.statistic,
                nobs = test.nobs,
                "cointegration scored"
            );
            Ok(Some(CandidatePair {
                a: a.to_string(),
                b: b.to_string(),
                coint_pvalue: test.p_value,
            }))
        }
        Err(StatArbError::InsufficientData(reason)) => {
            warn!(pair = %pair_label(a, b), %reason, "skipped: not scored");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
