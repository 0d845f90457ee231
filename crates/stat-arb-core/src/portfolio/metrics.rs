use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::TimeSeries;
use crate::types::TRADING_DAYS;

/// Relative size below which a sample standard deviation counts as zero.
const ZERO_STD_TOL: f64 = 1e-12;

/// Scalar statistics of a net-return series. `None` where undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub annualized_return: Option<f64>,
    pub sharpe: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub win_rate: Option<f64>,
}

impl PerformanceSummary {
    /// Metric name to value.
    pub fn to_map(&self) -> BTreeMap<&'static str, Option<f64>> {
        BTreeMap::from([
            ("annualized_return", self.annualized_return),
            ("sharpe", self.sharpe),
            ("max_drawdown", self.max_drawdown),
            ("win_rate", self.win_rate),
        ])
    }
}

pub fn summarize(returns: &[Option<f64>]) -> PerformanceSummary {
    PerformanceSummary {
        annualized_return: annualized_return(returns),
        sharpe: sharpe_ratio(returns),
        max_drawdown: max_drawdown(returns),
        win_rate: win_rate(returns),
    }
}

/// Compound growth of the defined returns, annualised over their count.
pub fn annualized_return(returns: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = returns.iter().flatten().copied().collect();
    if defined.is_empty() {
        return None;
    }
    let growth: f64 = defined.iter().map(|r| 1.0 + r).product();
    if growth < 0.0 {
        return None;
    }
    let value = growth.powf(TRADING_DAYS / defined.len() as f64) - 1.0;
    value.is_finite().then_some(value)
}

/// `mean * 252 / (sample std * sqrt(252))` over the defined returns.
/// A std at or below `1e-12 * max|r|` counts as zero and gives `None`.
pub fn sharpe_ratio(returns: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = returns.iter().flatten().copied().collect();
    let n = defined.len();
    if n < 2 {
        return None;
    }
    let mean = defined.iter().sum::<f64>() / n as f64;
    let var = defined.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = var.sqrt();
    let scale = defined.iter().fold(0.0_f64, |m, r| m.max(r.abs()));
    if !std.is_finite() || std <= ZERO_STD_TOL * scale {
        return None;
    }
    Some(mean * TRADING_DAYS / (std * TRADING_DAYS.sqrt()))
}

/// Worst peak-to-trough decline of the compounded equity curve (<= 0).
/// A book whose equity reaches zero or below has drawdown -1.
pub fn max_drawdown(returns: &[Option<f64>]) -> Option<f64> {
    let equity: Vec<Option<f64>> = compound(returns, 1.0).into_iter().map(Some).collect();
    drawdowns(&equity).flatten().reduce(f64::min)
}

/// Share of defined returns that are strictly positive.
pub fn win_rate(returns: &[Option<f64>]) -> Option<f64> {
    let (wins, n) = returns
        .iter()
        .flatten()
        .fold((0usize, 0usize), |(w, n), r| (w + usize::from(*r > 0.0), n + 1));
    (n > 0).then(|| wins as f64 / n as f64)
}

/// Cumulative compounded value from `start`; undefined returns count as zero.
pub fn equity_curve(returns: &TimeSeries, start: f64) -> TimeSeries {
    let values = compound(&returns.values, start).into_iter().map(Some).collect();
    TimeSeries::aligned(&returns.dates, values)
}

/// `equity / running peak - 1` at each date of an equity curve, -1 once
/// equity is at or below zero. Undefined equity gives undefined drawdown.
pub fn drawdown_series(equity: &TimeSeries) -> TimeSeries {
    let values = drawdowns(&equity.values).collect();
    TimeSeries::aligned(&equity.dates, values)
}

fn compound(returns: &[Option<f64>], start: f64) -> Vec<f64> {
    returns
        .iter()
        .scan(start, |level, r| {
            *level *= 1.0 + r.unwrap_or(0.0);
            Some(*level)
        })
        .collect()
}

fn drawdowns(equity: &[Option<f64>]) -> impl Iterator<Item = Option<f64>> + '_ {
    equity.iter().scan(f64::NEG_INFINITY, |peak, &level| {
        let Some(level) = level.filter(|v| v.is_finite()) else {
            return Some(None);
        };
        *peak = peak.max(level);
        if level <= 0.0 || *peak <= 0.0 {
            return Some(Some(-1.0));
        }
        Some(Some(level / *peak - 1.0))
    })
}
