use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::data::TimeSeries;
use crate::pairs::signals::SpreadPosition;
use crate::{StatArbError, StatArbResult};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Execution assumptions for a pair backtest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestParams {
    /// Fee per leg, basis points of traded weight
    pub fee_bps_per_leg: f64,
    /// Slippage per leg, basis points of traded weight
    pub slippage_bps_per_leg: f64,
    /// Target |w_Y| + |w_X| on every day with a position
    pub gross_leverage: f64,
}

impl BacktestParams {
    pub fn new(
        fee_bps_per_leg: f64,
        slippage_bps_per_leg: f64,
        gross_leverage: f64,
    ) -> StatArbResult<Self> {
        if !fee_bps_per_leg.is_finite() || fee_bps_per_leg < 0.0 {
            return Err(StatArbError::invalid("fee_bps_per_leg", "Must be finite and >= 0"));
        }
        if !slippage_bps_per_leg.is_finite() || slippage_bps_per_leg < 0.0 {
            return Err(StatArbError::invalid(
                "slippage_bps_per_leg",
                "Must be finite and >= 0",
            ));
        }
        if !gross_leverage.is_finite() || gross_leverage <= 0.0 {
            return Err(StatArbError::invalid("gross_leverage", "Must be positive"));
        }
        Ok(BacktestParams {
            fee_bps_per_leg,
            slippage_bps_per_leg,
            gross_leverage,
        })
    }

    pub fn from_config(config: &StrategyConfig) -> StatArbResult<Self> {
        Self::new(
            config.fee_bps_per_leg,
            config.slippage_bps_per_leg,
            config.gross_leverage,
        )
    }

    /// Cost per unit of turnover.
    pub fn cost_rate(&self) -> f64 {
        (self.fee_bps_per_leg + self.slippage_bps_per_leg) / 10_000.0
    }
}

/// Daily series produced by one pair's backtest, all on the pair's dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairBacktest {
    /// Yesterday's weights times today's leg returns
    pub gross_return: TimeSeries,
    /// Gross return less cost
    pub net_return: TimeSeries,
    /// Scaled weight of the Y leg
    pub weight_y: TimeSeries,
    /// Scaled weight of the X leg
    pub weight_x: TimeSeries,
    /// |dw_Y| + |dw_X|
    pub turnover: TimeSeries,
    pub cost: TimeSeries,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Convert a spread position signal into realised daily pair returns.
///
/// Raw weights are `w_Y = pos`, `w_X = -pos * beta`, rescaled so that
/// `|w_Y| + |w_X| = gross_leverage`. A day with zero raw exposure (FLAT)
/// or an undefined input has undefined weights. The return realised on day
/// `i` applies day `i - 1` weights to day `i` simple price changes, so the
/// first date is always undefined. Cost is turnover times the combined
/// per-leg rate. Prices must be finite and strictly positive.
pub fn backtest_pair(
    dates: &[NaiveDate],
    price_y: &[f64],
    price_x: &[f64],
    hedge_ratio: &[Option<f64>],
    positions: &[Option<SpreadPosition>],
    params: &BacktestParams,
) -> StatArbResult<PairBacktest> {
    let n = dates.len();
    for (field, len) in [
        ("price_y", price_y.len()),
        ("price_x", price_x.len()),
        ("hedge_ratio", hedge_ratio.len()),
        ("positions", positions.len()),
    ] {
        if len != n {
            return Err(StatArbError::invalid(
                field,
                format!("{len} values supplied for {n} dates"),
            ));
        }
    }
    for (field, prices) in [("price_y", price_y), ("price_x", price_x)] {
        if let Some(i) = prices.iter().position(|p| !p.is_finite() || *p <= 0.0) {
            return Err(StatArbError::invalid(
                field,
                format!("Price at index {i} must be finite and positive, got {}", prices[i]),
            ));
        }
    }

    let weights: Vec<Option<(f64, f64)>> = positions
        .iter()
        .zip(hedge_ratio)
        .map(|(pos, beta)| scaled_weights(*pos, *beta, params.gross_leverage))
        .collect();

    let rate = params.cost_rate();
    let mut gross = vec![None; n];
    let mut turnover = vec![None; n];
    for i in 1..n {
        let ret_y = price_y[i] / price_y[i - 1] - 1.0;
        let ret_x = price_x[i] / price_x[i - 1] - 1.0;
        if let Some((wy_prev, wx_prev)) = weights[i - 1] {
            gross[i] = Some(wy_prev * ret_y + wx_prev * ret_x);
            if let Some((wy, wx)) = weights[i] {
                turnover[i] = Some((wy - wy_prev).abs() + (wx - wx_prev).abs());
            }
        }
    }
    let cost: Vec<Option<f64>> = turnover.iter().map(|t| t.map(|t| t * rate)).collect();
    let net: Vec<Option<f64>> = gross
        .iter()
        .zip(&cost)
        .map(|(g, c)| Some((*g)? - (*c)?))
        .collect();

    Ok(PairBacktest {
        gross_return: TimeSeries::aligned(dates, gross),
        net_return: TimeSeries::aligned(dates, net),
        weight_y: TimeSeries::aligned(dates, weights.iter().map(|w| w.map(|w| w.0)).collect()),
        weight_x: TimeSeries::aligned(dates, weights.iter().map(|w| w.map(|w| w.1)).collect()),
        turnover: TimeSeries::aligned(dates, turnover),
        cost: TimeSeries::aligned(dates, cost),
    })
}

/// Leverage-normalised `(w_Y, w_X)`, `None` for zero or undefined exposure.
pub fn scaled_weights(
    position: Option<SpreadPosition>,
    hedge_ratio: Option<f64>,
    gross_leverage: f64,
) -> Option<(f64, f64)> {
    let pos = position?.as_f64();
    let beta = hedge_ratio?;
    let (wy, wx) = (pos, -pos * beta);
    let exposure = wy.abs() + wx.abs();
    if exposure == 0.0 || !exposure.is_finite() {
        return None;
    }
    let scale = gross_leverage / exposure;
    Some((wy * scale, wx * scale))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use SpreadPosition::{Flat, LongSpread, ShortSpread};

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        start.iter_days().take(n).collect()
    }

    fn no_costs() -> BacktestParams {
        BacktestParams::new(0.0, 0.0, 1.0).unwrap()
    }

    #[test]
    fn test_lagged_weights_scenario() {
        let y = [100.0, 101.0, 99.0, 100.0];
        let x = [50.0, 50.5, 50.0, 49.0];
        let beta = [Some(1.0); 4];
        let pos = [None, Some(LongSpread), Some(LongSpread), Some(Flat)];
        let bt = backtest_pair(&dates(4), &y, &x, &beta, &pos, &no_costs()).unwrap();

        assert_eq!(bt.net_return.values[0], None);
        // Day 1 has no prior-day weight
        assert_eq!(bt.net_return.values[1], None);

        // Day-1 weights (0.5, -0.5) against day-2 price changes
        let expected = 0.5 * (99.0 / 101.0 - 1.0) - 0.5 * (50.0 / 50.5 - 1.0);
        assert!((bt.net_return.values[2].unwrap() - expected).abs() < 1e-15);
        assert_eq!(bt.weight_y.values[1], Some(0.5));
        assert_eq!(bt.weight_x.values[1], Some(-0.5));
    }

    #[test]
    fn test_flat_day_has_undefined_weights() {
        assert_eq!(scaled_weights(Some(Flat), Some(1.3), 1.0), None);
        assert_eq!(scaled_weights(None, Some(1.3), 1.0), None);
        assert_eq!(scaled_weights(Some(LongSpread), None, 1.0), None);
    }

    #[test]
    fn test_leverage_normalisation() {
        for beta in [-2.5, -0.3, 0.0, 0.4, 1.0, 3.7] {
            for pos in [LongSpread, ShortSpread] {
                let (wy, wx) = scaled_weights(Some(pos), Some(beta), 2.0).unwrap();
                assert!((wy.abs() + wx.abs() - 2.0).abs() < 1e-12);
                assert_eq!(wy.signum(), pos.as_f64());
            }
        }
    }

    #[test]
    fn test_short_spread_signs() {
        let (wy, wx) = scaled_weights(Some(ShortSpread), Some(1.0), 1.0).unwrap();
        assert_eq!((wy, wx), (-0.5, 0.5));
    }

    #[test]
    fn test_costs_follow_weight_changes() {
        let y = [10.0, 10.1, 10.3, 10.2];
        let x = [20.0, 20.4, 20.1, 20.3];
        let beta = [Some(1.0), Some(1.0), Some(3.0), Some(3.0)];
        let pos = [Some(LongSpread); 4];
        let params = BacktestParams::new(3.0, 2.0, 1.0).unwrap();
        let bt = backtest_pair(&dates(4), &y, &x, &beta, &pos, &params).unwrap();

        // beta 1 -> (0.5, -0.5); beta 3 -> (0.25, -0.75)
        let turnover = bt.turnover.values[2].unwrap();
        assert!((turnover - 0.5).abs() < 1e-15);
        let cost = bt.cost.values[2].unwrap();
        assert!((cost - 0.5 * 5.0 / 10_000.0).abs() < 1e-15);
        let gross = bt.gross_return.values[2].unwrap();
        assert!((bt.net_return.values[2].unwrap() - (gross - cost)).abs() < 1e-15);

        assert_eq!(bt.turnover.values[1], Some(0.0));
        assert_eq!(bt.turnover.values[0], None);
    }

    #[test]
    fn test_return_at_day_ignores_same_day_signal() {
        let y: Vec<f64> = (0..8).map(|i| 100.0 + (i as f64).sin()).collect();
        let x: Vec<f64> = (0..8).map(|i| 40.0 + (i as f64 * 0.5).cos()).collect();
        let beta = vec![Some(1.2); 8];
        let pos = vec![Some(LongSpread); 8];
        let base = backtest_pair(&dates(8), &y, &x, &beta, &pos, &no_costs()).unwrap();

        let i = 4;
        let mut pos2 = pos.clone();
        pos2[i] = Some(ShortSpread);
        let mut beta2 = beta.clone();
        beta2[i] = Some(0.1);
        let moved = backtest_pair(&dates(8), &y, &x, &beta2, &pos2, &no_costs()).unwrap();

        assert_eq!(base.gross_return.values[..=i], moved.gross_return.values[..=i]);
        assert_ne!(base.gross_return.values[i + 1], moved.gross_return.values[i + 1]);
    }

    #[test]
    fn test_length_mismatch() {
        let result = backtest_pair(
            &dates(3),
            &[1.0, 2.0, 3.0],
            &[1.0, 2.0],
            &[None; 3],
            &[None; 3],
            &no_costs(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_positive_or_non_finite_prices() {
        let beta = [Some(1.0); 3];
        let pos = [Some(LongSpread); 3];
        for (y, x) in [
            ([100.0, 0.0, 101.0], [50.0, 50.0, 50.0]),
            ([100.0, 101.0, 102.0], [50.0, f64::NAN, 50.0]),
            ([100.0, 101.0, 102.0], [-50.0, 50.0, 50.0]),
            ([f64::INFINITY, 101.0, 102.0], [50.0, 50.0, 50.0]),
        ] {
            let result = backtest_pair(&dates(3), &y, &x, &beta, &pos, &no_costs());
            assert!(
                matches!(result, Err(StatArbError::InvalidInput { .. })),
                "{y:?} {x:?}"
            );
        }
    }

    #[test]
    fn test_params_validation() {
        assert!(BacktestParams::new(-1.0, 0.0, 1.0).is_err());
        assert!(BacktestParams::new(1.0, f64::NAN, 1.0).is_err());
        assert!(BacktestParams::new(1.0, 0.0, 0.0).is_err());
        let p = BacktestParams::from_config(&StrategyConfig::default()).unwrap();
        assert!((p.cost_rate() - 0.0001).abs() < 1e-15);
    }
}
