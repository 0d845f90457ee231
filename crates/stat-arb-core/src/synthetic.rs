use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Normal, Uniform};
use tracing::debug;

use crate::data::{PriceColumn, PriceTable};
use crate::{StatArbError, StatArbResult};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parameters of a synthetic daily price universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticMarketInput {
    /// Optional seed for reproducibility.
    pub seed: Option<u64>,
    /// First trading day; weekends are skipped.
    #[serde(default = "default_start")]
    pub start: NaiveDate,
    #[serde(default = "default_num_days")]
    pub num_days: usize,
    /// Independent geometric random walks (tickers `RW01`, `RW02`, ..)
    #[serde(default = "default_num_random_walks")]
    pub num_random_walks: usize,
    /// Cointegrated pairs (tickers `CA01`/`CB01`, ..)
    #[serde(default = "default_num_cointegrated")]
    pub num_cointegrated: usize,
    /// Daily log-return volatility of every walk
    #[serde(default = "default_daily_vol")]
    pub daily_volatility: f64,
    /// Per-day mean reversion of the partner's deviation, in (0, 1]
    #[serde(default = "default_reversion")]
    pub mean_reversion: f64,
    /// Innovation size of the partner's deviation, in price units
    #[serde(default = "default_spread_noise")]
    pub spread_noise: f64,
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default()
}
fn default_num_days() -> usize {
    1_000
}
fn default_num_random_walks() -> usize {
    2
}
fn default_num_cointegrated() -> usize {
    2
}
fn default_daily_vol() -> f64 {
    0.015
}
fn default_reversion() -> f64 {
    0.15
}
fn default_spread_noise() -> f64 {
    0.5
}

impl Default for SyntheticMarketInput {
    fn default() -> Self {
        SyntheticMarketInput {
            seed: None,
            start: default_start(),
            num_days: default_num_days(),
            num_random_walks: default_num_random_walks(),
            num_cointegrated: default_num_cointegrated(),
            daily_volatility: default_daily_vol(),
            mean_reversion: default_reversion(),
            spread_noise: default_spread_noise(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate a wide price table of random walks and cointegrated pairs.
///
/// Each cointegrated partner is `beta * base + u_t` with
/// `u_t = (1 - mean_reversion) * u_{t-1} + spread_noise * e_t`, where the
/// hedge ratio `beta` is drawn from U(0.5, 1.5). Columns are the pairs
/// first (`CA01, CB01, CA02, ..`) then the walks.
pub fn simulate_prices(input: &SyntheticMarketInput) -> StatArbResult<PriceTable> {
    validate(input)?;

    let mut rng = match input.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let shock = Normal::new(0.0, input.daily_volatility)
        .map_err(|e| StatArbError::invalid("daily_volatility", e.to_string()))?;
    let unit = Normal::new(0.0, 1.0)
        .map_err(|e| StatArbError::invalid("spread_noise", e.to_string()))?;
    let hedge = Uniform::new(0.5, 1.5)
        .map_err(|e| StatArbError::invalid("hedge_ratio", e.to_string()))?;
    let start_price = Uniform::new(50.0, 200.0)
        .map_err(|e| StatArbError::invalid("start_price", e.to_string()))?;

    let n = input.num_days;
    let mut columns = Vec::with_capacity(2 * input.num_cointegrated + input.num_random_walks);

    for k in 1..=input.num_cointegrated {
        let s0 = rng.sample(start_price);
        let base = geometric_walk(&mut rng, shock, s0, n);
        let beta = rng.sample(hedge);
        let mut deviation = 0.0;
        let mut partner = Vec::with_capacity(n);
        for level in &base {
            deviation = (1.0 - input.mean_reversion) * deviation
                + input.spread_noise * rng.sample(unit);
            partner.push(Some(beta * level + deviation));
        }
        debug!(pair = k, beta, "cointegrated pair simulated");
        columns.push(PriceColumn {
            ticker: format!("CA{k:02}"),
            prices: base.into_iter().map(Some).collect(),
        });
        columns.push(PriceColumn {
            ticker: format!("CB{k:02}"),
            prices: partner,
        });
    }

    for k in 1..=input.num_random_walks {
        let s0 = rng.sample(start_price);
        let walk = geometric_walk(&mut rng, shock, s0, n);
        columns.push(PriceColumn {
            ticker: format!("RW{k:02}"),
            prices: walk.into_iter().map(Some).collect(),
        });
    }

    PriceTable::new(weekdays(input.start, n), columns)
}

/// The first `n` Monday-to-Friday dates on or after `start`.
pub fn weekdays(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    start
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(n)
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate(input: &SyntheticMarketInput) -> StatArbResult<()> {
    if input.num_days < 2 {
        return Err(StatArbError::invalid("num_days", "Must be at least 2"));
    }
    if input.num_cointegrated * 2 + input.num_random_walks < 2 {
        return Err(StatArbError::invalid(
            "num_random_walks",
            "Universe needs at least two tickers",
        ));
    }
    if !input.daily_volatility.is_finite() || input.daily_volatility <= 0.0 {
        return Err(StatArbError::invalid("daily_volatility", "Must be positive"));
    }
    if !(input.mean_reversion > 0.0 && input.mean_reversion <= 1.0) {
        return Err(StatArbError::invalid("mean_reversion", "Must lie in (0, 1]"));
    }
    if !input.spread_noise.is_finite() || input.spread_noise < 0.0 {
        return Err(StatArbError::invalid("spread_noise", "Must be >= 0"));
    }
    Ok(())
}

fn geometric_walk(rng: &mut StdRng, shock: Normal, start: f64, n: usize) -> Vec<f64> {
    let mut level = start;
    (0..n)
        .map(|_| {
            level *= rng.sample(shock).exp();
            level
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> SyntheticMarketInput {
        SyntheticMarketInput {
            seed: Some(seed),
            num_days: 300,
            ..SyntheticMarketInput::default()
        }
    }

    #[test]
    fn test_layout_and_calendar() {
        let table = simulate_prices(&seeded(1)).unwrap();
        assert_eq!(table.len(), 300);
        assert_eq!(table.tickers(), ["CA01", "CB01", "CA02", "CB02", "RW01", "RW02"]);
        assert!(table
            .dates()
            .iter()
            .all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = simulate_prices(&seeded(9)).unwrap();
        let b = simulate_prices(&seeded(9)).unwrap();
        let c = simulate_prices(&seeded(10)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_prices_are_defined() {
        let table = simulate_prices(&seeded(3)).unwrap();
        for t in table.tickers() {
            assert_eq!(table.observations(t), 300, "{t} has gaps");
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let mut input = seeded(1);
        input.mean_reversion = 0.0;
        assert!(simulate_prices(&input).is_err());
        let mut input = seeded(1);
        input.num_cointegrated = 0;
        input.num_random_walks = 1;
        assert!(simulate_prices(&input).is_err());
    }

    #[test]
    fn test_weekdays_skip_weekend() {
        // 2024-01-05 is a Friday
        let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let days = weekdays(start, 3);
        assert_eq!(days[1], NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
    }
}
