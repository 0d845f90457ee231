//! Augmented Dickey-Fuller unit-root test with MacKinnon p-values.
//!
//! Test regression, for lag order p:
//!
//! ```text
//! dy_t = [c] + gamma * y_{t-1} + sum_{i=1..p} phi_i * dy_{t-i} + e_t
//! ```
//!
//! The statistic is the t-value of `gamma`. The lag order is chosen by AIC
//! over a common estimation sample, then the winning order is refit on its
//! own full sample.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use crate::stats::regression::multiple_ols;
use crate::{StatArbError, StatArbResult};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Deterministic terms included in the test regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdfRegression {
    /// No deterministic terms (used on regression residuals)
    NoConstant,
    /// Intercept only
    Constant,
}

impl AdfRegression {
    fn trend_terms(self) -> usize {
        match self {
            AdfRegression::NoConstant => 0,
            AdfRegression::Constant => 1,
        }
    }
}

/// Outcome of an ADF test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// t-statistic of the lagged level
    pub statistic: f64,
    /// MacKinnon approximate p-value (constant-term surface, one variable)
    pub p_value: f64,
    /// Number of lagged differences in the final regression
    pub used_lag: usize,
    /// Observations in the final regression
    pub nobs: usize,
}

// ---------------------------------------------------------------------------
// MacKinnon (1994) response surfaces, constant-term case
// ---------------------------------------------------------------------------

struct MacKinnonSurface {
    tau_max: f64,
    tau_min: f64,
    tau_star: f64,
    small_p: [f64; 3],
    large_p: [f64; 4],
}

/// Index 0: one variable (unit-root test). Index 1: two variables
/// (Engle-Granger residual test).
const CONSTANT_SURFACES: [MacKinnonSurface; 2] = [
    MacKinnonSurface {
        tau_max: 2.74,
        tau_min: -18.83,
        tau_star: -1.61,
        small_p: [2.1659, 1.4412, 0.038269],
        large_p: [1.7339, 0.93202, -0.12745, -0.010368],
    },
    MacKinnonSurface {
        tau_max: 0.92,
        tau_min: -18.86,
        tau_star: -2.62,
        small_p: [2.92, 1.5012, 0.039796],
        large_p: [2.1945, 0.64695, -0.29198, -0.042377],
    },
];

/// Approximate asymptotic p-value of a Dickey-Fuller type statistic for
/// `n_vars` integrated variables (1 or 2) with an intercept.
pub fn mackinnon_p_value(statistic: f64, n_vars: usize) -> StatArbResult<f64> {
    let surface = n_vars
        .checked_sub(1)
        .and_then(|i| CONSTANT_SURFACES.get(i))
        .ok_or_else(|| {
            StatArbError::invalid("n_vars", "MacKinnon surface available for 1 or 2 variables")
        })?;
    if statistic.is_nan() {
        return Err(StatArbError::invalid("statistic", "Test statistic is NaN"));
    }
    if statistic > surface.tau_max {
        return Ok(1.0);
    }
    if statistic < surface.tau_min {
        return Ok(0.0);
    }
    let z = if statistic <= surface.tau_star {
        polyval(&surface.small_p, statistic)
    } else {
        polyval(&surface.large_p, statistic)
    };
    Ok(standard_normal_cdf(z))
}

/// Evaluate `c[0] + c[1] x + c[2] x^2 + ...`.
fn polyval(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// ADF test with the default maximum lag `ceil(12 * (n/100)^(1/4))`,
/// capped at `n/2 - ntrend - 1`, and AIC lag selection.
pub fn adf_test(series: &[f64], regression: AdfRegression) -> StatArbResult<AdfResult> {
    adf_test_with_max_lag(series, regression, None)
}

/// ADF test with an explicit upper bound on the lag search.
pub fn adf_test_with_max_lag(
    series: &[f64],
    regression: AdfRegression,
    max_lag: Option<usize>,
) -> StatArbResult<AdfResult> {
    let nobs = series.len();
    let ntrend = regression.trend_terms();
    let cap = (nobs / 2).checked_sub(ntrend + 1).ok_or_else(|| {
        StatArbError::InsufficientData(format!(
            "{nobs} observations are too few for an ADF regression"
        ))
    })?;
    let max_lag = match max_lag {
        Some(lag) if lag > cap => {
            return Err(StatArbError::invalid(
                "max_lag",
                format!("Maximum lag {lag} exceeds {cap} for {nobs} observations"),
            ))
        }
        Some(lag) => lag,
        None => {
            let rule = (12.0 * (nobs as f64 / 100.0).powf(0.25)).ceil() as usize;
            rule.min(cap)
        }
    };

    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag selection on the common sample starting at `max_lag`.
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let (y, x) = adf_design(series, &diff, lag, max_lag, regression);
        if let Some(fit) = multiple_ols(&y, &x) {
            let aic = fit.aic();
            if best.map_or(true, |(best_aic, _)| aic < best_aic) {
                best = Some((aic, lag));
            }
        }
    }
    let (_, used_lag) = best.ok_or_else(|| {
        StatArbError::InsufficientData("ADF lag search found no estimable regression".into())
    })?;

    let (y, x) = adf_design(series, &diff, used_lag, used_lag, regression);
    let fit = multiple_ols(&y, &x).ok_or_else(|| {
        StatArbError::InsufficientData("ADF regression is singular".into())
    })?;
    let statistic = fit.t_value(0);
    if statistic.is_nan() {
        return Err(StatArbError::InsufficientData(
            "ADF regression has no residual variation".into(),
        ));
    }

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic, 1)?,
        used_lag,
        nobs: fit.nobs,
    })
}

/// Build the test regression with `lag` lagged differences on rows
/// `first_row..diff.len()`. Column 0 is always the lagged level.
fn adf_design(
    level: &[f64],
    diff: &[f64],
    lag: usize,
    first_row: usize,
    regression: AdfRegression,
) -> (DVector<f64>, DMatrix<f64>) {
    let rows = diff.len().saturating_sub(first_row);
    let cols = 1 + lag + regression.trend_terms();
    let y = DVector::from_iterator(rows, diff[first_row..].iter().copied());
    let x = DMatrix::from_fn(rows, cols, |r, c| {
        let t = first_row + r;
        match c {
            0 => level[t],
            c if c <= lag => diff[t - c],
            _ => 1.0,
        }
    });
    (y, x)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
