use serde::{Deserialize, Serialize};

use crate::stats::regression::simple_ols;
use crate::stats::stationarity::{adf_test, mackinnon_p_value, AdfRegression};
use crate::{StatArbError, StatArbResult};

/// Fewest overlapping observations on which a residual-based test is run.
pub const MIN_TEST_OBSERVATIONS: usize = 50;

/// Engle-Granger two-step cointegration test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CointegrationTest {
    /// ADF t-statistic on the levels-regression residuals
    pub statistic: f64,
    /// MacKinnon approximate p-value for two variables
    pub p_value: f64,
    /// Whole-sample slope of `y` on `x`
    pub hedge_ratio: f64,
    pub intercept: f64,
    /// Lagged differences chosen for the residual ADF regression
    pub used_lag: usize,
    pub nobs: usize,
}

/// Engle-Granger test of `y` against `x` (same length, no missing values).
///
/// Step 1 regresses `y` on a constant and `x`; step 2 runs an ADF test
/// without deterministic terms on the residuals. When the levels regression
/// is essentially a perfect fit the residual test is meaningless and the
/// pair is reported as cointegrated with a p-value of zero.
pub fn engle_granger(y: &[f64], x: &[f64]) -> StatArbResult<CointegrationTest> {
    if y.len() != x.len() {
        return Err(StatArbError::invalid(
            "x",
            format!("Series lengths differ: {} vs {}", y.len(), x.len()),
        ));
    }
    let nobs = y.len();
    if nobs < MIN_TEST_OBSERVATIONS {
        return Err(StatArbError::InsufficientData(format!(
            "Cointegration test needs {MIN_TEST_OBSERVATIONS} overlapping observations, got {nobs}"
        )));
    }

    let fit = simple_ols(y, x).ok_or_else(|| {
        StatArbError::InsufficientData("Regressor has zero variance".into())
    })?;

    let collinear_bound = 1.0 - 100.0 * f64::EPSILON.sqrt();
    if fit.r_squared >= collinear_bound {
        return Ok(CointegrationTest {
            statistic: f64::NEG_INFINITY,
            p_value: 0.0,
            hedge_ratio: fit.slope,
            intercept: fit.intercept,
            used_lag: 0,
            nobs,
        });
    }

    let residuals: Vec<f64> = y
        .iter()
        .zip(x)
        .map(|(yi, xi)| yi - fit.intercept - fit.slope * xi)
        .collect();
    let adf = adf_test(&residuals, AdfRegression::NoConstant)?;

    Ok(CointegrationTest {
        statistic: adf.statistic,
        p_value: mackinnon_p_value(adf.statistic, 2)?,
        hedge_ratio: fit.slope,
        intercept: fit.intercept,
        used_lag: adf.used_lag,
        nobs,
    })
}

/// Whole-sample ADF p-value of a spread, over its defined values.
///
/// `None` when fewer than [`MIN_TEST_OBSERVATIONS`] values are defined or
/// the regression is degenerate.
pub fn spread_adf_p_value(spread: &[Option<f64>]) -> Option<f64> {
    let values: Vec<f64> = spread.iter().flatten().copied().collect();
    if values.len() < MIN_TEST_OBSERVATIONS {
        return None;
    }
    adf_test(&values, AdfRegression::Constant)
        .ok()
        .map(|r| r.p_value)
}
