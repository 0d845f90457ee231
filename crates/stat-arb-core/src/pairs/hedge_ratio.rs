use crate::stats::regression::simple_ols;
use crate::{StatArbError, StatArbResult};

/// Rolling OLS hedge ratio of `y` on `x` (with intercept).
///
/// The value at `i` is the slope fitted on exactly observations
/// `i + 1 - window ..= i`; nothing after `i` is read. The first
/// `window - 1` entries are `None`, as is any window in which `x` is
/// constant. Each window is refit from scratch, `O(T * window)`.
pub fn rolling_hedge_ratio(
    y: &[f64],
    x: &[f64],
    window: usize,
) -> StatArbResult<Vec<Option<f64>>> {
    if window < 2 {
        return Err(StatArbError::invalid(
            "beta_lookback",
            "Hedge-ratio window must be >= 2",
        ));
    }
    if y.len() != x.len() {
        return Err(StatArbError::invalid(
            "x",
            format!("Series lengths differ: {} vs {}", y.len(), x.len()),
        ));
    }

    let n = y.len();
    let mut betas = vec![None; n];
    for end in (window - 1)..n {
        let start = end + 1 - window;
        betas[end] = simple_ols(&y[start..=end], &x[start..=end]).map(|fit| fit.slope);
    }
    Ok(betas)
}
