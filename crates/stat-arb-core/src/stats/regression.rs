use nalgebra::{DMatrix, DVector};

/// Intercept and slope of `y = alpha + beta * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleFit {
    pub intercept: f64,
    pub slope: f64,
    /// Coefficient of determination
    pub r_squared: f64,
}

/// Result of a multiple regression.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub params: DVector<f64>,
    pub std_errors: DVector<f64>,
    pub residuals: DVector<f64>,
    pub ssr: f64,
    pub nobs: usize,
}

impl OlsFit {
    /// t-statistic of coefficient `i`.
    pub fn t_value(&self, i: usize) -> f64 {
        self.params[i] / self.std_errors[i]
    }

    /// Gaussian log-likelihood at the OLS estimate.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion: -2 llf + 2k.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.params.len() as f64
    }
}

/// Ordinary least squares of `y` on `x` with an intercept.
///
/// Returns `None` for mismatched or empty inputs and when `x` has zero
/// variance (the slope is not identified).
pub fn simple_ols(y: &[f64], x: &[f64]) -> Option<SimpleFit> {
    let n = y.len();
    if n == 0 || x.len() != n {
        return None;
    }
    let n_f = n as f64;
    let mean_x = x.iter().sum::<f64>() / n_f;
    let mean_y = y.iter().sum::<f64>() / n_f;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx <= 0.0 || !sxx.is_finite() {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy > 0.0 {
        (sxy * sxy) / (sxx * syy)
    } else {
        1.0
    };
    Some(SimpleFit {
        intercept,
        slope,
        r_squared,
    })
}

/// Ordinary least squares of `y` on the columns of `design`.
///
/// No intercept is added; include a column of ones if one is wanted.
/// Returns `None` when the system is underdetermined or `X'X` is singular.
pub fn multiple_ols(y: &DVector<f64>, design: &DMatrix<f64>) -> Option<OlsFit> {
    let (nobs, k) = design.shape();
    if nobs != y.len() || nobs <= k || k == 0 {
        return None;
    }

    let xt = design.transpose();
    let xtx_inv = (&xt * design).cholesky()?.inverse();
    let params = &xtx_inv * (&xt * y);
    let residuals = y - design * &params;
    let ssr = residuals.norm_squared();
    let sigma2 = ssr / (nobs - k) as f64;

    let std_errors = DVector::from_iterator(k, (0..k).map(|i| (sigma2 * xtx_inv[(i, i)]).sqrt()));
    Some(OlsFit {
        params,
        std_errors,
        residuals,
        ssr,
        nobs,
    })
}
