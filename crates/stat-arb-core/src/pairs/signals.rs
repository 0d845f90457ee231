use serde::{Deserialize, Serialize};

use crate::config::{MissingSignalPolicy, StrategyConfig};
use crate::{StatArbError, StatArbResult};

/// Relative size below which a rolling standard deviation counts as zero.
const ZERO_VARIANCE_TOL: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Position held in the spread `Y - beta * X`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadPosition {
    /// Long Y, short beta * X
    LongSpread,
    /// Short Y, long beta * X
    ShortSpread,
    #[default]
    Flat,
}

impl SpreadPosition {
    /// +1 / -1 / 0
    pub fn as_f64(self) -> f64 {
        match self {
            SpreadPosition::LongSpread => 1.0,
            SpreadPosition::ShortSpread => -1.0,
            SpreadPosition::Flat => 0.0,
        }
    }
}

/// Entry/exit bands on |z|, with `entry_z > exit_z >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub entry_z: f64,
    pub exit_z: f64,
}

impl SignalThresholds {
    pub fn new(entry_z: f64, exit_z: f64) -> StatArbResult<Self> {
        if !entry_z.is_finite() || !exit_z.is_finite() || exit_z < 0.0 || exit_z >= entry_z {
            return Err(StatArbError::invalid(
                "exit_z",
                format!("Require entry_z > exit_z >= 0, got entry {entry_z}, exit {exit_z}"),
            ));
        }
        Ok(SignalThresholds { entry_z, exit_z })
    }

    pub fn from_config(config: &StrategyConfig) -> StatArbResult<Self> {
        Self::new(config.entry_z, config.exit_z)
    }
}

// ---------------------------------------------------------------------------
// Spread and z-score
// ---------------------------------------------------------------------------

/// `y[i] - beta[i] * x[i]`, undefined wherever `beta[i]` is.
pub fn compute_spread(
    y: &[f64],
    x: &[f64],
    hedge_ratio: &[Option<f64>],
) -> StatArbResult<Vec<Option<f64>>> {
    if y.len() != x.len() || y.len() != hedge_ratio.len() {
        return Err(StatArbError::invalid(
            "hedge_ratio",
            format!(
                "Lengths differ: y {}, x {}, hedge ratio {}",
                y.len(),
                x.len(),
                hedge_ratio.len()
            ),
        ));
    }
    Ok(y.iter()
        .zip(x)
        .zip(hedge_ratio)
        .map(|((yi, xi), beta)| beta.map(|b| yi - b * xi))
        .collect())
}

/// Trailing z-score using the population standard deviation.
///
/// Defined at `i` only when all of `i + 1 - window ..= i` are defined and
/// the window's deviation is non-zero. A deviation at or below
/// `1e-12 * max|v|` over the window counts as zero.
pub fn rolling_zscore(series: &[Option<f64>], window: usize) -> StatArbResult<Vec<Option<f64>>> {
    if window < 2 {
        return Err(StatArbError::invalid(
            "z_lookback",
            "Z-score window must be >= 2",
        ));
    }
    let n = series.len();
    let mut z = vec![None; n];
    let mut buf = Vec::with_capacity(window);
    for end in (window - 1)..n {
        buf.clear();
        buf.extend(series[end + 1 - window..=end].iter().map_while(|v| *v));
        if buf.len() < window {
            continue;
        }
        let w = window as f64;
        let mean = buf.iter().sum::<f64>() / w;
        let var = buf.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / w;
        let std = var.sqrt();
        let scale = buf.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if std <= ZERO_VARIANCE_TOL * scale || !std.is_finite() {
            continue;
        }
        z[end] = Some((buf[window - 1] - mean) / std);
    }
    Ok(z)
}

// ---------------------------------------------------------------------------
// Position state machine
// ---------------------------------------------------------------------------

/// One step of the position scan.
///
/// Returns `(state carried to the next date, position emitted for today)`.
/// An undefined `z` emits `None`; the carried state then follows `policy`.
pub fn step_position(
    state: SpreadPosition,
    z: Option<f64>,
    thresholds: &SignalThresholds,
    policy: MissingSignalPolicy,
) -> (SpreadPosition, Option<SpreadPosition>) {
    let Some(z) = z.filter(|v| v.is_finite()) else {
        let carried = match policy {
            MissingSignalPolicy::Hold => state,
            MissingSignalPolicy::ResetFlat => SpreadPosition::Flat,
        };
        return (carried, None);
    };

    let next = match state {
        SpreadPosition::Flat if z <= -thresholds.entry_z => SpreadPosition::LongSpread,
        SpreadPosition::Flat if z >= thresholds.entry_z => SpreadPosition::ShortSpread,
        SpreadPosition::Flat => SpreadPosition::Flat,
        _ if z.abs() <= thresholds.exit_z => SpreadPosition::Flat,
        open => open,
    };
    (next, Some(next))
}

/// Left-to-right fold of [`step_position`] from an initial FLAT state.
pub fn positions_from_zscore(
    zscore: &[Option<f64>],
    thresholds: &SignalThresholds,
    policy: MissingSignalPolicy,
) -> Vec<Option<SpreadPosition>> {
    zscore
        .iter()
        .scan(SpreadPosition::Flat, |state, &z| {
            let (next, emitted) = step_position(*state, z, thresholds, policy);
            *state = next;
            Some(emitted)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
