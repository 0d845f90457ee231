use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{StatArbError, StatArbResult};

/// What the position scan does with its carried state when the z-score is
/// undefined. The emitted position for that date is UNDEFINED either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSignalPolicy {
    /// Carry the current state through the gap unchanged.
    #[default]
    Hold,
    /// Force the carried state back to FLAT.
    ResetFlat,
}

/// Strategy parameters for one pipeline run.
///
/// Built once, validated once, then passed by reference to every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// First date of the evaluation window
    pub start: NaiveDate,
    /// Last date of the evaluation window (inclusive); open-ended when absent
    pub end: Option<NaiveDate>,

    /// Maximum Engle-Granger p-value for a pair to be traded
    pub coint_pvalue_max: f64,
    /// Minimum jointly non-missing observations for a pair to be scored
    pub min_overlap_days: usize,

    /// Trailing window for the rolling hedge-ratio regression
    pub beta_lookback: usize,
    /// Trailing window for the spread z-score
    pub z_lookback: usize,

    /// |z| at or beyond which a position is opened
    pub entry_z: f64,
    /// |z| at or below which an open position is closed
    pub exit_z: f64,
    /// Scan behaviour across undefined z-scores
    pub missing_signal_policy: MissingSignalPolicy,

    /// Fee per leg, in basis points of traded weight
    pub fee_bps_per_leg: f64,
    /// Slippage per leg, in basis points of traded weight
    pub slippage_bps_per_leg: f64,
    /// Target |w_Y| + |w_X| on every day with a position
    pub gross_leverage: f64,

    /// Trade at most this many pairs, best p-values first
    pub max_pairs: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            end: None,
            coint_pvalue_max: 0.05,
            min_overlap_days: 252,
            beta_lookback: 252,
            z_lookback: 60,
            entry_z: 2.0,
            exit_z: 0.5,
            missing_signal_policy: MissingSignalPolicy::Hold,
            fee_bps_per_leg: 1.0,
            slippage_bps_per_leg: 0.0,
            gross_leverage: 1.0,
            max_pairs: 10,
        }
    }
}

impl StrategyConfig {
    /// Check every parameter, reporting the first violation.
    pub fn validate(&self) -> StatArbResult<()> {
        if let Some(end) = self.end {
            if end < self.start {
                return Err(StatArbError::DateError(format!(
                    "end date {end} precedes start date {}",
                    self.start
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.coint_pvalue_max) {
            return Err(StatArbError::invalid(
                "coint_pvalue_max",
                "P-value threshold must lie in [0, 1]",
            ));
        }
        if self.min_overlap_days == 0 {
            return Err(StatArbError::invalid(
                "min_overlap_days",
                "Minimum overlap must be at least 1 observation",
            ));
        }
        if self.beta_lookback < 2 {
            return Err(StatArbError::invalid(
                "beta_lookback",
                "Hedge-ratio window must be >= 2",
            ));
        }
        if self.z_lookback < 2 {
            return Err(StatArbError::invalid(
                "z_lookback",
                "Z-score window must be >= 2",
            ));
        }
        if !self.entry_z.is_finite() || !self.exit_z.is_finite() {
            return Err(StatArbError::invalid("entry_z", "Thresholds must be finite"));
        }
        if self.exit_z < 0.0 {
            return Err(StatArbError::invalid(
                "exit_z",
                "Exit z-score must be non-negative",
            ));
        }
        if self.exit_z >= self.entry_z {
            return Err(StatArbError::invalid(
                "exit_z",
                format!(
                    "Exit z-score ({}) must be below entry z-score ({})",
                    self.exit_z, self.entry_z
                ),
            ));
        }
        for (field, bps) in [
            ("fee_bps_per_leg", self.fee_bps_per_leg),
            ("slippage_bps_per_leg", self.slippage_bps_per_leg),
        ] {
            if !bps.is_finite() || bps < 0.0 {
                return Err(StatArbError::invalid(field, "Cost must be finite and >= 0"));
            }
        }
        if !self.gross_leverage.is_finite() || self.gross_leverage <= 0.0 {
            return Err(StatArbError::invalid(
                "gross_leverage",
                "Gross leverage must be positive",
            ));
        }
        if self.max_pairs == 0 {
            return Err(StatArbError::invalid(
                "max_pairs",
                "At least one pair must be allowed",
            ));
        }
        Ok(())
    }

    /// Combined per-leg cost as a fraction of traded weight.
    pub fn cost_rate(&self) -> f64 {
        (self.fee_bps_per_leg + self.slippage_bps_per_leg) / 10_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = StrategyConfig::default();
        assert_eq!(cfg.start, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert_eq!(cfg.end, None);
        assert_eq!(cfg.coint_pvalue_max, 0.05);
        assert_eq!(cfg.min_overlap_days, 252);
        assert_eq!(cfg.beta_lookback, 252);
        assert_eq!(cfg.z_lookback, 60);
        assert_eq!(cfg.entry_z, 2.0);
        assert_eq!(cfg.exit_z, 0.5);
        assert_eq!(cfg.fee_bps_per_leg, 1.0);
        assert_eq!(cfg.slippage_bps_per_leg, 0.0);
        assert_eq!(cfg.gross_leverage, 1.0);
        assert_eq!(cfg.max_pairs, 10);
        assert_eq!(cfg.missing_signal_policy, MissingSignalPolicy::Hold);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: StrategyConfig =
            serde_json::from_str(r#"{"entry_z": 2.5, "end": "2023-12-29"}"#).unwrap();
        assert_eq!(cfg.entry_z, 2.5);
        assert_eq!(cfg.exit_z, 0.5);
        assert_eq!(cfg.end, NaiveDate::from_ymd_opt(2023, 12, 29));
    }

    #[test]
    fn test_policy_serialises_snake_case() {
        let cfg: StrategyConfig =
            serde_json::from_str(r#"{"missing_signal_policy": "reset_flat"}"#).unwrap();
        assert_eq!(cfg.missing_signal_policy, MissingSignalPolicy::ResetFlat);
    }

    #[test]
    fn test_exit_must_be_below_entry() {
        let cfg = StrategyConfig {
            exit_z: 2.0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("exit_z"));
    }

    #[test]
    fn test_negative_exit_rejected() {
        let cfg = StrategyConfig {
            exit_z: -0.1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_short_windows_rejected() {
        let beta = StrategyConfig {
            beta_lookback: 1,
            ..Default::default()
        };
        assert!(beta.validate().is_err());
        let z = StrategyConfig {
            z_lookback: 1,
            ..Default::default()
        };
        assert!(z.validate().is_err());
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let cfg = StrategyConfig {
            end: NaiveDate::from_ymd_opt(2017, 6, 30),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(StatArbError::DateError(_))));
    }

    #[test]
    fn test_non_positive_leverage_rejected() {
        let cfg = StrategyConfig {
            gross_leverage: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_negative_fee_rejected() {
        let cfg = StrategyConfig {
            fee_bps_per_leg: -1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_cost_rate() {
        let cfg = StrategyConfig {
            fee_bps_per_leg: 1.5,
            slippage_bps_per_leg: 0.5,
            ..Default::default()
        };
        assert!((cfg.cost_rate() - 0.0002).abs() < 1e-15);
    }
}
