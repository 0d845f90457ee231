use std::collections::BTreeMap;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use stat_arb_core::config::StrategyConfig;
use stat_arb_core::data::{PriceColumn, PriceTable, TimeSeries};
use stat_arb_core::pairs::analysis::analyze_pair;
use stat_arb_core::pairs::selection::CandidatePair;
use stat_arb_core::portfolio::aggregation::{equal_weight_portfolio, merge_pair_results};
use stat_arb_core::portfolio::metrics::{
    drawdown_series, equity_curve, max_drawdown, summarize, win_rate,
};
use stat_arb_core::StatArbError;

fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 3)
        .unwrap()
        .checked_add_days(chrono::Days::new(n))
        .unwrap()
}

fn series(start: u64, values: &[Option<f64>]) -> TimeSeries {
    let dates = (0..values.len() as u64).map(|i| day(start + i)).collect();
    TimeSeries::new(dates, values.to_vec()).unwrap()
}

// ===========================================================================
// PortfolioAggregator
// ===========================================================================

#[test]
fn test_identical_pair_returns_give_that_return() {
    let mut map = BTreeMap::new();
    map.insert("A__B".to_string(), series(0, &[Some(0.004), Some(-0.002), None]));
    map.insert("A__C".to_string(), series(0, &[Some(0.004), Some(-0.002), Some(0.01)]));
    map.insert("B__C".to_string(), series(1, &[Some(-0.002), Some(0.01)]));

    let port = equal_weight_portfolio(&map);
    assert_eq!(port.len(), 3);
    assert!((port.values[0].unwrap() - 0.004).abs() < 1e-15);
    assert!((port.values[1].unwrap() + 0.002).abs() < 1e-15);
    assert!((port.values[2].unwrap() - 0.01).abs() < 1e-15);
}

#[test]
fn test_undefined_days_are_not_zero() {
    let mut map = BTreeMap::new();
    map.insert("A__B".to_string(), series(0, &[Some(0.03), None]));
    map.insert("C__D".to_string(), series(0, &[None, None]));
    let port = equal_weight_portfolio(&map);
    // C__D does not dilute day 0
    assert_eq!(port.values, vec![Some(0.03), None]);
}

#[test]
fn test_merge_rejects_duplicate_labels() {
    let n = 120;
    let dates: Vec<NaiveDate> = (0..n as u64).map(day).collect();
    let x: Vec<Option<f64>> = (0..n)
        .map(|i| Some(30.0 + (i as f64 * 0.1).sin() * 3.0 + i as f64 * 0.02))
        .collect();
    let y: Vec<Option<f64>> = x
        .iter()
        .enumerate()
        .map(|(i, v)| v.map(|v| 2.0 * v + (i as f64 * 0.9).cos()))
        .collect();
    let prices = PriceTable::new(
        dates,
        vec![
            PriceColumn { ticker: "Y".into(), prices: y },
            PriceColumn { ticker: "X".into(), prices: x },
        ],
    )
    .unwrap();
    let candidate = CandidatePair {
        a: "Y".into(),
        b: "X".into(),
        coint_pvalue: 0.02,
    };
    let config = StrategyConfig {
        beta_lookback: 30,
        z_lookback: 10,
        ..StrategyConfig::default()
    };
    let r = analyze_pair(&prices, &candidate, &config).unwrap();

    let merged = merge_pair_results(vec![r.clone()]).unwrap();
    assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["Y__X"]);
    assert!(matches!(
        merge_pair_results(vec![r.clone(), r]),
        Err(StatArbError::DuplicateKey(_))
    ));
}

// ===========================================================================
// PerformanceMetrics
// ===========================================================================

#[test]
fn test_four_equal_positive_days() {
    let r = [Some(0.01), Some(0.01), Some(0.01), Some(0.01)];
    let s = summarize(&r);
    assert_eq!(s.win_rate, Some(1.0));
    assert_eq!(s.max_drawdown, Some(0.0));
    assert_eq!(win_rate(&r), Some(1.0));
    assert_eq!(max_drawdown(&r), Some(0.0));
}

#[test]
fn test_summary_map_names() {
    let s = summarize(&[Some(0.01), Some(-0.02), Some(0.015)]);
    let map = s.to_map();
    assert_eq!(map.len(), 4);
    assert_eq!(map["win_rate"], s.win_rate);
    assert_eq!(map["sharpe"], s.sharpe);
    assert_eq!(map["annualized_return"], s.annualized_return);
    assert_eq!(map["max_drawdown"], s.max_drawdown);
}

#[test]
fn test_equity_and_drawdown_consistency() {
    let values: Vec<Option<f64>> = (0..500)
        .map(|i| {
            if i % 17 == 0 {
                None
            } else {
                Some(0.01 * ((i as f64) * 0.37).sin() + 0.0005)
            }
        })
        .collect();
    let returns = series(0, &values);
    let eq = equity_curve(&returns, 1.0);
    let dd = drawdown_series(&eq);

    assert_eq!(eq.dates, returns.dates);
    assert_eq!(eq.values[0], Some(1.0));

    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for (e, d) in eq.values.iter().zip(&dd.values) {
        let (e, d) = (e.unwrap(), d.unwrap());
        assert!(d <= 0.0);
        if e >= peak {
            peak = e;
            assert_eq!(d, 0.0);
        }
        worst = worst.min(d);
    }
    let mdd = max_drawdown(&values).unwrap();
    assert!((mdd - worst).abs() < 1e-12);
}

#[test]
fn test_wiped_out_equity_has_full_drawdown() {
    for values in [
        vec![Some(-1.0)],
        vec![Some(-1.0), Some(0.01)],
        vec![Some(-1.5), Some(0.1)],
    ] {
        assert_eq!(max_drawdown(&values), Some(-1.0), "{values:?}");
        let dd = drawdown_series(&equity_curve(&series(0, &values), 1.0));
        assert!(
            dd.values.iter().all(|d| *d == Some(-1.0)),
            "{values:?} -> {:?}",
            dd.values
        );
    }
}

#[test]
fn test_drawdown_after_a_loss_below_zero_stays_bounded() {
    // 1.05 -> -0.105 -> 0.0525: the book went through zero
    let values = [Some(0.05), Some(-1.1), Some(-1.5)];
    let dd = drawdown_series(&equity_curve(&series(0, &values), 1.0));
    assert_eq!(dd.values[0], Some(0.0));
    assert_eq!(dd.values[1], Some(-1.0));
    let last = dd.values[2].unwrap();
    assert!((last - (0.0525 / 1.05 - 1.0)).abs() < 1e-12);
    assert!(dd.values.iter().flatten().all(|d| (-1.0..=0.0).contains(d)));
}

#[test]
fn test_undefined_equity_gives_undefined_drawdown() {
    let eq = series(0, &[Some(1.0), None, Some(0.9)]);
    let dd = drawdown_series(&eq);
    assert_eq!(dd.values[1], None);
    assert!((dd.values[2].unwrap() + 0.1).abs() < 1e-12);
}
