use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::data::TimeSeries;
use crate::pairs::analysis::PairResult;
use crate::types::PairLabel;
use crate::{StatArbError, StatArbResult};

/// Key independently computed pair results by label.
///
/// Iteration order of the returned map is label order, whatever order the
/// results arrived in. A repeated label is an error.
pub fn merge_pair_results(
    results: Vec<PairResult>,
) -> StatArbResult<BTreeMap<PairLabel, PairResult>> {
    let mut merged = BTreeMap::new();
    for result in results {
        let label = result.label.clone();
        if merged.insert(label.clone(), result).is_some() {
            return Err(StatArbError::DuplicateKey(format!(
                "Pair {label} produced more than one result"
            )));
        }
    }
    Ok(merged)
}

/// Net-return series of each merged pair.
pub fn net_returns(results: &BTreeMap<PairLabel, PairResult>) -> BTreeMap<PairLabel, TimeSeries> {
    results
        .iter()
        .map(|(label, r)| (label.clone(), r.net_return().clone()))
        .collect()
}

/// Equal-weight portfolio over the union of all dates.
///
/// Each date averages only the pairs defined on it; a date where no pair is
/// defined is undefined.
pub fn equal_weight_portfolio(returns: &BTreeMap<PairLabel, TimeSeries>) -> TimeSeries {
    let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for series in returns.values() {
        for (date, value) in series.iter() {
            let slot = by_date.entry(date).or_insert((0.0, 0));
            if let Some(v) = value {
                slot.0 += v;
                slot.1 += 1;
            }
        }
    }

    let dates: Vec<NaiveDate> = by_date.keys().copied().collect();
    let values: Vec<Option<f64>> = by_date
        .values()
        .map(|&(sum, count)| (count > 0).then(|| sum / count as f64))
        .collect();
    info!(
        pairs = returns.len(),
        days = dates.len(),
        "equal-weight portfolio built"
    );
    TimeSeries::aligned(&dates, values)
}
