use std::time::Instant;

use clap::Args;
use serde::Serialize;
use serde_json::{json, Value};

use stat_arb_core::data::TimeSeries;
use stat_arb_core::portfolio::metrics::{equity_curve, summarize, PerformanceSummary};
use stat_arb_core::types::{with_metadata, TRADING_DAYS};

use crate::input;

/// Arguments for summarising an existing return series
#[derive(Args)]
pub struct MetricsArgs {
    /// `date,return` CSV (e.g. an exported portfolio_returns.csv); read from stdin when omitted
    #[arg(long)]
    pub returns: Option<String>,
}

#[derive(Debug, Serialize)]
struct MetricsOutput {
    #[serde(flatten)]
    summary: PerformanceSummary,
    num_periods: usize,
    num_defined: usize,
    final_equity: Option<f64>,
}

pub fn run_metrics(args: MetricsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let series = match &args.returns {
        Some(path) => input::file::read_returns(path)?,
        None => match input::stdin::read_stdin_text()? {
            Some(text) => input::file::parse_returns(text.as_bytes())?,
            None => return Err("Provide --returns or pipe a date,return CSV via stdin".into()),
        },
    };
    let start = Instant::now();
    let output = summarise_series(&series);
    let warnings = if output.num_defined == 0 {
        vec!["Return series has no defined values".to_string()]
    } else {
        Vec::new()
    };
    let elapsed = start.elapsed().as_micros() as u64;
    let wrapped = with_metadata(
        "Geometric annualisation, sample-std Sharpe (zero risk-free rate), drawdown from the first equity point",
        &json!({ "trading_days": TRADING_DAYS, "equity_start": 1.0 }),
        warnings,
        elapsed,
        output,
    );
    Ok(serde_json::to_value(wrapped)?)
}

fn summarise_series(series: &TimeSeries) -> MetricsOutput {
    let equity = equity_curve(series, 1.0);
    MetricsOutput {
        summary: summarize(&series.values),
        num_periods: series.len(),
        num_defined: series.defined_count(),
        final_equity: equity.last().and_then(|(_, v)| v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_summarise_series() {
        let d0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = d0.iter_days().take(5).collect();
        let series =
            TimeSeries::new(dates, vec![None, Some(0.01), Some(0.01), Some(0.01), Some(0.01)])
                .unwrap();
        let out = summarise_series(&series);
        assert_eq!(out.num_periods, 5);
        assert_eq!(out.num_defined, 4);
        assert!((out.final_equity.unwrap() - 1.01f64.powi(4)).abs() < 1e-12);
        assert_eq!(out.summary.sharpe, None);
        assert_eq!(out.summary.max_drawdown, Some(0.0));

        let json = serde_json::to_value(&out).unwrap();
        assert!(json["sharpe"].is_null());
        assert_eq!(json["win_rate"], 1.0);
    }
}
