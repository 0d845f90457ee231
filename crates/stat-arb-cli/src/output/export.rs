use std::fs;
use std::path::{Path, PathBuf};

use stat_arb_core::data::TimeSeries;
use stat_arb_core::pipeline::PipelineOutput;

/// Write the run's tables as CSV files under `dir`, creating it if needed.
/// Returns the paths written.
pub fn write_run_exports(
    dir: &Path,
    output: &PipelineOutput,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create '{}': {}", dir.display(), e))?;

    let selected = dir.join("selected_pairs.csv");
    let mut wtr = csv::Writer::from_path(&selected)?;
    wtr.write_record(["A", "B", "coint_pvalue"])?;
    for pair in &output.selected_pairs {
        wtr.write_record([pair.a.clone(), pair.b.clone(), pair.coint_pvalue.to_string()])?;
    }
    wtr.flush()?;

    let diagnostics = dir.join("diagnostics.csv");
    let mut wtr = csv::Writer::from_path(&diagnostics)?;
    wtr.write_record(["pair", "coint_pvalue", "adf_pvalue_spread", "n_days"])?;
    for d in &output.diagnostics {
        wtr.write_record([
            d.pair.clone(),
            d.coint_pvalue.to_string(),
            format_optional(d.adf_pvalue_spread),
            d.n_days.to_string(),
        ])?;
    }
    wtr.flush()?;

    let portfolio = dir.join("portfolio_returns.csv");
    write_series(&portfolio, "portfolio_ret", &output.portfolio_returns)?;

    let equity = dir.join("equity_curve.csv");
    write_series(&equity, "equity", &output.equity_curve)?;

    Ok(vec![selected, diagnostics, portfolio, equity])
}

/// Two-column `date,<name>` CSV; undefined values are blank.
pub fn write_series(
    path: &Path,
    name: &str,
    series: &TimeSeries,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    wtr.write_record(["date", name])?;
    for (date, value) in series.iter() {
        wtr.write_record([date.format("%Y-%m-%d").to_string(), format_optional(value)])?;
    }
    wtr.flush()?;
    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
