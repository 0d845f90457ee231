use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use stat_arb_core::config::StrategyConfig;
use stat_arb_core::data::{PriceColumn, PriceTable, TimeSeries};

/// Load a strategy config. `.yaml` / `.yml` files are read as YAML,
/// anything else as JSON. Missing fields take their defaults.
pub fn read_config(path: &str) -> Result<StrategyConfig, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let is_yaml = matches!(
        canonical.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let config: StrategyConfig = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(config)
}

/// Load a wide price CSV (`date,<ticker>,...`).
pub fn read_prices(path: &str) -> Result<PriceTable, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = fs::File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_prices(file).map_err(|e| format!("'{}': {}", canonical.display(), e).into())
}

/// Load a `date,return` CSV.
pub fn read_returns(path: &str) -> Result<TimeSeries, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = fs::File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_returns(file).map_err(|e| format!("'{}': {}", canonical.display(), e).into())
}

/// Parse a wide price CSV. Blank, `NaN` and non-numeric cells are missing.
pub fn parse_prices<R: Read>(reader: R) -> Result<PriceTable, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    if headers.len() < 2 {
        return Err("Price CSV needs a date column and at least one ticker column".into());
    }
    let tickers: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut dates = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); tickers.len()];
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let raw = record.get(0).unwrap_or_default();
        dates.push(parse_date(raw).map_err(|e| format!("row {}: {}", line + 2, e))?);
        for (i, col) in columns.iter_mut().enumerate() {
            col.push(record.get(i + 1).and_then(parse_cell));
        }
    }

    let columns = tickers
        .into_iter()
        .zip(columns)
        .map(|(ticker, prices)| PriceColumn { ticker, prices })
        .collect();
    Ok(PriceTable::new(dates, columns)?)
}

/// Parse a two-column `date,return` CSV. Later rows win on repeated dates.
pub fn parse_returns<R: Read>(reader: R) -> Result<TimeSeries, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut rows: BTreeMap<NaiveDate, Option<f64>> = BTreeMap::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let date = parse_date(record.get(0).unwrap_or_default())
            .map_err(|e| format!("row {}: {}", line + 2, e))?;
        rows.insert(date, record.get(1).and_then(parse_cell));
    }
    let (dates, values) = rows.into_iter().unzip();
    Ok(TimeSeries::new(dates, values)?)
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("invalid date '{raw}': {e}"))
}

fn parse_cell(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Resolve and validate the path, preventing directory traversal.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
