use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;
use tracing::{info, warn};

use stat_arb_core::config::StrategyConfig;
use stat_arb_core::data::PriceTable;
use stat_arb_core::pipeline::{run_pipeline, run_selection};
use stat_arb_core::synthetic::{simulate_prices, SyntheticMarketInput};

use crate::input;
use crate::output::export::write_run_exports;

/// Price universe and strategy overrides shared by `run` and `select`
#[derive(Args)]
pub struct UniverseArgs {
    /// Wide price CSV (`date,<ticker>,...`); read from stdin when omitted
    #[arg(long)]
    pub prices: Option<String>,

    /// Strategy config file (JSON or YAML); `-` reads JSON from stdin
    #[arg(long)]
    pub config: Option<String>,

    /// Comma-separated subset of tickers to consider
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// First date of the analysis window (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date of the analysis window (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Maximum number of pairs to trade
    #[arg(long)]
    pub max_pairs: Option<usize>,
}

/// Arguments for a full selection + backtest run
#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub universe: UniverseArgs,

    /// Directory to write selected_pairs/diagnostics/portfolio/equity CSVs into
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}

/// Arguments for pair selection only
#[derive(Args)]
pub struct SelectArgs {
    #[command(flatten)]
    pub universe: UniverseArgs,
}

/// Arguments for a run over a simulated universe
#[derive(Args)]
pub struct DemoArgs {
    /// Random seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of simulated trading days
    #[arg(long, default_value_t = 1000)]
    pub days: usize,

    /// Strategy config file (JSON or YAML)
    #[arg(long)]
    pub config: Option<String>,

    /// Directory to write the run's CSVs into
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}

pub fn run_backtest(args: RunArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (prices, config) = load_universe(&args.universe)?;
    let output = run_pipeline(&prices, &config)?;
    if let Some(dir) = &args.export_dir {
        let written = write_run_exports(dir, &output.result)?;
        info!(files = written.len(), dir = %dir.display(), "exports written");
    }
    Ok(serde_json::to_value(output)?)
}

pub fn run_select(args: SelectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (prices, config) = load_universe(&args.universe)?;
    let output = run_selection(&prices, &config)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_demo(args: DemoArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => input::file::read_config(path)?,
        None => StrategyConfig::default(),
    };
    let market = SyntheticMarketInput {
        seed: Some(args.seed),
        num_days: args.days,
        start: config.start,
        ..SyntheticMarketInput::default()
    };
    let prices = simulate_prices(&market)?;
    info!(
        tickers = prices.num_tickers(),
        days = prices.len(),
        seed = args.seed,
        "simulated universe"
    );
    let output = run_pipeline(&prices, &config)?;
    if let Some(dir) = &args.export_dir {
        write_run_exports(dir, &output.result)?;
    }
    Ok(serde_json::to_value(output)?)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_universe(
    args: &UniverseArgs,
) -> Result<(PriceTable, StrategyConfig), Box<dyn std::error::Error>> {
    let config_from_stdin = args.config.as_deref() == Some("-");
    let mut config = match args.config.as_deref() {
        Some("-") => input::stdin::read_stdin_config()?
            .ok_or("--config - expects a JSON config on stdin")?,
        Some(path) => input::file::read_config(path)?,
        None => StrategyConfig::default(),
    };
    apply_overrides(&mut config, args);

    let prices = match &args.prices {
        Some(path) => input::file::read_prices(path)?,
        None if config_from_stdin => {
            return Err("--prices is required when the config is read from stdin".into())
        }
        None => input::stdin::read_stdin_prices()?
            .ok_or("Provide --prices or pipe a price CSV via stdin")?,
    };

    let prices = match &args.tickers {
        Some(raw) => {
            let tickers = normalize_tickers(raw);
            if tickers.len() < raw.len() {
                warn!("ignoring empty or repeated tickers in --tickers");
            }
            prices.select(&tickers)?
        }
        None => prices,
    };
    Ok((prices, config))
}

fn apply_overrides(config: &mut StrategyConfig, args: &UniverseArgs) {
    if let Some(start) = args.start {
        config.start = start;
    }
    if args.end.is_some() {
        config.end = args.end;
    }
    if let Some(max_pairs) = args.max_pairs {
        config.max_pairs = max_pairs;
    }
}

/// Trimmed, non-empty, first occurrence kept.
fn normalize_tickers(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for t in raw.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|seen| seen == t) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn universe() -> UniverseArgs {
        UniverseArgs {
            prices: None,
            config: None,
            tickers: None,
            start: None,
            end: None,
            max_pairs: None,
        }
    }

    #[test]
    fn test_overrides_replace_only_given_fields() {
        let mut config = StrategyConfig::default();
        let args = UniverseArgs {
            end: NaiveDate::from_ymd_opt(2022, 6, 30),
            max_pairs: Some(4),
            ..universe()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.max_pairs, 4);
        assert_eq!(config.end, NaiveDate::from_ymd_opt(2022, 6, 30));
        assert_eq!(config.start, StrategyConfig::default().start);
    }

    #[test]
    fn test_normalize_tickers() {
        let raw: Vec<String> = [" KO", "PEP ", "", "KO"].iter().map(|s| s.to_string()).collect();
        assert_eq!(normalize_tickers(&raw), vec!["KO", "PEP"]);
    }
}
