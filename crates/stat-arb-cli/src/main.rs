mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::pairs::{DemoArgs, RunArgs, SelectArgs};
use commands::performance::MetricsArgs;

/// Cointegration pairs trading: selection, backtest and performance
#[derive(Parser)]
#[command(
    name = "statarb",
    version,
    about = "Cointegration pairs selection and backtesting",
    long_about = "Selects cointegrated pairs from a wide daily price CSV (Engle-Granger), \
                  trades each pair on z-score bands of a rolling-OLS spread with one-day \
                  lagged, cost-aware execution, and reports an equal-weight portfolio's \
                  returns, equity curve and summary metrics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log debug detail to stderr
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Select pairs, backtest them and summarise the portfolio
    Run(RunArgs),
    /// Run pair selection only
    Select(SelectArgs),
    /// Performance metrics of an existing date,return series
    Metrics(MetricsArgs),
    /// Full run over a simulated universe of cointegrated pairs and random walks
    Demo(DemoArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// `RUST_LOG` wins when set; otherwise the flags pick the level.
fn init_logging(verbose: bool, debug: bool) {
    let default = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Run(args) => commands::pairs::run_backtest(args),
        Commands::Select(args) => commands::pairs::run_select(args),
        Commands::Metrics(args) => commands::performance::run_metrics(args),
        Commands::Demo(args) => commands::pairs::run_demo(args),
        Commands::Version => {
            println!("statarb {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
