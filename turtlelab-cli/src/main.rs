//! TurtleLab CLI — Turtle breakout backtests from the command line.
//!
//! Commands:
//! - `run` — execute one backtest from a TOML config and/or flags, write artifacts
//! - `sweep` — backtest a grid of breakout lookbacks and stop distances, print a ranking
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use turtlelab_core::domain::Side;
use turtlelab_core::engine::Outcome;
use turtlelab_runner::data_loader::load;
use turtlelab_runner::sweep::{ranked, run_sweep, ParamGrid, SweepRow};
use turtlelab_runner::{run_single, save_artifacts, BacktestResult, RunConfig};

#[derive(Parser)]
#[command(
    name = "turtlelab",
    version,
    about = "TurtleLab CLI — Turtle breakout backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest and write trades, equity, round trips and a manifest.
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        overrides: Overrides,

        /// Output directory. Defaults to run.output_dir from the config.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Backtest every fast/slow/stop combination and rank by Sharpe.
    Sweep {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        overrides: Overrides,

        /// Fast breakout lookbacks.
        #[arg(long, value_delimiter = ',', default_values_t = [10, 20, 30])]
        fast: Vec<usize>,

        /// Slow breakout lookbacks.
        #[arg(long, value_delimiter = ',', default_values_t = [40, 55, 80])]
        slow: Vec<usize>,

        /// Stop distances in multiples of N.
        #[arg(long, value_delimiter = ',', default_values_t = [1.5, 2.0, 2.5, 3.0])]
        stops: Vec<f64>,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

/// Where the bars come from.
#[derive(Args)]
struct SourceArgs {
    /// TOML config file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV with columns timestamp,open,high,low,close,volume.
    #[arg(long, conflicts_with = "synthetic")]
    csv: Option<PathBuf>,

    /// Generate this many synthetic 4h bars instead of reading a CSV.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for --synthetic.
    #[arg(long)]
    seed: Option<u64>,

    /// Instrument label for reports.
    #[arg(long)]
    symbol: Option<String>,
}

/// Strategy parameters that can be set from the command line.
#[derive(Args)]
struct Overrides {
    /// Starting capital.
    #[arg(long)]
    initial: Option<f64>,

    /// Percent of equity risked per unit.
    #[arg(long)]
    risk_pct: Option<f64>,

    /// Maximum notional as a multiple of equity.
    #[arg(long)]
    leverage: Option<f64>,

    /// Units per position.
    #[arg(long)]
    max_units: Option<usize>,

    /// Taker fee rate (fraction of notional).
    #[arg(long)]
    taker_fee: Option<f64>,

    /// Maker fee rate (fraction of notional).
    #[arg(long)]
    maker_fee: Option<f64>,

    /// Slippage in basis points.
    #[arg(long)]
    slippage_bps: Option<f64>,

    /// Trade long breakouts only.
    #[arg(long, conflicts_with = "allow_short")]
    long_only: bool,

    /// Trade both directions.
    #[arg(long)]
    allow_short: bool,

    /// Take every fast breakout, even after a winning one.
    #[arg(long)]
    no_skip_after_win: bool,

    /// Minimum order quantity.
    #[arg(long)]
    min_qty: Option<f64>,

    /// Quantity step; orders are floored to a multiple of it.
    #[arg(long)]
    step_size: Option<f64>,

    /// Minimum order notional.
    #[arg(long)]
    min_notional: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            overrides,
            output,
        } => run_cmd(&source, &overrides, output),
        Commands::Sweep {
            source,
            overrides,
            fast,
            slow,
            stops,
            top,
        } => {
            let grid = ParamGrid {
                fast_lens: fast,
                slow_lens: slow,
                stop_multiples: stops,
            };
            sweep_cmd(&source, &overrides, &grid, top)
        }
    }
}

/// Config file (or defaults) with command-line flags applied on top.
fn build_config(source: &SourceArgs, overrides: &Overrides) -> Result<RunConfig> {
    let mut config = match &source.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunConfig::default(),
    };

    if let Some(csv) = &source.csv {
        config.run.csv = Some(csv.clone());
    }
    if let Some(bars) = source.synthetic {
        config.run.csv = None;
        config.run.synthetic_bars = Some(bars);
    }
    if let Some(seed) = source.seed {
        config.run.seed = seed;
    }
    if let Some(symbol) = &source.symbol {
        config.run.symbol = symbol.clone();
    }

    let s = &mut config.strategy;
    if let Some(v) = overrides.initial {
        s.initial_capital = v;
    }
    if let Some(v) = overrides.risk_pct {
        s.risk.risk_pct = v;
    }
    if let Some(v) = overrides.leverage {
        s.risk.leverage = v;
    }
    if let Some(v) = overrides.max_units {
        s.risk.max_units = v;
    }
    if let Some(v) = overrides.taker_fee {
        s.costs.taker_fee = v;
    }
    if let Some(v) = overrides.maker_fee {
        s.costs.maker_fee = v;
    }
    if let Some(v) = overrides.slippage_bps {
        s.costs.slippage_bps = v;
    }
    if overrides.long_only {
        s.rules.allow_short = false;
    }
    if overrides.allow_short {
        s.rules.allow_short = true;
    }
    if overrides.no_skip_after_win {
        s.rules.skip_after_win = false;
    }
    if let Some(v) = overrides.min_qty {
        s.exchange.min_qty = v;
    }
    if let Some(v) = overrides.step_size {
        s.exchange.step_size = v;
    }
    if let Some(v) = overrides.min_notional {
        s.exchange.min_notional = v;
    }

    config
        .strategy
        .validate()
        .context("invalid strategy parameters")?;
    Ok(config)
}

fn run_cmd(source: &SourceArgs, overrides: &Overrides, output: Option<PathBuf>) -> Result<()> {
    let config = build_config(source, overrides)?;
    let result = run_single(&config)?;

    print_summary(&result);

    let output_dir = output.unwrap_or_else(|| config.run.output_dir.clone());
    let run_dir = save_artifacts(&result, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn sweep_cmd(source: &SourceArgs, overrides: &Overrides, grid: &ParamGrid, top: usize) -> Result<()> {
    let config = build_config(source, overrides)?;
    let data = load(&config.data_source()?)?;
    info!(grid = grid.size(), symbol = %config.run.symbol, "sweeping");

    let rows = run_sweep(grid, &config.strategy, &data.bars)?;
    print_sweep(&rows, top);
    if data.synthetic {
        println!("WARNING: Results based on SYNTHETIC data");
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.report.metrics;
    let first = result.report.equity_curve.first();
    let last = result.report.equity_curve.last();

    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    if let (Some(first), Some(last)) = (first, last) {
        println!("Period:         {} to {}", first.timestamp, last.timestamp);
    }
    println!(
        "Bars:           {} ({} ready)",
        result.bar_count, result.report.ready_bars
    );
    println!("Fills:          {}", result.report.trades.len());
    println!("Round Trips:    {}", m.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {:.2}", m.final_equity);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    match m.profit_factor {
        Some(pf) => println!("Profit Factor:  {pf:.2}"),
        None => println!("Profit Factor:  n/a (no losing trades)"),
    }
    println!(
        "Gross P/L:      +{:.2} / -{:.2}",
        m.gross_profit, m.gross_loss
    );
    let memory = &result.report.memory;
    println!(
        "Last Fast:      long {}, short {}",
        outcome_label(memory.last(Side::Long)),
        outcome_label(memory.last(Side::Short))
    );
    if result.report.open_at_end {
        println!("Note: position still open at the last bar (marked to market)");
    }
    if result.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn outcome_label(outcome: Option<Outcome>) -> &'static str {
    match outcome {
        Some(Outcome::Win) => "win",
        Some(Outcome::Loss) => "loss",
        None => "-",
    }
}

fn print_sweep(rows: &[SweepRow], top: usize) {
    println!();
    println!(
        "{:>4} {:>5} {:>5} {:>5} {:>9} {:>8} {:>8} {:>7} {:>6}",
        "#", "fast", "slow", "stop", "return%", "sharpe", "maxdd%", "trades", "fills"
    );
    println!("{}", "-".repeat(66));
    for (rank, row) in ranked(rows).into_iter().take(top).enumerate() {
        let m = &row.metrics;
        println!(
            "{:>4} {:>5} {:>5} {:>5.1} {:>9.2} {:>8.3} {:>8.2} {:>7} {:>6}",
            rank + 1,
            row.fast_len,
            row.slow_len,
            row.stop_multiple,
            m.total_return * 100.0,
            m.sharpe,
            m.max_drawdown * 100.0,
            m.trade_count,
            row.fills
        );
    }
    println!();
}
