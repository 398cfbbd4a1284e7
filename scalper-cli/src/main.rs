//! Scalper CLI: run one decision cycle, validate configs, list presets.
//!
//! Commands:
//! - `evaluate`: load a strategy and two CSV series snapshots, run one cycle,
//!   print the outcome as JSON
//! - `check-config`: validate a TOML config or preset and print its summary
//! - `presets`: list the built-in strategy presets
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); stdout carries only JSON.

mod snapshot;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use scalper_core::domain::{MarketState, Quote, SymbolInfo};
use scalper_core::{DecisionCore, StrategyConfig, StrategyPreset};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::snapshot::load_snapshot;

#[derive(Parser)]
#[command(name = "scalper", about = "Scalper decision core: one cycle at a time")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one decision cycle and print the outcome as JSON.
    Evaluate {
        /// Path to a TOML strategy config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Named preset (see `scalper presets`).
        #[arg(long)]
        preset: Option<String>,

        /// Working-timeframe series snapshot (CSV, oldest bar first).
        #[arg(long)]
        local: PathBuf,

        /// Reference-timeframe series snapshot (CSV, oldest bar first).
        #[arg(long)]
        reference: PathBuf,

        /// Account balance in deposit currency.
        #[arg(long)]
        balance: f64,

        #[arg(long)]
        bid: f64,

        #[arg(long)]
        ask: f64,

        /// Cycle time (RFC 3339). Defaults to now.
        #[arg(long)]
        time: Option<String>,

        #[arg(long, default_value = "EURUSD")]
        symbol: String,

        #[arg(long, default_value_t = 0.0001)]
        pip_size: f64,

        #[arg(long, default_value_t = 1000.0)]
        volume_step: f64,

        /// Defaults to one volume step.
        #[arg(long)]
        min_volume: Option<f64>,

        #[arg(long)]
        max_volume: Option<f64>,

        /// Loss streak carried over from earlier cycles.
        #[arg(long, default_value_t = 1)]
        loss_streak: u32,
    },
    /// Validate a config or preset and print its fingerprint and series needs.
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        preset: Option<String>,
    },
    /// List the built-in strategy presets.
    Presets,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            config,
            preset,
            local,
            reference,
            balance,
            bid,
            ask,
            time,
            symbol,
            pip_size,
            volume_step,
            min_volume,
            max_volume,
            loss_streak,
        } => {
            let config = resolve_config(config.as_deref(), preset.as_deref())?;
            let symbol = SymbolInfo::new(symbol, pip_size, volume_step);
            let bounds = (
                min_volume.unwrap_or(symbol.min_volume),
                max_volume.unwrap_or(symbol.max_volume),
            );
            let symbol = symbol.with_volume_bounds(bounds.0, bounds.1);
            let time = parse_time(time.as_deref())?;
            let market = MarketState {
                time,
                balance,
                quote: Quote::new(bid, ask),
                local: load_snapshot(&local)?,
                reference: load_snapshot(&reference)?,
            };
            run_evaluate(config, symbol, &market, loss_streak)
        }
        Commands::CheckConfig { config, preset } => {
            let config = resolve_config(config.as_deref(), preset.as_deref())?;
            run_check_config(&config)
        }
        Commands::Presets => run_presets(),
    }
}

fn resolve_config(path: Option<&Path>, preset: Option<&str>) -> Result<StrategyConfig> {
    match (path, preset) {
        (Some(_), Some(_)) => bail!("--config and --preset are mutually exclusive"),
        (None, None) => bail!("one of --config or --preset is required"),
        (Some(path), None) => StrategyConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        (None, Some(name)) => {
            let preset: StrategyPreset = name.parse().with_context(|| {
                let valid: Vec<&str> = StrategyPreset::all().iter().map(|p| p.name()).collect();
                format!("valid presets: {}", valid.join(", "))
            })?;
            Ok(preset.to_config())
        }
    }
}

fn parse_time(time: Option<&str>) -> Result<DateTime<Utc>> {
    match time {
        Some(text) => Ok(DateTime::parse_from_rfc3339(text)
            .with_context(|| format!("--time is not RFC 3339: {text}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn run_evaluate(
    config: StrategyConfig,
    symbol: SymbolInfo,
    market: &MarketState,
    loss_streak: u32,
) -> Result<()> {
    let mut core = DecisionCore::new(config, symbol)
        .context("building decision core")?
        .with_loss_streak(loss_streak);
    let outcome = core.evaluate_cycle(market);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn run_check_config(config: &StrategyConfig) -> Result<()> {
    let (local, reference) = config.required_series();
    let summary = serde_json::json!({
        "label": config.label,
        "fingerprint": config.fingerprint()?,
        "timeframe": config.timeframe,
        "reference_timeframe": config.reference_timeframe(),
        "entry": config.entry.name(),
        "exit": config.exit.name(),
        "sizing": config.sizing.name(),
        "local_series": local,
        "reference_series": reference,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_presets() -> Result<()> {
    for preset in StrategyPreset::all() {
        let config = preset.to_config();
        println!(
            "{:<18} label={:<10} timeframe={}",
            preset.name(),
            config.label,
            config.timeframe
        );
    }
    Ok(())
}
