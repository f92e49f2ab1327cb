//! CLI entry point for the allocbook rebalancer.

use std::path::PathBuf;
use std::process;

use allocbook::{Allocation, AllocationMode, OptimizeError, RiskProfile, Timestamp};
use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{info, warn};

use allocbook_rebalancer::audit::{self, AuditLog};
use allocbook_rebalancer::config::Config;
use allocbook_rebalancer::error::Error;
use allocbook_rebalancer::holding::load_holdings;
use allocbook_rebalancer::input::{load_history, load_prices, timestamp_to_date};
use allocbook_rebalancer::plan::{rebalance, RoundingPolicy};
use allocbook_rebalancer::target::TargetAllocation;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Portfolio optimizer and lot-constrained rebalancer")]
#[command(version)]
struct Cli {
    /// Path to config.toml (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute an allocation from a close-price history
    Optimize {
        /// Path to history.json
        history: PathBuf,

        #[arg(long)]
        mode: Option<AllocationMode>,

        #[arg(long)]
        profile: Option<RiskProfile>,

        /// Annualized target return (custom profile)
        #[arg(long)]
        target_return: Option<f64>,

        /// Annualized volatility ceiling (custom profile)
        #[arg(long)]
        max_volatility: Option<f64>,

        /// Write the allocation as JSON
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Plan the trades that move holdings toward a target
    Plan {
        /// Path to holdings.json
        holdings: PathBuf,

        /// Path to target.json
        target: PathBuf,

        /// Path to prices.json
        #[arg(long)]
        prices: PathBuf,

        /// Cash to deploy; negative to withdraw
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        cash: f64,

        #[arg(long)]
        lot_size: Option<u64>,

        #[arg(long)]
        rounding: Option<RoundingPolicy>,

        /// Drift threshold as a fraction
        #[arg(long)]
        threshold: Option<f64>,

        /// Do not append to the audit trail
        #[arg(long)]
        no_audit: bool,
    },

    /// Convert a saved allocation into a target file
    Target {
        /// Path to allocation.json
        allocation: PathBuf,

        #[arg(long, default_value = "target.json")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        if is_precondition(&e) {
            eprintln!("\nRejected: {e:#}");
            process::exit(2);
        }
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Optimize {
            history,
            mode,
            profile,
            target_return,
            max_volatility,
            save,
        } => {
            let mut request = config.optimize_request();
            if let Some(mode) = mode {
                request.mode = mode;
            }
            if let Some(profile) = profile {
                request.profile = profile;
            }
            if target_return.is_some() {
                request.target_return = target_return;
            }
            if max_volatility.is_some() {
                request.max_volatility = max_volatility;
            }

            let series = load_history(&history)?;
            info!(
                "Loaded {} price records for {} symbols",
                series.len(),
                series.symbols().len()
            );
            let allocation = allocbook::optimize(&series, &request, &config.optimizer_config())?;
            if allocation.method.is_fallback() {
                warn!("Allocation used a fallback: {}", allocation.method);
            }

            println!("{allocation}");
            println!(
                "Window: {} to {} ({} observations)",
                format_date(allocation.window.0),
                format_date(allocation.window.1),
                allocation.observations
            );

            if let Some(path) = save {
                allocation
                    .save(&path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!("Saved allocation to {}", path.display());
            }
            audit_allocation(&config, &allocation)?;
        }

        Command::Plan {
            holdings,
            target,
            prices,
            cash,
            lot_size,
            rounding,
            threshold,
            no_audit,
        } => {
            let mut params = config.rebalance_params().with_new_cash(cash);
            if let Some(lot) = lot_size {
                params = params.with_lot_size(lot);
            }
            if let Some(policy) = rounding {
                params = params.with_rounding(policy);
            }
            if let Some(t) = threshold {
                params = params.with_threshold(t);
            }

            let holdings = load_holdings(&holdings)?;
            let target = TargetAllocation::load(&target)?;
            let prices = load_prices(&prices)?;
            info!(
                "Planning {} holdings against {} targets (lot {}, {})",
                holdings.len(),
                target.len(),
                params.lot_size,
                params.rounding
            );

            let plan = rebalance(&holdings, &target, &prices, &params)?;
            print!("{plan}");
            if plan.is_balanced() {
                info!("Portfolio within threshold, no trades");
            }

            if config.logging.audit && !no_audit {
                let mut log = open_audit(&config)?;
                audit::log_plan(&mut log, &plan)?;
            }
        }

        Command::Target { allocation, output } => {
            let allocation = Allocation::load(&allocation)
                .with_context(|| format!("failed to read {}", allocation.display()))?;
            let target = TargetAllocation::from_allocation(&allocation);
            target.validate()?;
            target.save(&output)?;
            info!(
                "Wrote {} target weights to {}",
                target.len(),
                output.display()
            );
        }
    }

    Ok(())
}

fn audit_allocation(config: &Config, allocation: &Allocation) -> anyhow::Result<()> {
    if config.logging.audit {
        let mut log = open_audit(config)?;
        audit::log_allocation(&mut log, allocation)?;
    }
    Ok(())
}

fn open_audit(config: &Config) -> anyhow::Result<AuditLog> {
    let path = config.audit_path();
    AuditLog::open(&path).with_context(|| format!("failed to open audit log {}", path.display()))
}

fn format_date(ts: Timestamp) -> String {
    timestamp_to_date(ts)
        .map(|d| d.to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Bad input rather than an operational failure.
fn is_precondition(e: &anyhow::Error) -> bool {
    if let Some(err) = e.downcast_ref::<Error>() {
        return err.is_precondition();
    }
    matches!(
        e.downcast_ref::<OptimizeError>(),
        Some(OptimizeError::InsufficientData { .. })
    )
}
