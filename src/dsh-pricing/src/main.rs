//! DSH pricing CLI: quote an order against an incentives snapshot, validate
//! a snapshot, or verify a persisted result against its adjustment trail.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dsh_core::config::LoggingConfig;
use dsh_core::incentives::{IncentiveContext, IncentivesCalculationResult};
use dsh_core::{AppConfig, IncentivesSnapshot};
use dsh_incentives::IncentivesEngine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dsh-pricing")]
#[command(about = "DSH incentives and pricing adjustment engine")]
#[command(version)]
struct Cli {
    /// Incentives snapshot file, TOML or JSON (overrides config)
    #[arg(long, global = true, env = "DSH_PRICING__SNAPSHOT_PATH")]
    snapshot: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply incentives to an order context and print the result
    Quote {
        /// Path to the order context JSON
        #[arg(short, long)]
        context: String,

        /// Pretty-print the result
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Validate a snapshot and print a summary
    Validate,

    /// Replay a persisted result's adjustments against its context
    Replay {
        /// Path to the order context JSON
        #[arg(short, long)]
        context: String,

        /// Path to the calculation result JSON
        #[arg(short, long)]
        result: String,
    },
}

#[derive(Serialize)]
struct SnapshotSummary<'a> {
    version: &'a str,
    service_code: &'a str,
    currency: &'a str,
    active_plans: usize,
    active_rules: usize,
    active_coupons: usize,
    rewards_enabled: bool,
}

#[derive(Serialize)]
struct ReplaySummary {
    verified: bool,
    subtotal: i64,
    delivery_fee: i64,
    total: i64,
    net_discount: i64,
    adjustments: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        AppConfig::default()
    });
    init_tracing(&config.logging);

    if let Some(path) = cli.snapshot {
        config.snapshot_path = path;
    }

    match cli.command {
        Commands::Quote { context, pretty } => cmd_quote(&config, &context, pretty),
        Commands::Validate => cmd_validate(&config),
        Commands::Replay { context, result } => cmd_replay(&context, &result),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.as_str().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_engine(config: &AppConfig) -> anyhow::Result<IncentivesEngine> {
    let snapshot = IncentivesSnapshot::load(&config.snapshot_path)
        .with_context(|| format!("loading snapshot {}", config.snapshot_path))?;
    Ok(IncentivesEngine::new(snapshot))
}

fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

fn cmd_quote(config: &AppConfig, context_path: &str, pretty: bool) -> anyhow::Result<()> {
    let engine = load_engine(config)?;
    let context: IncentiveContext = read_json(context_path)?;
    let result = engine.apply_incentives(&context);

    info!(
        subtotal = result.subtotal.amount,
        delivery_fee = result.delivery_fee.amount,
        total = result.total.amount,
        adjustments = result.adjustments.len(),
        snapshot_version = %result.snapshot_version,
        "Quote computed"
    );
    print_json(&result, pretty)
}

fn cmd_validate(config: &AppConfig) -> anyhow::Result<()> {
    let engine = load_engine(config)?;
    let snapshot = engine.snapshot();
    let summary = SnapshotSummary {
        version: &snapshot.meta.version,
        service_code: &snapshot.meta.service_code,
        currency: &snapshot.meta.currency,
        active_plans: snapshot.subscription_plans.iter().filter(|p| p.active).count(),
        active_rules: snapshot.discount_rules.iter().filter(|r| r.active).count(),
        active_coupons: snapshot.coupons.iter().filter(|c| c.active).count(),
        rewards_enabled: snapshot.rewards_program.enabled
            && snapshot.rewards_program.redemption.enabled,
    };
    print_json(&summary, true)
}

fn cmd_replay(context_path: &str, result_path: &str) -> anyhow::Result<()> {
    let context: IncentiveContext = read_json(context_path)?;
    let result: IncentivesCalculationResult = read_json(result_path)?;

    match dsh_incentives::verify(&context, &result) {
        Ok(totals) => print_json(
            &ReplaySummary {
                verified: true,
                subtotal: totals.subtotal,
                delivery_fee: totals.delivery_fee,
                total: totals.total(),
                net_discount: result.net_discount(),
                adjustments: result.adjustments.len(),
            },
            true,
        ),
        Err(mismatch) => {
            error!(error = %mismatch, "Audit replay failed");
            Err(mismatch.into())
        }
    }
}
