#![deny(warnings)]

//! Headless CLI comparing the revenue of farm upgrade orders.

use anyhow::{Context, Result};
use farm_core::{validate_table, TierTable};
use farm_runtime::{compare_orders, SimConfig, UpgradeOrder};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const DEFAULT_ORDERS: [&str; 2] = ["4-2-0", "2-4-0"];

#[derive(Debug, Default)]
struct Args {
    rounds: Option<u32>,
    start_money: Option<Decimal>,
    orders: Vec<String>,
    table: Option<PathBuf>,
    json: bool,
    version: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(raw: I) -> Result<Args> {
    let mut args = Args::default();
    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--rounds" => {
                let v = it.next().context("--rounds needs a value")?;
                args.rounds = Some(v.parse().with_context(|| format!("bad --rounds {v:?}"))?);
            }
            "--start-money" => {
                let v = it.next().context("--start-money needs a value")?;
                args.start_money =
                    Some(v.parse().with_context(|| format!("bad --start-money {v:?}"))?);
            }
            "--order" => args.orders.push(it.next().context("--order needs a value")?),
            "--table" => {
                args.table = Some(PathBuf::from(
                    it.next().context("--table needs a value")?,
                ))
            }
            "--json" => args.json = true,
            "--version" => args.version = true,
            _ => {}
        }
    }
    Ok(args)
}

fn load_table(path: Option<&PathBuf>) -> Result<TierTable> {
    let Some(path) = path else {
        return Ok(TierTable::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading tier table {}", path.display()))?;
    let table: TierTable = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing tier table {}", path.display()))?;
    validate_table(&table)?;
    Ok(table)
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::DEBUG)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.version {
        println!("farm-cli {} ({})", env!("CARGO_PKG_VERSION"), env!("FARM_GIT_REV"));
        return Ok(());
    }
    info!(?args, "starting CLI");

    let table = Arc::new(load_table(args.table.as_ref())?);
    let defaults = SimConfig::default();
    let cfg = SimConfig {
        rounds: args.rounds.unwrap_or(defaults.rounds),
        start_funds: args.start_money.unwrap_or(defaults.start_funds),
    };
    let specs: Vec<String> = if args.orders.is_empty() {
        DEFAULT_ORDERS.iter().map(|s| s.to_string()).collect()
    } else {
        args.orders
    };
    let orders = specs
        .iter()
        .map(|s| {
            s.parse::<UpgradeOrder>()
                .with_context(|| format!("bad --order {s:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let reports = compare_orders(table, &cfg, &orders)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }
    for ((spec, order), r) in specs.iter().zip(&orders).zip(&reports) {
        println!(
            "KPI | order: {} {} | rounds: {} | revenue: ${} | funds: ${} | tiers: {} | upgrades: {}/{}{}",
            spec,
            r.order,
            r.rounds,
            r.revenue.normalize(),
            r.final_funds.normalize(),
            r.final_tiers,
            r.upgrades.len(),
            order.steps().len(),
            if r.completed { "" } else { " (incomplete)" }
        );
    }
    if let Some(best) = reports.iter().zip(&specs).max_by_key(|(r, _)| r.revenue) {
        println!("Best: {} with ${}", best.1, best.0.revenue.normalize());
    }

    Ok(())
}
