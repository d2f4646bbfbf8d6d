#![deny(warnings)]

//! Round driver: replays a fixed upgrade order on a single farm for a number
//! of rounds and reports the revenue it produced.

use farm_core::{Branch, BranchError, ParseTiersError, Tiers, TierTable};
use farm_econ::{Economy, EconomyError};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Branches to upgrade, applied one tier at a time in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeOrder(Vec<Branch>);

impl UpgradeOrder {
    pub fn new(steps: Vec<Branch>) -> Self {
        Self(steps)
    }

    /// Order reaching `target`: every top tier first, then middle, then
    /// bottom.
    pub fn towards(target: Tiers) -> Self {
        let steps = Branch::ALL
            .into_iter()
            .flat_map(|b| std::iter::repeat(b).take(target.get(b) as usize))
            .collect();
        Self(steps)
    }

    pub fn steps(&self) -> &[Branch] {
        &self.0
    }
}

impl fmt::Display for UpgradeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self.0.iter().map(|b| b.index().to_string()).collect();
        write!(f, "[{}]", steps.join(","))
    }
}

/// Errors parsing an upgrade order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderParseError {
    #[error("invalid branch index {0:?}")]
    NotANumber(String),
    #[error(transparent)]
    Branch(#[from] BranchError),
    #[error(transparent)]
    Tiers(#[from] ParseTiersError),
}

impl FromStr for UpgradeOrder {
    type Err = OrderParseError;

    /// Accepts either a target build (`4-2-0`) or branch indices
    /// (`0,0,0,0,1,1`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('-') {
            return Ok(Self::towards(s.parse()?));
        }
        let mut steps = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let index: usize = part
                .parse()
                .map_err(|_| OrderParseError::NotANumber(part.to_string()))?;
            steps.push(Branch::try_from(index)?);
        }
        Ok(Self(steps))
    }
}

/// Run parameters.
#[derive(Clone, Debug, Serialize)]
pub struct SimConfig {
    /// Number of rounds to simulate.
    pub rounds: u32,
    /// Money available before the first farm is bought.
    pub start_funds: Decimal,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rounds: 100,
            start_funds: Decimal::from(1250),
        }
    }
}

/// An upgrade that landed during a run.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct UpgradeEvent {
    pub round: u32,
    pub branch: Branch,
    pub tiers: Tiers,
}

/// Outcome of replaying one order.
#[derive(Clone, Debug, Serialize)]
pub struct SimReport {
    pub order: String,
    pub rounds: u32,
    pub final_funds: Decimal,
    /// Total money collected across all rounds.
    pub revenue: Decimal,
    pub final_tiers: Tiers,
    pub upgrades: Vec<UpgradeEvent>,
    /// True when every step of the order was applied.
    pub completed: bool,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Economy(#[from] EconomyError),
    #[error("upgrade step {step} (branch {branch}) can never be applied")]
    Stuck {
        step: usize,
        branch: Branch,
        #[source]
        source: EconomyError,
    },
}

/// Buy one farm, then each round apply every pending upgrade that is
/// affordable before collecting the round's income.
///
/// Pending steps wait while they are unaffordable; a step the upgrade rules
/// forbid can never become legal and ends the run with [`RunError::Stuck`].
pub fn run_order(
    table: Arc<TierTable>,
    cfg: &SimConfig,
    order: &UpgradeOrder,
) -> Result<SimReport, RunError> {
    let mut economy = Economy::new(table, cfg.start_funds)?;
    let farm = economy.buy_unit()?;
    let steps = order.steps();
    let mut next = 0;
    let mut upgrades = Vec::with_capacity(steps.len());
    info!(%order, rounds = cfg.rounds, "run started");

    for round in 1..=cfg.rounds {
        while let Some(&branch) = steps.get(next) {
            match economy.upgrade_unit(farm, branch) {
                Ok(()) => {
                    upgrades.push(UpgradeEvent {
                        round,
                        branch,
                        tiers: economy.unit(farm)?.tiers(),
                    });
                    next += 1;
                }
                Err(EconomyError::InsufficientFunds { .. }) => break,
                Err(source) => {
                    return Err(RunError::Stuck {
                        step: next,
                        branch,
                        source,
                    })
                }
            }
        }
        economy.collect_round();
    }

    let report = SimReport {
        order: order.to_string(),
        rounds: cfg.rounds,
        final_funds: economy.funds(),
        revenue: economy.total_collected(),
        final_tiers: economy.unit(farm)?.tiers(),
        upgrades,
        completed: next == steps.len(),
    };
    info!(
        order = %report.order,
        revenue = %report.revenue,
        funds = %report.final_funds,
        tiers = %report.final_tiers,
        "run finished"
    );
    Ok(report)
}

/// Run several orders under the same table and config.
pub fn compare_orders(
    table: Arc<TierTable>,
    cfg: &SimConfig,
    orders: &[UpgradeOrder],
) -> Result<Vec<SimReport>, RunError> {
    orders
        .iter()
        .map(|o| run_order(Arc::clone(&table), cfg, o))
        .collect()
}
