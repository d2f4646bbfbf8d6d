//! Static tier table: upgrade costs, production-rate bonuses and unit prices
//! for every branch and tier.

use crate::tiers::{Branch, MAX_TIER};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of tiers per branch, including tier 0.
pub const TIER_COUNT: usize = MAX_TIER as usize + 1;

/// Upper bound for the base rate and every per-tier rate bonus.
pub const MAX_RATE: u32 = 1_000_000;

/// Upper bound for every unit price, keeping a round's money far from the
/// decimal range limit.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Per-tier data of one branch, indexed by tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchTiers {
    /// Money required to advance *into* each tier; entry 0 is always zero.
    pub cost: [Decimal; TIER_COUNT],
    /// Extra units per round on top of the base rate.
    pub rate_bonus: [u32; TIER_COUNT],
    /// Price of one unit while the tier is active.
    pub unit_price: [Decimal; TIER_COUNT],
}

/// Complete economic configuration of a farm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    /// Units produced per round by an unupgraded farm.
    pub base_rate: u32,
    /// Price of one unit before any branch raises it.
    pub base_price: Decimal,
    /// Purchase price of a new farm.
    pub unit_cost: Decimal,
    /// Branch data in index order (top, middle, bottom).
    pub branches: [BranchTiers; 3],
}

fn money(values: [i64; TIER_COUNT]) -> [Decimal; TIER_COUNT] {
    values.map(Decimal::from)
}

impl Default for TierTable {
    fn default() -> Self {
        let twenty = Decimal::from(20);
        let bank_price = Decimal::new(575, 1); // 57.5
        Self {
            base_rate: 4,
            base_price: twenty,
            unit_cost: Decimal::from(1250),
            branches: [
                BranchTiers {
                    cost: money([0, 500, 600, 3000, 19000, 100000]),
                    rate_bonus: [0, 2, 4, 12, 1, 1],
                    unit_price: money([20, 20, 20, 20, 300, 1200]),
                },
                BranchTiers {
                    cost: money([0, 300, 800, 3500, 10000, 100000]),
                    rate_bonus: [0; TIER_COUNT],
                    unit_price: [
                        twenty, twenty, twenty, bank_price, bank_price, bank_price,
                    ],
                },
                BranchTiers {
                    cost: money([0, 250, 200, 2900, 15000, 60000]),
                    rate_bonus: [0, 0, 0, 12, 12, 12],
                    unit_price: money([20, 20, 20, 20, 70, 70]),
                },
            ],
        }
    }
}

impl TierTable {
    pub fn branch(&self, branch: Branch) -> &BranchTiers {
        &self.branches[branch.index()]
    }

    /// Cost to advance `branch` into `tier`, or `None` past the last tier.
    pub fn cost(&self, branch: Branch, tier: u8) -> Option<Decimal> {
        self.branch(branch).cost.get(tier as usize).copied()
    }

    pub fn rate_bonus(&self, branch: Branch, tier: u8) -> u32 {
        self.branch(branch)
            .rate_bonus
            .get(tier as usize)
            .copied()
            .unwrap_or(0)
    }

    pub fn unit_price(&self, branch: Branch, tier: u8) -> Decimal {
        self.branch(branch)
            .unit_price
            .get(tier as usize)
            .copied()
            .unwrap_or(self.base_price)
    }
}

/// Tier table validation failures.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    /// Tier 0 is the starting state and must be free.
    #[error("branch {0} has a non-zero cost for tier 0")]
    NonZeroBaseCost(Branch),
    #[error("branch {branch} has a negative cost for tier {tier}")]
    NegativeCost { branch: Branch, tier: usize },
    #[error("branch {branch} has a non-positive unit price for tier {tier}")]
    NonPositivePrice { branch: Branch, tier: usize },
    /// Base price and farm purchase price must be > 0.
    #[error("base price and farm cost must be > 0")]
    NonPositiveBase,
    /// A rate or price is too large to compute a round's income with.
    #[error("{field} exceeds the supported maximum")]
    OutOfRange { field: String },
}

/// Validate a tier table before it is shared with farms.
pub fn validate_table(table: &TierTable) -> Result<(), TableError> {
    if table.base_price <= Decimal::ZERO || table.unit_cost <= Decimal::ZERO {
        return Err(TableError::NonPositiveBase);
    }
    if table.base_rate > MAX_RATE {
        return Err(TableError::OutOfRange {
            field: "base_rate".to_string(),
        });
    }
    if table.base_price > MAX_PRICE {
        return Err(TableError::OutOfRange {
            field: "base_price".to_string(),
        });
    }
    for branch in Branch::ALL {
        let data = table.branch(branch);
        if !data.cost[0].is_zero() {
            return Err(TableError::NonZeroBaseCost(branch));
        }
        if let Some(tier) = data.cost.iter().position(|c| c.is_sign_negative()) {
            return Err(TableError::NegativeCost { branch, tier });
        }
        if let Some(tier) = data.unit_price.iter().position(|p| *p <= Decimal::ZERO) {
            return Err(TableError::NonPositivePrice { branch, tier });
        }
        if let Some(tier) = data.rate_bonus.iter().position(|r| *r > MAX_RATE) {
            return Err(TableError::OutOfRange {
                field: format!("rate_bonus of branch {branch} tier {tier}"),
            });
        }
        if let Some(tier) = data.unit_price.iter().position(|p| *p > MAX_PRICE) {
            return Err(TableError::OutOfRange {
                field: format!("unit_price of branch {branch} tier {tier}"),
            });
        }
    }
    Ok(())
}
