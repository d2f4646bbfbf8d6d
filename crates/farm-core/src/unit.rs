//! The production unit (farm): output rate, unit price and per-round payout
//! for a given tier combination.

use crate::table::TierTable;
use crate::tiers::{Branch, Tiers, UnitError};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Middle tier that boosts the value of each round's output.
const BOOST_TIER: u8 = 2;
/// 1.25x, rounded down.
const BOOST: Decimal = Decimal::from_parts(125, 0, 0, false, 2);
/// Middle tier from which money is banked instead of paid out.
const BANK_TIER: u8 = 3;
/// 15% interest applied to the bank every round.
const INTEREST: Decimal = Decimal::from_parts(115, 0, 0, false, 2);
const BANK_LIMIT: Decimal = Decimal::from_parts(7000, 0, 0, false, 0);
const BANK_LIMIT_UPGRADED: Decimal = Decimal::from_parts(10000, 0, 0, false, 0);
/// Unit price when a bank is paired with exactly one top tier.
const CROSS_PRICE_LOW: Decimal = Decimal::from_parts(45, 0, 0, false, 0);
/// Unit price when a bank is paired with two or more top tiers.
const CROSS_PRICE_HIGH: Decimal = Decimal::from_parts(3875, 0, 0, false, 2);

/// A single farm.
#[derive(Clone, Debug)]
pub struct ProductionUnit {
    table: Arc<TierTable>,
    tiers: Tiers,
    buffer: Decimal,
}

impl ProductionUnit {
    /// A freshly bought farm: tiers 0-0-0 and an empty bank.
    pub fn new(table: Arc<TierTable>) -> Self {
        Self::with_tiers(table, Tiers::default())
    }

    pub fn with_tiers(table: Arc<TierTable>, tiers: Tiers) -> Self {
        Self {
            table,
            tiers,
            buffer: Decimal::ZERO,
        }
    }

    pub fn tiers(&self) -> Tiers {
        self.tiers
    }

    pub fn tier(&self, branch: Branch) -> u8 {
        self.tiers.get(branch)
    }

    /// Money currently held in the bank.
    pub fn buffer(&self) -> Decimal {
        self.buffer
    }

    /// Units produced per round: base rate plus every branch's tier bonus.
    pub fn production_rate(&self) -> u32 {
        let bonus: u32 = Branch::ALL
            .into_iter()
            .map(|b| self.table.rate_bonus(b, self.tier(b)))
            .sum();
        self.table.base_rate + bonus
    }

    /// Money earned per unit of output.
    ///
    /// Only one branch ever raises the price, so the highest table price wins.
    /// A bank combined with top-path tiers uses the fixed cross-path prices
    /// instead.
    pub fn unit_price(&self) -> Decimal {
        let top = self.tier(Branch::Top);
        if self.tier(Branch::Middle) >= BANK_TIER && top > 0 {
            return if top == 1 {
                CROSS_PRICE_LOW
            } else {
                CROSS_PRICE_HIGH
            };
        }
        Branch::ALL
            .into_iter()
            .map(|b| self.table.unit_price(b, self.tier(b)))
            .fold(self.table.base_price, Decimal::max)
    }

    /// Raw value of one round's output, before boost or banking.
    pub fn money_per_round(&self) -> Decimal {
        Decimal::from(self.production_rate()) * self.unit_price()
    }

    /// Advance one round and return the money paid out.
    ///
    /// Banks compound their content and only pay out, in full, on the round
    /// they hit their limit.
    pub fn tick(&mut self) -> Decimal {
        let mpr = self.money_per_round();
        let middle = self.tier(Branch::Middle);
        if middle == BOOST_TIER {
            return (mpr * BOOST).floor();
        }
        if middle >= BANK_TIER {
            let limit = if middle == BANK_TIER {
                BANK_LIMIT
            } else {
                BANK_LIMIT_UPGRADED
            };
            self.buffer = ((self.buffer + mpr) * INTEREST).min(limit);
            if self.buffer == limit {
                debug!(tiers = %self.tiers, %limit, "bank full, paying out");
                self.buffer = Decimal::ZERO;
                return limit;
            }
            return Decimal::ZERO;
        }
        mpr
    }

    /// Advance `branch` by one tier. Costs are handled by the caller.
    pub fn upgrade_branch(&mut self, branch: Branch) -> Result<(), UnitError> {
        self.tiers.advance(branch)?;
        debug!(%branch, tiers = %self.tiers, "farm upgraded");
        Ok(())
    }
}

impl fmt::Display for ProductionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Farm ({}): rate={}, price=${}, per round=${}",
            self.tiers,
            self.production_rate(),
            self.unit_price().normalize(),
            self.money_per_round().normalize()
        )
    }
}
