#![deny(warnings)]

//! Portfolio economy: global funds, owned farms, and the gated purchase and
//! upgrade operations a driver uses to advance a run.
//!
//! All income flows through [`Economy::collect_round`]. Every gated operation
//! either succeeds completely or returns an error with funds and farms left
//! exactly as they were.

use farm_core::{
    check_upgrade, validate_table, Branch, ProductionUnit, TableError, Tiers, TierTable,
    UnitError, EXCLUSIVE_TIER, MAX_TIER,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors produced by economy operations.
#[derive(Debug, Error, PartialEq)]
pub enum EconomyError {
    /// A purchase or upgrade costs more than the current funds.
    #[error("insufficient funds: need ${needed}, have ${available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },
    /// The branch is not upgradable on this farm at its current tiers.
    #[error("branch {branch} cannot be upgraded on farm {unit} at {tiers}")]
    IllegalUpgradeRequest {
        unit: usize,
        branch: Branch,
        tiers: Tiers,
    },
    #[error("no farm with index {0}")]
    UnknownUnit(usize),
    /// Starting funds must be non-negative.
    #[error("negative starting funds: {0}")]
    NegativeFunds(Decimal),
    #[error(transparent)]
    InvalidTable(#[from] TableError),
    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// Branches the ranking policy allows to advance, ignoring funds.
///
/// Branches are ranked by tier, highest first (ties by index):
/// - the highest may advance until tier 5;
/// - the second may advance while the highest is below tier 3, or while
///   the second itself is below tier 2;
/// - the lowest may advance only while the second is still at tier 0.
///
/// Every candidate is also checked against [`check_upgrade`] so this policy
/// can never allow what a farm would refuse.
pub fn tier_legal_branches(tiers: Tiers) -> Vec<Branch> {
    let [first, second, lowest] = tiers.ranked();
    let (t_first, t_second) = (tiers.get(first), tiers.get(second));

    let mut legal = Vec::with_capacity(3);
    if t_first < MAX_TIER {
        legal.push(first);
    }
    if t_first < EXCLUSIVE_TIER || t_second < EXCLUSIVE_TIER - 1 {
        legal.push(second);
    }
    if t_second == 0 {
        legal.push(lowest);
    }
    legal.retain(|&b| check_upgrade(tiers, b).is_ok());
    legal.sort();
    legal
}

/// Funds and farms of a single player.
#[derive(Clone, Debug)]
pub struct Economy {
    table: Arc<TierTable>,
    funds: Decimal,
    units: Vec<ProductionUnit>,
    collected: Decimal,
}

impl Economy {
    /// Create an economy after validating the table and starting funds.
    pub fn new(table: Arc<TierTable>, start_funds: Decimal) -> Result<Self, EconomyError> {
        validate_table(&table)?;
        if start_funds < Decimal::ZERO {
            return Err(EconomyError::NegativeFunds(start_funds));
        }
        Ok(Self {
            table,
            funds: start_funds,
            units: Vec::new(),
            collected: Decimal::ZERO,
        })
    }

    pub fn with_default_table(start_funds: Decimal) -> Result<Self, EconomyError> {
        Self::new(Arc::new(TierTable::default()), start_funds)
    }

    pub fn funds(&self) -> Decimal {
        self.funds
    }

    /// Farms in purchase order.
    pub fn units(&self) -> &[ProductionUnit] {
        &self.units
    }

    pub fn unit(&self, index: usize) -> Result<&ProductionUnit, EconomyError> {
        self.units.get(index).ok_or(EconomyError::UnknownUnit(index))
    }

    /// Sum of every payout collected so far.
    pub fn total_collected(&self) -> Decimal {
        self.collected
    }

    pub fn funds_available(&self, amount: Decimal) -> bool {
        self.funds >= amount
    }

    pub fn can_buy_unit(&self) -> bool {
        self.funds_available(self.table.unit_cost)
    }

    /// Buy a new 0-0-0 farm and return its index.
    pub fn buy_unit(&mut self) -> Result<usize, EconomyError> {
        let cost = self.table.unit_cost;
        if !self.can_buy_unit() {
            return Err(EconomyError::InsufficientFunds {
                needed: cost,
                available: self.funds,
            });
        }
        self.funds -= cost;
        self.units.push(ProductionUnit::new(Arc::clone(&self.table)));
        let index = self.units.len() - 1;
        debug!(index, %cost, funds = %self.funds, "farm bought");
        Ok(index)
    }

    /// Cost of the next tier of `branch` on `unit`, `None` at tier 5.
    pub fn next_tier_cost(&self, unit: &ProductionUnit, branch: Branch) -> Option<Decimal> {
        self.table.cost(branch, unit.tier(branch) + 1)
    }

    /// Branches of `unit` that are legal to upgrade and affordable right now,
    /// sorted by index.
    pub fn get_upgradable_branches(&self, unit: &ProductionUnit) -> Vec<Branch> {
        tier_legal_branches(unit.tiers())
            .into_iter()
            .filter(|&b| {
                self.next_tier_cost(unit, b)
                    .is_some_and(|cost| self.funds_available(cost))
            })
            .collect()
    }

    /// [`Economy::get_upgradable_branches`] for the farm at `index`.
    pub fn upgradable_branches_of(&self, index: usize) -> Result<Vec<Branch>, EconomyError> {
        Ok(self.get_upgradable_branches(self.unit(index)?))
    }

    /// Pay for and apply one tier of `branch` on the farm at `index`.
    ///
    /// A branch the ranking policy forbids is an
    /// [`EconomyError::IllegalUpgradeRequest`]; a legal but unaffordable one
    /// is [`EconomyError::InsufficientFunds`].
    pub fn upgrade_unit(&mut self, index: usize, branch: Branch) -> Result<(), EconomyError> {
        let tiers = self.unit(index)?.tiers();
        if !tier_legal_branches(tiers).contains(&branch) {
            return Err(EconomyError::IllegalUpgradeRequest {
                unit: index,
                branch,
                tiers,
            });
        }
        let cost = self
            .table
            .cost(branch, tiers.get(branch) + 1)
            .ok_or(UnitError::TierExceeded(branch))?;
        if !self.funds_available(cost) {
            return Err(EconomyError::InsufficientFunds {
                needed: cost,
                available: self.funds,
            });
        }
        self.units[index].upgrade_branch(branch)?;
        self.funds -= cost;
        debug!(index, %branch, %cost, funds = %self.funds, "upgrade bought");
        Ok(())
    }

    /// Tick every farm in purchase order, credit the total and return it.
    pub fn collect_round(&mut self) -> Decimal {
        let income: Decimal = self.units.iter_mut().map(ProductionUnit::tick).sum();
        self.funds += income;
        self.collected += income;
        debug!(%income, funds = %self.funds, "round collected");
        income
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_core::{MAX_PRICE, MAX_RATE, TIER_COUNT};
    use proptest::prelude::*;

    fn money(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn tiers(levels: [u8; 3]) -> Tiers {
        Tiers::from_levels(levels).unwrap()
    }

    fn rich() -> Economy {
        Economy::with_default_table(money(1_000_000)).unwrap()
    }

    fn unit_at(levels: [u8; 3]) -> ProductionUnit {
        ProductionUnit::with_tiers(Arc::new(TierTable::default()), tiers(levels))
    }

    #[test]
    fn buying_deducts_and_appends() {
        let mut eco = Economy::with_default_table(money(2600)).unwrap();
        assert!(eco.can_buy_unit());
        assert_eq!(eco.buy_unit(), Ok(0));
        assert_eq!(eco.buy_unit(), Ok(1));
        assert_eq!(eco.funds(), money(100));
        assert_eq!(eco.units().len(), 2);
        assert_eq!(eco.units()[1].tiers(), Tiers::default());

        assert_eq!(
            eco.buy_unit(),
            Err(EconomyError::InsufficientFunds {
                needed: money(1250),
                available: money(100),
            })
        );
        assert_eq!(eco.funds(), money(100));
        assert_eq!(eco.units().len(), 2);
    }

    #[test]
    fn rejects_negative_start_and_bad_table() {
        assert!(matches!(
            Economy::with_default_table(money(-1)),
            Err(EconomyError::NegativeFunds(_))
        ));
        let mut table = TierTable::default();
        table.branches[0].cost[0] = money(5);
        assert!(matches!(
            Economy::new(Arc::new(table), money(0)),
            Err(EconomyError::InvalidTable(_))
        ));
    }

    #[test]
    fn oversized_table_is_refused_up_front() {
        let mut table = TierTable::default();
        table.branches[0].rate_bonus[1] = u32::MAX;
        assert!(matches!(
            Economy::new(Arc::new(table), money(1_000_000)),
            Err(EconomyError::InvalidTable(TableError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn largest_accepted_table_collects_without_overflow() {
        let mut table = TierTable::default();
        table.base_rate = MAX_RATE;
        for b in &mut table.branches {
            b.rate_bonus = [MAX_RATE; TIER_COUNT];
            b.unit_price = [MAX_PRICE; TIER_COUNT];
        }
        let mut eco = Economy::new(Arc::new(table), money(1_000_000)).unwrap();
        let farm = eco.buy_unit().unwrap();
        eco.upgrade_unit(farm, Branch::Top).unwrap();
        eco.upgrade_unit(farm, Branch::Bottom).unwrap();
        // Base rate plus three bonuses of 1e6 units, at 1e9 each.
        let expected = Decimal::from(4_000_000_000_000_000i64);
        assert_eq!(eco.collect_round(), expected);
        assert_eq!(eco.collect_round(), expected);
    }

    #[test]
    fn upgradable_branches_by_index() {
        let mut eco = Economy::with_default_table(money(1250 + 300)).unwrap();
        let farm = eco.buy_unit().unwrap();
        assert_eq!(
            eco.upgradable_branches_of(farm),
            Ok(vec![Branch::Middle, Branch::Bottom])
        );
        assert_eq!(
            eco.upgradable_branches_of(farm),
            Ok(eco.get_upgradable_branches(&eco.units()[farm]))
        );
        assert_eq!(eco.upgradable_branches_of(3), Err(EconomyError::UnknownUnit(3)));
    }

    #[test]
    fn fresh_farm_offers_every_branch() {
        let eco = rich();
        let all = vec![Branch::Top, Branch::Middle, Branch::Bottom];
        assert_eq!(eco.get_upgradable_branches(&unit_at([0, 0, 0])), all);
        assert_eq!(eco.get_upgradable_branches(&unit_at([3, 0, 0])), all);
    }

    #[test]
    fn lowest_branch_locks_once_second_invests() {
        use Branch::*;
        let eco = rich();
        assert_eq!(eco.get_upgradable_branches(&unit_at([3, 1, 0])), vec![Top, Middle]);
        assert_eq!(eco.get_upgradable_branches(&unit_at([1, 0, 1])), vec![Top, Bottom]);
        assert_eq!(eco.get_upgradable_branches(&unit_at([2, 2, 0])), vec![Top, Middle]);
        assert_eq!(eco.get_upgradable_branches(&unit_at([0, 4, 1])), vec![Middle, Bottom]);
    }

    #[test]
    fn second_branch_stops_at_two_behind_an_advanced_one() {
        use Branch::*;
        let eco = rich();
        assert_eq!(eco.get_upgradable_branches(&unit_at([3, 2, 0])), vec![Top]);
        assert!(eco.get_upgradable_branches(&unit_at([0, 2, 5])).is_empty());
        assert_eq!(eco.get_upgradable_branches(&unit_at([5, 1, 0])), vec![Middle]);
        assert_eq!(eco.get_upgradable_branches(&unit_at([5, 0, 0])), vec![Middle, Bottom]);
    }

    #[test]
    fn affordability_filters_candidates() {
        let eco = Economy::with_default_table(money(300)).unwrap();
        // Next costs: top 500, middle 300, bottom 250.
        assert_eq!(
            eco.get_upgradable_branches(&unit_at([0, 0, 0])),
            vec![Branch::Middle, Branch::Bottom]
        );
        let eco = Economy::with_default_table(money(0)).unwrap();
        assert!(eco.get_upgradable_branches(&unit_at([0, 0, 0])).is_empty());
    }

    #[test]
    fn upgrade_deducts_next_tier_cost() {
        let mut eco = Economy::with_default_table(money(1250 + 500 + 600)).unwrap();
        let farm = eco.buy_unit().unwrap();
        eco.upgrade_unit(farm, Branch::Top).unwrap();
        assert_eq!(eco.funds(), money(600));
        eco.upgrade_unit(farm, Branch::Top).unwrap();
        assert_eq!(eco.funds(), money(0));
        assert_eq!(eco.unit(farm).unwrap().tiers().levels(), [2, 0, 0]);
    }

    #[test]
    fn failed_upgrades_change_nothing() {
        let mut eco = Economy::with_default_table(money(1250 + 500)).unwrap();
        let farm = eco.buy_unit().unwrap();

        assert_eq!(eco.upgrade_unit(farm, Branch::Middle), Ok(()));
        assert_eq!(eco.funds(), money(200));
        assert!(matches!(
            eco.upgrade_unit(farm, Branch::Top),
            Err(EconomyError::InsufficientFunds { .. })
        ));
        assert_eq!(
            eco.upgrade_unit(7, Branch::Top),
            Err(EconomyError::UnknownUnit(7))
        );
        assert_eq!(eco.funds(), money(200));
        assert_eq!(eco.unit(farm).unwrap().tiers().levels(), [0, 1, 0]);
    }

    #[test]
    fn illegal_branch_is_rejected_even_with_funds() {
        let mut eco = rich();
        let farm = eco.buy_unit().unwrap();
        for _ in 0..3 {
            eco.upgrade_unit(farm, Branch::Top).unwrap();
        }
        eco.upgrade_unit(farm, Branch::Middle).unwrap();
        eco.upgrade_unit(farm, Branch::Middle).unwrap();
        let before = eco.funds();
        assert_eq!(
            eco.upgrade_unit(farm, Branch::Middle),
            Err(EconomyError::IllegalUpgradeRequest {
                unit: farm,
                branch: Branch::Middle,
                tiers: tiers([3, 2, 0]),
            })
        );
        assert!(matches!(
            eco.upgrade_unit(farm, Branch::Bottom),
            Err(EconomyError::IllegalUpgradeRequest { .. })
        ));
        assert_eq!(eco.funds(), before);
    }

    #[test]
    fn collect_round_credits_funds_in_purchase_order() {
        let mut eco = Economy::with_default_table(money(2500 + 300 + 800)).unwrap();
        let a = eco.buy_unit().unwrap();
        eco.buy_unit().unwrap();
        eco.upgrade_unit(a, Branch::Middle).unwrap();
        eco.upgrade_unit(a, Branch::Middle).unwrap();
        assert_eq!(eco.funds(), money(0));

        // 100 from the 0-2-0 farm and 80 from the 0-0-0 farm.
        assert_eq!(eco.collect_round(), money(180));
        assert_eq!(eco.funds(), money(180));
        assert_eq!(eco.collect_round(), money(180));
        assert_eq!(eco.total_collected(), money(360));
        assert_eq!(eco.funds(), money(360));
    }

    #[test]
    fn empty_portfolio_collects_nothing() {
        let mut eco = Economy::with_default_table(money(10)).unwrap();
        assert_eq!(eco.collect_round(), Decimal::ZERO);
        assert_eq!(eco.funds(), money(10));
    }

    #[test]
    fn bank_income_arrives_only_at_cap() {
        let mut eco = rich();
        let farm = eco.buy_unit().unwrap();
        for _ in 0..3 {
            eco.upgrade_unit(farm, Branch::Middle).unwrap();
        }
        let start = eco.funds();
        let paid: Vec<Decimal> = (0..12).map(|_| eco.collect_round()).collect();
        assert!(paid[..11].iter().all(|p| p.is_zero()));
        assert_eq!(paid[11], money(7000));
        assert_eq!(eco.funds(), start + money(7000));
    }

    proptest! {
        #[test]
        fn funds_are_conserved(
            start in 0i64..60_000,
            ops in proptest::collection::vec((0u8..5, 0usize..3, 0usize..3), 0..120),
        ) {
            let mut eco = Economy::with_default_table(money(start)).unwrap();
            let mut expected = money(start);
            for (kind, target, branch) in ops {
                let branch = Branch::try_from(branch).unwrap();
                let before = eco.funds();
                match kind {
                    0 => match eco.buy_unit() {
                        Ok(_) => expected -= money(1250),
                        Err(_) => prop_assert_eq!(eco.funds(), before),
                    },
                    1 | 2 => {
                        let cost = eco
                            .unit(target)
                            .ok()
                            .and_then(|u| eco.next_tier_cost(u, branch));
                        match eco.upgrade_unit(target, branch) {
                            Ok(()) => expected -= cost.unwrap(),
                            Err(_) => prop_assert_eq!(eco.funds(), before),
                        }
                    }
                    _ => expected += eco.collect_round(),
                }
                prop_assert!(eco.funds() >= Decimal::ZERO);
                prop_assert_eq!(eco.funds(), expected);
                for u in eco.units() {
                    let advanced = u.tiers().levels().iter().filter(|&&t| t >= EXCLUSIVE_TIER).count();
                    prop_assert!(advanced <= 1);
                }
            }
        }

        #[test]
        fn upgradable_query_is_idempotent_and_legal(
            levels in (0u8..=5, 0u8..=2, 0u8..=2),
            funds in 0i64..200_000,
        ) {
            let eco = Economy::with_default_table(money(funds)).unwrap();
            let unit = unit_at([levels.0, levels.1, levels.2]);
            let first = eco.get_upgradable_branches(&unit);
            prop_assert_eq!(&first, &eco.get_upgradable_branches(&unit));
            for b in first {
                prop_assert!(check_upgrade(unit.tiers(), b).is_ok());
                prop_assert!(eco.funds_available(eco.next_tier_cost(&unit, b).unwrap()));
            }
        }
    }
}
