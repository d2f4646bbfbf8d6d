#![deny(warnings)]

//! Core farm model: the tier table and the production unit.
//!
//! A farm has three upgrade branches with tiers 0..=5. At most one branch may
//! reach tier 3 or above; [`check_upgrade`] is the single place that rule is
//! enforced. The [`TierTable`] is immutable and shared between farms through
//! an `Arc`.

pub mod table;
pub mod tiers;
pub mod unit;

pub use table::{
    validate_table, BranchTiers, TableError, TierTable, MAX_PRICE, MAX_RATE, TIER_COUNT,
};
pub use tiers::{
    check_upgrade, Branch, BranchError, ParseTiersError, Tiers, UnitError, EXCLUSIVE_TIER,
    MAX_TIER,
};
pub use unit::ProductionUnit;
