//! Upgrade branches, tier triples and the exclusivity rule shared by every
//! component that advances a farm.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Highest tier any branch can reach.
pub const MAX_TIER: u8 = 5;

/// Tier at which a branch becomes exclusive: only one branch may sit at or
/// above it.
pub const EXCLUSIVE_TIER: u8 = 3;

/// One of the three upgrade paths of a farm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Branch {
    /// Path 0: more output per round.
    Top,
    /// Path 1: value boost, then banking.
    Middle,
    /// Path 2: flat high-tier income.
    Bottom,
}

impl Branch {
    /// All branches in index order.
    pub const ALL: [Branch; 3] = [Branch::Top, Branch::Middle, Branch::Bottom];

    /// Position of the branch in per-branch tables (0, 1 or 2).
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Branch::Top => "top",
            Branch::Middle => "middle",
            Branch::Bottom => "bottom",
        };
        write!(f, "{} ({})", self.index(), name)
    }
}

/// Branch index outside `0..3`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("branch index {0} is out of range [0, 2]")]
pub struct BranchError(pub usize);

impl TryFrom<usize> for Branch {
    type Error = BranchError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Branch::ALL.get(index).copied().ok_or(BranchError(index))
    }
}

/// Reasons a single-tier upgrade is refused.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum UnitError {
    /// The branch already sits at [`MAX_TIER`].
    #[error("branch {0} is already at tier 5")]
    TierExceeded(Branch),
    /// Advancing would put a second branch at [`EXCLUSIVE_TIER`] or above.
    #[error("cannot advance branch {branch} to tier 3 while branch {holder} is at tier {tier}")]
    ExclusivityViolation {
        branch: Branch,
        holder: Branch,
        tier: u8,
    },
}

/// Current tier of each branch, always a legal combination.
///
/// Only reachable through [`Tiers::from_levels`], parsing, or
/// [`Tiers::advance`], so a value of this type never breaks the tier bounds
/// or the exclusivity rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Tiers([u8; 3]);

impl Tiers {
    /// Build a tier triple, rejecting out-of-range or non-exclusive levels.
    pub fn from_levels(levels: [u8; 3]) -> Result<Self, UnitError> {
        let mut tiers = Tiers::default();
        for branch in Branch::ALL {
            for _ in 0..levels[branch.index()] {
                tiers.advance(branch)?;
            }
        }
        Ok(tiers)
    }

    pub fn get(self, branch: Branch) -> u8 {
        self.0[branch.index()]
    }

    pub fn levels(self) -> [u8; 3] {
        self.0
    }

    /// Branch currently holding the exclusive (tier >= 3) status, if any.
    pub fn exclusive_holder(self) -> Option<Branch> {
        Branch::ALL.into_iter().find(|&b| self.get(b) >= EXCLUSIVE_TIER)
    }

    /// Branches ordered by tier, highest first; ties keep index order.
    pub fn ranked(self) -> [Branch; 3] {
        let mut order = Branch::ALL;
        order.sort_by_key(|&b| (Reverse(self.get(b)), b.index()));
        order
    }

    /// Advance one branch by a single tier after checking [`check_upgrade`].
    pub fn advance(&mut self, branch: Branch) -> Result<(), UnitError> {
        check_upgrade(*self, branch)?;
        self.0[branch.index()] += 1;
        Ok(())
    }
}

/// Validate a single-tier upgrade of `branch` from `tiers`.
///
/// This is the one place the tier bounds and the exclusivity rule live; the
/// unit's own upgrade and the economy's upgradability query both call it.
pub fn check_upgrade(tiers: Tiers, branch: Branch) -> Result<(), UnitError> {
    let current = tiers.get(branch);
    if current >= MAX_TIER {
        return Err(UnitError::TierExceeded(branch));
    }
    if current + 1 == EXCLUSIVE_TIER {
        // `branch` itself is below the exclusive tier here.
        if let Some(holder) = tiers.exclusive_holder() {
            return Err(UnitError::ExclusivityViolation {
                branch,
                holder,
                tier: tiers.get(holder),
            });
        }
    }
    Ok(())
}

impl fmt::Display for Tiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}-{b}-{c}")
    }
}

/// Errors parsing a `t0-t1-t2` tier string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseTiersError {
    #[error("expected three tiers like 4-2-0, got {0:?}")]
    Format(String),
    #[error(transparent)]
    Illegal(#[from] UnitError),
}

impl FromStr for Tiers {
    type Err = ParseTiersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        if parts.len() != 3 {
            return Err(ParseTiersError::Format(s.to_string()));
        }
        let mut levels = [0u8; 3];
        for (slot, part) in levels.iter_mut().zip(parts) {
            *slot = part
                .trim()
                .parse()
                .map_err(|_| ParseTiersError::Format(s.to_string()))?;
        }
        Ok(Tiers::from_levels(levels)?)
    }
}

impl<'de> Deserialize<'de> for Tiers {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let levels = <[u8; 3]>::deserialize(deserializer)?;
        Tiers::from_levels(levels).map_err(serde::de::Error::custom)
    }
}
