//! Ledger policy switches shared by configuration and the core engine.

use serde::{Deserialize, Serialize};

/// Order in which automatic allocation walks outstanding stock transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationOrder {
    /// Oldest `created_at` first.
    #[default]
    OldestFirst,
    /// Smallest outstanding balance first.
    SmallestBalanceFirst,
    /// Largest outstanding balance first.
    LargestBalanceFirst,
}

impl std::fmt::Display for AllocationOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OldestFirst => write!(f, "oldest_first"),
            Self::SmallestBalanceFirst => write!(f, "smallest_balance_first"),
            Self::LargestBalanceFirst => write!(f, "largest_balance_first"),
        }
    }
}

impl std::str::FromStr for AllocationOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "oldest_first" | "oldest" => Ok(Self::OldestFirst),
            "smallest_balance_first" | "smallest" => Ok(Self::SmallestBalanceFirst),
            "largest_balance_first" | "largest" => Ok(Self::LargestBalanceFirst),
            _ => Err(format!("Unknown allocation order: {s}")),
        }
    }
}

/// What happens to later running balances when a transaction is inserted in the past.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackdatePolicy {
    /// Recompute the running balance of every later transaction of the customer.
    #[default]
    Cascade,
    /// Leave later rows untouched; each row keeps its balance-at-the-time.
    Snapshot,
}

impl std::fmt::Display for BackdatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cascade => write!(f, "cascade"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

impl std::str::FromStr for BackdatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cascade" => Ok(Self::Cascade),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(format!("Unknown backdate policy: {s}")),
        }
    }
}
