//! The shared ledger of biological resources.
//!
//! Every subsystem deposits into and withdraws from one pool per body.
//! Amounts never go negative: a withdrawal larger than the stock takes
//! what is there and reports how much it actually got.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A consumable or producible quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Oxygen,
    Glucose,
    Water,
    Blood,
    Calcium,
    Energy,
    CarbonDioxide,
}

impl ResourceKind {
    /// Every resource kind, in declaration order.
    pub const ALL: [ResourceKind; 7] = [
        Self::Oxygen,
        Self::Glucose,
        Self::Water,
        Self::Blood,
        Self::Calcium,
        Self::Energy,
        Self::CarbonDioxide,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Oxygen => "oxygen",
            Self::Glucose => "glucose",
            Self::Water => "water",
            Self::Blood => "blood",
            Self::Calcium => "calcium",
            Self::Energy => "energy",
            Self::CarbonDioxide => "carbon_dioxide",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "co2" => Ok(Self::CarbonDioxide),
            "o2" => Ok(Self::Oxygen),
            other => Self::ALL
                .iter()
                .copied()
                .find(|k| k.name() == other)
                .ok_or_else(|| CoreError::UnknownResource(s.to_string())),
        }
    }
}

/// Shared stock of every [`ResourceKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    amounts: BTreeMap<ResourceKind, f64>,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourcePool {
    /// An empty pool with every resource at zero.
    pub fn new() -> Self {
        Self {
            amounts: ResourceKind::ALL.iter().map(|&k| (k, 0.0)).collect(),
        }
    }

    /// A pool seeded with the given starting amounts; unnamed kinds start at zero.
    pub fn with_levels(levels: impl IntoIterator<Item = (ResourceKind, f64)>) -> Self {
        let mut pool = Self::new();
        for (kind, amount) in levels {
            pool.add(kind, amount);
        }
        pool
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.amounts.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn has(&self, kind: ResourceKind, amount: f64) -> bool {
        self.get(kind) >= amount
    }

    /// Deposit `amount`. Negative or NaN deposits are ignored. Returns the new stock.
    pub fn add(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        let entry = self.amounts.entry(kind).or_insert(0.0);
        if amount > 0.0 {
            *entry += amount;
        }
        *entry
    }

    /// Withdraw up to `amount`. Returns how much was actually taken.
    pub fn remove(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        if amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }
        let entry = self.amounts.entry(kind).or_insert(0.0);
        let taken = amount.min(*entry);
        *entry -= taken;
        taken
    }

    /// Withdraw a whole basket of needs scaled by `scale`.
    ///
    /// Each kind is withdrawn independently, so a shortage of one does not
    /// stop the others being taken. Returns the satisfaction in `[0, 1]`:
    /// the worst ratio of taken to requested across the basket, or 1.0
    /// when nothing was requested.
    pub fn withdraw_all(&mut self, needs: &BTreeMap<ResourceKind, f64>, scale: f64) -> f64 {
        let mut satisfaction: f64 = 1.0;
        for (&kind, &per_tick) in needs {
            let requested = per_tick * scale;
            if requested <= 0.0 {
                continue;
            }
            let taken = self.remove(kind, requested);
            satisfaction = satisfaction.min(taken / requested);
        }
        satisfaction
    }

    /// Deposit a whole basket scaled by `scale`.
    pub fn deposit_all(&mut self, production: &BTreeMap<ResourceKind, f64>, scale: f64) {
        for (&kind, &per_tick) in production {
            self.add(kind, per_tick * scale);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        self.amounts.iter().map(|(&k, &v)| (k, v))
    }
}
