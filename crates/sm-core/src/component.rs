//! Scalar attributes carried by nodes.
//!
//! A component is a clamped value with a maximum and a per-tick
//! regeneration rate. Negative regeneration models decay (pain, shock).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which attribute a [`Component`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Health,
    Integrity,
    Strength,
    Stamina,
    Signal,
    Pain,
    Bleeding,
    Infection,
    Toxin,
    Immunity,
    Efficiency,
    Exposure,
}

impl ComponentKind {
    /// Every component kind, in declaration order.
    pub const ALL: [ComponentKind; 12] = [
        Self::Health,
        Self::Integrity,
        Self::Strength,
        Self::Stamina,
        Self::Signal,
        Self::Pain,
        Self::Bleeding,
        Self::Infection,
        Self::Toxin,
        Self::Immunity,
        Self::Efficiency,
        Self::Exposure,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Integrity => "integrity",
            Self::Strength => "strength",
            Self::Stamina => "stamina",
            Self::Signal => "signal",
            Self::Pain => "pain",
            Self::Bleeding => "bleeding",
            Self::Infection => "infection",
            Self::Toxin => "toxin",
            Self::Immunity => "immunity",
            Self::Efficiency => "efficiency",
            Self::Exposure => "exposure",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == lower)
            .ok_or_else(|| CoreError::UnknownComponent(s.to_string()))
    }
}

/// A single named scalar attribute.
///
/// Invariant: `0 <= current <= max` after every mutation. Out-of-range
/// inputs clamp silently; negative or NaN amounts are treated as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    current: f64,
    max: f64,
    regen_rate: f64,
    base_regen: f64,
}

fn sanitize(amount: f64) -> f64 {
    if amount.is_nan() { 0.0 } else { amount.max(0.0) }
}

impl Component {
    /// A full component with the given maximum and regeneration per tick.
    pub fn new(max: f64, regen_rate: f64) -> Self {
        let max = sanitize(max);
        Self {
            current: max,
            max,
            regen_rate,
            base_regen: regen_rate,
        }
    }

    /// A component starting at zero.
    pub fn empty(max: f64, regen_rate: f64) -> Self {
        Self::new(max, regen_rate).with_current(0.0)
    }

    /// Set the starting value, clamped to `[0, max]`.
    pub fn with_current(mut self, current: f64) -> Self {
        self.set(current);
        self
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Regeneration per tick currently in effect (zero while suspended).
    pub fn regen_rate(&self) -> f64 {
        self.regen_rate
    }

    /// Increase by `amount`, clamping at `max`. Returns the change applied.
    pub fn increase(&mut self, amount: f64) -> f64 {
        let before = self.current;
        self.current = (self.current + sanitize(amount)).min(self.max);
        self.current - before
    }

    /// Decrease by `amount`, clamping at zero. Returns the amount removed.
    pub fn decrease(&mut self, amount: f64) -> f64 {
        let before = self.current;
        self.current = (self.current - sanitize(amount)).max(0.0);
        before - self.current
    }

    /// Set the value directly, clamped to `[0, max]`.
    pub fn set(&mut self, value: f64) {
        self.current = sanitize(value).min(self.max);
    }

    /// Change the maximum, pulling `current` down if necessary.
    pub fn set_max(&mut self, max: f64) {
        self.max = sanitize(max);
        self.current = self.current.min(self.max);
    }

    /// Fraction of maximum in `[0, 1]`; a zero-max component reads as empty.
    pub fn fraction(&self) -> f64 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Apply one tick of regeneration (or decay, for a negative rate).
    pub fn regenerate(&mut self, multiplier: f64) -> f64 {
        let delta = self.regen_rate * sanitize(multiplier);
        if delta >= 0.0 {
            self.increase(delta)
        } else {
            -self.decrease(-delta)
        }
    }

    /// Stop regeneration until [`restore_regen`](Self::restore_regen) is called.
    pub fn suspend_regen(&mut self) {
        self.regen_rate = 0.0;
    }

    pub fn restore_regen(&mut self) {
        self.regen_rate = self.base_regen;
    }

    pub fn is_regen_suspended(&self) -> bool {
        self.regen_rate == 0.0 && self.base_regen != 0.0
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}/{:.1}", self.current, self.max)
    }
}
