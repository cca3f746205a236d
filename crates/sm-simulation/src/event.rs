//! The closed set of events subsystems exchange.
//!
//! Events are immutable facts carrying everything needed to replay them.
//! They are transient: once a listener has processed one it is discarded.

use serde::{Deserialize, Serialize};
use sm_core::BodyPart;

/// What a propagating effect does to the tissue it reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Blunt trauma: bruises vessels, cracks bone, strains muscle, hurts.
    Impact,
    /// Chemical exposure picked up by the immune system.
    Toxin,
    /// Heat that burns skin.
    Heat,
}

/// An effect spread over the anatomical graph with per-hop falloff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    pub magnitude: f64,
}

impl Effect {
    pub fn impact(magnitude: f64) -> Self {
        Self {
            kind: EffectKind::Impact,
            magnitude,
        }
    }

    pub fn toxin(magnitude: f64) -> Self {
        Self {
            kind: EffectKind::Toxin,
            magnitude,
        }
    }

    pub fn heat(magnitude: f64) -> Self {
        Self {
            kind: EffectKind::Heat,
            magnitude,
        }
    }
}

/// Every event a subsystem can emit or receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyEvent {
    // Generic
    Damage { part: BodyPart, amount: f64 },
    Heal { part: BodyPart, amount: f64 },
    PropagateEffect { origin: BodyPart, effect: Effect },

    // Commands
    Bleed { part: BodyPart, rate: f64 },
    Clot { part: BodyPart },
    Exert { part: BodyPart, intensity: f64 },
    Rest { part: BodyPart },
    Infect { part: BodyPart, severity: f64, growth_rate: f64 },
    Cure {
        part: BodyPart,
        power: f64,
        cures_infection: bool,
        cures_toxin: bool,
    },
    Poison { part: BodyPart, severity: f64 },
    Burn { part: BodyPart, intensity: f64 },
    Bandage { part: BodyPart },
    RemoveBandage { part: BodyPart },
    SeverNerve { part: BodyPart },
    RepairNerve { part: BodyPart },
    Fracture { part: BodyPart },
    SetBone { part: BodyPart },
    Feed { amount: f64 },
    Hydrate { amount: f64 },
    Shock { intensity: f64 },

    // Cross-system notifications
    Pain { part: BodyPart, intensity: f64 },
    SignalLost { part: BodyPart },
    SignalRestored { part: BodyPart },
    Hypoxia { severity: f64 },
}

/// Field-less discriminant of [`BodyEvent`], used to subscribe listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Damage,
    Heal,
    PropagateEffect,
    Bleed,
    Clot,
    Exert,
    Rest,
    Infect,
    Cure,
    Poison,
    Burn,
    Bandage,
    RemoveBandage,
    SeverNerve,
    RepairNerve,
    Fracture,
    SetBone,
    Feed,
    Hydrate,
    Shock,
    Pain,
    SignalLost,
    SignalRestored,
    Hypoxia,
}

impl BodyEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Damage { .. } => EventType::Damage,
            Self::Heal { .. } => EventType::Heal,
            Self::PropagateEffect { .. } => EventType::PropagateEffect,
            Self::Bleed { .. } => EventType::Bleed,
            Self::Clot { .. } => EventType::Clot,
            Self::Exert { .. } => EventType::Exert,
            Self::Rest { .. } => EventType::Rest,
            Self::Infect { .. } => EventType::Infect,
            Self::Cure { .. } => EventType::Cure,
            Self::Poison { .. } => EventType::Poison,
            Self::Burn { .. } => EventType::Burn,
            Self::Bandage { .. } => EventType::Bandage,
            Self::RemoveBandage { .. } => EventType::RemoveBandage,
            Self::SeverNerve { .. } => EventType::SeverNerve,
            Self::RepairNerve { .. } => EventType::RepairNerve,
            Self::Fracture { .. } => EventType::Fracture,
            Self::SetBone { .. } => EventType::SetBone,
            Self::Feed { .. } => EventType::Feed,
            Self::Hydrate { .. } => EventType::Hydrate,
            Self::Shock { .. } => EventType::Shock,
            Self::Pain { .. } => EventType::Pain,
            Self::SignalLost { .. } => EventType::SignalLost,
            Self::SignalRestored { .. } => EventType::SignalRestored,
            Self::Hypoxia { .. } => EventType::Hypoxia,
        }
    }

    /// The body part this event targets, if it targets one.
    pub fn part(&self) -> Option<BodyPart> {
        match self {
            Self::Damage { part, .. }
            | Self::Heal { part, .. }
            | Self::Bleed { part, .. }
            | Self::Clot { part }
            | Self::Exert { part, .. }
            | Self::Rest { part }
            | Self::Infect { part, .. }
            | Self::Cure { part, .. }
            | Self::Poison { part, .. }
            | Self::Burn { part, .. }
            | Self::Bandage { part }
            | Self::RemoveBandage { part }
            | Self::SeverNerve { part }
            | Self::RepairNerve { part }
            | Self::Fracture { part }
            | Self::SetBone { part }
            | Self::Pain { part, .. }
            | Self::SignalLost { part }
            | Self::SignalRestored { part } => Some(*part),
            Self::PropagateEffect { origin, .. } => Some(*origin),
            Self::Feed { .. }
            | Self::Hydrate { .. }
            | Self::Shock { .. }
            | Self::Hypoxia { .. } => {
                None
            }
        }
    }
}
