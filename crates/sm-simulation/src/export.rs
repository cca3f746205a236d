//! Read-only view of a body for external consumers.
//!
//! The snapshot copies every component value keyed by subsystem and part.
//! It is never read back into a body: the live node graph stays authoritative.

use std::collections::BTreeMap;

use serde::Serialize;
use sm_core::{BodyPart, ComponentKind, Node, ResourceKind};

use crate::error::SimResult;
use crate::system::SystemId;

/// One node's state at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartSnapshot {
    pub status: Vec<String>,
    pub components: BTreeMap<ComponentKind, f64>,
}

impl PartSnapshot {
    pub fn from_node(node: &Node) -> Self {
        Self {
            status: node.status().labels(),
            components: node
                .components()
                .iter()
                .map(|(&kind, c)| (kind, c.current()))
                .collect(),
        }
    }
}

/// Headline numbers for the whole body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vitals {
    pub tick: u64,
    pub alive: bool,
    pub blood: f64,
    pub blood_pressure: f64,
    pub oxygen_output: f64,
    pub energy: f64,
    pub energy_output: f64,
    pub overall_strength: f64,
    pub overall_integrity: f64,
    pub overall_infection: f64,
    pub total_pain: f64,
    pub shock: f64,
    pub fractured: usize,
    pub torn: usize,
    pub severed: usize,
    pub bleeding: usize,
    pub infected: usize,
    pub open_wounds: usize,
}

/// Full read-only export of a body.
#[derive(Debug, Clone, Serialize)]
pub struct BodySnapshot {
    pub tick: u64,
    pub alive: bool,
    pub vitals: Vitals,
    pub resources: BTreeMap<ResourceKind, f64>,
    pub systems: BTreeMap<SystemId, BTreeMap<BodyPart, PartSnapshot>>,
}

impl BodySnapshot {
    /// Component value for one subsystem and part, if both are present.
    pub fn value(&self, system: SystemId, part: BodyPart, kind: ComponentKind) -> Option<f64> {
        self.systems
            .get(&system)?
            .get(&part)?
            .components
            .get(&kind)
            .copied()
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
