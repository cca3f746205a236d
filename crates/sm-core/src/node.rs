use std::collections::BTreeMap;

use serde::Serialize;

use crate::component::{Component, ComponentKind};
use crate::part::BodyPart;
use crate::resource::ResourceKind;
use crate::status::NodeStatus;

/// How a status refresh changed a node's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Availability did not change.
    Unchanged,
    /// The node just became disabled.
    Disabled,
    /// A disabled node just came back.
    Restored,
}

/// Per-body-part state within one subsystem.
///
/// Nodes of different subsystems for the same part are independent. A node
/// is created once with full values and never destroyed; a dead node is
/// simply permanently disabled.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    part: BodyPart,
    components: BTreeMap<ComponentKind, Component>,
    status: NodeStatus,
    needs: BTreeMap<ResourceKind, f64>,
    production: BTreeMap<ResourceKind, f64>,
}

impl Node {
    pub fn new(part: BodyPart) -> Self {
        Self {
            part,
            components: BTreeMap::new(),
            status: NodeStatus::HEALTHY,
            needs: BTreeMap::new(),
            production: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, kind: ComponentKind, component: Component) -> Self {
        self.components.insert(kind, component);
        self
    }

    /// Resource withdrawn from the pool each tick to keep this node fed.
    pub fn with_need(mut self, kind: ResourceKind, per_tick: f64) -> Self {
        self.needs.insert(kind, per_tick);
        self
    }

    /// Resource deposited into the pool each tick while the node is enabled.
    pub fn with_production(mut self, kind: ResourceKind, per_tick: f64) -> Self {
        self.production.insert(kind, per_tick);
        self
    }

    pub fn part(&self) -> BodyPart {
        self.part
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.get(&kind)
    }

    pub fn component_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.components.get_mut(&kind)
    }

    pub fn has_component(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    pub fn components(&self) -> &BTreeMap<ComponentKind, Component> {
        &self.components
    }

    /// Current value of a component, or zero if the node does not model it.
    pub fn value(&self, kind: ComponentKind) -> f64 {
        self.component(kind).map_or(0.0, Component::current)
    }

    /// Fill fraction of a component, or zero if the node does not model it.
    pub fn fraction(&self, kind: ComponentKind) -> f64 {
        self.component(kind).map_or(0.0, Component::fraction)
    }

    /// Value counted by aggregate queries: zero while disabled.
    pub fn contribution(&self, kind: ComponentKind) -> f64 {
        if self.is_disabled() {
            0.0
        } else {
            self.value(kind)
        }
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn has(&self, flag: NodeStatus) -> bool {
        self.status.contains(flag)
    }

    /// Set a condition flag. Returns false if it was already set.
    pub fn set_flag(&mut self, flag: NodeStatus) -> bool {
        let fresh = !self.status.contains(flag);
        self.status.insert(flag);
        fresh
    }

    /// Clear a condition flag. Returns false if it was not set.
    pub fn clear_flag(&mut self, flag: NodeStatus) -> bool {
        let present = self.status.contains(flag);
        self.status.remove(flag);
        present
    }

    pub fn is_disabled(&self) -> bool {
        self.status.contains(NodeStatus::DISABLED)
    }

    pub fn needs(&self) -> &BTreeMap<ResourceKind, f64> {
        &self.needs
    }

    pub fn production(&self) -> &BTreeMap<ResourceKind, f64> {
        &self.production
    }

    /// Re-derive `DISABLED`, `HEALTHY` and `TIRED`.
    ///
    /// The node is disabled when its `defining` component is depleted or any
    /// blocking condition is set. Disabling suspends positive regeneration on
    /// every component; restoring brings it back. `fatigue` names the
    /// stamina-style component and the fraction below which the node is tired.
    pub fn refresh_status(
        &mut self,
        defining: ComponentKind,
        fatigue: Option<(ComponentKind, f64)>,
    ) -> StatusChange {
        let was_disabled = self.is_disabled();
        let depleted = self.component(defining).is_some_and(Component::is_depleted);
        let disabled = depleted || self.status.intersects(NodeStatus::BLOCKING);

        let change = match (was_disabled, disabled) {
            (false, true) => {
                for component in self.components.values_mut() {
                    if component.regen_rate() > 0.0 {
                        component.suspend_regen();
                    }
                }
                StatusChange::Disabled
            }
            (true, false) => {
                for component in self.components.values_mut() {
                    component.restore_regen();
                }
                StatusChange::Restored
            }
            _ => StatusChange::Unchanged,
        };
        self.status.set(NodeStatus::DISABLED, disabled);

        let tired = fatigue.is_some_and(|(kind, threshold)| {
            self.component(kind).is_some_and(|c| c.fraction() < threshold)
        });
        self.status.set(NodeStatus::TIRED, tired);
        self.status.set(NodeStatus::HEALTHY, !disabled && !tired);

        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn muscle() -> Node {
        Node::new(BodyPart::LeftThigh)
            .with_component(ComponentKind::Health, Component::new(100.0, 1.0))
            .with_component(ComponentKind::Stamina, Component::new(100.0, 5.0))
    }

    #[test]
    fn absent_component_reads_zero() {
        let node = muscle();
        assert!(!node.has_component(ComponentKind::Signal));
        assert!(node.component(ComponentKind::Signal).is_none());
        assert_eq!(node.value(ComponentKind::Signal), 0.0);
    }

    #[test]
    fn depleting_defining_component_disables() {
        let mut node = muscle();
        node.component_mut(ComponentKind::Health).unwrap().decrease(500.0);
        let change = node.refresh_status(ComponentKind::Health, None);
        assert_eq!(change, StatusChange::Disabled);
        assert!(node.is_disabled());
        assert!(!node.has(NodeStatus::HEALTHY));
        assert_eq!(node.contribution(ComponentKind::Stamina), 0.0);
        assert!(node.component(ComponentKind::Health).unwrap().is_regen_suspended());
    }

    #[test]
    fn healing_restores_and_resumes_regen() {
        let mut node = muscle();
        node.component_mut(ComponentKind::Health).unwrap().decrease(500.0);
        node.refresh_status(ComponentKind::Health, None);
        node.component_mut(ComponentKind::Health).unwrap().increase(10.0);
        let change = node.refresh_status(ComponentKind::Health, None);
        assert_eq!(change, StatusChange::Restored);
        assert!(node.has(NodeStatus::HEALTHY));
        let health = node.component(ComponentKind::Health).unwrap();
        assert!((health.regen_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn blocking_condition_disables_despite_health() {
        let mut node = muscle();
        node.set_flag(NodeStatus::TORN);
        node.refresh_status(ComponentKind::Health, None);
        assert!(node.is_disabled());
        node.clear_flag(NodeStatus::TORN);
        node.refresh_status(ComponentKind::Health, None);
        assert!(!node.is_disabled());
    }

    #[test]
    fn tired_and_healthy_are_exclusive() {
        let mut node = muscle();
        let fatigue = Some((ComponentKind::Stamina, 0.25));
        node.component_mut(ComponentKind::Stamina).unwrap().set(10.0);
        node.refresh_status(ComponentKind::Health, fatigue);
        assert!(node.has(NodeStatus::TIRED));
        assert!(!node.has(NodeStatus::HEALTHY));

        node.component_mut(ComponentKind::Stamina).unwrap().set(90.0);
        node.refresh_status(ComponentKind::Health, fatigue);
        assert!(!node.has(NodeStatus::TIRED));
        assert!(node.has(NodeStatus::HEALTHY));
    }

    #[test]
    fn set_flag_reports_freshness() {
        let mut node = muscle();
        assert!(node.set_flag(NodeStatus::BLEEDING));
        assert!(!node.set_flag(NodeStatus::BLEEDING));
        assert!(node.clear_flag(NodeStatus::BLEEDING));
        assert!(!node.clear_flag(NodeStatus::BLEEDING));
    }
}
