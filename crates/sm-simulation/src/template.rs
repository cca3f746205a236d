//! Shared node bookkeeping every subsystem builds on.
//!
//! A [`SystemTemplate`] owns one [`Node`] per modelled body part and carries
//! the logic all subsystems share: damage and healing of the defining
//! component, status derivation, graph propagation, resource feeding and
//! production, aggregate queries and the weight-bearing rule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sm_core::{
    AnatomicalGraph, BodyPart, ComponentKind, Node, NodeStatus, ResourceKind, StatusChange,
    anatomy,
};

use crate::context::TickContext;
use crate::error::{SimError, SimResult};
use crate::export::PartSnapshot;
use crate::history::Occurrence;
use crate::system::SystemId;

/// Tunables shared by every subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateParams {
    /// Component whose depletion disables a node.
    pub defining: ComponentKind,
    /// Stamina-style component driving the `TIRED` flag, if any.
    pub fatigue: Option<ComponentKind>,
    /// Fatigue fraction below which a node is tired.
    pub tired_threshold: f64,
    /// Magnitude multiplier per graph hop during propagation.
    pub falloff: f64,
    /// Residual magnitude below which propagation stops.
    pub negligible: f64,
    /// Scales every component's regeneration.
    pub regen_multiplier: f64,
    /// Damage to the defining component per tick of total starvation.
    pub starvation_damage: f64,
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            defining: ComponentKind::Health,
            fatigue: None,
            tired_threshold: 0.25,
            falloff: 0.3,
            negligible: 0.5,
            regen_multiplier: 1.0,
            starvation_damage: 2.0,
        }
    }
}

impl TemplateParams {
    pub fn with_defining(mut self, defining: ComponentKind) -> Self {
        self.defining = defining;
        self
    }

    pub fn with_fatigue(mut self, fatigue: ComponentKind, tired_threshold: f64) -> Self {
        self.fatigue = Some(fatigue);
        self.tired_threshold = tired_threshold;
        self
    }

    pub fn with_falloff(mut self, falloff: f64) -> Self {
        self.falloff = falloff;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        check_fraction("falloff", self.falloff)?;
        check_fraction("tired_threshold", self.tired_threshold)?;
        check_non_negative("negligible", self.negligible)?;
        check_non_negative("regen_multiplier", self.regen_multiplier)?;
        check_non_negative("starvation_damage", self.starvation_damage)
    }
}

/// Reject values outside `0..=1`.
pub(crate) fn check_fraction(name: &str, value: f64) -> SimResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::InvalidConfig(format!(
            "{name} must be between 0 and 1, got {value}"
        )))
    }
}

/// Reject negative or NaN values.
pub(crate) fn check_non_negative(name: &str, value: f64) -> SimResult<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidConfig(format!(
            "{name} must not be negative, got {value}"
        )))
    }
}

/// Per-subsystem node set plus the behaviour every subsystem reuses.
#[derive(Debug, Clone)]
pub struct SystemTemplate {
    id: SystemId,
    params: TemplateParams,
    nodes: BTreeMap<BodyPart, Node>,
    order: Vec<BodyPart>,
    starved: bool,
}

impl SystemTemplate {
    pub fn new(
        id: SystemId,
        params: TemplateParams,
        nodes: impl IntoIterator<Item = Node>,
    ) -> Self {
        let nodes: BTreeMap<BodyPart, Node> = nodes.into_iter().map(|n| (n.part(), n)).collect();
        let order = anatomy()
            .outward_order()
            .into_iter()
            .filter(|p| nodes.contains_key(p))
            .collect();
        Self {
            id,
            params,
            nodes,
            order,
            starved: false,
        }
    }

    pub fn id(&self) -> SystemId {
        self.id
    }

    pub fn params(&self) -> &TemplateParams {
        &self.params
    }

    pub fn anatomy(&self) -> &'static AnatomicalGraph {
        anatomy()
    }

    /// Modelled parts, central first.
    pub fn parts(&self) -> &[BodyPart] {
        &self.order
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|p| self.nodes.get(p))
    }

    pub fn node(&self, part: BodyPart) -> Option<&Node> {
        self.nodes.get(&part)
    }

    pub fn node_mut(&mut self, part: BodyPart) -> Option<&mut Node> {
        self.nodes.get_mut(&part)
    }

    pub fn has_node(&self, part: BodyPart) -> bool {
        self.nodes.contains_key(&part)
    }

    /// Whether the part is modelled here and not disabled.
    pub fn is_active(&self, part: BodyPart) -> bool {
        self.node(part).is_some_and(|n| !n.is_disabled())
    }

    pub fn has(&self, part: BodyPart, flag: NodeStatus) -> bool {
        self.node(part).is_some_and(|n| n.has(flag))
    }

    /// Component value at `part`, zero when the part or component is absent.
    pub fn value(&self, part: BodyPart, kind: ComponentKind) -> f64 {
        self.node(part).map_or(0.0, |n| n.value(kind))
    }

    pub fn fraction(&self, part: BodyPart, kind: ComponentKind) -> f64 {
        self.node(part).map_or(0.0, |n| n.fraction(kind))
    }

    /// Component value counted by aggregates: zero when disabled or absent.
    pub fn contribution(&self, part: BodyPart, kind: ComponentKind) -> f64 {
        self.node(part).map_or(0.0, |n| n.contribution(kind))
    }

    /// Re-derive the node's status and record availability transitions.
    pub fn refresh(&mut self, part: BodyPart, ctx: &mut TickContext<'_>) -> StatusChange {
        let defining = self.params.defining;
        let fatigue = self.params.fatigue.map(|k| (k, self.params.tired_threshold));
        let Some(node) = self.nodes.get_mut(&part) else {
            return StatusChange::Unchanged;
        };
        let change = node.refresh_status(defining, fatigue);
        match change {
            StatusChange::Disabled => {
                tracing::info!(system = %self.id, %part, "node disabled");
                ctx.record(Some(part), Occurrence::NodeDisabled, format!("{part} stops working"));
            }
            StatusChange::Restored => {
                tracing::info!(system = %self.id, %part, "node restored");
                ctx.record(Some(part), Occurrence::NodeRestored, format!("{part} works again"));
            }
            StatusChange::Unchanged => {}
        }
        change
    }

    pub fn refresh_all(&mut self, ctx: &mut TickContext<'_>) {
        for part in self.order.clone() {
            self.refresh(part, ctx);
        }
    }

    /// Reduce the defining component. Returns the amount actually removed.
    pub fn apply_damage(&mut self, part: BodyPart, amount: f64, ctx: &mut TickContext<'_>) -> f64 {
        let defining = self.params.defining;
        let removed = self
            .nodes
            .get_mut(&part)
            .and_then(|n| n.component_mut(defining))
            .map_or(0.0, |c| c.decrease(amount));
        self.refresh(part, ctx);
        removed
    }

    /// Raise the defining component. Returns the amount actually added.
    pub fn apply_heal(&mut self, part: BodyPart, amount: f64, ctx: &mut TickContext<'_>) -> f64 {
        let defining = self.params.defining;
        let added = self
            .nodes
            .get_mut(&part)
            .and_then(|n| n.component_mut(defining))
            .map_or(0.0, |c| c.increase(amount));
        self.refresh(part, ctx);
        added
    }

    /// Parts reached by an effect spreading from `origin`, with the magnitude
    /// each receives. Disabled and unmodelled parts stop the spread.
    pub fn spread(&self, origin: BodyPart, magnitude: f64) -> Vec<(BodyPart, f64)> {
        anatomy().spread(
            origin,
            magnitude,
            self.params.falloff,
            self.params.negligible,
            |p| self.is_active(p),
        )
    }

    /// Spread damage to the defining component outward from `origin`.
    pub fn propagate_damage(
        &mut self,
        origin: BodyPart,
        magnitude: f64,
        ctx: &mut TickContext<'_>,
    ) {
        for (part, amount) in self.spread(origin, magnitude) {
            self.apply_damage(part, amount, ctx);
        }
    }

    /// One tick of regeneration on every component of every node.
    pub fn regenerate_all(&mut self) {
        let multiplier = self.params.regen_multiplier;
        for node in self.nodes.values_mut() {
            for kind in ComponentKind::ALL {
                if let Some(c) = node.component_mut(kind) {
                    c.regenerate(multiplier);
                }
            }
        }
    }

    /// One tick of regeneration for a single component, scaled by `multiplier`.
    pub fn regenerate_component(
        &mut self,
        part: BodyPart,
        kind: ComponentKind,
        multiplier: f64,
    ) -> f64 {
        let scale = self.params.regen_multiplier * multiplier;
        self.nodes
            .get_mut(&part)
            .and_then(|n| n.component_mut(kind))
            .map_or(0.0, |c| c.regenerate(scale))
    }

    /// Withdraw every enabled node's needs from the pool, central parts first.
    ///
    /// A node that gets only part of what it asked for loses defining
    /// component in proportion to the shortfall. Returns the worst
    /// satisfaction seen this tick.
    pub fn feed(&mut self, ctx: &mut TickContext<'_>) -> f64 {
        let mut worst: f64 = 1.0;
        let mut short_of: Option<ResourceKind> = None;
        let defining = self.params.defining;
        let starvation = self.params.starvation_damage;

        for part in self.order.clone() {
            let Some(node) = self.nodes.get_mut(&part) else {
                continue;
            };
            if node.is_disabled() || node.needs().is_empty() {
                continue;
            }
            let satisfaction = ctx.pool.withdraw_all(node.needs(), 1.0);
            if satisfaction < 1.0 {
                if short_of.is_none() {
                    short_of = node.needs().keys().copied().find(|&k| ctx.pool.get(k) <= 0.0);
                }
                if let Some(c) = node.component_mut(defining) {
                    c.decrease(starvation * (1.0 - satisfaction));
                }
                self.refresh(part, ctx);
            }
            worst = worst.min(satisfaction);
        }

        match short_of {
            Some(resource) if !self.starved => {
                tracing::warn!(system = %self.id, %resource, "resource shortfall");
                ctx.record(
                    None,
                    Occurrence::ResourceShortfall { resource },
                    format!("{} is short of {resource}", self.id),
                );
                self.starved = true;
            }
            None if worst >= 1.0 => self.starved = false,
            _ => {}
        }
        worst
    }

    /// Deposit every enabled node's production, scaled by `scale`.
    pub fn produce(&mut self, ctx: &mut TickContext<'_>, scale: f64) {
        for node in self.nodes.values() {
            if !node.is_disabled() {
                ctx.pool.deposit_all(node.production(), scale);
            }
        }
    }

    /// Sum of a component's contribution over every node.
    pub fn aggregate(&self, kind: ComponentKind) -> f64 {
        self.nodes.values().map(|n| n.contribution(kind)).sum()
    }

    /// Mean fill fraction of a component, counting disabled nodes as empty.
    pub fn overall(&self, kind: ComponentKind) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .nodes
            .values()
            .map(|n| if n.is_disabled() { 0.0 } else { n.fraction(kind) })
            .sum();
        total / self.nodes.len() as f64
    }

    pub fn count(&self, flag: NodeStatus) -> usize {
        self.nodes.values().filter(|n| n.has(flag)).count()
    }

    pub fn parts_with(&self, flag: NodeStatus) -> Vec<BodyPart> {
        self.order
            .iter()
            .copied()
            .filter(|p| self.has(*p, flag))
            .collect()
    }

    /// Mark every part below a fractured weight-bearing part as unsupported,
    /// and clear the mark everywhere else.
    pub fn apply_weight_bearing(&mut self, ctx: &mut TickContext<'_>) {
        let graph = anatomy();
        for part in self.order.clone() {
            let unsupported = graph
                .upstream(part)
                .into_iter()
                .any(|up| graph.is_weight_bearing(up) && self.has(up, NodeStatus::FRACTURED));
            if let Some(node) = self.nodes.get_mut(&part) {
                if unsupported {
                    node.set_flag(NodeStatus::UNSUPPORTED);
                } else {
                    node.clear_flag(NodeStatus::UNSUPPORTED);
                }
            }
            self.refresh(part, ctx);
        }
    }

    /// Read-only view of every node for export.
    pub fn snapshot(&self) -> BTreeMap<BodyPart, PartSnapshot> {
        self.nodes()
            .map(|n| (n.part(), PartSnapshot::from_node(n)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::Harness;
    use sm_core::{Component, ResourcePool};

    fn template(parts: &[BodyPart]) -> SystemTemplate {
        let nodes = parts.iter().map(|&p| {
            Node::new(p)
                .with_component(ComponentKind::Health, Component::new(100.0, 1.0))
                .with_need(ResourceKind::Oxygen, 1.0)
        });
        SystemTemplate::new(SystemId::Muscular, TemplateParams::default(), nodes)
    }

    #[test]
    fn order_is_central_first() {
        let t = template(&[BodyPart::LeftHand, BodyPart::Chest, BodyPart::LeftShoulder]);
        assert_eq!(
            t.parts(),
            &[BodyPart::Chest, BodyPart::LeftShoulder, BodyPart::LeftHand]
        );
    }

    #[test]
    fn lethal_damage_disables_and_zeroes_contribution() {
        let mut t = template(&BodyPart::ALL);
        let mut h = Harness::new();
        let before = t.aggregate(ComponentKind::Health);
        t.apply_damage(BodyPart::LeftFoot, 500.0, &mut h.ctx(SystemId::Muscular));
        assert!(!t.is_active(BodyPart::LeftFoot));
        assert!((before - t.aggregate(ComponentKind::Health) - 100.0).abs() < 1e-9);
        assert_eq!(h.log.count_where(|e| e.occurrence == Occurrence::NodeDisabled), 1);

        t.apply_heal(BodyPart::LeftFoot, 30.0, &mut h.ctx(SystemId::Muscular));
        assert!(t.is_active(BodyPart::LeftFoot));
        assert_eq!(h.log.count_where(|e| e.occurrence == Occurrence::NodeRestored), 1);
    }

    #[test]
    fn spread_stops_at_disabled_parts() {
        let mut t = template(&BodyPart::ALL);
        let mut h = Harness::new();
        t.apply_damage(BodyPart::LeftForearm, 500.0, &mut h.ctx(SystemId::Muscular));
        let hits = t.spread(BodyPart::LeftUpperArm, 100.0);
        assert!(hits.iter().all(|(p, _)| *p != BodyPart::LeftForearm));
        assert!(hits.iter().all(|(p, _)| *p != BodyPart::LeftHand));
    }

    #[test]
    fn spread_skips_unmodelled_parts() {
        let t = template(&[BodyPart::Head, BodyPart::Neck, BodyPart::Chest]);
        let hits = t.spread(BodyPart::Chest, 100.0);
        assert!(hits.iter().all(|(p, _)| t.has_node(*p)));
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn feeding_starves_central_parts_last() {
        let mut t = template(&[BodyPart::Chest, BodyPart::LeftShoulder]);
        let mut h = Harness::new();
        h.pool = ResourcePool::with_levels([(ResourceKind::Oxygen, 1.0)]);
        let satisfaction = t.feed(&mut h.ctx(SystemId::Muscular));
        assert_eq!(satisfaction, 0.0);
        let chest = t.node(BodyPart::Chest).unwrap();
        assert!(chest.component(ComponentKind::Health).unwrap().is_full());
        assert!(t.value(BodyPart::LeftShoulder, ComponentKind::Health) < 100.0);
        assert_eq!(
            h.log.count_where(|e| matches!(e.occurrence, Occurrence::ResourceShortfall { .. })),
            1
        );

        // A continuing shortfall is recorded only once.
        t.feed(&mut h.ctx(SystemId::Muscular));
        assert_eq!(h.log.len(), 1);
    }

    #[test]
    fn weight_bearing_fracture_disables_descendants_only() {
        let mut t = template(&BodyPart::ALL);
        let mut h = Harness::new();
        t.node_mut(BodyPart::LeftThigh).unwrap().set_flag(NodeStatus::FRACTURED);
        t.apply_weight_bearing(&mut h.ctx(SystemId::Muscular));
        assert!(t.has(BodyPart::LeftShin, NodeStatus::UNSUPPORTED));
        assert!(t.has(BodyPart::LeftFoot, NodeStatus::UNSUPPORTED));
        assert!(!t.has(BodyPart::RightShin, NodeStatus::UNSUPPORTED));
        assert!(!t.has(BodyPart::Pelvis, NodeStatus::UNSUPPORTED));

        t.node_mut(BodyPart::LeftThigh).unwrap().clear_flag(NodeStatus::FRACTURED);
        t.apply_weight_bearing(&mut h.ctx(SystemId::Muscular));
        assert_eq!(t.count(NodeStatus::UNSUPPORTED), 0);
        assert!(t.is_active(BodyPart::LeftFoot));
    }

    #[test]
    fn non_weight_bearing_fracture_leaves_descendants_alone() {
        let mut t = template(&BodyPart::ALL);
        let mut h = Harness::new();
        t.node_mut(BodyPart::LeftForearm).unwrap().set_flag(NodeStatus::FRACTURED);
        t.apply_weight_bearing(&mut h.ctx(SystemId::Muscular));
        assert!(!t.has(BodyPart::LeftHand, NodeStatus::UNSUPPORTED));
        assert!(t.is_active(BodyPart::LeftHand));
    }

    #[test]
    fn params_validation() {
        assert!(TemplateParams::default().validate().is_ok());
        assert!(TemplateParams::default().with_falloff(1.5).validate().is_err());
        let params = TemplateParams {
            negligible: -1.0,
            ..TemplateParams::default()
        };
        assert!(matches!(params.validate(), Err(SimError::InvalidConfig(_))));
    }
}
