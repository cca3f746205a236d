use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sm_core::{BodyPart, Component, ComponentKind, Node, NodeStatus, ResourceKind, anatomy};

use crate::context::TickContext;
use crate::error::SimResult;
use crate::event::{BodyEvent, EffectKind, EventType};
use crate::history::Occurrence;
use crate::system::{BodySystem, SystemId};
use crate::template::{SystemTemplate, TemplateParams, check_fraction, check_non_negative};

/// The part housing the brain; signal originates here.
const BRAIN: BodyPart = BodyPart::Head;

/// Tunables for nerves, pain and shock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NervousConfig {
    pub template: TemplateParams,
    pub max_health: f64,
    pub health_regen: f64,
    pub max_signal: f64,
    pub max_pain: f64,
    /// Pain lost per tick.
    pub pain_decay: f64,
    /// Signal below which a part counts as cut off.
    pub signal_threshold: f64,
    /// Shock lost per tick.
    pub shock_decay: f64,
    pub max_shock: f64,
    /// Shock added per unit of hypoxia severity.
    pub hypoxia_shock: f64,
    /// Brain damage per unit of hypoxia severity.
    pub hypoxia_brain_damage: f64,
    /// Share of incoming damage the nerves take.
    pub damage_share: f64,
    /// Pain per point of damage.
    pub damage_pain: f64,
    /// Pain per point of impact magnitude.
    pub impact_pain: f64,
    pub brain_oxygen_need: f64,
    pub brain_glucose_need: f64,
}

impl Default for NervousConfig {
    fn default() -> Self {
        Self {
            template: TemplateParams::default(),
            max_health: 100.0,
            health_regen: 0.3,
            max_signal: 100.0,
            max_pain: 100.0,
            pain_decay: 2.0,
            signal_threshold: 10.0,
            shock_decay: 0.05,
            max_shock: 0.9,
            hypoxia_shock: 0.3,
            hypoxia_brain_damage: 2.0,
            damage_share: 0.5,
            damage_pain: 0.5,
            impact_pain: 0.5,
            brain_oxygen_need: 0.1,
            brain_glucose_need: 0.05,
        }
    }
}

impl NervousConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.template.validate()?;
        check_non_negative("nervous.max_signal", self.max_signal)?;
        check_non_negative("nervous.pain_decay", self.pain_decay)?;
        check_non_negative("nervous.signal_threshold", self.signal_threshold)?;
        check_fraction("nervous.max_shock", self.max_shock)?;
        check_non_negative("nervous.shock_decay", self.shock_decay)?;
        check_fraction("nervous.damage_share", self.damage_share)
    }
}

/// Nerves: signal routing from the brain, pain and shock.
#[derive(Debug)]
pub struct NervousSystem {
    config: NervousConfig,
    template: SystemTemplate,
    shock: f64,
    /// Parts in the order signal reaches them, each with the part feeding it.
    routing: Vec<(BodyPart, Option<BodyPart>)>,
}

impl NervousSystem {
    pub fn new(config: NervousConfig) -> Self {
        let nodes = BodyPart::ALL.iter().map(|&part| {
            let node = Node::new(part)
                .with_component(
                    ComponentKind::Health,
                    Component::new(config.max_health, config.health_regen),
                )
                .with_component(ComponentKind::Signal, Component::new(config.max_signal, 0.0))
                .with_component(
                    ComponentKind::Pain,
                    Component::empty(config.max_pain, -config.pain_decay),
                );
            if part == BRAIN {
                node.with_need(ResourceKind::Oxygen, config.brain_oxygen_need)
                    .with_need(ResourceKind::Glucose, config.brain_glucose_need)
            } else {
                node
            }
        });
        let template = SystemTemplate::new(SystemId::Nervous, config.template.clone(), nodes);
        Self {
            config,
            template,
            shock: 0.0,
            routing: signal_routing(),
        }
    }

    pub fn config(&self) -> &NervousConfig {
        &self.config
    }

    pub fn signal_strength(&self, part: BodyPart) -> f64 {
        self.template.value(part, ComponentKind::Signal)
    }

    pub fn is_severed(&self, part: BodyPart) -> bool {
        self.template.has(part, NodeStatus::SEVERED)
    }

    pub fn severed_count(&self) -> usize {
        self.template.count(NodeStatus::SEVERED)
    }

    pub fn pain(&self, part: BodyPart) -> f64 {
        self.template.value(part, ComponentKind::Pain)
    }

    /// Pain felt across the body; severed or dead parts feel nothing.
    pub fn total_pain(&self) -> f64 {
        self.template.aggregate(ComponentKind::Pain)
    }

    pub fn shock_level(&self) -> f64 {
        self.shock
    }

    pub fn brain_active(&self) -> bool {
        self.template.is_active(BRAIN)
    }

    fn add_pain(&mut self, part: BodyPart, amount: f64) {
        if let Some(pain) = self
            .template
            .node_mut(part)
            .and_then(|n| n.component_mut(ComponentKind::Pain))
        {
            pain.increase(amount);
        }
    }

    fn sever(&mut self, part: BodyPart, ctx: &mut TickContext<'_>) {
        let Some(node) = self.template.node_mut(part) else {
            return;
        };
        if !node.set_flag(NodeStatus::SEVERED) {
            ctx.record(
                Some(part),
                Occurrence::NoNewEffect,
                format!("{part} nerve is already severed"),
            );
            return;
        }
        tracing::info!(%part, "nerve severed");
        ctx.record(Some(part), Occurrence::NerveSevered, format!("{part} nerve is severed"));
        self.template.refresh(part, ctx);
    }

    fn repair(&mut self, part: BodyPart, ctx: &mut TickContext<'_>) {
        let Some(node) = self.template.node_mut(part) else {
            return;
        };
        if !node.clear_flag(NodeStatus::SEVERED) {
            ctx.record(Some(part), Occurrence::NoNewEffect, format!("{part} nerve is intact"));
            return;
        }
        tracing::info!(%part, "nerve repaired");
        ctx.record(Some(part), Occurrence::NerveRepaired, format!("{part} nerve is repaired"));
        self.template.refresh(part, ctx);
    }

    fn add_shock(&mut self, amount: f64) {
        self.shock = (self.shock + amount.max(0.0)).min(self.config.max_shock);
    }

    /// Recompute signal from the brain outward and report threshold crossings.
    fn route_signal(&mut self, ctx: &mut TickContext<'_>) {
        let threshold = self.config.signal_threshold;
        let damping = 1.0 - self.shock;
        let mut intact: BTreeMap<BodyPart, f64> = BTreeMap::new();

        for &(part, feeder) in &self.routing {
            let own = if self.template.is_active(part) {
                self.template.fraction(part, ComponentKind::Health)
            } else {
                0.0
            };
            let upstream = feeder.map_or(1.0, |f| intact.get(&f).copied().unwrap_or(0.0));
            intact.insert(part, upstream * own);
        }

        for (part, fraction) in intact {
            let Some(signal) = self
                .template
                .node_mut(part)
                .and_then(|n| n.component_mut(ComponentKind::Signal))
            else {
                continue;
            };
            let before = signal.current();
            signal.set(signal.max() * fraction * damping);
            let after = signal.current();

            if before >= threshold && after < threshold {
                tracing::debug!(%part, "signal lost");
                ctx.record(Some(part), Occurrence::SignalLost, format!("{part} loses signal"));
                ctx.emit(BodyEvent::SignalLost { part });
            } else if before < threshold && after >= threshold {
                tracing::debug!(%part, "signal restored");
                ctx.record(
                    Some(part),
                    Occurrence::SignalRestored,
                    format!("{part} regains signal"),
                );
                ctx.emit(BodyEvent::SignalRestored { part });
            }
        }
    }
}

/// Signal path: brain first, down the spine to the root, then outward.
fn signal_routing() -> Vec<(BodyPart, Option<BodyPart>)> {
    let graph = anatomy();
    let mut spine = vec![BRAIN];
    spine.extend(graph.upstream(BRAIN));

    let mut routing: Vec<(BodyPart, Option<BodyPart>)> = spine
        .iter()
        .enumerate()
        .map(|(i, &part)| (part, i.checked_sub(1).map(|j| spine[j])))
        .collect();
    for part in graph.outward_order() {
        if !spine.contains(&part) {
            routing.push((part, graph.parent(part)));
        }
    }
    routing
}

impl Default for NervousSystem {
    fn default() -> Self {
        Self::new(NervousConfig::default())
    }
}

impl BodySystem for NervousSystem {
    fn id(&self) -> SystemId {
        SystemId::Nervous
    }

    fn subscriptions(&self) -> Vec<EventType> {
        vec![
            EventType::Damage,
            EventType::Heal,
            EventType::PropagateEffect,
            EventType::SeverNerve,
            EventType::RepairNerve,
            EventType::Pain,
            EventType::Shock,
            EventType::Hypoxia,
        ]
    }

    fn template(&self) -> &SystemTemplate {
        &self.template
    }

    fn handle_message(&mut self, event: &BodyEvent, ctx: &mut TickContext<'_>) {
        match *event {
            BodyEvent::Damage { part, amount } => {
                self.template
                    .apply_damage(part, amount * self.config.damage_share, ctx);
                self.add_pain(part, amount * self.config.damage_pain);
            }
            BodyEvent::Heal { part, amount } => {
                self.template.apply_heal(part, amount, ctx);
            }
            BodyEvent::PropagateEffect { origin, effect } if effect.kind == EffectKind::Impact => {
                for (part, magnitude) in self.template.spread(origin, effect.magnitude) {
                    self.add_pain(part, magnitude * self.config.impact_pain);
                }
            }
            BodyEvent::SeverNerve { part } => self.sever(part, ctx),
            BodyEvent::RepairNerve { part } => self.repair(part, ctx),
            BodyEvent::Pain { part, intensity } => self.add_pain(part, intensity),
            BodyEvent::Shock { intensity } => self.add_shock(intensity),
            BodyEvent::Hypoxia { severity } => {
                self.add_shock(severity * self.config.hypoxia_shock);
                self.template
                    .apply_damage(BRAIN, severity.max(0.0) * self.config.hypoxia_brain_damage, ctx);
            }
            _ => {}
        }
    }

    fn metabolic_update(&mut self, ctx: &mut TickContext<'_>) {
        self.template.feed(ctx);
        self.template.regenerate_all();
        self.template.refresh_all(ctx);
        self.route_signal(ctx);
        self.shock = (self.shock - self.config.shock_decay).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::Harness;

    #[test]
    fn routing_starts_at_the_brain() {
        let routing = signal_routing();
        assert_eq!(routing[0], (BodyPart::Head, None));
        assert_eq!(routing[1], (BodyPart::Neck, Some(BodyPart::Head)));
        assert_eq!(routing[2], (BodyPart::Chest, Some(BodyPart::Neck)));
        assert_eq!(routing.len(), BodyPart::ALL.len());
    }

    #[test]
    fn severing_cuts_signal_downstream_only() {
        let mut h = Harness::new();
        h.hub.register_listener(SystemId::Muscular, EventType::SignalLost);
        let mut nerves = NervousSystem::default();
        nerves.handle_message(
            &BodyEvent::SeverNerve {
                part: BodyPart::LeftForearm,
            },
            &mut h.ctx(SystemId::Nervous),
        );
        nerves.metabolic_update(&mut h.ctx(SystemId::Nervous));

        assert!(nerves.signal_strength(BodyPart::LeftHand) < 1e-9);
        assert!(nerves.signal_strength(BodyPart::LeftForearm) < 1e-9);
        assert!((nerves.signal_strength(BodyPart::LeftUpperArm) - 100.0).abs() < 1e-9);
        assert!((nerves.signal_strength(BodyPart::RightHand) - 100.0).abs() < 1e-9);
        assert_eq!(h.hub.pending(SystemId::Muscular), 2);
    }

    #[test]
    fn severing_twice_has_no_new_effect() {
        let mut h = Harness::new();
        let mut nerves = NervousSystem::default();
        let mut ctx = h.ctx(SystemId::Nervous);
        nerves.handle_message(&BodyEvent::SeverNerve { part: BodyPart::RightShin }, &mut ctx);
        nerves.handle_message(&BodyEvent::SeverNerve { part: BodyPart::RightShin }, &mut ctx);
        assert_eq!(nerves.severed_count(), 1);
        assert_eq!(h.log.count_where(|e| e.occurrence == Occurrence::NerveSevered), 1);
        assert_eq!(h.log.count_where(|e| e.occurrence == Occurrence::NoNewEffect), 1);
    }

    #[test]
    fn repair_restores_signal() {
        let mut h = Harness::new();
        h.hub.register_listener(SystemId::Muscular, EventType::SignalRestored);
        let mut nerves = NervousSystem::default();
        nerves.handle_message(
            &BodyEvent::SeverNerve {
                part: BodyPart::LeftThigh,
            },
            &mut h.ctx(SystemId::Nervous),
        );
        nerves.metabolic_update(&mut h.ctx(SystemId::Nervous));
        nerves.handle_message(
            &BodyEvent::RepairNerve {
                part: BodyPart::LeftThigh,
            },
            &mut h.ctx(SystemId::Nervous),
        );
        nerves.metabolic_update(&mut h.ctx(SystemId::Nervous));
        assert!(nerves.signal_strength(BodyPart::LeftFoot) > 90.0);
        assert_eq!(h.hub.pending(SystemId::Muscular), 3);
    }

    #[test]
    fn shock_dampens_and_decays() {
        let mut h = Harness::new();
        let mut nerves = NervousSystem::default();
        nerves.handle_message(&BodyEvent::Shock { intensity: 0.5 }, &mut h.ctx(SystemId::Nervous));
        nerves.metabolic_update(&mut h.ctx(SystemId::Nervous));
        assert!((nerves.signal_strength(BodyPart::Chest) - 50.0).abs() < 1e-9);
        assert!(nerves.shock_level() < 0.5);

        nerves.handle_message(&BodyEvent::Shock { intensity: 5.0 }, &mut h.ctx(SystemId::Nervous));
        assert!((nerves.shock_level() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn pain_accumulates_then_fades() {
        let mut h = Harness::new();
        let mut nerves = NervousSystem::default();
        nerves.handle_message(
            &BodyEvent::Pain {
                part: BodyPart::LeftFoot,
                intensity: 10.0,
            },
            &mut h.ctx(SystemId::Nervous),
        );
        nerves.handle_message(
            &BodyEvent::Pain {
                part: BodyPart::LeftFoot,
                intensity: 10.0,
            },
            &mut h.ctx(SystemId::Nervous),
        );
        assert!((nerves.pain(BodyPart::LeftFoot) - 20.0).abs() < 1e-9);
        nerves.metabolic_update(&mut h.ctx(SystemId::Nervous));
        assert!((nerves.pain(BodyPart::LeftFoot) - 18.0).abs() < 1e-9);
        assert!((nerves.total_pain() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn severed_parts_feel_nothing() {
        let mut h = Harness::new();
        let mut nerves = NervousSystem::default();
        let mut ctx = h.ctx(SystemId::Nervous);
        nerves.handle_message(
            &BodyEvent::Pain {
                part: BodyPart::RightHand,
                intensity: 30.0,
            },
            &mut ctx,
        );
        nerves.handle_message(&BodyEvent::SeverNerve { part: BodyPart::RightHand }, &mut ctx);
        assert_eq!(nerves.total_pain(), 0.0);
    }
}
