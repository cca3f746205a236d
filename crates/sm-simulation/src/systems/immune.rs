use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sm_core::{BodyPart, Component, ComponentKind, Node, NodeStatus, ResourceKind, anatomy};

use crate::context::TickContext;
use crate::error::SimResult;
use crate::event::{BodyEvent, EffectKind, EventType};
use crate::history::Occurrence;
use crate::system::{BodySystem, SystemId};
use crate::template::{SystemTemplate, TemplateParams, check_fraction, check_non_negative};

/// Tunables for infection and toxin handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImmuneConfig {
    pub template: TemplateParams,
    pub max_immunity: f64,
    pub immunity_regen: f64,
    pub max_infection: f64,
    pub max_toxin: f64,
    /// Infection cleared per tick by full immunity with full energy.
    pub response: f64,
    /// Energy spent per point of infection fought.
    pub energy_per_infection: f64,
    /// Infection fraction above which a part is inflamed.
    pub inflammation_fraction: f64,
    /// Infection fraction above which the infection seeds neighbours.
    pub spread_fraction: f64,
    /// Share of the local infection passed to each seeded neighbour.
    pub spread_share: f64,
    pub inflammation_pain: f64,
    /// Immunity lost per tick per point of infection.
    pub infection_damage: f64,
    /// Toxin cleared per tick.
    pub toxin_decay: f64,
    /// Immunity lost per tick per point of toxin.
    pub toxin_damage: f64,
    /// Infection at or below which it counts as gone.
    pub clear_level: f64,
}

impl Default for ImmuneConfig {
    fn default() -> Self {
        Self {
            template: TemplateParams::default().with_defining(ComponentKind::Immunity),
            max_immunity: 100.0,
            immunity_regen: 0.5,
            max_infection: 100.0,
            max_toxin: 100.0,
            response: 2.0,
            energy_per_infection: 0.01,
            inflammation_fraction: 0.3,
            spread_fraction: 0.6,
            spread_share: 0.1,
            inflammation_pain: 10.0,
            infection_damage: 0.02,
            toxin_decay: 0.5,
            toxin_damage: 0.05,
            clear_level: 0.5,
        }
    }
}

impl ImmuneConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.template.validate()?;
        check_non_negative("immune.response", self.response)?;
        check_fraction("immune.inflammation_fraction", self.inflammation_fraction)?;
        check_fraction("immune.spread_fraction", self.spread_fraction)?;
        check_fraction("immune.spread_share", self.spread_share)?;
        check_non_negative("immune.toxin_decay", self.toxin_decay)?;
        check_non_negative("immune.clear_level", self.clear_level)
    }
}

/// Immune response: infection growth and clearance, toxins, inflammation.
#[derive(Debug)]
pub struct ImmuneSystem {
    config: ImmuneConfig,
    template: SystemTemplate,
    growth: BTreeMap<BodyPart, f64>,
    seeded: BTreeSet<BodyPart>,
}

impl ImmuneSystem {
    pub fn new(config: ImmuneConfig) -> Self {
        let nodes = BodyPart::ALL.iter().map(|&part| {
            Node::new(part)
                .with_component(
                    ComponentKind::Immunity,
                    Component::new(config.max_immunity, config.immunity_regen),
                )
                .with_component(
                    ComponentKind::Infection,
                    Component::empty(config.max_infection, 0.0),
                )
                .with_component(ComponentKind::Toxin, Component::empty(config.max_toxin, 0.0))
        });
        let template = SystemTemplate::new(SystemId::Immune, config.template.clone(), nodes);
        Self {
            config,
            template,
            growth: BTreeMap::new(),
            seeded: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &ImmuneConfig {
        &self.config
    }

    pub fn infection_level(&self, part: BodyPart) -> f64 {
        self.template.value(part, ComponentKind::Infection)
    }

    pub fn toxin_level(&self, part: BodyPart) -> f64 {
        self.template.value(part, ComponentKind::Toxin)
    }

    pub fn infected_count(&self) -> usize {
        self.template.count(NodeStatus::INFECTED)
    }

    /// Mean infection fraction over the body.
    ///
    /// Parts whose defences have collapsed still count with their full
    /// load, so this agrees with [`infected_count`](Self::infected_count).
    pub fn overall_infection(&self) -> f64 {
        let parts = self.template.parts();
        if parts.is_empty() {
            return 0.0;
        }
        let total: f64 = parts
            .iter()
            .map(|&p| self.template.fraction(p, ComponentKind::Infection))
            .sum();
        total / parts.len() as f64
    }

    pub fn is_inflamed(&self, part: BodyPart) -> bool {
        self.template.has(part, NodeStatus::INFLAMED)
    }

    pub fn growth_rate(&self, part: BodyPart) -> f64 {
        self.growth.get(&part).copied().unwrap_or(0.0)
    }

    fn infect(
        &mut self,
        part: BodyPart,
        severity: f64,
        growth_rate: f64,
        ctx: &mut TickContext<'_>,
    ) {
        let Some(node) = self.template.node_mut(part) else {
            return;
        };
        if let Some(infection) = node.component_mut(ComponentKind::Infection) {
            infection.increase(severity);
        }
        if node.value(ComponentKind::Infection) <= 0.0 {
            return;
        }
        if node.set_flag(NodeStatus::INFECTED) {
            ctx.record(Some(part), Occurrence::Infected, format!("{part} is infected"));
        }
        let rate = self.growth.entry(part).or_insert(0.0);
        *rate = rate.max(growth_rate);
    }

    fn cure(
        &mut self,
        part: BodyPart,
        power: f64,
        infection: bool,
        toxin: bool,
        ctx: &mut TickContext<'_>,
    ) {
        let Some(node) = self.template.node_mut(part) else {
            return;
        };
        if infection && let Some(c) = node.component_mut(ComponentKind::Infection) {
            c.decrease(power);
        }
        if toxin && let Some(c) = node.component_mut(ComponentKind::Toxin) {
            c.decrease(power);
        }
        self.settle(part, ctx);
    }

    /// Add toxin at `origin` and spread it outward with falloff.
    fn poison(&mut self, origin: BodyPart, severity: f64) {
        for (part, amount) in self.template.spread(origin, severity) {
            if let Some(node) = self.template.node_mut(part) {
                if let Some(toxin) = node.component_mut(ComponentKind::Toxin) {
                    toxin.increase(amount);
                }
                if node.value(ComponentKind::Toxin) > 0.0 {
                    node.set_flag(NodeStatus::POISONED);
                }
            }
        }
    }

    /// Clear infection and poisoning flags once their levels are gone.
    fn settle(&mut self, part: BodyPart, ctx: &mut TickContext<'_>) {
        let clear_level = self.config.clear_level;
        let Some(node) = self.template.node_mut(part) else {
            return;
        };
        if node.value(ComponentKind::Toxin) <= 0.0 {
            node.clear_flag(NodeStatus::POISONED);
        }
        if node.has(NodeStatus::INFECTED) && node.value(ComponentKind::Infection) <= clear_level {
            if let Some(c) = node.component_mut(ComponentKind::Infection) {
                c.set(0.0);
            }
            node.clear_flag(NodeStatus::INFECTED);
            node.clear_flag(NodeStatus::INFLAMED);
            self.growth.remove(&part);
            self.seeded.remove(&part);
            ctx.record(
                Some(part),
                Occurrence::InfectionCleared,
                format!("{part} infection clears"),
            );
        }
    }

    /// Energy available to the immune response this tick, as a fraction of demand.
    fn fund_response(&self, ctx: &mut TickContext<'_>) -> f64 {
        let burden: f64 = self
            .template
            .nodes()
            .map(|n| n.value(ComponentKind::Infection))
            .sum();
        let wanted = burden * self.config.energy_per_infection;
        if wanted > 0.0 {
            ctx.pool.remove(ResourceKind::Energy, wanted) / wanted
        } else {
            1.0
        }
    }

    fn progress(&mut self, ctx: &mut TickContext<'_>) {
        let cfg = self.config.clone();
        let energy = self.fund_response(ctx);
        let graph = anatomy();

        for part in self.template.parts().to_vec() {
            let growth = self.growth_rate(part);
            let immunity = if self.template.is_active(part) {
                self.template.fraction(part, ComponentKind::Immunity)
            } else {
                0.0
            };
            let Some(node) = self.template.node_mut(part) else {
                continue;
            };

            let toxin = node.value(ComponentKind::Toxin);
            let infection = node.value(ComponentKind::Infection);
            if let Some(defence) = node.component_mut(ComponentKind::Immunity) {
                defence.decrease(toxin * cfg.toxin_damage + infection * cfg.infection_damage);
            }
            if let Some(c) = node.component_mut(ComponentKind::Toxin) {
                c.decrease(cfg.toxin_decay);
            }

            if infection > 0.0 {
                let capacity = node
                    .component(ComponentKind::Infection)
                    .map_or(0.0, Component::max);
                let logistic = if capacity > 0.0 {
                    growth * infection * (1.0 - infection / capacity)
                } else {
                    0.0
                };
                let delta = logistic - cfg.response * immunity * energy;
                if let Some(c) = node.component_mut(ComponentKind::Infection) {
                    if delta >= 0.0 {
                        c.increase(delta);
                    } else {
                        c.decrease(-delta);
                    }
                }
            }

            let level = node.fraction(ComponentKind::Infection);
            if node.has(NodeStatus::INFECTED) && level >= cfg.inflammation_fraction {
                if node.set_flag(NodeStatus::INFLAMED) {
                    ctx.record(Some(part), Occurrence::Inflamed, format!("{part} is inflamed"));
                    ctx.emit(BodyEvent::Pain {
                        part,
                        intensity: cfg.inflammation_pain,
                    });
                }
            } else {
                node.clear_flag(NodeStatus::INFLAMED);
            }

            let current = node.value(ComponentKind::Infection);
            if level >= cfg.spread_fraction && self.seeded.insert(part) {
                tracing::debug!(%part, "infection spreading");
                for neighbor in graph.neighbors(part) {
                    ctx.emit(BodyEvent::Infect {
                        part: neighbor,
                        severity: current * cfg.spread_share,
                        growth_rate: growth,
                    });
                }
            }
            self.settle(part, ctx);
        }
    }
}

impl Default for ImmuneSystem {
    fn default() -> Self {
        Self::new(ImmuneConfig::default())
    }
}

impl BodySystem for ImmuneSystem {
    fn id(&self) -> SystemId {
        SystemId::Immune
    }

    fn subscriptions(&self) -> Vec<EventType> {
        vec![
            EventType::Infect,
            EventType::Cure,
            EventType::Poison,
            EventType::PropagateEffect,
        ]
    }

    fn template(&self) -> &SystemTemplate {
        &self.template
    }

    fn handle_message(&mut self, event: &BodyEvent, ctx: &mut TickContext<'_>) {
        match *event {
            BodyEvent::Infect {
                part,
                severity,
                growth_rate,
            } => self.infect(part, severity, growth_rate, ctx),
            BodyEvent::Cure {
                part,
                power,
                cures_infection,
                cures_toxin,
            } => self.cure(part, power, cures_infection, cures_toxin, ctx),
            BodyEvent::Poison { part, severity } => self.poison(part, severity),
            BodyEvent::PropagateEffect { origin, effect } if effect.kind == EffectKind::Toxin => {
                self.poison(origin, effect.magnitude);
            }
            _ => {}
        }
    }

    fn metabolic_update(&mut self, ctx: &mut TickContext<'_>) {
        self.template.feed(ctx);
        self.progress(ctx);
        self.template.regenerate_all();
        self.template.refresh_all(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::Harness;

    fn infect(part: BodyPart, severity: f64, growth_rate: f64) -> BodyEvent {
        BodyEvent::Infect {
            part,
            severity,
            growth_rate,
        }
    }

    #[test]
    fn mild_infection_is_fought_off() {
        let mut h = Harness::new();
        let mut immune = ImmuneSystem::default();
        immune.handle_message(&infect(BodyPart::LeftHand, 5.0, 0.05), &mut h.ctx(SystemId::Immune));
        assert_eq!(immune.infected_count(), 1);
        for _ in 0..10 {
            immune.metabolic_update(&mut h.ctx(SystemId::Immune));
        }
        assert_eq!(immune.infection_level(BodyPart::LeftHand), 0.0);
        assert_eq!(immune.infected_count(), 0);
        assert_eq!(h.log.count_where(|e| e.occurrence == Occurrence::InfectionCleared), 1);
    }

    #[test]
    fn aggressive_infection_inflames_and_spreads() {
        let mut h = Harness::new();
        h.hub.register_listener(SystemId::Immune, EventType::Infect);
        h.hub.register_listener(SystemId::Nervous, EventType::Pain);
        let mut immune = ImmuneSystem::default();
        immune.handle_message(
            &infect(BodyPart::LeftForearm, 70.0, 0.5),
            &mut h.ctx(SystemId::Immune),
        );
        immune.metabolic_update(&mut h.ctx(SystemId::Immune));
        assert!(immune.is_inflamed(BodyPart::LeftForearm));
        assert_eq!(h.hub.pending(SystemId::Nervous), 1);
        // Upper arm and hand are seeded.
        assert_eq!(h.hub.pending(SystemId::Immune), 2);

        immune.drain_events(&mut h.ctx(SystemId::Immune));
        assert!(immune.infection_level(BodyPart::LeftHand) > 0.0);
        assert_eq!(immune.infected_count(), 3);
    }

    #[test]
    fn starved_response_lets_infection_grow() {
        let mut h = Harness::new();
        h.pool.remove(ResourceKind::Energy, 1_000.0);
        let mut immune = ImmuneSystem::default();
        immune.handle_message(&infect(BodyPart::Chest, 10.0, 0.2), &mut h.ctx(SystemId::Immune));
        immune.metabolic_update(&mut h.ctx(SystemId::Immune));
        assert!(immune.infection_level(BodyPart::Chest) > 10.0);
    }

    #[test]
    fn poison_spreads_with_falloff_and_decays() {
        let mut h = Harness::new();
        let mut immune = ImmuneSystem::default();
        immune.handle_message(
            &BodyEvent::Poison {
                part: BodyPart::Abdomen,
                severity: 20.0,
            },
            &mut h.ctx(SystemId::Immune),
        );
        let here = immune.toxin_level(BodyPart::Abdomen);
        let near = immune.toxin_level(BodyPart::Pelvis);
        let far = immune.toxin_level(BodyPart::LeftThigh);
        assert!(here > near && near > far && far > 0.0);

        immune.metabolic_update(&mut h.ctx(SystemId::Immune));
        assert!(immune.toxin_level(BodyPart::Abdomen) < here);
        assert!(immune.template().value(BodyPart::Abdomen, ComponentKind::Immunity) < 100.0);
    }

    #[test]
    fn cure_targets_what_it_names() {
        let mut h = Harness::new();
        let mut immune = ImmuneSystem::default();
        let mut ctx = h.ctx(SystemId::Immune);
        immune.handle_message(&infect(BodyPart::Neck, 30.0, 0.1), &mut ctx);
        immune.handle_message(
            &BodyEvent::Poison {
                part: BodyPart::Neck,
                severity: 30.0,
            },
            &mut ctx,
        );
        immune.handle_message(
            &BodyEvent::Cure {
                part: BodyPart::Neck,
                power: 50.0,
                cures_infection: true,
                cures_toxin: false,
            },
            &mut ctx,
        );
        assert_eq!(immune.infection_level(BodyPart::Neck), 0.0);
        assert!((immune.toxin_level(BodyPart::Neck) - 30.0).abs() < 1e-9);
        assert_eq!(immune.infected_count(), 0);
    }

    #[test]
    fn collapsed_defences_still_count_towards_overall_infection() {
        let mut h = Harness::new();
        let mut immune = ImmuneSystem::default();
        immune.handle_message(&infect(BodyPart::Pelvis, 38.0, 0.0), &mut h.ctx(SystemId::Immune));
        let before = immune.overall_infection();
        assert!(before > 0.0);

        immune
            .template
            .node_mut(BodyPart::Pelvis)
            .and_then(|n| n.component_mut(ComponentKind::Immunity))
            .unwrap()
            .set(0.0);
        immune.template.refresh(BodyPart::Pelvis, &mut h.ctx(SystemId::Immune));
        assert!(!immune.template.is_active(BodyPart::Pelvis));
        assert_eq!(immune.infected_count(), 1);
        assert!((immune.overall_infection() - before).abs() < 1e-12);
    }
}
