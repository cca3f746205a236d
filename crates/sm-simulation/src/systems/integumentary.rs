use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sm_core::{BodyPart, Component, ComponentKind, Node, NodeStatus};

use crate::context::TickContext;
use crate::error::{SimError, SimResult};
use crate::event::{BodyEvent, EffectKind, EventType};
use crate::history::Occurrence;
use crate::system::{BodySystem, SystemId};
use crate::template::{SystemTemplate, TemplateParams, check_fraction, check_non_negative};

/// Tunables for skin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegumentaryConfig {
    pub template: TemplateParams,
    pub max_health: f64,
    pub health_regen: f64,
    /// Share of incoming damage the skin takes.
    pub damage_share: f64,
    /// Health fraction below which the skin is broken open.
    pub wound_fraction: f64,
    /// Burn intensity at which a burn is second degree.
    pub second_degree: f64,
    /// Burn intensity at which a burn is third degree.
    pub third_degree: f64,
    /// Skin health lost per point of burn intensity.
    pub burn_damage_share: f64,
    /// Share of a third-degree burn passed on as damage to deeper tissue.
    pub deep_damage_share: f64,
    pub burn_infection_severity: f64,
    pub infection_growth: f64,
    /// Exposure gained per tick by an open, unbandaged wound.
    pub exposure_rate: f64,
    /// Exposure at which an open wound becomes infected.
    pub exposure_threshold: f64,
    pub wound_infection_severity: f64,
    pub max_exposure: f64,
}

impl Default for IntegumentaryConfig {
    fn default() -> Self {
        Self {
            template: TemplateParams::default(),
            max_health: 100.0,
            health_regen: 0.3,
            damage_share: 0.5,
            wound_fraction: 0.5,
            second_degree: 20.0,
            third_degree: 50.0,
            burn_damage_share: 1.0,
            deep_damage_share: 0.5,
            burn_infection_severity: 20.0,
            infection_growth: 0.1,
            exposure_rate: 2.0,
            exposure_threshold: 20.0,
            wound_infection_severity: 10.0,
            max_exposure: 100.0,
        }
    }
}

impl IntegumentaryConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.template.validate()?;
        check_fraction("integumentary.damage_share", self.damage_share)?;
        check_fraction("integumentary.wound_fraction", self.wound_fraction)?;
        check_non_negative("integumentary.second_degree", self.second_degree)?;
        if self.third_degree < self.second_degree {
            return Err(SimError::InvalidConfig(
                "integumentary.third_degree must not be below second_degree".to_string(),
            ));
        }
        check_fraction("integumentary.deep_damage_share", self.deep_damage_share)?;
        check_non_negative("integumentary.exposure_rate", self.exposure_rate)?;
        check_non_negative("integumentary.exposure_threshold", self.exposure_threshold)
    }
}

/// Skin: wounds, burns, bandages and exposure.
#[derive(Debug)]
pub struct IntegumentarySystem {
    config: IntegumentaryConfig,
    template: SystemTemplate,
    burns: BTreeMap<BodyPart, u8>,
    exposed: BTreeSet<BodyPart>,
}

impl IntegumentarySystem {
    pub fn new(config: IntegumentaryConfig) -> Self {
        let nodes = BodyPart::ALL.iter().map(|&part| {
            Node::new(part)
                .with_component(
                    ComponentKind::Health,
                    Component::new(config.max_health, config.health_regen),
                )
                .with_component(
                    ComponentKind::Exposure,
                    Component::empty(config.max_exposure, 0.0),
                )
        });
        let template = SystemTemplate::new(SystemId::Integumentary, config.template.clone(), nodes);
        Self {
            config,
            template,
            burns: BTreeMap::new(),
            exposed: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &IntegumentaryConfig {
        &self.config
    }

    pub fn skin_integrity(&self, part: BodyPart) -> f64 {
        self.template.contribution(part, ComponentKind::Health)
    }

    /// Worst burn the part has suffered since it last healed; 0 when unburned.
    pub fn burn_degree(&self, part: BodyPart) -> u8 {
        self.burns.get(&part).copied().unwrap_or(0)
    }

    pub fn open_wound_count(&self) -> usize {
        self.template.count(NodeStatus::WOUNDED)
    }

    pub fn is_wounded(&self, part: BodyPart) -> bool {
        self.template.has(part, NodeStatus::WOUNDED)
    }

    pub fn is_bandaged(&self, part: BodyPart) -> bool {
        self.template.has(part, NodeStatus::BANDAGED)
    }

    pub fn exposure(&self, part: BodyPart) -> f64 {
        self.template.value(part, ComponentKind::Exposure)
    }

    fn degree_for(&self, intensity: f64) -> u8 {
        if intensity >= self.config.third_degree {
            3
        } else if intensity >= self.config.second_degree {
            2
        } else if intensity > 0.0 {
            1
        } else {
            0
        }
    }

    fn open_wound(&mut self, part: BodyPart, ctx: &mut TickContext<'_>) {
        if let Some(node) = self.template.node_mut(part)
            && node.set_flag(NodeStatus::WOUNDED)
        {
            ctx.record(Some(part), Occurrence::WoundOpened, format!("{part} skin is broken"));
        }
    }

    fn close_wound(&mut self, part: BodyPart, ctx: &mut TickContext<'_>) {
        let Some(node) = self.template.node_mut(part) else {
            return;
        };
        if !node.clear_flag(NodeStatus::WOUNDED) {
            return;
        }
        if let Some(exposure) = node.component_mut(ComponentKind::Exposure) {
            exposure.set(0.0);
        }
        self.exposed.remove(&part);
        ctx.record(Some(part), Occurrence::WoundClosed, format!("{part} skin closes"));
    }

    /// Close every wound whose skin has grown back past the wound fraction.
    fn close_healed_wounds(&mut self, ctx: &mut TickContext<'_>) {
        for part in self.template.parts_with(NodeStatus::WOUNDED) {
            if self.template.fraction(part, ComponentKind::Health) >= self.config.wound_fraction {
                self.close_wound(part, ctx);
            }
        }
    }

    fn damage(&mut self, part: BodyPart, amount: f64, ctx: &mut TickContext<'_>) {
        if !self.template.has_node(part) {
            return;
        }
        self.template
            .apply_damage(part, amount * self.config.damage_share, ctx);
        if self.template.fraction(part, ComponentKind::Health) < self.config.wound_fraction {
            self.open_wound(part, ctx);
        }
    }

    fn heal(&mut self, part: BodyPart, amount: f64, ctx: &mut TickContext<'_>) {
        self.template.apply_heal(part, amount, ctx);
        let fraction = self.template.fraction(part, ComponentKind::Health);
        if fraction >= self.config.wound_fraction {
            self.close_wound(part, ctx);
        }
        if fraction >= 1.0 && self.burns.remove(&part).is_some()
            && let Some(node) = self.template.node_mut(part)
        {
            node.clear_flag(NodeStatus::BURNED);
        }
    }

    fn burn(&mut self, part: BodyPart, intensity: f64, ctx: &mut TickContext<'_>) {
        let degree = self.degree_for(intensity);
        if degree == 0 || !self.template.has_node(part) {
            return;
        }
        self.template
            .apply_damage(part, intensity * self.config.burn_damage_share, ctx);
        if let Some(node) = self.template.node_mut(part) {
            node.set_flag(NodeStatus::BURNED);
        }
        let worst = self.burns.entry(part).or_insert(0);
        *worst = (*worst).max(degree);

        tracing::debug!(%part, degree, "burn");
        ctx.record(
            Some(part),
            Occurrence::Burned { degree },
            format!("{part} suffers a degree {degree} burn"),
        );
        if degree >= 2 {
            self.open_wound(part, ctx);
        }
        if degree >= 3 {
            ctx.emit(BodyEvent::Damage {
                part,
                amount: intensity * self.config.deep_damage_share,
            });
            ctx.emit(BodyEvent::Infect {
                part,
                severity: self.config.burn_infection_severity,
                growth_rate: self.config.infection_growth,
            });
        }
    }

    fn set_bandage(&mut self, part: BodyPart, on: bool, ctx: &mut TickContext<'_>) {
        let Some(node) = self.template.node_mut(part) else {
            return;
        };
        let changed = if on {
            node.set_flag(NodeStatus::BANDAGED)
        } else {
            node.clear_flag(NodeStatus::BANDAGED)
        };
        if !changed {
            let state = if on { "already" } else { "not" };
            ctx.record(Some(part), Occurrence::NoNewEffect, format!("{part} is {state} bandaged"));
        }
    }

    /// Open wounds gather dirt; bandaged ones slowly clean up.
    fn expose_wounds(&mut self, ctx: &mut TickContext<'_>) {
        let cfg = self.config.clone();
        for part in self.template.parts_with(NodeStatus::WOUNDED) {
            let bandaged = self.is_bandaged(part);
            let Some(exposure) = self
                .template
                .node_mut(part)
                .and_then(|n| n.component_mut(ComponentKind::Exposure))
            else {
                continue;
            };
            if bandaged {
                exposure.decrease(cfg.exposure_rate);
                continue;
            }
            exposure.increase(cfg.exposure_rate);
            if exposure.current() >= cfg.exposure_threshold && self.exposed.insert(part) {
                tracing::debug!(%part, "open wound contaminated");
                ctx.emit(BodyEvent::Infect {
                    part,
                    severity: cfg.wound_infection_severity,
                    growth_rate: cfg.infection_growth,
                });
            }
        }
    }
}

impl Default for IntegumentarySystem {
    fn default() -> Self {
        Self::new(IntegumentaryConfig::default())
    }
}

impl BodySystem for IntegumentarySystem {
    fn id(&self) -> SystemId {
        SystemId::Integumentary
    }

    /// Damage is not queued here: the body delivers hits to the skin directly.
    fn subscriptions(&self) -> Vec<EventType> {
        vec![
            EventType::Heal,
            EventType::PropagateEffect,
            EventType::Burn,
            EventType::Bandage,
            EventType::RemoveBandage,
        ]
    }

    fn template(&self) -> &SystemTemplate {
        &self.template
    }

    fn handle_message(&mut self, event: &BodyEvent, ctx: &mut TickContext<'_>) {
        match *event {
            BodyEvent::Damage { part, amount } => self.damage(part, amount, ctx),
            BodyEvent::Heal { part, amount } => self.heal(part, amount, ctx),
            BodyEvent::Burn { part, intensity } => self.burn(part, intensity, ctx),
            BodyEvent::PropagateEffect { origin, effect } if effect.kind == EffectKind::Heat => {
                for (part, magnitude) in self.template.spread(origin, effect.magnitude) {
                    self.burn(part, magnitude, ctx);
                }
            }
            BodyEvent::Bandage { part } => self.set_bandage(part, true, ctx),
            BodyEvent::RemoveBandage { part } => self.set_bandage(part, false, ctx),
            _ => {}
        }
    }

    fn metabolic_update(&mut self, ctx: &mut TickContext<'_>) {
        self.template.feed(ctx);
        self.template.regenerate_all();
        self.close_healed_wounds(ctx);
        self.expose_wounds(ctx);
        self.template.refresh_all(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::Harness;

    fn listening_harness() -> Harness {
        let mut h = Harness::new();
        h.hub.register_listener(SystemId::Immune, EventType::Infect);
        h.hub.register_listener(SystemId::Skeletal, EventType::Damage);
        h
    }

    #[test]
    fn burn_degrees_follow_intensity() {
        let mut h = Harness::new();
        let mut skin = IntegumentarySystem::default();
        let mut ctx = h.ctx(SystemId::Integumentary);
        skin.handle_message(
            &BodyEvent::Burn {
                part: BodyPart::LeftHand,
                intensity: 10.0,
            },
            &mut ctx,
        );
        skin.handle_message(
            &BodyEvent::Burn {
                part: BodyPart::RightHand,
                intensity: 30.0,
            },
            &mut ctx,
        );
        skin.handle_message(&BodyEvent::Burn { part: BodyPart::Chest, intensity: 60.0 }, &mut ctx);
        assert_eq!(skin.burn_degree(BodyPart::LeftHand), 1);
        assert_eq!(skin.burn_degree(BodyPart::RightHand), 2);
        assert_eq!(skin.burn_degree(BodyPart::Chest), 3);
        assert_eq!(skin.burn_degree(BodyPart::Head), 0);
        assert!(!skin.is_wounded(BodyPart::LeftHand));
        assert!(skin.is_wounded(BodyPart::RightHand));
    }

    #[test]
    fn third_degree_burn_reaches_deeper_tissue() {
        let mut h = listening_harness();
        let mut skin = IntegumentarySystem::default();
        skin.handle_message(
            &BodyEvent::Burn {
                part: BodyPart::LeftThigh,
                intensity: 60.0,
            },
            &mut h.ctx(SystemId::Integumentary),
        );
        assert_eq!(h.hub.pending(SystemId::Skeletal), 1);
        assert_eq!(h.hub.pending(SystemId::Immune), 1);
    }

    #[test]
    fn open_wound_infects_once() {
        let mut h = listening_harness();
        let mut skin = IntegumentarySystem::default();
        skin.handle_message(
            &BodyEvent::Damage {
                part: BodyPart::LeftForearm,
                amount: 120.0,
            },
            &mut h.ctx(SystemId::Integumentary),
        );
        assert!(skin.is_wounded(BodyPart::LeftForearm));
        for _ in 0..30 {
            skin.metabolic_update(&mut h.ctx(SystemId::Integumentary));
        }
        assert_eq!(h.hub.pending(SystemId::Immune), 1);
    }

    #[test]
    fn regrown_skin_closes_the_wound() {
        let mut h = Harness::new();
        let mut skin = IntegumentarySystem::default();
        skin.handle_message(
            &BodyEvent::Damage {
                part: BodyPart::LeftForearm,
                amount: 120.0,
            },
            &mut h.ctx(SystemId::Integumentary),
        );
        assert!(skin.is_wounded(BodyPart::LeftForearm));
        for _ in 0..40 {
            skin.metabolic_update(&mut h.ctx(SystemId::Integumentary));
        }
        assert!(!skin.is_wounded(BodyPart::LeftForearm));
        assert_eq!(skin.exposure(BodyPart::LeftForearm), 0.0);
        assert_eq!(h.log.count_where(|e| e.occurrence == Occurrence::WoundClosed), 1);
    }

    #[test]
    fn bandage_keeps_wound_clean() {
        let mut h = listening_harness();
        let mut skin = IntegumentarySystem::default();
        let mut ctx = h.ctx(SystemId::Integumentary);
        skin.handle_message(
            &BodyEvent::Damage {
                part: BodyPart::LeftForearm,
                amount: 120.0,
            },
            &mut ctx,
        );
        skin.handle_message(&BodyEvent::Bandage { part: BodyPart::LeftForearm }, &mut ctx);
        for _ in 0..30 {
            skin.metabolic_update(&mut ctx);
        }
        assert_eq!(skin.exposure(BodyPart::LeftForearm), 0.0);
        assert_eq!(h.hub.pending(SystemId::Immune), 0);
    }

    #[test]
    fn double_bandage_is_no_new_effect() {
        let mut h = Harness::new();
        let mut skin = IntegumentarySystem::default();
        let mut ctx = h.ctx(SystemId::Integumentary);
        skin.handle_message(&BodyEvent::Bandage { part: BodyPart::Neck }, &mut ctx);
        skin.handle_message(&BodyEvent::Bandage { part: BodyPart::Neck }, &mut ctx);
        assert!(skin.is_bandaged(BodyPart::Neck));
        assert_eq!(h.log.count_where(|e| e.occurrence == Occurrence::NoNewEffect), 1);
    }

    #[test]
    fn healing_closes_wounds() {
        let mut h = Harness::new();
        let mut skin = IntegumentarySystem::default();
        let mut ctx = h.ctx(SystemId::Integumentary);
        skin.handle_message(
            &BodyEvent::Damage {
                part: BodyPart::Abdomen,
                amount: 120.0,
            },
            &mut ctx,
        );
        assert_eq!(skin.open_wound_count(), 1);
        skin.handle_message(&BodyEvent::Heal { part: BodyPart::Abdomen, amount: 100.0 }, &mut ctx);
        assert_eq!(skin.open_wound_count(), 0);
    }

    #[test]
    fn heat_spreads_weaker_burns() {
        let mut h = Harness::new();
        let mut skin = IntegumentarySystem::default();
        let event = BodyEvent::PropagateEffect {
            origin: BodyPart::RightForearm,
            effect: crate::event::Effect::heat(30.0),
        };
        skin.handle_message(&event, &mut h.ctx(SystemId::Integumentary));
        assert_eq!(skin.burn_degree(BodyPart::RightForearm), 2);
        assert_eq!(skin.burn_degree(BodyPart::RightHand), 1);
        assert!(
            skin.skin_integrity(BodyPart::RightHand) > skin.skin_integrity(BodyPart::RightForearm)
        );
    }
}
