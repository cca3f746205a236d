use serde::{Deserialize, Serialize};
use sm_core::{BodyPart, Component, ComponentKind, Node, NodeStatus, ResourceKind};

use crate::context::TickContext;
use crate::error::SimResult;
use crate::event::{BodyEvent, EffectKind, EventType};
use crate::history::Occurrence;
use crate::system::{BodySystem, SystemId};
use crate::template::{SystemTemplate, TemplateParams, check_fraction, check_non_negative};

/// Tunables for skeletal muscle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuscularConfig {
    pub template: TemplateParams,
    pub max_health: f64,
    pub health_regen: f64,
    pub max_strength: f64,
    pub max_stamina: f64,
    pub stamina_regen: f64,
    /// Health fraction below which a muscle tears.
    pub tear_fraction: f64,
    /// Health fraction a torn muscle must be healed back to.
    pub repair_fraction: f64,
    /// Share of incoming damage the muscle takes.
    pub damage_share: f64,
    pub impact_share: f64,
    pub tear_pain: f64,
    pub stamina_per_intensity: f64,
    pub energy_per_intensity: f64,
    pub oxygen_per_intensity: f64,
    /// Damage taken when exerting on an empty tank.
    pub strain_damage: f64,
    /// Stamina recovery multiplier while resting.
    pub rest_multiplier: f64,
    /// Stamina drained everywhere per unit of hypoxia severity.
    pub hypoxia_drain: f64,
    pub oxygen_need: f64,
    pub energy_need: f64,
}

impl Default for MuscularConfig {
    fn default() -> Self {
        Self {
            template: TemplateParams::default().with_fatigue(ComponentKind::Stamina, 0.25),
            max_health: 100.0,
            health_regen: 0.5,
            max_strength: 50.0,
            max_stamina: 100.0,
            stamina_regen: 2.0,
            tear_fraction: 0.25,
            repair_fraction: 0.5,
            damage_share: 0.6,
            impact_share: 0.4,
            tear_pain: 20.0,
            stamina_per_intensity: 10.0,
            energy_per_intensity: 1.0,
            oxygen_per_intensity: 0.5,
            strain_damage: 5.0,
            rest_multiplier: 3.0,
            hypoxia_drain: 10.0,
            oxygen_need: 0.05,
            energy_need: 0.05,
        }
    }
}

impl MuscularConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.template.validate()?;
        check_fraction("muscular.tear_fraction", self.tear_fraction)?;
        check_fraction("muscular.repair_fraction", self.repair_fraction)?;
        if self.repair_fraction < self.tear_fraction {
            return Err(crate::error::SimError::InvalidConfig(
                "muscular.repair_fraction must not be below tear_fraction".to_string(),
            ));
        }
        check_fraction("muscular.damage_share", self.damage_share)?;
        check_fraction("muscular.impact_share", self.impact_share)?;
        check_non_negative("muscular.strain_damage", self.strain_damage)?;
        check_non_negative("muscular.rest_multiplier", self.rest_multiplier)
    }
}

/// Muscles: force, fatigue, tears and denervation.
#[derive(Debug)]
pub struct MuscularSystem {
    config: MuscularConfig,
    template: SystemTemplate,
}

impl MuscularSystem {
    pub fn new(config: MuscularConfig) -> Self {
        let nodes = BodyPart::ALL
            .iter()
            .filter(|p| !matches!(p, BodyPart::Head | BodyPart::Neck))
            .map(|&part| {
                Node::new(part)
                    .with_component(
                        ComponentKind::Health,
                        Component::new(config.max_health, config.health_regen),
                    )
                    .with_component(
                        ComponentKind::Strength,
                        Component::new(config.max_strength, 0.0),
                    )
                    .with_component(
                        ComponentKind::Stamina,
                        Component::new(config.max_stamina, config.stamina_regen),
                    )
                    .with_need(ResourceKind::Oxygen, config.oxygen_need)
                    .with_need(ResourceKind::Energy, config.energy_need)
            });
        let template = SystemTemplate::new(SystemId::Muscular, config.template.clone(), nodes);
        Self { config, template }
    }

    pub fn config(&self) -> &MuscularConfig {
        &self.config
    }

    /// Force the muscle at `part` can deliver; zero when absent or disabled.
    pub fn force_output(&self, part: BodyPart) -> f64 {
        let Some(node) = self.template.node(part) else {
            return 0.0;
        };
        if node.is_disabled() {
            return 0.0;
        }
        node.value(ComponentKind::Strength)
            * node.fraction(ComponentKind::Health)
            * (0.5 + 0.5 * node.fraction(ComponentKind::Stamina))
    }

    pub fn total_strength(&self) -> f64 {
        self.template.parts().iter().map(|&p| self.force_output(p)).sum()
    }

    /// Total force as a fraction of what a fresh body delivers.
    pub fn overall_strength(&self) -> f64 {
        let peak: f64 = self
            .template
            .nodes()
            .filter_map(|n| n.component(ComponentKind::Strength))
            .map(Component::max)
            .sum();
        if peak > 0.0 {
            self.total_strength() / peak
        } else {
            0.0
        }
    }

    pub fn stamina(&self, part: BodyPart) -> f64 {
        self.template.value(part, ComponentKind::Stamina)
    }

    pub fn is_torn(&self, part: BodyPart) -> bool {
        self.template.has(part, NodeStatus::TORN)
    }

    pub fn torn_count(&self) -> usize {
        self.template.count(NodeStatus::TORN)
    }

    pub fn is_tired(&self, part: BodyPart) -> bool {
        self.template.has(part, NodeStatus::TIRED)
    }

    fn damage(&mut self, part: BodyPart, amount: f64, ctx: &mut TickContext<'_>) {
        if !self.template.has_node(part) {
            return;
        }
        self.template.apply_damage(part, amount, ctx);
        let weak = self.template.fraction(part, ComponentKind::Health) < self.config.tear_fraction;
        if weak && !self.is_torn(part) {
            if let Some(node) = self.template.node_mut(part) {
                node.set_flag(NodeStatus::TORN);
            }
            tracing::info!(%part, "muscle torn");
            ctx.record(Some(part), Occurrence::Torn, format!("{part} muscle tears"));
            ctx.emit(BodyEvent::Pain {
                part,
                intensity: self.config.tear_pain,
            });
            self.template.refresh(part, ctx);
        }
    }

    fn heal(&mut self, part: BodyPart, amount: f64, ctx: &mut TickContext<'_>) {
        self.template.apply_heal(part, amount, ctx);
        let mended =
            self.template.fraction(part, ComponentKind::Health) >= self.config.repair_fraction;
        if mended && self.is_torn(part) {
            if let Some(node) = self.template.node_mut(part) {
                node.clear_flag(NodeStatus::TORN);
            }
            tracing::info!(%part, "muscle repaired");
            ctx.record(Some(part), Occurrence::MuscleRepaired, format!("{part} muscle knits"));
            self.template.refresh(part, ctx);
        }
    }

    fn exert(&mut self, part: BodyPart, intensity: f64, ctx: &mut TickContext<'_>) {
        if !self.template.is_active(part) || intensity <= 0.0 {
            return;
        }
        let cfg = &self.config;
        ctx.pool.remove(ResourceKind::Energy, intensity * cfg.energy_per_intensity);
        ctx.pool.remove(ResourceKind::Oxygen, intensity * cfg.oxygen_per_intensity);
        let cost = intensity * cfg.stamina_per_intensity;
        let strain = cfg.strain_damage;

        let mut spent = 0.0;
        if let Some(node) = self.template.node_mut(part) {
            node.clear_flag(NodeStatus::RESTING);
            if let Some(stamina) = node.component_mut(ComponentKind::Stamina) {
                spent = stamina.decrease(cost);
            }
        }
        if spent < cost {
            tracing::debug!(%part, "exertion on an empty tank");
            self.damage(part, strain, ctx);
        }
        self.template.refresh(part, ctx);
    }

    fn set_flag(&mut self, part: BodyPart, flag: NodeStatus, on: bool, ctx: &mut TickContext<'_>) {
        if let Some(node) = self.template.node_mut(part) {
            if on {
                node.set_flag(flag);
            } else {
                node.clear_flag(flag);
            }
            self.template.refresh(part, ctx);
        }
    }

    fn recover(&mut self) {
        let rest = self.config.rest_multiplier;
        for part in self.template.parts().to_vec() {
            let resting = self.template.has(part, NodeStatus::RESTING);
            self.template
                .regenerate_component(part, ComponentKind::Health, 1.0);
            self.template.regenerate_component(
                part,
                ComponentKind::Stamina,
                if resting { rest } else { 1.0 },
            );
            let rested = self
                .template
                .node(part)
                .and_then(|n| n.component(ComponentKind::Stamina))
                .is_some_and(Component::is_full);
            if resting
                && rested
                && let Some(node) = self.template.node_mut(part)
            {
                node.clear_flag(NodeStatus::RESTING);
            }
        }
    }
}

impl Default for MuscularSystem {
    fn default() -> Self {
        Self::new(MuscularConfig::default())
    }
}

impl BodySystem for MuscularSystem {
    fn id(&self) -> SystemId {
        SystemId::Muscular
    }

    fn subscriptions(&self) -> Vec<EventType> {
        vec![
            EventType::Damage,
            EventType::Heal,
            EventType::PropagateEffect,
            EventType::Exert,
            EventType::Rest,
            EventType::SignalLost,
            EventType::SignalRestored,
            EventType::Hypoxia,
        ]
    }

    fn template(&self) -> &SystemTemplate {
        &self.template
    }

    fn handle_message(&mut self, event: &BodyEvent, ctx: &mut TickContext<'_>) {
        match *event {
            BodyEvent::Damage { part, amount } => {
                self.damage(part, amount * self.config.damage_share, ctx);
            }
            BodyEvent::Heal { part, amount } => self.heal(part, amount, ctx),
            BodyEvent::PropagateEffect { origin, effect } if effect.kind == EffectKind::Impact => {
                for (part, magnitude) in self.template.spread(origin, effect.magnitude) {
                    self.damage(part, magnitude * self.config.impact_share, ctx);
                }
            }
            BodyEvent::Exert { part, intensity } => self.exert(part, intensity, ctx),
            BodyEvent::Rest { part } => self.set_flag(part, NodeStatus::RESTING, true, ctx),
            BodyEvent::SignalLost { part } => {
                self.set_flag(part, NodeStatus::DENERVATED, true, ctx);
            }
            BodyEvent::SignalRestored { part } => {
                self.set_flag(part, NodeStatus::DENERVATED, false, ctx);
            }
            BodyEvent::Hypoxia { severity } => {
                let drain = severity.max(0.0) * self.config.hypoxia_drain;
                for part in self.template.parts().to_vec() {
                    if let Some(stamina) = self
                        .template
                        .node_mut(part)
                        .and_then(|n| n.component_mut(ComponentKind::Stamina))
                    {
                        stamina.decrease(drain);
                    }
                }
                self.template.refresh_all(ctx);
            }
            _ => {}
        }
    }

    fn metabolic_update(&mut self, ctx: &mut TickContext<'_>) {
        self.template.feed(ctx);
        self.recover();
        self.template.refresh_all(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::Harness;

    #[test]
    fn fresh_muscles_deliver_full_strength() {
        let muscles = MuscularSystem::default();
        assert!((muscles.overall_strength() - 1.0).abs() < 1e-9);
        assert!((muscles.force_output(BodyPart::LeftThigh) - 50.0).abs() < 1e-9);
        assert_eq!(muscles.force_output(BodyPart::Head), 0.0);
    }

    #[test]
    fn heavy_damage_tears_and_zeroes_force() {
        let mut h = Harness::new();
        let mut muscles = MuscularSystem::default();
        let total = muscles.total_strength();
        muscles.handle_message(
            &BodyEvent::Damage {
                part: BodyPart::RightForearm,
                amount: 130.0,
            },
            &mut h.ctx(SystemId::Muscular),
        );
        assert!(muscles.is_torn(BodyPart::RightForearm));
        assert_eq!(muscles.force_output(BodyPart::RightForearm), 0.0);
        assert!((total - muscles.total_strength() - 50.0).abs() < 1e-9);
        assert_eq!(muscles.torn_count(), 1);
    }

    #[test]
    fn healing_past_repair_fraction_mends_a_tear() {
        let mut h = Harness::new();
        let mut muscles = MuscularSystem::default();
        muscles.handle_message(
            &BodyEvent::Damage {
                part: BodyPart::LeftThigh,
                amount: 130.0,
            },
            &mut h.ctx(SystemId::Muscular),
        );
        muscles.handle_message(
            &BodyEvent::Heal {
                part: BodyPart::LeftThigh,
                amount: 10.0,
            },
            &mut h.ctx(SystemId::Muscular),
        );
        assert!(muscles.is_torn(BodyPart::LeftThigh));
        muscles.handle_message(
            &BodyEvent::Heal {
                part: BodyPart::LeftThigh,
                amount: 40.0,
            },
            &mut h.ctx(SystemId::Muscular),
        );
        assert!(!muscles.is_torn(BodyPart::LeftThigh));
        assert!(muscles.force_output(BodyPart::LeftThigh) > 0.0);
    }

    #[test]
    fn exertion_tires_and_rest_recovers_faster() {
        let mut h = Harness::new();
        let mut muscles = MuscularSystem::default();
        for _ in 0..8 {
            muscles.handle_message(
                &BodyEvent::Exert {
                    part: BodyPart::LeftShin,
                    intensity: 1.0,
                },
                &mut h.ctx(SystemId::Muscular),
            );
            muscles.handle_message(
                &BodyEvent::Exert {
                    part: BodyPart::RightShin,
                    intensity: 1.0,
                },
                &mut h.ctx(SystemId::Muscular),
            );
        }
        assert!(muscles.is_tired(BodyPart::LeftShin));
        assert!(!muscles.template().node(BodyPart::LeftShin).unwrap().has(NodeStatus::HEALTHY));

        muscles.handle_message(
            &BodyEvent::Rest {
                part: BodyPart::LeftShin,
            },
            &mut h.ctx(SystemId::Muscular),
        );
        muscles.metabolic_update(&mut h.ctx(SystemId::Muscular));
        assert!(muscles.stamina(BodyPart::LeftShin) > muscles.stamina(BodyPart::RightShin));
    }

    #[test]
    fn exerting_an_empty_muscle_strains_it() {
        let mut h = Harness::new();
        let mut muscles = MuscularSystem::default();
        for _ in 0..11 {
            muscles.handle_message(
                &BodyEvent::Exert {
                    part: BodyPart::Abdomen,
                    intensity: 1.0,
                },
                &mut h.ctx(SystemId::Muscular),
            );
        }
        assert!(muscles.template().value(BodyPart::Abdomen, ComponentKind::Health) < 100.0);
    }

    #[test]
    fn lost_signal_denervates_until_restored() {
        let mut h = Harness::new();
        let mut muscles = MuscularSystem::default();
        muscles.handle_message(
            &BodyEvent::SignalLost {
                part: BodyPart::LeftHand,
            },
            &mut h.ctx(SystemId::Muscular),
        );
        assert_eq!(muscles.force_output(BodyPart::LeftHand), 0.0);
        muscles.handle_message(
            &BodyEvent::SignalRestored {
                part: BodyPart::LeftHand,
            },
            &mut h.ctx(SystemId::Muscular),
        );
        assert!(muscles.force_output(BodyPart::LeftHand) > 0.0);
    }
}
