use serde::{Deserialize, Serialize};
use sm_core::{BodyPart, Component, ComponentKind, Node, NodeStatus, ResourceKind};

use crate::context::TickContext;
use crate::error::SimResult;
use crate::event::{BodyEvent, EffectKind, EventType};
use crate::history::Occurrence;
use crate::system::{BodySystem, SystemId};
use crate::template::{SystemTemplate, TemplateParams, check_fraction, check_non_negative};

/// Tunables for bones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletalConfig {
    pub template: TemplateParams,
    pub max_integrity: f64,
    pub integrity_regen: f64,
    /// Share of incoming damage the bone takes.
    pub absorption: f64,
    /// Integrity fraction below which a bone breaks.
    pub fracture_fraction: f64,
    /// Pain emitted when a bone breaks.
    pub fracture_pain: f64,
    /// Calcium consumed per point of integrity regrown.
    pub calcium_per_point: f64,
}

impl Default for SkeletalConfig {
    fn default() -> Self {
        Self {
            template: TemplateParams::default().with_defining(ComponentKind::Integrity),
            max_integrity: 100.0,
            integrity_regen: 0.5,
            absorption: 0.5,
            fracture_fraction: 0.3,
            fracture_pain: 40.0,
            calcium_per_point: 0.05,
        }
    }
}

impl SkeletalConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.template.validate()?;
        check_non_negative("skeletal.max_integrity", self.max_integrity)?;
        check_fraction("skeletal.absorption", self.absorption)?;
        check_fraction("skeletal.fracture_fraction", self.fracture_fraction)?;
        check_non_negative("skeletal.fracture_pain", self.fracture_pain)?;
        check_non_negative("skeletal.calcium_per_point", self.calcium_per_point)
    }
}

/// Bones: structural integrity, fractures and the weight-bearing rule.
#[derive(Debug)]
pub struct SkeletalSystem {
    config: SkeletalConfig,
    template: SystemTemplate,
}

impl SkeletalSystem {
    pub fn new(config: SkeletalConfig) -> Self {
        let nodes = BodyPart::ALL.iter().map(|&part| {
            Node::new(part).with_component(
                ComponentKind::Integrity,
                Component::new(config.max_integrity, config.integrity_regen),
            )
        });
        let template = SystemTemplate::new(SystemId::Skeletal, config.template.clone(), nodes);
        Self { config, template }
    }

    pub fn config(&self) -> &SkeletalConfig {
        &self.config
    }

    pub fn integrity(&self, part: BodyPart) -> f64 {
        self.template.value(part, ComponentKind::Integrity)
    }

    pub fn is_fractured(&self, part: BodyPart) -> bool {
        self.template.has(part, NodeStatus::FRACTURED)
    }

    /// False while some weight-bearing part above this one is broken.
    pub fn is_supported(&self, part: BodyPart) -> bool {
        !self.template.has(part, NodeStatus::UNSUPPORTED)
    }

    pub fn fractured_count(&self) -> usize {
        self.template.count(NodeStatus::FRACTURED)
    }

    /// Mean integrity fraction over the skeleton, broken bones counting as zero.
    pub fn overall_integrity(&self) -> f64 {
        self.template.overall(ComponentKind::Integrity)
    }

    fn damage(&mut self, part: BodyPart, amount: f64, ctx: &mut TickContext<'_>) {
        if !self.template.has_node(part) {
            return;
        }
        self.template
            .apply_damage(part, amount * self.config.absorption, ctx);
        let broken = self.template.fraction(part, ComponentKind::Integrity)
            < self.config.fracture_fraction;
        if broken && !self.is_fractured(part) {
            self.fracture(part, ctx);
        }
    }

    /// Break a bone. Returns false if it was already broken.
    pub(crate) fn fracture(&mut self, part: BodyPart, ctx: &mut TickContext<'_>) -> bool {
        let Some(node) = self.template.node_mut(part) else {
            return false;
        };
        if !node.set_flag(NodeStatus::FRACTURED) {
            ctx.record(Some(part), Occurrence::NoNewEffect, format!("{part} is already fractured"));
            return false;
        }
        tracing::info!(%part, "bone fractured");
        ctx.record(Some(part), Occurrence::Fractured, format!("{part} fractures"));
        ctx.emit(BodyEvent::Pain {
            part,
            intensity: self.config.fracture_pain,
        });
        self.template.apply_weight_bearing(ctx);
        true
    }

    /// Set a broken bone. Returns false if it was not broken.
    pub(crate) fn set_bone(&mut self, part: BodyPart, ctx: &mut TickContext<'_>) -> bool {
        let floor = self.config.fracture_fraction;
        let Some(node) = self.template.node_mut(part) else {
            return false;
        };
        if !node.clear_flag(NodeStatus::FRACTURED) {
            ctx.record(Some(part), Occurrence::NoNewEffect, format!("{part} is not fractured"));
            return false;
        }
        if let Some(bone) = node.component_mut(ComponentKind::Integrity) {
            let minimum = bone.max() * floor;
            if bone.current() < minimum {
                bone.set(minimum);
            }
        }
        tracing::info!(%part, "bone set");
        ctx.record(Some(part), Occurrence::BoneSet, format!("{part} is set"));
        self.template.apply_weight_bearing(ctx);
        true
    }

    /// Regrow damaged, unbroken bones while calcium lasts.
    fn remodel(&mut self, ctx: &mut TickContext<'_>) {
        let multiplier = self.template.params().regen_multiplier;
        for part in self.template.parts().to_vec() {
            let Some(node) = self.template.node(part) else {
                continue;
            };
            if node.is_disabled() || node.has(NodeStatus::FRACTURED) {
                continue;
            }
            let Some(bone) = node.component(ComponentKind::Integrity) else {
                continue;
            };
            let growth = (bone.regen_rate() * multiplier).min(bone.max() - bone.current());
            if growth <= 0.0 {
                continue;
            }
            let wanted = growth * self.config.calcium_per_point;
            let ratio = if wanted > 0.0 {
                ctx.pool.remove(ResourceKind::Calcium, wanted) / wanted
            } else {
                1.0
            };
            self.template
                .regenerate_component(part, ComponentKind::Integrity, ratio);
        }
    }
}

impl Default for SkeletalSystem {
    fn default() -> Self {
        Self::new(SkeletalConfig::default())
    }
}

impl BodySystem for SkeletalSystem {
    fn id(&self) -> SystemId {
        SystemId::Skeletal
    }

    fn subscriptions(&self) -> Vec<EventType> {
        vec![
            EventType::Damage,
            EventType::Heal,
            EventType::PropagateEffect,
            EventType::Fracture,
            EventType::SetBone,
        ]
    }

    fn template(&self) -> &SystemTemplate {
        &self.template
    }

    fn handle_message(&mut self, event: &BodyEvent, ctx: &mut TickContext<'_>) {
        match *event {
            BodyEvent::Damage { part, amount } => self.damage(part, amount, ctx),
            BodyEvent::Heal { part, amount } => {
                self.template.apply_heal(part, amount, ctx);
            }
            BodyEvent::PropagateEffect { origin, effect } if effect.kind == EffectKind::Impact => {
                for (part, magnitude) in self.template.spread(origin, effect.magnitude) {
                    self.damage(part, magnitude, ctx);
                }
            }
            BodyEvent::Fracture { part } => {
                self.fracture(part, ctx);
            }
            BodyEvent::SetBone { part } => {
                self.set_bone(part, ctx);
            }
            _ => {}
        }
    }

    fn metabolic_update(&mut self, ctx: &mut TickContext<'_>) {
        self.template.feed(ctx);
        self.remodel(ctx);
        self.template.refresh_all(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::Harness;

    #[test]
    fn heavy_damage_fractures_once() {
        let mut h = Harness::new();
        let mut bones = SkeletalSystem::default();
        bones.handle_message(
            &BodyEvent::Damage {
                part: BodyPart::LeftShin,
                amount: 150.0,
            },
            &mut h.ctx(SystemId::Skeletal),
        );
        assert!(bones.is_fractured(BodyPart::LeftShin));
        assert!(!bones.is_supported(BodyPart::LeftFoot));
        assert_eq!(h.hub.total_pending(), 0, "nobody listens for pain in isolation");

        // A second break adds nothing.
        bones.handle_message(
            &BodyEvent::Fracture {
                part: BodyPart::LeftShin,
            },
            &mut h.ctx(SystemId::Skeletal),
        );
        assert_eq!(bones.fractured_count(), 1);
        assert_eq!(h.log.count_where(|e| e.occurrence == Occurrence::Fractured), 1);
        assert_eq!(h.log.count_where(|e| e.occurrence == Occurrence::NoNewEffect), 1);
    }

    #[test]
    fn fracture_emits_pain_once() {
        let mut h = Harness::new();
        h.hub.register_listener(SystemId::Nervous, EventType::Pain);
        let mut bones = SkeletalSystem::default();
        bones.fracture(BodyPart::LeftForearm, &mut h.ctx(SystemId::Skeletal));
        bones.fracture(BodyPart::LeftForearm, &mut h.ctx(SystemId::Skeletal));
        assert_eq!(h.hub.pending(SystemId::Nervous), 1);
    }

    #[test]
    fn light_damage_does_not_fracture() {
        let mut h = Harness::new();
        let mut bones = SkeletalSystem::default();
        bones.handle_message(
            &BodyEvent::Damage {
                part: BodyPart::Chest,
                amount: 80.0,
            },
            &mut h.ctx(SystemId::Skeletal),
        );
        assert!((bones.integrity(BodyPart::Chest) - 60.0).abs() < 1e-9);
        assert!(!bones.is_fractured(BodyPart::Chest));
    }

    #[test]
    fn setting_a_bone_restores_support() {
        let mut h = Harness::new();
        let mut bones = SkeletalSystem::default();
        bones.fracture(BodyPart::Pelvis, &mut h.ctx(SystemId::Skeletal));
        for part in [BodyPart::LeftThigh, BodyPart::RightShin, BodyPart::RightFoot] {
            assert!(!bones.is_supported(part));
            assert!(!bones.template().is_active(part));
        }
        assert!(bones.is_supported(BodyPart::Abdomen));

        assert!(bones.set_bone(BodyPart::Pelvis, &mut h.ctx(SystemId::Skeletal)));
        assert!(bones.is_supported(BodyPart::RightFoot));
        assert!(bones.template().is_active(BodyPart::Pelvis));
        assert!(!bones.set_bone(BodyPart::Pelvis, &mut h.ctx(SystemId::Skeletal)));
    }

    #[test]
    fn set_bone_lifts_integrity_to_floor() {
        let mut h = Harness::new();
        let mut bones = SkeletalSystem::default();
        bones.handle_message(
            &BodyEvent::Damage {
                part: BodyPart::RightHand,
                amount: 500.0,
            },
            &mut h.ctx(SystemId::Skeletal),
        );
        assert_eq!(bones.integrity(BodyPart::RightHand), 0.0);
        bones.set_bone(BodyPart::RightHand, &mut h.ctx(SystemId::Skeletal));
        assert!((bones.integrity(BodyPart::RightHand) - 30.0).abs() < 1e-9);
        assert!(bones.template().is_active(BodyPart::RightHand));
    }

    #[test]
    fn remodelling_consumes_calcium() {
        let mut h = Harness::new();
        let mut bones = SkeletalSystem::default();
        bones.handle_message(
            &BodyEvent::Damage {
                part: BodyPart::Head,
                amount: 20.0,
            },
            &mut h.ctx(SystemId::Skeletal),
        );
        let calcium = h.pool.get(ResourceKind::Calcium);
        bones.metabolic_update(&mut h.ctx(SystemId::Skeletal));
        assert!(h.pool.get(ResourceKind::Calcium) < calcium);
        assert!(bones.integrity(BodyPart::Head) > 90.0);
    }

    #[test]
    fn impact_spreads_with_falloff() {
        let mut h = Harness::new();
        let mut bones = SkeletalSystem::default();
        let event = BodyEvent::PropagateEffect {
            origin: BodyPart::LeftUpperArm,
            effect: crate::event::Effect::impact(40.0),
        };
        bones.handle_message(&event, &mut h.ctx(SystemId::Skeletal));
        let arm = 100.0 - bones.integrity(BodyPart::LeftUpperArm);
        let forearm = 100.0 - bones.integrity(BodyPart::LeftForearm);
        let hand = 100.0 - bones.integrity(BodyPart::LeftHand);
        assert!(arm > forearm && forearm > hand && hand > 0.0);
    }
}
