use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sm_core::{BodyPart, Component, ComponentKind, Node, NodeStatus, ResourceKind, anatomy};

use crate::context::TickContext;
use crate::error::SimResult;
use crate::event::{BodyEvent, EffectKind, EventType};
use crate::history::Occurrence;
use crate::system::{BodySystem, SystemId};
use crate::template::{SystemTemplate, TemplateParams, check_fraction, check_non_negative};

/// Tunables for the heart and vessels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CirculatoryConfig {
    pub template: TemplateParams,
    pub max_health: f64,
    pub health_regen: f64,
    /// Blood volume at which pressure is nominal.
    pub normal_blood: f64,
    pub nominal_pressure: f64,
    /// Cap on the blood/normal ratio feeding into pressure.
    pub max_volume_ratio: f64,
    /// Bleeding rate started per point of damage to a major vessel.
    pub vessel_bleed_factor: f64,
    /// Multiplier on `vessel_bleed_factor` for minor vessels.
    pub minor_vessel_factor: f64,
    /// Bleeding rate reduced per tick by natural clotting.
    pub clot_rate: f64,
    /// Bleeding rate reduced per point of healing.
    pub heal_clot_factor: f64,
    /// Fraction of bleeding that still escapes through a bandage.
    pub bandage_factor: f64,
    pub max_bleeding: f64,
    /// Blood regrown per tick while below normal.
    pub blood_regen: f64,
    pub water_per_blood: f64,
    pub glucose_per_blood: f64,
    /// Pressure below which downstream tissue is hypoxic.
    pub low_pressure_threshold: f64,
    /// Share of impact magnitude that bruises vessels.
    pub bruise_share: f64,
    pub oxygen_need: f64,
    pub glucose_need: f64,
}

impl Default for CirculatoryConfig {
    fn default() -> Self {
        Self {
            template: TemplateParams::default(),
            max_health: 100.0,
            health_regen: 0.2,
            normal_blood: 100.0,
            nominal_pressure: 100.0,
            max_volume_ratio: 1.2,
            vessel_bleed_factor: 0.05,
            minor_vessel_factor: 0.25,
            clot_rate: 0.05,
            heal_clot_factor: 0.1,
            bandage_factor: 0.3,
            max_bleeding: 20.0,
            blood_regen: 0.2,
            water_per_blood: 0.5,
            glucose_per_blood: 0.2,
            low_pressure_threshold: 40.0,
            bruise_share: 0.3,
            oxygen_need: 0.02,
            glucose_need: 0.01,
        }
    }
}

impl CirculatoryConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.template.validate()?;
        check_non_negative("circulatory.normal_blood", self.normal_blood)?;
        check_non_negative("circulatory.nominal_pressure", self.nominal_pressure)?;
        check_non_negative("circulatory.vessel_bleed_factor", self.vessel_bleed_factor)?;
        check_fraction("circulatory.minor_vessel_factor", self.minor_vessel_factor)?;
        check_non_negative("circulatory.clot_rate", self.clot_rate)?;
        check_fraction("circulatory.bandage_factor", self.bandage_factor)?;
        check_non_negative("circulatory.blood_regen", self.blood_regen)?;
        check_non_negative("circulatory.low_pressure_threshold", self.low_pressure_threshold)?;
        check_fraction("circulatory.bruise_share", self.bruise_share)
    }
}

/// Heart and vessels: bleeding, blood volume, pressure and perfusion.
#[derive(Debug)]
pub struct CirculatorySystem {
    config: CirculatoryConfig,
    template: SystemTemplate,
    pressure: f64,
    perfusion: BTreeMap<BodyPart, f64>,
}

impl CirculatorySystem {
    pub fn new(config: CirculatoryConfig) -> Self {
        let nodes = BodyPart::ALL.iter().map(|&part| {
            Node::new(part)
                .with_component(
                    ComponentKind::Health,
                    Component::new(config.max_health, config.health_regen),
                )
                .with_component(
                    ComponentKind::Bleeding,
                    Component::empty(config.max_bleeding, 0.0),
                )
                .with_need(ResourceKind::Oxygen, config.oxygen_need)
                .with_need(ResourceKind::Glucose, config.glucose_need)
        });
        let template = SystemTemplate::new(SystemId::Circulatory, config.template.clone(), nodes);
        let mut system = Self {
            pressure: 0.0,
            perfusion: BTreeMap::new(),
            config,
            template,
        };
        system.pressure = system.pressure_for(system.config.normal_blood);
        system.recompute_perfusion();
        system
    }

    pub fn config(&self) -> &CirculatoryConfig {
        &self.config
    }

    /// Pressure as of the last tick.
    pub fn blood_pressure(&self) -> f64 {
        self.pressure
    }

    /// Pressure the current heart would produce with `blood` in circulation.
    ///
    /// Non-decreasing in `blood` for a fixed heart.
    pub fn pressure_for(&self, blood: f64) -> f64 {
        let cfg = &self.config;
        let volume = if cfg.normal_blood > 0.0 {
            (blood.max(0.0) / cfg.normal_blood).min(cfg.max_volume_ratio)
        } else {
            0.0
        };
        cfg.nominal_pressure * volume * self.heart_factor()
    }

    fn heart_factor(&self) -> f64 {
        let heart = anatomy().root();
        if self.template.is_active(heart) {
            0.5 + 0.5 * self.template.fraction(heart, ComponentKind::Health)
        } else {
            0.0
        }
    }

    /// Share of nominal flow reaching `part`, in `[0, 1]`.
    pub fn perfusion(&self, part: BodyPart) -> f64 {
        self.perfusion.get(&part).copied().unwrap_or(0.0)
    }

    pub fn bleeding_rate(&self, part: BodyPart) -> f64 {
        self.template.value(part, ComponentKind::Bleeding)
    }

    pub fn bleeding_count(&self) -> usize {
        self.template.count(NodeStatus::BLEEDING)
    }

    /// Blood lost per tick across the body, after bandages.
    pub fn total_bleed_rate(&self) -> f64 {
        self.template
            .nodes()
            .map(|n| {
                let rate = n.value(ComponentKind::Bleeding);
                if n.has(NodeStatus::BANDAGED) {
                    rate * self.config.bandage_factor
                } else {
                    rate
                }
            })
            .sum()
    }

    pub fn is_bandaged(&self, part: BodyPart) -> bool {
        self.template.has(part, NodeStatus::BANDAGED)
    }

    fn add_bleeding(&mut self, part: BodyPart, rate: f64, ctx: &mut TickContext<'_>) {
        let Some(node) = self.template.node_mut(part) else {
            return;
        };
        if let Some(bleeding) = node.component_mut(ComponentKind::Bleeding) {
            bleeding.increase(rate);
        }
        if node.value(ComponentKind::Bleeding) > 0.0 && node.set_flag(NodeStatus::BLEEDING) {
            ctx.record(Some(part), Occurrence::BleedingStarted, format!("{part} starts bleeding"));
        }
    }

    fn reduce_bleeding(&mut self, part: BodyPart, amount: f64, ctx: &mut TickContext<'_>) {
        let Some(node) = self.template.node_mut(part) else {
            return;
        };
        if let Some(bleeding) = node.component_mut(ComponentKind::Bleeding) {
            bleeding.decrease(amount);
        }
        if node.value(ComponentKind::Bleeding) <= 0.0 && node.clear_flag(NodeStatus::BLEEDING) {
            ctx.record(Some(part), Occurrence::BleedingStopped, format!("{part} stops bleeding"));
        }
    }

    fn damage(&mut self, part: BodyPart, amount: f64, ctx: &mut TickContext<'_>) {
        if !self.template.has_node(part) || amount <= 0.0 {
            return;
        }
        self.template.apply_damage(part, amount, ctx);
        let mut rate = amount * self.config.vessel_bleed_factor;
        if !anatomy().is_major_vessel(part) {
            rate *= self.config.minor_vessel_factor;
        }
        self.add_bleeding(part, rate, ctx);
    }

    fn lose_blood(&mut self, ctx: &mut TickContext<'_>) {
        let lost = self.total_bleed_rate();
        if lost > 0.0 {
            ctx.pool.remove(ResourceKind::Blood, lost);
        }
        for part in self.template.parts().to_vec() {
            if self.bleeding_rate(part) > 0.0 {
                self.reduce_bleeding(part, self.config.clot_rate, ctx);
            }
        }
    }

    fn regrow_blood(&mut self, ctx: &mut TickContext<'_>) {
        let cfg = &self.config;
        let missing = cfg.normal_blood - ctx.pool.get(ResourceKind::Blood);
        let wanted = cfg.blood_regen.min(missing);
        if wanted <= 0.0 {
            return;
        }
        let mut ratio: f64 = 1.0;
        for (resource, per_unit) in [
            (ResourceKind::Water, cfg.water_per_blood),
            (ResourceKind::Glucose, cfg.glucose_per_blood),
        ] {
            let requested = wanted * per_unit;
            if requested > 0.0 {
                ratio = ratio.min(ctx.pool.remove(resource, requested) / requested);
            }
        }
        ctx.pool.add(ResourceKind::Blood, wanted * ratio);
    }

    fn recompute_perfusion(&mut self) {
        let graph = anatomy();
        let source = if self.config.nominal_pressure > 0.0 {
            (self.pressure / self.config.nominal_pressure).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut perfusion = BTreeMap::new();
        for &part in self.template.parts() {
            let own = if self.template.is_active(part) {
                self.template.fraction(part, ComponentKind::Health)
            } else {
                0.0
            };
            let flow = match graph.parent(part) {
                None => source,
                Some(parent) => perfusion.get(&parent).copied().unwrap_or(0.0) * own,
            };
            perfusion.insert(part, flow);
        }
        self.perfusion = perfusion;
    }

    fn check_pressure(&mut self, ctx: &mut TickContext<'_>) {
        let previous = self.pressure;
        self.pressure = self.pressure_for(ctx.pool.get(ResourceKind::Blood));
        let threshold = self.config.low_pressure_threshold;
        if self.pressure < threshold && previous >= threshold {
            let severity = if threshold > 0.0 {
                1.0 - self.pressure / threshold
            } else {
                1.0
            };
            tracing::warn!(pressure = self.pressure, "blood pressure low");
            ctx.record(
                None,
                Occurrence::LowBloodPressure,
                format!("blood pressure falls to {:.1}", self.pressure),
            );
            ctx.emit(BodyEvent::Hypoxia { severity });
        }
    }
}

impl Default for CirculatorySystem {
    fn default() -> Self {
        Self::new(CirculatoryConfig::default())
    }
}

impl BodySystem for CirculatorySystem {
    fn id(&self) -> SystemId {
        SystemId::Circulatory
    }

    fn subscriptions(&self) -> Vec<EventType> {
        vec![
            EventType::Damage,
            EventType::Heal,
            EventType::PropagateEffect,
            EventType::Bleed,
            EventType::Clot,
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
            BodyEvent::Heal { part, amount } => {
                self.template.apply_heal(part, amount, ctx);
                self.reduce_bleeding(part, amount * self.config.heal_clot_factor, ctx);
            }
            BodyEvent::PropagateEffect { origin, effect } if effect.kind == EffectKind::Impact => {
                for (part, magnitude) in self.template.spread(origin, effect.magnitude) {
                    self.template
                        .apply_damage(part, magnitude * self.config.bruise_share, ctx);
                }
            }
            BodyEvent::Bleed { part, rate } => self.add_bleeding(part, rate, ctx),
            BodyEvent::Clot { part } => {
                let rate = self.bleeding_rate(part);
                if rate > 0.0 {
                    self.reduce_bleeding(part, rate, ctx);
                }
            }
            BodyEvent::Bandage { part } => {
                if let Some(node) = self.template.node_mut(part) {
                    node.set_flag(NodeStatus::BANDAGED);
                }
            }
            BodyEvent::RemoveBandage { part } => {
                if let Some(node) = self.template.node_mut(part) {
                    node.clear_flag(NodeStatus::BANDAGED);
                }
            }
            _ => {}
        }
    }

    fn metabolic_update(&mut self, ctx: &mut TickContext<'_>) {
        self.template.feed(ctx);
        self.lose_blood(ctx);
        self.regrow_blood(ctx);
        self.template.regenerate_all();
        self.template.refresh_all(ctx);
        self.check_pressure(ctx);
        self.recompute_perfusion();
    }
}
