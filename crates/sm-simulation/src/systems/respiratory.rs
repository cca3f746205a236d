use serde::{Deserialize, Serialize};
use sm_core::{BodyPart, Component, ComponentKind, Node, ResourceKind};

use crate::context::TickContext;
use crate::error::SimResult;
use crate::event::{BodyEvent, EffectKind, EventType};
use crate::system::{BodySystem, SystemId};
use crate::template::{SystemTemplate, TemplateParams, check_fraction, check_non_negative};

/// Tunables for the airway and lungs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RespiratoryConfig {
    pub template: TemplateParams,
    pub max_health: f64,
    pub health_regen: f64,
    pub max_stamina: f64,
    pub stamina_regen: f64,
    /// Oxygen deposited per tick by healthy, rested lungs.
    pub base_output: f64,
    /// Carbon dioxide removed per tick by healthy lungs.
    pub co2_clearance: f64,
    /// Extra output per unit of exertion.
    pub exertion_boost: f64,
    /// Share of exertion that wears off each tick.
    pub exertion_decay: f64,
    pub max_exertion: f64,
    /// Lung stamina drained per unit of exertion intensity.
    pub stamina_drain: f64,
    /// Output below which the body is hypoxic.
    pub hypoxia_output: f64,
    /// Share of impact magnitude that bruises the airway.
    pub bruise_share: f64,
    pub glucose_need: f64,
}

impl Default for RespiratoryConfig {
    fn default() -> Self {
        Self {
            template: TemplateParams::default(),
            max_health: 100.0,
            health_regen: 0.2,
            max_stamina: 100.0,
            stamina_regen: 2.0,
            base_output: 5.0,
            co2_clearance: 3.0,
            exertion_boost: 0.5,
            exertion_decay: 0.5,
            max_exertion: 1.0,
            stamina_drain: 10.0,
            hypoxia_output: 2.0,
            bruise_share: 0.3,
            glucose_need: 0.02,
        }
    }
}

impl RespiratoryConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.template.validate()?;
        check_non_negative("respiratory.base_output", self.base_output)?;
        check_non_negative("respiratory.co2_clearance", self.co2_clearance)?;
        check_non_negative("respiratory.exertion_boost", self.exertion_boost)?;
        check_fraction("respiratory.exertion_decay", self.exertion_decay)?;
        check_non_negative("respiratory.hypoxia_output", self.hypoxia_output)?;
        check_fraction("respiratory.bruise_share", self.bruise_share)
    }
}

/// Airway and lungs: oxygen in, carbon dioxide out.
#[derive(Debug)]
pub struct RespiratorySystem {
    config: RespiratoryConfig,
    template: SystemTemplate,
    exertion: f64,
    output: f64,
}

const LUNGS: BodyPart = BodyPart::Chest;
const AIRWAY: [BodyPart; 2] = [BodyPart::Head, BodyPart::Neck];

impl RespiratorySystem {
    pub fn new(config: RespiratoryConfig) -> Self {
        let nodes = [BodyPart::Head, BodyPart::Neck, BodyPart::Chest]
            .into_iter()
            .map(|part| {
                let node = Node::new(part)
                    .with_component(
                        ComponentKind::Health,
                        Component::new(config.max_health, config.health_regen),
                    )
                    .with_component(
                        ComponentKind::Stamina,
                        Component::new(config.max_stamina, config.stamina_regen),
                    );
                if part == LUNGS {
                    node.with_need(ResourceKind::Glucose, config.glucose_need)
                } else {
                    node
                }
            });
        let template = SystemTemplate::new(SystemId::Respiratory, config.template.clone(), nodes);
        let mut system = Self {
            config,
            template,
            exertion: 0.0,
            output: 0.0,
        };
        system.output = system.compute_output();
        system
    }

    pub fn config(&self) -> &RespiratoryConfig {
        &self.config
    }

    /// Oxygen deposited on the last tick.
    pub fn oxygen_output(&self) -> f64 {
        self.output
    }

    /// Usable fraction of the lungs, zero when they are disabled.
    pub fn lung_capacity(&self) -> f64 {
        if self.template.is_active(LUNGS) {
            self.template.fraction(LUNGS, ComponentKind::Health)
        } else {
            0.0
        }
    }

    /// Usable fraction of the narrowest airway segment.
    pub fn airway_capacity(&self) -> f64 {
        AIRWAY
            .iter()
            .map(|&part| {
                if self.template.is_active(part) {
                    self.template.fraction(part, ComponentKind::Health)
                } else {
                    0.0
                }
            })
            .fold(1.0, f64::min)
    }

    pub fn exertion(&self) -> f64 {
        self.exertion
    }

    fn compute_output(&self) -> f64 {
        let stamina = self.template.fraction(LUNGS, ComponentKind::Stamina);
        self.config.base_output
            * self.lung_capacity()
            * self.airway_capacity()
            * (0.5 + 0.5 * stamina)
            * (1.0 + self.exertion * self.config.exertion_boost)
    }

    fn exert(&mut self, intensity: f64) {
        let intensity = intensity.max(0.0);
        self.exertion = (self.exertion + intensity).min(self.config.max_exertion);
        if let Some(stamina) = self
            .template
            .node_mut(LUNGS)
            .and_then(|n| n.component_mut(ComponentKind::Stamina))
        {
            stamina.decrease(intensity * self.config.stamina_drain);
        }
    }
}

impl Default for RespiratorySystem {
    fn default() -> Self {
        Self::new(RespiratoryConfig::default())
    }
}

impl BodySystem for RespiratorySystem {
    fn id(&self) -> SystemId {
        SystemId::Respiratory
    }

    fn subscriptions(&self) -> Vec<EventType> {
        vec![
            EventType::Damage,
            EventType::Heal,
            EventType::PropagateEffect,
            EventType::Exert,
        ]
    }

    fn template(&self) -> &SystemTemplate {
        &self.template
    }

    fn handle_message(&mut self, event: &BodyEvent, ctx: &mut TickContext<'_>) {
        match *event {
            BodyEvent::Damage { part, amount } => {
                self.template.apply_damage(part, amount, ctx);
            }
            BodyEvent::Heal { part, amount } => {
                self.template.apply_heal(part, amount, ctx);
            }
            BodyEvent::PropagateEffect { origin, effect } if effect.kind == EffectKind::Impact => {
                for (part, magnitude) in self.template.spread(origin, effect.magnitude) {
                    self.template
                        .apply_damage(part, magnitude * self.config.bruise_share, ctx);
                }
            }
            BodyEvent::Exert { intensity, .. } => self.exert(intensity),
            _ => {}
        }
    }

    fn metabolic_update(&mut self, ctx: &mut TickContext<'_>) {
        self.template.feed(ctx);
        self.template.regenerate_all();
        self.template.refresh_all(ctx);

        let previous = self.output;
        self.output = self.compute_output();
        ctx.pool.add(ResourceKind::Oxygen, self.output);
        ctx.pool.remove(
            ResourceKind::CarbonDioxide,
            self.config.co2_clearance * self.lung_capacity(),
        );
        self.exertion *= 1.0 - self.config.exertion_decay;

        let threshold = self.config.hypoxia_output;
        if self.output < threshold && previous >= threshold {
            let severity = if threshold > 0.0 {
                1.0 - self.output / threshold
            } else {
                1.0
            };
            tracing::warn!(output = self.output, "oxygen output low");
            ctx.emit(BodyEvent::Hypoxia { severity });
        }
    }
}
