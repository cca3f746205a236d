use serde::{Deserialize, Serialize};
use sm_core::{BodyPart, Component, ComponentKind, Node, ResourceKind};

use crate::context::TickContext;
use crate::error::SimResult;
use crate::event::{BodyEvent, EventType};
use crate::history::Occurrence;
use crate::system::{BodySystem, SystemId};
use crate::template::{SystemTemplate, TemplateParams, check_fraction, check_non_negative};

/// The digestive core.
const GUT: BodyPart = BodyPart::Abdomen;

/// Tunables for digestion and energy production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetabolicConfig {
    pub template: TemplateParams,
    pub max_health: f64,
    pub health_regen: f64,
    pub max_efficiency: f64,
    pub efficiency_regen: f64,
    /// Glucose burned per tick.
    pub burn_rate: f64,
    pub oxygen_per_glucose: f64,
    pub energy_per_glucose: f64,
    pub co2_per_glucose: f64,
    /// Baseline water used per tick.
    pub water_use: f64,
    /// Calcium absorbed per unit of food.
    pub calcium_fraction: f64,
    /// Efficiency lost per point of poison reaching the gut.
    pub poison_efficiency_loss: f64,
    /// Share of incoming damage the gut takes.
    pub damage_share: f64,
}

impl Default for MetabolicConfig {
    fn default() -> Self {
        Self {
            template: TemplateParams::default(),
            max_health: 100.0,
            health_regen: 0.2,
            max_efficiency: 100.0,
            efficiency_regen: 1.0,
            burn_rate: 0.5,
            oxygen_per_glucose: 1.0,
            energy_per_glucose: 4.0,
            co2_per_glucose: 1.0,
            water_use: 0.2,
            calcium_fraction: 0.05,
            poison_efficiency_loss: 1.0,
            damage_share: 0.5,
        }
    }
}

impl MetabolicConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.template.validate()?;
        check_non_negative("metabolic.burn_rate", self.burn_rate)?;
        check_non_negative("metabolic.energy_per_glucose", self.energy_per_glucose)?;
        check_non_negative("metabolic.water_use", self.water_use)?;
        check_fraction("metabolic.calcium_fraction", self.calcium_fraction)?;
        check_fraction("metabolic.damage_share", self.damage_share)
    }
}

/// Digestion: food and water in, energy and carbon dioxide out.
#[derive(Debug)]
pub struct MetabolicSystem {
    config: MetabolicConfig,
    template: SystemTemplate,
    energy_output: f64,
    starving_ticks: u32,
}

impl MetabolicSystem {
    pub fn new(config: MetabolicConfig) -> Self {
        let gut = Node::new(GUT)
            .with_component(
                ComponentKind::Health,
                Component::new(config.max_health, config.health_regen),
            )
            .with_component(
                ComponentKind::Efficiency,
                Component::new(config.max_efficiency, config.efficiency_regen),
            );
        let template = SystemTemplate::new(SystemId::Metabolic, config.template.clone(), [gut]);
        Self {
            config,
            template,
            energy_output: 0.0,
            starving_ticks: 0,
        }
    }

    pub fn config(&self) -> &MetabolicConfig {
        &self.config
    }

    /// Energy deposited on the last tick.
    pub fn energy_output(&self) -> f64 {
        self.energy_output
    }

    /// Digestive efficiency in `[0, 1]`; zero while the gut is disabled.
    pub fn efficiency(&self) -> f64 {
        if self.template.is_active(GUT) {
            self.template.fraction(GUT, ComponentKind::Efficiency)
        } else {
            0.0
        }
    }

    pub fn starving_ticks(&self) -> u32 {
        self.starving_ticks
    }

    pub fn is_starving(&self) -> bool {
        self.starving_ticks > 0
    }

    fn burn(&mut self, ctx: &mut TickContext<'_>) {
        let cfg = &self.config;
        let efficiency = self.efficiency();
        if efficiency <= 0.0 {
            self.energy_output = 0.0;
            return;
        }

        let glucose = ctx.pool.remove(ResourceKind::Glucose, cfg.burn_rate);
        let oxygen_wanted = glucose * cfg.oxygen_per_glucose;
        let oxygen = ctx.pool.remove(ResourceKind::Oxygen, oxygen_wanted);
        let burned = if oxygen_wanted > 0.0 {
            glucose * oxygen / oxygen_wanted
        } else {
            0.0
        };
        self.energy_output = burned * cfg.energy_per_glucose * efficiency;
        ctx.pool.add(ResourceKind::Energy, self.energy_output);
        ctx.pool.add(ResourceKind::CarbonDioxide, burned * cfg.co2_per_glucose);
        ctx.pool.remove(ResourceKind::Water, cfg.water_use);

        let satisfaction = if cfg.burn_rate > 0.0 {
            glucose / cfg.burn_rate
        } else {
            1.0
        };
        let starvation = self.template.params().starvation_damage * (1.0 - satisfaction);
        if satisfaction < 1.0 {
            self.starving_ticks += 1;
            if self.starving_ticks == 1 {
                tracing::warn!("glucose exhausted");
                ctx.record(None, Occurrence::Starving, "the body is starving");
            }
            self.template.apply_damage(GUT, starvation, ctx);
        } else {
            self.starving_ticks = 0;
        }
    }
}

impl Default for MetabolicSystem {
    fn default() -> Self {
        Self::new(MetabolicConfig::default())
    }
}

impl BodySystem for MetabolicSystem {
    fn id(&self) -> SystemId {
        SystemId::Metabolic
    }

    fn subscriptions(&self) -> Vec<EventType> {
        vec![
            EventType::Damage,
            EventType::Heal,
            EventType::Poison,
            EventType::Feed,
            EventType::Hydrate,
        ]
    }

    fn template(&self) -> &SystemTemplate {
        &self.template
    }

    fn handle_message(&mut self, event: &BodyEvent, ctx: &mut TickContext<'_>) {
        match *event {
            BodyEvent::Feed { amount } => {
                ctx.pool.add(ResourceKind::Glucose, amount);
                ctx.pool
                    .add(ResourceKind::Calcium, amount * self.config.calcium_fraction);
            }
            BodyEvent::Hydrate { amount } => {
                ctx.pool.add(ResourceKind::Water, amount);
            }
            BodyEvent::Damage { part, amount } => {
                self.template
                    .apply_damage(part, amount * self.config.damage_share, ctx);
            }
            BodyEvent::Heal { part, amount } => {
                self.template.apply_heal(part, amount, ctx);
            }
            BodyEvent::Poison { part, severity } => {
                if let Some(efficiency) = self
                    .template
                    .node_mut(part)
                    .and_then(|n| n.component_mut(ComponentKind::Efficiency))
                {
                    efficiency.decrease(severity * self.config.poison_efficiency_loss);
                }
            }
            _ => {}
        }
    }

    fn metabolic_update(&mut self, ctx: &mut TickContext<'_>) {
        self.template.feed(ctx);
        self.burn(ctx);
        self.template.regenerate_all();
        self.template.refresh_all(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::Harness;

    #[test]
    fn burns_glucose_into_energy() {
        let mut h = Harness::new();
        let mut gut = MetabolicSystem::default();
        let energy = h.pool.get(ResourceKind::Energy);
        let glucose = h.pool.get(ResourceKind::Glucose);
        gut.metabolic_update(&mut h.ctx(SystemId::Metabolic));
        assert!((gut.energy_output() - 2.0).abs() < 1e-9);
        assert!((h.pool.get(ResourceKind::Energy) - energy - 2.0).abs() < 1e-9);
        assert!((glucose - h.pool.get(ResourceKind::Glucose) - 0.5).abs() < 1e-9);
        assert!(h.pool.get(ResourceKind::CarbonDioxide) > 0.0);
    }

    #[test]
    fn feed_and_hydrate_fill_the_pool() {
        let mut h = Harness::new();
        let mut gut = MetabolicSystem::default();
        let mut ctx = h.ctx(SystemId::Metabolic);
        gut.handle_message(&BodyEvent::Feed { amount: 20.0 }, &mut ctx);
        gut.handle_message(&BodyEvent::Hydrate { amount: 10.0 }, &mut ctx);
        assert!((h.pool.get(ResourceKind::Glucose) - 120.0).abs() < 1e-9);
        assert!((h.pool.get(ResourceKind::Water) - 110.0).abs() < 1e-9);
        assert!((h.pool.get(ResourceKind::Calcium) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn empty_larder_starves() {
        let mut h = Harness::new();
        h.pool.remove(ResourceKind::Glucose, 1_000.0);
        let mut gut = MetabolicSystem::default();
        for _ in 0..3 {
            gut.metabolic_update(&mut h.ctx(SystemId::Metabolic));
        }
        assert_eq!(gut.starving_ticks(), 3);
        assert!(gut.is_starving());
        assert_eq!(gut.energy_output(), 0.0);
        assert_eq!(h.log.count_where(|e| e.occurrence == Occurrence::Starving), 1);

        gut.handle_message(&BodyEvent::Feed { amount: 10.0 }, &mut h.ctx(SystemId::Metabolic));
        gut.metabolic_update(&mut h.ctx(SystemId::Metabolic));
        assert!(!gut.is_starving());
    }

    #[test]
    fn poison_in_the_gut_cuts_efficiency() {
        let mut h = Harness::new();
        let mut gut = MetabolicSystem::default();
        gut.handle_message(
            &BodyEvent::Poison {
                part: BodyPart::Abdomen,
                severity: 50.0,
            },
            &mut h.ctx(SystemId::Metabolic),
        );
        gut.handle_message(
            &BodyEvent::Poison {
                part: BodyPart::LeftHand,
                severity: 50.0,
            },
            &mut h.ctx(SystemId::Metabolic),
        );
        assert!((gut.efficiency() - 0.5).abs() < 1e-9);
        gut.metabolic_update(&mut h.ctx(SystemId::Metabolic));
        assert!(gut.energy_output() < 2.0);
    }
}
