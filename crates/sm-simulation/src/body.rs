use sm_core::{BodyPart, ResourceKind, ResourcePool, anatomy};

use crate::config::BodyConfig;
use crate::context::TickContext;
use crate::error::SimResult;
use crate::event::{BodyEvent, Effect};
use crate::export::{BodySnapshot, Vitals};
use crate::history::EventLog;
use crate::hub::EventHub;
use crate::system::{BodySystem, SystemId};
use crate::systems::{
    CirculatorySystem, ImmuneSystem, IntegumentarySystem, MetabolicSystem, MuscularSystem,
    NervousSystem, RespiratorySystem, SkeletalSystem, Subsystems,
};

/// A living body: eight subsystems sharing one resource pool and one event hub.
///
/// Commands either deliver an event to a subsystem immediately (hits to the
/// skin, bone breaks and settings, food and water) or queue it for the next
/// [`update`](Self::update). Each update runs two phases over every
/// subsystem in the configured order: drain queued events, then advance
/// metabolism.
#[derive(Debug)]
pub struct Body {
    config: BodyConfig,
    pool: ResourcePool,
    hub: EventHub,
    log: EventLog,
    tick: u64,
    systems: Subsystems,
}

impl Default for Body {
    fn default() -> Self {
        Self::new()
    }
}

impl Body {
    /// A fresh, healthy body with the default configuration.
    pub fn new() -> Self {
        Self::build(BodyConfig::default())
    }

    /// A fresh body built from a validated configuration.
    pub fn with_config(config: BodyConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: BodyConfig) -> Self {
        let systems = Subsystems::from_config(&config);
        let mut hub = EventHub::new();
        for id in SystemId::ALL {
            for event_type in systems.get(id).subscriptions() {
                hub.register_listener(id, event_type);
            }
        }
        Self {
            pool: config.pool.build(),
            log: EventLog::new(config.max_log_entries),
            tick: 0,
            hub,
            systems,
            config,
        }
    }

    /// Run `f` against one subsystem with a context over the shared state.
    fn dispatch<R>(
        &mut self,
        id: SystemId,
        f: impl FnOnce(&mut dyn BodySystem, &mut TickContext<'_>) -> R,
    ) -> R {
        let Self {
            pool,
            hub,
            log,
            tick,
            systems,
            ..
        } = self;
        let mut ctx = TickContext {
            pool,
            hub,
            log,
            anatomy: anatomy(),
            tick: *tick,
            system: id,
        };
        f(systems.get_mut(id), &mut ctx)
    }

    /// Hand `event` straight to one subsystem, bypassing its queue.
    pub fn deliver(&mut self, id: SystemId, event: &BodyEvent) {
        tracing::debug!(
            system = %id,
            event = ?event.event_type(),
            part = ?event.part(),
            "delivering event directly"
        );
        self.dispatch(id, |system, ctx| system.handle_message(event, ctx));
    }

    /// Queue `event` for every subscribed subsystem.
    pub fn emit(&mut self, event: BodyEvent) -> usize {
        self.hub.emit(event)
    }

    /// Route any event the way the matching command would.
    pub fn command(&mut self, event: BodyEvent) {
        match event {
            BodyEvent::Damage { part, amount } => self.take_damage(part, amount),
            BodyEvent::Burn { .. } => self.deliver(SystemId::Integumentary, &event),
            BodyEvent::Bandage { .. } | BodyEvent::RemoveBandage { .. } => {
                self.deliver(SystemId::Integumentary, &event);
                self.deliver(SystemId::Circulatory, &event);
            }
            BodyEvent::Fracture { .. } | BodyEvent::SetBone { .. } => {
                self.deliver(SystemId::Skeletal, &event);
            }
            BodyEvent::Feed { .. } | BodyEvent::Hydrate { .. } => {
                self.deliver(SystemId::Metabolic, &event);
            }
            other => {
                self.emit(other);
            }
        }
    }

    // -- Commands --

    /// Hit a part: the skin reacts now, deeper tissue on the next tick.
    pub fn take_damage(&mut self, part: BodyPart, amount: f64) {
        let event = BodyEvent::Damage { part, amount };
        self.deliver(SystemId::Integumentary, &event);
        self.emit(event);
    }

    pub fn heal(&mut self, part: BodyPart, amount: f64) {
        self.emit(BodyEvent::Heal { part, amount });
    }

    pub fn bleed(&mut self, part: BodyPart, rate: f64) {
        self.emit(BodyEvent::Bleed { part, rate });
    }

    pub fn clot(&mut self, part: BodyPart) {
        self.emit(BodyEvent::Clot { part });
    }

    pub fn exert(&mut self, part: BodyPart, intensity: f64) {
        self.emit(BodyEvent::Exert { part, intensity });
    }

    pub fn rest(&mut self, part: BodyPart) {
        self.emit(BodyEvent::Rest { part });
    }

    pub fn infect(&mut self, part: BodyPart, severity: f64, growth_rate: f64) {
        self.emit(BodyEvent::Infect {
            part,
            severity,
            growth_rate,
        });
    }

    pub fn cure(&mut self, part: BodyPart, power: f64, cures_infection: bool, cures_toxin: bool) {
        self.emit(BodyEvent::Cure {
            part,
            power,
            cures_infection,
            cures_toxin,
        });
    }

    pub fn poison(&mut self, part: BodyPart, severity: f64) {
        self.emit(BodyEvent::Poison { part, severity });
    }

    pub fn burn(&mut self, part: BodyPart, intensity: f64) {
        self.command(BodyEvent::Burn { part, intensity });
    }

    pub fn bandage(&mut self, part: BodyPart) {
        self.command(BodyEvent::Bandage { part });
    }

    pub fn remove_bandage(&mut self, part: BodyPart) {
        self.command(BodyEvent::RemoveBandage { part });
    }

    pub fn sever_nerve(&mut self, part: BodyPart) {
        self.emit(BodyEvent::SeverNerve { part });
    }

    pub fn repair_nerve(&mut self, part: BodyPart) {
        self.emit(BodyEvent::RepairNerve { part });
    }

    pub fn fracture(&mut self, part: BodyPart) {
        self.command(BodyEvent::Fracture { part });
    }

    pub fn set_bone(&mut self, part: BodyPart) {
        self.command(BodyEvent::SetBone { part });
    }

    pub fn feed(&mut self, amount: f64) {
        self.command(BodyEvent::Feed { amount });
    }

    pub fn hydrate(&mut self, amount: f64) {
        self.command(BodyEvent::Hydrate { amount });
    }

    pub fn shock(&mut self, intensity: f64) {
        self.emit(BodyEvent::Shock { intensity });
    }

    /// Blunt trauma spreading outward from `part`.
    pub fn impact(&mut self, part: BodyPart, magnitude: f64) {
        self.expose(part, Effect::impact(magnitude));
    }

    /// Spread an arbitrary effect outward from `part`.
    pub fn expose(&mut self, part: BodyPart, effect: Effect) {
        self.emit(BodyEvent::PropagateEffect {
            origin: part,
            effect,
        });
    }

    // -- Ticking --

    /// Advance one tick: drain every queue, then run every metabolic update.
    pub fn update(&mut self) {
        self.tick += 1;
        let order = self.config.tick_order.clone();

        tracing::trace!(tick = self.tick, pending = self.hub.total_pending(), "draining queues");
        for &id in &order {
            self.dispatch(id, |system, ctx| {
                system.drain_events(ctx);
            });
        }

        tracing::trace!(tick = self.tick, "metabolic updates");
        for &id in &order {
            self.dispatch(id, |system, ctx| system.metabolic_update(ctx));
        }
    }

    /// Advance `ticks` ticks.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.update();
        }
    }

    // -- Queries --

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &BodyConfig {
        &self.config
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn resource(&self, kind: ResourceKind) -> f64 {
        self.pool.get(kind)
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn system(&self, id: SystemId) -> &dyn BodySystem {
        self.systems.get(id)
    }

    pub fn skeletal(&self) -> &SkeletalSystem {
        &self.systems.skeletal
    }

    pub fn circulatory(&self) -> &CirculatorySystem {
        &self.systems.circulatory
    }

    pub fn respiratory(&self) -> &RespiratorySystem {
        &self.systems.respiratory
    }

    pub fn muscular(&self) -> &MuscularSystem {
        &self.systems.muscular
    }

    pub fn integumentary(&self) -> &IntegumentarySystem {
        &self.systems.integumentary
    }

    pub fn immune(&self) -> &ImmuneSystem {
        &self.systems.immune
    }

    pub fn nervous(&self) -> &NervousSystem {
        &self.systems.nervous
    }

    pub fn metabolic(&self) -> &MetabolicSystem {
        &self.systems.metabolic
    }

    /// Blood left in circulation, a beating heart and a working brain.
    pub fn is_alive(&self) -> bool {
        self.pool.get(ResourceKind::Blood) > 0.0
            && self
                .systems
                .circulatory
                .template()
                .is_active(anatomy().root())
            && self.systems.nervous.brain_active()
    }

    pub fn vitals(&self) -> Vitals {
        let s = &self.systems;
        Vitals {
            tick: self.tick,
            alive: self.is_alive(),
            blood: self.pool.get(ResourceKind::Blood),
            blood_pressure: s.circulatory.blood_pressure(),
            oxygen_output: s.respiratory.oxygen_output(),
            energy: self.pool.get(ResourceKind::Energy),
            energy_output: s.metabolic.energy_output(),
            overall_strength: s.muscular.overall_strength(),
            overall_integrity: s.skeletal.overall_integrity(),
            overall_infection: s.immune.overall_infection(),
            total_pain: s.nervous.total_pain(),
            shock: s.nervous.shock_level(),
            fractured: s.skeletal.fractured_count(),
            torn: s.muscular.torn_count(),
            severed: s.nervous.severed_count(),
            bleeding: s.circulatory.bleeding_count(),
            infected: s.immune.infected_count(),
            open_wounds: s.integumentary.open_wound_count(),
        }
    }

    /// Copy every component value out for rendering or export.
    pub fn snapshot(&self) -> BodySnapshot {
        BodySnapshot {
            tick: self.tick,
            alive: self.is_alive(),
            vitals: self.vitals(),
            resources: self.pool.iter().collect(),
            systems: SystemId::ALL
                .iter()
                .map(|&id| (id, self.systems.get(id).template().snapshot()))
                .collect(),
        }
    }

    pub fn to_json(&self) -> SimResult<String> {
        self.snapshot().to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use crate::history::Occurrence;
    use sm_core::ComponentKind;

    #[test]
    fn fresh_body_is_alive_and_quiet() {
        let body = Body::new();
        assert!(body.is_alive());
        assert_eq!(body.tick(), 0);
        assert_eq!(body.hub().total_pending(), 0);
        assert!(body.log().is_empty());
    }

    #[test]
    fn every_subscription_is_registered() {
        let body = Body::new();
        for id in SystemId::ALL {
            for event_type in body.system(id).subscriptions() {
                assert!(body.hub().is_listening(id, event_type));
            }
        }
        assert!(!body.hub().is_listening(SystemId::Integumentary, EventType::Damage));
    }

    #[test]
    fn skin_reacts_before_the_tick() {
        let mut body = Body::new();
        body.take_damage(BodyPart::LeftHand, 40.0);
        assert!(body.integumentary().skin_integrity(BodyPart::LeftHand) < 100.0);
        assert!((body.skeletal().integrity(BodyPart::LeftHand) - 100.0).abs() < f64::EPSILON);

        body.update();
        assert!(body.skeletal().integrity(BodyPart::LeftHand) < 100.0);
    }

    #[test]
    fn fracture_is_immediate() {
        let mut body = Body::new();
        body.fracture(BodyPart::RightThigh);
        assert!(body.skeletal().is_fractured(BodyPart::RightThigh));
        assert!(!body.skeletal().is_supported(BodyPart::RightFoot));
    }

    #[test]
    fn cascades_lag_one_tick() {
        let mut body = Body::new();
        body.fracture(BodyPart::LeftForearm);
        assert_eq!(body.nervous().pain(BodyPart::LeftForearm), 0.0);
        body.update();
        assert!(body.nervous().pain(BodyPart::LeftForearm) > 0.0);
    }

    #[test]
    fn feeding_fills_the_pool_now() {
        let mut body = Body::new();
        let glucose = body.resource(ResourceKind::Glucose);
        body.feed(25.0);
        body.hydrate(5.0);
        assert!((body.resource(ResourceKind::Glucose) - glucose - 25.0).abs() < 1e-9);
    }

    #[test]
    fn run_advances_ticks() {
        let mut body = Body::new();
        body.run(5);
        assert_eq!(body.tick(), 5);
        assert!(body.is_alive());
    }

    #[test]
    fn destroyed_heart_is_fatal() {
        let mut body = Body::new();
        body.emit(BodyEvent::Damage {
            part: BodyPart::Chest,
            amount: 500.0,
        });
        body.update();
        assert!(!body.is_alive());
        assert!(!body.vitals().alive);
    }

    #[test]
    fn with_config_rejects_invalid_settings() {
        let config = BodyConfig::default().with_tick_order([SystemId::Nervous]);
        assert!(Body::with_config(config).is_err());
    }

    #[test]
    fn snapshot_covers_every_system() {
        let body = Body::new();
        let snapshot = body.snapshot();
        assert_eq!(snapshot.systems.len(), SystemId::ALL.len());
        assert_eq!(snapshot.systems[&SystemId::Respiratory].len(), 3);
        assert_eq!(snapshot.systems[&SystemId::Metabolic].len(), 1);
        assert_eq!(
            snapshot.value(SystemId::Skeletal, BodyPart::Head, ComponentKind::Integrity),
            Some(100.0)
        );
        assert_eq!(
            snapshot.value(SystemId::Muscular, BodyPart::Head, ComponentKind::Strength),
            None
        );
    }

    #[test]
    fn json_export_uses_snake_case_keys() {
        let mut body = Body::new();
        body.fracture(BodyPart::LeftFoot);
        let json = body.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value["systems"]["skeletal"]["left_foot"]["status"][0],
            "disabled"
        );
        assert!(value["resources"]["carbon_dioxide"].is_number());
    }

    #[test]
    fn log_is_bounded_by_config() {
        let config = BodyConfig::default().with_max_log_entries(2);
        let mut body = Body::with_config(config).unwrap();
        for part in [BodyPart::LeftHand, BodyPart::RightHand, BodyPart::LeftFoot] {
            body.fracture(part);
        }
        assert_eq!(body.log().len(), 2);
        assert!(body.log().count_where(|e| e.occurrence == Occurrence::Fractured) >= 1);
    }
}
