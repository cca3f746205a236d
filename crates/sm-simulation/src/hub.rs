//! Typed publish/subscribe bus between subsystems.
//!
//! Listeners register per [`EventType`]. [`EventHub::emit`] copies the event
//! into the queue of every registered listener; each listener later drains
//! its own queue. Emitting a type nobody listens for is a silent no-op.

use std::collections::{BTreeMap, VecDeque};

use crate::event::{BodyEvent, EventType};
use crate::system::SystemId;

#[derive(Debug, Default)]
pub struct EventHub {
    listeners: BTreeMap<EventType, Vec<SystemId>>,
    queues: BTreeMap<SystemId, VecDeque<BodyEvent>>,
    emitted: u64,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `system` to one event type. Registering twice has no effect.
    pub fn register_listener(&mut self, system: SystemId, event_type: EventType) {
        let listeners = self.listeners.entry(event_type).or_default();
        if !listeners.contains(&system) {
            listeners.push(system);
        }
        self.queues.entry(system).or_default();
    }

    /// Detach `system` from one event type.
    pub fn unregister_listener(&mut self, system: SystemId, event_type: EventType) {
        if let Some(listeners) = self.listeners.get_mut(&event_type) {
            listeners.retain(|s| *s != system);
        }
    }

    pub fn is_listening(&self, system: SystemId, event_type: EventType) -> bool {
        self.listeners
            .get(&event_type)
            .is_some_and(|l| l.contains(&system))
    }

    /// Systems registered for `event_type`, in registration order.
    pub fn listeners(&self, event_type: EventType) -> &[SystemId] {
        self.listeners
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Queue `event` for every listener of its type. Returns how many queues received it.
    pub fn emit(&mut self, event: BodyEvent) -> usize {
        self.emitted += 1;
        let event_type = event.event_type();
        let targets = self.listeners(event_type).to_vec();
        for system in &targets {
            self.queues
                .entry(*system)
                .or_default()
                .push_back(event.clone());
        }
        tracing::trace!(?event_type, listeners = targets.len(), "event emitted");
        targets.len()
    }

    /// Remove and return everything queued for `system` so far.
    ///
    /// Events emitted after this call start a fresh queue.
    pub fn take_queue(&mut self, system: SystemId) -> VecDeque<BodyEvent> {
        self.queues
            .get_mut(&system)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub fn pending(&self, system: SystemId) -> usize {
        self.queues.get(&system).map_or(0, VecDeque::len)
    }

    pub fn total_pending(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Number of events emitted over the hub's lifetime.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Drop every queued event, keeping registrations.
    pub fn clear(&mut self) {
        for queue in self.queues.values_mut() {
            queue.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm_core::BodyPart;

    fn damage(amount: f64) -> BodyEvent {
        BodyEvent::Damage {
            part: BodyPart::Chest,
            amount,
        }
    }

    #[test]
    fn emit_reaches_every_listener() {
        let mut hub = EventHub::new();
        hub.register_listener(SystemId::Skeletal, EventType::Damage);
        hub.register_listener(SystemId::Muscular, EventType::Damage);
        assert_eq!(hub.emit(damage(5.0)), 2);
        assert_eq!(hub.pending(SystemId::Skeletal), 1);
        assert_eq!(hub.pending(SystemId::Muscular), 1);
    }

    #[test]
    fn unsubscribed_types_are_ignored() {
        let mut hub = EventHub::new();
        hub.register_listener(SystemId::Nervous, EventType::SeverNerve);
        assert_eq!(hub.emit(damage(5.0)), 0);
        assert_eq!(hub.total_pending(), 0);
        assert_eq!(hub.emitted(), 1);
    }

    #[test]
    fn double_registration_delivers_once() {
        let mut hub = EventHub::new();
        hub.register_listener(SystemId::Skeletal, EventType::Damage);
        hub.register_listener(SystemId::Skeletal, EventType::Damage);
        hub.emit(damage(1.0));
        assert_eq!(hub.pending(SystemId::Skeletal), 1);
    }

    #[test]
    fn take_queue_preserves_arrival_order() {
        let mut hub = EventHub::new();
        hub.register_listener(SystemId::Skeletal, EventType::Damage);
        hub.emit(damage(1.0));
        hub.emit(damage(2.0));
        hub.emit(damage(3.0));
        let queue: Vec<_> = hub.take_queue(SystemId::Skeletal).into_iter().collect();
        assert_eq!(queue, vec![damage(1.0), damage(2.0), damage(3.0)]);
        assert_eq!(hub.pending(SystemId::Skeletal), 0);
    }

    #[test]
    fn events_emitted_after_take_wait_for_next_drain() {
        let mut hub = EventHub::new();
        hub.register_listener(SystemId::Skeletal, EventType::Damage);
        hub.emit(damage(1.0));
        let first = hub.take_queue(SystemId::Skeletal);
        hub.emit(damage(2.0));
        assert_eq!(first.len(), 1);
        assert_eq!(hub.pending(SystemId::Skeletal), 1);
    }

    #[test]
    fn unregister_stops_delivery() {
        let mut hub = EventHub::new();
        hub.register_listener(SystemId::Skeletal, EventType::Damage);
        hub.unregister_listener(SystemId::Skeletal, EventType::Damage);
        assert!(!hub.is_listening(SystemId::Skeletal, EventType::Damage));
        assert_eq!(hub.emit(damage(1.0)), 0);
    }

    #[test]
    fn take_queue_for_unknown_system_is_empty() {
        let mut hub = EventHub::new();
        assert!(hub.take_queue(SystemId::Metabolic).is_empty());
    }
}
