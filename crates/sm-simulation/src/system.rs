use serde::{Deserialize, Serialize};

use crate::context::TickContext;
use crate::error::SimError;
use crate::event::{BodyEvent, EventType};
use crate::template::SystemTemplate;

/// Identifies one of the body's subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemId {
    Skeletal,
    Circulatory,
    Respiratory,
    Muscular,
    Integumentary,
    Immune,
    Nervous,
    Metabolic,
}

impl SystemId {
    /// Every subsystem, in declaration order.
    pub const ALL: [SystemId; 8] = [
        Self::Skeletal,
        Self::Circulatory,
        Self::Respiratory,
        Self::Muscular,
        Self::Integumentary,
        Self::Immune,
        Self::Nervous,
        Self::Metabolic,
    ];

    /// Default per-tick invocation order: core producers first, periphery last.
    ///
    /// Earlier systems get first claim on scarce resources in the pool.
    pub const DEFAULT_TICK_ORDER: [SystemId; 8] = [
        Self::Respiratory,
        Self::Circulatory,
        Self::Metabolic,
        Self::Nervous,
        Self::Immune,
        Self::Skeletal,
        Self::Muscular,
        Self::Integumentary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Skeletal => "skeletal",
            Self::Circulatory => "circulatory",
            Self::Respiratory => "respiratory",
            Self::Muscular => "muscular",
            Self::Integumentary => "integumentary",
            Self::Immune => "immune",
            Self::Nervous => "nervous",
            Self::Metabolic => "metabolic",
        }
    }
}

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SystemId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name() == lower)
            .ok_or_else(|| SimError::UnknownSystem(s.to_string()))
    }
}

/// A physiological subsystem owning one node per modelled body part.
///
/// Subsystems never reference each other. They react to events delivered
/// either directly through [`handle_message`](Self::handle_message) or from
/// their queue on the event hub, and they talk back only by emitting events.
pub trait BodySystem: std::fmt::Debug {
    fn id(&self) -> SystemId;

    /// Event types this system wants queued for it.
    fn subscriptions(&self) -> Vec<EventType>;

    /// Shared node state.
    fn template(&self) -> &SystemTemplate;

    /// React to one event immediately.
    fn handle_message(&mut self, event: &BodyEvent, ctx: &mut TickContext<'_>);

    /// Per-tick state advance: production and consumption, decay,
    /// threshold checks and cross-system emission.
    fn metabolic_update(&mut self, ctx: &mut TickContext<'_>);

    /// Process every event queued so far, each exactly once, in arrival order.
    ///
    /// Events emitted while processing are queued for the next drain.
    fn drain_events(&mut self, ctx: &mut TickContext<'_>) -> usize {
        let queued = ctx.hub.take_queue(self.id());
        let count = queued.len();
        tracing::trace!(system = %self.id(), events = count, "draining queue");
        for event in &queued {
            tracing::debug!(
                system = %self.id(),
                event = ?event.event_type(),
                part = ?event.part(),
                "delivering queued event"
            );
            self.handle_message(event, ctx);
        }
        count
    }

    /// Drain the queue, then run the metabolic update.
    fn update(&mut self, ctx: &mut TickContext<'_>) {
        self.drain_events(ctx);
        self.metabolic_update(ctx);
    }

    fn name(&self) -> &'static str {
        self.id().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_covers_every_system_once() {
        let mut order = SystemId::DEFAULT_TICK_ORDER.to_vec();
        order.sort();
        order.dedup();
        assert_eq!(order.len(), SystemId::ALL.len());
    }

    #[test]
    fn parse_system_names() {
        assert_eq!("Nervous".parse::<SystemId>().unwrap(), SystemId::Nervous);
        assert!(matches!(
            "digestive".parse::<SystemId>(),
            Err(SimError::UnknownSystem(_))
        ));
    }
}
