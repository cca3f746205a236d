use sm_core::{AnatomicalGraph, BodyPart, ResourcePool};

use crate::event::BodyEvent;
use crate::history::{EventLog, LogEntry, Occurrence};
use crate::hub::EventHub;
use crate::system::SystemId;

/// Mutable access to the shared body state handed to a subsystem.
pub struct TickContext<'a> {
    pub pool: &'a mut ResourcePool,
    pub hub: &'a mut EventHub,
    pub log: &'a mut EventLog,
    pub anatomy: &'static AnatomicalGraph,
    pub tick: u64,
    /// The subsystem currently running, stamped on log entries.
    pub system: SystemId,
}

impl TickContext<'_> {
    /// Queue an event for every subscribed subsystem.
    pub fn emit(&mut self, event: BodyEvent) -> usize {
        self.hub.emit(event)
    }

    /// Record a notable occurrence at the current tick.
    pub fn record(
        &mut self,
        part: Option<BodyPart>,
        occurrence: Occurrence,
        description: impl Into<String>,
    ) {
        self.log.push(LogEntry::new(
            self.tick,
            self.system,
            part,
            occurrence,
            description,
        ));
    }
}
