use serde::Serialize;
use sm_core::{BodyPart, ResourceKind};

use crate::system::SystemId;

/// Something notable a subsystem observed during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Occurrence {
    // Structure
    Fractured,
    BoneSet,
    Torn,
    MuscleRepaired,

    // Nerves
    NerveSevered,
    NerveRepaired,
    SignalLost,
    SignalRestored,

    // Availability
    NodeDisabled,
    NodeRestored,

    // Tissue
    BleedingStarted,
    BleedingStopped,
    Burned { degree: u8 },
    WoundOpened,
    WoundClosed,
    Infected,
    InfectionCleared,
    Inflamed,

    // Whole body
    ResourceShortfall { resource: ResourceKind },
    LowBloodPressure,
    Starving,

    /// A command that found its condition already in place.
    NoNewEffect,
}

/// One entry of the body's history.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub tick: u64,
    pub system: SystemId,
    pub part: Option<BodyPart>,
    pub occurrence: Occurrence,
    pub description: String,
}

impl LogEntry {
    pub fn new(
        tick: u64,
        system: SystemId,
        part: Option<BodyPart>,
        occurrence: Occurrence,
        description: impl Into<String>,
    ) -> Self {
        Self {
            tick,
            system,
            part,
            occurrence,
            description: description.into(),
        }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:>4}] {:<13}", self.tick, self.system)?;
        match self.part {
            Some(part) => write!(f, " {part:<14}")?,
            None => write!(f, " {:<14}", "-")?,
        }
        write!(f, " {}", self.description)
    }
}

/// Bounded history of what happened to a body.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    max_entries: usize,
}

impl EventLog {
    /// Create a log holding at most `max_entries` (0 = unlimited).
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Append an entry, dropping the oldest ones past capacity.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
        if self.max_entries > 0 && self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn at_tick(&self, tick: u64) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.tick == tick).collect()
    }

    pub fn for_part(&self, part: BodyPart) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.part == Some(part))
            .collect()
    }

    pub fn for_system(&self, system: SystemId) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.system == system).collect()
    }

    /// How many entries match `predicate`.
    pub fn count_where(&self, predicate: impl Fn(&LogEntry) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(e)).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tick: u64, part: BodyPart) -> LogEntry {
        LogEntry::new(tick, SystemId::Skeletal, Some(part), Occurrence::Fractured, "crack")
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut log = EventLog::new(2);
        log.push(entry(1, BodyPart::Head));
        log.push(entry(2, BodyPart::Head));
        log.push(entry(3, BodyPart::Head));
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].tick, 2);
    }

    #[test]
    fn zero_capacity_is_unbounded() {
        let mut log = EventLog::new(0);
        for tick in 0..100 {
            log.push(entry(tick, BodyPart::Chest));
        }
        assert_eq!(log.len(), 100);
    }

    #[test]
    fn queries_filter_entries() {
        let mut log = EventLog::new(0);
        log.push(entry(1, BodyPart::Head));
        log.push(entry(1, BodyPart::LeftFoot));
        log.push(LogEntry::new(
            2,
            SystemId::Metabolic,
            None,
            Occurrence::Starving,
            "out of glucose",
        ));
        assert_eq!(log.at_tick(1).len(), 2);
        assert_eq!(log.for_part(BodyPart::LeftFoot).len(), 1);
        assert_eq!(log.for_system(SystemId::Metabolic).len(), 1);
        assert_eq!(
            log.count_where(|e| e.occurrence == Occurrence::Fractured),
            2
        );
    }

    #[test]
    fn display_includes_tick_and_description() {
        let text = entry(7, BodyPart::Neck).to_string();
        assert!(text.contains('7'));
        assert!(text.contains("neck"));
        assert!(text.contains("crack"));
    }
}
