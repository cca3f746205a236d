//! Shared fixture for driving one subsystem without a whole body.

use sm_core::{ResourcePool, anatomy};

use crate::config::PoolConfig;
use crate::context::TickContext;
use crate::history::EventLog;
use crate::hub::EventHub;
use crate::system::SystemId;

pub(crate) struct Harness {
    pub pool: ResourcePool,
    pub hub: EventHub,
    pub log: EventLog,
    pub tick: u64,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            pool: PoolConfig::default().build(),
            hub: EventHub::new(),
            log: EventLog::new(0),
            tick: 1,
        }
    }

    pub fn ctx(&mut self, system: SystemId) -> TickContext<'_> {
        TickContext {
            pool: &mut self.pool,
            hub: &mut self.hub,
            log: &mut self.log,
            anatomy: anatomy(),
            tick: self.tick,
            system,
        }
    }
}
