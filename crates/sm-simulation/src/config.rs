use serde::{Deserialize, Serialize};
use sm_core::{ResourceKind, ResourcePool};

use crate::error::{SimError, SimResult};
use crate::system::SystemId;
use crate::systems::{
    CirculatoryConfig, ImmuneConfig, IntegumentaryConfig, MetabolicConfig, MuscularConfig,
    NervousConfig, RespiratoryConfig, SkeletalConfig,
};
use crate::template::check_non_negative;

/// Starting stock of every resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub oxygen: f64,
    pub glucose: f64,
    pub water: f64,
    pub blood: f64,
    pub calcium: f64,
    pub energy: f64,
    pub carbon_dioxide: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            oxygen: 50.0,
            glucose: 100.0,
            water: 100.0,
            blood: 100.0,
            calcium: 20.0,
            energy: 50.0,
            carbon_dioxide: 0.0,
        }
    }
}

impl PoolConfig {
    pub fn level(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Oxygen => self.oxygen,
            ResourceKind::Glucose => self.glucose,
            ResourceKind::Water => self.water,
            ResourceKind::Blood => self.blood,
            ResourceKind::Calcium => self.calcium,
            ResourceKind::Energy => self.energy,
            ResourceKind::CarbonDioxide => self.carbon_dioxide,
        }
    }

    /// Set the starting amount of one resource.
    pub fn with_level(mut self, kind: ResourceKind, amount: f64) -> Self {
        let slot = match kind {
            ResourceKind::Oxygen => &mut self.oxygen,
            ResourceKind::Glucose => &mut self.glucose,
            ResourceKind::Water => &mut self.water,
            ResourceKind::Blood => &mut self.blood,
            ResourceKind::Calcium => &mut self.calcium,
            ResourceKind::Energy => &mut self.energy,
            ResourceKind::CarbonDioxide => &mut self.carbon_dioxide,
        };
        *slot = amount;
        self
    }

    pub fn build(&self) -> ResourcePool {
        ResourcePool::with_levels(ResourceKind::ALL.iter().map(|&k| (k, self.level(k))))
    }

    pub fn validate(&self) -> SimResult<()> {
        for kind in ResourceKind::ALL {
            check_non_negative(&format!("pool.{kind}"), self.level(kind))?;
        }
        Ok(())
    }
}

/// Everything needed to build a [`Body`](crate::body::Body).
///
/// Deserializes with defaults for every missing field, so a JSON file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Order in which subsystems run within each tick phase.
    pub tick_order: Vec<SystemId>,
    pub pool: PoolConfig,
    /// History capacity (oldest entries dropped when exceeded). 0 = unlimited.
    pub max_log_entries: usize,
    pub skeletal: SkeletalConfig,
    pub circulatory: CirculatoryConfig,
    pub respiratory: RespiratoryConfig,
    pub muscular: MuscularConfig,
    pub integumentary: IntegumentaryConfig,
    pub immune: ImmuneConfig,
    pub nervous: NervousConfig,
    pub metabolic: MetabolicConfig,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            tick_order: SystemId::DEFAULT_TICK_ORDER.to_vec(),
            pool: PoolConfig::default(),
            max_log_entries: 1_000,
            skeletal: SkeletalConfig::default(),
            circulatory: CirculatoryConfig::default(),
            respiratory: RespiratoryConfig::default(),
            muscular: MuscularConfig::default(),
            integumentary: IntegumentaryConfig::default(),
            immune: ImmuneConfig::default(),
            nervous: NervousConfig::default(),
            metabolic: MetabolicConfig::default(),
        }
    }
}

impl BodyConfig {
    pub fn with_tick_order(mut self, order: impl IntoIterator<Item = SystemId>) -> Self {
        self.tick_order = order.into_iter().collect();
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_max_log_entries(mut self, max: usize) -> Self {
        self.max_log_entries = max;
        self
    }

    pub fn with_skeletal(mut self, config: SkeletalConfig) -> Self {
        self.skeletal = config;
        self
    }

    pub fn with_circulatory(mut self, config: CirculatoryConfig) -> Self {
        self.circulatory = config;
        self
    }

    pub fn with_respiratory(mut self, config: RespiratoryConfig) -> Self {
        self.respiratory = config;
        self
    }

    pub fn with_muscular(mut self, config: MuscularConfig) -> Self {
        self.muscular = config;
        self
    }

    pub fn with_integumentary(mut self, config: IntegumentaryConfig) -> Self {
        self.integumentary = config;
        self
    }

    pub fn with_immune(mut self, config: ImmuneConfig) -> Self {
        self.immune = config;
        self
    }

    pub fn with_nervous(mut self, config: NervousConfig) -> Self {
        self.nervous = config;
        self
    }

    pub fn with_metabolic(mut self, config: MetabolicConfig) -> Self {
        self.metabolic = config;
        self
    }

    /// Check every tunable and that the tick order names each subsystem exactly once.
    pub fn validate(&self) -> SimResult<()> {
        let mut order = self.tick_order.clone();
        order.sort();
        order.dedup();
        if order.len() != self.tick_order.len() || order.len() != SystemId::ALL.len() {
            return Err(SimError::InvalidConfig(format!(
                "tick order must list each of the {} subsystems exactly once",
                SystemId::ALL.len()
            )));
        }
        self.pool.validate()?;
        self.skeletal.validate()?;
        self.circulatory.validate()?;
        self.respiratory.validate()?;
        self.muscular.validate()?;
        self.integumentary.validate()?;
        self.immune.validate()?;
        self.nervous.validate()?;
        self.metabolic.validate()
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
