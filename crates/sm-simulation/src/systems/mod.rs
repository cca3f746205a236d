//! The eight physiological subsystems.

pub mod circulatory;
pub mod immune;
pub mod integumentary;
pub mod metabolic;
pub mod muscular;
pub mod nervous;
pub mod respiratory;
pub mod skeletal;

#[cfg(test)]
pub(crate) mod testing;

pub use circulatory::{CirculatoryConfig, CirculatorySystem};
pub use immune::{ImmuneConfig, ImmuneSystem};
pub use integumentary::{IntegumentaryConfig, IntegumentarySystem};
pub use metabolic::{MetabolicConfig, MetabolicSystem};
pub use muscular::{MuscularConfig, MuscularSystem};
pub use nervous::{NervousConfig, NervousSystem};
pub use respiratory::{RespiratoryConfig, RespiratorySystem};
pub use skeletal::{SkeletalConfig, SkeletalSystem};

use crate::config::BodyConfig;
use crate::system::{BodySystem, SystemId};

/// One instance of every subsystem, addressable by [`SystemId`].
#[derive(Debug)]
pub struct Subsystems {
    pub skeletal: SkeletalSystem,
    pub circulatory: CirculatorySystem,
    pub respiratory: RespiratorySystem,
    pub muscular: MuscularSystem,
    pub integumentary: IntegumentarySystem,
    pub immune: ImmuneSystem,
    pub nervous: NervousSystem,
    pub metabolic: MetabolicSystem,
}

impl Subsystems {
    pub fn from_config(config: &BodyConfig) -> Self {
        Self {
            skeletal: SkeletalSystem::new(config.skeletal.clone()),
            circulatory: CirculatorySystem::new(config.circulatory.clone()),
            respiratory: RespiratorySystem::new(config.respiratory.clone()),
            muscular: MuscularSystem::new(config.muscular.clone()),
            integumentary: IntegumentarySystem::new(config.integumentary.clone()),
            immune: ImmuneSystem::new(config.immune.clone()),
            nervous: NervousSystem::new(config.nervous.clone()),
            metabolic: MetabolicSystem::new(config.metabolic.clone()),
        }
    }

    pub fn get(&self, id: SystemId) -> &dyn BodySystem {
        match id {
            SystemId::Skeletal => &self.skeletal,
            SystemId::Circulatory => &self.circulatory,
            SystemId::Respiratory => &self.respiratory,
            SystemId::Muscular => &self.muscular,
            SystemId::Integumentary => &self.integumentary,
            SystemId::Immune => &self.immune,
            SystemId::Nervous => &self.nervous,
            SystemId::Metabolic => &self.metabolic,
        }
    }

    pub fn get_mut(&mut self, id: SystemId) -> &mut dyn BodySystem {
        match id {
            SystemId::Skeletal => &mut self.skeletal,
            SystemId::Circulatory => &mut self.circulatory,
            SystemId::Respiratory => &mut self.respiratory,
            SystemId::Muscular => &mut self.muscular,
            SystemId::Integumentary => &mut self.integumentary,
            SystemId::Immune => &mut self.immune,
            SystemId::Nervous => &mut self.nervous,
            SystemId::Metabolic => &mut self.metabolic,
        }
    }
}
