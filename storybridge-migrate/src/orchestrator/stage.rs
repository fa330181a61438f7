//! Pipeline stages
//!
//! The dependency graph between migrators is declared here rather than
//! implied by call order: each stage names the registries it reads and the
//! registry it produces.

use crate::models::{EntityKind, MigrationState};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Organizations,
    Communities,
    Profiles,
    Stories,
    Metrics,
}

impl Stage {
    /// Stages in execution order
    pub const PIPELINE: [Stage; 5] = [
        Stage::Organizations,
        Stage::Communities,
        Stage::Profiles,
        Stage::Stories,
        Stage::Metrics,
    ];

    /// Run state while this stage executes
    pub fn state(&self) -> MigrationState {
        match self {
            Stage::Organizations => MigrationState::MigratingOrganizations,
            Stage::Communities => MigrationState::MigratingCommunities,
            Stage::Profiles => MigrationState::MigratingProfiles,
            Stage::Stories => MigrationState::MigratingStories,
            Stage::Metrics => MigrationState::UpdatingMetrics,
        }
    }

    /// Registries this stage reads
    pub fn requires(&self) -> &'static [EntityKind] {
        match self {
            Stage::Organizations => &[],
            Stage::Communities => &[EntityKind::Organization],
            Stage::Profiles => &[],
            Stage::Stories => &[EntityKind::Organization, EntityKind::Profile],
            Stage::Metrics => &[
                EntityKind::Organization,
                EntityKind::Community,
                EntityKind::Profile,
                EntityKind::Story,
            ],
        }
    }

    /// Registry this stage produces
    pub fn produces(&self) -> Option<EntityKind> {
        match self {
            Stage::Organizations => Some(EntityKind::Organization),
            Stage::Communities => Some(EntityKind::Community),
            Stage::Profiles => Some(EntityKind::Profile),
            Stage::Stories => Some(EntityKind::Story),
            Stage::Metrics => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Organizations => "organizations",
            Stage::Communities => "communities",
            Stage::Profiles => "profiles",
            Stage::Stories => "stories",
            Stage::Metrics => "metrics",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
