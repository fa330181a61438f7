//! Migration run statistics
//!
//! Per-entity counters plus the run-level statistics document persisted by
//! the finalizer.

use super::metrics::PlatformMetrics;
use crate::models::{EntityKind, MigrationState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counters for one entity type
///
/// `created + reused + errors == processed` once a stage has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    /// Source records (or unique emails, for profiles) handled
    pub processed: usize,
    /// Target rows inserted
    pub created: usize,
    /// Existing target rows reused on natural-key conflict
    pub reused: usize,
    /// Records that failed
    pub errors: usize,
    /// Non-blocking issues (unresolved references)
    pub warnings: usize,
}

impl EntityStats {
    pub fn display_string(&self) -> String {
        format!(
            "{} processed, {} created, {} reused, {} errors, {} warnings",
            self.processed, self.created, self.reused, self.errors, self.warnings
        )
    }
}

/// Counters for every entity type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatistics {
    pub organizations: EntityStats,
    pub communities: EntityStats,
    pub profiles: EntityStats,
    pub stories: EntityStats,
}

impl MigrationStatistics {
    pub fn entity(&self, kind: EntityKind) -> &EntityStats {
        match kind {
            EntityKind::Organization => &self.organizations,
            EntityKind::Community => &self.communities,
            EntityKind::Profile => &self.profiles,
            EntityKind::Story => &self.stories,
        }
    }

    pub fn entity_mut(&mut self, kind: EntityKind) -> &mut EntityStats {
        match kind {
            EntityKind::Organization => &mut self.organizations,
            EntityKind::Community => &mut self.communities,
            EntityKind::Profile => &mut self.profiles,
            EntityKind::Story => &mut self.stories,
        }
    }

    pub fn total_errors(&self) -> usize {
        EntityKind::ALL.iter().map(|k| self.entity(*k).errors).sum()
    }
}

/// Statistics snapshot written at the end of every run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsDocument {
    pub run_id: Uuid,
    pub state: MigrationState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub entities: MigrationStatistics,
    pub metrics: Option<PlatformMetrics>,
    /// Message of the unrecoverable error, for FAILED runs
    pub failure: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_mut_targets_the_right_counter() {
        let mut stats = MigrationStatistics::default();
        stats.entity_mut(EntityKind::Story).errors += 1;
        stats.entity_mut(EntityKind::Organization).created += 2;

        assert_eq!(stats.stories.errors, 1);
        assert_eq!(stats.organizations.created, 2);
        assert_eq!(stats.total_errors(), 1);
    }

    #[test]
    fn test_display_string() {
        let stats = EntityStats {
            processed: 5,
            created: 3,
            reused: 1,
            errors: 1,
            warnings: 2,
        };
        assert_eq!(
            stats.display_string(),
            "5 processed, 3 created, 1 reused, 1 errors, 2 warnings"
        );
    }

    #[test]
    fn test_statistics_serialize_with_entity_names() {
        let json = serde_json::to_value(MigrationStatistics::default()).unwrap();
        for key in ["organizations", "communities", "profiles", "stories"] {
            assert_eq!(json[key]["processed"], 0);
            assert_eq!(json[key]["created"], 0);
            assert_eq!(json[key]["errors"], 0);
        }
    }
}
