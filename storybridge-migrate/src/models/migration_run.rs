//! Migration run state machine
//!
//! INIT → MIGRATING_ORGANIZATIONS → MIGRATING_COMMUNITIES → MIGRATING_PROFILES
//! → MIGRATING_STORIES → UPDATING_METRICS → COMPLETED
//!
//! FAILED is reachable from any non-terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Migration run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationState {
    Init,
    MigratingOrganizations,
    MigratingCommunities,
    MigratingProfiles,
    MigratingStories,
    UpdatingMetrics,
    /// Run finished; per-record errors may still have occurred
    Completed,
    /// Run aborted by an unrecoverable error
    Failed,
}

impl MigrationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MigrationState::Completed | MigrationState::Failed)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: MigrationState) -> bool {
        use MigrationState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Init, MigratingOrganizations)
                | (MigratingOrganizations, MigratingCommunities)
                | (MigratingCommunities, MigratingProfiles)
                | (MigratingProfiles, MigratingStories)
                | (MigratingStories, UpdatingMetrics)
                | (UpdatingMetrics, Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationState::Init => "INIT",
            MigrationState::MigratingOrganizations => "MIGRATING_ORGANIZATIONS",
            MigrationState::MigratingCommunities => "MIGRATING_COMMUNITIES",
            MigrationState::MigratingProfiles => "MIGRATING_PROFILES",
            MigrationState::MigratingStories => "MIGRATING_STORIES",
            MigrationState::UpdatingMetrics => "UPDATING_METRICS",
            MigrationState::Completed => "COMPLETED",
            MigrationState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: MigrationState,
    pub new_state: MigrationState,
    pub transitioned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::MigrationState::*;

    #[test]
    fn test_forward_path_is_legal() {
        let path = [
            Init,
            MigratingOrganizations,
            MigratingCommunities,
            MigratingProfiles,
            MigratingStories,
            UpdatingMetrics,
            Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_skipping_a_stage_is_illegal() {
        assert!(!Init.can_transition_to(MigratingCommunities));
        assert!(!MigratingOrganizations.can_transition_to(MigratingStories));
        assert!(!MigratingStories.can_transition_to(Completed));
    }

    #[test]
    fn test_failed_reachable_from_any_non_terminal_state() {
        for state in [Init, MigratingOrganizations, MigratingProfiles, UpdatingMetrics] {
            assert!(state.can_transition_to(Failed));
        }
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Init));
    }

    #[test]
    fn test_serializes_as_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&MigratingOrganizations).unwrap(),
            "\"MIGRATING_ORGANIZATIONS\""
        );
    }
}
