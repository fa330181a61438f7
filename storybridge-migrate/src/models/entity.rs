//! Entity kinds migrated by the pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target entity type
///
/// Declaration order is dependency order: each kind may only reference
/// kinds declared before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organization,
    Community,
    Profile,
    Story,
}

impl EntityKind {
    /// All kinds in dependency order
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Organization,
        EntityKind::Community,
        EntityKind::Profile,
        EntityKind::Story,
    ];

    /// Singular name used in log lines and registry keys
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::Community => "community",
            EntityKind::Profile => "profile",
            EntityKind::Story => "story",
        }
    }

    /// Plural name used in statistics documents
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Organization => "organizations",
            EntityKind::Community => "communities",
            EntityKind::Profile => "profiles",
            EntityKind::Story => "stories",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
