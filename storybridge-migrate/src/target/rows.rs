//! Rows written to the target store
//!
//! Categorical columns are typed enumerations, so nothing but a normalized
//! value can reach them.

use super::TargetTable;
use crate::normalize::{Category, OrganizationType, PrivacyLevel, StoryStatus};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
    pub organization_type: OrganizationType,
    pub description: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub source_record_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCommunity {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub organization_id: Option<Uuid>,
    pub is_active: bool,
    pub source_record_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    /// Normalized (trimmed, lowercased) email
    pub email: String,
    pub display_name: Option<String>,
    pub age_range: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub source_record_id: String,
    pub title: String,
    pub content: Option<String>,
    pub category: Category,
    pub privacy_level: PrivacyLevel,
    pub status: StoryStatus,
    pub contributor_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub community_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub submitted_at: Option<String>,
}

/// Any row the pipeline inserts
#[derive(Debug, Clone, PartialEq)]
pub enum TargetRow {
    Organization(NewOrganization),
    Community(NewCommunity),
    Profile(NewProfile),
    Story(NewStory),
}

impl TargetRow {
    pub fn table(&self) -> TargetTable {
        match self {
            TargetRow::Organization(_) => TargetTable::Organizations,
            TargetRow::Community(_) => TargetTable::Communities,
            TargetRow::Profile(_) => TargetTable::Profiles,
            TargetRow::Story(_) => TargetTable::Stories,
        }
    }

    /// Value of the row's natural key column
    pub fn natural_key(&self) -> &str {
        match self {
            TargetRow::Organization(org) => &org.slug,
            TargetRow::Community(community) => &community.slug,
            TargetRow::Profile(profile) => &profile.email,
            TargetRow::Story(story) => &story.source_record_id,
        }
    }
}
