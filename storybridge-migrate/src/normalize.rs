//! Field normalizer
//!
//! Pure, total functions mapping loosely-typed source values onto the fixed
//! enumerations of the target schema. Unknown input is never an error: every
//! normalizer resolves it to a documented default.
//!
//! | normalizer | default |
//! |---|---|
//! | [`normalize_category`] | `community` |
//! | [`normalize_privacy_level`] | `private` (fails closed) |
//! | [`normalize_status`] | `pending` |
//! | [`normalize_organization_type`] | `other` |

use crate::models::FieldValue;
use serde::{Deserialize, Serialize};

/// Story category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Healthcare,
    Education,
    Housing,
    Justice,
    Environment,
    Culture,
    Employment,
    Family,
    Youth,
    Community,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Healthcare => "healthcare",
            Category::Education => "education",
            Category::Housing => "housing",
            Category::Justice => "justice",
            Category::Environment => "environment",
            Category::Culture => "culture",
            Category::Employment => "employment",
            Category::Family => "family",
            Category::Youth => "youth",
            Category::Community => "community",
        }
    }
}

/// Story visibility, ordered from most to least open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    Public,
    Community,
    Organization,
    Private,
}

impl PrivacyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyLevel::Public => "public",
            PrivacyLevel::Community => "community",
            PrivacyLevel::Organization => "organization",
            PrivacyLevel::Private => "private",
        }
    }
}

/// Story moderation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Archived,
}

impl StoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Draft => "draft",
            StoryStatus::Pending => "pending",
            StoryStatus::Approved => "approved",
            StoryStatus::Rejected => "rejected",
            StoryStatus::Archived => "archived",
        }
    }
}

/// Organization type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationType {
    Nonprofit,
    CommunityGroup,
    Government,
    SocialEnterprise,
    Business,
    Education,
    Health,
    Other,
}

impl OrganizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationType::Nonprofit => "nonprofit",
            OrganizationType::CommunityGroup => "community_group",
            OrganizationType::Government => "government",
            OrganizationType::SocialEnterprise => "social_enterprise",
            OrganizationType::Business => "business",
            OrganizationType::Education => "education",
            OrganizationType::Health => "health",
            OrganizationType::Other => "other",
        }
    }
}

/// Lowercased, trimmed matching key for a categorical value
///
/// Lists contribute their first element. Non-text values have no key.
fn match_key(value: &FieldValue) -> Option<String> {
    let raw = match value {
        FieldValue::Text(s) => s.as_str(),
        FieldValue::List(items) => items.first()?.as_str(),
        FieldValue::Absent | FieldValue::Number(_) | FieldValue::Bool(_) => return None,
    };
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

pub fn normalize_category(value: &FieldValue) -> Category {
    let Some(key) = match_key(value) else {
        return Category::Community;
    };
    match key.as_str() {
        "health" | "healthcare" | "health care" | "medical" | "mental health" | "wellbeing"
        | "well-being" | "disability" => Category::Healthcare,
        "education" | "school" | "schooling" | "learning" | "training" => Category::Education,
        "housing" | "homelessness" | "shelter" | "accommodation" => Category::Housing,
        "justice" | "legal" | "law" | "youth justice" | "human rights" => Category::Justice,
        "environment" | "environmental" | "climate" | "land" | "country" => Category::Environment,
        "culture" | "cultural" | "arts" | "art" | "language" | "heritage" => Category::Culture,
        "employment" | "work" | "jobs" | "economic" | "economic development" => Category::Employment,
        "family" | "families" | "parenting" | "elders" => Category::Family,
        "youth" | "young people" | "children" => Category::Youth,
        _ => Category::Community,
    }
}

pub fn normalize_privacy_level(value: &FieldValue) -> PrivacyLevel {
    let Some(key) = match_key(value) else {
        return PrivacyLevel::Private;
    };
    match key.as_str() {
        "public" | "open" | "everyone" | "shareable" => PrivacyLevel::Public,
        "community" | "community only" | "members" | "members only" => PrivacyLevel::Community,
        "organization" | "organisation" | "organization only" | "organisation only" | "org only"
        | "internal" => PrivacyLevel::Organization,
        _ => PrivacyLevel::Private,
    }
}

pub fn normalize_status(value: &FieldValue) -> StoryStatus {
    let Some(key) = match_key(value) else {
        return StoryStatus::Pending;
    };
    match key.as_str() {
        "draft" | "in progress" | "not started" => StoryStatus::Draft,
        "approved" | "published" | "live" | "complete" | "completed" => StoryStatus::Approved,
        "rejected" | "declined" | "withdrawn" => StoryStatus::Rejected,
        "archived" | "retired" => StoryStatus::Archived,
        _ => StoryStatus::Pending,
    }
}

pub fn normalize_organization_type(value: &FieldValue) -> OrganizationType {
    let Some(key) = match_key(value) else {
        return OrganizationType::Other;
    };
    match key.as_str() {
        "nonprofit" | "non-profit" | "non profit" | "not for profit" | "not-for-profit" | "ngo"
        | "charity" | "nfp" => OrganizationType::Nonprofit,
        "community" | "community group" | "community organisation" | "community organization"
        | "grassroots" | "aboriginal community controlled" => OrganizationType::CommunityGroup,
        "government" | "council" | "local government" | "public sector" | "agency" => {
            OrganizationType::Government
        }
        "social enterprise" | "social-enterprise" | "cooperative" | "co-op" => {
            OrganizationType::SocialEnterprise
        }
        "business" | "company" | "corporate" | "private sector" => OrganizationType::Business,
        "education" | "school" | "university" | "tafe" => OrganizationType::Education,
        "health" | "healthcare" | "health service" | "hospital" | "clinic" => OrganizationType::Health,
        _ => OrganizationType::Other,
    }
}

/// URL-safe slug
///
/// Lowercases, drops characters outside `[a-z0-9- ]`, collapses runs of
/// spaces into one dash, and trims leading/trailing dashes. Distinct inputs
/// can yield the same slug; uniqueness is the target store's concern.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | ' '))
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut in_space = false;
    for c in kept.chars() {
        if c == ' ' {
            in_space = true;
            continue;
        }
        if in_space {
            slug.push('-');
            in_space = false;
        }
        slug.push(c);
    }

    slug.trim_matches('-').to_string()
}

/// Trimmed, non-empty text from a text value or the first element of a list
pub fn text(value: &FieldValue) -> Option<String> {
    let raw = match value {
        FieldValue::Text(s) => s.as_str(),
        FieldValue::List(items) => items.first()?.as_str(),
        _ => return None,
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// First linked record id of a link field
///
/// A bare text value is accepted as a single link.
pub fn first_link(value: &FieldValue) -> Option<&str> {
    let id = match value {
        FieldValue::List(items) => items.first()?.as_str(),
        FieldValue::Text(s) => s.as_str(),
        _ => return None,
    };
    let id = id.trim();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Canonical email (trimmed, lowercased); `None` unless it contains `@`
pub fn normalize_email(value: &FieldValue) -> Option<String> {
    text(value)
        .map(|email| email.to_lowercase())
        .filter(|email| email.contains('@'))
}

/// Tags from a multi-select or comma-separated text value
pub fn tags(value: &FieldValue) -> Vec<String> {
    let items: Vec<&str> = match value {
        FieldValue::List(items) => items.iter().map(String::as_str).collect(),
        FieldValue::Text(s) => s.split(',').collect(),
        _ => Vec::new(),
    };

    let mut tags: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let tag = item.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Checkbox-like flag; text values "yes", "true", "active", "1" count as set
pub fn flag(value: &FieldValue) -> bool {
    match value {
        FieldValue::Bool(b) => *b,
        FieldValue::Number(n) => *n != 0.0,
        FieldValue::Text(_) | FieldValue::List(_) => matches!(
            match_key(value).as_deref(),
            Some("yes" | "true" | "active" | "1" | "y")
        ),
        FieldValue::Absent => false,
    }
}
