//! Stories migrator
//!
//! Last entity stage. Reads the organization and profile registries, and
//! attaches every story to the pre-existing `global` community.

use super::{log_summary, settle, EntityMigrator, RecordError, TransformError};
use crate::error::MigrateResult;
use crate::models::{EntityKind, FieldValue, SourceRecord};
use crate::normalize::{
    first_link, normalize_category, normalize_email, normalize_privacy_level, normalize_status, tags, text,
};
use crate::orchestrator::RunContext;
use crate::registry::IdRegistry;
use crate::source::{SourceAdapter, STORIES_TABLE};
use crate::target::schema::GLOBAL_COMMUNITY_SLUG;
use crate::target::{insert_or_reuse, NewStory, TargetGateway, TargetRow, TargetTable, Upserted};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

/// Source field names
pub mod fields {
    pub const TITLE: &str = "Title";
    pub const CONTENT: &str = "Story";
    pub const CATEGORY: &str = "Category";
    pub const PRIVACY_LEVEL: &str = "Privacy Level";
    pub const STATUS: &str = "Status";
    pub const ORGANIZATION: &str = "Organization";
    pub const EMAIL: &str = "Email";
    pub const TAGS: &str = "Tags";
    pub const SUBMITTED_AT: &str = "Submitted At";
}

pub struct StoriesMigrator;

impl StoriesMigrator {
    /// Build the target row for one story record
    ///
    /// `community_id` is the id of the `global` community, if it exists.
    pub fn transform(
        record: &SourceRecord,
        registry: &IdRegistry,
        community_id: Option<Uuid>,
    ) -> Result<NewStory, TransformError> {
        let title = match record.field(fields::TITLE) {
            FieldValue::Text(_) => text(record.field(fields::TITLE)),
            _ => None,
        }
        .ok_or(TransformError::MissingField(fields::TITLE))?;

        let contributor_id = normalize_email(record.field(fields::EMAIL))
            .and_then(|email| registry.resolve(EntityKind::Profile, &email));

        Ok(NewStory {
            source_record_id: record.id.clone(),
            title,
            content: text(record.field(fields::CONTENT)),
            category: normalize_category(record.field(fields::CATEGORY)),
            privacy_level: normalize_privacy_level(record.field(fields::PRIVACY_LEVEL)),
            status: normalize_status(record.field(fields::STATUS)),
            contributor_id,
            organization_id: registry.resolve_opt(
                EntityKind::Organization,
                first_link(record.field(fields::ORGANIZATION)),
            ),
            community_id,
            tags: tags(record.field(fields::TAGS)),
            submitted_at: parse_submitted_at(record.field(fields::SUBMITTED_AT))?,
        })
    }

    async fn migrate_record(story: NewStory, target: &dyn TargetGateway) -> Result<Upserted, RecordError> {
        Ok(insert_or_reuse(target, &TargetRow::Story(story)).await?)
    }
}

/// Submission timestamp as RFC 3339 UTC
///
/// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
fn parse_submitted_at(value: &FieldValue) -> Result<Option<String>, TransformError> {
    let Some(raw) = text(value) else {
        return Ok(None);
    };

    let parsed = match DateTime::parse_from_rfc3339(&raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| TransformError::InvalidField {
                field: fields::SUBMITTED_AT,
                reason: format!("unrecognized timestamp '{}'", raw),
            })?,
    };

    Ok(Some(parsed.to_rfc3339_opts(SecondsFormat::Secs, true)))
}

#[async_trait::async_trait]
impl EntityMigrator for StoriesMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Story
    }

    async fn migrate(
        &self,
        source: &dyn SourceAdapter,
        target: &dyn TargetGateway,
        ctx: &mut RunContext,
    ) -> MigrateResult<()> {
        let records = ctx.source_records(source, STORIES_TABLE).await?;
        ctx.log.info(format!("Migrating {} stories", records.len()));

        let community_id = target
            .find_by_natural_key(TargetTable::Communities, GLOBAL_COMMUNITY_SLUG)
            .await?;
        if community_id.is_none() {
            ctx.warn(
                EntityKind::Story,
                format!(
                    "Community '{}' not found; stories will be written without a community",
                    GLOBAL_COMMUNITY_SLUG
                ),
            );
        }

        for record in records.iter() {
            ctx.stats.stories.processed += 1;

            let story = match Self::transform(record, &ctx.registry, community_id) {
                Ok(story) => story,
                Err(e) => {
                    settle(ctx, EntityKind::Story, &record.id, &record.id, Err(e.into()))?;
                    continue;
                }
            };

            if story.contributor_id.is_none() {
                if let Some(email) = normalize_email(record.field(fields::EMAIL)) {
                    ctx.warn(
                        EntityKind::Story,
                        format!("[story {}] Contributor {} not found, leaving contributor null", record.id, email),
                    );
                }
            }

            let outcome = Self::migrate_record(story, target).await;
            settle(ctx, EntityKind::Story, &record.id, &record.id, outcome)?;
        }

        log_summary(ctx, EntityKind::Story);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Category, PrivacyLevel, StoryStatus};

    fn registry() -> (IdRegistry, Uuid, Uuid) {
        let mut registry = IdRegistry::new();
        let org = Uuid::new_v4();
        let profile = Uuid::new_v4();
        registry.set(EntityKind::Organization, "recOrg2", org).unwrap();
        registry.set(EntityKind::Profile, "maria@example.org", profile).unwrap();
        (registry, org, profile)
    }

    #[test]
    fn test_transform_resolves_references() {
        let (registry, org, profile) = registry();
        let community = Uuid::new_v4();
        let record = SourceRecord::new("recStory1")
            .with(fields::TITLE, "Finding home")
            .with(fields::CONTENT, "It started in 2019...")
            .with(fields::CATEGORY, "Health")
            .with(fields::PRIVACY_LEVEL, "Public")
            .with(fields::STATUS, "Published")
            .with(fields::ORGANIZATION, vec!["recOrg2"])
            .with(fields::EMAIL, "Maria@Example.org")
            .with(fields::TAGS, "Housing, hope, housing");

        let story = StoriesMigrator::transform(&record, &registry, Some(community)).unwrap();

        assert_eq!(story.title, "Finding home");
        assert_eq!(story.category, Category::Healthcare);
        assert_eq!(story.privacy_level, PrivacyLevel::Public);
        assert_eq!(story.status, StoryStatus::Approved);
        assert_eq!(story.organization_id, Some(org));
        assert_eq!(story.contributor_id, Some(profile));
        assert_eq!(story.community_id, Some(community));
        assert_eq!(story.tags, vec!["housing", "hope"]);
    }

    #[test]
    fn test_missing_title_is_rejected() {
        let (registry, _, _) = registry();
        let record = SourceRecord::new("recStory2").with(fields::TITLE, "   ");

        let err = StoriesMigrator::transform(&record, &registry, None).unwrap_err();
        assert_eq!(err, TransformError::MissingField(fields::TITLE));

        let numeric = SourceRecord::new("recStory3").with(fields::TITLE, 42.0);
        assert!(StoriesMigrator::transform(&numeric, &registry, None).is_err());
    }

    #[test]
    fn test_defaults_when_fields_absent() {
        let record = SourceRecord::new("recStory4").with(fields::TITLE, "Untold");
        let story = StoriesMigrator::transform(&record, &IdRegistry::new(), None).unwrap();

        assert_eq!(story.category, Category::Community);
        assert_eq!(story.privacy_level, PrivacyLevel::Private);
        assert_eq!(story.status, StoryStatus::Pending);
        assert_eq!(story.contributor_id, None);
        assert_eq!(story.organization_id, None);
        assert!(story.tags.is_empty());
        assert_eq!(story.submitted_at, None);
    }

    #[test]
    fn test_submitted_at_formats() {
        assert_eq!(
            parse_submitted_at(&FieldValue::from("2023-04-05")).unwrap().as_deref(),
            Some("2023-04-05T00:00:00Z")
        );
        assert_eq!(
            parse_submitted_at(&FieldValue::from("2023-04-05T10:30:00.000Z")).unwrap().as_deref(),
            Some("2023-04-05T10:30:00Z")
        );
        assert!(matches!(
            parse_submitted_at(&FieldValue::from("last tuesday")),
            Err(TransformError::InvalidField { .. })
        ));
    }
}
