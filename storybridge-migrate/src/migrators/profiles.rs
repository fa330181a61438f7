//! Profiles migrator
//!
//! Profiles have no table of their own in the source; they are derived from
//! the contributor fields on story records. The first story seen for an
//! email wins; later stories with the same email contribute nothing.

use super::{log_summary, settle, EntityMigrator, RecordError};
use crate::error::MigrateResult;
use crate::models::{EntityKind, SourceRecord};
use crate::normalize::{normalize_email, text};
use crate::orchestrator::RunContext;
use crate::source::{SourceAdapter, STORIES_TABLE};
use crate::target::{insert_or_reuse, NewProfile, TargetGateway, TargetRow, Upserted};
use std::collections::HashSet;

/// Contributor field names on story records
pub mod fields {
    pub const EMAIL: &str = "Email";
    pub const NAME: &str = "Storyteller Name";
    pub const AGE_RANGE: &str = "Age Range";
    pub const LOCATION: &str = "Location";
}

pub struct ProfilesMigrator;

/// One profile per unique normalized email, in first-seen order
pub fn collect_profiles(stories: &[SourceRecord]) -> Vec<NewProfile> {
    let mut seen = HashSet::new();
    let mut profiles = Vec::new();

    for story in stories {
        let Some(email) = normalize_email(story.field(fields::EMAIL)) else {
            continue;
        };
        if !seen.insert(email.clone()) {
            continue;
        }

        profiles.push(NewProfile {
            email,
            display_name: text(story.field(fields::NAME)),
            age_range: text(story.field(fields::AGE_RANGE)),
            location: text(story.field(fields::LOCATION)),
        });
    }

    profiles
}

/// `(story id, email)` for every non-blank contributor email dropped for lacking an `@`
pub fn unusable_emails(stories: &[SourceRecord]) -> Vec<(&str, String)> {
    stories
        .iter()
        .filter_map(|story| {
            let raw = text(story.field(fields::EMAIL))?;
            if normalize_email(story.field(fields::EMAIL)).is_some() {
                return None;
            }
            Some((story.id.as_str(), raw))
        })
        .collect()
}

impl ProfilesMigrator {
    async fn migrate_profile(profile: NewProfile, target: &dyn TargetGateway) -> Result<Upserted, RecordError> {
        Ok(insert_or_reuse(target, &TargetRow::Profile(profile)).await?)
    }
}

#[async_trait::async_trait]
impl EntityMigrator for ProfilesMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Profile
    }

    async fn migrate(
        &self,
        source: &dyn SourceAdapter,
        target: &dyn TargetGateway,
        ctx: &mut RunContext,
    ) -> MigrateResult<()> {
        let stories = ctx.source_records(source, STORIES_TABLE).await?;
        for (story_id, email) in unusable_emails(&stories) {
            ctx.warn(
                EntityKind::Profile,
                format!("[story {}] Contributor email '{}' has no @, story stays anonymous", story_id, email),
            );
        }

        let profiles = collect_profiles(&stories);
        ctx.log.info(format!(
            "Migrating {} profiles derived from {} stories",
            profiles.len(),
            stories.len()
        ));

        for profile in profiles {
            ctx.stats.profiles.processed += 1;
            let email = profile.email.clone();
            let outcome = Self::migrate_profile(profile, target).await;
            settle(ctx, EntityKind::Profile, &email, &email, outcome)?;
        }

        log_summary(ctx, EntityKind::Profile);
        Ok(())
    }
}
