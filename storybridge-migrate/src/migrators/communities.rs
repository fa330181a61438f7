//! Communities migrator
//!
//! Reads the organization registry to resolve each community's optional
//! organization link. An unresolved link leaves the organization id null.

use super::{log_summary, settle, EntityMigrator, RecordError};
use crate::error::MigrateResult;
use crate::models::{EntityKind, SourceRecord};
use crate::normalize::{first_link, flag, slugify, text};
use crate::orchestrator::RunContext;
use crate::registry::IdRegistry;
use crate::source::{SourceAdapter, COMMUNITIES_TABLE};
use crate::target::{insert_or_reuse, NewCommunity, TargetGateway, TargetRow, Upserted};

/// Source field names
pub mod fields {
    pub const NAME: &str = "Name";
    pub const DESCRIPTION: &str = "Description";
    pub const ORGANIZATION: &str = "Organization";
    pub const ACTIVE: &str = "Active";
}

pub struct CommunitiesMigrator;

impl CommunitiesMigrator {
    /// Build the target row for the `position`-th (1-based) source record
    ///
    /// A missing `Active` field means active.
    pub fn transform(record: &SourceRecord, position: usize, registry: &IdRegistry) -> NewCommunity {
        let fallback = format!("Community {}", position);
        let name = text(record.field(fields::NAME)).unwrap_or_else(|| fallback.clone());

        let mut slug = slugify(&name);
        if slug.is_empty() {
            slug = slugify(&fallback);
        }

        let active = record.field(fields::ACTIVE);
        let is_active = active.is_absent() || flag(active);

        NewCommunity {
            name,
            slug,
            description: text(record.field(fields::DESCRIPTION)),
            organization_id: registry.resolve_opt(
                EntityKind::Organization,
                first_link(record.field(fields::ORGANIZATION)),
            ),
            is_active,
            source_record_id: record.id.clone(),
        }
    }

    async fn migrate_record(
        record: &SourceRecord,
        position: usize,
        target: &dyn TargetGateway,
        ctx: &RunContext,
    ) -> Result<Upserted, RecordError> {
        let community = Self::transform(record, position, &ctx.registry);

        if community.organization_id.is_none() {
            if let Some(link) = first_link(record.field(fields::ORGANIZATION)) {
                tracing::debug!(
                    record_id = %record.id,
                    organization = %link,
                    "Organization link not resolved, leaving organization_id null"
                );
            }
        }

        Ok(insert_or_reuse(target, &TargetRow::Community(community)).await?)
    }
}

#[async_trait::async_trait]
impl EntityMigrator for CommunitiesMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Community
    }

    async fn migrate(
        &self,
        source: &dyn SourceAdapter,
        target: &dyn TargetGateway,
        ctx: &mut RunContext,
    ) -> MigrateResult<()> {
        let records = ctx.source_records(source, COMMUNITIES_TABLE).await?;
        ctx.log.info(format!("Migrating {} communities", records.len()));

        for (index, record) in records.iter().enumerate() {
            ctx.stats.communities.processed += 1;
            let outcome = Self::migrate_record(record, index + 1, target, ctx).await;
            settle(ctx, EntityKind::Community, &record.id, &record.id, outcome)?;
        }

        log_summary(ctx, EntityKind::Community);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_organization_link_resolved_through_registry() {
        let mut registry = IdRegistry::new();
        let org_id = Uuid::new_v4();
        registry.set(EntityKind::Organization, "recOrg1", org_id).unwrap();

        let record = SourceRecord::new("recCom1")
            .with(fields::NAME, "Palm Island")
            .with(fields::ORGANIZATION, vec!["recOrg1", "recOrg2"]);

        let community = CommunitiesMigrator::transform(&record, 1, &registry);

        assert_eq!(community.organization_id, Some(org_id));
        assert_eq!(community.slug, "palm-island");
        assert!(community.is_active);
    }

    #[test]
    fn test_unresolved_link_is_null() {
        let record = SourceRecord::new("recCom1")
            .with(fields::NAME, "Palm Island")
            .with(fields::ORGANIZATION, vec!["recOrgUnknown"]);

        let community = CommunitiesMigrator::transform(&record, 1, &IdRegistry::new());

        assert_eq!(community.organization_id, None);
    }

    #[test]
    fn test_active_flag() {
        let registry = IdRegistry::new();
        let inactive = SourceRecord::new("recCom2").with(fields::ACTIVE, false);
        let community = CommunitiesMigrator::transform(&inactive, 2, &registry);

        assert!(!community.is_active);
        assert_eq!(community.name, "Community 2");
    }
}
