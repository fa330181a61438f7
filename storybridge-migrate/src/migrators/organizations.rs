//! Organizations migrator
//!
//! First stage; no dependencies. Natural key is the slug of the name.

use super::{log_summary, settle, EntityMigrator, RecordError};
use crate::error::MigrateResult;
use crate::models::{EntityKind, SourceRecord};
use crate::normalize::{normalize_organization_type, slugify, text};
use crate::orchestrator::RunContext;
use crate::source::{SourceAdapter, ORGANIZATIONS_TABLE};
use crate::target::{insert_or_reuse, NewOrganization, TargetGateway, TargetRow, Upserted};

/// Source field names
pub mod fields {
    pub const NAME: &str = "Name";
    pub const TYPE: &str = "Type";
    pub const DESCRIPTION: &str = "Description";
    pub const WEBSITE: &str = "Website";
    pub const LOCATION: &str = "Location";
}

pub struct OrganizationsMigrator;

impl OrganizationsMigrator {
    /// Build the target row for the `position`-th (1-based) source record
    ///
    /// A missing name falls back to `Organization {position}`; so does the
    /// slug when the name has no sluggable characters.
    pub fn transform(record: &SourceRecord, position: usize) -> NewOrganization {
        let fallback = format!("Organization {}", position);
        let name = text(record.field(fields::NAME)).unwrap_or_else(|| fallback.clone());

        let mut slug = slugify(&name);
        if slug.is_empty() {
            slug = slugify(&fallback);
        }

        NewOrganization {
            name,
            slug,
            organization_type: normalize_organization_type(record.field(fields::TYPE)),
            description: text(record.field(fields::DESCRIPTION)),
            website: text(record.field(fields::WEBSITE)),
            location: text(record.field(fields::LOCATION)),
            source_record_id: record.id.clone(),
        }
    }

    async fn migrate_record(
        record: &SourceRecord,
        position: usize,
        target: &dyn TargetGateway,
    ) -> Result<Upserted, RecordError> {
        let row = TargetRow::Organization(Self::transform(record, position));
        Ok(insert_or_reuse(target, &row).await?)
    }
}

#[async_trait::async_trait]
impl EntityMigrator for OrganizationsMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Organization
    }

    async fn migrate(
        &self,
        source: &dyn SourceAdapter,
        target: &dyn TargetGateway,
        ctx: &mut RunContext,
    ) -> MigrateResult<()> {
        let records = ctx.source_records(source, ORGANIZATIONS_TABLE).await?;
        ctx.log.info(format!("Migrating {} organizations", records.len()));

        for (index, record) in records.iter().enumerate() {
            ctx.stats.organizations.processed += 1;
            let outcome = Self::migrate_record(record, index + 1, target).await;
            settle(ctx, EntityKind::Organization, &record.id, &record.id, outcome)?;
        }

        log_summary(ctx, EntityKind::Organization);
        Ok(())
    }
}
