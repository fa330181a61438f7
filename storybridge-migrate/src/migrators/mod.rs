//! Entity migrators
//!
//! Each migrator loads one entity type. For every source record it
//! normalizes fields, resolves foreign references through the registry,
//! inserts the target row (or reuses the existing one on a natural-key
//! conflict), and records the mapping in the registry.
//!
//! Failures are contained per record: a [`RecordError`] is counted and
//! logged and the migrator moves on. Only unrecoverable target errors and
//! source fetch failures abort the stage.

pub mod communities;
pub mod organizations;
pub mod profiles;
pub mod stories;

pub use communities::CommunitiesMigrator;
pub use organizations::OrganizationsMigrator;
pub use profiles::ProfilesMigrator;
pub use stories::StoriesMigrator;

use crate::error::MigrateResult;
use crate::models::EntityKind;
use crate::orchestrator::RunContext;
use crate::registry::RegistryError;
use crate::source::SourceAdapter;
use crate::target::{TargetError, TargetGateway, Upserted};
use thiserror::Error;

/// A source record could not be turned into a target row
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransformError {
    #[error("Missing required field {0}")]
    MissingField(&'static str),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Per-record failure
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl RecordError {
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, RecordError::Target(e) if e.is_unrecoverable())
    }
}

/// Loads one entity type from the source into the target
#[async_trait::async_trait]
pub trait EntityMigrator: Send + Sync {
    /// Entity type this migrator produces
    fn kind(&self) -> EntityKind;

    async fn migrate(
        &self,
        source: &dyn SourceAdapter,
        target: &dyn TargetGateway,
        ctx: &mut RunContext,
    ) -> MigrateResult<()>;
}

/// Book the outcome of one record
///
/// Success records `registry_key → id` in the registry and bumps `created`
/// or `reused`. A recoverable failure bumps `errors` and is logged against
/// `record_label`. An unrecoverable failure is returned.
pub(crate) fn settle(
    ctx: &mut RunContext,
    kind: EntityKind,
    registry_key: &str,
    record_label: &str,
    outcome: Result<Upserted, RecordError>,
) -> MigrateResult<()> {
    let upserted = match outcome {
        Ok(upserted) => upserted,
        Err(RecordError::Target(e)) if e.is_unrecoverable() => return Err(e.into()),
        Err(e) => {
            ctx.stats.entity_mut(kind).errors += 1;
            ctx.log.record_error(kind, record_label, &e);
            return Ok(());
        }
    };

    if let Err(e) = ctx.registry.set(kind, registry_key, upserted.id()) {
        ctx.stats.entity_mut(kind).errors += 1;
        ctx.log.record_error(kind, record_label, &e);
        return Ok(());
    }

    let stats = ctx.stats.entity_mut(kind);
    match upserted {
        Upserted::Created(_) => stats.created += 1,
        Upserted::Reused(_) => stats.reused += 1,
    }
    Ok(())
}

/// Log the closing summary line of a stage
pub(crate) fn log_summary(ctx: &mut RunContext, kind: EntityKind) {
    let summary = ctx.stats.entity(kind).display_string();
    ctx.log.info(format!("Finished {}: {}", kind.plural(), summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetTable;
    use uuid::Uuid;

    #[test]
    fn test_settle_created_sets_registry() {
        let mut ctx = RunContext::new();
        let id = Uuid::new_v4();

        settle(&mut ctx, EntityKind::Organization, "recOrg1", "recOrg1", Ok(Upserted::Created(id))).unwrap();

        assert_eq!(ctx.registry.resolve(EntityKind::Organization, "recOrg1"), Some(id));
        assert_eq!(ctx.stats.organizations.created, 1);
    }

    #[test]
    fn test_settle_reused_counts_separately() {
        let mut ctx = RunContext::new();

        settle(&mut ctx, EntityKind::Organization, "recOrg1", "recOrg1", Ok(Upserted::Reused(Uuid::new_v4()))).unwrap();

        assert_eq!(ctx.stats.organizations.reused, 1);
        assert_eq!(ctx.stats.organizations.created, 0);
    }

    #[test]
    fn test_settle_recoverable_error_is_counted_not_returned() {
        let mut ctx = RunContext::new();
        let outcome = Err(RecordError::Transform(TransformError::MissingField("Title")));

        settle(&mut ctx, EntityKind::Story, "recStory1", "recStory1", outcome).unwrap();

        assert_eq!(ctx.stats.stories.errors, 1);
        assert_eq!(ctx.log.errors().len(), 1);
        assert!(ctx.registry.is_empty(EntityKind::Story));
    }

    #[test]
    fn test_settle_unrecoverable_error_is_returned() {
        let mut ctx = RunContext::new();
        let outcome = Err(RecordError::Target(TargetError::Unavailable("connection reset".to_string())));

        let result = settle(&mut ctx, EntityKind::Story, "recStory1", "recStory1", outcome);

        assert!(result.is_err());
        assert_eq!(ctx.stats.stories.errors, 0);
    }

    #[test]
    fn test_settle_rejected_row_is_recoverable() {
        let mut ctx = RunContext::new();
        let outcome = Err(RecordError::Target(TargetError::Rejected {
            table: TargetTable::Stories,
            detail: "CHECK constraint failed".to_string(),
        }));

        settle(&mut ctx, EntityKind::Story, "recStory1", "recStory1", outcome).unwrap();
        assert_eq!(ctx.stats.stories.errors, 1);
    }

    #[test]
    fn test_settle_registry_conflict_is_counted() {
        let mut ctx = RunContext::new();
        ctx.registry.set(EntityKind::Profile, "a@example.com", Uuid::new_v4()).unwrap();

        settle(
            &mut ctx,
            EntityKind::Profile,
            "a@example.com",
            "a@example.com",
            Ok(Upserted::Created(Uuid::new_v4())),
        )
        .unwrap();

        assert_eq!(ctx.stats.profiles.errors, 1);
        assert_eq!(ctx.stats.profiles.created, 0);
    }
}
