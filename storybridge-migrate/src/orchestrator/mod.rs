//! Migration orchestrator
//!
//! Drives one run through its states:
//!
//! ```text
//! INIT → MIGRATING_ORGANIZATIONS → MIGRATING_COMMUNITIES → MIGRATING_PROFILES
//!      → MIGRATING_STORIES → UPDATING_METRICS → COMPLETED
//! ```
//!
//! Any unrecoverable error moves the run to FAILED. Per-record errors never
//! do; they are counted and the stage carries on. Whatever the outcome, the
//! finalizer writes the run artifacts (see [`artifacts`]).

pub mod artifacts;
pub mod console;
pub mod context;
pub mod metrics;
pub mod run_log;
pub mod stage;
pub mod statistics;

pub use artifacts::RunArtifacts;
pub use console::ConsoleCapture;
pub use context::RunContext;
pub use metrics::PlatformMetrics;
pub use run_log::RunLog;
pub use stage::Stage;
pub use statistics::{EntityStats, MigrationStatistics, StatisticsDocument};

use crate::error::{MigrateError, MigrateResult};
use crate::migrators::{
    CommunitiesMigrator, EntityMigrator, OrganizationsMigrator, ProfilesMigrator, StoriesMigrator,
};
use crate::models::{EntityKind, MigrationState, StateTransition};
use crate::registry::IdRegistry;
use crate::source::SourceAdapter;
use crate::target::TargetGateway;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of one run
#[derive(Debug)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub state: MigrationState,
    pub statistics: MigrationStatistics,
    pub metrics: Option<PlatformMetrics>,
    /// Source id → target id mappings established by the run
    pub registry: IdRegistry,
    pub transitions: Vec<StateTransition>,
    pub duration_ms: u64,
    /// `None` if the artifacts could not be written
    pub artifacts: Option<RunArtifacts>,
    /// Message of the unrecoverable error, for FAILED runs
    pub failure: Option<String>,
}

impl MigrationReport {
    pub fn is_success(&self) -> bool {
        self.state == MigrationState::Completed
    }
}

/// Sequences the migration stages against one source and one target
pub struct Orchestrator {
    source: Arc<dyn SourceAdapter>,
    target: Arc<dyn TargetGateway>,
    log_dir: PathBuf,
    console: Option<ConsoleCapture>,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn SourceAdapter>, target: Arc<dyn TargetGateway>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            target,
            log_dir: log_dir.into(),
            console: None,
        }
    }

    /// Merge events captured from the console into the run log artifact
    ///
    /// `capture` must also be installed as a layer of the active subscriber.
    pub fn with_console_capture(mut self, capture: ConsoleCapture) -> Self {
        self.console = Some(capture);
        self
    }

    /// Execute a full run
    ///
    /// Never returns early: failures are reported through
    /// [`MigrationReport::state`] and [`MigrationReport::failure`].
    pub async fn run(&self) -> MigrationReport {
        let mut ctx = RunContext::new();
        ctx.log.info(format!(
            "Migration {} started ({} → target)",
            ctx.run_id,
            self.source.name()
        ));

        let failure = match self.execute(&mut ctx).await {
            Ok(()) => None,
            Err(e) => {
                ctx.log.error(format!("Migration failed in state {}: {}", ctx.state(), e));
                if !ctx.state().is_terminal() {
                    if let Err(transition_err) = ctx.transition_to(MigrationState::Failed) {
                        tracing::error!("Could not mark run as failed: {}", transition_err);
                    }
                }
                Some(e.to_string())
            }
        };

        self.finalize(ctx, failure)
    }

    async fn execute(&self, ctx: &mut RunContext) -> MigrateResult<()> {
        self.target.verify_schema().await?;

        for stage in Stage::PIPELINE {
            self.run_stage(stage, ctx).await?;
        }

        ctx.transition_to(MigrationState::Completed)?;
        Ok(())
    }

    /// Run one stage against `ctx`
    ///
    /// Fails with [`MigrateError::StageOrder`] if a registry the stage reads
    /// has not been produced yet.
    pub async fn run_stage(&self, stage: Stage, ctx: &mut RunContext) -> MigrateResult<()> {
        let missing = ctx.missing_dependencies(stage);
        if !missing.is_empty() {
            return Err(MigrateError::StageOrder { stage, missing });
        }

        ctx.transition_to(stage.state())?;

        let source = self.source.as_ref();
        let target = self.target.as_ref();
        match stage {
            Stage::Organizations => OrganizationsMigrator.migrate(source, target, ctx).await?,
            Stage::Communities => CommunitiesMigrator.migrate(source, target, ctx).await?,
            Stage::Profiles => ProfilesMigrator.migrate(source, target, ctx).await?,
            Stage::Stories => StoriesMigrator.migrate(source, target, ctx).await?,
            Stage::Metrics => {
                let computed = metrics::recompute(target).await?;
                metrics::publish(target, &computed).await?;
                ctx.log.info(format!(
                    "Platform metrics updated: {} organizations, {} communities ({} active), {} profiles, {} stories ({} approved, {} public)",
                    computed.total_organizations,
                    computed.total_communities,
                    computed.active_communities,
                    computed.total_profiles,
                    computed.total_stories,
                    computed.approved_stories,
                    computed.public_stories
                ));
                ctx.metrics = Some(computed);
            }
        }

        ctx.complete_stage(stage);
        Ok(())
    }

    /// Write artifacts and turn the context into a report
    fn finalize(&self, mut ctx: RunContext, failure: Option<String>) -> MigrationReport {
        let duration_ms = ctx.elapsed_ms();

        for kind in EntityKind::ALL {
            let summary = ctx.stats.entity(kind).display_string();
            ctx.log.info(format!("{}: {}", kind.plural(), summary));
        }
        ctx.log.info(format!(
            "Migration {} finished in state {} after {} ms with {} record errors",
            ctx.run_id,
            ctx.state(),
            duration_ms,
            ctx.stats.total_errors()
        ));

        let document = StatisticsDocument {
            run_id: ctx.run_id,
            state: ctx.state(),
            started_at: ctx.started_at,
            finished_at: Utc::now(),
            duration_ms,
            entities: ctx.stats.clone(),
            metrics: ctx.metrics.clone(),
            failure: failure.clone(),
        };

        if let Some(console) = &self.console {
            ctx.log.absorb(console.drain());
        }

        let artifacts = match artifacts::write_artifacts(&self.log_dir, ctx.started_at, &mut ctx.log, &document) {
            Ok(artifacts) => Some(artifacts),
            Err(e) => {
                tracing::error!(log_dir = %self.log_dir.display(), "Failed to write run artifacts: {}", e);
                None
            }
        };

        let state = ctx.state();
        let transitions = ctx.transitions().to_vec();
        MigrationReport {
            run_id: ctx.run_id,
            state,
            statistics: ctx.stats,
            metrics: ctx.metrics,
            transitions,
            registry: ctx.registry,
            duration_ms,
            artifacts,
            failure,
        }
    }
}
