//! Error types for storybridge-migrate
//!
//! A [`MigrateError`] is unrecoverable: it aborts the run and moves it to
//! FAILED. Per-record failures are [`crate::migrators::RecordError`]s and
//! never reach this type unless they wrap an unrecoverable target error.

use crate::models::{EntityKind, MigrationState};
use crate::orchestrator::Stage;
use crate::source::SourceError;
use crate::target::TargetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    /// A stage was started before the registries it reads were produced
    #[error("Stage {stage} cannot run before {missing:?} have been migrated")]
    StageOrder { stage: Stage, missing: Vec<EntityKind> },

    #[error("Invalid state transition {from} -> {to}")]
    InvalidTransition { from: MigrationState, to: MigrationState },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for run-level operations
pub type MigrateResult<T> = Result<T, MigrateError>;
