//! Target store gateway
//!
//! Inserts and looks up rows in the normalized target store. Every failure
//! is surfaced as a [`TargetError`]; a unique-constraint conflict is its own
//! variant so callers can fall back to the natural-key lookup instead of
//! treating it as a failure.

pub mod retry;
pub mod rows;
pub mod schema;
pub mod sqlite;

pub use rows::{NewCommunity, NewOrganization, NewProfile, NewStory, TargetRow};
pub use sqlite::SqliteTarget;

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Target store table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetTable {
    Organizations,
    Communities,
    Profiles,
    Stories,
    PlatformMetrics,
}

impl TargetTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetTable::Organizations => "organizations",
            TargetTable::Communities => "communities",
            TargetTable::Profiles => "profiles",
            TargetTable::Stories => "stories",
            TargetTable::PlatformMetrics => "platform_metrics",
        }
    }

    /// Column holding the natural key, if the table has one
    pub fn natural_key_column(&self) -> Option<&'static str> {
        match self {
            TargetTable::Organizations | TargetTable::Communities => Some("slug"),
            TargetTable::Profiles => Some("email"),
            TargetTable::Stories => Some("source_record_id"),
            TargetTable::PlatformMetrics => None,
        }
    }
}

impl fmt::Display for TargetTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured target store error
#[derive(Debug, Error)]
pub enum TargetError {
    /// Natural key already present; resolved by reusing the existing row
    #[error("unique constraint violated on {table}: {detail}")]
    UniqueViolation { table: TargetTable, detail: String },

    /// Row refused for a reason specific to that row
    #[error("row rejected by {table}: {detail}")]
    Rejected { table: TargetTable, detail: String },

    /// Connectivity or authorization failure
    #[error("target store unavailable: {0}")]
    Unavailable(String),

    /// Target schema does not match what the pipeline writes
    #[error("target schema mismatch: {0}")]
    Schema(String),
}

impl TargetError {
    /// Unrecoverable errors abort the whole run
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, TargetError::Unavailable(_) | TargetError::Schema(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, TargetError::UniqueViolation { .. })
    }
}

/// Equality filter for counts
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    TextEq(&'static str, String),
    BoolEq(&'static str, bool),
}

/// Write/lookup interface onto the target store
#[async_trait::async_trait]
pub trait TargetGateway: Send + Sync {
    /// Check that every table the pipeline writes exists
    async fn verify_schema(&self) -> Result<(), TargetError>;

    /// Insert a row, returning its generated id
    async fn insert(&self, row: &TargetRow) -> Result<Uuid, TargetError>;

    /// Id of the row whose natural key equals `key`
    async fn find_by_natural_key(&self, table: TargetTable, key: &str) -> Result<Option<Uuid>, TargetError>;

    /// Number of rows in `table`, optionally filtered
    async fn count(&self, table: TargetTable, filter: Option<&Filter>) -> Result<u64, TargetError>;

    /// Write (or overwrite) one reporting metric
    async fn upsert_metric(&self, name: &str, value: u64, computed_at: DateTime<Utc>) -> Result<(), TargetError>;
}

/// Outcome of an upsert-by-natural-key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created(Uuid),
    /// A row with the same natural key already existed
    Reused(Uuid),
}

impl Upserted {
    pub fn id(&self) -> Uuid {
        match self {
            Upserted::Created(id) | Upserted::Reused(id) => *id,
        }
    }
}

/// Insert `row`, or reuse the existing row on a natural-key conflict
///
/// A unique violation whose natural key cannot be found afterwards came
/// from some other constraint and is reported as a rejection.
pub async fn insert_or_reuse(target: &dyn TargetGateway, row: &TargetRow) -> Result<Upserted, TargetError> {
    match target.insert(row).await {
        Ok(id) => Ok(Upserted::Created(id)),
        Err(TargetError::UniqueViolation { table, detail }) => {
            match target.find_by_natural_key(table, row.natural_key()).await? {
                Some(existing) => {
                    tracing::debug!(
                        table = %table,
                        natural_key = %row.natural_key(),
                        id = %existing,
                        "Natural key exists, reusing target row"
                    );
                    Ok(Upserted::Reused(existing))
                }
                None => Err(TargetError::Rejected {
                    table,
                    detail: format!("unique violation not on natural key: {}", detail),
                }),
            }
        }
        Err(e) => Err(e),
    }
}
