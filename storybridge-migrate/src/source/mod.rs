//! Source adapters
//!
//! A source adapter returns the complete record set of one named table.
//! Pagination is the adapter's business; callers always get every record.
//! Any failure here is unrecoverable for the calling stage.

pub mod airtable;
pub mod static_source;

pub use airtable::AirtableSource;
pub use static_source::StaticSource;

use crate::models::SourceRecord;
use thiserror::Error;

/// Source table holding organization records
pub const ORGANIZATIONS_TABLE: &str = "Organizations";
/// Source table holding community records
pub const COMMUNITIES_TABLE: &str = "Communities";
/// Source table holding story records (also the profile source)
pub const STORIES_TABLE: &str = "Stories";

/// Source read failure
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source rejected credentials for table {table} (HTTP {status})")]
    Unauthorized { table: String, status: u16 },

    #[error("source request failed: {0}")]
    Network(String),

    #[error("source returned HTTP {status} for table {table}: {body}")]
    Api { table: String, status: u16, body: String },

    #[error("source response could not be parsed: {0}")]
    Parse(String),

    #[error("invalid source API URL: {0}")]
    InvalidUrl(String),

    #[error("source has no table named {0}")]
    UnknownTable(String),
}

/// Read interface onto the external record store
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short name for log lines
    fn name(&self) -> &'static str;

    /// Every record of `table`, optionally restricted to the named fields
    async fn fetch_all(
        &self,
        table: &str,
        fields: Option<&[&str]>,
    ) -> Result<Vec<SourceRecord>, SourceError>;
}
