//! Test Helper Utilities
//!
//! Shared fixtures for storybridge-migrate integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use storybridge_migrate::models::SourceRecord;
use storybridge_migrate::source::{
    SourceAdapter, SourceError, StaticSource, COMMUNITIES_TABLE, ORGANIZATIONS_TABLE, STORIES_TABLE,
};
use storybridge_migrate::target::schema::{ensure_global_community, initialize_schema};
use storybridge_migrate::target::{Filter, SqliteTarget, TargetError, TargetGateway, TargetRow, TargetTable};
use tempfile::TempDir;
use uuid::Uuid;

/// In-memory target with the full schema but no `global` community
pub async fn empty_schema_target() -> Arc<SqliteTarget> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    initialize_schema(&pool).await.unwrap();
    Arc::new(SqliteTarget::from_pool(pool, 1000))
}

/// In-memory target ready for a run: schema plus the `global` community
pub async fn memory_target() -> Arc<SqliteTarget> {
    let target = empty_schema_target().await;
    ensure_global_community(target.pool()).await.unwrap();
    target
}

/// In-memory target without any tables
pub async fn bare_target() -> Arc<SqliteTarget> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    Arc::new(SqliteTarget::from_pool(pool, 1000))
}

pub fn log_dir() -> TempDir {
    TempDir::new().unwrap()
}

pub fn organization(id: &str, name: &str) -> SourceRecord {
    SourceRecord::new(id).with("Name", name).with("Type", "Nonprofit")
}

pub fn community(id: &str, name: &str, organization: Option<&str>) -> SourceRecord {
    let record = SourceRecord::new(id).with("Name", name).with("Active", true);
    match organization {
        Some(org) => record.with("Organization", vec![org]),
        None => record,
    }
}

pub fn story(id: &str, title: &str, email: Option<&str>, organization: Option<&str>) -> SourceRecord {
    let mut record = SourceRecord::new(id)
        .with("Title", title)
        .with("Story", format!("Body of {}", title))
        .with("Category", "Health")
        .with("Privacy Level", "Public")
        .with("Status", "Approved");
    if let Some(email) = email {
        record = record.with("Email", email).with("Storyteller Name", format!("Teller of {}", id));
    }
    if let Some(org) = organization {
        record = record.with("Organization", vec![org]);
    }
    record
}

/// Source with every table the pipeline reads
pub fn source(
    organizations: Vec<SourceRecord>,
    communities: Vec<SourceRecord>,
    stories: Vec<SourceRecord>,
) -> Arc<StaticSource> {
    Arc::new(
        StaticSource::new()
            .with_table(ORGANIZATIONS_TABLE, organizations)
            .with_table(COMMUNITIES_TABLE, communities)
            .with_table(STORIES_TABLE, stories),
    )
}

/// 2 organizations, 1 community linked to the first, 3 stories: two share a
/// contributor and link the second organization, one is anonymous
pub fn scenario_source() -> Arc<StaticSource> {
    source(
        vec![
            organization("recOrg1", "Orange Sky"),
            organization("recOrg2", "Palm Island Community Company"),
        ],
        vec![community("recCom1", "Townsville", Some("recOrg1"))],
        vec![
            story("recStory1", "Finding home", Some("maria@example.org"), Some("recOrg2")),
            story("recStory2", "Back on country", Some("Maria@Example.org"), Some("recOrg2")),
            story("recStory3", "Untitled journey", None, None),
        ],
    )
}

/// Source whose every fetch is refused
pub struct FailingSource;

#[async_trait::async_trait]
impl SourceAdapter for FailingSource {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn fetch_all(
        &self,
        table: &str,
        _fields: Option<&[&str]>,
    ) -> Result<Vec<SourceRecord>, SourceError> {
        Err(SourceError::Unauthorized {
            table: table.to_string(),
            status: 401,
        })
    }
}

/// Source that emits a `tracing` warning before delegating each fetch
pub struct NoisySource {
    pub inner: Arc<StaticSource>,
}

pub const NOISY_SOURCE_WARNING: &str = "Source throttled, retrying page";

#[async_trait::async_trait]
impl SourceAdapter for NoisySource {
    fn name(&self) -> &'static str {
        "noisy"
    }

    async fn fetch_all(
        &self,
        table: &str,
        fields: Option<&[&str]>,
    ) -> Result<Vec<SourceRecord>, SourceError> {
        tracing::warn!(table = %table, "{}", NOISY_SOURCE_WARNING);
        self.inner.fetch_all(table, fields).await
    }
}

/// Target that refuses every profile row and forwards everything else
pub struct ProfileRejectingTarget {
    pub inner: Arc<SqliteTarget>,
}

#[async_trait::async_trait]
impl TargetGateway for ProfileRejectingTarget {
    async fn verify_schema(&self) -> Result<(), TargetError> {
        self.inner.verify_schema().await
    }

    async fn insert(&self, row: &TargetRow) -> Result<Uuid, TargetError> {
        match row {
            TargetRow::Profile(_) => Err(TargetError::Rejected {
                table: TargetTable::Profiles,
                detail: "profile writes disabled".to_string(),
            }),
            _ => self.inner.insert(row).await,
        }
    }

    async fn find_by_natural_key(&self, table: TargetTable, key: &str) -> Result<Option<Uuid>, TargetError> {
        self.inner.find_by_natural_key(table, key).await
    }

    async fn count(&self, table: TargetTable, filter: Option<&Filter>) -> Result<u64, TargetError> {
        self.inner.count(table, filter).await
    }

    async fn upsert_metric(&self, name: &str, value: u64, computed_at: DateTime<Utc>) -> Result<(), TargetError> {
        self.inner.upsert_metric(name, value, computed_at).await
    }
}

pub async fn count(target: &SqliteTarget, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(target.pool())
        .await
        .unwrap()
}
