//! SQLite target gateway
//!
//! Ids are generated as UUIDv4 and stored as TEXT. Every statement is
//! wrapped in [`retry_on_lock`] so a briefly locked database delays the run
//! instead of failing a record.

use super::retry::retry_on_lock;
use super::schema::missing_tables;
use super::{Filter, TargetError, TargetGateway, TargetRow, TargetTable};
use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

/// Classify a sqlx error raised while working on `table`
pub fn classify(err: sqlx::Error, table: TargetTable) -> TargetError {
    match err {
        sqlx::Error::Database(db_err) => {
            let detail = db_err.message().to_string();
            match db_err.kind() {
                ErrorKind::UniqueViolation => TargetError::UniqueViolation { table, detail },
                ErrorKind::ForeignKeyViolation | ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    TargetError::Rejected { table, detail }
                }
                _ if detail.contains("no such table")
                    || detail.contains("no such column")
                    || detail.contains("has no column") =>
                {
                    TargetError::Schema(format!("{}: {}", table, detail))
                }
                _ if detail.contains("database is locked") || detail.contains("unable to open") => {
                    TargetError::Unavailable(detail)
                }
                _ => TargetError::Rejected { table, detail },
            }
        }
        sqlx::Error::Io(e) => TargetError::Unavailable(e.to_string()),
        sqlx::Error::Tls(e) => TargetError::Unavailable(e.to_string()),
        sqlx::Error::Configuration(e) => TargetError::Unavailable(e.to_string()),
        sqlx::Error::PoolTimedOut => TargetError::Unavailable("connection pool timed out".to_string()),
        sqlx::Error::PoolClosed => TargetError::Unavailable("connection pool closed".to_string()),
        sqlx::Error::WorkerCrashed => TargetError::Unavailable("database worker crashed".to_string()),
        sqlx::Error::ColumnNotFound(column) => {
            TargetError::Schema(format!("{}: column {} not found", table, column))
        }
        other @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::TypeNotFound { .. }) => {
            TargetError::Schema(format!("{}: {}", table, other))
        }
        other => TargetError::Rejected {
            table,
            detail: other.to_string(),
        },
    }
}

fn parse_id(raw: &str, table: TargetTable) -> Result<Uuid, TargetError> {
    Uuid::parse_str(raw).map_err(|e| TargetError::Schema(format!("{}: id '{}' is not a UUID: {}", table, raw, e)))
}

fn opt_id(id: Option<Uuid>) -> Option<String> {
    id.map(|id| id.to_string())
}

/// SQLite-backed target store
#[derive(Clone)]
pub struct SqliteTarget {
    pool: SqlitePool,
    lock_wait_ms: u64,
}

impl SqliteTarget {
    /// Connect with foreign keys enforced
    pub async fn connect(database_url: &str, lock_wait_ms: u64) -> Result<Self, TargetError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| TargetError::Unavailable(format!("invalid database URL: {}", e)))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| TargetError::Unavailable(e.to_string()))?;

        tracing::debug!("Connected to target store");
        Ok(Self::from_pool(pool, lock_wait_ms))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool, lock_wait_ms: u64) -> Self {
        Self { pool, lock_wait_ms }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn execute_insert(&self, id: Uuid, row: &TargetRow) -> sqlx::Result<()> {
        let id = id.to_string();
        match row {
            TargetRow::Organization(org) => {
                sqlx::query(
                    r#"
                    INSERT INTO organizations (
                        id, name, slug, organization_type, description, website, location,
                        source_record_id, created_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
                    "#,
                )
                .bind(&id)
                .bind(&org.name)
                .bind(&org.slug)
                .bind(org.organization_type.as_str())
                .bind(&org.description)
                .bind(&org.website)
                .bind(&org.location)
                .bind(&org.source_record_id)
                .execute(&self.pool)
                .await?;
            }
            TargetRow::Community(community) => {
                sqlx::query(
                    r#"
                    INSERT INTO communities (
                        id, name, slug, description, organization_id, is_active,
                        source_record_id, created_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
                    "#,
                )
                .bind(&id)
                .bind(&community.name)
                .bind(&community.slug)
                .bind(&community.description)
                .bind(opt_id(community.organization_id))
                .bind(community.is_active)
                .bind(&community.source_record_id)
                .execute(&self.pool)
                .await?;
            }
            TargetRow::Profile(profile) => {
                sqlx::query(
                    r#"
                    INSERT INTO profiles (id, email, display_name, age_range, location, created_at)
                    VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
                    "#,
                )
                .bind(&id)
                .bind(&profile.email)
                .bind(&profile.display_name)
                .bind(&profile.age_range)
                .bind(&profile.location)
                .execute(&self.pool)
                .await?;
            }
            TargetRow::Story(story) => {
                let tags = serde_json::to_string(&story.tags)
                    .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
                sqlx::query(
                    r#"
                    INSERT INTO stories (
                        id, source_record_id, title, content, category, privacy_level, status,
                        contributor_id, organization_id, community_id, tags, submitted_at, created_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
                    "#,
                )
                .bind(&id)
                .bind(&story.source_record_id)
                .bind(&story.title)
                .bind(&story.content)
                .bind(story.category.as_str())
                .bind(story.privacy_level.as_str())
                .bind(story.status.as_str())
                .bind(opt_id(story.contributor_id))
                .bind(opt_id(story.organization_id))
                .bind(opt_id(story.community_id))
                .bind(tags)
                .bind(&story.submitted_at)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TargetGateway for SqliteTarget {
    async fn verify_schema(&self) -> Result<(), TargetError> {
        let missing = missing_tables(&self.pool)
            .await
            .map_err(|e| TargetError::Unavailable(e.to_string()))?;

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TargetError::Schema(format!("missing tables: {}", missing.join(", "))))
        }
    }

    async fn insert(&self, row: &TargetRow) -> Result<Uuid, TargetError> {
        let table = row.table();
        let id = Uuid::new_v4();

        retry_on_lock(table.as_str(), self.lock_wait_ms, || self.execute_insert(id, row))
            .await
            .map_err(|e| classify(e, table))?;

        Ok(id)
    }

    async fn find_by_natural_key(&self, table: TargetTable, key: &str) -> Result<Option<Uuid>, TargetError> {
        let column = table
            .natural_key_column()
            .ok_or_else(|| TargetError::Schema(format!("{} has no natural key", table)))?;

        let sql = format!("SELECT id FROM {} WHERE {} = ?", table.as_str(), column);
        let row = retry_on_lock(table.as_str(), self.lock_wait_ms, || {
            sqlx::query(&sql).bind(key).fetch_optional(&self.pool)
        })
        .await
        .map_err(|e| classify(e, table))?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("id").map_err(|e| classify(e, table))?;
                Ok(Some(parse_id(&raw, table)?))
            }
            None => Ok(None),
        }
    }

    async fn count(&self, table: TargetTable, filter: Option<&Filter>) -> Result<u64, TargetError> {
        let sql = match filter {
            None => format!("SELECT COUNT(*) FROM {}", table.as_str()),
            Some(Filter::TextEq(column, _)) | Some(Filter::BoolEq(column, _)) => {
                format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table.as_str(), column)
            }
        };

        let count: i64 = retry_on_lock(table.as_str(), self.lock_wait_ms, || {
            let query = sqlx::query_scalar::<_, i64>(&sql);
            let query = match filter {
                None => query,
                Some(Filter::TextEq(_, value)) => query.bind(value.clone()),
                Some(Filter::BoolEq(_, value)) => query.bind(*value),
            };
            query.fetch_one(&self.pool)
        })
        .await
        .map_err(|e| classify(e, table))?;

        Ok(count.max(0) as u64)
    }

    async fn upsert_metric(&self, name: &str, value: u64, computed_at: DateTime<Utc>) -> Result<(), TargetError> {
        let value = i64::try_from(value).unwrap_or(i64::MAX);
        let computed_at = computed_at.to_rfc3339();

        retry_on_lock("platform_metrics", self.lock_wait_ms, || {
            sqlx::query(
                r#"
                INSERT INTO platform_metrics (metric, value, computed_at)
                VALUES (?, ?, ?)
                ON CONFLICT(metric) DO UPDATE SET
                    value = excluded.value,
                    computed_at = excluded.computed_at
                "#,
            )
            .bind(name)
            .bind(value)
            .bind(&computed_at)
            .execute(&self.pool)
        })
        .await
        .map_err(|e| classify(e, TargetTable::PlatformMetrics))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::OrganizationType;
    use crate::target::schema::initialize_schema;
    use crate::target::{insert_or_reuse, NewOrganization, NewProfile, Upserted};

    async fn memory_target() -> SqliteTarget {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        initialize_schema(&pool).await.expect("Schema initialization failed");
        SqliteTarget::from_pool(pool, 100)
    }

    fn organization(slug: &str) -> TargetRow {
        TargetRow::Organization(NewOrganization {
            name: "Orange Sky".to_string(),
            slug: slug.to_string(),
            organization_type: OrganizationType::Nonprofit,
            description: None,
            website: Some("https://orangesky.org.au".to_string()),
            location: None,
            source_record_id: "recOrg1".to_string(),
        })
    }

    #[tokio::test]
    async fn test_insert_and_find_by_natural_key() {
        let target = memory_target().await;

        let id = target.insert(&organization("orange-sky")).await.unwrap();
        let found = target
            .find_by_natural_key(TargetTable::Organizations, "orange-sky")
            .await
            .unwrap();

        assert_eq!(found, Some(id));
    }

    #[tokio::test]
    async fn test_duplicate_natural_key_is_unique_violation() {
        let target = memory_target().await;
        target.insert(&organization("orange-sky")).await.unwrap();

        let err = target.insert(&organization("orange-sky")).await.unwrap_err();

        assert!(err.is_unique_violation());
        assert!(!err.is_unrecoverable());
    }

    #[tokio::test]
    async fn test_insert_or_reuse_returns_existing_id() {
        let target = memory_target().await;

        let first = insert_or_reuse(&target, &organization("orange-sky")).await.unwrap();
        let second = insert_or_reuse(&target, &organization("orange-sky")).await.unwrap();

        assert!(matches!(first, Upserted::Created(_)));
        assert_eq!(second, Upserted::Reused(first.id()));
        assert_eq!(target.count(TargetTable::Organizations, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dangling_foreign_key_is_rejected() {
        let target = memory_target().await;
        let row = TargetRow::Community(crate::target::NewCommunity {
            name: "Ghost".to_string(),
            slug: "ghost".to_string(),
            description: None,
            organization_id: Some(Uuid::new_v4()),
            is_active: true,
            source_record_id: "recCom1".to_string(),
        });

        let err = target.insert(&row).await.unwrap_err();
        assert!(matches!(err, TargetError::Rejected { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_count_with_filter() {
        let target = memory_target().await;
        for email in ["a@example.com", "b@example.com"] {
            target
                .insert(&TargetRow::Profile(NewProfile {
                    email: email.to_string(),
                    display_name: None,
                    age_range: None,
                    location: None,
                }))
                .await
                .unwrap();
        }

        assert_eq!(target.count(TargetTable::Profiles, None).await.unwrap(), 2);
        let filter = Filter::TextEq("email", "a@example.com".to_string());
        assert_eq!(target.count(TargetTable::Profiles, Some(&filter)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_metric_overwrites() {
        let target = memory_target().await;

        target.upsert_metric("total_stories", 3, Utc::now()).await.unwrap();
        target.upsert_metric("total_stories", 5, Utc::now()).await.unwrap();

        let value: i64 = sqlx::query_scalar("SELECT value FROM platform_metrics WHERE metric = 'total_stories'")
            .fetch_one(target.pool())
            .await
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(target.count(TargetTable::PlatformMetrics, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_verify_schema_reports_missing_tables() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let target = SqliteTarget::from_pool(pool, 100);

        let err = target.verify_schema().await.unwrap_err();
        assert!(matches!(err, TargetError::Schema(ref msg) if msg.contains("organizations")));
        assert!(err.is_unrecoverable());
    }

    #[tokio::test]
    async fn test_count_waits_out_a_lock() {
        use sqlx::sqlite::SqliteJournalMode;
        use std::time::Duration;

        let dir = tempfile::TempDir::new().unwrap();
        // Rollback journal so an exclusive transaction also blocks readers
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("target.db"))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .busy_timeout(Duration::ZERO);

        let holder = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await
            .unwrap();
        initialize_schema(&holder).await.unwrap();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        let target = SqliteTarget::from_pool(pool, 5000);
        target.insert(&organization("orange-sky")).await.unwrap();

        let mut conn = holder.acquire().await.unwrap();
        sqlx::query("BEGIN EXCLUSIVE").execute(&mut *conn).await.unwrap();
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            sqlx::query("COMMIT").execute(&mut *conn).await.unwrap();
        });

        let count = target.count(TargetTable::Organizations, None).await.unwrap();
        release.await.unwrap();

        assert_eq!(count, 1);
    }
}
