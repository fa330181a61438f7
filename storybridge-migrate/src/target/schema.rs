//! Target store schema
//!
//! The migration never creates or alters the production schema; it only
//! checks that [`REQUIRED_TABLES`] exist before writing. [`initialize_schema`]
//! bootstraps an empty SQLite target for local runs and tests.

use sqlx::SqlitePool;

/// Tables the pipeline writes to
pub const REQUIRED_TABLES: [&str; 5] = [
    "organizations",
    "communities",
    "profiles",
    "stories",
    "platform_metrics",
];

/// Slug of the catch-all community stories are attached to
pub const GLOBAL_COMMUNITY_SLUG: &str = "global";

/// Create every target table if it does not exist
pub async fn initialize_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            organization_type TEXT NOT NULL CHECK (organization_type IN (
                'nonprofit', 'community_group', 'government', 'social_enterprise',
                'business', 'education', 'health', 'other'
            )),
            description TEXT,
            website TEXT,
            location TEXT,
            source_record_id TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS communities (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT,
            organization_id TEXT REFERENCES organizations(id),
            is_active INTEGER NOT NULL DEFAULT 1,
            source_record_id TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT,
            age_range TEXT,
            location TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stories (
            id TEXT PRIMARY KEY,
            source_record_id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            content TEXT,
            category TEXT NOT NULL CHECK (category IN (
                'healthcare', 'education', 'housing', 'justice', 'environment',
                'culture', 'employment', 'family', 'youth', 'community'
            )),
            privacy_level TEXT NOT NULL CHECK (privacy_level IN (
                'public', 'community', 'organization', 'private'
            )),
            status TEXT NOT NULL CHECK (status IN (
                'draft', 'pending', 'approved', 'rejected', 'archived'
            )),
            contributor_id TEXT REFERENCES profiles(id),
            organization_id TEXT REFERENCES organizations(id),
            community_id TEXT REFERENCES communities(id),
            tags TEXT NOT NULL DEFAULT '[]',
            submitted_at TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS platform_metrics (
            metric TEXT PRIMARY KEY,
            value INTEGER NOT NULL,
            computed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Target schema initialized ({})", REQUIRED_TABLES.join(", "));

    Ok(())
}

/// Insert the catch-all `global` community if it is missing
pub async fn ensure_global_community(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO communities (id, name, slug, description, is_active)
        VALUES (?, 'Global', ?, 'Stories not tied to a specific community', 1)
        ON CONFLICT(slug) DO NOTHING
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(GLOBAL_COMMUNITY_SLUG)
    .execute(pool)
    .await?;

    Ok(())
}

/// Tables from [`REQUIRED_TABLES`] missing from the database
pub async fn missing_tables(pool: &SqlitePool) -> sqlx::Result<Vec<&'static str>> {
    let existing: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(pool)
    .await?;

    Ok(REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|table| !existing.iter().any(|name| name == table))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database")
    }

    #[tokio::test]
    async fn test_empty_database_misses_every_table() {
        let pool = memory_pool().await;
        let missing = missing_tables(&pool).await.unwrap();
        assert_eq!(missing, REQUIRED_TABLES.to_vec());
    }

    #[tokio::test]
    async fn test_initialize_schema_is_idempotent() {
        let pool = memory_pool().await;

        initialize_schema(&pool).await.unwrap();
        initialize_schema(&pool).await.unwrap();

        assert!(missing_tables(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_global_community_inserts_once() {
        let pool = memory_pool().await;
        initialize_schema(&pool).await.unwrap();

        ensure_global_community(&pool).await.unwrap();
        ensure_global_community(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM communities WHERE slug = 'global'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
