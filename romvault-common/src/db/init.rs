//! Database initialization
//!
//! Creates the catalog tables on first run. Every statement is idempotent so
//! opening an existing catalog is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new catalog database: {}", db_path.display());
    } else {
        info!("Opened existing catalog database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets UI readers observe committed entries while a scan writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all catalog tables on an open pool
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_platforms_table(pool).await?;
    create_roms_table(pool).await?;
    create_scan_runs_table(pool).await?;
    Ok(())
}

async fn create_platforms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS platforms (
            id TEXT PRIMARY KEY,
            fs_slug TEXT NOT NULL UNIQUE,
            slug TEXT,
            name TEXT,
            missing_from_fs INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_roms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS roms (
            id TEXT PRIMARY KEY,
            platform_id TEXT NOT NULL REFERENCES platforms(id) ON DELETE CASCADE,
            fs_name TEXT NOT NULL,
            fs_name_no_tags TEXT NOT NULL,
            fs_extension TEXT NOT NULL,
            is_directory INTEGER NOT NULL DEFAULT 0,
            multi INTEGER NOT NULL DEFAULT 0,
            files TEXT NOT NULL,
            tags TEXT NOT NULL,
            hashes TEXT NOT NULL,
            size INTEGER NOT NULL DEFAULT 0,
            mtime INTEGER,
            external_ids TEXT NOT NULL,
            metadata TEXT NOT NULL,
            is_unidentified INTEGER NOT NULL DEFAULT 1,
            is_partial INTEGER NOT NULL DEFAULT 0,
            failure TEXT NOT NULL,
            missing_from_fs INTEGER NOT NULL DEFAULT 0,
            user_main_sibling INTEGER NOT NULL DEFAULT 0,
            sibling_group TEXT,
            is_main_sibling INTEGER NOT NULL DEFAULT 0,
            last_scanned_at TIMESTAMP,
            UNIQUE (platform_id, fs_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_roms_platform ON roms(platform_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_roms_sibling_group ON roms(sibling_group)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_scan_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_runs (
            id TEXT PRIMARY KEY,
            scan_type TEXT NOT NULL,
            platforms TEXT NOT NULL,
            providers TEXT NOT NULL,
            state TEXT NOT NULL,
            stats TEXT NOT NULL,
            cancelled INTEGER NOT NULL DEFAULT 0,
            failure TEXT,
            started_at TIMESTAMP NOT NULL,
            ended_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_tables() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("catalog.db");

        let pool = init_database(&db_path).await.unwrap();
        assert!(db_path.exists());

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert!(tables.contains(&"platforms".to_string()));
        assert!(tables.contains(&"roms".to_string()));
        assert!(tables.contains(&"scan_runs".to_string()));
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("catalog.db");

        let pool = init_database(&db_path).await.unwrap();
        pool.close().await;
        init_database(&db_path).await.unwrap();
    }
}
