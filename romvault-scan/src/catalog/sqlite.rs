//! SQLite catalog
//!
//! Raw `sqlx` queries against the tables created by
//! `romvault_common::db::init_database`. Structured columns (files, tags,
//! hashes, external ids, metadata, failure, stats) are JSON text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use romvault_common::models::{PlatformFolder, RomEntry, ScanRun, ScanState, ScanType};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use uuid::Uuid;

use super::Catalog;
use crate::error::{Result, ScanError};

const ROM_COLUMNS: &str = r#"
    id, platform_id, fs_name, fs_name_no_tags, fs_extension, is_directory, multi,
    files, tags, hashes, size, mtime, external_ids, metadata, is_unidentified,
    is_partial, failure, missing_from_fs, user_main_sibling, sibling_group,
    is_main_sibling, last_scanned_at
"#;

#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| {
        ScanError::Catalog(romvault_common::Error::Internal(format!("invalid uuid {:?}: {}", value, e)))
    })
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            ScanError::Catalog(romvault_common::Error::Internal(format!(
                "invalid timestamp {:?}: {}",
                value, e
            )))
        })
}

fn internal(message: String) -> ScanError {
    ScanError::Catalog(romvault_common::Error::Internal(message))
}

fn row_to_platform(row: &SqliteRow) -> Result<PlatformFolder> {
    let id: String = row.get("id");
    Ok(PlatformFolder {
        id: parse_uuid(&id)?,
        fs_slug: row.get("fs_slug"),
        slug: row.get("slug"),
        name: row.get("name"),
        missing_from_fs: row.get("missing_from_fs"),
    })
}

fn row_to_rom(row: &SqliteRow) -> Result<RomEntry> {
    let id: String = row.get("id");
    let platform_id: String = row.get("platform_id");
    let files: String = row.get("files");
    let tags: String = row.get("tags");
    let hashes: String = row.get("hashes");
    let external_ids: String = row.get("external_ids");
    let metadata: String = row.get("metadata");
    let failure: String = row.get("failure");
    let sibling_group: Option<String> = row.get("sibling_group");
    let last_scanned_at: Option<String> = row.get("last_scanned_at");
    let size: i64 = row.get("size");

    Ok(RomEntry {
        id: parse_uuid(&id)?,
        platform_id: parse_uuid(&platform_id)?,
        fs_name: row.get("fs_name"),
        fs_name_no_tags: row.get("fs_name_no_tags"),
        fs_extension: row.get("fs_extension"),
        is_directory: row.get("is_directory"),
        multi: row.get("multi"),
        files: serde_json::from_str(&files)?,
        tags: serde_json::from_str(&tags)?,
        hashes: serde_json::from_str(&hashes)?,
        size: size.max(0) as u64,
        mtime: row.get("mtime"),
        external_ids: serde_json::from_str(&external_ids)?,
        metadata: serde_json::from_str(&metadata)?,
        is_unidentified: row.get("is_unidentified"),
        is_partial: row.get("is_partial"),
        failure: serde_json::from_str(&failure)?,
        missing_from_fs: row.get("missing_from_fs"),
        user_main_sibling: row.get("user_main_sibling"),
        sibling_group: sibling_group.as_deref().map(parse_uuid).transpose()?,
        is_main_sibling: row.get("is_main_sibling"),
        last_scanned_at: last_scanned_at.as_deref().map(parse_time).transpose()?,
    })
}

fn row_to_run(row: &SqliteRow) -> Result<ScanRun> {
    let id: String = row.get("id");
    let scan_type: String = row.get("scan_type");
    let platforms: String = row.get("platforms");
    let providers: String = row.get("providers");
    let state: String = row.get("state");
    let stats: String = row.get("stats");
    let started_at: String = row.get("started_at");
    let ended_at: Option<String> = row.get("ended_at");

    Ok(ScanRun {
        id: parse_uuid(&id)?,
        scan_type: scan_type.parse::<ScanType>().map_err(internal)?,
        platforms: serde_json::from_str(&platforms)?,
        providers: serde_json::from_str(&providers)?,
        state: state.parse::<ScanState>().map_err(internal)?,
        stats: serde_json::from_str(&stats)?,
        cancelled: row.get("cancelled"),
        failure: row.get("failure"),
        started_at: parse_time(&started_at)?,
        ended_at: ended_at.as_deref().map(parse_time).transpose()?,
    })
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the catalog database at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = romvault_common::db::init_database(path).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn platforms(&self) -> Result<Vec<PlatformFolder>> {
        let rows = sqlx::query(
            "SELECT id, fs_slug, slug, name, missing_from_fs FROM platforms ORDER BY fs_slug",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_platform).collect()
    }

    async fn upsert_platform(&self, platform: &PlatformFolder) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO platforms (id, fs_slug, slug, name, missing_from_fs, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                fs_slug = excluded.fs_slug,
                slug = excluded.slug,
                name = excluded.name,
                missing_from_fs = excluded.missing_from_fs,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(platform.id.to_string())
        .bind(&platform.fs_slug)
        .bind(&platform.slug)
        .bind(&platform.name)
        .bind(platform.missing_from_fs)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn roms_for_platform(&self, platform_id: Uuid) -> Result<Vec<RomEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM roms WHERE platform_id = ? ORDER BY fs_name",
            ROM_COLUMNS
        ))
        .bind(platform_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rom).collect()
    }

    async fn get_rom(&self, id: Uuid) -> Result<Option<RomEntry>> {
        let row = sqlx::query(&format!("SELECT {} FROM roms WHERE id = ?", ROM_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_rom).transpose()
    }

    async fn upsert_rom(&self, rom: &RomEntry) -> Result<()> {
        // Serialize before touching the pool
        let files = serde_json::to_string(&rom.files)?;
        let tags = serde_json::to_string(&rom.tags)?;
        let hashes = serde_json::to_string(&rom.hashes)?;
        let external_ids = serde_json::to_string(&rom.external_ids)?;
        let metadata = serde_json::to_string(&rom.metadata)?;
        let failure = serde_json::to_string(&rom.failure)?;

        sqlx::query(
            r#"
            INSERT INTO roms (
                id, platform_id, fs_name, fs_name_no_tags, fs_extension, is_directory, multi,
                files, tags, hashes, size, mtime, external_ids, metadata, is_unidentified,
                is_partial, failure, missing_from_fs, user_main_sibling, sibling_group,
                is_main_sibling, last_scanned_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                fs_name = excluded.fs_name,
                fs_name_no_tags = excluded.fs_name_no_tags,
                fs_extension = excluded.fs_extension,
                is_directory = excluded.is_directory,
                multi = excluded.multi,
                files = excluded.files,
                tags = excluded.tags,
                hashes = excluded.hashes,
                size = excluded.size,
                mtime = excluded.mtime,
                external_ids = excluded.external_ids,
                metadata = excluded.metadata,
                is_unidentified = excluded.is_unidentified,
                is_partial = excluded.is_partial,
                failure = excluded.failure,
                missing_from_fs = excluded.missing_from_fs,
                user_main_sibling = excluded.user_main_sibling,
                sibling_group = excluded.sibling_group,
                is_main_sibling = excluded.is_main_sibling,
                last_scanned_at = excluded.last_scanned_at
            "#,
        )
        .bind(rom.id.to_string())
        .bind(rom.platform_id.to_string())
        .bind(&rom.fs_name)
        .bind(&rom.fs_name_no_tags)
        .bind(&rom.fs_extension)
        .bind(rom.is_directory)
        .bind(rom.multi)
        .bind(files)
        .bind(tags)
        .bind(hashes)
        .bind(rom.size as i64)
        .bind(rom.mtime)
        .bind(external_ids)
        .bind(metadata)
        .bind(rom.is_unidentified)
        .bind(rom.is_partial)
        .bind(failure)
        .bind(rom.missing_from_fs)
        .bind(rom.user_main_sibling)
        .bind(rom.sibling_group.map(|g| g.to_string()))
        .bind(rom.is_main_sibling)
        .bind(rom.last_scanned_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_scan_run(&self, run: &ScanRun) -> Result<()> {
        let platforms = serde_json::to_string(&run.platforms)?;
        let providers = serde_json::to_string(&run.providers)?;
        let stats = serde_json::to_string(&run.stats)?;

        sqlx::query(
            r#"
            INSERT INTO scan_runs (
                id, scan_type, platforms, providers, state, stats, cancelled, failure,
                started_at, ended_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                state = excluded.state,
                stats = excluded.stats,
                cancelled = excluded.cancelled,
                failure = excluded.failure,
                ended_at = excluded.ended_at
            "#,
        )
        .bind(run.id.to_string())
        .bind(run.scan_type.as_str())
        .bind(platforms)
        .bind(providers)
        .bind(run.state.as_str())
        .bind(stats)
        .bind(run.cancelled)
        .bind(&run.failure)
        .bind(run.started_at.to_rfc3339())
        .bind(run.ended_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_scan_run(&self, id: Uuid) -> Result<Option<ScanRun>> {
        let row = sqlx::query(
            r#"
            SELECT id, scan_type, platforms, providers, state, stats, cancelled, failure,
                   started_at, ended_at
            FROM scan_runs
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_run).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use romvault_common::models::{FileCategory, GameMetadata, ProviderId, RomFile, RomHashes};
    use tempfile::TempDir;

    async fn catalog(dir: &TempDir) -> SqliteCatalog {
        SqliteCatalog::open(&dir.path().join("catalog.db")).await.unwrap()
    }

    #[tokio::test]
    async fn test_rom_roundtrip_preserves_json_columns() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir).await;

        let platform = PlatformFolder::new("gba", Some("gba".to_string()), Some("Game Boy Advance".to_string()));
        catalog.upsert_platform(&platform).await.unwrap();

        let mut rom = RomEntry::new(platform.id, "Game (USA).gba");
        rom.fs_name_no_tags = "Game".to_string();
        rom.fs_extension = "gba".to_string();
        rom.files.push(RomFile {
            file_name: "Game (USA).gba".to_string(),
            rel_path: "Game (USA).gba".to_string(),
            size: 4,
            mtime: Some(1_700_000_000),
            category: FileCategory::Primary,
            hashes: RomHashes {
                crc32: Some("deadbeef".to_string()),
                ..Default::default()
            },
        });
        rom.size = 4;
        rom.mtime = Some(1_700_000_000);
        rom.external_ids.insert(ProviderId::Igdb, "42".to_string());
        rom.metadata = GameMetadata {
            name: Some("Game".to_string()),
            ..Default::default()
        };
        rom.is_unidentified = false;
        rom.is_partial = true;
        rom.sibling_group = Some(rom.id);
        rom.last_scanned_at = Some(Utc::now());
        catalog.upsert_rom(&rom).await.unwrap();

        let loaded = catalog.get_rom(rom.id).await.unwrap().unwrap();
        assert_eq!(loaded.files, rom.files);
        assert_eq!(loaded.external_ids, rom.external_ids);
        assert_eq!(loaded.metadata, rom.metadata);
        assert!(loaded.is_partial);
        assert_eq!(loaded.sibling_group, Some(rom.id));
    }

    #[tokio::test]
    async fn test_upsert_by_id_replaces_path() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir).await;
        let platform = PlatformFolder::new("nes", None, None);
        catalog.upsert_platform(&platform).await.unwrap();

        let mut rom = RomEntry::new(platform.id, "old.nes");
        catalog.upsert_rom(&rom).await.unwrap();
        rom.fs_name = "new.nes".to_string();
        catalog.upsert_rom(&rom).await.unwrap();

        let roms = catalog.roms_for_platform(platform.id).await.unwrap();
        assert_eq!(roms.len(), 1);
        assert_eq!(roms[0].fs_name, "new.nes");
        assert_eq!(roms[0].id, rom.id);
    }

    #[tokio::test]
    async fn test_scan_run_persisted() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir).await;

        let mut run = ScanRun::new(ScanType::Quick, vec!["gba".to_string()], vec![ProviderId::Ss]);
        run.transition_to(ScanState::Running);
        catalog.save_scan_run(&run).await.unwrap();
        run.stats.roms_added = 3;
        run.transition_to(ScanState::Completed);
        catalog.save_scan_run(&run).await.unwrap();

        let loaded = catalog.get_scan_run(run.id).await.unwrap().unwrap();
        assert_eq!(loaded.state, ScanState::Completed);
        assert_eq!(loaded.stats.roms_added, 3);
        assert!(loaded.ended_at.is_some());
        assert_eq!(loaded.providers, vec![ProviderId::Ss]);
    }
}
