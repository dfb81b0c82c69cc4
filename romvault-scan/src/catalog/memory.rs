//! In-memory catalog for tests and dry runs

use async_trait::async_trait;
use romvault_common::models::{PlatformFolder, RomEntry, ScanRun};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Catalog;
use crate::error::{Result, ScanError};

#[derive(Default)]
struct Tables {
    platforms: HashMap<Uuid, PlatformFolder>,
    roms: HashMap<Uuid, RomEntry>,
    runs: HashMap<Uuid, ScanRun>,
}

#[derive(Default)]
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored entry, sorted by platform then name
    pub async fn all_roms(&self) -> Vec<RomEntry> {
        let tables = self.tables.read().await;
        let mut roms: Vec<RomEntry> = tables.roms.values().cloned().collect();
        roms.sort_by(|a, b| {
            a.platform_id
                .cmp(&b.platform_id)
                .then_with(|| a.fs_name.cmp(&b.fs_name))
        });
        roms
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn platforms(&self) -> Result<Vec<PlatformFolder>> {
        let tables = self.tables.read().await;
        let mut platforms: Vec<PlatformFolder> = tables.platforms.values().cloned().collect();
        platforms.sort_by(|a, b| a.fs_slug.cmp(&b.fs_slug));
        Ok(platforms)
    }

    async fn upsert_platform(&self, platform: &PlatformFolder) -> Result<()> {
        let mut tables = self.tables.write().await;
        let clash = tables
            .platforms
            .values()
            .any(|p| p.fs_slug == platform.fs_slug && p.id != platform.id);
        if clash {
            return Err(ScanError::Catalog(romvault_common::Error::InvalidInput(format!(
                "platform folder {} already recorded",
                platform.fs_slug
            ))));
        }
        tables.platforms.insert(platform.id, platform.clone());
        Ok(())
    }

    async fn roms_for_platform(&self, platform_id: Uuid) -> Result<Vec<RomEntry>> {
        let tables = self.tables.read().await;
        let mut roms: Vec<RomEntry> = tables
            .roms
            .values()
            .filter(|r| r.platform_id == platform_id)
            .cloned()
            .collect();
        roms.sort_by(|a, b| a.fs_name.cmp(&b.fs_name));
        Ok(roms)
    }

    async fn get_rom(&self, id: Uuid) -> Result<Option<RomEntry>> {
        Ok(self.tables.read().await.roms.get(&id).cloned())
    }

    async fn upsert_rom(&self, rom: &RomEntry) -> Result<()> {
        let mut tables = self.tables.write().await;
        let clash = tables
            .roms
            .values()
            .any(|r| r.platform_id == rom.platform_id && r.fs_name == rom.fs_name && r.id != rom.id);
        if clash {
            return Err(ScanError::Catalog(romvault_common::Error::InvalidInput(format!(
                "entry {} already recorded",
                rom.fs_name
            ))));
        }
        tables.roms.insert(rom.id, rom.clone());
        Ok(())
    }

    async fn save_scan_run(&self, run: &ScanRun) -> Result<()> {
        self.tables.write().await.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn get_scan_run(&self, id: Uuid) -> Result<Option<ScanRun>> {
        Ok(self.tables.read().await.runs.get(&id).cloned())
    }
}
