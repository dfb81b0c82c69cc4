//! Persisted catalog interface
//!
//! The orchestrator owns a catalog handle for the duration of a run and is
//! its only writer. Every entry write is a single upsert so readers observe
//! each entry atomically while a scan is in progress.

mod memory;
mod sqlite;

pub use memory::MemoryCatalog;
pub use sqlite::SqliteCatalog;

use async_trait::async_trait;
use romvault_common::models::{PlatformFolder, RomEntry, ScanRun};
use uuid::Uuid;

use crate::error::Result;

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Every platform folder ever recorded, including missing ones
    async fn platforms(&self) -> Result<Vec<PlatformFolder>>;

    async fn upsert_platform(&self, platform: &PlatformFolder) -> Result<()>;

    /// Previous snapshot of one platform's entries
    async fn roms_for_platform(&self, platform_id: Uuid) -> Result<Vec<RomEntry>>;

    async fn get_rom(&self, id: Uuid) -> Result<Option<RomEntry>>;

    /// Insert or replace an entry by id
    async fn upsert_rom(&self, rom: &RomEntry) -> Result<()>;

    async fn save_scan_run(&self, run: &ScanRun) -> Result<()>;

    async fn get_scan_run(&self, id: Uuid) -> Result<Option<ScanRun>>;
}
