//! Filesystem discovery
//!
//! Walks the library root, detects its layout, lists platform folders and
//! the ROM entries in each. Diffing against the catalog lives in [`diff`].

pub mod diff;
pub mod entries;
pub mod exclusions;
pub mod layout;
pub mod platforms;

pub use diff::{diff_entries, diff_platforms, DiffedEntry, EntryChange, FolderDiff, PlatformDiff};
pub use entries::{disc_group_key, DiscoveredEntry};
pub use exclusions::Exclusions;
pub use layout::{detect_layout, Layout, LayoutDetection};
pub use platforms::{PlatformInfo, PlatformTable, ProviderPlatformIds};

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ScanSettings;
use crate::error::{Result, ScanError};

/// Library-root view used by a scan run
#[derive(Debug, Clone)]
pub struct Discoverer {
    root: PathBuf,
    layout: Layout,
    table: PlatformTable,
    exclusions: Exclusions,
}

/// Check that the library root exists and is a readable directory
pub fn validate_library_root(root: &Path) -> Result<()> {
    let meta = std::fs::metadata(root).map_err(|e| {
        ScanError::Config(format!("Library root {} is not accessible: {}", root.display(), e))
    })?;
    if !meta.is_dir() {
        return Err(ScanError::Config(format!(
            "Library root {} is not a directory",
            root.display()
        )));
    }
    std::fs::read_dir(root).map_err(|e| {
        ScanError::Config(format!("Library root {} is not readable: {}", root.display(), e))
    })?;
    Ok(())
}

impl Discoverer {
    /// Probe the library root and prepare lookups
    ///
    /// # Errors
    ///
    /// `ScanError::Config` when the root is unusable or an exclusion pattern
    /// is invalid. An ambiguous layout is not an error.
    pub fn new(settings: &ScanSettings) -> Result<Self> {
        validate_library_root(&settings.library_root)?;
        let detection = detect_layout(&settings.library_root)?;
        debug!(root = %settings.library_root.display(), layout = ?detection.layout, "Detected library layout");

        Ok(Self {
            root: settings.library_root.clone(),
            layout: detection.layout,
            table: PlatformTable::new(
                settings.platform_bindings.clone(),
                settings.platform_versions.clone(),
            ),
            exclusions: Exclusions::from_config(&settings.exclude)?,
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Platform folder names on disk, excluded folders removed
    pub fn platform_folders(&self) -> Result<Vec<String>> {
        let folders = self.layout.platform_folders(&self.root)?;
        Ok(folders
            .into_iter()
            .filter(|name| !self.exclusions.excludes_platform(name))
            .collect())
    }

    pub fn resolve(&self, fs_slug: &str) -> Option<PlatformInfo> {
        self.table.resolve(fs_slug)
    }

    pub fn roms_dir(&self, fs_slug: &str) -> PathBuf {
        self.layout.roms_dir(&self.root, fs_slug)
    }

    /// Entries of one platform folder
    pub fn scan_entries(&self, fs_slug: &str) -> Result<Vec<DiscoveredEntry>> {
        entries::scan_entries(&self.roms_dir(fs_slug), &self.exclusions)
    }
}
