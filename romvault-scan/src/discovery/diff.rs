//! Snapshot diff between disk and catalog

use romvault_common::models::{PlatformFolder, RomEntry};
use std::collections::HashMap;

use super::entries::DiscoveredEntry;

/// How an on-disk entry relates to the previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryChange {
    /// Not in the catalog
    New,
    /// In the catalog with a different size/mtime
    Changed,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct DiffedEntry {
    pub discovered: DiscoveredEntry,
    pub previous: Option<RomEntry>,
    pub change: EntryChange,
    /// Was flagged missing and is back on disk
    pub reappeared: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PlatformDiff {
    pub entries: Vec<DiffedEntry>,
    /// Catalog entries absent from disk and not yet flagged
    pub newly_missing: Vec<RomEntry>,
    /// Catalog entries absent from disk and already flagged
    pub still_missing: Vec<RomEntry>,
}

impl PlatformDiff {
    pub fn count(&self, change: EntryChange) -> usize {
        self.entries.iter().filter(|e| e.change == change).count()
    }
}

/// Diff the entries of one platform against its catalog rows
pub fn diff_entries(discovered: Vec<DiscoveredEntry>, previous: Vec<RomEntry>) -> PlatformDiff {
    let mut by_name: HashMap<String, RomEntry> = previous
        .into_iter()
        .map(|entry| (entry.fs_name.clone(), entry))
        .collect();

    let mut diff = PlatformDiff::default();

    for found in discovered {
        let entry = match by_name.remove(&found.fs_name) {
            None => DiffedEntry {
                discovered: found,
                previous: None,
                change: EntryChange::New,
                reappeared: false,
            },
            Some(prev) => {
                let change = if prev.fingerprint() == found.fingerprint() {
                    EntryChange::Unchanged
                } else {
                    EntryChange::Changed
                };
                DiffedEntry {
                    discovered: found,
                    reappeared: prev.missing_from_fs,
                    previous: Some(prev),
                    change,
                }
            }
        };
        diff.entries.push(entry);
    }

    let mut gone: Vec<RomEntry> = by_name.into_values().collect();
    gone.sort_by(|a, b| a.fs_name.cmp(&b.fs_name));
    for entry in gone {
        if entry.missing_from_fs {
            diff.still_missing.push(entry);
        } else {
            diff.newly_missing.push(entry);
        }
    }

    diff
}

/// Platform folders on disk vs. in the catalog
#[derive(Debug, Clone, Default)]
pub struct FolderDiff {
    /// Folder names not in the catalog
    pub new: Vec<String>,
    /// Catalog folders present on disk
    pub existing: Vec<PlatformFolder>,
    /// Catalog folders absent from disk
    pub missing: Vec<PlatformFolder>,
}

pub fn diff_platforms(on_disk: &[String], catalog: Vec<PlatformFolder>) -> FolderDiff {
    let mut by_name: HashMap<String, PlatformFolder> = catalog
        .into_iter()
        .map(|p| (p.fs_slug.clone(), p))
        .collect();

    let mut diff = FolderDiff::default();
    for name in on_disk {
        match by_name.remove(name) {
            Some(existing) => diff.existing.push(existing),
            None => diff.new.push(name.clone()),
        }
    }
    diff.missing = by_name.into_values().collect();
    diff.missing.sort_by(|a, b| a.fs_slug.cmp(&b.fs_slug));
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn discovered(name: &str, size: u64, mtime: i64) -> DiscoveredEntry {
        DiscoveredEntry {
            fs_name: name.to_string(),
            is_directory: false,
            multi: false,
            files: Vec::new(),
            size,
            mtime: Some(mtime),
            read_error: None,
        }
    }

    fn stored(name: &str, size: u64, mtime: i64, missing: bool) -> RomEntry {
        let mut entry = RomEntry::new(Uuid::new_v4(), name);
        entry.size = size;
        entry.mtime = Some(mtime);
        entry.missing_from_fs = missing;
        entry
    }

    #[test]
    fn test_entry_diff_classification() {
        let disk = vec![
            discovered("new.gba", 10, 1),
            discovered("same.gba", 20, 2),
            discovered("touched.gba", 30, 9),
            discovered("back.gba", 40, 4),
        ];
        let catalog = vec![
            stored("same.gba", 20, 2, false),
            stored("touched.gba", 30, 3, false),
            stored("back.gba", 40, 4, true),
            stored("gone.gba", 50, 5, false),
            stored("long-gone.gba", 60, 6, true),
        ];

        let diff = diff_entries(disk, catalog);
        let change_of = |name: &str| {
            diff.entries
                .iter()
                .find(|e| e.discovered.fs_name == name)
                .map(|e| (e.change, e.reappeared))
        };

        assert_eq!(change_of("new.gba"), Some((EntryChange::New, false)));
        assert_eq!(change_of("same.gba"), Some((EntryChange::Unchanged, false)));
        assert_eq!(change_of("touched.gba"), Some((EntryChange::Changed, false)));
        assert_eq!(change_of("back.gba"), Some((EntryChange::Unchanged, true)));
        assert_eq!(diff.newly_missing.len(), 1);
        assert_eq!(diff.newly_missing[0].fs_name, "gone.gba");
        assert_eq!(diff.still_missing.len(), 1);
        assert_eq!(diff.count(EntryChange::New), 1);
    }

    #[test]
    fn test_platform_diff() {
        let gba = PlatformFolder::new("gba", Some("gba".to_string()), None);
        let nes = PlatformFolder::new("nes", Some("nes".to_string()), None);
        let diff = diff_platforms(&["gba".to_string(), "snes".to_string()], vec![gba, nes]);

        assert_eq!(diff.new, vec!["snes"]);
        assert_eq!(diff.existing.len(), 1);
        assert_eq!(diff.missing.len(), 1);
        assert_eq!(diff.missing[0].fs_slug, "nes");
    }
}
