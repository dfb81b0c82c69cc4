//! Entry classification within a platform roms folder
//!
//! - Files directly under the roms folder are grouped by disc-normalized
//!   stem. A group of one is a single-file entry; a larger group is one
//!   multi-file entry named after its first file.
//! - Each directory is a bundle entry. Its files are classified by the first
//!   path component naming a side-content category; everything else is
//!   primary content.

use once_cell::sync::Lazy;
use regex::Regex;
use romvault_common::models::{FileCategory, RomFile, RomHashes};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};
use std::time::UNIX_EPOCH;
use tracing::warn;
use walkdir::WalkDir;

use super::exclusions::Exclusions;
use crate::error::{Result, ScanError};
use crate::tags::file_stem;

static DISC_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[\(\[]\s*(disc|disk|cd)\s*\d+(\s*of\s*\d+)?\s*[\)\]]")
        .expect("valid disc token regex")
});

/// An entry as observed on disk, before hashing and identification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEntry {
    pub fs_name: String,
    pub is_directory: bool,
    pub multi: bool,
    /// Sorted by relative path
    pub files: Vec<RomFile>,
    pub size: u64,
    /// Newest file mtime, seconds since epoch
    pub mtime: Option<i64>,
    /// First file that vanished or could not be inspected while listing
    pub read_error: Option<String>,
}

impl DiscoveredEntry {
    pub fn fingerprint(&self) -> (u64, Option<i64>) {
        (self.size, self.mtime)
    }

    fn from_files(
        fs_name: String,
        is_directory: bool,
        mut files: Vec<RomFile>,
        read_error: Option<String>,
    ) -> Self {
        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        let size = files.iter().map(|f| f.size).sum();
        let mtime = files.iter().filter_map(|f| f.mtime).max();
        let primaries = files
            .iter()
            .filter(|f| f.category == FileCategory::Primary)
            .count();
        Self {
            fs_name,
            is_directory,
            multi: primaries > 1,
            files,
            size,
            mtime,
            read_error,
        }
    }
}

/// Stem with extension and disc markers removed, used to group multi-disc sets
pub fn disc_group_key(file_name: &str) -> String {
    DISC_TOKEN
        .replace_all(file_stem(file_name), "")
        .trim()
        .to_string()
}

fn rom_file(path: &Path, rel_path: String, category: FileCategory) -> Result<RomFile> {
    let meta = fs::metadata(path).map_err(|e| ScanError::read(path, e))?;
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64);

    Ok(RomFile {
        file_name: file_name_of(path, &rel_path),
        rel_path,
        size: meta.len(),
        mtime,
        category,
        hashes: RomHashes::default(),
    })
}

fn file_name_of(path: &Path, rel_path: &str) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| rel_path.to_string())
}

/// Files of one entry being collected; an unreadable file is kept without
/// size or mtime and its error is recorded for the whole entry
#[derive(Default)]
struct EntryFiles {
    files: Vec<RomFile>,
    read_error: Option<String>,
}

impl EntryFiles {
    fn push(&mut self, path: &Path, rel_path: String, category: FileCategory) {
        match rom_file(path, rel_path.clone(), category) {
            Ok(file) => self.files.push(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "File vanished while listing entry");
                self.read_error.get_or_insert_with(|| e.to_string());
                self.files.push(RomFile {
                    file_name: file_name_of(path, &rel_path),
                    rel_path,
                    size: 0,
                    mtime: None,
                    category,
                    hashes: RomHashes::default(),
                });
            }
        }
    }

    fn into_entry(self, fs_name: String, is_directory: bool) -> DiscoveredEntry {
        DiscoveredEntry::from_files(fs_name, is_directory, self.files, self.read_error)
    }
}

/// Category of a file from the folders between the bundle root and the file
fn category_for(rel_in_bundle: &Path) -> FileCategory {
    let mut components: Vec<&str> = rel_in_bundle
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    // Drop the file name itself
    components.pop();
    components
        .into_iter()
        .find_map(FileCategory::from_folder_name)
        .unwrap_or(FileCategory::Primary)
}

fn scan_bundle(roms_dir: &Path, name: &str, exclusions: &Exclusions) -> Result<Option<DiscoveredEntry>> {
    let bundle_dir = roms_dir.join(name);
    let mut files = EntryFiles::default();

    let walker = WalkDir::new(&bundle_dir)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));

    for item in walker {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                warn!(bundle = %bundle_dir.display(), error = %e, "Error accessing bundle entry");
                continue;
            }
        };
        if !item.file_type().is_file() {
            continue;
        }
        let file_name = item.file_name().to_string_lossy().to_string();
        if exclusions.excludes_bundle_part(&file_name) {
            continue;
        }
        let rel_in_bundle = match item.path().strip_prefix(&bundle_dir) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };
        let rel_path = Path::new(name)
            .join(&rel_in_bundle)
            .to_string_lossy()
            .replace('\\', "/");
        files.push(item.path(), rel_path, category_for(&rel_in_bundle));
    }

    if files.files.is_empty() {
        return Ok(None);
    }
    Ok(Some(files.into_entry(name.to_string(), true)))
}

/// Enumerate the entries of one platform roms folder, sorted by name
pub fn scan_entries(roms_dir: &Path, exclusions: &Exclusions) -> Result<Vec<DiscoveredEntry>> {
    let mut single_groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut bundles = Vec::new();

    if !roms_dir.is_dir() {
        return Ok(Vec::new());
    }

    for item in fs::read_dir(roms_dir).map_err(|e| ScanError::read(roms_dir, e))? {
        let item = item.map_err(|e| ScanError::read(roms_dir, e))?;
        let name = item.file_name().to_string_lossy().to_string();
        let path = item.path();

        if path.is_dir() {
            if !exclusions.excludes_bundle(&name) {
                bundles.push(name);
            }
        } else if path.is_file() && !exclusions.excludes_single(&name) {
            single_groups
                .entry(disc_group_key(&name))
                .or_default()
                .push(name);
        }
    }

    let mut entries = Vec::new();

    for (_, mut names) in single_groups {
        names.sort();
        let mut files = EntryFiles::default();
        for name in &names {
            files.push(&roms_dir.join(name), name.clone(), FileCategory::Primary);
        }
        entries.push(files.into_entry(names[0].clone(), false));
    }

    for name in bundles {
        if let Some(entry) = scan_bundle(roms_dir, &name, exclusions)? {
            entries.push(entry);
        }
    }

    entries.sort_by(|a, b| a.fs_name.cmp(&b.fs_name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str, content: &[u8]) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_disc_group_key() {
        assert_eq!(disc_group_key("Game (USA) (Disc 1).cue"), "Game (USA)");
        assert_eq!(disc_group_key("Game (USA) (Disc 2 of 3).bin"), "Game (USA)");
        assert_eq!(disc_group_key("Game [CD2].iso"), "Game");
        assert_eq!(disc_group_key("game_2.gba"), "game_2");
    }

    #[test]
    fn test_single_files_are_separate_entries() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "game.gba", b"one");
        touch(dir.path(), "game_2.gba", b"two");

        let entries = scan_entries(dir.path(), &Exclusions::default()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.fs_name.as_str()).collect();
        assert_eq!(names, vec!["game.gba", "game_2.gba"]);
        assert!(entries.iter().all(|e| !e.multi && !e.is_directory));
        assert_eq!(entries[0].size, 3);
    }

    #[test]
    fn test_multi_disc_grouped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Game (USA) (Disc 1).chd", b"d1");
        touch(dir.path(), "Game (USA) (Disc 2).chd", b"d2");
        touch(dir.path(), "Other.chd", b"o");

        let entries = scan_entries(dir.path(), &Exclusions::default()).unwrap();
        assert_eq!(entries.len(), 2);
        let game = &entries[0];
        assert_eq!(game.fs_name, "Game (USA) (Disc 1).chd");
        assert!(game.multi);
        assert_eq!(game.files.len(), 2);
        assert_eq!(game.size, 4);
    }

    #[test]
    fn test_bundle_side_content_classified() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Game/Game.iso", b"iso");
        touch(dir.path(), "Game/DLC/pack1.pkg", b"dlc");
        touch(dir.path(), "Game/manuals/en/manual.pdf", b"pdf");
        touch(dir.path(), "Game/Updates/v1.1.pkg", b"upd");
        touch(dir.path(), "Game/extras/art.png", b"png");
        touch(dir.path(), "Game/.hidden/skip.bin", b"x");

        let entries = scan_entries(dir.path(), &Exclusions::default()).unwrap();
        assert_eq!(entries.len(), 1);
        let bundle = &entries[0];
        assert!(bundle.is_directory);

        let category = |rel: &str| {
            bundle
                .files
                .iter()
                .find(|f| f.rel_path == rel)
                .map(|f| f.category)
        };
        assert_eq!(category("Game/Game.iso"), Some(FileCategory::Primary));
        assert_eq!(category("Game/DLC/pack1.pkg"), Some(FileCategory::Dlc));
        assert_eq!(category("Game/manuals/en/manual.pdf"), Some(FileCategory::Manual));
        assert_eq!(category("Game/Updates/v1.1.pkg"), Some(FileCategory::Update));
        assert_eq!(category("Game/extras/art.png"), Some(FileCategory::Primary));
        assert_eq!(category("Game/.hidden/skip.bin"), None);
        // Game.iso and extras/art.png
        assert!(bundle.multi);
    }

    #[test]
    fn test_vanished_file_recorded_on_entry() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Game/Game.iso", b"iso");

        let mut files = EntryFiles::default();
        files.push(&dir.path().join("Game/Game.iso"), "Game/Game.iso".to_string(), FileCategory::Primary);
        files.push(&dir.path().join("Game/gone.bin"), "Game/gone.bin".to_string(), FileCategory::Primary);
        let entry = files.into_entry("Game".to_string(), true);

        assert_eq!(entry.files.len(), 2);
        assert_eq!(entry.size, 3);
        let gone = entry.files.iter().find(|f| f.rel_path == "Game/gone.bin").unwrap();
        assert_eq!(gone.size, 0);
        assert!(gone.mtime.is_none());
        assert!(entry.read_error.as_deref().unwrap().contains("gone.bin"));
    }

    #[test]
    fn test_readable_entries_carry_no_error() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "game.gba", b"one");
        let entries = scan_entries(dir.path(), &Exclusions::default()).unwrap();
        assert!(entries[0].read_error.is_none());
    }

    #[test]
    fn test_empty_bundle_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Empty")).unwrap();
        assert!(scan_entries(dir.path(), &Exclusions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_roms_dir_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let entries = scan_entries(&dir.path().join("absent"), &Exclusions::default()).unwrap();
        assert!(entries.is_empty());
    }
}
