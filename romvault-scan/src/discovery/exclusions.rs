//! Exclusion patterns from the `[exclude]` config section

use globset::{Glob, GlobSet, GlobSetBuilder};
use romvault_common::config::ExcludeSection;
use std::collections::HashSet;

use crate::error::{Result, ScanError};
use crate::tags::file_extension;

#[derive(Debug, Clone)]
pub struct Exclusions {
    single_files: GlobSet,
    single_extensions: HashSet<String>,
    multi_files: GlobSet,
    multi_part_files: GlobSet,
    multi_part_extensions: HashSet<String>,
    platforms: GlobSet,
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if pattern.trim().is_empty() {
            continue;
        }
        let glob = Glob::new(pattern.trim())
            .map_err(|e| ScanError::Config(format!("Invalid exclude pattern {:?}: {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ScanError::Config(format!("Invalid exclude patterns: {}", e)))
}

fn extension_set(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

impl Exclusions {
    pub fn from_config(section: &ExcludeSection) -> Result<Self> {
        Ok(Self {
            single_files: build_globset(&section.single_files)?,
            single_extensions: extension_set(&section.single_extensions),
            multi_files: build_globset(&section.multi_files)?,
            multi_part_files: build_globset(&section.multi_part_files)?,
            multi_part_extensions: extension_set(&section.multi_part_extensions),
            platforms: build_globset(&section.platforms)?,
        })
    }

    pub fn excludes_platform(&self, name: &str) -> bool {
        is_hidden(name) || self.platforms.is_match(name)
    }

    /// File directly under a platform roms folder
    pub fn excludes_single(&self, name: &str) -> bool {
        is_hidden(name)
            || self.single_files.is_match(name)
            || self.single_extensions.contains(&file_extension(name))
    }

    /// Bundle directory under a platform roms folder
    pub fn excludes_bundle(&self, name: &str) -> bool {
        is_hidden(name) || self.multi_files.is_match(name)
    }

    /// File inside a bundle directory
    pub fn excludes_bundle_part(&self, name: &str) -> bool {
        is_hidden(name)
            || self.multi_part_files.is_match(name)
            || self.multi_part_extensions.contains(&file_extension(name))
    }
}

impl Default for Exclusions {
    fn default() -> Self {
        Self {
            single_files: GlobSet::empty(),
            single_extensions: HashSet::new(),
            multi_files: GlobSet::empty(),
            multi_part_files: GlobSet::empty(),
            multi_part_extensions: HashSet::new(),
            platforms: GlobSet::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_and_extensions() {
        let section = ExcludeSection {
            single_files: vec!["*.sav".to_string(), "gamelist.xml".to_string()],
            single_extensions: vec![".TXT".to_string()],
            multi_files: vec!["_*".to_string()],
            multi_part_files: vec!["desktop.ini".to_string()],
            multi_part_extensions: vec!["nfo".to_string()],
            platforms: vec!["bios".to_string()],
        };
        let ex = Exclusions::from_config(&section).unwrap();

        assert!(ex.excludes_single("Game.sav"));
        assert!(ex.excludes_single("gamelist.xml"));
        assert!(ex.excludes_single("readme.txt"));
        assert!(ex.excludes_single(".DS_Store"));
        assert!(!ex.excludes_single("Game.gba"));

        assert!(ex.excludes_bundle("_staging"));
        assert!(!ex.excludes_bundle("Game"));

        assert!(ex.excludes_bundle_part("desktop.ini"));
        assert!(ex.excludes_bundle_part("info.NFO"));
        assert!(!ex.excludes_bundle_part("game.iso"));

        assert!(ex.excludes_platform("bios"));
        assert!(!ex.excludes_platform("gba"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let section = ExcludeSection {
            single_files: vec!["[invalid".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            Exclusions::from_config(&section),
            Err(ScanError::Config(_))
        ));
    }

    #[test]
    fn test_default_excludes_only_hidden() {
        let ex = Exclusions::default();
        assert!(ex.excludes_single(".hidden"));
        assert!(!ex.excludes_single("Game (USA).gba"));
    }
}
