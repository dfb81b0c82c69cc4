//! Library folder layout detection
//!
//! Two layouts are supported:
//! - A: `<root>/roms/<platform>/...`
//! - B: `<root>/<platform>/roms/...`
//!
//! When both or neither are present the root is ambiguous; the detector
//! logs it and uses layout A.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Result, ScanError};

pub const ROMS_FOLDER: &str = "roms";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Layout {
    /// `roms/<platform>`
    A,
    /// `<platform>/roms`
    B,
}

impl Layout {
    /// Directory holding the platform folders
    pub fn platforms_dir(&self, root: &Path) -> PathBuf {
        match self {
            Layout::A => root.join(ROMS_FOLDER),
            Layout::B => root.to_path_buf(),
        }
    }

    /// Directory holding the entries of one platform
    pub fn roms_dir(&self, root: &Path, fs_slug: &str) -> PathBuf {
        match self {
            Layout::A => root.join(ROMS_FOLDER).join(fs_slug),
            Layout::B => root.join(fs_slug).join(ROMS_FOLDER),
        }
    }

    /// Platform folder names present on disk, sorted
    pub fn platform_folders(&self, root: &Path) -> Result<Vec<String>> {
        let dir = self.platforms_dir(root);
        let mut folders = Vec::new();

        if !dir.is_dir() {
            return Ok(folders);
        }

        for entry in fs::read_dir(&dir).map_err(|e| ScanError::read(&dir, e))? {
            let entry = entry.map_err(|e| ScanError::read(&dir, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if *self == Layout::B && (name == ROMS_FOLDER || !entry.path().join(ROMS_FOLDER).is_dir()) {
                continue;
            }
            folders.push(name);
        }

        folders.sort();
        Ok(folders)
    }
}

/// Outcome of probing a library root
#[derive(Debug)]
pub struct LayoutDetection {
    pub layout: Layout,
    /// Set when the root matched both or neither layout
    pub ambiguity: Option<ScanError>,
}

/// Probe `roms` at depth 1 (layout A) and depth 2 (layout B)
pub fn detect_layout(root: &Path) -> Result<LayoutDetection> {
    let entries = fs::read_dir(root)
        .map_err(|e| ScanError::Config(format!("Cannot read library root {}: {}", root.display(), e)))?;

    let has_a = root.join(ROMS_FOLDER).is_dir();
    let mut has_b = false;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.file_name().map(|n| n == ROMS_FOLDER).unwrap_or(false) {
            continue;
        }
        if path.is_dir() && path.join(ROMS_FOLDER).is_dir() {
            has_b = true;
            break;
        }
    }

    let (layout, ambiguity) = match (has_a, has_b) {
        (true, false) => (Layout::A, None),
        (false, true) => (Layout::B, None),
        (true, true) => (
            Layout::A,
            Some(ScanError::AmbiguousLayout {
                root: root.to_path_buf(),
                detail: "both roms/<platform> and <platform>/roms folders exist".to_string(),
            }),
        ),
        (false, false) => (
            Layout::A,
            Some(ScanError::AmbiguousLayout {
                root: root.to_path_buf(),
                detail: "no roms folder found".to_string(),
            }),
        ),
    };

    if let Some(err) = &ambiguity {
        warn!(error = %err, "Falling back to layout A");
    }

    Ok(LayoutDetection { layout, ambiguity })
}
