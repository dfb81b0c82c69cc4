//! ROM entries, their files and identification state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// External metadata source identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// IGDB (big-ID metadata database)
    Igdb,
    /// MobyGames
    Moby,
    /// ScreenScraper
    Ss,
    /// RetroAchievements
    Ra,
    /// Hasheous hash-verification catalog
    Hasheous,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::Igdb,
        ProviderId::Moby,
        ProviderId::Ss,
        ProviderId::Ra,
        ProviderId::Hasheous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Igdb => "igdb",
            ProviderId::Moby => "moby",
            ProviderId::Ss => "ss",
            ProviderId::Ra => "ra",
            ProviderId::Hasheous => "hasheous",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "igdb" => Ok(ProviderId::Igdb),
            "moby" | "mobygames" => Ok(ProviderId::Moby),
            "ss" | "screenscraper" => Ok(ProviderId::Ss),
            "ra" | "retroachievements" => Ok(ProviderId::Ra),
            "hasheous" => Ok(ProviderId::Hasheous),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// Role of a file inside a ROM entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    /// The game content itself
    Primary,
    Dlc,
    Hack,
    Manual,
    Mod,
    Patch,
    Update,
    Demo,
    Translation,
    Prototype,
}

impl FileCategory {
    /// Side-content categories recognized as bundle subfolders
    pub const SIDE_CONTENT: [FileCategory; 9] = [
        FileCategory::Dlc,
        FileCategory::Hack,
        FileCategory::Manual,
        FileCategory::Mod,
        FileCategory::Patch,
        FileCategory::Update,
        FileCategory::Demo,
        FileCategory::Translation,
        FileCategory::Prototype,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Primary => "primary",
            FileCategory::Dlc => "dlc",
            FileCategory::Hack => "hack",
            FileCategory::Manual => "manual",
            FileCategory::Mod => "mod",
            FileCategory::Patch => "patch",
            FileCategory::Update => "update",
            FileCategory::Demo => "demo",
            FileCategory::Translation => "translation",
            FileCategory::Prototype => "prototype",
        }
    }

    /// Match a folder name against the side-content categories.
    ///
    /// Accepts the singular or plural form, case-insensitively
    /// (`dlc`, `DLCs`, `Manuals`, `patch`, `patches`).
    pub fn from_folder_name(name: &str) -> Option<FileCategory> {
        let lower = name.to_lowercase();
        Self::SIDE_CONTENT.into_iter().find(|category| {
            let singular = category.as_str();
            lower == singular
                || lower == format!("{}s", singular)
                || lower == format!("{}es", singular)
        })
    }
}

/// Content identifiers of a file or of a whole entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomHashes {
    pub crc32: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    /// RetroAchievements hash from the external helper
    pub ra: Option<String>,
}

impl RomHashes {
    pub fn is_empty(&self) -> bool {
        self.crc32.is_none() && self.md5.is_none() && self.sha1.is_none() && self.ra.is_none()
    }

    /// Whether any content digest (crc32/md5/sha1) is present
    pub fn has_content_hash(&self) -> bool {
        self.crc32.is_some() || self.md5.is_some() || self.sha1.is_some()
    }
}

/// One file belonging to a ROM entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomFile {
    pub file_name: String,
    /// Path relative to the platform roms folder
    pub rel_path: String,
    pub size: u64,
    /// Modification time, seconds since epoch
    pub mtime: Option<i64>,
    pub category: FileCategory,
    #[serde(default)]
    pub hashes: RomHashes,
}

/// Structured tags extracted from a filename
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomTags {
    pub regions: Vec<String>,
    pub languages: Vec<String>,
    pub revision: Option<String>,
    pub other: Vec<String>,
}

/// Enrichment fields merged from accepted providers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub cover_url: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    pub manual_url: Option<String>,
    pub release_year: Option<i32>,
    #[serde(default)]
    pub alternative_names: Vec<String>,
}

impl GameMetadata {
    /// Title, description and cover are all available
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.summary.is_some() && self.cover_url.is_some()
    }
}

/// Identification outcome of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentStatus {
    /// No provider accepted a candidate
    Unidentified,
    /// Accepted ids exist but title, description or cover is missing
    Partial,
    Identified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub message: String,
}

/// Per-entry failure reasons retained for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    /// Set when hashing could not read the entry's files
    pub read_error: Option<String>,
    #[serde(default)]
    pub provider_errors: Vec<ProviderFailure>,
}

impl EntryFailure {
    pub fn is_empty(&self) -> bool {
        self.read_error.is_none() && self.provider_errors.is_empty()
    }
}

/// One logical title-unit on disk: a single file, a multi-disc set, or a
/// directory bundling a primary file with side content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RomEntry {
    /// Stable across rescans while the path matches
    pub id: Uuid,
    pub platform_id: Uuid,

    /// File or directory name relative to the platform roms folder
    pub fs_name: String,
    /// `fs_name` with tags and extension removed
    pub fs_name_no_tags: String,
    pub fs_extension: String,
    /// Entry is a directory bundle
    pub is_directory: bool,
    /// Entry spans more than one primary file
    pub multi: bool,
    pub files: Vec<RomFile>,

    pub tags: RomTags,
    /// Combined digest over all primary files in order
    pub hashes: RomHashes,
    pub size: u64,
    pub mtime: Option<i64>,

    /// Accepted external id per provider
    pub external_ids: BTreeMap<ProviderId, String>,
    pub metadata: GameMetadata,
    pub is_unidentified: bool,
    pub is_partial: bool,
    pub failure: EntryFailure,

    pub missing_from_fs: bool,
    /// User marked this entry as the representative of its group
    pub user_main_sibling: bool,
    pub sibling_group: Option<Uuid>,
    pub is_main_sibling: bool,
    pub last_scanned_at: Option<DateTime<Utc>>,
}

impl RomEntry {
    /// Create an unscanned entry; identification fields start empty
    pub fn new(platform_id: Uuid, fs_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform_id,
            fs_name: fs_name.into(),
            fs_name_no_tags: String::new(),
            fs_extension: String::new(),
            is_directory: false,
            multi: false,
            files: Vec::new(),
            tags: RomTags::default(),
            hashes: RomHashes::default(),
            size: 0,
            mtime: None,
            external_ids: BTreeMap::new(),
            metadata: GameMetadata::default(),
            is_unidentified: true,
            is_partial: false,
            failure: EntryFailure::default(),
            missing_from_fs: false,
            user_main_sibling: false,
            sibling_group: None,
            is_main_sibling: false,
            last_scanned_at: None,
        }
    }

    pub fn status(&self) -> IdentStatus {
        if self.is_unidentified {
            IdentStatus::Unidentified
        } else if self.is_partial {
            IdentStatus::Partial
        } else {
            IdentStatus::Identified
        }
    }

    /// Size/mtime pair used for change detection
    pub fn fingerprint(&self) -> (u64, Option<i64>) {
        (self.size, self.mtime)
    }

    /// Title used for display and sibling ordering
    pub fn title(&self) -> &str {
        match self.metadata.name.as_deref() {
            Some(name) => name,
            None if !self.fs_name_no_tags.is_empty() => &self.fs_name_no_tags,
            None => &self.fs_name,
        }
    }

    /// Primary files in entry order
    pub fn primary_files(&self) -> impl Iterator<Item = &RomFile> {
        self.files
            .iter()
            .filter(|f| f.category == FileCategory::Primary)
    }
}

/// Entries sharing at least one (provider, external id) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingGroup {
    /// Smallest member id
    pub id: Uuid,
    pub platform_id: Uuid,
    pub members: Vec<Uuid>,
    pub main: Uuid,
}

impl SiblingGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
