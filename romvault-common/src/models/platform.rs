//! Platform folders observed under the library root

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One platform folder under the library root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFolder {
    /// Stable catalog identifier
    pub id: Uuid,

    /// Folder name as found on disk (case-sensitive)
    pub fs_slug: String,

    /// Canonical platform slug, None when the folder matched no known platform
    pub slug: Option<String>,

    /// Display name of the canonical platform
    pub name: Option<String>,

    /// Folder was recorded by a previous scan but is absent now
    pub missing_from_fs: bool,
}

impl PlatformFolder {
    pub fn new(fs_slug: impl Into<String>, slug: Option<String>, name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fs_slug: fs_slug.into(),
            slug,
            name,
            missing_from_fs: false,
        }
    }

    /// Canonical slug if resolved, otherwise the folder name
    pub fn effective_slug(&self) -> &str {
        self.slug.as_deref().unwrap_or(&self.fs_slug)
    }
}
