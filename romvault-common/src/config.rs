//! Configuration loading and library root resolution
//!
//! Values resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "ROMVAULT_CONFIG";
/// Environment variable naming the library root
pub const LIBRARY_ROOT_ENV: &str = "ROMVAULT_LIBRARY_ROOT";
/// Environment variable naming the catalog database
pub const DATABASE_ENV: &str = "ROMVAULT_DATABASE";

/// Top-level TOML configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub library_root: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub scan: ScanSection,
    pub providers: ProvidersSection,
    pub exclude: ExcludeSection,
    pub platforms: PlatformsSection,
    pub hashing: HashingSection,
    pub logging: LoggingSection,
}

/// `[scan]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    /// Platforms processed concurrently
    pub platform_concurrency: usize,
    /// Entries processed concurrently within one platform
    pub entry_concurrency: usize,
    /// Minimum candidate confidence accepted by the reconciler
    pub match_threshold: f64,
    pub provider_timeout_secs: u64,
    /// Region preference for main-sibling selection (first = preferred)
    pub region_priority: Vec<String>,
    /// Provider preference when merging metadata fields
    pub metadata_priority: Vec<String>,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            platform_concurrency: 2,
            entry_concurrency: 4,
            match_threshold: 0.75,
            provider_timeout_secs: 30,
            region_priority: ["USA", "World", "Europe", "Japan"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            metadata_priority: ["igdb", "ss", "moby", "ra", "hasheous"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// `[providers.*]` sections
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersSection {
    pub igdb: ProviderSection,
    pub moby: ProviderSection,
    pub ss: ProviderSection,
    pub ra: ProviderSection,
    pub hasheous: ProviderSection,
}

/// Settings of one metadata provider
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub enabled: bool,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Override of the provider's API base URL
    pub base_url: Option<String>,
    pub requests_per_second: Option<u32>,
}

/// `[exclude]` section: glob patterns matched against names
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExcludeSection {
    /// Single-file entries excluded by file name
    pub single_files: Vec<String>,
    /// Single-file entries excluded by extension (without dot)
    pub single_extensions: Vec<String>,
    /// Bundle directories excluded by name
    pub multi_files: Vec<String>,
    /// Files inside bundles excluded by name
    pub multi_part_files: Vec<String>,
    /// Files inside bundles excluded by extension (without dot)
    pub multi_part_extensions: Vec<String>,
    /// Platform folders excluded by name
    pub platforms: Vec<String>,
}

/// `[platforms]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformsSection {
    /// Folder name → canonical platform slug
    pub bindings: BTreeMap<String, String>,
    /// Folder name → parent platform slug (platform versions)
    pub versions: BTreeMap<String, String>,
}

/// `[hashing]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HashingSection {
    /// RetroAchievements hash helper binary
    pub rahasher_path: Option<PathBuf>,
    /// Additional platform slugs never hashed
    pub skip_platforms: Vec<String>,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: Option<String>,
}

impl TomlConfig {
    /// Parse configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load the config file resolved from CLI/ENV/default location.
    ///
    /// A missing file at the default location yields defaults; a file named
    /// explicitly on the command line or in the environment must exist.
    pub fn load_resolved(cli_arg: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_arg {
            return Self::load(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                warn!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Library root resolution: CLI > `ROMVAULT_LIBRARY_ROOT` > TOML > default
pub fn resolve_library_root(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(LIBRARY_ROOT_ENV) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.library_root {
        return path.clone();
    }

    default_data_dir().join("library")
}

/// Catalog database resolution: CLI > `ROMVAULT_DATABASE` > TOML > default
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.database {
        return path.clone();
    }

    default_data_dir().join("romvault.db")
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("romvault").join("config.toml"))
}

/// OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("romvault"))
        .unwrap_or_else(|| PathBuf::from("./romvault_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = TomlConfig::from_toml_str("library_root = \"/srv/library\"").unwrap();
        assert_eq!(config.library_root, Some(PathBuf::from("/srv/library")));
        assert_eq!(config.scan.platform_concurrency, 2);
        assert_eq!(config.scan.entry_concurrency, 4);
        assert!((config.scan.match_threshold - 0.75).abs() < f64::EPSILON);
        assert!(!config.providers.igdb.enabled);
    }

    #[test]
    fn test_full_config_parses() {
        let toml = r#"
            [scan]
            platform_concurrency = 3
            entry_concurrency = 8
            region_priority = ["Europe", "USA"]

            [providers.igdb]
            enabled = true
            client_id = "abc"
            client_secret = "def"

            [providers.ra]
            enabled = true
            api_key = "k"

            [exclude]
            single_extensions = ["txt", "nfo"]
            platforms = ["bios"]

            [platforms.bindings]
            gbc-homebrew = "gbc"

            [hashing]
            rahasher_path = "/usr/bin/RAHasher"
        "#;
        let config = TomlConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.scan.platform_concurrency, 3);
        assert_eq!(config.scan.region_priority, vec!["Europe", "USA"]);
        assert!(config.providers.igdb.enabled);
        assert_eq!(config.providers.igdb.client_id.as_deref(), Some("abc"));
        assert!(config.providers.ra.enabled);
        assert_eq!(config.exclude.single_extensions, vec!["txt", "nfo"]);
        assert_eq!(
            config.platforms.bindings.get("gbc-homebrew").map(String::as_str),
            Some("gbc")
        );
        assert_eq!(
            config.hashing.rahasher_path,
            Some(PathBuf::from("/usr/bin/RAHasher"))
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[scan\nplatform_concurrency = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    #[serial]
    fn test_library_root_priority() {
        let config = TomlConfig {
            library_root: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };

        std::env::set_var(LIBRARY_ROOT_ENV, "/from/env");
        assert_eq!(
            resolve_library_root(Some(Path::new("/from/cli")), &config),
            PathBuf::from("/from/cli")
        );
        assert_eq!(resolve_library_root(None, &config), PathBuf::from("/from/env"));

        std::env::remove_var(LIBRARY_ROOT_ENV);
        assert_eq!(resolve_library_root(None, &config), PathBuf::from("/from/toml"));
    }

    #[test]
    #[serial]
    fn test_load_resolved_from_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scan]\nentry_concurrency = 1\n").unwrap();

        std::env::set_var(CONFIG_ENV, &path);
        let config = TomlConfig::load_resolved(None).unwrap();
        std::env::remove_var(CONFIG_ENV);

        assert_eq!(config.scan.entry_concurrency, 1);
    }
}
