//! Scan settings resolution
//!
//! Builds runtime settings from the TOML config. Provider credentials use
//! ENV → TOML priority and warn when both tiers are set.

use romvault_common::config::{ExcludeSection, ProviderSection, TomlConfig};
use romvault_common::models::ProviderId;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Result, ScanError};

/// Runtime settings of the scan engine
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub library_root: PathBuf,
    pub platform_concurrency: usize,
    pub entry_concurrency: usize,
    pub match_threshold: f64,
    pub provider_timeout: Duration,
    pub region_priority: Vec<String>,
    pub metadata_priority: Vec<ProviderId>,
    pub exclude: ExcludeSection,
    pub platform_bindings: BTreeMap<String, String>,
    pub platform_versions: BTreeMap<String, String>,
    pub rahasher_path: Option<PathBuf>,
    pub skip_hash_platforms: Vec<String>,
}

impl ScanSettings {
    /// Settings with compiled defaults for a library root
    pub fn new(library_root: impl Into<PathBuf>) -> Self {
        Self::from_config(library_root.into(), &TomlConfig::default())
    }

    fn from_config(library_root: PathBuf, config: &TomlConfig) -> Self {
        let metadata_priority = config
            .scan
            .metadata_priority
            .iter()
            .filter_map(|name| match name.parse::<ProviderId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Ignoring metadata_priority entry: {}", e);
                    None
                }
            })
            .collect();

        Self {
            library_root,
            platform_concurrency: config.scan.platform_concurrency,
            entry_concurrency: config.scan.entry_concurrency,
            match_threshold: config.scan.match_threshold,
            provider_timeout: Duration::from_secs(config.scan.provider_timeout_secs),
            region_priority: config.scan.region_priority.clone(),
            metadata_priority,
            exclude: config.exclude.clone(),
            platform_bindings: config.platforms.bindings.clone(),
            platform_versions: config.platforms.versions.clone(),
            rahasher_path: config.hashing.rahasher_path.clone(),
            skip_hash_platforms: config.hashing.skip_platforms.clone(),
        }
    }

    /// Build validated settings from the TOML config
    pub fn resolve(library_root: PathBuf, config: &TomlConfig) -> Result<Self> {
        let settings = Self::from_config(library_root, config);
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.platform_concurrency == 0 {
            return Err(ScanError::Config(
                "scan.platform_concurrency must be at least 1".to_string(),
            ));
        }
        if self.entry_concurrency == 0 {
            return Err(ScanError::Config(
                "scan.entry_concurrency must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(ScanError::Config(format!(
                "scan.match_threshold must be within 0.0..=1.0 (got {})",
                self.match_threshold
            )));
        }
        Ok(())
    }
}

/// Resolved settings of one metadata provider
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub base_url: Option<String>,
    pub requests_per_second: Option<u32>,
}

/// Resolve settings for a provider, filling credentials from the environment
pub fn resolve_provider_settings(id: ProviderId, config: &TomlConfig) -> ProviderSettings {
    let section: &ProviderSection = match id {
        ProviderId::Igdb => &config.providers.igdb,
        ProviderId::Moby => &config.providers.moby,
        ProviderId::Ss => &config.providers.ss,
        ProviderId::Ra => &config.providers.ra,
        ProviderId::Hasheous => &config.providers.hasheous,
    };

    let (id_env, secret_env, key_env, user_env, password_env) = match id {
        ProviderId::Igdb => (Some("IGDB_CLIENT_ID"), Some("IGDB_CLIENT_SECRET"), None, None, None),
        ProviderId::Moby => (None, None, Some("MOBYGAMES_API_KEY"), None, None),
        ProviderId::Ss => (
            None,
            None,
            None,
            Some("SCREENSCRAPER_USER"),
            Some("SCREENSCRAPER_PASSWORD"),
        ),
        ProviderId::Ra => (
            None,
            None,
            Some("RETROACHIEVEMENTS_API_KEY"),
            Some("RETROACHIEVEMENTS_USERNAME"),
            None,
        ),
        ProviderId::Hasheous => (None, None, None, None, None),
    };

    ProviderSettings {
        enabled: section.enabled,
        client_id: resolve_credential(id, "client_id", id_env, section.client_id.as_deref()),
        client_secret: resolve_credential(
            id,
            "client_secret",
            secret_env,
            section.client_secret.as_deref(),
        ),
        api_key: resolve_credential(id, "api_key", key_env, section.api_key.as_deref()),
        username: resolve_credential(id, "username", user_env, section.username.as_deref()),
        password: resolve_credential(id, "password", password_env, section.password.as_deref()),
        base_url: section.base_url.clone(),
        requests_per_second: section.requests_per_second,
    }
}

/// Resolve one credential with ENV → TOML priority
fn resolve_credential(
    provider: ProviderId,
    field: &str,
    env_name: Option<&str>,
    toml_value: Option<&str>,
) -> Option<String> {
    let env_value = env_name
        .and_then(|name| std::env::var(name).ok())
        .filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            provider = %provider,
            "{} found in environment and TOML config. Using environment (highest priority).",
            field
        );
    }

    if let Some(value) = env_value {
        info!(provider = %provider, "{} loaded from environment variable", field);
        return Some(value);
    }

    toml_value.map(str::to_string)
}

/// Validate credential (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
